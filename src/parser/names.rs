use sqlparser::ast::{Function, Ident, ObjectName};

/// Return the identifier without surrounding double quotes or backticks.
pub fn unquote_identifier(ident: &str) -> &str {
    for (open, close) in [('"', '"'), ('`', '`'), ('[', ']')] {
        if let Some(inner) = ident
            .strip_prefix(open)
            .and_then(|s| s.strip_suffix(close))
        {
            return inner;
        }
    }
    ident
}

/// Normalize an identifier for case-insensitive matching.
///
/// Trims whitespace, removes surrounding quotes on a single identifier,
/// and lowercases the result.
pub fn normalize_identifier(ident: &str) -> String {
    unquote_identifier(ident.trim()).to_ascii_lowercase()
}

/// Normalize a parsed identifier. Quoted identifiers are folded too, since CDM
/// names are compared case-insensitively.
pub fn normalize_ident(ident: &Ident) -> String {
    ident.value.trim().to_ascii_lowercase()
}

/// Parts of a dotted name such as `cdm.person` or `"cdm"."person"`.
///
/// Dots inside quotes do not split; each part keeps its quotes.
pub fn name_parts(name: &str) -> Vec<&str> {
    let mut quote: Option<char> = None;
    let mut parts = Vec::new();
    let mut start = 0;
    for (idx, ch) in name.char_indices() {
        match (quote, ch) {
            (None, '"' | '`') => quote = Some(ch),
            (None, '[') => quote = Some(']'),
            (Some(close), c) if c == close => quote = None,
            (None, '.') => {
                parts.push(name[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(name[start..].trim());
    parts
}

/// Table or function name without catalog and schema, normalized.
///
/// `cdm.person`, `"vocab"."CONCEPT"` and `Concept_Ancestor` give `person`,
/// `concept` and `concept_ancestor`.
pub fn normalize_relation_name(name: &str) -> String {
    name_parts(name.trim())
        .last()
        .map_or_else(String::new, |relation| normalize_identifier(relation))
}

/// Terminal relation name of a parsed object name, normalized.
pub fn normalized_object_name(name: &ObjectName) -> String {
    normalize_relation_name(&name.to_string())
}

/// Function name without schema, normalized.
pub fn normalized_function_name(func: &Function) -> String {
    normalized_object_name(&func.name)
}
