/// Split SQL text into individual statements on top-level semicolons.
///
/// Semicolons inside quoted strings, quoted identifiers, `--` line comments
/// and `/* */` block comments do not split. Each returned statement keeps its
/// terminating semicolon; empty statements are dropped.
pub fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;
    let mut in_line_comment = false;
    let mut in_block_comment = false;
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        let next = chars.peek().copied();
        current.push(ch);

        if in_line_comment {
            if ch == '\n' {
                in_line_comment = false;
            }
            continue;
        }
        if in_block_comment {
            if ch == '*' && next == Some('/') {
                current.push('/');
                chars.next();
                in_block_comment = false;
            }
            continue;
        }

        match ch {
            '-' if !in_single && !in_double && next == Some('-') => in_line_comment = true,
            '/' if !in_single && !in_double && next == Some('*') => in_block_comment = true,
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            ';' if !in_single && !in_double => {
                let statement = current.trim();
                if !statement.is_empty() && statement != ";" {
                    statements.push(statement.to_string());
                }
                current.clear();
            }
            _ => {}
        }
    }

    let rest = current.trim();
    if !rest.is_empty() {
        statements.push(rest.to_string());
    }
    statements
}

/// Strip comments and collapse all whitespace runs to single spaces.
pub fn compact_sql(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    let mut in_single = false;

    while let Some(ch) = chars.next() {
        if !in_single && ch == '-' && chars.peek() == Some(&'-') {
            for c in chars.by_ref() {
                if c == '\n' {
                    out.push('\n');
                    break;
                }
            }
            continue;
        }
        if !in_single && ch == '/' && chars.peek() == Some(&'*') {
            chars.next();
            let mut prev = '\0';
            for c in chars.by_ref() {
                if prev == '*' && c == '/' {
                    break;
                }
                prev = c;
            }
            continue;
        }
        if ch == '\'' {
            in_single = !in_single;
        }
        out.push(ch);
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_ignores_semicolons_in_strings_and_comments() {
        let sql = "SELECT ';' FROM person; -- trailing; comment\n\
                   /* block; */ SELECT 2;;\n  SELECT 3";
        let statements = split_statements(sql);
        assert_eq!(
            statements,
            vec![
                "SELECT ';' FROM person;",
                "-- trailing; comment\n/* block; */ SELECT 2;",
                "SELECT 3",
            ]
        );
    }

    #[test]
    fn split_of_blank_input_is_empty() {
        assert!(split_statements("  ;  \n").is_empty());
    }

    #[test]
    fn compact_strips_comments_and_whitespace() {
        let sql = "SELECT  *\n  FROM person -- who\n /* all */ WHERE name = '--x'";
        assert_eq!(compact_sql(sql), "SELECT * FROM person WHERE name = '--x'");
    }
}
