use sqlparser::ast::{Expr, Value};

use crate::parser::names::normalize_ident;
use crate::parser::tree::{ColumnRef, Literal};

/// Extract a column reference from an identifier expression.
///
/// Plain identifiers (`person_id`) are unqualified; for compound identifiers
/// (`cdm.person.person_id`) the component before the column is the qualifier.
pub fn column_ref(expr: &Expr) -> Option<ColumnRef> {
    match expr {
        Expr::Identifier(ident) => Some(ColumnRef {
            qualifier: None,
            name: normalize_ident(ident),
        }),
        Expr::CompoundIdentifier(parts) => {
            let (last, rest) = parts.split_last()?;
            Some(ColumnRef {
                qualifier: rest.last().map(normalize_ident),
                name: normalize_ident(last),
            })
        }
        _ => None,
    }
}

/// Convert a parsed value into the tree's literal form.
pub fn literal_from_value(value: &Value) -> Literal {
    match value {
        Value::Number(n, _) => Literal::Number(n.to_string()),
        Value::SingleQuotedString(s)
        | Value::EscapedStringLiteral(s)
        | Value::NationalStringLiteral(s)
        | Value::DollarQuotedString(sqlparser::ast::DollarQuotedString { value: s, .. }) => {
            Literal::String(s.clone())
        }
        Value::Boolean(b) => Literal::Boolean(*b),
        Value::Null => Literal::Null,
        other => Literal::Other(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlparser::ast::Ident;
    use sqlparser::dialect::PostgreSqlDialect;
    use sqlparser::parser::Parser;

    fn parse_expr(sql: &str) -> Expr {
        Parser::new(&PostgreSqlDialect {})
            .try_with_sql(sql)
            .expect("tokenize")
            .parse_expr()
            .expect("parse expression")
    }

    #[test]
    fn column_ref_handles_simple_and_qualified_identifiers() {
        let simple = Expr::Identifier(Ident::new("Person_ID"));
        assert_eq!(
            column_ref(&simple),
            Some(ColumnRef {
                qualifier: None,
                name: "person_id".to_string()
            })
        );

        let qualified = parse_expr("cdm.co.condition_concept_id");
        assert_eq!(
            column_ref(&qualified),
            Some(ColumnRef {
                qualifier: Some("co".to_string()),
                name: "condition_concept_id".to_string()
            })
        );
        assert_eq!(column_ref(&parse_expr("1 + 2")), None);
    }

    #[test]
    fn literal_from_value_keeps_strings_and_numbers() {
        match parse_expr("'Maps to'") {
            Expr::Value(v) => assert_eq!(
                literal_from_value(&v.value),
                Literal::String("Maps to".to_string())
            ),
            other => panic!("expected a value, got {other:?}"),
        }
        match parse_expr("201826") {
            Expr::Value(v) => assert_eq!(literal_from_value(&v.value).as_integer(), Some(201826)),
            other => panic!("expected a value, got {other:?}"),
        }
    }
}
