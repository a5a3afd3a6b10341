use omop_sql_lint::analysis::aliases::AliasMap;
use omop_sql_lint::analysis::joins::JoinGraph;
use omop_sql_lint::parser::sql_parser::parse_statements;
use omop_sql_lint::parser::tree::StatementTree;

fn parse_one(sql: &str) -> StatementTree {
    let mut trees = parse_statements(sql, "postgres").expect("SQL should parse");
    assert_eq!(trees.len(), 1);
    trees.remove(0)
}

#[test]
fn alias_resolution_is_idempotent() {
    let tree = parse_one(
        "WITH t2d AS (SELECT person_id FROM condition_occurrence co WHERE co.condition_concept_id = 201826) \
         SELECT p.person_id FROM person p JOIN t2d ON p.person_id = t2d.person_id",
    );
    let aliases = AliasMap::build(&tree);

    assert_eq!(aliases.resolve("co"), Some("condition_occurrence"));
    assert_eq!(aliases.resolve("P"), Some("person"));
    for table in aliases.tables() {
        assert_eq!(aliases.resolve(table), Some(table), "{table} should resolve to itself");
    }
    assert_eq!(aliases.resolve("t2d"), Some("t2d"));
    assert_eq!(aliases.resolve("missing"), None);
}

#[test]
fn statements_without_joins_have_no_edges() {
    for sql in [
        "SELECT person_id FROM person WHERE person_id = 1",
        "SELECT co.person_id FROM condition_occurrence co, person p WHERE co.person_id = p.person_id",
        "SELECT person_id FROM drug_exposure WHERE person_id IN (SELECT person_id FROM person)",
    ] {
        let tree = parse_one(sql);
        let joins = JoinGraph::build(&tree, &AliasMap::build(&tree));
        assert!(joins.is_empty(), "expected no join edges for {sql}");
    }
}

#[test]
fn join_equalities_are_mirrored() {
    let tree = parse_one(
        "SELECT co.person_id FROM condition_occurrence co \
         JOIN concept c ON co.condition_concept_id = c.concept_id",
    );
    let joins = JoinGraph::build(&tree, &AliasMap::build(&tree));
    assert_eq!(joins.conditions().len(), 1);
    assert_eq!(joins.edges().len(), 2);
    assert!(joins.edges().iter().all(|e| e.connects(
        ("condition_occurrence", "condition_concept_id"),
        ("concept", "concept_id")
    )));
    let left_tables: Vec<&str> = joins.edges().iter().map(|e| e.left.table.as_str()).collect();
    assert_eq!(left_tables, vec!["condition_occurrence", "concept"]);
    assert_eq!(
        joins
            .neighbors("concept", "concept_id")
            .map(ToString::to_string)
            .collect::<Vec<_>>(),
        vec!["condition_occurrence.condition_concept_id"]
    );
}
