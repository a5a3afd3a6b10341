#![allow(dead_code)]

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use omop_sql_lint::{default_registry, validate, RuleRegistry, RuleSelection, Violation};

pub(crate) fn fixture_dir(fixture: &str) -> PathBuf {
    PathBuf::from("tests/fixtures").join(fixture)
}

pub(crate) fn read_fixture_sql(fixture: &str) -> String {
    let path = fixture_dir(fixture).join("input.sql");
    std::fs::read_to_string(path).expect("fixture SQL should be readable")
}

pub(crate) fn registry() -> RuleRegistry {
    default_registry().expect("built-in rules should register")
}

pub(crate) fn validate_all(sql: &str) -> Vec<Violation> {
    validate(&registry(), sql, "postgres", &RuleSelection::All).expect("selection should be valid")
}

pub(crate) fn validate_with(sql: &str, rule_ids: &[&str]) -> Vec<Violation> {
    let selection = RuleSelection::Rules(rule_ids.iter().map(|id| id.to_string()).collect());
    validate(&registry(), sql, "postgres", &selection).expect("selection should be valid")
}

pub(crate) fn rule_ids(violations: &[Violation]) -> Vec<&str> {
    violations.iter().map(|v| v.rule_id.as_str()).collect()
}

pub(crate) fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("{prefix}_{nanos}"));
    std::fs::create_dir_all(&dir).expect("should create temp dir");
    dir
}
