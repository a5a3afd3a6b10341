mod support;

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use support::{fixture_dir, unique_temp_dir};

fn run_cli(args: &[&str], report: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_omop-sql-lint"))
        .args(args)
        .arg("--output")
        .arg(report)
        .env_remove("OMOP_SQL_LINT_DIALECT")
        .env_remove("RUST_LOG")
        .output()
        .expect("should run omop-sql-lint binary")
}

fn read_report(path: &Path) -> serde_json::Value {
    let text = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
    serde_json::from_str(&text).expect("report should be JSON")
}

fn fixture_input(fixture: &str) -> String {
    fixture_dir(fixture)
        .join("input.sql")
        .to_string_lossy()
        .into_owned()
}

#[test]
fn cli_multi_query_input_writes_summary_and_exits_one() {
    let temp = unique_temp_dir("omop_sql_lint_multi");
    let report_path = temp.join("out").join("report.json");

    let output = run_cli(&[&fixture_input("cohort_queries")], &report_path);
    assert_eq!(
        output.status.code(),
        Some(1),
        "expected exit code 1 for a query with errors, got {:?}",
        output.status
    );

    let report = read_report(&report_path);
    assert_eq!(report["total_queries"], 2);
    assert_eq!(report["valid_queries"], 1);
    assert_eq!(report["invalid_queries"], 1);

    let first = &report["results"][0];
    assert_eq!(first["query_index"], 1);
    assert_eq!(first["is_valid"], false);
    assert!(first["violations"]
        .as_array()
        .expect("violations array")
        .iter()
        .any(|v| v["rule_id"] == "vocabulary.no_string_identification"));

    let second = &report["results"][1];
    assert_eq!(second["query_index"], 2);
    assert_eq!(second["query"], "SELECT person_id FROM person;");
    assert!(second.get("violations").is_none());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Validation INVALID"), "stdout was:\n{stdout}");
    assert!(stdout.contains("Total queries: 2"), "stdout was:\n{stdout}");
    assert!(stdout.contains("Report saved to:"), "stdout was:\n{stdout}");
}

#[test]
fn cli_combined_mode_writes_a_single_report() {
    let temp = unique_temp_dir("omop_sql_lint_combined");
    let report_path = temp.join("report.json");

    let output = run_cli(&[&fixture_input("cohort_queries"), "--combined"], &report_path);
    assert_eq!(output.status.code(), Some(1));

    let report = read_report(&report_path);
    assert!(report.get("total_queries").is_none());
    assert!(report.get("query_index").is_none());
    assert_eq!(report["dialect"], "postgres");
    assert_eq!(report["is_valid"], false);
}

#[test]
fn cli_clean_query_exits_zero() {
    let temp = unique_temp_dir("omop_sql_lint_clean");
    let report_path = temp.join("report.json");

    let output = run_cli(&[&fixture_input("clean_query")], &report_path);
    assert_eq!(
        output.status.code(),
        Some(0),
        "stderr was:\n{}",
        String::from_utf8_lossy(&output.stderr)
    );
    let report = read_report(&report_path);
    assert_eq!(report["is_valid"], true);
    assert_eq!(report["error_count"], 0);
}

#[test]
fn cli_rule_selection_limits_reported_rules() {
    let temp = unique_temp_dir("omop_sql_lint_rules");
    let report_path = temp.join("report.json");

    let output = run_cli(
        &[
            &fixture_input("vocabulary_lookups"),
            "--rules",
            "vocabulary.no_string_identification",
            "semantic.domain_segregation",
        ],
        &report_path,
    );
    assert_eq!(output.status.code(), Some(0));
    let report = read_report(&report_path);
    assert!(report.get("violations").is_none(), "report was {report}");
}

#[test]
fn cli_reads_sql_from_stdin() {
    let temp = unique_temp_dir("omop_sql_lint_stdin");
    let report_path = temp.join("report.json");

    let mut child = Command::new(env!("CARGO_BIN_EXE_omop-sql-lint"))
        .arg("--output")
        .arg(&report_path)
        .arg("--categories")
        .arg("vocabulary")
        .env_remove("OMOP_SQL_LINT_DIALECT")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("should spawn omop-sql-lint binary");
    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(b"SELECT c.concept_id FROM concept c WHERE c.concept_code = 'E11.9'")
        .expect("should write SQL to stdin");
    let output = child.wait_with_output().expect("should wait for binary");

    assert_eq!(output.status.code(), Some(1));
    let report = read_report(&report_path);
    let violations = report["violations"].as_array().expect("violations array");
    assert!(violations
        .iter()
        .all(|v| v["rule_id"].as_str().is_some_and(|id| id.starts_with("vocabulary."))));
}

#[test]
fn cli_unparsable_sql_is_valid_with_a_warning() {
    let temp = unique_temp_dir("omop_sql_lint_parse_err");
    let input_path = temp.join("broken.sql");
    let report_path = temp.join("report.json");
    std::fs::write(&input_path, "SELEC person_id FROM WHERE").expect("should write input");

    let output = run_cli(&[&input_path.to_string_lossy()], &report_path);
    assert_eq!(output.status.code(), Some(0));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("query not validated"), "stderr was:\n{stderr}");
    assert_eq!(read_report(&report_path)["is_valid"], true);
}

#[test]
fn cli_usage_errors_exit_two() {
    let temp = unique_temp_dir("omop_sql_lint_usage");
    let report_path = temp.join("report.json");
    let input = fixture_input("clean_query");

    let unknown_rule = run_cli(&[&input, "--rules", "semantic.nope"], &report_path);
    assert_eq!(unknown_rule.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&unknown_rule.stderr);
    assert!(stderr.contains("'semantic.nope' not found"), "stderr was:\n{stderr}");

    let unknown_dialect = run_cli(&[&input, "--dialect", "cobol"], &report_path);
    assert_eq!(unknown_dialect.status.code(), Some(2));

    let conflicting = run_cli(
        &[&input, "--rules", "semantic.domain_segregation", "--categories", "semantic"],
        &report_path,
    );
    assert_eq!(conflicting.status.code(), Some(2));

    let missing = run_cli(&[&temp.join("missing.sql").to_string_lossy()], &report_path);
    assert_eq!(missing.status.code(), Some(2));

    assert!(!report_path.exists(), "no report should be written on usage errors");
}

#[test]
fn cli_list_rules_prints_every_rule() {
    let output = Command::new(env!("CARGO_BIN_EXE_omop-sql-lint"))
        .arg("--list-rules")
        .output()
        .expect("should run omop-sql-lint binary");
    assert_eq!(output.status.code(), Some(0));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 15, "stdout was:\n{stdout}");
    assert!(stdout.lines().next().is_some_and(|l| l.starts_with("semantic.domain_segregation")));
    assert!(stdout.contains("vocabulary.schema_validation"));
}
