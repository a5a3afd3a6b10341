mod support;

use omop_sql_lint::{validate, RuleSelection, Severity, ValidationError};
use support::{read_fixture_sql, registry, rule_ids, validate_all, validate_with};

const DOMAIN_BASE: &str = "SELECT co.person_id FROM condition_occurrence co \
                           JOIN concept c ON co.condition_concept_id = c.concept_id";

const LEAKAGE_BASE: &str = "SELECT co.person_id FROM condition_occurrence co \
                            JOIN drug_exposure de ON co.person_id = de.person_id";

#[test]
fn domain_segregation_distinguishes_matching_wrong_and_missing_domains() {
    let rule = ["semantic.domain_segregation"];

    let matching = validate_with(&format!("{DOMAIN_BASE} WHERE c.domain_id = 'Condition'"), &rule);
    assert!(matching.is_empty(), "matching domain should pass, got {matching:?}");

    let wrong = validate_with(&format!("{DOMAIN_BASE} WHERE c.domain_id = 'Procedure'"), &rule);
    assert_eq!(wrong.len(), 1, "got {wrong:?}");
    assert_eq!(wrong[0].severity, Severity::Error);
    assert!(
        wrong[0].message.contains("condition_occurrence.condition_concept_id"),
        "message should name the concept column, got: {}",
        wrong[0].message
    );

    let missing = validate_with(DOMAIN_BASE, &rule);
    assert_eq!(missing.len(), 1, "got {missing:?}");
    assert_eq!(missing[0].severity, Severity::Warning);
}

#[test]
fn hierarchy_expansion_exempts_the_unmapped_sentinel() {
    let rule = ["semantic.hierarchy_expansion_required"];

    let direct = validate_with(
        "SELECT person_id FROM drug_exposure WHERE drug_concept_id = 1234567",
        &rule,
    );
    assert_eq!(direct.len(), 1, "got {direct:?}");
    assert_eq!(direct[0].severity, Severity::Error);

    let unmapped = validate_with(
        "SELECT person_id FROM drug_exposure WHERE drug_concept_id = 0",
        &rule,
    );
    assert!(unmapped.is_empty(), "concept_id 0 should be exempt, got {unmapped:?}");
}

#[test]
fn future_leakage_is_direction_agnostic_and_bounded_by_observation_period() {
    let rule = ["semantic.future_information_leakage"];

    let gt = validate_with(
        &format!("{LEAKAGE_BASE} WHERE co.condition_start_date > de.drug_exposure_start_date"),
        &rule,
    );
    assert_eq!(gt.len(), 1, "got {gt:?}");
    assert_eq!(gt[0].severity, Severity::Warning);

    let lt = validate_with(
        &format!("{LEAKAGE_BASE} WHERE de.drug_exposure_start_date < co.condition_start_date"),
        &rule,
    );
    assert_eq!(gt, lt, "LT form should report the same leakage as GT form");

    let bounded = validate_with(
        &format!(
            "{LEAKAGE_BASE} JOIN observation_period op ON co.person_id = op.person_id \
             WHERE co.condition_start_date > de.drug_exposure_start_date \
             AND co.condition_start_date <= op.observation_period_end_date"
        ),
        &rule,
    );
    assert!(bounded.is_empty(), "bounded comparison should pass, got {bounded:?}");
}

#[test]
fn concept_code_pairing_reports_each_alias_separately() {
    let sql = "SELECT c1.concept_id FROM concept c1 \
               JOIN concept c2 ON c1.concept_id = c2.concept_id \
               WHERE c1.concept_code = 'E11' AND c2.concept_code = 'I10'";
    let violations = validate_with(sql, &["vocabulary.concept_code_requires_vocabulary_id"]);
    assert_eq!(violations.len(), 2, "got {violations:?}");
    assert!(violations[0].message.contains("c1.concept_code"));
    assert!(violations[1].message.contains("c2.concept_code"));
}

#[test]
fn validation_is_deterministic() {
    let sql = read_fixture_sql("cohort_queries");
    let first = validate_all(&sql);
    let second = validate_all(&sql);
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn rule_subset_never_reports_other_rules() {
    let queries = [
        read_fixture_sql("cohort_queries"),
        read_fixture_sql("vocabulary_lookups"),
        format!("{DOMAIN_BASE} WHERE c.domain_id = 'Procedure' AND co.condition_concept_id = 201826"),
        format!("{LEAKAGE_BASE} WHERE co.condition_start_date > de.drug_exposure_start_date"),
    ];
    let subset = [
        "semantic.observation_period_anchoring",
        "vocabulary.no_string_identification",
    ];
    for sql in &queries {
        let violations = validate_with(sql, &subset);
        for id in rule_ids(&violations) {
            assert!(subset.contains(&id), "unexpected rule {id} for {sql}");
        }
    }
}

#[test]
fn category_selection_only_runs_that_category() {
    let sql = format!(
        "{DOMAIN_BASE} WHERE c.concept_name = 'Type 2 diabetes mellitus' \
         AND co.condition_concept_id = 201826"
    );
    let selection = RuleSelection::Categories(vec!["vocabulary".to_string()]);
    let violations = validate(&registry(), &sql, "postgres", &selection).expect("valid selection");
    assert!(!violations.is_empty());
    assert!(violations.iter().all(|v| v.rule_id.starts_with("vocabulary.")));
}

#[test]
fn violations_are_grouped_by_rule_in_registry_order() {
    let sql = read_fixture_sql("cohort_queries");
    let violations = validate_all(&sql);
    let registry = registry();
    let order: Vec<&str> = registry.ids().collect();
    let positions: Vec<usize> = rule_ids(&violations)
        .into_iter()
        .map(|id| order.iter().position(|o| *o == id).expect("registered rule"))
        .collect();
    assert!(
        positions.windows(2).all(|w| w[0] <= w[1]),
        "violations should follow registry order, got {:?}",
        rule_ids(&violations)
    );
}

#[test]
fn unparsable_sql_yields_no_violations() {
    let violations = validate_all("SELEC person_id FROM WHERE");
    assert!(violations.is_empty(), "got {violations:?}");
}

#[test]
fn unknown_dialect_and_rule_are_caller_errors() {
    let registry = registry();
    let err = validate(&registry, "SELECT 1", "cobol", &RuleSelection::All)
        .expect_err("dialect should be rejected");
    assert_eq!(err, ValidationError::UnknownDialect("cobol".to_string()));

    let selection = RuleSelection::Rules(vec!["semantic.nope".to_string()]);
    let err = validate(&registry, "SELECT 1", "postgres", &selection)
        .expect_err("rule should be rejected");
    let message = err.to_string();
    assert!(message.contains("'semantic.nope' not found"), "got: {message}");
    assert!(message.contains("semantic.domain_segregation"), "got: {message}");
}

#[test]
fn violation_json_uses_stable_field_names() {
    let violations = validate_with(
        &read_fixture_sql("vocabulary_lookups"),
        &["vocabulary.concept_code_requires_vocabulary_id"],
    );
    assert_eq!(violations.len(), 1);
    let value = serde_json::to_value(&violations[0]).expect("violation should serialize");
    assert_eq!(value["rule_id"], "vocabulary.concept_code_requires_vocabulary_id");
    assert_eq!(value["severity"], "error");
    assert_eq!(
        value["issue"],
        "concept_code filtered without vocabulary_id: c.concept_code = 'E11.9'"
    );
    assert!(value["suggested_fix"].is_string());
    assert!(value.get("location").is_none());
}
