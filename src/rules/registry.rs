use std::collections::HashMap;

use thiserror::Error;

use crate::rules::semantic::{
    DomainSegregation, FutureInformationLeakage, HierarchyExpansion, InvalidReasonEnforcement,
    JoinPathValidation, MapsToDirection, MeasurementUnitValidation, ObservationPeriodAnchoring,
    StandardConceptEnforcement, UnmappedConceptHandling,
};
use crate::rules::vocabulary::{
    ConceptCodeRequiresVocabularyId, ConceptLookupContext, ConceptNameLookup,
    NoStringIdentification, SchemaValidation,
};
use crate::rules::{Rule, RuleMeta};

/// Registry lookup and registration failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Two rules claimed the same id.
    #[error("Rule '{0}' is already registered")]
    DuplicateRule(String),
    /// No rule has the requested id.
    #[error("Rule '{id}' not found. Available: [{}]", available.join(", "))]
    UnknownRule {
        /// Requested id.
        id: String,
        /// Every registered id, in registration order.
        available: Vec<String>,
    },
    /// No rule belongs to the requested category.
    #[error("No rules in category '{category}'. Available: [{}]", available.join(", "))]
    UnknownCategory {
        /// Requested category.
        category: String,
        /// Every known category.
        available: Vec<String>,
    },
}

/// Catalogue of rules keyed by id, in registration order.
///
/// Built once and then only read, so a shared reference can serve any
/// number of concurrent validations.
#[derive(Default)]
pub struct RuleRegistry {
    rules: Vec<Box<dyn Rule>>,
    index: HashMap<&'static str, usize>,
}

impl RuleRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule. Registering an id twice is an error and leaves the
    /// registry unchanged.
    pub fn register<R: Rule + 'static>(&mut self, rule: R) -> Result<(), RegistryError> {
        let id = rule.meta().id;
        if self.index.contains_key(id) {
            return Err(RegistryError::DuplicateRule(id.to_string()));
        }
        tracing::debug!(rule = id, "registered rule");
        self.index.insert(id, self.rules.len());
        self.rules.push(Box::new(rule));
        Ok(())
    }

    /// The rule registered under `id`.
    pub fn get_rule(&self, id: &str) -> Result<&dyn Rule, RegistryError> {
        self.index
            .get(id)
            .map(|&i| &*self.rules[i])
            .ok_or_else(|| RegistryError::UnknownRule {
                id: id.to_string(),
                available: self.ids().map(str::to_string).collect(),
            })
    }

    /// Rules whose id starts with `category.`, in registration order.
    pub fn get_rules_by_category(&self, category: &str) -> Vec<&dyn Rule> {
        self.rules
            .iter()
            .filter(|rule| rule.meta().category() == category)
            .map(|rule| &**rule)
            .collect()
    }

    /// Every rule, in registration order.
    pub fn get_all_rules(&self) -> Vec<&dyn Rule> {
        self.rules.iter().map(|rule| &**rule).collect()
    }

    /// Metadata of every rule, in registration order.
    pub fn list_rules(&self) -> impl Iterator<Item = &RuleMeta> {
        self.rules.iter().map(|rule| rule.meta())
    }

    /// Registered ids, in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|rule| rule.meta().id)
    }

    /// Distinct categories, in order of first registration.
    pub fn categories(&self) -> Vec<&'static str> {
        let mut categories: Vec<&'static str> = Vec::new();
        for rule in &self.rules {
            let category = rule.meta().category();
            if !categories.contains(&category) {
                categories.push(category);
            }
        }
        categories
    }

    /// Number of registered rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.ids()).finish()
    }
}

/// Registry holding every built-in rule.
pub fn default_registry() -> Result<RuleRegistry, RegistryError> {
    let mut registry = RuleRegistry::new();
    registry.register(DomainSegregation)?;
    registry.register(HierarchyExpansion)?;
    registry.register(ObservationPeriodAnchoring)?;
    registry.register(FutureInformationLeakage)?;
    registry.register(JoinPathValidation)?;
    registry.register(StandardConceptEnforcement)?;
    registry.register(MapsToDirection)?;
    registry.register(UnmappedConceptHandling)?;
    registry.register(InvalidReasonEnforcement)?;
    registry.register(MeasurementUnitValidation)?;
    registry.register(ConceptLookupContext)?;
    registry.register(ConceptCodeRequiresVocabularyId)?;
    registry.register(NoStringIdentification)?;
    registry.register(ConceptNameLookup)?;
    registry.register(SchemaValidation)?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Severity, StatementContext, Violation};

    struct Fixed(RuleMeta);

    impl Rule for Fixed {
        fn meta(&self) -> &RuleMeta {
            &self.0
        }

        fn check(&self, _ctx: &StatementContext<'_>) -> Vec<Violation> {
            vec![Violation::new(&self.0, "always")]
        }
    }

    fn fixed(id: &'static str) -> Fixed {
        Fixed(RuleMeta {
            id,
            name: "Fixed",
            description: "Always fires",
            severity: Severity::Warning,
            suggested_fix: "None",
        })
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut registry = RuleRegistry::new();
        registry.register(fixed("custom.one")).expect("first registration");
        assert_eq!(
            registry.register(fixed("custom.one")),
            Err(RegistryError::DuplicateRule("custom.one".to_string()))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unknown_rule_lists_known_ids() {
        let mut registry = RuleRegistry::new();
        registry.register(fixed("custom.one")).expect("register");
        registry.register(fixed("custom.two")).expect("register");
        let err = registry.get_rule("custom.three").err().expect("missing rule");
        assert_eq!(
            err.to_string(),
            "Rule 'custom.three' not found. Available: [custom.one, custom.two]"
        );
    }

    #[test]
    fn category_lookup_matches_the_prefix_before_the_dot() {
        let mut registry = RuleRegistry::new();
        registry.register(fixed("semantic.a")).expect("register");
        registry.register(fixed("semanticx.b")).expect("register");
        registry.register(fixed("semantic.c")).expect("register");
        let ids: Vec<_> = registry
            .get_rules_by_category("semantic")
            .iter()
            .map(|r| r.meta().id)
            .collect();
        assert_eq!(ids, vec!["semantic.a", "semantic.c"]);
        assert_eq!(registry.categories(), vec!["semantic", "semanticx"]);
        assert!(registry.get_rules_by_category("vocabulary").is_empty());
    }

    #[test]
    fn default_registry_holds_every_builtin_rule() {
        let registry = default_registry().expect("built-in ids are unique");
        assert_eq!(registry.len(), 15);
        assert_eq!(registry.categories(), vec!["semantic", "vocabulary"]);
        assert_eq!(registry.get_rules_by_category("semantic").len(), 10);
        assert_eq!(registry.get_rules_by_category("vocabulary").len(), 5);
        for meta in registry.list_rules() {
            assert!(!meta.description.is_empty(), "{} lacks a description", meta.id);
            assert!(registry.get_rule(meta.id).is_ok());
        }
    }
}
