use super::*;

#[test]
fn test_default_rule_order() {
    let rules = RuleSet::with_defaults();
    assert_eq!(rules.rule_names(), RULE_NAMES.to_vec());
    assert_eq!(rules.len(), 4);
    assert!(!rules.is_empty());
}

#[test]
fn test_none_is_empty() {
    let rules = RuleSet::none();
    assert!(rules.is_empty());
    assert_eq!(format!("{rules:?}"), "[]");
}

#[test]
fn test_from_config_respects_switches() {
    let config = RuleConfig {
        constant_folding: false,
        column_pruning: false,
        ..RuleConfig::default()
    };
    let rules = RuleSet::from_config(&config);
    assert_eq!(
        rules.rule_names(),
        vec!["filter_coalescing", "predicate_pushdown_udf"]
    );

    let rules = RuleSet::from_config(&RuleConfig::none());
    assert!(rules.is_empty());
}

#[test]
fn test_every_rule_has_description() {
    for (name, description) in RuleSet::with_defaults().descriptions() {
        assert!(RULE_NAMES.contains(&name));
        assert!(!description.is_empty());
    }
}

#[test]
fn test_safety_error_messages() {
    let err = RewriteSafetyError::SpecializerDeclined("score".to_string());
    assert_eq!(err.to_string(), "specializer of 'score' declined");
    let err = RewriteSafetyError::from(crate::error::PlanError::UnknownFunction {
        name: "f".to_string(),
    });
    assert!(err.to_string().starts_with("rebuild failed: [P011]"));
}
