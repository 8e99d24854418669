use super::*;
use crate::function::FunctionRegistry;
use crate::test_utils::*;

/// `Filter(pred(a)) over Project(a, s := score(a, b, c)) over t`
fn scored_plan(registry: &FunctionRegistry, op: &str, bound: i64) -> (Rel, Rel) {
    let t = int_source("t", &["a", "b", "c"]);
    let scored = t
        .project(vec![
            ("a", t.col("a").unwrap()),
            (
                "s",
                call(
                    registry,
                    "score",
                    vec![t.col("a").unwrap(), t.col("b").unwrap(), t.col("c").unwrap()],
                ),
            ),
        ])
        .unwrap();
    let plan = scored
        .filter(vec![call(registry, op, vec![scored.col("a").unwrap(), lit(bound)])])
        .unwrap();
    (t, plan)
}

fn score_column(plan: &Rel) -> Expr {
    let RelOp::Filter { input, .. } = plan.op() else {
        panic!("expected filter");
    };
    let RelOp::Project { columns, .. } = input.op() else {
        panic!("expected project");
    };
    columns[1].1.clone()
}

#[test]
fn test_specializes_udf_under_filter() {
    let registry = registry();
    let (_, plan) = scored_plan(&registry, "lt", 10);

    let rewritten = PredicatePushdownUdf.apply(&plan).unwrap().unwrap();
    assert_eq!(rewritten.schema(), plan.schema());

    let s = score_column(&rewritten);
    let ExprKind::Call { func, .. } = s.kind() else {
        panic!("expected call");
    };
    assert!(func.is_specialized());
    assert!(s.to_string().starts_with("score[specialized]("));

    // The filter itself is unchanged
    let RelOp::Filter { predicates, .. } = rewritten.op() else {
        panic!("expected filter");
    };
    assert_eq!(predicates[0].to_string(), "lt(#a, 10)");
}

#[test]
fn test_specialized_body_matches_reference_in_domain() {
    let registry = registry();
    let (_, plan) = scored_plan(&registry, "lt", 10);
    let rewritten = PredicatePushdownUdf.apply(&plan).unwrap().unwrap();
    let s = score_column(&rewritten);
    let ExprKind::Call { func, .. } = s.kind() else {
        panic!("expected call");
    };
    for a in [-5, 0, 9, 10, 42] {
        let args = [
            ScalarValue::Integer(a),
            ScalarValue::Integer(3),
            ScalarValue::Integer(4),
        ];
        assert_eq!(
            func.evaluate(&args).unwrap(),
            ScalarValue::Integer(score_reference(a, 3, 4))
        );
    }
}

#[test]
fn test_literal_on_left_is_flipped() {
    let registry = registry();
    let t = int_source("t", &["a", "b", "c"]);
    let scored = t
        .project(vec![
            ("a", t.col("a").unwrap()),
            (
                "s",
                call(
                    &registry,
                    "score",
                    vec![t.col("a").unwrap(), t.col("b").unwrap(), t.col("c").unwrap()],
                ),
            ),
        ])
        .unwrap();
    // 20 <= a, i.e. a >= 20
    let plan = scored
        .filter(vec![call(&registry, "lt_eq", vec![lit(20), scored.col("a").unwrap()])])
        .unwrap();
    let rewritten = PredicatePushdownUdf.apply(&plan).unwrap().unwrap();
    let s = score_column(&rewritten);
    let ExprKind::Call { func, .. } = s.kind() else {
        panic!("expected call");
    };
    assert!(func.identity().ends_with("[a>=20]"));
}

#[test]
fn test_conjunction_is_split() {
    let registry = registry();
    let t = int_source("t", &["a", "b", "c"]);
    let scored = t
        .project(vec![
            ("a", t.col("a").unwrap()),
            ("b", t.col("b").unwrap()),
            (
                "s",
                call(
                    &registry,
                    "score",
                    vec![t.col("a").unwrap(), t.col("b").unwrap(), t.col("c").unwrap()],
                ),
            ),
        ])
        .unwrap();
    let pred = call(
        &registry,
        "and",
        vec![
            call(&registry, "gt", vec![scored.col("b").unwrap(), lit(0)]),
            call(&registry, "eq", vec![scored.col("a").unwrap(), lit(3)]),
        ],
    );
    let plan = scored.filter(vec![pred]).unwrap();
    let rewritten = PredicatePushdownUdf.apply(&plan).unwrap().unwrap();
    let RelOp::Filter { input, .. } = rewritten.op() else {
        panic!("expected filter");
    };
    let RelOp::Project { columns, .. } = input.op() else {
        panic!("expected project");
    };
    let ExprKind::Call { func, .. } = columns[2].1.kind() else {
        panic!("expected call");
    };
    assert!(func.identity().ends_with("[a=3, b>0]"));
}

#[test]
fn test_specializer_decline_is_reported() {
    let registry = registry();
    let (_, plan) = scored_plan(&registry, "lt", 50);
    let err = PredicatePushdownUdf.apply(&plan).unwrap_err();
    assert!(matches!(err, RewriteSafetyError::SpecializerDeclined(_)));
}

#[test]
fn test_already_specialized_declines() {
    let registry = registry();
    let (_, plan) = scored_plan(&registry, "lt", 10);
    let once = PredicatePushdownUdf.apply(&plan).unwrap().unwrap();
    let err = PredicatePushdownUdf.apply(&once).unwrap_err();
    assert!(matches!(err, RewriteSafetyError::AlreadySpecialized(_)));
}

#[test]
fn test_volatile_udf_declines() {
    let mut registry = registry();
    registry.register(volatile_score_udf()).unwrap();
    let (_, plan) = scored_plan(&registry, "lt", 10);
    let err = PredicatePushdownUdf.apply(&plan).unwrap_err();
    assert!(matches!(err, RewriteSafetyError::VolatileCall(_)));
}

#[test]
fn test_filter_on_computed_column_no_match() {
    let registry = registry();
    let t = int_source("t", &["a", "b", "c"]);
    let scored = t
        .project(vec![(
            "s",
            call(
                &registry,
                "score",
                vec![t.col("a").unwrap(), t.col("b").unwrap(), t.col("c").unwrap()],
            ),
        )])
        .unwrap();
    let plan = scored
        .filter(vec![call(&registry, "lt", vec![scored.col("s").unwrap(), lit(10)])])
        .unwrap();
    assert!(PredicatePushdownUdf.apply(&plan).unwrap().is_none());
}

#[test]
fn test_builtin_calls_untouched() {
    let registry = registry();
    let t = int_source("t", &["a"]);
    let doubled = t
        .project(vec![
            ("a", t.col("a").unwrap()),
            ("d", call(&registry, "multiply", vec![t.col("a").unwrap(), lit(2)])),
        ])
        .unwrap();
    let plan = doubled
        .filter(vec![call(&registry, "lt", vec![doubled.col("a").unwrap(), lit(5)])])
        .unwrap();
    assert!(PredicatePushdownUdf.apply(&plan).unwrap().is_none());
}
