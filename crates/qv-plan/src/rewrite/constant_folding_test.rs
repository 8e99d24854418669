use super::*;
use crate::test_utils::*;
use qv_core::DataType;

#[test]
fn test_folds_immutable_arithmetic() {
    let registry = registry();
    let t = int_source("t", &["x"]);
    let sum = call(&registry, "add", vec![lit(1), lit(2)]);
    let plan = t
        .project(vec![
            ("x", t.col("x").unwrap()),
            ("three", sum),
        ])
        .unwrap();

    let folded = ConstantFolding.apply(&plan).unwrap().unwrap();
    let RelOp::Project { columns, .. } = folded.op() else {
        panic!("expected project");
    };
    assert_eq!(columns[1].1.as_literal(), Some(&ScalarValue::Integer(3)));
    assert_eq!(columns[1].1.data_type(), &DataType::int64());
    assert_eq!(folded.schema(), plan.schema());
}

#[test]
fn test_folds_nested_expression_around_column() {
    let registry = registry();
    let t = int_source("t", &["x"]);
    let e = call(
        &registry,
        "multiply",
        vec![t.col("x").unwrap(), call(&registry, "add", vec![lit(2), lit(3)])],
    );
    let mut declined = None;
    let folded = fold_expr(&e, &mut declined).unwrap();
    assert_eq!(folded.to_string(), "multiply(#x, 5)");
    assert!(declined.is_none());
}

#[test]
fn test_folds_cast_of_literal() {
    let e = lit(4).cast(DataType::float64()).unwrap();
    let mut declined = None;
    let folded = fold_expr(&e, &mut declined).unwrap();
    assert_eq!(folded.as_literal(), Some(&ScalarValue::Float(4.0)));
    assert_eq!(folded.data_type(), &DataType::float64());
}

#[test]
fn test_volatile_call_not_folded() {
    let mut registry = registry();
    let volatile = registry
        .get("add")
        .unwrap()
        .with_volatility(Volatility::Volatile);
    registry.insert(volatile);
    let e = call(&registry, "add", vec![lit(1), lit(2)]);
    let mut declined = None;
    let folded = fold_expr(&e, &mut declined).unwrap();
    assert_eq!(folded.id(), e.id());
}

#[test]
fn test_evaluation_error_declines() {
    let registry = registry();
    let t = int_source("t", &["x"]);
    let plan = t
        .project(vec![("bad", call(&registry, "divide", vec![lit(1), lit(0)]))])
        .unwrap();
    let err = ConstantFolding.apply(&plan).unwrap_err();
    assert!(matches!(err, RewriteSafetyError::EvaluationFailed { .. }));
}

#[test]
fn test_true_predicates_dropped() {
    let registry = registry();
    let t = int_source("t", &["x"]);
    let always = call(&registry, "lt", vec![lit(1), lit(2)]);
    let real = call(&registry, "gt", vec![t.col("x").unwrap(), lit(0)]);

    let plan = t.filter(vec![always.clone(), real.clone()]).unwrap();
    let folded = ConstantFolding.apply(&plan).unwrap().unwrap();
    let RelOp::Filter { predicates, .. } = folded.op() else {
        panic!("expected filter");
    };
    assert_eq!(predicates.len(), 1);
    assert_eq!(predicates[0].id(), real.id());

    let trivial = t.filter(vec![always]).unwrap();
    let folded = ConstantFolding.apply(&trivial).unwrap().unwrap();
    assert_eq!(folded.id(), t.id());
}

#[test]
fn test_false_predicate_kept() {
    let registry = registry();
    let t = int_source("t", &["x"]);
    let never = call(&registry, "gt", vec![lit(1), lit(2)]);
    let plan = t.filter(vec![never]).unwrap();
    let folded = ConstantFolding.apply(&plan).unwrap().unwrap();
    let RelOp::Filter { predicates, .. } = folded.op() else {
        panic!("expected filter");
    };
    assert_eq!(predicates[0].as_literal(), Some(&ScalarValue::Boolean(false)));
}

#[test]
fn test_no_expressions_no_change() {
    let t = int_source("t", &["x"]);
    assert!(ConstantFolding.apply(&t).unwrap().is_none());
    let limited = t.limit(Some(1), 0).unwrap();
    assert!(ConstantFolding.apply(&limited).unwrap().is_none());
}

#[test]
fn test_null_result_keeps_type() {
    let registry = registry();
    let e = call(
        &registry,
        "add",
        vec![lit(1), Expr::typed_literal(ScalarValue::Null, DataType::int64()).unwrap()],
    );
    let mut declined = None;
    let folded = fold_expr(&e, &mut declined).unwrap();
    assert!(folded.as_literal().is_some_and(|v| v.is_null()));
    assert_eq!(folded.data_type(), &DataType::int64());
}

#[test]
fn test_folded_branch_keeps_nullable_column() {
    let registry = registry();
    let t = int_source("t", &["x"]);
    let null = Expr::typed_literal(ScalarValue::Null, DataType::int64()).unwrap();
    let choice = call(&registry, "if_else", vec![Expr::literal(true), lit(1), null]);
    assert!(choice.nullability().is_nullable());
    let plan = t
        .project(vec![("x", t.col("x").unwrap()), ("z", choice)])
        .unwrap();

    let folded = ConstantFolding.apply(&plan).unwrap().unwrap();
    assert_eq!(folded.schema(), plan.schema());
    let RelOp::Project { columns, .. } = folded.op() else {
        panic!("expected a projection");
    };
    assert_eq!(columns[1].1.as_literal(), Some(&ScalarValue::Integer(1)));
    assert!(columns[1].1.nullability().is_nullable());
    assert_ne!(columns[1].1.id(), lit(1).id());
}

#[test]
fn test_overflowing_decimal_cast_declines() {
    let e = lit(100).cast(DataType::decimal(38, 37)).unwrap();
    let mut declined = None;
    let folded = fold_expr(&e, &mut declined).unwrap();
    assert_eq!(folded.id(), e.id());
    assert!(matches!(
        declined,
        Some(RewriteSafetyError::EvaluationFailed { .. })
    ));
}
