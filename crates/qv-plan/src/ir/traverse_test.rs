use super::*;
use crate::ir::rel::RelOp;
use crate::test_utils::*;

#[test]
fn test_transform_up_keep_returns_same_plan() {
    let registry = registry();
    let t = int_source("t", &["x", "y"]);
    let plan = t
        .filter(vec![call(&registry, "gt", vec![t.col("x").unwrap(), lit(1)])])
        .unwrap();
    let out = plan.transform_up(&mut |_| Ok(Transformed::Keep)).unwrap();
    assert_eq!(out.id(), plan.id());
}

#[test]
fn test_transform_up_visits_shared_node_once() {
    let t = int_source("t", &["x"]);
    let shared = t.limit(Some(10), 0).unwrap();
    let other = shared.alias("other").unwrap();
    let plan = shared.union(&other, false).unwrap();

    let mut visits = 0;
    plan.transform_up(&mut |rel| {
        if matches!(rel.op(), RelOp::Limit { .. }) {
            visits += 1;
        }
        Ok(Transformed::Keep)
    })
    .unwrap();
    assert_eq!(visits, 1);
}

#[test]
fn test_replacing_source_rebinds_consumers() {
    let registry = registry();
    let t = int_source("t", &["x", "y"]);
    let wider = int_source("t2", &["w", "x", "y"]);
    let plan = t
        .filter(vec![call(&registry, "gt", vec![t.col("y").unwrap(), lit(1)])])
        .unwrap()
        .project(vec![("x", t.col("x").unwrap())])
        .unwrap();

    let out = plan
        .transform_up(&mut |rel| {
            if rel.id() == t.id() {
                Ok(Transformed::Replace(wider.clone()))
            } else {
                Ok(Transformed::Keep)
            }
        })
        .unwrap();

    assert_ne!(out.id(), plan.id());
    assert_eq!(out.schema().column_names(), vec!["x"]);
    let RelOp::Project { input, .. } = out.op() else {
        panic!("expected project");
    };
    let RelOp::Filter { input: base, predicates } = input.op() else {
        panic!("expected filter");
    };
    assert_eq!(base.id(), wider.id());
    let field = &predicates[0].fields()[0];
    assert_eq!(field.relation().id(), wider.id());
    assert_eq!(field.index(), 2);
}

#[test]
fn test_with_new_inputs_checks_arity() {
    let t = int_source("t", &["x"]);
    let filtered = t.limit(Some(1), 0).unwrap();
    assert!(filtered.with_new_inputs(vec![]).is_err());
}

#[test]
fn test_with_new_inputs_missing_column_fails() {
    let registry = registry();
    let t = int_source("t", &["x", "y"]);
    let plan = t
        .filter(vec![call(&registry, "gt", vec![t.col("y").unwrap(), lit(1)])])
        .unwrap();
    let narrower = int_source("t", &["x"]);
    assert!(plan.with_new_inputs(vec![narrower]).is_err());
}

#[test]
fn test_expr_transform_up_rebuilds_parents() {
    let registry = registry();
    let t = int_source("t", &["x"]);
    let e = call(
        &registry,
        "multiply",
        vec![call(&registry, "add", vec![lit(1), lit(2)]), t.col("x").unwrap()],
    );
    let out = e
        .transform_up(&mut |node| {
            if node.as_literal() == Some(&qv_core::ScalarValue::Integer(2)) {
                Ok(Transformed::Replace(lit(5)))
            } else {
                Ok(Transformed::Keep)
            }
        })
        .unwrap();
    assert_eq!(out.to_string(), "multiply(add(1, 5), #x)");
    assert_eq!(e.to_string(), "multiply(add(1, 2), #x)");
}

#[test]
fn test_map_expressions_preserves_inputs() {
    let registry = registry();
    let t = int_source("t", &["x"]);
    let plan = t
        .project(vec![("y", call(&registry, "add", vec![t.col("x").unwrap(), lit(1)]))])
        .unwrap();
    let out = plan
        .map_expressions(&mut |_| Ok(t.col("x").unwrap()))
        .unwrap();
    assert_eq!(out.inputs()[0].id(), t.id());
    assert_eq!(out.schema().column_names(), vec!["y"]);
}

#[test]
fn test_transformed_is_replaced() {
    assert!(Transformed::Replace(1).is_replaced());
    assert!(!Transformed::<i32>::Keep.is_replaced());
}
