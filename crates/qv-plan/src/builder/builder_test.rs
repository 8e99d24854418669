use super::*;
use crate::error::ErrorKind;
use crate::function::aggregate::{AggregateFunc, WindowFrame, WindowFunc};
use crate::test_utils::*;
use qv_core::DataType;

fn sum(e: Expr) -> Expr {
    Expr::aggregate(AggregateFunc::Sum, vec![e], false).unwrap()
}

#[test]
fn test_source_requires_name() {
    assert!(Rel::source("", int_schema(&["x"])).is_err());
}

#[test]
fn test_unknown_column() {
    let t = int_source("t", &["x"]);
    let err = t.col("nope").unwrap_err();
    assert!(matches!(err, PlanError::UnresolvedColumn { .. }));
    assert_eq!(err.kind(), ErrorKind::AmbiguousReference);
}

#[test]
fn test_project_derives_schema() {
    let registry = registry();
    let t = int_source("t", &["x", "y"]);
    let plan = t
        .project(vec![
            ("x", t.col("x").unwrap()),
            ("ratio", call(&registry, "divide", vec![t.col("x").unwrap(), Expr::literal(2.5)])),
            ("maybe", Expr::literal(qv_core::ScalarValue::Null)),
        ])
        .unwrap();
    let schema = plan.schema();
    assert_eq!(schema.column_names(), vec!["x", "ratio", "maybe"]);
    assert_eq!(schema.field("ratio").unwrap().data_type, DataType::float64());
    assert!(!schema.field("x").unwrap().nullability.is_nullable());
    assert!(schema.field("maybe").unwrap().nullability.is_nullable());
}

#[test]
fn test_project_rejects_duplicates_and_empty() {
    let t = int_source("t", &["x"]);
    let dup = t.project(vec![("a", t.col("x").unwrap()), ("a", lit(1))]);
    assert_eq!(dup.unwrap_err().kind(), ErrorKind::Shape);
    let empty: Vec<(String, Expr)> = Vec::new();
    assert_eq!(t.project(empty).unwrap_err().kind(), ErrorKind::Shape);
}

#[test]
fn test_project_rejects_bare_aggregate() {
    let t = int_source("t", &["x"]);
    let err = t.project(vec![("s", sum(t.col("x").unwrap()))]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Shape);
}

#[test]
fn test_project_allows_window() {
    let t = int_source("t", &["g", "x"]);
    let running = Expr::window(
        WindowFunc::Aggregate(AggregateFunc::Sum),
        vec![t.col("x").unwrap()],
        vec![t.col("g").unwrap()],
        vec![crate::ir::expr::SortKey::asc(t.col("x").unwrap())],
        WindowFrame::running(),
    )
    .unwrap();
    let plan = t.project(vec![("running", running)]).unwrap();
    assert_eq!(plan.schema().len(), 1);
}

#[test]
fn test_filter_requires_boolean() {
    let t = int_source("t", &["x"]);
    let err = t.filter(vec![t.col("x").unwrap()]).unwrap_err();
    assert!(matches!(err, PlanError::NonBooleanPredicate { .. }));
    assert!(t.filter(vec![]).is_err());
}

#[test]
fn test_filter_binds_through_pass_through_operators() {
    let registry = registry();
    let t = int_source("t", &["x", "y"]);
    let limited = t.limit(Some(10), 0).unwrap();
    let plan = limited
        .filter(vec![call(&registry, "gt", vec![t.col("y").unwrap(), lit(0)])])
        .unwrap();
    let RelOp::Filter { predicates, .. } = plan.op() else {
        panic!("expected filter");
    };
    let field = &predicates[0].fields()[0];
    assert_eq!(field.relation().id(), limited.id());
    assert_eq!(field.index(), 1);
}

#[test]
fn test_foreign_reference_rejected() {
    let registry = registry();
    let t = int_source("t", &["x"]);
    let u = int_source("u", &["x"]);
    let err = t
        .filter(vec![call(&registry, "gt", vec![u.col("x").unwrap(), lit(0)])])
        .unwrap_err();
    match err {
        PlanError::ForeignReference { column, origin, .. } => {
            assert_eq!(column, "x");
            assert!(origin.starts_with("Source(u)"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_computed_column_not_traced() {
    let registry = registry();
    let t = int_source("t", &["x"]);
    let projected = t
        .project(vec![("x", call(&registry, "add", vec![t.col("x").unwrap(), lit(1)]))])
        .unwrap();
    // `t.x` is not visible above a projection that recomputes it
    let err = projected
        .filter(vec![call(&registry, "gt", vec![t.col("x").unwrap(), lit(0)])])
        .unwrap_err();
    assert!(matches!(err, PlanError::ForeignReference { .. }));
}

#[test]
fn test_aggregate_schema_keys_first() {
    let t = int_source("t", &["g", "x"]);
    let plan = t
        .aggregate(
            vec![("g", t.col("g").unwrap())],
            vec![
                ("total", sum(t.col("x").unwrap())),
                ("n", Expr::aggregate(AggregateFunc::CountStar, vec![], false).unwrap()),
            ],
        )
        .unwrap();
    assert_eq!(plan.schema().column_names(), vec!["g", "total", "n"]);
    assert!(plan.schema().field("total").unwrap().nullability.is_nullable());
    assert!(!plan.schema().field("n").unwrap().nullability.is_nullable());
}

#[test]
fn test_aggregate_metric_must_reduce_columns() {
    let registry = registry();
    let t = int_source("t", &["g", "x"]);
    let bad = call(&registry, "add", vec![sum(t.col("x").unwrap()), t.col("x").unwrap()]);
    let err = t
        .aggregate(vec![("g", t.col("g").unwrap())], vec![("bad", bad)])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Shape);

    let plain = t
        .aggregate(vec![("g", t.col("g").unwrap())], vec![("x", t.col("x").unwrap())])
        .unwrap_err();
    assert_eq!(plain.kind(), ErrorKind::Shape);

    let none: Vec<(String, Expr)> = Vec::new();
    assert!(t.aggregate(none.clone(), none).is_err());
}

#[test]
fn test_aggregate_metric_over_reduced_expression() {
    let registry = registry();
    let t = int_source("t", &["g", "x"]);
    let scaled = call(&registry, "multiply", vec![sum(t.col("x").unwrap()), lit(2)]);
    let plan = t
        .aggregate(vec![("g", t.col("g").unwrap())], vec![("scaled", scaled)])
        .unwrap();
    assert_eq!(plan.schema().len(), 2);
}

#[test]
fn test_sort_requires_orderable_keys() {
    let t = int_source("t", &["x"]);
    assert!(t.sort(vec![]).is_err());
    let sorted = t.sort(vec![SortKey::desc(t.col("x").unwrap())]).unwrap();
    assert_eq!(sorted.schema(), t.schema());
}

#[test]
fn test_join_renames_colliding_right_columns() {
    let registry = registry();
    let t = int_source("t", &["id", "v"]);
    let u = int_source("u", &["id", "w"]);
    let pred = call(&registry, "eq", vec![t.col("id").unwrap(), u.col("id").unwrap()]);
    let inner = t.join(&u, JoinKind::Inner, vec![pred.clone()]).unwrap();
    assert_eq!(inner.schema().column_names(), vec!["id", "v", "id_right", "w"]);
    assert!(!inner.schema().field("w").unwrap().nullability.is_nullable());

    let left = t.join(&u, JoinKind::Left, vec![pred.clone()]).unwrap();
    assert!(left.schema().field("w").unwrap().nullability.is_nullable());
    assert!(!left.schema().field("v").unwrap().nullability.is_nullable());

    let full = t.join(&u, JoinKind::Full, vec![pred.clone()]).unwrap();
    assert!(full.schema().fields().iter().all(|f| f.nullability.is_nullable()));

    let semi = t.join(&u, JoinKind::Semi, vec![pred]).unwrap();
    assert_eq!(semi.schema(), t.schema());
}

#[test]
fn test_join_second_collision_is_ambiguous() {
    let t = int_source("t", &["id", "id_right"]);
    let u = int_source("u", &["id"]);
    let err = t.join(&u, JoinKind::Inner, vec![]).unwrap_err();
    assert!(matches!(err, PlanError::AmbiguousColumn { .. }));
}

#[test]
fn test_self_join_requires_alias() {
    let registry = registry();
    let t = int_source("t", &["id", "parent"]);
    let err = t.join(&t, JoinKind::Inner, vec![]).unwrap_err();
    assert!(matches!(err, PlanError::SelfJoin { .. }));

    let parent = t.alias("parent").unwrap();
    let pred = call(
        &registry,
        "eq",
        vec![t.col("parent").unwrap(), parent.col("id").unwrap()],
    );
    let joined = t.join(&parent, JoinKind::Inner, vec![pred]).unwrap();
    assert_eq!(
        joined.schema().column_names(),
        vec!["id", "parent", "id_right", "parent_right"]
    );
}

#[test]
fn test_join_predicate_must_be_boolean() {
    let t = int_source("t", &["id"]);
    let u = int_source("u", &["k"]);
    let err = t
        .join(&u, JoinKind::Inner, vec![u.col("k").unwrap()])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Type);
}

#[test]
fn test_set_op_unifies_types() {
    let t = int_source("t", &["x"]);
    let narrow = Rel::source(
        "u",
        qv_core::Schema::try_new(vec![qv_core::Field::nullable("x", DataType::int32())]).unwrap(),
    )
    .unwrap();
    let union = t.union(&narrow, true).unwrap();
    let field = union.schema().field("x").unwrap();
    assert_eq!(field.data_type, DataType::int64());
    assert!(field.nullability.is_nullable());
}

#[test]
fn test_set_op_requires_matching_names() {
    let t = int_source("t", &["x"]);
    let u = int_source("u", &["y"]);
    let err = t.intersect(&u, true).unwrap_err();
    assert!(matches!(err, PlanError::SetOpMismatch { .. }));

    let s = Rel::source(
        "s",
        qv_core::Schema::try_new(vec![qv_core::Field::not_null("x", DataType::String)]).unwrap(),
    )
    .unwrap();
    assert!(t.difference(&s, false).is_err());
}

#[test]
fn test_alias_changes_identity_not_schema() {
    let t = int_source("t", &["x"]);
    let a = t.alias("a").unwrap();
    assert_ne!(a.id(), t.id());
    assert_eq!(a.schema(), t.schema());
    assert!(t.alias("").is_err());
    assert_eq!(t.alias("a").unwrap().id(), a.id());
}

#[test]
fn test_alias_is_identity_boundary() {
    let registry = registry();
    let t = int_source("t", &["x"]);
    let a = t.alias("a").unwrap();
    let err = a
        .filter(vec![call(&registry, "gt", vec![t.col("x").unwrap(), lit(0)])])
        .unwrap_err();
    assert!(matches!(err, PlanError::ForeignReference { .. }));
}

#[test]
fn test_identical_construction_is_deterministic() {
    let build = || {
        let registry = registry();
        let t = int_source("t", &["x", "y"]);
        t.filter(vec![call(&registry, "gt", vec![t.col("x").unwrap(), lit(3)])])
            .unwrap()
            .project(vec![("y", t.col("y").unwrap())])
            .unwrap()
    };
    assert_eq!(build().id(), build().id());
}

#[test]
fn test_display_indent() {
    let registry = registry();
    let t = int_source("t", &["x"]);
    let plan = t
        .filter(vec![call(&registry, "gt", vec![t.col("x").unwrap(), lit(3)])])
        .unwrap()
        .limit(Some(5), 0)
        .unwrap();
    let text = plan.display_indent();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Limit: 5 offset 0");
    assert_eq!(lines[1], "  Filter: gt(#x, 3)");
    assert!(lines[2].starts_with("    Source: t"));
}
