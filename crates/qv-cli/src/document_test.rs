use super::*;
use qv_plan::{RelOp, PlanGraph};

const ORDERS: &str = r#"
sources:
  orders:
    columns:
      - { name: id, type: BIGINT }
      - { name: customer, type: BIGINT }
      - { name: amount, type: DOUBLE, nullable: true }
    rows:
      - [1, 10, 5.5]
      - [2, 10, null]
      - [3, 20, 40]
  customers:
    columns:
      - { name: id, type: BIGINT }
      - { name: region, type: VARCHAR }
relations:
  - name: large
    filter:
      input: orders
      predicates:
        - call: gt
          args: [{ col: amount }, { lit: 10 }]
  - name: with_region
    join:
      left: large
      right: customers
      kind: left
      on:
        - call: eq
          args: [{ col: customer }, { col: id, of: customers }]
  - name: totals
    aggregate:
      input: with_region
      keys:
        - { name: region, expr: { col: region } }
      metrics:
        - { name: total, expr: { agg: sum, args: [{ col: amount }] } }
        - { name: n, expr: { agg: count_star } }
"#;

fn build(yaml: &str) -> Result<BuiltPlan> {
    PlanDocument::from_yaml_str(yaml)?.build(&FunctionRegistry::with_builtins()?)
}

#[test]
fn test_build_document() {
    let built = build(ORDERS).unwrap();
    assert_eq!(built.output_name, "totals");
    assert_eq!(built.output.schema().column_names(), vec!["region", "total", "n"]);
    let names: Vec<&str> = built.relations.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["customers", "orders", "large", "with_region", "totals"]);
    assert_eq!(PlanGraph::from_root(&built.output).node_count(), 5);
}

#[test]
fn test_source_tables_carry_rows() {
    let built = build(ORDERS).unwrap();
    let orders = built.tables.iter().find(|t| t.name == "orders").unwrap();
    assert_eq!(orders.rows.len(), 3);
    assert_eq!(orders.rows[1][2], ScalarValue::Null);
    assert_eq!(orders.rows[0][2], ScalarValue::Float(5.5));
    assert!(orders.schema.field("amount").unwrap().nullability.is_nullable());
    let customers = built.tables.iter().find(|t| t.name == "customers").unwrap();
    assert!(customers.rows.is_empty());
}

#[test]
fn test_unqualified_column_must_be_unique() {
    let yaml = r#"
sources:
  a: { columns: [{ name: id, type: BIGINT }] }
  b: { columns: [{ name: id, type: BIGINT }] }
relations:
  - name: j
    join:
      left: a
      right: b
      on:
        - call: eq
          args: [{ col: id }, { col: id, of: b }]
"#;
    let err = build(yaml).unwrap_err();
    assert!(format!("{err:#}").contains("ambiguous"), "{err:#}");
}

#[test]
fn test_explicit_output_and_alias() {
    let yaml = r#"
sources:
  t: { columns: [{ name: id, type: BIGINT }] }
relations:
  - name: t2
    alias: { input: t }
  - name: pairs
    join:
      left: t
      right: t2
      on:
        - call: eq
          args: [{ col: id, of: t }, { col: id, of: t2 }]
output: t2
"#;
    let built = build(yaml).unwrap();
    assert_eq!(built.output_name, "t2");
    assert!(matches!(built.output.op(), RelOp::Alias { name, .. } if name == "t2"));
}

#[test]
fn test_literals() {
    let registry = FunctionRegistry::with_builtins().unwrap();
    let t = Rel::source("t", Schema::try_new(vec![Field::not_null("x", qv_core::DataType::int64())]).unwrap()).unwrap();
    let env = HashMap::new();
    let scope = Scope::new(vec![&t], &env, &registry);

    let null: ExprDoc = serde_yaml::from_str("lit: null").unwrap();
    assert_eq!(scope.expr(&null).unwrap().as_literal(), Some(&ScalarValue::Null));

    let typed: ExprDoc = serde_yaml::from_str("{ lit: 3, type: DOUBLE }").unwrap();
    let typed = scope.expr(&typed).unwrap();
    assert_eq!(typed.as_literal(), Some(&ScalarValue::Float(3.0)));

    let text: ExprDoc = serde_yaml::from_str("lit: hello").unwrap();
    assert_eq!(
        scope.expr(&text).unwrap().as_literal(),
        Some(&ScalarValue::String("hello".to_string()))
    );
}

#[test]
fn test_expression_needs_one_form() {
    let registry = FunctionRegistry::with_builtins().unwrap();
    let env = HashMap::new();
    let scope = Scope::new(vec![], &env, &registry);
    let both: ExprDoc = serde_yaml::from_str("{ col: x, lit: 1 }").unwrap();
    assert!(scope.expr(&both).is_err());
    let none: ExprDoc = serde_yaml::from_str("{ args: [] }").unwrap();
    assert!(scope.expr(&none).is_err());
}

#[test]
fn test_unknown_fields_rejected() {
    let yaml = r#"
sources:
  t: { columns: [{ name: id, type: BIGINT, width: 3 }] }
"#;
    assert!(PlanDocument::from_yaml_str(yaml).is_err());
}

#[test]
fn test_unknown_names_reported() {
    let yaml = r#"
sources:
  t: { columns: [{ name: id, type: BIGINT }] }
relations:
  - name: f
    filter:
      input: missing
      predicates: [{ lit: true }]
"#;
    let err = build(yaml).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("relation 'f'"), "{message}");
    assert!(message.contains("unknown relation 'missing'"), "{message}");

    let duplicate = r#"
sources:
  t: { columns: [{ name: id, type: BIGINT }] }
relations:
  - name: t
    limit: { input: t, limit: 1 }
"#;
    assert!(format!("{:#}", build(duplicate).unwrap_err()).contains("more than once"));
}

#[test]
fn test_window_and_sort() {
    let yaml = r#"
sources:
  t: { columns: [{ name: g, type: BIGINT }, { name: x, type: BIGINT }] }
relations:
  - name: ranked
    project:
      input: t
      columns:
        - { name: g, expr: { col: g } }
        - name: running
          expr:
            window: sum
            args: [{ col: x }]
            partition_by: [{ col: g }]
            order_by: [{ expr: { col: x } }]
            frame: { units: rows, start: 2 preceding, end: current row }
        - name: prev
          expr:
            window: lag
            offset: 2
            args: [{ col: x }]
            order_by: [{ expr: { col: x }, descending: true }]
  - name: ordered
    sort:
      input: ranked
      keys: [{ expr: { col: running }, descending: true, nulls_first: true }]
"#;
    let built = build(yaml).unwrap();
    let RelOp::Sort { keys, .. } = built.output.op() else {
        panic!("expected a sort");
    };
    assert!(!keys[0].ascending);
    assert!(keys[0].nulls_first);
}

#[test]
fn test_frame_bounds() {
    assert_eq!(frame_bound("UNBOUNDED PRECEDING").unwrap(), FrameBound::UnboundedPreceding);
    assert_eq!(frame_bound("3 preceding").unwrap(), FrameBound::Preceding(3));
    assert_eq!(frame_bound("current row").unwrap(), FrameBound::CurrentRow);
    assert_eq!(frame_bound("1 following").unwrap(), FrameBound::Following(1));
    assert!(frame_bound("x preceding").is_err());
    assert!(frame_bound("sideways").is_err());
}

#[test]
fn test_cast_and_distinct_aggregate() {
    let yaml = r#"
sources:
  t: { columns: [{ name: x, type: INTEGER }] }
relations:
  - name: agg
    aggregate:
      input: t
      metrics:
        - { name: d, expr: { agg: count, distinct: true, args: [{ cast: { col: x }, to: BIGINT }] } }
"#;
    let built = build(yaml).unwrap();
    assert_eq!(built.output.schema().column_names(), vec!["d"]);
}
