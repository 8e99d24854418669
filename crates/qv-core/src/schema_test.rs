use super::*;

fn xy() -> Schema {
    Schema::try_new(vec![
        Field::not_null("x", DataType::int64()),
        Field::nullable("y", DataType::String),
    ])
    .unwrap()
}

#[test]
fn test_try_new_rejects_empty() {
    assert!(matches!(
        Schema::try_new(vec![]).unwrap_err(),
        CoreError::EmptySchema
    ));
}

#[test]
fn test_try_new_rejects_duplicates() {
    let err = Schema::try_new(vec![
        Field::nullable("a", DataType::int64()),
        Field::nullable("a", DataType::String),
    ])
    .unwrap_err();
    match err {
        CoreError::DuplicateColumn { name } => assert_eq!(name, "a"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_try_new_rejects_out_of_range_decimal() {
    let err = Schema::try_new(vec![Field::nullable(
        "d",
        DataType::Decimal {
            precision: 40,
            scale: 39,
        },
    )])
    .unwrap_err();
    assert!(matches!(err, CoreError::InvalidDecimal { precision: 40, .. }));
}

#[test]
fn test_lookup() {
    let schema = xy();
    assert_eq!(schema.len(), 2);
    assert_eq!(schema.index_of("y"), Some(1));
    assert_eq!(schema.field("x").unwrap().data_type, DataType::int64());
    assert!(schema.field("z").is_none());
    assert_eq!(schema.column_names(), vec!["x", "y"]);
}

#[test]
fn test_project_reorders() {
    let projected = xy().project(&["y", "x"]).unwrap();
    assert_eq!(projected.column_names(), vec!["y", "x"]);
    assert!(xy().project(&["nope"]).is_err());
}

#[test]
fn test_is_preserved_by_allows_narrowing() {
    let wide = xy().to_nullable();
    let narrow = xy();
    assert!(wide.is_preserved_by(&narrow));
    assert!(!narrow.is_preserved_by(&wide));
    assert!(narrow.is_preserved_by(&narrow));
}

#[test]
fn test_is_preserved_by_rejects_type_and_order_changes() {
    let schema = xy();
    let reordered = schema.project(&["y", "x"]).unwrap();
    assert!(!schema.is_preserved_by(&reordered));

    let retyped = Schema::try_new(vec![
        Field::not_null("x", DataType::int32()),
        Field::nullable("y", DataType::String),
    ])
    .unwrap();
    assert!(!schema.is_preserved_by(&retyped));
}

#[test]
fn test_deserialize_validates() {
    let yaml = "- name: a\n  data_type: Boolean\n- name: a\n  data_type: Boolean\n";
    let result: Result<Schema, _> = serde_yaml::from_str(yaml);
    assert!(result.is_err());

    let yaml = "- name: a\n  data_type: Boolean\n";
    let schema: Schema = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(schema.field("a").unwrap().nullability, Nullability::Nullable);
}

#[test]
fn test_display() {
    assert_eq!(xy().to_string(), "{x: BIGINT NOT NULL, y: VARCHAR NULL}");
}
