use super::*;
use qv_core::{DataType, Field};

#[test]
fn test_format_table_aligns_columns() {
    let rows = vec![
        vec!["a".to_string(), "BIGINT".to_string()],
        vec!["longer".to_string(), "DOUBLE".to_string()],
    ];
    let text = format_table(&["NAME", "TYPE"], &rows);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "NAME    TYPE");
    assert_eq!(lines[1], "------  ------");
    assert_eq!(lines[2], "a       BIGINT");
    assert_eq!(lines[3], "longer  DOUBLE");
}

#[test]
fn test_schema_rows() {
    let schema = Schema::try_new(vec![
        Field::not_null("id", DataType::int64()),
        Field::nullable("score", DataType::float64()),
    ])
    .unwrap();
    let rows = schema_rows(&schema);
    assert_eq!(rows[0][0], "id");
    assert_eq!(rows[0][2], "no");
    assert_eq!(rows[1][2], "yes");
}

#[test]
fn test_explicit_config_path_must_exist() {
    let global = GlobalArgs {
        verbose: false,
        config: Some("/nonexistent/quiver.yml".into()),
    };
    let err = load_config(&global).unwrap_err();
    assert!(format!("{err:#}").contains("[C001]"), "{err:#}");
}

#[test]
fn test_explicit_config_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quiver.yml");
    std::fs::write(
        &path,
        "optimizer:\n  max_iterations: 3\n  rules:\n    column_pruning: false\n",
    )
    .unwrap();
    let global = GlobalArgs {
        verbose: false,
        config: Some(path),
    };
    let config = load_config(&global).unwrap();
    assert_eq!(config.optimizer.max_iterations, 3);
    assert!(!config.optimizer.rules.column_pruning);
    assert!(config.optimizer.rules.constant_folding);
}
