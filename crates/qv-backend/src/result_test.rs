use super::*;
use crate::test_utils::int_rows;
use qv_plan::test_utils::int_schema;

fn sample() -> ResultSet {
    ResultSet::new(int_schema(&["x", "y"]), int_rows(&[&[333, 4], &[1, 22]]))
}

#[test]
fn test_accessors() {
    let result = sample();
    assert_eq!(result.len(), 2);
    assert!(!result.is_empty());
    assert_eq!(
        result.column("y"),
        Some(vec![&ScalarValue::Integer(4), &ScalarValue::Integer(22)])
    );
    assert_eq!(result.column("z"), None);
}

#[test]
fn test_sorted_rows_canonical_order() {
    let result = sample();
    assert_eq!(result.sorted_rows(), int_rows(&[&[1, 22], &[333, 4]]));
    // Production order is untouched
    assert_eq!(result.rows()[0][0], ScalarValue::Integer(333));
}

#[test]
fn test_compare_rows_nulls_first() {
    let a = vec![ScalarValue::Null, ScalarValue::Integer(5)];
    let b = vec![ScalarValue::Integer(0), ScalarValue::Integer(1)];
    assert_eq!(compare_rows(&a, &b), Ordering::Less);
    assert_eq!(compare_rows(&b, &b), Ordering::Equal);
}

#[test]
fn test_display_table() {
    let result = ResultSet::new(int_schema(&["x", "y"]), int_rows(&[&[1, 22], &[333, 4]]));
    let text = result.to_string();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines, vec!["x   | y", "----+---", "1   | 22", "333 | 4", "(2 rows)"]);
}

#[test]
fn test_display_single_and_empty() {
    let one = ResultSet::new(int_schema(&["n"]), int_rows(&[&[7]]));
    assert!(one.to_string().ends_with("(1 row)"));

    let empty = ResultSet::new(int_schema(&["n"]), Vec::new());
    assert!(empty.is_empty());
    assert_eq!(empty.to_string(), "n\n-\n(0 rows)");
}

#[test]
fn test_display_strings_unquoted() {
    let schema = Schema::try_new(vec![
        qv_core::Field::not_null("region", qv_core::DataType::String),
        qv_core::Field::nullable("n", qv_core::DataType::int64()),
    ])
    .unwrap();
    let result = ResultSet::new(
        schema,
        vec![vec![ScalarValue::from("north"), ScalarValue::Null]],
    );
    let text = result.to_string();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[2], "north  | NULL");
}
