use super::*;
use crate::types::IntervalUnit;
use std::collections::HashSet;

#[test]
fn test_float_equality_by_bits() {
    assert_eq!(ScalarValue::Float(1.5), ScalarValue::Float(1.5));
    assert_eq!(ScalarValue::Float(f64::NAN), ScalarValue::Float(f64::NAN));
    assert_ne!(ScalarValue::Float(0.0), ScalarValue::Float(-0.0));
    assert_ne!(ScalarValue::Integer(1), ScalarValue::Float(1.0));

    let mut set = HashSet::new();
    set.insert(ScalarValue::Float(2.0));
    set.insert(ScalarValue::Float(2.0));
    set.insert(ScalarValue::Integer(2));
    assert_eq!(set.len(), 2);
}

#[test]
fn test_data_type() {
    assert_eq!(ScalarValue::Integer(3).data_type(), DataType::int64());
    assert_eq!(ScalarValue::from("a").data_type(), DataType::String);
    assert_eq!(ScalarValue::Null.data_type(), DataType::Null);
    assert_eq!(
        ScalarValue::Decimal {
            value: 12345,
            scale: 2
        }
        .data_type(),
        DataType::decimal(5, 2)
    );
    assert_eq!(
        ScalarValue::Array(vec![ScalarValue::Integer(1), ScalarValue::Null]).data_type(),
        DataType::Array(Box::new(DataType::int64()))
    );
}

#[test]
fn test_cast_integer_narrowing_checks_range() {
    let small = DataType::int(IntBitWidth::I8);
    assert_eq!(
        ScalarValue::Integer(100).cast_to(&small).unwrap(),
        ScalarValue::Integer(100)
    );
    let err = ScalarValue::Integer(300).cast_to(&small).unwrap_err();
    assert!(matches!(err, CoreError::InvalidCast { .. }));
}

#[test]
fn test_cast_to_decimal() {
    let dec = DataType::decimal(5, 2);
    assert_eq!(
        ScalarValue::Integer(12).cast_to(&dec).unwrap(),
        ScalarValue::Decimal {
            value: 1200,
            scale: 2
        }
    );
    assert_eq!(
        ScalarValue::Float(1.005).cast_to(&DataType::decimal(10, 1)).unwrap(),
        ScalarValue::Decimal { value: 10, scale: 1 }
    );
    assert!(ScalarValue::Integer(1000).cast_to(&dec).is_err());
}

#[test]
fn test_cast_decimal_rescale_rounds() {
    let v = ScalarValue::Decimal {
        value: 12345,
        scale: 3,
    };
    assert_eq!(
        v.cast_to(&DataType::decimal(10, 2)).unwrap(),
        ScalarValue::Decimal {
            value: 1235,
            scale: 2
        }
    );
    assert_eq!(
        v.cast_to(&DataType::int32()).unwrap(),
        ScalarValue::Integer(12)
    );
}

#[test]
fn test_cast_null_is_null() {
    assert_eq!(
        ScalarValue::Null.cast_to(&DataType::int32()).unwrap(),
        ScalarValue::Null
    );
}

#[test]
fn test_cast_string_parsing() {
    assert_eq!(
        ScalarValue::from(" 42 ").cast_to(&DataType::int64()).unwrap(),
        ScalarValue::Integer(42)
    );
    assert_eq!(
        ScalarValue::from("2024-02-29").cast_to(&DataType::Date).unwrap(),
        ScalarValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
    );
    assert!(ScalarValue::from("abc").cast_to(&DataType::int64()).is_err());
}

#[test]
fn test_cast_date_to_timestamp() {
    let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
    let ts = ScalarValue::Date(date)
        .cast_to(&DataType::Timestamp {
            unit: TimeUnit::Second,
            timezone: None,
        })
        .unwrap();
    assert_eq!(ts, ScalarValue::Timestamp(date.and_hms_opt(0, 0, 0).unwrap()));
}

#[test]
fn test_cast_incompatible_fails() {
    assert!(ScalarValue::Boolean(true).cast_to(&DataType::Date).is_err());
    assert!(ScalarValue::Interval(3)
        .cast_to(&DataType::Interval {
            unit: IntervalUnit::Day
        })
        .is_ok());
}

#[test]
fn test_compare_across_numeric_types() {
    let dec = ScalarValue::Decimal {
        value: 250,
        scale: 2,
    };
    assert_eq!(ScalarValue::Integer(2).compare(&dec), Some(Ordering::Less));
    assert_eq!(dec.compare(&ScalarValue::Integer(3)), Some(Ordering::Less));
    assert_eq!(dec.compare(&ScalarValue::Float(2.5)), Some(Ordering::Equal));
    assert_eq!(
        ScalarValue::Integer(5).compare(&ScalarValue::Float(4.5)),
        Some(Ordering::Greater)
    );
}

#[test]
fn test_compare_null_and_incomparable() {
    assert_eq!(ScalarValue::Null.compare(&ScalarValue::Integer(1)), None);
    assert_eq!(ScalarValue::from("a").compare(&ScalarValue::Integer(1)), None);
}

#[test]
fn test_sort_cmp_nulls_first() {
    let mut values = vec![
        ScalarValue::Integer(3),
        ScalarValue::Null,
        ScalarValue::Integer(1),
    ];
    values.sort_by(|a, b| a.sort_cmp(b));
    assert_eq!(
        values,
        vec![
            ScalarValue::Null,
            ScalarValue::Integer(1),
            ScalarValue::Integer(3)
        ]
    );
}

#[test]
fn test_rescale() {
    assert_eq!(rescale(125, 2, 1), Some(13));
    assert_eq!(rescale(-125, 2, 1), Some(-13));
    assert_eq!(rescale(124, 2, 1), Some(12));
    assert_eq!(rescale(5, 0, 3), Some(5000));
}

#[test]
fn test_display() {
    assert_eq!(ScalarValue::Integer(7).to_string(), "7");
    assert_eq!(ScalarValue::Float(1.0).to_string(), "1.0");
    assert_eq!(ScalarValue::from("x").to_string(), "'x'");
    assert_eq!(
        ScalarValue::Decimal {
            value: -105,
            scale: 2
        }
        .to_string(),
        "-1.05"
    );
    assert_eq!(ScalarValue::Null.to_string(), "NULL");
}

#[test]
fn test_out_of_range_decimal_scale_never_panics() {
    let wide = DataType::Decimal {
        precision: 40,
        scale: 39,
    };
    assert!(ScalarValue::Integer(1).cast_to(&wide).is_err());
    assert!(ScalarValue::Float(0.5).cast_to(&wide).is_err());

    let tiny = ScalarValue::Decimal {
        value: 12,
        scale: 39,
    };
    assert_eq!(tiny.to_string(), format!("0.{}12", "0".repeat(37)));
    assert_eq!(tiny.cast_to(&DataType::int64()).unwrap(), ScalarValue::Integer(0));
    assert_eq!(ScalarValue::Integer(1).compare(&tiny), None);
}
