use super::*;

fn ts(unit: TimeUnit, tz: Option<&str>) -> DataType {
    DataType::Timestamp {
        unit,
        timezone: tz.map(str::to_string),
    }
}

#[test]
fn test_unify_identical_types() {
    assert_eq!(unify(&DataType::String, &DataType::String).unwrap(), DataType::String);
    assert_eq!(
        unify(&DataType::decimal(10, 2), &DataType::decimal(10, 2)).unwrap(),
        DataType::decimal(10, 2)
    );
}

#[test]
fn test_unify_null_absorbs() {
    assert_eq!(unify(&DataType::Null, &DataType::int32()).unwrap(), DataType::int32());
    assert_eq!(unify(&DataType::String, &DataType::Null).unwrap(), DataType::String);
}

#[test]
fn test_unify_integer_widths_widen() {
    let result = unify(&DataType::int(IntBitWidth::I8), &DataType::int32()).unwrap();
    assert_eq!(result, DataType::int32());
    let result = unify(&DataType::int64(), &DataType::int(IntBitWidth::I16)).unwrap();
    assert_eq!(result, DataType::int64());
}

#[test]
fn test_unify_integer_float() {
    let small = DataType::int(IntBitWidth::I8);
    let f32 = DataType::Float {
        bits: FloatBitWidth::F32,
    };
    assert_eq!(unify(&small, &f32).unwrap(), f32);
    // INTEGER does not fit a FLOAT exactly
    assert_eq!(unify(&DataType::int32(), &f32).unwrap(), DataType::float64());
}

#[test]
fn test_unify_decimal_precedence() {
    assert_eq!(
        unify(&DataType::int32(), &DataType::decimal(5, 2)).unwrap(),
        DataType::decimal(12, 2)
    );
    assert_eq!(
        unify(&DataType::float64(), &DataType::decimal(10, 4)).unwrap(),
        DataType::decimal(10, 4)
    );
    assert_eq!(
        unify(&DataType::decimal(10, 2), &DataType::decimal(6, 4)).unwrap(),
        DataType::decimal(12, 4)
    );
    assert_eq!(
        unify(&DataType::int64(), &DataType::decimal(38, 30)).unwrap(),
        DataType::decimal(MAX_DECIMAL_PRECISION, 30)
    );
}

#[test]
fn test_unify_string_numeric_fails() {
    let err = unify(&DataType::String, &DataType::int32()).unwrap_err();
    assert_eq!(err.left, DataType::String);
    assert!(err.to_string().contains("[T001]"));
    assert!(unify(&DataType::Binary, &DataType::float64()).is_err());
    assert!(unify(&DataType::Boolean, &DataType::int32()).is_err());
}

#[test]
fn test_unify_temporal() {
    let micros = ts(TimeUnit::Microsecond, None);
    assert_eq!(unify(&DataType::Date, &micros).unwrap(), micros);
    assert_eq!(
        unify(&ts(TimeUnit::Second, None), &ts(TimeUnit::Nanosecond, None)).unwrap(),
        ts(TimeUnit::Nanosecond, None)
    );
    assert!(unify(&ts(TimeUnit::Second, Some("UTC")), &ts(TimeUnit::Second, None)).is_err());
}

#[test]
fn test_unify_nested() {
    let a = DataType::Array(Box::new(DataType::int32()));
    let b = DataType::Array(Box::new(DataType::int64()));
    assert_eq!(unify(&a, &b).unwrap(), b);

    let s1 = DataType::Struct(vec![StructField::new("x", DataType::int32())]);
    let s2 = DataType::Struct(vec![StructField::new("x", DataType::float64())]);
    assert_eq!(
        unify(&s1, &s2).unwrap(),
        DataType::Struct(vec![StructField::new("x", DataType::float64())])
    );

    let renamed = DataType::Struct(vec![StructField::new("y", DataType::int32())]);
    assert!(unify(&s1, &renamed).is_err());
}

#[test]
fn test_unify_all() {
    let types = [DataType::int(IntBitWidth::I8), DataType::Null, DataType::int64()];
    assert_eq!(unify_all(types.iter()).unwrap(), DataType::int64());
}

#[test]
fn test_is_assignable() {
    assert!(is_assignable(&DataType::int32(), &DataType::int64()));
    assert!(!is_assignable(&DataType::int64(), &DataType::int32()));
    assert!(is_assignable(&DataType::int32(), &DataType::float64()));
    assert!(!is_assignable(&DataType::float64(), &DataType::int64()));
    assert!(is_assignable(&DataType::Null, &DataType::String));
    assert!(!is_assignable(&DataType::String, &DataType::int64()));
    assert!(is_assignable(&DataType::decimal(5, 2), &DataType::decimal(10, 2)));
    assert!(!is_assignable(&DataType::decimal(10, 4), &DataType::decimal(10, 2)));
}

#[test]
fn test_precedence_numeric_order() {
    assert!(DataType::int64().precedence() < DataType::float64().precedence());
    assert!(DataType::float64().precedence() < DataType::decimal(10, 2).precedence());
    assert!(DataType::Null.precedence() < DataType::Boolean.precedence());
}

#[test]
fn test_parse_basic_types() {
    assert_eq!(parse_data_type("boolean").unwrap(), DataType::Boolean);
    assert_eq!(parse_data_type("INT").unwrap(), DataType::int32());
    assert_eq!(parse_data_type("bigint").unwrap(), DataType::int64());
    assert_eq!(parse_data_type("DOUBLE").unwrap(), DataType::float64());
    assert_eq!(parse_data_type("VARCHAR").unwrap(), DataType::String);
    assert_eq!(parse_data_type("DATE").unwrap(), DataType::Date);
}

#[test]
fn test_parse_parameterized_types() {
    assert_eq!(parse_data_type("VARCHAR(255)").unwrap(), DataType::String);
    assert_eq!(parse_data_type("DECIMAL(10,2)").unwrap(), DataType::decimal(10, 2));
    assert_eq!(parse_data_type("DECIMAL(18)").unwrap(), DataType::decimal(18, 0));
    assert_eq!(
        parse_data_type("TIMESTAMP(ms, UTC)").unwrap(),
        ts(TimeUnit::Millisecond, Some("UTC"))
    );
    assert_eq!(
        parse_data_type("INTERVAL DAY").unwrap(),
        DataType::Interval {
            unit: IntervalUnit::Day
        }
    );
}

#[test]
fn test_parse_nested_types() {
    assert_eq!(
        parse_data_type("INTEGER[]").unwrap(),
        DataType::Array(Box::new(DataType::int32()))
    );
    assert_eq!(
        parse_data_type("STRUCT(name VARCHAR, age INT)").unwrap(),
        DataType::Struct(vec![
            StructField::new("name", DataType::String),
            StructField::new("age", DataType::int32()),
        ])
    );
    assert_eq!(
        parse_data_type("MAP(VARCHAR, INTEGER)").unwrap(),
        DataType::Map {
            key: Box::new(DataType::String),
            value: Box::new(DataType::int32()),
        }
    );
}

#[test]
fn test_parse_invalid_type() {
    let err = parse_data_type("SOMECUSTOMTYPE").unwrap_err();
    assert!(matches!(err, CoreError::InvalidType { .. }));
    assert!(parse_data_type("DECIMAL(50,2)").is_err());
    assert!(parse_data_type("DECIMAL(4,6)").is_err());
}

#[test]
fn test_display_names() {
    assert_eq!(DataType::int32().display_name(), "INTEGER");
    assert_eq!(DataType::float64().display_name(), "DOUBLE");
    assert_eq!(DataType::decimal(10, 2).display_name(), "DECIMAL(10,2)");
    assert_eq!(ts(TimeUnit::Millisecond, Some("UTC")).display_name(), "TIMESTAMP(ms, UTC)");
    assert_eq!(
        DataType::Array(Box::new(DataType::int32())).display_name(),
        "INTEGER[]"
    );
}

#[test]
fn test_nullability_combine() {
    assert_eq!(
        Nullability::NotNull.combine(Nullability::NotNull),
        Nullability::NotNull
    );
    assert_eq!(
        Nullability::NotNull.combine(Nullability::Nullable),
        Nullability::Nullable
    );
    assert_eq!(
        Nullability::Nullable.combine(Nullability::NotNull),
        Nullability::Nullable
    );
}

#[test]
fn test_int_bit_width_ordering() {
    assert!(IntBitWidth::I8 < IntBitWidth::I16);
    assert!(IntBitWidth::I16 < IntBitWidth::I32);
    assert!(IntBitWidth::I32 < IntBitWidth::I64);
    assert_eq!(IntBitWidth::I16.to_string(), "16");
}

#[test]
fn test_decimal_parameters_checked() {
    assert_eq!(DataType::try_decimal(38, 38).unwrap(), DataType::decimal(38, 38));
    for (precision, scale) in [(0, 0), (39, 2), (40, 39), (5, 6)] {
        let err = DataType::try_decimal(precision, scale).unwrap_err();
        assert!(matches!(err, CoreError::InvalidDecimal { .. }), "{precision},{scale}");
    }
    assert_eq!(DataType::decimal(40, 39), DataType::decimal(38, 38));
    assert_eq!(DataType::decimal(5, 6), DataType::decimal(5, 5));

    let raw = DataType::Decimal {
        precision: 40,
        scale: 39,
    };
    assert!(raw.validate().is_err());
    assert!(DataType::Array(Box::new(raw)).validate().is_err());
    assert!(parse_data_type("DECIMAL(40,39)").is_err());
}
