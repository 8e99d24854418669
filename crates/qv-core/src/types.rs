//! Core type system: scalar data types, nullability, and the promotion lattice

use crate::error::{CastError, CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// Maximum precision of a DECIMAL value (digits representable in an i128)
pub const MAX_DECIMAL_PRECISION: u8 = 38;

/// Valid bit widths for integer types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IntBitWidth {
    /// 8-bit (TINYINT)
    I8,
    /// 16-bit (SMALLINT)
    I16,
    /// 32-bit (INTEGER)
    I32,
    /// 64-bit (BIGINT)
    I64,
}

impl IntBitWidth {
    /// Number of bits
    pub fn bits(self) -> u16 {
        match self {
            IntBitWidth::I8 => 8,
            IntBitWidth::I16 => 16,
            IntBitWidth::I32 => 32,
            IntBitWidth::I64 => 64,
        }
    }

    /// Number of decimal digits needed to hold any value of this width
    pub fn decimal_digits(self) -> u8 {
        match self {
            IntBitWidth::I8 => 3,
            IntBitWidth::I16 => 5,
            IntBitWidth::I32 => 10,
            IntBitWidth::I64 => 19,
        }
    }

    /// Inclusive value range of this width
    pub fn range(self) -> (i64, i64) {
        match self {
            IntBitWidth::I8 => (i8::MIN as i64, i8::MAX as i64),
            IntBitWidth::I16 => (i16::MIN as i64, i16::MAX as i64),
            IntBitWidth::I32 => (i32::MIN as i64, i32::MAX as i64),
            IntBitWidth::I64 => (i64::MIN, i64::MAX),
        }
    }
}

impl std::fmt::Display for IntBitWidth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.bits())
    }
}

/// Valid bit widths for floating-point types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FloatBitWidth {
    /// 32-bit (FLOAT / REAL)
    F32,
    /// 64-bit (DOUBLE)
    F64,
}

impl std::fmt::Display for FloatBitWidth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FloatBitWidth::F32 => write!(f, "32"),
            FloatBitWidth::F64 => write!(f, "64"),
        }
    }
}

/// Timestamp resolution, ordered coarse to fine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    /// Seconds
    Second,
    /// Milliseconds
    Millisecond,
    /// Microseconds
    Microsecond,
    /// Nanoseconds
    Nanosecond,
}

impl TimeUnit {
    /// Short suffix used in type display (`s`, `ms`, `us`, `ns`)
    pub fn suffix(self) -> &'static str {
        match self {
            TimeUnit::Second => "s",
            TimeUnit::Millisecond => "ms",
            TimeUnit::Microsecond => "us",
            TimeUnit::Nanosecond => "ns",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "s" | "second" | "0" => Some(TimeUnit::Second),
            "ms" | "millisecond" | "3" => Some(TimeUnit::Millisecond),
            "us" | "microsecond" | "6" => Some(TimeUnit::Microsecond),
            "ns" | "nanosecond" | "9" => Some(TimeUnit::Nanosecond),
            _ => None,
        }
    }
}

/// Interval unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalUnit {
    /// Years
    Year,
    /// Months
    Month,
    /// Days
    Day,
    /// Hours
    Hour,
    /// Minutes
    Minute,
    /// Seconds
    Second,
    /// Microseconds
    Microsecond,
}

impl IntervalUnit {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "YEAR" => Some(IntervalUnit::Year),
            "MONTH" => Some(IntervalUnit::Month),
            "DAY" => Some(IntervalUnit::Day),
            "HOUR" => Some(IntervalUnit::Hour),
            "MINUTE" => Some(IntervalUnit::Minute),
            "SECOND" => Some(IntervalUnit::Second),
            "MICROSECOND" => Some(IntervalUnit::Microsecond),
            _ => None,
        }
    }
}

impl std::fmt::Display for IntervalUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IntervalUnit::Year => "YEAR",
            IntervalUnit::Month => "MONTH",
            IntervalUnit::Day => "DAY",
            IntervalUnit::Hour => "HOUR",
            IntervalUnit::Minute => "MINUTE",
            IntervalUnit::Second => "SECOND",
            IntervalUnit::Microsecond => "MICROSECOND",
        };
        f.write_str(s)
    }
}

/// A named member of a struct type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructField {
    /// Field name
    pub name: String,
    /// Field type
    pub data_type: DataType,
}

impl StructField {
    /// Create a struct field
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Scalar data type.
///
/// Two types are equal iff every parameter matches. Nullability is tracked
/// beside the type (see [`Nullability`]), not inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Type of the untyped NULL literal
    Null,
    /// Boolean (BOOL, BOOLEAN)
    Boolean,
    /// Signed integer types: TINYINT(8), SMALLINT(16), INT(32), BIGINT(64)
    Integer { bits: IntBitWidth },
    /// Floating-point: FLOAT(32), DOUBLE(64)
    Float { bits: FloatBitWidth },
    /// Exact numeric
    Decimal { precision: u8, scale: u8 },
    /// Variable-length UTF-8 string
    String,
    /// Variable-length bytes
    Binary,
    /// Timestamp with resolution and optional time zone
    Timestamp {
        unit: TimeUnit,
        timezone: Option<String>,
    },
    /// Calendar date
    Date,
    /// Time of day
    Time,
    /// Interval in a fixed unit
    Interval { unit: IntervalUnit },
    /// Homogeneous list
    Array(Box<DataType>),
    /// Ordered named fields
    Struct(Vec<StructField>),
    /// Key/value map
    Map {
        key: Box<DataType>,
        value: Box<DataType>,
    },
}

impl DataType {
    /// Shorthand for a signed integer of the given width
    pub fn int(bits: IntBitWidth) -> Self {
        DataType::Integer { bits }
    }

    /// Shorthand for a 64-bit integer
    pub fn int64() -> Self {
        DataType::Integer {
            bits: IntBitWidth::I64,
        }
    }

    /// Shorthand for a 32-bit integer
    pub fn int32() -> Self {
        DataType::Integer {
            bits: IntBitWidth::I32,
        }
    }

    /// Shorthand for a 64-bit float
    pub fn float64() -> Self {
        DataType::Float {
            bits: FloatBitWidth::F64,
        }
    }

    /// Shorthand for a decimal type.
    ///
    /// Precision is clamped to `1..=MAX_DECIMAL_PRECISION` and scale to the
    /// precision; use [`DataType::try_decimal`] to reject instead.
    pub fn decimal(precision: u8, scale: u8) -> Self {
        let precision = precision.clamp(1, MAX_DECIMAL_PRECISION);
        DataType::Decimal {
            precision,
            scale: scale.min(precision),
        }
    }

    /// Decimal type, rejecting out-of-range precision or scale
    pub fn try_decimal(precision: u8, scale: u8) -> CoreResult<Self> {
        if precision == 0 || precision > MAX_DECIMAL_PRECISION || scale > precision {
            return Err(CoreError::InvalidDecimal {
                precision,
                scale,
                max: MAX_DECIMAL_PRECISION,
            });
        }
        Ok(DataType::Decimal { precision, scale })
    }

    /// Check every decimal parameter inside this type, including nested ones
    pub fn validate(&self) -> CoreResult<()> {
        match self {
            DataType::Decimal { precision, scale } => {
                DataType::try_decimal(*precision, *scale).map(|_| ())
            }
            DataType::Array(item) => item.validate(),
            DataType::Struct(fields) => fields.iter().try_for_each(|f| f.data_type.validate()),
            DataType::Map { key, value } => {
                key.validate()?;
                value.validate()
            }
            _ => Ok(()),
        }
    }

    /// Returns true for integer, float and decimal types
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Integer { .. } | DataType::Float { .. } | DataType::Decimal { .. }
        )
    }

    /// Returns true for integer types
    pub fn is_integer(&self) -> bool {
        matches!(self, DataType::Integer { .. })
    }

    /// Returns true for the string type
    pub fn is_string(&self) -> bool {
        matches!(self, DataType::String)
    }

    /// Returns true for boolean
    pub fn is_boolean(&self) -> bool {
        matches!(self, DataType::Boolean)
    }

    /// Returns true for types with a total order usable in comparisons
    pub fn is_orderable(&self) -> bool {
        self.is_numeric()
            || matches!(
                self,
                DataType::Boolean
                    | DataType::String
                    | DataType::Binary
                    | DataType::Date
                    | DataType::Time
                    | DataType::Timestamp { .. }
                    | DataType::Interval { .. }
                    | DataType::Null
            )
    }

    /// Rank in the fixed promotion order.
    ///
    /// Within the numeric family a higher rank absorbs a lower one
    /// (integer < float < decimal). Ranks of different families are ordered
    /// for display and sorting only; they do not imply castability.
    pub fn precedence(&self) -> u8 {
        match self {
            DataType::Null => 0,
            DataType::Boolean => 1,
            DataType::Integer { .. } => 2,
            DataType::Float { .. } => 3,
            DataType::Decimal { .. } => 4,
            DataType::Date => 5,
            DataType::Timestamp { .. } => 6,
            DataType::Time => 7,
            DataType::Interval { .. } => 8,
            DataType::String => 9,
            DataType::Binary => 10,
            DataType::Array(_) => 11,
            DataType::Struct(_) => 12,
            DataType::Map { .. } => 13,
        }
    }

    /// Human-readable display name
    pub fn display_name(&self) -> String {
        match self {
            DataType::Null => "NULL".into(),
            DataType::Boolean => "BOOLEAN".into(),
            DataType::Integer {
                bits: IntBitWidth::I8,
            } => "TINYINT".into(),
            DataType::Integer {
                bits: IntBitWidth::I16,
            } => "SMALLINT".into(),
            DataType::Integer {
                bits: IntBitWidth::I32,
            } => "INTEGER".into(),
            DataType::Integer {
                bits: IntBitWidth::I64,
            } => "BIGINT".into(),
            DataType::Float {
                bits: FloatBitWidth::F32,
            } => "FLOAT".into(),
            DataType::Float {
                bits: FloatBitWidth::F64,
            } => "DOUBLE".into(),
            DataType::Decimal { precision, scale } => format!("DECIMAL({precision},{scale})"),
            DataType::String => "VARCHAR".into(),
            DataType::Binary => "BINARY".into(),
            DataType::Timestamp {
                unit,
                timezone: Some(tz),
            } => format!("TIMESTAMP({}, {tz})", unit.suffix()),
            DataType::Timestamp {
                unit,
                timezone: None,
            } => format!("TIMESTAMP({})", unit.suffix()),
            DataType::Date => "DATE".into(),
            DataType::Time => "TIME".into(),
            DataType::Interval { unit } => format!("INTERVAL {unit}"),
            DataType::Array(inner) => format!("{}[]", inner.display_name()),
            DataType::Struct(fields) => {
                let field_strs: Vec<String> = fields
                    .iter()
                    .map(|f| format!("{} {}", f.name, f.data_type.display_name()))
                    .collect();
                format!("STRUCT({})", field_strs.join(", "))
            }
            DataType::Map { key, value } => {
                format!("MAP({}, {})", key.display_name(), value.display_name())
            }
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Nullability of a column or expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nullability {
    /// Guaranteed not null
    NotNull,
    /// May contain nulls
    Nullable,
}

impl Nullability {
    /// Combine two nullability states: if either is nullable, result is nullable
    pub fn combine(self, other: Nullability) -> Nullability {
        match (self, other) {
            (Nullability::NotNull, Nullability::NotNull) => Nullability::NotNull,
            _ => Nullability::Nullable,
        }
    }

    /// Returns true when nulls may appear
    pub fn is_nullable(self) -> bool {
        matches!(self, Nullability::Nullable)
    }
}

impl std::fmt::Display for Nullability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Nullability::NotNull => write!(f, "NOT NULL"),
            Nullability::Nullable => write!(f, "NULL"),
        }
    }
}

/// Compute the least upper bound of two types in the promotion lattice.
///
/// Integer widths widen, integer < float < decimal, date widens to timestamp,
/// nested types unify element-wise. String and binary never unify with
/// numeric types.
pub fn unify(left: &DataType, right: &DataType) -> Result<DataType, CastError> {
    use DataType as D;

    if left == right {
        return Ok(left.clone());
    }
    let fail = || CastError::new(left, right);

    match (left, right) {
        (D::Null, other) | (other, D::Null) => Ok(other.clone()),

        (D::Integer { bits: a }, D::Integer { bits: b }) => Ok(D::Integer { bits: *a.max(b) }),
        (D::Float { bits: a }, D::Float { bits: b }) => Ok(D::Float { bits: *a.max(b) }),

        (D::Integer { bits: i }, D::Float { bits: f })
        | (D::Float { bits: f }, D::Integer { bits: i }) => {
            // A 32-bit float cannot hold every INTEGER or BIGINT exactly
            let bits = if *i > IntBitWidth::I16 {
                FloatBitWidth::F64
            } else {
                *f
            };
            Ok(D::Float { bits })
        }

        (D::Integer { bits }, D::Decimal { precision, scale })
        | (D::Decimal { precision, scale }, D::Integer { bits }) => {
            let integral = precision.saturating_sub(*scale).max(bits.decimal_digits());
            Ok(D::Decimal {
                precision: (integral.saturating_add(*scale)).min(MAX_DECIMAL_PRECISION),
                scale: *scale,
            })
        }

        (D::Float { .. }, dec @ D::Decimal { .. }) | (dec @ D::Decimal { .. }, D::Float { .. }) => {
            Ok(dec.clone())
        }

        (
            D::Decimal {
                precision: p1,
                scale: s1,
            },
            D::Decimal {
                precision: p2,
                scale: s2,
            },
        ) => {
            let integral = p1.saturating_sub(*s1).max(p2.saturating_sub(*s2));
            let scale = *s1.max(s2);
            Ok(D::Decimal {
                precision: (integral.saturating_add(scale)).min(MAX_DECIMAL_PRECISION),
                scale,
            })
        }

        (D::Date, ts @ D::Timestamp { .. }) | (ts @ D::Timestamp { .. }, D::Date) => Ok(ts.clone()),

        (
            D::Timestamp {
                unit: u1,
                timezone: tz1,
            },
            D::Timestamp {
                unit: u2,
                timezone: tz2,
            },
        ) if tz1 == tz2 => Ok(D::Timestamp {
            unit: *u1.max(u2),
            timezone: tz1.clone(),
        }),

        (D::Array(a), D::Array(b)) => Ok(D::Array(Box::new(unify(a, b).map_err(|_| fail())?))),

        (D::Map { key: k1, value: v1 }, D::Map { key: k2, value: v2 }) => Ok(D::Map {
            key: Box::new(unify(k1, k2).map_err(|_| fail())?),
            value: Box::new(unify(v1, v2).map_err(|_| fail())?),
        }),

        (D::Struct(a), D::Struct(b)) if a.len() == b.len() => {
            let mut fields = Vec::with_capacity(a.len());
            for (fa, fb) in a.iter().zip(b.iter()) {
                if fa.name != fb.name {
                    return Err(fail());
                }
                let data_type = unify(&fa.data_type, &fb.data_type).map_err(|_| fail())?;
                fields.push(StructField::new(fa.name.clone(), data_type));
            }
            Ok(D::Struct(fields))
        }

        _ => Err(fail()),
    }
}

/// Unify a non-empty sequence of types left to right
pub fn unify_all<'a>(types: impl IntoIterator<Item = &'a DataType>) -> Result<DataType, CastError> {
    let mut acc = DataType::Null;
    for ty in types {
        acc = unify(&acc, ty)?;
    }
    Ok(acc)
}

/// Whether a value of `source` may be implicitly coerced to `target`.
///
/// True exactly when `target` is already the least upper bound of the pair.
pub fn is_assignable(source: &DataType, target: &DataType) -> bool {
    matches!(unify(source, target), Ok(ref t) if t == target)
}

/// Parse a type name (`BIGINT`, `DECIMAL(10,2)`, `INTEGER[]`, `TIMESTAMP(ms, UTC)`,
/// `STRUCT(a INT, b VARCHAR)`, `MAP(VARCHAR, INT)`, ...) into a [`DataType`]
pub fn parse_data_type(s: &str) -> CoreResult<DataType> {
    let invalid = || CoreError::InvalidType {
        name: s.to_string(),
    };
    let upper = s.trim().to_uppercase();

    let simple = match upper.as_str() {
        "NULL" => Some(DataType::Null),
        "BOOL" | "BOOLEAN" => Some(DataType::Boolean),
        "TINYINT" | "INT1" => Some(DataType::int(IntBitWidth::I8)),
        "SMALLINT" | "INT2" => Some(DataType::int(IntBitWidth::I16)),
        "INT" | "INTEGER" | "INT4" => Some(DataType::int(IntBitWidth::I32)),
        "BIGINT" | "INT8" | "LONG" => Some(DataType::int(IntBitWidth::I64)),
        "FLOAT" | "REAL" | "FLOAT4" => Some(DataType::Float {
            bits: FloatBitWidth::F32,
        }),
        "DOUBLE" | "DOUBLE PRECISION" | "FLOAT8" => Some(DataType::float64()),
        "DECIMAL" | "NUMERIC" => Some(DataType::decimal(18, 3)),
        "VARCHAR" | "TEXT" | "STRING" | "CHAR" => Some(DataType::String),
        "BLOB" | "BINARY" | "BYTEA" | "VARBINARY" => Some(DataType::Binary),
        "DATE" => Some(DataType::Date),
        "TIME" => Some(DataType::Time),
        "TIMESTAMP" | "DATETIME" => Some(DataType::Timestamp {
            unit: TimeUnit::Microsecond,
            timezone: None,
        }),
        "TIMESTAMPTZ" => Some(DataType::Timestamp {
            unit: TimeUnit::Microsecond,
            timezone: Some("UTC".to_string()),
        }),
        _ => None,
    };
    if let Some(ty) = simple {
        return Ok(ty);
    }

    try_parse_parameterized(s.trim()).ok_or_else(invalid)
}

/// Parse parameterized forms; `None` when the string is not a known shape
fn try_parse_parameterized(trimmed: &str) -> Option<DataType> {
    let upper = trimmed.to_uppercase();

    if let Some(inner) = trimmed.strip_suffix("[]") {
        return parse_data_type(inner)
            .ok()
            .map(|t| DataType::Array(Box::new(t)));
    }

    if let Some(rest) = upper.strip_prefix("INTERVAL ") {
        return IntervalUnit::parse(rest).map(|unit| DataType::Interval { unit });
    }

    let open = upper.find('(')?;
    if !upper.ends_with(')') {
        return None;
    }
    let base = upper[..open].trim();
    // Use the original-case slice so struct field names and time zones survive
    let params = &trimmed[open + 1..trimmed.len() - 1];

    match base {
        "STRUCT" => parse_struct_fields(params),
        "MAP" => {
            let parts = split_top_level(params, ',');
            if parts.len() != 2 {
                return None;
            }
            let key = parse_data_type(parts[0]).ok()?;
            let value = parse_data_type(parts[1]).ok()?;
            Some(DataType::Map {
                key: Box::new(key),
                value: Box::new(value),
            })
        }
        "ARRAY" | "LIST" => parse_data_type(params)
            .ok()
            .map(|t| DataType::Array(Box::new(t))),
        "DECIMAL" | "NUMERIC" => {
            let parts: Vec<&str> = params.split(',').collect();
            let precision: u8 = parts.first()?.trim().parse().ok()?;
            let scale: u8 = match parts.get(1) {
                Some(s) => s.trim().parse().ok()?,
                None => 0,
            };
            DataType::try_decimal(precision, scale).ok()
        }
        "VARCHAR" | "CHAR" => {
            // Length limits are not tracked
            params.trim().parse::<u32>().ok()?;
            Some(DataType::String)
        }
        "TIMESTAMP" => {
            let parts = split_top_level(params, ',');
            let unit = TimeUnit::parse(parts.first()?)?;
            let timezone = parts
                .get(1)
                .map(|tz| tz.trim().to_string())
                .filter(|tz| !tz.is_empty());
            Some(DataType::Timestamp { unit, timezone })
        }
        _ => None,
    }
}

/// Parse STRUCT fields like "name VARCHAR, age INT"
fn parse_struct_fields(s: &str) -> Option<DataType> {
    let mut fields = Vec::new();
    for part in split_top_level(s, ',') {
        let part = part.trim();
        let space_pos = part.find(|c: char| c.is_ascii_whitespace())?;
        let name = part[..space_pos].trim().to_string();
        let data_type = parse_data_type(part[space_pos..].trim()).ok()?;
        fields.push(StructField { name, data_type });
    }
    if fields.is_empty() {
        return None;
    }
    Some(DataType::Struct(fields))
}

/// Split a string on a delimiter, but only at the top level (not inside parentheses)
fn split_top_level(s: &str, delimiter: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            c if c == delimiter && depth == 0 => {
                parts.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(s[start..].trim());
    parts
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
