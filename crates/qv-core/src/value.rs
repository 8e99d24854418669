//! Scalar literal values

use crate::error::{CoreError, CoreResult};
use crate::types::{DataType, FloatBitWidth, IntBitWidth, TimeUnit, MAX_DECIMAL_PRECISION};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// A single literal value.
///
/// Equality and hashing are structural: floats compare by bit pattern so
/// values can key hash maps (grouping, interning). Use [`ScalarValue::compare`]
/// for SQL ordering semantics across numeric types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScalarValue {
    /// Null of any type
    Null,
    /// Boolean
    Boolean(bool),
    /// Integer of any width
    Integer(i64),
    /// Floating point of any width
    Float(f64),
    /// Decimal stored as an unscaled integer with its scale
    Decimal { value: i128, scale: u8 },
    /// UTF-8 string
    String(String),
    /// Raw bytes
    Binary(Vec<u8>),
    /// Calendar date
    Date(NaiveDate),
    /// Time of day
    Time(NaiveTime),
    /// Timestamp (time zone carried by the type, not the value)
    Timestamp(NaiveDateTime),
    /// Interval as a count of the type's unit
    Interval(i64),
    /// List value
    Array(Vec<ScalarValue>),
    /// Struct value with ordered named fields
    Struct(Vec<(String, ScalarValue)>),
    /// Map value as ordered key/value pairs
    Map(Vec<(ScalarValue, ScalarValue)>),
}

impl ScalarValue {
    /// Returns true for the null value
    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    /// Boolean payload, if this is a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScalarValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer payload, if this is an integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ScalarValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric value widened to f64 (integers, floats, decimals)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::Integer(v) => Some(*v as f64),
            ScalarValue::Float(v) => Some(*v),
            ScalarValue::Decimal { value, scale } => Some(*value as f64 / 10f64.powi(*scale as i32)),
            _ => None,
        }
    }

    /// String payload, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// The natural type of this value when no type is declared
    pub fn data_type(&self) -> DataType {
        match self {
            ScalarValue::Null => DataType::Null,
            ScalarValue::Boolean(_) => DataType::Boolean,
            ScalarValue::Integer(_) => DataType::int64(),
            ScalarValue::Float(_) => DataType::float64(),
            ScalarValue::Decimal { value, scale } => {
                let digits = value.unsigned_abs().checked_ilog10().map_or(1, |d| d + 1) as u8;
                DataType::Decimal {
                    precision: digits.max(*scale).max(1).min(MAX_DECIMAL_PRECISION),
                    scale: *scale,
                }
            }
            ScalarValue::String(_) => DataType::String,
            ScalarValue::Binary(_) => DataType::Binary,
            ScalarValue::Date(_) => DataType::Date,
            ScalarValue::Time(_) => DataType::Time,
            ScalarValue::Timestamp(_) => DataType::Timestamp {
                unit: TimeUnit::Microsecond,
                timezone: None,
            },
            ScalarValue::Interval(_) => DataType::Interval {
                unit: crate::types::IntervalUnit::Second,
            },
            ScalarValue::Array(items) => {
                let elem = items
                    .iter()
                    .map(ScalarValue::data_type)
                    .try_fold(DataType::Null, |acc, t| crate::types::unify(&acc, &t))
                    .unwrap_or(DataType::Null);
                DataType::Array(Box::new(elem))
            }
            ScalarValue::Struct(fields) => DataType::Struct(
                fields
                    .iter()
                    .map(|(n, v)| crate::types::StructField::new(n.clone(), v.data_type()))
                    .collect(),
            ),
            ScalarValue::Map(entries) => {
                let (k, v) = entries
                    .first()
                    .map(|(k, v)| (k.data_type(), v.data_type()))
                    .unwrap_or((DataType::Null, DataType::Null));
                DataType::Map {
                    key: Box::new(k),
                    value: Box::new(v),
                }
            }
        }
    }

    /// Convert this value so it is representable in `target`.
    ///
    /// Integer narrowing and decimal precision overflow are errors, never
    /// silent truncation. Float-to-integer casts truncate toward zero.
    pub fn cast_to(&self, target: &DataType) -> CoreResult<ScalarValue> {
        let fail = || CoreError::InvalidCast {
            value: self.to_string(),
            target: target.display_name(),
        };

        if self.is_null() {
            return Ok(ScalarValue::Null);
        }

        match (self, target) {
            (ScalarValue::Boolean(b), DataType::Boolean) => Ok(ScalarValue::Boolean(*b)),

            (ScalarValue::Integer(v), DataType::Integer { bits }) => {
                check_int_range(*v, *bits).ok_or_else(fail)
            }
            (ScalarValue::Float(v), DataType::Integer { bits }) => {
                if !v.is_finite() {
                    return Err(fail());
                }
                let truncated = v.trunc();
                if truncated < i64::MIN as f64 || truncated > i64::MAX as f64 {
                    return Err(fail());
                }
                check_int_range(truncated as i64, *bits).ok_or_else(fail)
            }
            (ScalarValue::Decimal { value, scale }, DataType::Integer { bits }) => {
                // A scale past the i128 range leaves no integral digits
                let whole = 10i128.checked_pow(*scale as u32).map_or(0, |d| value / d);
                let whole = i64::try_from(whole).map_err(|_| fail())?;
                check_int_range(whole, *bits).ok_or_else(fail)
            }

            (ScalarValue::Integer(v), DataType::Float { bits }) => Ok(round_float(*v as f64, *bits)),
            (ScalarValue::Float(v), DataType::Float { bits }) => Ok(round_float(*v, *bits)),
            (ScalarValue::Decimal { .. }, DataType::Float { bits }) => {
                Ok(round_float(self.as_f64().ok_or_else(fail)?, *bits))
            }

            (ScalarValue::Integer(v), DataType::Decimal { precision, scale }) => {
                let unscaled = (*v as i128)
                    .checked_mul(10i128.checked_pow(*scale as u32).ok_or_else(fail)?)
                    .ok_or_else(fail)?;
                check_decimal(unscaled, *precision, *scale).ok_or_else(fail)
            }
            (ScalarValue::Float(v), DataType::Decimal { precision, scale }) => {
                if !v.is_finite() {
                    return Err(fail());
                }
                let scaled = (v * 10f64.powi(*scale as i32)).round();
                if scaled.abs() >= 1e38 {
                    return Err(fail());
                }
                check_decimal(scaled as i128, *precision, *scale).ok_or_else(fail)
            }
            (
                ScalarValue::Decimal { value, scale: from },
                DataType::Decimal { precision, scale },
            ) => {
                let rescaled = rescale(*value, *from, *scale).ok_or_else(fail)?;
                check_decimal(rescaled, *precision, *scale).ok_or_else(fail)
            }

            (ScalarValue::String(s), DataType::String) => Ok(ScalarValue::String(s.clone())),
            (ScalarValue::String(s), DataType::Integer { bits }) => {
                let v: i64 = s.trim().parse().map_err(|_| fail())?;
                check_int_range(v, *bits).ok_or_else(fail)
            }
            (ScalarValue::String(s), DataType::Float { bits }) => {
                let v: f64 = s.trim().parse().map_err(|_| fail())?;
                Ok(round_float(v, *bits))
            }
            (ScalarValue::String(s), DataType::Date) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map(ScalarValue::Date)
                .map_err(|_| fail()),
            (ScalarValue::String(s), DataType::Timestamp { .. }) => {
                NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M:%S%.f")
                    .map(ScalarValue::Timestamp)
                    .map_err(|_| fail())
            }
            (other, DataType::String) => Ok(ScalarValue::String(other.to_string())),

            (ScalarValue::Binary(b), DataType::Binary) => Ok(ScalarValue::Binary(b.clone())),
            (ScalarValue::Date(d), DataType::Date) => Ok(ScalarValue::Date(*d)),
            (ScalarValue::Date(d), DataType::Timestamp { .. }) => {
                Ok(ScalarValue::Timestamp(d.and_time(NaiveTime::MIN)))
            }
            (ScalarValue::Timestamp(t), DataType::Timestamp { .. }) => Ok(ScalarValue::Timestamp(*t)),
            (ScalarValue::Timestamp(t), DataType::Date) => Ok(ScalarValue::Date(t.date())),
            (ScalarValue::Time(t), DataType::Time) => Ok(ScalarValue::Time(*t)),
            (ScalarValue::Interval(v), DataType::Interval { .. }) => Ok(ScalarValue::Interval(*v)),

            (ScalarValue::Array(items), DataType::Array(elem)) => items
                .iter()
                .map(|i| i.cast_to(elem))
                .collect::<CoreResult<Vec<_>>>()
                .map(ScalarValue::Array),
            (ScalarValue::Struct(fields), DataType::Struct(target_fields))
                if fields.len() == target_fields.len() =>
            {
                fields
                    .iter()
                    .zip(target_fields.iter())
                    .map(|((name, v), tf)| {
                        if *name != tf.name {
                            return Err(fail());
                        }
                        Ok((name.clone(), v.cast_to(&tf.data_type)?))
                    })
                    .collect::<CoreResult<Vec<_>>>()
                    .map(ScalarValue::Struct)
            }
            (ScalarValue::Map(entries), DataType::Map { key, value }) => entries
                .iter()
                .map(|(k, v)| Ok((k.cast_to(key)?, v.cast_to(value)?)))
                .collect::<CoreResult<Vec<_>>>()
                .map(ScalarValue::Map),

            _ => Err(fail()),
        }
    }

    /// SQL ordering: `None` when either side is null or the values are not comparable.
    ///
    /// Numeric values compare across integer, float and decimal representations.
    pub fn compare(&self, other: &ScalarValue) -> Option<Ordering> {
        use ScalarValue as V;
        match (self, other) {
            (V::Null, _) | (_, V::Null) => None,
            (V::Boolean(a), V::Boolean(b)) => Some(a.cmp(b)),
            (V::Integer(a), V::Integer(b)) => Some(a.cmp(b)),
            (V::Decimal { value: a, scale: sa }, V::Decimal { value: b, scale: sb }) => {
                let scale = *sa.max(sb);
                let a = rescale(*a, *sa, scale)?;
                let b = rescale(*b, *sb, scale)?;
                Some(a.cmp(&b))
            }
            (V::Integer(a), V::Decimal { value, scale }) => {
                let a = (*a as i128).checked_mul(10i128.checked_pow(*scale as u32)?)?;
                Some(a.cmp(value))
            }
            (V::Decimal { .. }, V::Integer(_)) => other.compare(self).map(Ordering::reverse),
            (a, b) if a.as_f64().is_some() && b.as_f64().is_some() => {
                a.as_f64()?.partial_cmp(&b.as_f64()?)
            }
            (V::String(a), V::String(b)) => Some(a.cmp(b)),
            (V::Binary(a), V::Binary(b)) => Some(a.cmp(b)),
            (V::Date(a), V::Date(b)) => Some(a.cmp(b)),
            (V::Time(a), V::Time(b)) => Some(a.cmp(b)),
            (V::Timestamp(a), V::Timestamp(b)) => Some(a.cmp(b)),
            (V::Date(a), V::Timestamp(b)) => Some(a.and_time(NaiveTime::MIN).cmp(b)),
            (V::Timestamp(a), V::Date(b)) => Some(a.cmp(&b.and_time(NaiveTime::MIN))),
            (V::Interval(a), V::Interval(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Total order used for sorting: nulls sort before every non-null value
    /// and incomparable values are treated as equal.
    pub fn sort_cmp(&self, other: &ScalarValue) -> Ordering {
        match (self.is_null(), other.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.compare(other).unwrap_or(Ordering::Equal),
        }
    }
}

fn check_int_range(v: i64, bits: IntBitWidth) -> Option<ScalarValue> {
    let (min, max) = bits.range();
    (min..=max).contains(&v).then_some(ScalarValue::Integer(v))
}

fn round_float(v: f64, bits: FloatBitWidth) -> ScalarValue {
    match bits {
        FloatBitWidth::F32 => ScalarValue::Float(v as f32 as f64),
        FloatBitWidth::F64 => ScalarValue::Float(v),
    }
}

fn check_decimal(unscaled: i128, precision: u8, scale: u8) -> Option<ScalarValue> {
    let limit = 10i128.checked_pow(precision as u32)?;
    (unscaled.abs() < limit).then_some(ScalarValue::Decimal {
        value: unscaled,
        scale,
    })
}

/// Change the scale of an unscaled decimal, rounding half away from zero
/// when the scale shrinks.
pub fn rescale(value: i128, from: u8, to: u8) -> Option<i128> {
    match from.cmp(&to) {
        Ordering::Equal => Some(value),
        Ordering::Less => value.checked_mul(10i128.checked_pow((to - from) as u32)?),
        Ordering::Greater => {
            let divisor = 10i128.checked_pow((from - to) as u32)?;
            let quotient = value / divisor;
            let remainder = value % divisor;
            if remainder.abs() * 2 >= divisor {
                Some(quotient + value.signum())
            } else {
                Some(quotient)
            }
        }
    }
}

impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        use ScalarValue as V;
        match (self, other) {
            (V::Null, V::Null) => true,
            (V::Boolean(a), V::Boolean(b)) => a == b,
            (V::Integer(a), V::Integer(b)) => a == b,
            (V::Float(a), V::Float(b)) => a.to_bits() == b.to_bits(),
            (V::Decimal { value: a, scale: sa }, V::Decimal { value: b, scale: sb }) => {
                a == b && sa == sb
            }
            (V::String(a), V::String(b)) => a == b,
            (V::Binary(a), V::Binary(b)) => a == b,
            (V::Date(a), V::Date(b)) => a == b,
            (V::Time(a), V::Time(b)) => a == b,
            (V::Timestamp(a), V::Timestamp(b)) => a == b,
            (V::Interval(a), V::Interval(b)) => a == b,
            (V::Array(a), V::Array(b)) => a == b,
            (V::Struct(a), V::Struct(b)) => a == b,
            (V::Map(a), V::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ScalarValue {}

impl Hash for ScalarValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            ScalarValue::Null => {}
            ScalarValue::Boolean(b) => b.hash(state),
            ScalarValue::Integer(v) => v.hash(state),
            ScalarValue::Float(v) => v.to_bits().hash(state),
            ScalarValue::Decimal { value, scale } => {
                value.hash(state);
                scale.hash(state);
            }
            ScalarValue::String(s) => s.hash(state),
            ScalarValue::Binary(b) => b.hash(state),
            ScalarValue::Date(d) => d.hash(state),
            ScalarValue::Time(t) => t.hash(state),
            ScalarValue::Timestamp(t) => t.hash(state),
            ScalarValue::Interval(v) => v.hash(state),
            ScalarValue::Array(items) => items.hash(state),
            ScalarValue::Struct(fields) => fields.hash(state),
            ScalarValue::Map(entries) => entries.hash(state),
        }
    }
}

impl std::fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarValue::Null => write!(f, "NULL"),
            ScalarValue::Boolean(b) => write!(f, "{b}"),
            ScalarValue::Integer(v) => write!(f, "{v}"),
            ScalarValue::Float(v) => write!(f, "{v:?}"),
            ScalarValue::Decimal { value, scale } => {
                if *scale == 0 {
                    return write!(f, "{value}");
                }
                let sign = if *value < 0 { "-" } else { "" };
                let abs = value.unsigned_abs();
                let (whole, fraction) = match 10u128.checked_pow(*scale as u32) {
                    Some(divisor) => (abs / divisor, abs % divisor),
                    None => (0, abs),
                };
                write!(
                    f,
                    "{sign}{whole}.{fraction:0width$}",
                    width = *scale as usize
                )
            }
            ScalarValue::String(s) => write!(f, "'{s}'"),
            ScalarValue::Binary(b) => {
                write!(f, "x'")?;
                for byte in b {
                    write!(f, "{byte:02x}")?;
                }
                write!(f, "'")
            }
            ScalarValue::Date(d) => write!(f, "{d}"),
            ScalarValue::Time(t) => write!(f, "{t}"),
            ScalarValue::Timestamp(t) => write!(f, "{t}"),
            ScalarValue::Interval(v) => write!(f, "INTERVAL {v}"),
            ScalarValue::Array(items) => {
                let parts: Vec<String> = items.iter().map(|i| i.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            ScalarValue::Struct(fields) => {
                let parts: Vec<String> = fields.iter().map(|(n, v)| format!("{n}: {v}")).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            ScalarValue::Map(entries) => {
                let parts: Vec<String> = entries.iter().map(|(k, v)| format!("{k} => {v}")).collect();
                write!(f, "MAP{{{}}}", parts.join(", "))
            }
        }
    }
}

impl From<bool> for ScalarValue {
    fn from(v: bool) -> Self {
        ScalarValue::Boolean(v)
    }
}

impl From<i64> for ScalarValue {
    fn from(v: i64) -> Self {
        ScalarValue::Integer(v)
    }
}

impl From<i32> for ScalarValue {
    fn from(v: i32) -> Self {
        ScalarValue::Integer(v as i64)
    }
}

impl From<f64> for ScalarValue {
    fn from(v: f64) -> Self {
        ScalarValue::Float(v)
    }
}

impl From<&str> for ScalarValue {
    fn from(v: &str) -> Self {
        ScalarValue::String(v.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(v: String) -> Self {
        ScalarValue::String(v)
    }
}

impl From<NaiveDate> for ScalarValue {
    fn from(v: NaiveDate) -> Self {
        ScalarValue::Date(v)
    }
}

#[cfg(test)]
#[path = "value_test.rs"]
mod tests;
