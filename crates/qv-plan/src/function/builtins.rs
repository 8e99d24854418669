//! Built-in scalar functions.
//!
//! Arguments arrive already coerced to the call's common type, so arithmetic
//! only ever combines values of one representation.

use super::{eval_fn, FunctionDef, TypeRule};
use crate::error::{PlanError, PlanResult};
use qv_core::value::rescale;
use qv_core::ScalarValue;
use std::cmp::Ordering;

#[derive(Clone, Copy)]
enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithOp {
    fn name(self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "subtract",
            ArithOp::Mul => "multiply",
            ArithOp::Div => "divide",
            ArithOp::Mod => "modulo",
        }
    }
}

pub(super) fn all() -> PlanResult<Vec<FunctionDef>> {
    let mut defs = Vec::new();

    for op in [ArithOp::Add, ArithOp::Sub, ArithOp::Mul, ArithOp::Div, ArithOp::Mod] {
        defs.push(FunctionDef::builtin(
            op.name(),
            TypeRule::Arithmetic,
            eval_fn(move |args| arithmetic(op, arg(args, 0), arg(args, 1))),
        )?);
    }
    defs.push(FunctionDef::builtin("negate", TypeRule::Numeric, eval_fn(negate))?);
    defs.push(FunctionDef::builtin("abs", TypeRule::Numeric, eval_fn(abs))?);

    let comparisons: [(&str, fn(Ordering) -> bool); 6] = [
        ("eq", |o| o == Ordering::Equal),
        ("not_eq", |o| o != Ordering::Equal),
        ("lt", |o| o == Ordering::Less),
        ("lt_eq", |o| o != Ordering::Greater),
        ("gt", |o| o == Ordering::Greater),
        ("gt_eq", |o| o != Ordering::Less),
    ];
    for (name, test) in comparisons {
        defs.push(FunctionDef::builtin(
            name,
            TypeRule::Comparison,
            eval_fn(move |args| Ok(compare(arg(args, 0), arg(args, 1), test))),
        )?);
    }

    defs.push(FunctionDef::builtin("and", TypeRule::Logical, eval_fn(and))?);
    defs.push(FunctionDef::builtin("or", TypeRule::Logical, eval_fn(or))?);
    defs.push(FunctionDef::builtin(
        "not",
        TypeRule::Not,
        eval_fn(|args| {
            Ok(match arg(args, 0) {
                ScalarValue::Boolean(b) => ScalarValue::Boolean(!b),
                _ => ScalarValue::Null,
            })
        }),
    )?);
    defs.push(FunctionDef::builtin(
        "is_null",
        TypeRule::NullCheck,
        eval_fn(|args| Ok(ScalarValue::Boolean(arg(args, 0).is_null()))),
    )?);
    defs.push(FunctionDef::builtin(
        "is_not_null",
        TypeRule::NullCheck,
        eval_fn(|args| Ok(ScalarValue::Boolean(!arg(args, 0).is_null()))),
    )?);
    defs.push(FunctionDef::builtin(
        "coalesce",
        TypeRule::Coalesce,
        eval_fn(|args| {
            Ok(args
                .iter()
                .find(|v| !v.is_null())
                .cloned()
                .unwrap_or(ScalarValue::Null))
        }),
    )?);
    defs.push(FunctionDef::builtin(
        "if_else",
        TypeRule::IfElse,
        eval_fn(|args| {
            Ok(match arg(args, 0) {
                ScalarValue::Boolean(true) => arg(args, 1).clone(),
                _ => arg(args, 2).clone(),
            })
        }),
    )?);

    defs.push(FunctionDef::builtin(
        "lower",
        TypeRule::StringUnary,
        eval_fn(|args| Ok(map_string(arg(args, 0), |s| s.to_lowercase()))),
    )?);
    defs.push(FunctionDef::builtin(
        "upper",
        TypeRule::StringUnary,
        eval_fn(|args| Ok(map_string(arg(args, 0), |s| s.to_uppercase()))),
    )?);
    defs.push(FunctionDef::builtin(
        "length",
        TypeRule::StringLength,
        eval_fn(|args| {
            Ok(match arg(args, 0) {
                ScalarValue::String(s) => ScalarValue::Integer(s.chars().count() as i64),
                _ => ScalarValue::Null,
            })
        }),
    )?);
    defs.push(FunctionDef::builtin(
        "concat",
        TypeRule::Concat,
        eval_fn(|args| {
            let mut out = String::new();
            for arg in args {
                match arg {
                    ScalarValue::String(s) => out.push_str(s),
                    _ => return Ok(ScalarValue::Null),
                }
            }
            Ok(ScalarValue::String(out))
        }),
    )?);

    Ok(defs)
}

static NULL: ScalarValue = ScalarValue::Null;

/// Argument at `i`, or null when the caller passed fewer values
fn arg(args: &[ScalarValue], i: usize) -> &ScalarValue {
    args.get(i).unwrap_or(&NULL)
}

fn arithmetic(op: ArithOp, a: &ScalarValue, b: &ScalarValue) -> PlanResult<ScalarValue> {
    use ScalarValue as V;
    let overflow = || PlanError::eval(op.name(), "numeric overflow");
    let div_zero = || PlanError::eval(op.name(), "division by zero");

    match (a, b) {
        (V::Null, _) | (_, V::Null) => Ok(V::Null),
        (V::Integer(x), V::Integer(y)) => {
            let result = match op {
                ArithOp::Add => x.checked_add(*y),
                ArithOp::Sub => x.checked_sub(*y),
                ArithOp::Mul => x.checked_mul(*y),
                ArithOp::Div | ArithOp::Mod if *y == 0 => return Err(div_zero()),
                ArithOp::Div => x.checked_div(*y),
                ArithOp::Mod => x.checked_rem(*y),
            };
            result.map(V::Integer).ok_or_else(overflow)
        }
        (V::Decimal { value: x, scale: sx }, V::Decimal { value: y, scale: sy }) => {
            let scale = *sx.max(sy);
            let x = rescale(*x, *sx, scale).ok_or_else(overflow)?;
            let y = rescale(*y, *sy, scale).ok_or_else(overflow)?;
            let unit = 10i128.checked_pow(scale as u32).ok_or_else(overflow)?;
            let value = match op {
                ArithOp::Add => x.checked_add(y),
                ArithOp::Sub => x.checked_sub(y),
                ArithOp::Mul => x.checked_mul(y).map(|p| p / unit),
                ArithOp::Div | ArithOp::Mod if y == 0 => return Err(div_zero()),
                ArithOp::Div => x.checked_mul(unit).map(|n| n / y),
                ArithOp::Mod => x.checked_rem(y),
            }
            .ok_or_else(overflow)?;
            Ok(V::Decimal { value, scale })
        }
        _ => {
            let (x, y) = match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => (x, y),
                _ => {
                    return Err(PlanError::eval(
                        op.name(),
                        format!("cannot apply to {a} and {b}"),
                    ))
                }
            };
            let result = match op {
                ArithOp::Add => x + y,
                ArithOp::Sub => x - y,
                ArithOp::Mul => x * y,
                ArithOp::Div | ArithOp::Mod if y == 0.0 => return Err(div_zero()),
                ArithOp::Div => x / y,
                ArithOp::Mod => x % y,
            };
            Ok(V::Float(result))
        }
    }
}

fn negate(args: &[ScalarValue]) -> PlanResult<ScalarValue> {
    Ok(match arg(args, 0) {
        ScalarValue::Integer(v) => ScalarValue::Integer(
            v.checked_neg()
                .ok_or_else(|| PlanError::eval("negate", "numeric overflow"))?,
        ),
        ScalarValue::Float(v) => ScalarValue::Float(-v),
        ScalarValue::Decimal { value, scale } => ScalarValue::Decimal {
            value: -value,
            scale: *scale,
        },
        _ => ScalarValue::Null,
    })
}

fn abs(args: &[ScalarValue]) -> PlanResult<ScalarValue> {
    Ok(match arg(args, 0) {
        ScalarValue::Integer(v) => ScalarValue::Integer(
            v.checked_abs()
                .ok_or_else(|| PlanError::eval("abs", "numeric overflow"))?,
        ),
        ScalarValue::Float(v) => ScalarValue::Float(v.abs()),
        ScalarValue::Decimal { value, scale } => ScalarValue::Decimal {
            value: value.abs(),
            scale: *scale,
        },
        _ => ScalarValue::Null,
    })
}

fn compare(a: &ScalarValue, b: &ScalarValue, test: fn(Ordering) -> bool) -> ScalarValue {
    if a.is_null() || b.is_null() {
        return ScalarValue::Null;
    }
    match a.compare(b) {
        Some(ordering) => ScalarValue::Boolean(test(ordering)),
        // Nested values have no order but still support equality
        None => {
            let ordering = if a == b {
                Ordering::Equal
            } else {
                Ordering::Less
            };
            ScalarValue::Boolean(test(ordering))
        }
    }
}

fn and(args: &[ScalarValue]) -> PlanResult<ScalarValue> {
    Ok(match (arg(args, 0), arg(args, 1)) {
        (ScalarValue::Boolean(false), _) | (_, ScalarValue::Boolean(false)) => {
            ScalarValue::Boolean(false)
        }
        (ScalarValue::Boolean(true), ScalarValue::Boolean(true)) => ScalarValue::Boolean(true),
        _ => ScalarValue::Null,
    })
}

fn or(args: &[ScalarValue]) -> PlanResult<ScalarValue> {
    Ok(match (arg(args, 0), arg(args, 1)) {
        (ScalarValue::Boolean(true), _) | (_, ScalarValue::Boolean(true)) => {
            ScalarValue::Boolean(true)
        }
        (ScalarValue::Boolean(false), ScalarValue::Boolean(false)) => ScalarValue::Boolean(false),
        _ => ScalarValue::Null,
    })
}

fn map_string(value: &ScalarValue, f: impl Fn(&str) -> String) -> ScalarValue {
    match value {
        ScalarValue::String(s) => ScalarValue::String(f(s)),
        _ => ScalarValue::Null,
    }
}
