//! Argument type checking and implicit coercion

use super::TypeRule;
use crate::error::{PlanError, PlanResult};
use crate::ir::expr::Expr;
use qv_core::{is_assignable, unify, CastError, DataType, FunctionName, Nullability, ScalarValue};
use std::cmp::Ordering;

/// Coerce one argument to a declared input type.
///
/// Literals are retyped in place when the value converts losslessly; other
/// expressions get a `Cast` node when the type is assignable.
pub(super) fn coerce_arg(
    function: &FunctionName,
    position: usize,
    arg: Expr,
    target: &DataType,
) -> PlanResult<Expr> {
    if arg.data_type() == target {
        return Ok(arg);
    }
    if let Some(value) = arg.as_literal() {
        if let Some(converted) = lossless_cast(value, target) {
            return Expr::typed_literal(converted, target.clone());
        }
    }
    if is_assignable(arg.data_type(), target) {
        return arg.cast(target.clone());
    }
    Err(PlanError::InvalidArgumentType {
        function: function.to_string(),
        position,
        expected: target.to_string(),
        found: arg.data_type().clone(),
    })
}

/// Convert a literal value when doing so loses no information
pub(crate) fn lossless_cast(value: &ScalarValue, target: &DataType) -> Option<ScalarValue> {
    let converted = value.cast_to(target).ok()?;
    if value.is_null() {
        return Some(converted);
    }
    if value.compare(&converted) == Some(Ordering::Equal) {
        return Some(converted);
    }
    // Date and timestamp literals are commonly written as strings
    let temporal = matches!(
        target,
        DataType::Date | DataType::Timestamp { .. } | DataType::Time
    );
    (temporal && matches!(value, ScalarValue::String(_))).then_some(converted)
}

/// Common type of a set of arguments.
///
/// Non-literal arguments decide the type; literals adapt to it when they can
/// be converted losslessly, and only widen it otherwise.
pub(super) fn common_type(args: &[Expr]) -> Result<DataType, CastError> {
    let mut target: Option<DataType> = None;
    for arg in args.iter().filter(|a| a.as_literal().is_none()) {
        target = Some(match target {
            Some(t) => unify(&t, arg.data_type())?,
            None => arg.data_type().clone(),
        });
    }
    let mut target = match target {
        Some(t) => t,
        None => {
            let mut t = DataType::Null;
            for arg in args {
                t = unify(&t, arg.data_type())?;
            }
            return Ok(t);
        }
    };
    for arg in args {
        if let Some(value) = arg.as_literal() {
            if lossless_cast(value, &target).is_none() {
                target = unify(&target, arg.data_type())?;
            }
        }
    }
    Ok(target)
}

fn expect_arity(function: &FunctionName, args: &[Expr], expected: usize) -> PlanResult<()> {
    if args.len() != expected {
        return Err(PlanError::ArityMismatch {
            function: function.to_string(),
            expected: expected.to_string(),
            found: args.len(),
        });
    }
    Ok(())
}

fn expect_at_least(function: &FunctionName, args: &[Expr], min: usize) -> PlanResult<()> {
    if args.len() < min {
        return Err(PlanError::ArityMismatch {
            function: function.to_string(),
            expected: format!("at least {min}"),
            found: args.len(),
        });
    }
    Ok(())
}

fn require(
    function: &FunctionName,
    position: usize,
    data_type: &DataType,
    expected: &str,
    ok: bool,
) -> PlanResult<()> {
    if ok || *data_type == DataType::Null {
        Ok(())
    } else {
        Err(PlanError::InvalidArgumentType {
            function: function.to_string(),
            position,
            expected: expected.to_string(),
            found: data_type.clone(),
        })
    }
}

fn coerce_all(function: &FunctionName, args: Vec<Expr>, target: &DataType) -> PlanResult<Vec<Expr>> {
    args.into_iter()
        .enumerate()
        .map(|(pos, arg)| coerce_arg(function, pos, arg, target))
        .collect()
}

fn combined_nullability(args: &[Expr]) -> Nullability {
    args.iter()
        .fold(Nullability::NotNull, |acc, a| acc.combine(a.nullability()))
}

/// Apply a built-in typing rule
pub(super) fn bind_rule(
    function: &FunctionName,
    rule: TypeRule,
    args: Vec<Expr>,
) -> PlanResult<(Vec<Expr>, DataType, Nullability)> {
    match rule {
        TypeRule::Arithmetic => {
            expect_arity(function, &args, 2)?;
            for (pos, arg) in args.iter().enumerate() {
                require(function, pos, arg.data_type(), "numeric", arg.data_type().is_numeric())?;
            }
            let target = common_type(&args)?;
            let args = coerce_all(function, args, &target)?;
            let nullability = combined_nullability(&args);
            Ok((args, target, nullability))
        }
        TypeRule::Numeric => {
            expect_arity(function, &args, 1)?;
            require(function, 0, args[0].data_type(), "numeric", args[0].data_type().is_numeric())?;
            let out = args[0].data_type().clone();
            let nullability = args[0].nullability();
            Ok((args, out, nullability))
        }
        TypeRule::Comparison => {
            expect_arity(function, &args, 2)?;
            let target = common_type(&args)?;
            let ordered = !matches!(function.as_str(), "eq" | "not_eq");
            if ordered {
                require(function, 0, &target, "orderable", target.is_orderable())?;
            }
            let args = coerce_all(function, args, &target)?;
            let nullability = combined_nullability(&args);
            Ok((args, DataType::Boolean, nullability))
        }
        TypeRule::Logical => {
            expect_arity(function, &args, 2)?;
            let args = coerce_all(function, args, &DataType::Boolean)?;
            let nullability = combined_nullability(&args);
            Ok((args, DataType::Boolean, nullability))
        }
        TypeRule::Not => {
            expect_arity(function, &args, 1)?;
            let args = coerce_all(function, args, &DataType::Boolean)?;
            let nullability = args[0].nullability();
            Ok((args, DataType::Boolean, nullability))
        }
        TypeRule::NullCheck => {
            expect_arity(function, &args, 1)?;
            Ok((args, DataType::Boolean, Nullability::NotNull))
        }
        TypeRule::Coalesce => {
            expect_at_least(function, &args, 1)?;
            let target = common_type(&args)?;
            let args = coerce_all(function, args, &target)?;
            let nullability = if args.iter().any(|a| !a.nullability().is_nullable()) {
                Nullability::NotNull
            } else {
                Nullability::Nullable
            };
            Ok((args, target, nullability))
        }
        TypeRule::IfElse => {
            expect_arity(function, &args, 3)?;
            let mut args = args;
            let branches = args.split_off(1);
            let cond = coerce_arg(function, 0, args.remove(0), &DataType::Boolean)?;
            let target = common_type(&branches)?;
            let mut coerced = vec![cond];
            for (i, branch) in branches.into_iter().enumerate() {
                coerced.push(coerce_arg(function, i + 1, branch, &target)?);
            }
            let nullability = coerced[1].nullability().combine(coerced[2].nullability());
            Ok((coerced, target, nullability))
        }
        TypeRule::StringUnary | TypeRule::StringLength => {
            expect_arity(function, &args, 1)?;
            let args = coerce_all(function, args, &DataType::String)?;
            let out = if rule == TypeRule::StringLength {
                DataType::int64()
            } else {
                DataType::String
            };
            let nullability = args[0].nullability();
            Ok((args, out, nullability))
        }
        TypeRule::Concat => {
            expect_at_least(function, &args, 1)?;
            let args = coerce_all(function, args, &DataType::String)?;
            let nullability = combined_nullability(&args);
            Ok((args, DataType::String, nullability))
        }
    }
}
