//! Expression helpers shared by rewrite rules

use crate::function::udf::CmpOp;
use crate::ir::expr::{Expr, ExprKind, FieldRef};
use crate::ir::rel::Rel;
use qv_core::ScalarValue;
use std::collections::BTreeSet;

/// Split a predicate on the built-in `and` into its conjuncts
pub(crate) fn conjuncts(pred: &Expr) -> Vec<Expr> {
    match pred.kind() {
        ExprKind::Call { func, args } if !func.is_user_defined() && func.name() == "and" => {
            args.iter().flat_map(conjuncts).collect()
        }
        _ => vec![pred.clone()],
    }
}

/// `field op literal` with the field on the left, from either operand order
pub(crate) fn field_comparison(pred: &Expr) -> Option<(FieldRef, CmpOp, ScalarValue)> {
    let ExprKind::Call { func, args } = pred.kind() else {
        return None;
    };
    if func.is_user_defined() {
        return None;
    }
    let op = CmpOp::from_function(func.name())?;
    let [lhs, rhs] = args.as_slice() else {
        return None;
    };
    let (field, op, value) = match (lhs.as_field(), rhs.as_literal(), rhs.as_field(), lhs.as_literal()) {
        (Some(f), Some(v), _, _) => (f, op, v),
        (_, _, Some(f), Some(v)) => (f, op.flip(), v),
        _ => return None,
    };
    if value.is_null() {
        return None;
    }
    Some((field.clone(), op, value.clone()))
}

/// Names of the columns of `input` referenced anywhere in `exprs`
pub(crate) fn referenced_columns<'a>(
    exprs: impl IntoIterator<Item = &'a Expr>,
    input: &Rel,
) -> BTreeSet<String> {
    exprs
        .into_iter()
        .flat_map(|e| e.fields())
        .filter(|f| f.relation().id() == input.id())
        .map(|f| f.name().to_string())
        .collect()
}

/// Literal `true`
pub(crate) fn is_true(e: &Expr) -> bool {
    matches!(e.as_literal(), Some(ScalarValue::Boolean(true)))
}
