//! Evaluate literal-only scalar expressions at rewrite time

use super::expr_utils::is_true;
use super::{RewriteResult, RewriteRule, RewriteSafetyError};
use crate::error::PlanResult;
use crate::function::Volatility;
use crate::ir::expr::{Expr, ExprKind};
use crate::ir::rel::{Rel, RelOp};
use crate::ir::traverse::Transformed;
use qv_core::ScalarValue;

pub(crate) const NAME: &str = "constant_folding";

/// Replace immutable calls and casts over literals with their value
pub(crate) struct ConstantFolding;

impl RewriteRule for ConstantFolding {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Evaluate immutable calls over literals and drop always-true filter predicates"
    }

    fn apply(&self, rel: &Rel) -> RewriteResult {
        if rel.expressions().is_empty() {
            return Ok(None);
        }
        let mut declined: Option<RewriteSafetyError> = None;
        let mut changed = false;
        let mut fold = |e: &Expr| -> PlanResult<Expr> {
            let folded = fold_expr(e, &mut declined)?;
            changed |= folded.id() != e.id();
            Ok(folded)
        };
        let folded = rel.map_expressions(&mut fold)?;

        if let RelOp::Filter { input, predicates } = folded.op() {
            let kept: Vec<Expr> = predicates.iter().filter(|p| !is_true(p)).cloned().collect();
            if kept.is_empty() {
                return Ok(Some(input.clone()));
            }
            if kept.len() != predicates.len() {
                return Ok(Some(input.filter(kept)?));
            }
        }
        if changed {
            return Ok(Some(folded));
        }
        match declined {
            Some(reason) => Err(reason),
            None => Ok(None),
        }
    }
}

/// Fold every foldable sub-expression of `expr`, bottom-up.
///
/// The first reason a call could not be folded is stored in `declined`.
pub(crate) fn fold_expr(expr: &Expr, declined: &mut Option<RewriteSafetyError>) -> PlanResult<Expr> {
    expr.transform_up(&mut |e| {
        let value = match e.kind() {
            ExprKind::Call { func, args } => {
                if func.volatility() != Volatility::Immutable {
                    return Ok(Transformed::Keep);
                }
                let Some(values) = literal_args(args) else {
                    return Ok(Transformed::Keep);
                };
                match func.evaluate(&values) {
                    Ok(v) => v,
                    Err(source) => {
                        declined.get_or_insert(RewriteSafetyError::EvaluationFailed {
                            expr: e.to_string(),
                            source,
                        });
                        return Ok(Transformed::Keep);
                    }
                }
            }
            ExprKind::Cast { arg, .. } => match arg.as_literal() {
                Some(v) => v.clone(),
                None => return Ok(Transformed::Keep),
            },
            _ => return Ok(Transformed::Keep),
        };

        let value = match value.cast_to(e.data_type()) {
            Ok(v) => v,
            Err(err) => {
                declined.get_or_insert(RewriteSafetyError::EvaluationFailed {
                    expr: e.to_string(),
                    source: err.into(),
                });
                return Ok(Transformed::Keep);
            }
        };
        if value.is_null() && !e.nullability().is_nullable() {
            declined.get_or_insert(RewriteSafetyError::NullabilityWidened(e.to_string()));
            return Ok(Transformed::Keep);
        }
        Ok(Transformed::Replace(Expr::typed_literal_with_nullability(
            value,
            e.data_type().clone(),
            e.nullability(),
        )?))
    })
}

fn literal_args(args: &[Expr]) -> Option<Vec<ScalarValue>> {
    args.iter().map(|a| a.as_literal().cloned()).collect()
}

#[cfg(test)]
#[path = "constant_folding_test.rs"]
mod tests;
