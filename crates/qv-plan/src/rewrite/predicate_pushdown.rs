//! Specialize UDF calls for the input domain a sibling filter guarantees.
//!
//! Pattern: `Filter(preds) over Project(cols) over base`, where a conjunct of
//! `preds` compares a projected column with a literal and that column is a
//! plain pass-through of a base column which is also passed, unchanged, as an
//! argument to a UDF in `cols`. The UDF's specializer is asked for a body
//! narrowed to the constrained domain; the call is swapped for the
//! specialized variant and the filter is left as it was.
//!
//! The specialized variant routes every argument tuple outside the domain to
//! the original body, so the rewrite is exact even for rows the filter later
//! discards.

use super::expr_utils::{conjuncts, field_comparison};
use super::{RewriteResult, RewriteRule, RewriteSafetyError};
use crate::function::udf::{self, CmpOp, InputConstraint};
use crate::function::Volatility;
use crate::ir::expr::{Expr, ExprKind};
use crate::ir::rel::{Rel, RelOp};
use crate::ir::traverse::Transformed;
use qv_core::{NodeId, ScalarValue};
use std::collections::HashMap;
use std::sync::Arc;

pub(crate) const NAME: &str = "predicate_pushdown_udf";

/// Narrow UDF calls below a filter to the filtered domain
pub(crate) struct PredicatePushdownUdf;

impl RewriteRule for PredicatePushdownUdf {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Specialize UDF calls for the input domain guaranteed by a sibling filter"
    }

    fn apply(&self, rel: &Rel) -> RewriteResult {
        let RelOp::Filter { input: project, predicates } = rel.op() else {
            return Ok(None);
        };
        let RelOp::Project {
            input: base,
            columns,
        } = project.op()
        else {
            return Ok(None);
        };

        let bounds = constrained_inputs(predicates, project, base, columns);
        if bounds.is_empty() {
            return Ok(None);
        }

        let mut declined: Option<RewriteSafetyError> = None;
        let mut changed = false;
        let mut new_columns = Vec::with_capacity(columns.len());
        for (name, expr) in columns {
            let rewritten = specialize_calls(expr, &bounds, &mut declined)?;
            changed |= rewritten.id() != expr.id();
            new_columns.push((name.clone(), rewritten));
        }
        if !changed {
            return match declined {
                Some(reason) => Err(reason),
                None => Ok(None),
            };
        }

        let new_project = base.project(new_columns)?;
        Ok(Some(rel.with_new_inputs(vec![new_project])?))
    }
}

/// Literal bounds per base column expression, keyed by the field node's id
fn constrained_inputs(
    predicates: &[Expr],
    project: &Rel,
    base: &Rel,
    columns: &[(String, Expr)],
) -> HashMap<NodeId, Vec<(CmpOp, ScalarValue)>> {
    let mut bounds: HashMap<NodeId, Vec<(CmpOp, ScalarValue)>> = HashMap::new();
    for conjunct in predicates.iter().flat_map(conjuncts) {
        let Some((field, op, value)) = field_comparison(&conjunct) else {
            continue;
        };
        if field.relation().id() != project.id() {
            continue;
        }
        let Some((_, source)) = columns.get(field.index()) else {
            continue;
        };
        let passes_through = source
            .as_field()
            .is_some_and(|f| f.relation().id() == base.id());
        if passes_through {
            bounds.entry(source.id()).or_default().push((op, value));
        }
    }
    bounds
}

fn specialize_calls(
    expr: &Expr,
    bounds: &HashMap<NodeId, Vec<(CmpOp, ScalarValue)>>,
    declined: &mut Option<RewriteSafetyError>,
) -> Result<Expr, RewriteSafetyError> {
    let rewritten = expr.transform_up(&mut |e| {
        let ExprKind::Call { func, args } = e.kind() else {
            return Ok(Transformed::Keep);
        };
        if !func.is_user_defined() {
            return Ok(Transformed::Keep);
        }
        let inputs = func.input_names();
        let mut constraints = Vec::new();
        for (position, arg) in args.iter().enumerate() {
            let Some(known) = bounds.get(&arg.id()) else {
                continue;
            };
            let input = inputs.get(position).copied().unwrap_or_default();
            for (op, value) in known {
                constraints.push(InputConstraint {
                    position,
                    input: input.to_string(),
                    op: *op,
                    value: value.clone(),
                });
            }
        }
        if constraints.is_empty() {
            return Ok(Transformed::Keep);
        }

        let reason = if func.is_specialized() {
            RewriteSafetyError::AlreadySpecialized(func.name().to_string())
        } else if func.volatility() == Volatility::Volatile {
            RewriteSafetyError::VolatileCall(e.to_string())
        } else {
            match udf::specialize(func, constraints) {
                Some(def) => {
                    return Ok(Transformed::Replace(Expr::call(Arc::new(def), args.clone())?));
                }
                None => RewriteSafetyError::SpecializerDeclined(func.name().to_string()),
            }
        };
        declined.get_or_insert(reason);
        Ok(Transformed::Keep)
    })?;
    Ok(rewritten)
}

#[cfg(test)]
#[path = "predicate_pushdown_test.rs"]
mod tests;
