//! Binding of field references to a consumer's inputs

use crate::error::{PlanError, PlanResult};
use crate::ir::expr::{Expr, FieldRef};
use crate::ir::rel::{Rel, RelOp};
use crate::ir::traverse::Transformed;
use qv_core::NodeId;
use std::collections::HashMap;

/// Re-bind every field of `expr` to one of `inputs`.
///
/// A field bound directly to an input stays there. Otherwise the column is
/// traced down each input through operators that pass it through unchanged;
/// it must be reachable through exactly one path.
pub(crate) fn bind_expr(expr: &Expr, inputs: &[&Rel], consumer: &str) -> PlanResult<Expr> {
    expr.transform_up(&mut |e| {
        let Some(field) = e.as_field() else {
            return Ok(Transformed::Keep);
        };
        let (rel, index) = locate(field, inputs, consumer)?;
        if rel.id() == field.relation().id() && index == field.index() {
            return Ok(Transformed::Keep);
        }
        Ok(Transformed::Replace(Expr::bound_field(rel, index)?))
    })
}

fn locate<'a>(field: &FieldRef, inputs: &[&'a Rel], consumer: &str) -> PlanResult<(&'a Rel, usize)> {
    if let Some(direct) = inputs.iter().find(|r| r.id() == field.relation().id()) {
        return Ok((*direct, field.index()));
    }

    let mut hits = Vec::new();
    for input in inputs {
        let mut memo = HashMap::new();
        for index in trace(input, field.relation(), field.index(), &mut memo) {
            hits.push((*input, index));
        }
    }
    match hits.as_slice() {
        [] => Err(PlanError::ForeignReference {
            column: field.name().to_string(),
            origin: field.relation().label(),
            relation: consumer.to_string(),
        }),
        [hit] => Ok(*hit),
        _ => Err(PlanError::AmbiguousColumn {
            column: field.name().to_string(),
            relation: consumer.to_string(),
        }),
    }
}

/// Output positions of `node` that carry column `index` of `target` unchanged
fn trace(node: &Rel, target: &Rel, index: usize, memo: &mut HashMap<NodeId, Vec<usize>>) -> Vec<usize> {
    if node.id() == target.id() {
        return vec![index];
    }
    if let Some(hit) = memo.get(&node.id()) {
        return hit.clone();
    }
    let out = match node.op() {
        RelOp::Filter { input, .. } | RelOp::Sort { input, .. } | RelOp::Limit { input, .. } => {
            trace(input, target, index, memo)
        }
        RelOp::Project { input, columns } => {
            let below = trace(input, target, index, memo);
            pass_through(input, columns, &below)
        }
        RelOp::Aggregate { input, keys, .. } => {
            let below = trace(input, target, index, memo);
            pass_through(input, keys, &below)
        }
        RelOp::Join {
            left, right, kind, ..
        } => {
            let mut out = trace(left, target, index, memo);
            if !kind.is_filtering() {
                let offset = left.schema().len();
                out.extend(
                    trace(right, target, index, memo)
                        .into_iter()
                        .map(|i| i + offset),
                );
            }
            out
        }
        // Set operations produce new rows; an alias is an identity boundary
        RelOp::Source { .. } | RelOp::SetOp { .. } | RelOp::Alias { .. } => Vec::new(),
    };
    memo.insert(node.id(), out.clone());
    out
}

/// Positions of columns that are bare fields of `input` at one of `below`
fn pass_through(input: &Rel, columns: &[(String, Expr)], below: &[usize]) -> Vec<usize> {
    if below.is_empty() {
        return Vec::new();
    }
    columns
        .iter()
        .enumerate()
        .filter_map(|(pos, (_, e))| {
            let f = e.as_field()?;
            (f.relation().id() == input.id() && below.contains(&f.index())).then_some(pos)
        })
        .collect()
}
