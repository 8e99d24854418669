//! Drop upstream columns no ancestor references.
//!
//! The rule fires at the nodes that select columns (projections and
//! aggregates) and pushes the set of required columns down through filters,
//! sorts, limits, aliases, nested projections, aggregates and joins. A source
//! gets a pass-through projection when only part of it is needed. Volatile
//! columns are never dropped.

use super::expr_utils::referenced_columns;
use super::{RewriteResult, RewriteRule, RewriteSafetyError};
use crate::ir::expr::Expr;
use crate::ir::rel::{Rel, RelOp};
use std::collections::BTreeSet;

pub(crate) const NAME: &str = "column_pruning";

type Required = BTreeSet<String>;

/// Prune the inputs of projections and aggregates to the columns they use
pub(crate) struct ColumnPruning;

impl RewriteRule for ColumnPruning {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Drop upstream columns that no ancestor references"
    }

    fn apply(&self, rel: &Rel) -> RewriteResult {
        let (input, required) = match rel.op() {
            RelOp::Project { input, columns } => {
                (input, referenced_columns(columns.iter().map(|(_, e)| e), input))
            }
            RelOp::Aggregate {
                input,
                keys,
                metrics,
            } => (
                input,
                referenced_columns(keys.iter().chain(metrics.iter()).map(|(_, e)| e), input),
            ),
            _ => return Ok(None),
        };
        // The consumer already selects from the source
        if matches!(input.op(), RelOp::Source { .. }) {
            return Ok(None);
        }
        let Some(pruned) = prune(input, &required)? else {
            return Ok(None);
        };
        verify(input, &pruned, &required)?;
        Ok(Some(rel.with_new_inputs(vec![pruned])?))
    }
}

/// Pruned replacement for `rel` exposing at least `required`, or `None` if nothing changes
fn prune(rel: &Rel, required: &Required) -> Result<Option<Rel>, RewriteSafetyError> {
    match rel.op() {
        RelOp::Source { .. } => {
            if required.len() >= rel.schema().len() {
                return Ok(None);
            }
            let mut columns = Vec::new();
            for field in rel.schema().fields() {
                if required.contains(&field.name) {
                    columns.push((field.name.clone(), rel.col(&field.name)?));
                }
            }
            if columns.is_empty() {
                // Row count still matters; keep one column
                if let Some(field) = rel.schema().fields().first() {
                    columns.push((field.name.clone(), rel.col(&field.name)?));
                }
            }
            Ok(Some(rel.project(columns)?))
        }
        RelOp::Project { input, columns } => {
            let mut kept: Vec<(String, Expr)> = columns
                .iter()
                .filter(|(name, e)| required.contains(name) || e.is_volatile())
                .cloned()
                .collect();
            if kept.is_empty() {
                kept.extend(columns.iter().take(1).cloned());
            }
            let below = referenced_columns(kept.iter().map(|(_, e)| e), input);
            let child = prune_below_selector(input, &below)?;
            if kept.len() == columns.len() && child.is_none() {
                return Ok(None);
            }
            let node = input.project(kept)?;
            Ok(Some(with_child(node, child)?))
        }
        RelOp::Aggregate {
            input,
            keys,
            metrics,
        } => {
            let mut kept: Vec<(String, Expr)> = metrics
                .iter()
                .filter(|(name, e)| required.contains(name) || e.is_volatile())
                .cloned()
                .collect();
            if keys.is_empty() && kept.is_empty() {
                kept.extend(metrics.iter().take(1).cloned());
            }
            let below = referenced_columns(
                keys.iter().chain(kept.iter()).map(|(_, e)| e),
                input,
            );
            let child = prune_below_selector(input, &below)?;
            if kept.len() == metrics.len() && child.is_none() {
                return Ok(None);
            }
            let node = input.aggregate(keys.clone(), kept)?;
            Ok(Some(with_child(node, child)?))
        }
        RelOp::Filter { input, predicates } => {
            let mut below = required.clone();
            below.extend(referenced_columns(predicates, input));
            prune_through(rel, input, &below)
        }
        RelOp::Sort { input, keys } => {
            let mut below = required.clone();
            below.extend(referenced_columns(keys.iter().map(|k| &k.expr), input));
            prune_through(rel, input, &below)
        }
        RelOp::Limit { input, .. } | RelOp::Alias { input, .. } => {
            prune_through(rel, input, required)
        }
        RelOp::Join {
            left,
            right,
            kind,
            predicates,
        } => {
            let left_len = left.schema().len();
            let mut left_req = referenced_columns(predicates, left);
            let mut right_req = referenced_columns(predicates, right);
            for name in required {
                let Some(index) = rel.schema().index_of(name) else {
                    continue;
                };
                if index < left_len {
                    if let Some(field) = left.schema().field_at(index) {
                        left_req.insert(field.name.clone());
                    }
                } else if !kind.is_filtering() {
                    if let Some(field) = right.schema().field_at(index - left_len) {
                        right_req.insert(field.name.clone());
                    }
                }
            }
            // Keep left columns that make right columns collide, so renamed
            // right columns keep their names
            for name in &right_req {
                if left.schema().contains(name) {
                    left_req.insert(name.clone());
                }
            }
            let new_left = prune(left, &left_req)?;
            let new_right = prune(right, &right_req)?;
            if new_left.is_none() && new_right.is_none() {
                return Ok(None);
            }
            let inputs = vec![
                new_left.unwrap_or_else(|| left.clone()),
                new_right.unwrap_or_else(|| right.clone()),
            ];
            Ok(Some(rel.with_new_inputs(inputs)?))
        }
        // Both sides contribute every column to row identity
        RelOp::SetOp { .. } => Ok(None),
    }
}

/// Prune beneath a projection or aggregate; a source directly below is left alone
fn prune_below_selector(input: &Rel, required: &Required) -> Result<Option<Rel>, RewriteSafetyError> {
    if matches!(input.op(), RelOp::Source { .. }) {
        return Ok(None);
    }
    prune(input, required)
}

fn prune_through(rel: &Rel, input: &Rel, required: &Required) -> Result<Option<Rel>, RewriteSafetyError> {
    match prune(input, required)? {
        Some(child) => Ok(Some(rel.with_new_inputs(vec![child])?)),
        None => Ok(None),
    }
}

fn with_child(node: Rel, child: Option<Rel>) -> Result<Rel, RewriteSafetyError> {
    match child {
        Some(child) => Ok(node.with_new_inputs(vec![child])?),
        None => Ok(node),
    }
}

/// Every required column must survive with its type unchanged
fn verify(original: &Rel, pruned: &Rel, required: &Required) -> Result<(), RewriteSafetyError> {
    for name in required {
        let before = original.schema().field(name);
        let after = pruned.schema().field(name);
        match (before, after) {
            (Some(b), Some(a)) if a.data_type == b.data_type => {}
            _ => {
                return Err(RewriteSafetyError::UnprovenConstraint(format!(
                    "column '{name}' survives pruning of {}",
                    original.label()
                )))
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "column_pruning_test.rs"]
mod tests;
