//! Bottom-up traversal and node replacement.
//!
//! Both traversals are memoized by structural id, so a sub-DAG shared by
//! several parents is visited (and replaced) exactly once.

use super::expr::{Expr, ExprKind};
use super::rel::Rel;
use crate::builder;
use crate::error::{PlanError, PlanResult};
use qv_core::NodeId;
use std::collections::HashMap;

/// Visitor decision for one node
#[derive(Debug, Clone)]
pub enum Transformed<T> {
    /// Leave the node as it is
    Keep,
    /// Substitute the node
    Replace(T),
}

impl<T> Transformed<T> {
    /// Whether the visitor produced a replacement
    pub fn is_replaced(&self) -> bool {
        matches!(self, Transformed::Replace(_))
    }
}

impl Rel {
    /// Rewrite the DAG bottom-up.
    ///
    /// Inputs are transformed before their consumer; a consumer whose inputs
    /// changed is rebuilt with [`Rel::with_new_inputs`] before `f` sees it.
    pub fn transform_up<F>(&self, f: &mut F) -> PlanResult<Rel>
    where
        F: FnMut(&Rel) -> PlanResult<Transformed<Rel>>,
    {
        let mut memo = HashMap::new();
        transform_rel(self, f, &mut memo)
    }

    /// Rebuild this node over new inputs.
    ///
    /// Fields bound to an old input are re-bound by column name to the input
    /// at the same position, then the node is validated again.
    pub fn with_new_inputs(&self, inputs: Vec<Rel>) -> PlanResult<Rel> {
        let old: Vec<Rel> = self.inputs().into_iter().cloned().collect();
        if old.len() != inputs.len() {
            return Err(PlanError::shape(
                self.kind_name(),
                format!("expected {} input(s), got {}", old.len(), inputs.len()),
            ));
        }
        if old.iter().zip(inputs.iter()).all(|(a, b)| a.id() == b.id()) {
            return Ok(self.clone());
        }
        let mut rebind = |e: &Expr| rebind_fields(e, &old, &inputs);
        builder::rebuild(self, inputs.clone(), &mut rebind)
    }

    /// Rebuild this node with every top-level expression mapped through `f`
    pub fn map_expressions(
        &self,
        f: &mut dyn FnMut(&Expr) -> PlanResult<Expr>,
    ) -> PlanResult<Rel> {
        let inputs = self.inputs().into_iter().cloned().collect();
        builder::rebuild(self, inputs, f)
    }
}

fn transform_rel<F>(rel: &Rel, f: &mut F, memo: &mut HashMap<NodeId, Rel>) -> PlanResult<Rel>
where
    F: FnMut(&Rel) -> PlanResult<Transformed<Rel>>,
{
    if let Some(done) = memo.get(&rel.id()) {
        return Ok(done.clone());
    }
    let mut changed = false;
    let mut new_inputs = Vec::new();
    for input in rel.inputs() {
        let next = transform_rel(input, f, memo)?;
        changed |= next.id() != input.id();
        new_inputs.push(next);
    }
    let rebuilt = if changed {
        rel.with_new_inputs(new_inputs)?
    } else {
        rel.clone()
    };
    let out = match f(&rebuilt)? {
        Transformed::Keep => rebuilt,
        Transformed::Replace(r) => r,
    };
    memo.insert(rel.id(), out.clone());
    Ok(out)
}

impl Expr {
    /// Rewrite the expression bottom-up; changed parents are rebuilt and re-typed
    pub fn transform_up<F>(&self, f: &mut F) -> PlanResult<Expr>
    where
        F: FnMut(&Expr) -> PlanResult<Transformed<Expr>>,
    {
        let mut memo = HashMap::new();
        transform_expr(self, f, &mut memo)
    }
}

fn transform_expr<F>(expr: &Expr, f: &mut F, memo: &mut HashMap<NodeId, Expr>) -> PlanResult<Expr>
where
    F: FnMut(&Expr) -> PlanResult<Transformed<Expr>>,
{
    if let Some(done) = memo.get(&expr.id()) {
        return Ok(done.clone());
    }
    let mut changed = false;
    let mut children = Vec::new();
    for child in expr.children() {
        let next = transform_expr(child, f, memo)?;
        changed |= next.id() != child.id();
        children.push(next);
    }
    let rebuilt = if changed {
        expr.with_new_children(children)?
    } else {
        expr.clone()
    };
    let out = match f(&rebuilt)? {
        Transformed::Keep => rebuilt,
        Transformed::Replace(e) => e,
    };
    memo.insert(expr.id(), out.clone());
    Ok(out)
}

/// Re-bind fields of `old[i]` to the same-named column of `new[i]`
pub(crate) fn rebind_fields(expr: &Expr, old: &[Rel], new: &[Rel]) -> PlanResult<Expr> {
    expr.transform_up(&mut |e| {
        let ExprKind::Field(field) = e.kind() else {
            return Ok(Transformed::Keep);
        };
        let target = old
            .iter()
            .position(|r| r.id() == field.relation().id())
            .and_then(|pos| new.get(pos));
        match target {
            Some(rel) => Ok(Transformed::Replace(rel.col(field.name())?)),
            None => Ok(Transformed::Keep),
        }
    })
}

#[cfg(test)]
#[path = "traverse_test.rs"]
mod tests;
