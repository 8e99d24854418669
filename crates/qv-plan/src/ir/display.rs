//! Text rendering of expressions and plans

use super::expr::{Expr, ExprKind, SortKey};
use super::rel::{Rel, RelOp};
use crate::function::aggregate::{AggregateFunc, WindowFrame};
use qv_core::NodeId;
use std::collections::HashSet;
use std::fmt;

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = if self.ascending { "ASC" } else { "DESC" };
        let nulls = if self.nulls_first { "FIRST" } else { "LAST" };
        write!(f, "{} {dir} NULLS {nulls}", self.expr)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            ExprKind::Literal(v) => write!(f, "{v}"),
            ExprKind::Field(field) => write!(f, "#{}", field.name()),
            ExprKind::Call { func, args } => {
                let marker = if func.is_specialized() { "[specialized]" } else { "" };
                write!(f, "{}{marker}({})", func.name(), join(args))
            }
            ExprKind::Cast { arg, to } => write!(f, "CAST({arg} AS {to})"),
            ExprKind::Aggregate {
                func,
                args,
                distinct,
            } => {
                if *func == AggregateFunc::CountStar {
                    return write!(f, "count(*)");
                }
                let distinct = if *distinct { "DISTINCT " } else { "" };
                write!(f, "{func}({distinct}{})", join(args))
            }
            ExprKind::Window {
                func,
                args,
                partition_by,
                order_by,
                frame,
            } => {
                write!(f, "{func}({}) OVER (", join(args))?;
                let mut parts = Vec::new();
                if !partition_by.is_empty() {
                    parts.push(format!("PARTITION BY {}", join(partition_by)));
                }
                if !order_by.is_empty() {
                    parts.push(format!("ORDER BY {}", join(order_by)));
                }
                if *frame != WindowFrame::default_for(!order_by.is_empty()) {
                    parts.push(frame.to_string());
                }
                write!(f, "{})", parts.join(" "))
            }
        }
    }
}

fn columns(cols: &[(String, Expr)]) -> String {
    cols.iter()
        .map(|(name, e)| format!("{name} := {e}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe(rel: &Rel) -> String {
    match rel.op() {
        RelOp::Source { name } => format!("Source: {name} {}", rel.schema()),
        RelOp::Project { columns: cols, .. } => format!("Project: {}", columns(cols)),
        RelOp::Filter { predicates, .. } => format!("Filter: {}", join(predicates)),
        RelOp::Aggregate { keys, metrics, .. } => {
            format!(
                "Aggregate: keys=[{}] metrics=[{}]",
                columns(keys),
                columns(metrics)
            )
        }
        RelOp::Sort { keys, .. } => format!("Sort: {}", join(keys)),
        RelOp::Limit { limit, offset, .. } => match limit {
            Some(n) => format!("Limit: {n} offset {offset}"),
            None => format!("Limit: none offset {offset}"),
        },
        RelOp::Join {
            kind, predicates, ..
        } => {
            if predicates.is_empty() {
                format!("Join({kind}): cross")
            } else {
                format!("Join({kind}): {}", join(predicates))
            }
        }
        RelOp::SetOp { kind, distinct, .. } => {
            let all = if *distinct { "" } else { " all" };
            format!("SetOp: {kind}{all}")
        }
        RelOp::Alias { name, .. } => format!("Alias: {name}"),
    }
}

impl Rel {
    /// Render the plan as an indented tree, one node per line.
    ///
    /// A node shared by several consumers is printed in full the first time
    /// and referenced by label afterwards.
    pub fn display_indent(&self) -> String {
        let mut out = String::new();
        let mut seen = HashSet::new();
        write_indented(self, 0, &mut seen, &mut out);
        out
    }
}

fn write_indented(rel: &Rel, depth: usize, seen: &mut HashSet<NodeId>, out: &mut String) {
    let pad = "  ".repeat(depth);
    if !seen.insert(rel.id()) {
        out.push_str(&format!("{pad}-> {} (shared)\n", rel.label()));
        return;
    }
    out.push_str(&format!("{pad}{}\n", describe(rel)));
    for input in rel.inputs() {
        write_indented(input, depth + 1, seen, out);
    }
}

impl fmt::Display for Rel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_indent())
    }
}
