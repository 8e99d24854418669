//! Relational operator nodes

use super::cache::NodeCache;
use super::expr::{write_ids, write_sort_keys, Expr, SortKey};
use qv_core::{NodeId, Schema, SourceName, StructuralHasher};
use std::sync::Arc;

/// Join flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JoinKind {
    /// Matching pairs only
    Inner,
    /// All left rows, right side null-padded
    Left,
    /// All right rows, left side null-padded
    Right,
    /// All rows of both sides
    Full,
    /// Left rows with at least one match
    Semi,
    /// Left rows without a match
    Anti,
}

impl JoinKind {
    /// Lowercase name
    pub fn name(self) -> &'static str {
        match self {
            JoinKind::Inner => "inner",
            JoinKind::Left => "left",
            JoinKind::Right => "right",
            JoinKind::Full => "full",
            JoinKind::Semi => "semi",
            JoinKind::Anti => "anti",
        }
    }

    /// Parse a lowercase name
    pub fn from_name(name: &str) -> Option<JoinKind> {
        match name.to_lowercase().as_str() {
            "inner" => Some(JoinKind::Inner),
            "left" => Some(JoinKind::Left),
            "right" => Some(JoinKind::Right),
            "full" | "outer" => Some(JoinKind::Full),
            "semi" => Some(JoinKind::Semi),
            "anti" => Some(JoinKind::Anti),
            _ => None,
        }
    }

    /// Whether only the left columns are exposed
    pub fn is_filtering(self) -> bool {
        matches!(self, JoinKind::Semi | JoinKind::Anti)
    }
}

impl std::fmt::Display for JoinKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Set operation flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SetOpKind {
    /// Rows of either side
    Union,
    /// Rows present on both sides
    Intersect,
    /// Left rows absent from the right side (EXCEPT)
    Difference,
}

impl SetOpKind {
    /// Lowercase name
    pub fn name(self) -> &'static str {
        match self {
            SetOpKind::Union => "union",
            SetOpKind::Intersect => "intersect",
            SetOpKind::Difference => "difference",
        }
    }
}

impl std::fmt::Display for SetOpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Relational operator variants
#[derive(Clone)]
pub enum RelOp {
    /// External named relation
    Source {
        /// Relation name
        name: SourceName,
    },
    /// Named output columns computed from the input (window calls allowed)
    Project {
        /// Input relation
        input: Rel,
        /// Output columns in order
        columns: Vec<(String, Expr)>,
    },
    /// Conjunction of boolean predicates
    Filter {
        /// Input relation
        input: Rel,
        /// Predicates, all of which must hold
        predicates: Vec<Expr>,
    },
    /// Grouped reduction
    Aggregate {
        /// Input relation
        input: Rel,
        /// Grouping keys, output first
        keys: Vec<(String, Expr)>,
        /// Reductions, output after the keys
        metrics: Vec<(String, Expr)>,
    },
    /// Ordering
    Sort {
        /// Input relation
        input: Rel,
        /// Sort keys, most significant first
        keys: Vec<SortKey>,
    },
    /// Row window
    Limit {
        /// Input relation
        input: Rel,
        /// Maximum rows, `None` for no limit
        limit: Option<u64>,
        /// Rows skipped first
        offset: u64,
    },
    /// Two-input join
    Join {
        /// Left input
        left: Rel,
        /// Right input
        right: Rel,
        /// Join flavour
        kind: JoinKind,
        /// Conjunctive join condition; empty means cross join
        predicates: Vec<Expr>,
    },
    /// Union, intersection or difference
    SetOp {
        /// Left input
        left: Rel,
        /// Right input
        right: Rel,
        /// Operation
        kind: SetOpKind,
        /// Remove duplicate rows
        distinct: bool,
    },
    /// Same rows under a distinct identity
    Alias {
        /// Input relation
        input: Rel,
        /// Alias name
        name: String,
    },
}

/// Payload of a relation handle
pub struct RelNode {
    id: NodeId,
    op: RelOp,
    schema: Schema,
}

/// Immutable, shared, structurally identified relational node
#[derive(Clone)]
pub struct Rel(Arc<RelNode>);

impl Rel {
    pub(crate) fn make(op: RelOp, schema: Schema) -> Rel {
        let id = rel_id(&op, &schema);
        Rel(NodeCache::global().intern_rel(id, || RelNode { id, op, schema }))
    }

    /// Structural identity
    pub fn id(&self) -> NodeId {
        self.0.id
    }

    /// Operator and payload
    pub fn op(&self) -> &RelOp {
        &self.0.op
    }

    /// Output schema
    pub fn schema(&self) -> &Schema {
        &self.0.schema
    }

    /// Child relations in order
    pub fn inputs(&self) -> Vec<&Rel> {
        match self.op() {
            RelOp::Source { .. } => Vec::new(),
            RelOp::Project { input, .. }
            | RelOp::Filter { input, .. }
            | RelOp::Aggregate { input, .. }
            | RelOp::Sort { input, .. }
            | RelOp::Limit { input, .. }
            | RelOp::Alias { input, .. } => vec![input],
            RelOp::Join { left, right, .. } | RelOp::SetOp { left, right, .. } => {
                vec![left, right]
            }
        }
    }

    /// Top-level scalar expressions owned by this node
    pub fn expressions(&self) -> Vec<&Expr> {
        match self.op() {
            RelOp::Project { columns, .. } => columns.iter().map(|(_, e)| e).collect(),
            RelOp::Filter { predicates, .. } | RelOp::Join { predicates, .. } => {
                predicates.iter().collect()
            }
            RelOp::Aggregate { keys, metrics, .. } => {
                keys.iter().chain(metrics.iter()).map(|(_, e)| e).collect()
            }
            RelOp::Sort { keys, .. } => keys.iter().map(|k| &k.expr).collect(),
            RelOp::Source { .. }
            | RelOp::Limit { .. }
            | RelOp::SetOp { .. }
            | RelOp::Alias { .. } => Vec::new(),
        }
    }

    /// Operator kind name
    pub fn kind_name(&self) -> &'static str {
        match self.op() {
            RelOp::Source { .. } => "Source",
            RelOp::Project { .. } => "Project",
            RelOp::Filter { .. } => "Filter",
            RelOp::Aggregate { .. } => "Aggregate",
            RelOp::Sort { .. } => "Sort",
            RelOp::Limit { .. } => "Limit",
            RelOp::Join { .. } => "Join",
            RelOp::SetOp { .. } => "SetOp",
            RelOp::Alias { .. } => "Alias",
        }
    }

    /// Short label naming the node kind and its id, e.g. `Source(orders)#1a2b3c4d`
    pub fn label(&self) -> String {
        match self.op() {
            RelOp::Source { name } => format!("Source({name})#{}", self.id().short()),
            RelOp::Alias { name, .. } => format!("Alias({name})#{}", self.id().short()),
            _ => format!("{}#{}", self.kind_name(), self.id().short()),
        }
    }
}

fn write_columns(h: &mut StructuralHasher, columns: &[(String, Expr)]) {
    h.write_u64(columns.len() as u64);
    for (name, expr) in columns {
        h.write_str(name).write_id(&expr.id());
    }
}

fn rel_id(op: &RelOp, schema: &Schema) -> NodeId {
    match op {
        RelOp::Source { name } => {
            let mut h = StructuralHasher::new("source");
            h.write_str(name).write(schema);
            h.finish()
        }
        RelOp::Project { input, columns } => {
            let mut h = StructuralHasher::new("project");
            h.write_id(&input.id());
            write_columns(&mut h, columns);
            h.finish()
        }
        RelOp::Filter { input, predicates } => {
            let mut h = StructuralHasher::new("filter");
            h.write_id(&input.id());
            write_ids(&mut h, predicates);
            h.finish()
        }
        RelOp::Aggregate {
            input,
            keys,
            metrics,
        } => {
            let mut h = StructuralHasher::new("aggregate");
            h.write_id(&input.id());
            write_columns(&mut h, keys);
            write_columns(&mut h, metrics);
            h.finish()
        }
        RelOp::Sort { input, keys } => {
            let mut h = StructuralHasher::new("sort");
            h.write_id(&input.id());
            write_sort_keys(&mut h, keys);
            h.finish()
        }
        RelOp::Limit {
            input,
            limit,
            offset,
        } => {
            let mut h = StructuralHasher::new("limit");
            h.write_id(&input.id())
                .write_bool(limit.is_some())
                .write_u64(limit.unwrap_or(0))
                .write_u64(*offset);
            h.finish()
        }
        RelOp::Join {
            left,
            right,
            kind,
            predicates,
        } => {
            let mut h = StructuralHasher::new("join");
            h.write_id(&left.id())
                .write_id(&right.id())
                .write_str(kind.name());
            write_ids(&mut h, predicates);
            h.finish()
        }
        RelOp::SetOp {
            left,
            right,
            kind,
            distinct,
        } => {
            let mut h = StructuralHasher::new("setop");
            h.write_id(&left.id())
                .write_id(&right.id())
                .write_str(kind.name())
                .write_bool(*distinct);
            h.finish()
        }
        RelOp::Alias { input, name } => {
            let mut h = StructuralHasher::new("alias");
            h.write_id(&input.id()).write_str(name);
            h.finish()
        }
    }
}

impl PartialEq for Rel {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Rel {}

impl std::hash::Hash for Rel {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl std::fmt::Debug for Rel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Rel({} {})", self.label(), self.schema())
    }
}
