//! Operator and function kinds a backend declares it can lower

use log::warn;
use qv_plan::{
    AggregateFunc, Expr, ExprKind, FunctionRegistry, JoinKind, Rel, RelOp, SetOpKind, WindowFunc,
};
use std::collections::BTreeSet;
use std::fmt;

/// Every join flavour
pub const JOIN_KINDS: [JoinKind; 6] = [
    JoinKind::Inner,
    JoinKind::Left,
    JoinKind::Right,
    JoinKind::Full,
    JoinKind::Semi,
    JoinKind::Anti,
];

/// Every set operation
pub const SET_OP_KINDS: [SetOpKind; 3] = [SetOpKind::Union, SetOpKind::Intersect, SetOpKind::Difference];

/// Every aggregate function
pub const AGGREGATE_FUNCS: [AggregateFunc; 6] = [
    AggregateFunc::Count,
    AggregateFunc::CountStar,
    AggregateFunc::Sum,
    AggregateFunc::Mean,
    AggregateFunc::Min,
    AggregateFunc::Max,
];

const RANKING_FUNCTIONS: [&str; 5] = ["row_number", "rank", "dense_rank", "lag", "lead"];

/// One kind of node or function a backend can lower
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    /// Scan of an external relation
    Source,
    /// Column computation
    Project,
    /// Row filtering
    Filter,
    /// Grouped reduction
    Aggregate,
    /// Ordering
    Sort,
    /// Row window (limit/offset)
    Limit,
    /// One join flavour
    Join(JoinKind),
    /// One set operation
    SetOp(SetOpKind),
    /// Window calls inside a projection
    Window,
    /// Explicit type conversion
    Cast,
    /// Calls to user-defined functions
    Udf,
    /// One built-in scalar function, by name
    Function(String),
    /// One aggregate function
    AggregateFunction(AggregateFunc),
    /// One window function, by name (aggregates use their own name)
    WindowFunction(String),
}

impl Capability {
    /// Capability naming a built-in function
    pub fn function(name: impl Into<String>) -> Self {
        Capability::Function(name.into())
    }

    /// Capability naming a window function; `lag`/`lead` ignore their offset
    pub fn window_function(func: WindowFunc) -> Self {
        let name = match func {
            WindowFunc::Aggregate(agg) => agg.name(),
            WindowFunc::RowNumber => "row_number",
            WindowFunc::Rank => "rank",
            WindowFunc::DenseRank => "dense_rank",
            WindowFunc::Lag(_) => "lag",
            WindowFunc::Lead(_) => "lead",
        };
        Capability::WindowFunction(name.to_string())
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Source => write!(f, "Source"),
            Capability::Project => write!(f, "Project"),
            Capability::Filter => write!(f, "Filter"),
            Capability::Aggregate => write!(f, "Aggregate"),
            Capability::Sort => write!(f, "Sort"),
            Capability::Limit => write!(f, "Limit"),
            Capability::Join(kind) => write!(f, "Join({kind})"),
            Capability::SetOp(kind) => write!(f, "SetOp({kind})"),
            Capability::Window => write!(f, "Window"),
            Capability::Cast => write!(f, "Cast"),
            Capability::Udf => write!(f, "Udf"),
            Capability::Function(name) => write!(f, "Function({name})"),
            Capability::AggregateFunction(func) => write!(f, "AggregateFunction({func})"),
            Capability::WindowFunction(name) => write!(f, "WindowFunction({name})"),
        }
    }
}

/// The set of capabilities a backend declares
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    caps: BTreeSet<Capability>,
}

impl CapabilitySet {
    /// No capabilities
    pub fn new() -> Self {
        Self::default()
    }

    /// Every operator, every built-in function, UDFs, casts, aggregates and windows
    pub fn full() -> Self {
        let mut caps: BTreeSet<Capability> = [
            Capability::Source,
            Capability::Project,
            Capability::Filter,
            Capability::Aggregate,
            Capability::Sort,
            Capability::Limit,
            Capability::Window,
            Capability::Cast,
            Capability::Udf,
        ]
        .into_iter()
        .collect();
        caps.extend(JOIN_KINDS.into_iter().map(Capability::Join));
        caps.extend(SET_OP_KINDS.into_iter().map(Capability::SetOp));
        caps.extend(AGGREGATE_FUNCS.into_iter().map(Capability::AggregateFunction));
        caps.extend(
            AGGREGATE_FUNCS
                .iter()
                .map(|f| f.name())
                .chain(RANKING_FUNCTIONS)
                .map(|name| Capability::WindowFunction(name.to_string())),
        );
        match FunctionRegistry::with_builtins() {
            Ok(builtins) => caps.extend(builtins.names().into_iter().map(Capability::function)),
            Err(e) => warn!("Built-in functions unavailable: {e}"),
        }
        Self { caps }
    }

    /// Add a capability
    pub fn with(mut self, cap: Capability) -> Self {
        self.caps.insert(cap);
        self
    }

    /// Remove a capability
    pub fn without(mut self, cap: &Capability) -> Self {
        self.caps.remove(cap);
        self
    }

    /// Whether `cap` is declared
    pub fn supports(&self, cap: &Capability) -> bool {
        self.caps.contains(cap)
    }

    /// Number of declared capabilities
    pub fn len(&self) -> usize {
        self.caps.len()
    }

    /// True when nothing is declared
    pub fn is_empty(&self) -> bool {
        self.caps.is_empty()
    }

    /// Declared capabilities in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.caps.iter()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self {
            caps: iter.into_iter().collect(),
        }
    }
}

/// Capabilities needed to lower one node: its operator first, then every
/// scalar kind its expressions use, in first-seen order.
///
/// An alias renames nothing and computes nothing, so it needs no capability.
pub fn required_capabilities(rel: &Rel) -> Vec<Capability> {
    let mut out = Vec::new();
    let operator = match rel.op() {
        RelOp::Source { .. } => Some(Capability::Source),
        RelOp::Project { .. } => Some(Capability::Project),
        RelOp::Filter { .. } => Some(Capability::Filter),
        RelOp::Aggregate { .. } => Some(Capability::Aggregate),
        RelOp::Sort { .. } => Some(Capability::Sort),
        RelOp::Limit { .. } => Some(Capability::Limit),
        RelOp::Join { kind, .. } => Some(Capability::Join(*kind)),
        RelOp::SetOp { kind, .. } => Some(Capability::SetOp(*kind)),
        RelOp::Alias { .. } => None,
    };
    out.extend(operator);
    for expr in rel.expressions() {
        expr_capabilities(expr, &mut out);
    }
    out
}

fn expr_capabilities(expr: &Expr, out: &mut Vec<Capability>) {
    expr.any(&mut |e| {
        let needed: Vec<Capability> = match e.kind() {
            ExprKind::Literal(_) | ExprKind::Field(_) => Vec::new(),
            ExprKind::Call { func, .. } if func.is_user_defined() => vec![Capability::Udf],
            ExprKind::Call { func, .. } => vec![Capability::function(func.name().as_str())],
            ExprKind::Cast { .. } => vec![Capability::Cast],
            ExprKind::Aggregate { func, .. } => vec![Capability::AggregateFunction(*func)],
            ExprKind::Window { func, .. } => {
                vec![Capability::Window, Capability::window_function(*func)]
            }
        };
        for cap in needed {
            if !out.contains(&cap) {
                out.push(cap);
            }
        }
        false
    });
}

#[cfg(test)]
#[path = "capability_test.rs"]
mod tests;
