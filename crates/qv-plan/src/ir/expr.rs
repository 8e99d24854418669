//! Scalar expression nodes

use super::cache::NodeCache;
use super::rel::Rel;
use crate::error::{PlanError, PlanResult};
use crate::function::aggregate::{AggregateFunc, WindowFrame, WindowFunc};
use crate::function::{FunctionDef, Volatility};
use qv_core::{DataType, NodeId, Nullability, ScalarValue, StructuralHasher};
use std::collections::HashSet;
use std::sync::Arc;

/// A column of a specific relation.
///
/// The relation is part of the reference's identity: `t.x` and `u.x` are
/// different fields even when `t` and `u` share a schema.
#[derive(Clone)]
pub struct FieldRef {
    rel: Rel,
    index: usize,
    name: String,
}

impl FieldRef {
    /// Relation the field belongs to
    pub fn relation(&self) -> &Rel {
        &self.rel
    }

    /// Position in the relation's schema
    pub fn index(&self) -> usize {
        self.index
    }

    /// Column name
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// One ordering key of a sort or window
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortKey {
    /// Expression to sort by
    pub expr: Expr,
    /// Ascending (true) or descending (false)
    pub ascending: bool,
    /// Nulls sort before non-null values
    pub nulls_first: bool,
}

impl SortKey {
    /// Ascending, nulls first
    pub fn asc(expr: Expr) -> Self {
        Self {
            expr,
            ascending: true,
            nulls_first: true,
        }
    }

    /// Descending, nulls last
    pub fn desc(expr: Expr) -> Self {
        Self {
            expr,
            ascending: false,
            nulls_first: false,
        }
    }
}

/// Scalar operator variants
#[derive(Clone)]
pub enum ExprKind {
    /// Constant value
    Literal(ScalarValue),
    /// Column reference
    Field(FieldRef),
    /// Scalar function call (built-in or user-defined)
    Call {
        /// Resolved function
        func: Arc<FunctionDef>,
        /// Coerced arguments
        args: Vec<Expr>,
    },
    /// Type conversion
    Cast {
        /// Converted expression
        arg: Expr,
        /// Target type
        to: DataType,
    },
    /// Reduction over a group
    Aggregate {
        /// Aggregate function
        func: AggregateFunc,
        /// Arguments
        args: Vec<Expr>,
        /// Only distinct argument values contribute
        distinct: bool,
    },
    /// Function evaluated over a window of rows
    Window {
        /// Window function
        func: WindowFunc,
        /// Arguments
        args: Vec<Expr>,
        /// Partitioning expressions
        partition_by: Vec<Expr>,
        /// Ordering within each partition
        order_by: Vec<SortKey>,
        /// Frame bounds
        frame: WindowFrame,
    },
}

/// Payload of an expression handle
pub struct ExprNode {
    id: NodeId,
    kind: ExprKind,
    data_type: DataType,
    nullability: Nullability,
}

/// Immutable, shared, structurally identified scalar expression
#[derive(Clone)]
pub struct Expr(Arc<ExprNode>);

impl Expr {
    fn make(kind: ExprKind, data_type: DataType, nullability: Nullability) -> Expr {
        let id = expr_id(&kind, &data_type, nullability);
        let node = NodeCache::global().intern_expr(id, || ExprNode {
            id,
            kind,
            data_type,
            nullability,
        });
        Expr(node)
    }

    /// Literal with the value's natural type
    pub fn literal(value: impl Into<ScalarValue>) -> Expr {
        let value = value.into();
        let data_type = value.data_type();
        let nullability = literal_nullability(&value);
        Expr::make(ExprKind::Literal(value), data_type, nullability)
    }

    /// Literal converted to an explicit type
    pub fn typed_literal(value: ScalarValue, data_type: DataType) -> PlanResult<Expr> {
        data_type.validate()?;
        let value = value.cast_to(&data_type)?;
        let nullability = literal_nullability(&value);
        Ok(Expr::make(ExprKind::Literal(value), data_type, nullability))
    }

    /// Literal converted to an explicit type with an explicit nullability.
    ///
    /// A non-null value may be declared nullable, which keeps the type of an
    /// expression it replaces; NULL cannot be declared not-null.
    pub fn typed_literal_with_nullability(
        value: ScalarValue,
        data_type: DataType,
        nullability: Nullability,
    ) -> PlanResult<Expr> {
        data_type.validate()?;
        let value = value.cast_to(&data_type)?;
        if value.is_null() && !nullability.is_nullable() {
            return Err(PlanError::shape(
                "literal",
                format!("NULL cannot be a non-null {data_type} literal"),
            ));
        }
        Ok(Expr::make(ExprKind::Literal(value), data_type, nullability))
    }

    pub(crate) fn bound_field(rel: &Rel, index: usize) -> PlanResult<Expr> {
        let field = rel
            .schema()
            .field_at(index)
            .ok_or_else(|| PlanError::UnresolvedColumn {
                column: format!("#{index}"),
                relation: rel.label(),
            })?;
        let (data_type, nullability) = (field.data_type.clone(), field.nullability);
        let name = field.name.clone();
        Ok(Expr::make(
            ExprKind::Field(FieldRef {
                rel: rel.clone(),
                index,
                name,
            }),
            data_type,
            nullability,
        ))
    }

    /// Call a function, type-checking and coercing the arguments
    pub fn call(func: Arc<FunctionDef>, args: Vec<Expr>) -> PlanResult<Expr> {
        let (args, data_type, nullability) = func.bind(args)?;
        Ok(Expr::make(ExprKind::Call { func, args }, data_type, nullability))
    }

    /// Explicit conversion to another type
    pub fn cast(&self, to: DataType) -> PlanResult<Expr> {
        to.validate()?;
        if *self.data_type() == to {
            return Ok(self.clone());
        }
        if !can_cast(self.data_type(), &to) {
            return Err(PlanError::TypeMismatch {
                context: "cast".to_string(),
                expected: format!("a type convertible to {to}"),
                found: self.data_type().clone(),
            });
        }
        let nullability = self.nullability();
        Ok(Expr::make(
            ExprKind::Cast {
                arg: self.clone(),
                to: to.clone(),
            },
            to,
            nullability,
        ))
    }

    /// Aggregate call
    pub fn aggregate(func: AggregateFunc, args: Vec<Expr>, distinct: bool) -> PlanResult<Expr> {
        for arg in &args {
            if arg.contains_aggregate() || arg.contains_window() {
                return Err(PlanError::shape(
                    "aggregate",
                    format!("argument of {func} cannot contain another aggregate or window"),
                ));
            }
        }
        let arg_types: Vec<DataType> = args.iter().map(|a| a.data_type().clone()).collect();
        let (data_type, nullability) = func.return_type(&arg_types)?;
        Ok(Expr::make(
            ExprKind::Aggregate {
                func,
                args,
                distinct,
            },
            data_type,
            nullability,
        ))
    }

    /// Window call
    pub fn window(
        func: WindowFunc,
        args: Vec<Expr>,
        partition_by: Vec<Expr>,
        order_by: Vec<SortKey>,
        frame: WindowFrame,
    ) -> PlanResult<Expr> {
        let scoped = args
            .iter()
            .chain(partition_by.iter())
            .chain(order_by.iter().map(|k| &k.expr));
        for e in scoped {
            if e.contains_aggregate() || e.contains_window() {
                return Err(PlanError::shape(
                    "window",
                    format!("expressions of {func} cannot contain aggregates or windows"),
                ));
            }
        }
        if func.requires_order() && order_by.is_empty() {
            return Err(PlanError::shape(
                "window",
                format!("{func} requires an ORDER BY"),
            ));
        }
        for key in &order_by {
            if !key.expr.data_type().is_orderable() {
                return Err(PlanError::TypeMismatch {
                    context: "window ORDER BY".to_string(),
                    expected: "an orderable type".to_string(),
                    found: key.expr.data_type().clone(),
                });
            }
        }
        frame.validate()?;
        let arg_types: Vec<DataType> = args.iter().map(|a| a.data_type().clone()).collect();
        let (data_type, nullability) = func.return_type(&arg_types)?;
        Ok(Expr::make(
            ExprKind::Window {
                func,
                args,
                partition_by,
                order_by,
                frame,
            },
            data_type,
            nullability,
        ))
    }

    /// Structural identity
    pub fn id(&self) -> NodeId {
        self.0.id
    }

    /// Operator and payload
    pub fn kind(&self) -> &ExprKind {
        &self.0.kind
    }

    /// Resolved type
    pub fn data_type(&self) -> &DataType {
        &self.0.data_type
    }

    /// Resolved nullability
    pub fn nullability(&self) -> Nullability {
        self.0.nullability
    }

    /// Literal payload, if this is a literal
    pub fn as_literal(&self) -> Option<&ScalarValue> {
        match self.kind() {
            ExprKind::Literal(v) => Some(v),
            _ => None,
        }
    }

    /// Field reference, if this is a bare column
    pub fn as_field(&self) -> Option<&FieldRef> {
        match self.kind() {
            ExprKind::Field(f) => Some(f),
            _ => None,
        }
    }

    /// Direct scalar children
    pub fn children(&self) -> Vec<&Expr> {
        match self.kind() {
            ExprKind::Literal(_) | ExprKind::Field(_) => Vec::new(),
            ExprKind::Call { args, .. } | ExprKind::Aggregate { args, .. } => args.iter().collect(),
            ExprKind::Cast { arg, .. } => vec![arg],
            ExprKind::Window {
                args,
                partition_by,
                order_by,
                ..
            } => args
                .iter()
                .chain(partition_by.iter())
                .chain(order_by.iter().map(|k| &k.expr))
                .collect(),
        }
    }

    /// Whether any node in this expression satisfies `pred`.
    ///
    /// Each distinct node is visited once, so `pred` sees a shared
    /// sub-expression a single time.
    pub fn any(&self, pred: &mut dyn FnMut(&Expr) -> bool) -> bool {
        self.search(&mut HashSet::new(), &mut |e| pred(e).then_some(true))
    }

    /// Depth-first search over distinct nodes. `decide` answers for a node
    /// (`Some(false)` skips its subtree) or returns `None` to descend.
    fn search(
        &self,
        seen: &mut HashSet<NodeId>,
        decide: &mut dyn FnMut(&Expr) -> Option<bool>,
    ) -> bool {
        if !seen.insert(self.id()) {
            return false;
        }
        match decide(self) {
            Some(found) => found,
            None => self.children().into_iter().any(|c| c.search(seen, decide)),
        }
    }

    /// Contains an aggregate call at any depth
    pub fn contains_aggregate(&self) -> bool {
        self.any(&mut |e| matches!(e.kind(), ExprKind::Aggregate { .. }))
    }

    /// Contains a window call at any depth
    pub fn contains_window(&self) -> bool {
        self.any(&mut |e| matches!(e.kind(), ExprKind::Window { .. }))
    }

    /// Contains a call to a volatile function
    pub fn is_volatile(&self) -> bool {
        self.any(&mut |e| {
            matches!(e.kind(), ExprKind::Call { func, .. } if func.volatility() == Volatility::Volatile)
        })
    }

    /// Contains an aggregate outside of any window call
    pub fn has_bare_aggregate(&self) -> bool {
        self.search(&mut HashSet::new(), &mut |e| match e.kind() {
            ExprKind::Aggregate { .. } => Some(true),
            ExprKind::Window { .. } => Some(false),
            _ => None,
        })
    }

    /// Whether every column reference sits under an aggregate call
    pub fn fields_reduced(&self) -> bool {
        let unreduced = self.search(&mut HashSet::new(), &mut |e| match e.kind() {
            ExprKind::Field(_) => Some(true),
            ExprKind::Aggregate { .. } => Some(false),
            _ => None,
        });
        !unreduced
    }

    /// Every field reference in this expression, in first-seen order
    pub fn fields(&self) -> Vec<FieldRef> {
        let mut out: Vec<FieldRef> = Vec::new();
        self.any(&mut |e| {
            if let ExprKind::Field(f) = e.kind() {
                if !out.iter().any(|o| o.rel == f.rel && o.index == f.index) {
                    out.push(f.clone());
                }
            }
            false
        });
        out
    }

    /// Rebuild this node over new children, in [`Expr::children`] order
    pub fn with_new_children(&self, children: Vec<Expr>) -> PlanResult<Expr> {
        match self.kind() {
            ExprKind::Literal(_) | ExprKind::Field(_) => Ok(self.clone()),
            ExprKind::Call { func, .. } => Expr::call(Arc::clone(func), children),
            ExprKind::Cast { to, .. } => {
                let arg = children.into_iter().next().ok_or_else(|| {
                    PlanError::shape("cast", "missing argument")
                })?;
                arg.cast(to.clone())
            }
            ExprKind::Aggregate { func, distinct, .. } => {
                Expr::aggregate(*func, children, *distinct)
            }
            ExprKind::Window {
                func,
                args,
                partition_by,
                order_by,
                frame,
            } => {
                if children.len() != args.len() + partition_by.len() + order_by.len() {
                    return Err(PlanError::shape("window", "child count changed"));
                }
                let mut rest = children;
                let tail = rest.split_off(args.len());
                let new_args = rest;
                let mut tail = tail;
                let order_exprs = tail.split_off(partition_by.len());
                let new_order = order_by
                    .iter()
                    .zip(order_exprs)
                    .map(|(k, expr)| SortKey {
                        expr,
                        ascending: k.ascending,
                        nulls_first: k.nulls_first,
                    })
                    .collect();
                Expr::window(*func, new_args, tail, new_order, *frame)
            }
        }
    }
}

fn literal_nullability(value: &ScalarValue) -> Nullability {
    if value.is_null() {
        Nullability::Nullable
    } else {
        Nullability::NotNull
    }
}

/// Whether an explicit cast between two types is allowed
pub fn can_cast(from: &DataType, to: &DataType) -> bool {
    use DataType as D;
    if from == to || *from == D::Null || *to == D::String {
        return true;
    }
    match (from, to) {
        (a, b) if a.is_numeric() && b.is_numeric() => true,
        (D::String, D::Integer { .. } | D::Float { .. } | D::Decimal { .. }) => true,
        (D::String, D::Date | D::Timestamp { .. }) => true,
        (D::Date, D::Timestamp { .. }) | (D::Timestamp { .. }, D::Date) => true,
        (D::Timestamp { .. }, D::Timestamp { .. }) => true,
        (D::Interval { .. }, D::Interval { .. }) => true,
        (D::Array(a), D::Array(b)) => can_cast(a, b),
        (D::Map { key: k1, value: v1 }, D::Map { key: k2, value: v2 }) => {
            can_cast(k1, k2) && can_cast(v1, v2)
        }
        (D::Struct(a), D::Struct(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|(x, y)| x.name == y.name && can_cast(&x.data_type, &y.data_type))
        }
        _ => false,
    }
}

fn expr_id(kind: &ExprKind, data_type: &DataType, nullability: Nullability) -> NodeId {
    match kind {
        ExprKind::Literal(value) => {
            let mut h = StructuralHasher::new("literal");
            h.write(value)
                .write(data_type)
                .write_bool(nullability.is_nullable());
            h.finish()
        }
        ExprKind::Field(f) => {
            let mut h = StructuralHasher::new("field");
            h.write_id(&f.rel.id())
                .write_u64(f.index as u64)
                .write_str(&f.name);
            h.finish()
        }
        ExprKind::Call { func, args } => {
            let mut h = StructuralHasher::new("call");
            h.write_str(func.identity());
            write_ids(&mut h, args);
            h.finish()
        }
        ExprKind::Cast { arg, to } => {
            let mut h = StructuralHasher::new("cast");
            h.write_id(&arg.id()).write(to);
            h.finish()
        }
        ExprKind::Aggregate {
            func,
            args,
            distinct,
        } => {
            let mut h = StructuralHasher::new("aggregate");
            h.write_str(func.name()).write_bool(*distinct);
            write_ids(&mut h, args);
            h.finish()
        }
        ExprKind::Window {
            func,
            args,
            partition_by,
            order_by,
            frame,
        } => {
            let mut h = StructuralHasher::new("window");
            h.write_str(&func.to_string());
            write_ids(&mut h, args);
            write_ids(&mut h, partition_by);
            write_sort_keys(&mut h, order_by);
            h.write_str(&frame.to_string());
            h.finish()
        }
    }
}

pub(crate) fn write_ids(h: &mut StructuralHasher, exprs: &[Expr]) {
    h.write_u64(exprs.len() as u64);
    for e in exprs {
        h.write_id(&e.id());
    }
}

pub(crate) fn write_sort_keys(h: &mut StructuralHasher, keys: &[SortKey]) {
    h.write_u64(keys.len() as u64);
    for k in keys {
        h.write_id(&k.expr.id())
            .write_bool(k.ascending)
            .write_bool(k.nulls_first);
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Expr {}

impl std::hash::Hash for Expr {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl std::fmt::Debug for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Expr({self} : {}#{})", self.data_type(), self.id().short())
    }
}

#[cfg(test)]
#[path = "expr_test.rs"]
mod tests;
