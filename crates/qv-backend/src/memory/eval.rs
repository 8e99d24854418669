//! Scalar and grouped expression evaluation over materialized rows

use crate::error::{BackendError, BackendResult};
use crate::result::Row;
use qv_core::{NodeId, ScalarValue};
use qv_plan::{AggregateFunc, Expr, ExprKind, FieldRef, PlanError, SortKey};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Precomputed window results, one value per input row, keyed by window expression
pub(crate) type WindowColumns = HashMap<NodeId, Vec<ScalarValue>>;

/// The rows an expression can read while evaluating one output row
pub(crate) struct RowScope<'a> {
    bindings: &'a [(NodeId, &'a [ScalarValue])],
    windows: Option<(&'a WindowColumns, usize)>,
}

impl<'a> RowScope<'a> {
    pub(crate) fn new(bindings: &'a [(NodeId, &'a [ScalarValue])]) -> Self {
        Self {
            bindings,
            windows: None,
        }
    }

    pub(crate) fn with_windows(mut self, windows: &'a WindowColumns, row: usize) -> Self {
        self.windows = Some((windows, row));
        self
    }

    fn lookup(&self, field: &FieldRef) -> BackendResult<ScalarValue> {
        let rel = field.relation().id();
        self.bindings
            .iter()
            .find(|(id, _)| *id == rel)
            .and_then(|(_, row)| row.get(field.index()))
            .cloned()
            .ok_or_else(|| {
                BackendError::Internal(format!(
                    "column '{}' of {} is not bound",
                    field.name(),
                    field.relation().label()
                ))
            })
    }

    fn window_value(&self, expr: &Expr) -> BackendResult<ScalarValue> {
        self.windows
            .and_then(|(columns, row)| columns.get(&expr.id()).and_then(|c| c.get(row)))
            .cloned()
            .ok_or_else(|| BackendError::Internal(format!("window {expr} was not precomputed")))
    }
}

/// Evaluate a scalar expression for one row
pub(crate) fn eval(expr: &Expr, scope: &RowScope<'_>) -> BackendResult<ScalarValue> {
    match expr.kind() {
        ExprKind::Literal(value) => Ok(value.clone()),
        ExprKind::Field(field) => scope.lookup(field),
        ExprKind::Call { func, args } => {
            let values = args
                .iter()
                .map(|a| eval(a, scope))
                .collect::<BackendResult<Vec<_>>>()?;
            Ok(func.evaluate(&values)?)
        }
        ExprKind::Cast { arg, to } => Ok(eval(arg, scope)?.cast_to(to).map_err(PlanError::from)?),
        ExprKind::Window { .. } => scope.window_value(expr),
        ExprKind::Aggregate { func, .. } => Err(BackendError::Internal(format!(
            "aggregate {func} evaluated outside of a grouping"
        ))),
    }
}

/// Evaluate an expression once for a whole group of rows of `input`
pub(crate) fn eval_group(expr: &Expr, input: NodeId, rows: &[&Row]) -> BackendResult<ScalarValue> {
    match expr.kind() {
        ExprKind::Literal(value) => Ok(value.clone()),
        ExprKind::Call { func, args } => {
            let values = args
                .iter()
                .map(|a| eval_group(a, input, rows))
                .collect::<BackendResult<Vec<_>>>()?;
            Ok(func.evaluate(&values)?)
        }
        ExprKind::Cast { arg, to } => {
            Ok(eval_group(arg, input, rows)?.cast_to(to).map_err(PlanError::from)?)
        }
        ExprKind::Aggregate {
            func,
            args,
            distinct,
        } => {
            let mut values = Vec::with_capacity(rows.len());
            if let Some(arg) = args.first() {
                for row in rows {
                    let binding = [(input, row.as_slice())];
                    values.push(eval(arg, &RowScope::new(&binding))?);
                }
            }
            reduce(*func, *distinct, rows.len(), values)
        }
        ExprKind::Field(field) => Err(BackendError::Internal(format!(
            "column '{}' is not reduced",
            field.name()
        ))),
        ExprKind::Window { func, .. } => Err(BackendError::Internal(format!(
            "window {func} inside an aggregation"
        ))),
    }
}

/// Reduce the argument values of `rows` input rows.
///
/// Nulls never contribute; an empty input gives NULL for everything but the counts.
pub(crate) fn reduce(
    func: AggregateFunc,
    distinct: bool,
    rows: usize,
    values: Vec<ScalarValue>,
) -> BackendResult<ScalarValue> {
    let mut values: Vec<ScalarValue> = values.into_iter().filter(|v| !v.is_null()).collect();
    if distinct {
        let mut seen = HashSet::new();
        values.retain(|v| seen.insert(v.clone()));
    }
    let value = match func {
        AggregateFunc::CountStar => ScalarValue::Integer(rows as i64),
        AggregateFunc::Count => ScalarValue::Integer(values.len() as i64),
        AggregateFunc::Sum => sum(&values)?,
        AggregateFunc::Mean => {
            if values.is_empty() {
                ScalarValue::Null
            } else {
                let total: f64 = values.iter().filter_map(ScalarValue::as_f64).sum();
                ScalarValue::Float(total / values.len() as f64)
            }
        }
        AggregateFunc::Min => values
            .into_iter()
            .min_by(|a, b| a.sort_cmp(b))
            .unwrap_or(ScalarValue::Null),
        AggregateFunc::Max => values
            .into_iter()
            .max_by(|a, b| a.sort_cmp(b))
            .unwrap_or(ScalarValue::Null),
    };
    Ok(value)
}

fn sum(values: &[ScalarValue]) -> BackendResult<ScalarValue> {
    let overflow = || PlanError::eval("sum", "numeric overflow");
    let mut acc: Option<ScalarValue> = None;
    for value in values {
        let next = match (acc.take(), value) {
            (None, v) => v.clone(),
            (Some(ScalarValue::Integer(a)), ScalarValue::Integer(b)) => {
                ScalarValue::Integer(a.checked_add(*b).ok_or_else(overflow)?)
            }
            (Some(ScalarValue::Float(a)), ScalarValue::Float(b)) => ScalarValue::Float(a + b),
            (
                Some(ScalarValue::Decimal { value: a, scale: sa }),
                ScalarValue::Decimal { value: b, scale: sb },
            ) => {
                let scale = sa.max(*sb);
                let a = qv_core::value::rescale(a, sa, scale).ok_or_else(overflow)?;
                let b = qv_core::value::rescale(*b, *sb, scale).ok_or_else(overflow)?;
                ScalarValue::Decimal {
                    value: a.checked_add(b).ok_or_else(overflow)?,
                    scale,
                }
            }
            (Some(a), b) => {
                return Err(PlanError::eval("sum", format!("cannot add {a} and {b}")).into())
            }
        };
        acc = Some(next);
    }
    Ok(acc.unwrap_or(ScalarValue::Null))
}

/// Compare two key tuples under the direction and null placement of `keys`
pub(crate) fn compare_keys(a: &[ScalarValue], b: &[ScalarValue], keys: &[SortKey]) -> Ordering {
    for ((x, y), key) in a.iter().zip(b.iter()).zip(keys.iter()) {
        let ord = match (x.is_null(), y.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) if key.nulls_first => Ordering::Less,
            (true, false) => Ordering::Greater,
            (false, true) if key.nulls_first => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let ord = x.compare(y).unwrap_or(Ordering::Equal);
                if key.ascending {
                    ord
                } else {
                    ord.reverse()
                }
            }
        };
        if ord.is_ne() {
            return ord;
        }
    }
    Ordering::Equal
}

/// Evaluate every expression of `exprs` against each row of `input`
pub(crate) fn eval_keys(
    exprs: &[&Expr],
    input: NodeId,
    rows: &[Row],
) -> BackendResult<Vec<Vec<ScalarValue>>> {
    rows.iter()
        .map(|row| {
            let binding = [(input, row.as_slice())];
            let scope = RowScope::new(&binding);
            exprs.iter().map(|e| eval(e, &scope)).collect()
        })
        .collect()
}
