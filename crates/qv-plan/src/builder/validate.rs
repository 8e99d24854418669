//! Operator shape and type checks

use crate::error::{PlanError, PlanResult};
use crate::ir::expr::{Expr, SortKey};
use qv_core::DataType;
use std::collections::HashSet;

pub(crate) fn non_empty<T>(operator: &str, what: &str, items: &[T]) -> PlanResult<()> {
    if items.is_empty() {
        return Err(PlanError::shape(operator, format!("{what} must not be empty")));
    }
    Ok(())
}

pub(crate) fn unique_names<'a>(
    operator: &str,
    names: impl IntoIterator<Item = &'a str>,
) -> PlanResult<()> {
    let mut seen = HashSet::new();
    for name in names {
        if name.is_empty() {
            return Err(PlanError::shape(operator, "output column names must not be empty"));
        }
        if !seen.insert(name) {
            return Err(PlanError::shape(
                operator,
                format!("duplicate output column '{name}'"),
            ));
        }
    }
    Ok(())
}

/// Boolean, row-level predicates
pub(crate) fn predicates(context: &str, predicates: &[Expr]) -> PlanResult<()> {
    for p in predicates {
        if !matches!(p.data_type(), DataType::Boolean | DataType::Null) {
            return Err(PlanError::NonBooleanPredicate {
                context: context.to_string(),
                found: p.data_type().clone(),
            });
        }
        if p.contains_aggregate() || p.contains_window() {
            return Err(PlanError::shape(
                context,
                format!("predicate {p} cannot contain aggregate or window calls"),
            ));
        }
    }
    Ok(())
}

/// Projection columns may hold windows but no bare aggregates
pub(crate) fn projection(columns: &[(String, Expr)]) -> PlanResult<()> {
    non_empty("project", "column list", columns)?;
    unique_names("project", columns.iter().map(|(n, _)| n.as_str()))?;
    for (name, e) in columns {
        if e.has_bare_aggregate() {
            return Err(PlanError::shape(
                "project",
                format!("column '{name}' contains an aggregate outside a window; use aggregate()"),
            ));
        }
    }
    Ok(())
}

pub(crate) fn aggregation(keys: &[(String, Expr)], metrics: &[(String, Expr)]) -> PlanResult<()> {
    if keys.is_empty() && metrics.is_empty() {
        return Err(PlanError::shape(
            "aggregate",
            "at least one key or metric is required",
        ));
    }
    unique_names(
        "aggregate",
        keys.iter().chain(metrics.iter()).map(|(n, _)| n.as_str()),
    )?;
    for (name, key) in keys {
        if key.contains_aggregate() || key.contains_window() {
            return Err(PlanError::shape(
                "aggregate",
                format!("grouping key '{name}' cannot contain aggregate or window calls"),
            ));
        }
    }
    for (name, metric) in metrics {
        if metric.contains_window() {
            return Err(PlanError::shape(
                "aggregate",
                format!("metric '{name}' cannot contain window calls"),
            ));
        }
        if !metric.contains_aggregate() || !metric.fields_reduced() {
            return Err(PlanError::shape(
                "aggregate",
                format!("metric '{name}' must reduce every column it references"),
            ));
        }
    }
    Ok(())
}

pub(crate) fn sort_keys(keys: &[SortKey]) -> PlanResult<()> {
    non_empty("sort", "sort key list", keys)?;
    for key in keys {
        if !key.expr.data_type().is_orderable() {
            return Err(PlanError::TypeMismatch {
                context: "sort".to_string(),
                expected: "an orderable type".to_string(),
                found: key.expr.data_type().clone(),
            });
        }
        if key.expr.contains_aggregate() || key.expr.contains_window() {
            return Err(PlanError::shape(
                "sort",
                "sort keys cannot contain aggregate or window calls",
            ));
        }
    }
    Ok(())
}
