//! Relational operators over materialized rows

use super::eval::{compare_keys, eval, eval_group, eval_keys, RowScope};
use super::window::{evaluate_windows, window_calls};
use crate::error::{BackendError, BackendResult};
use crate::result::Row;
use qv_core::{NodeId, ScalarValue, Schema};
use qv_plan::{Expr, JoinKind, PlanError, SetOpKind, SortKey};
use std::collections::HashMap;

pub(crate) fn project(input: NodeId, rows: &[Row], columns: &[(String, Expr)]) -> BackendResult<Vec<Row>> {
    let exprs: Vec<&Expr> = columns.iter().map(|(_, e)| e).collect();
    let windows = evaluate_windows(&window_calls(&exprs), input, rows)?;
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let binding = [(input, row.as_slice())];
            let scope = RowScope::new(&binding).with_windows(&windows, i);
            exprs.iter().map(|e| eval(e, &scope)).collect()
        })
        .collect()
}

/// Rows passing every predicate; later predicates are skipped once one fails
pub(crate) fn filter(input: NodeId, rows: &[Row], predicates: &[Expr]) -> BackendResult<Vec<Row>> {
    let mut out = Vec::new();
    'rows: for row in rows {
        let binding = [(input, row.as_slice())];
        let scope = RowScope::new(&binding);
        for predicate in predicates {
            if eval(predicate, &scope)?.as_bool() != Some(true) {
                continue 'rows;
            }
        }
        out.push(row.clone());
    }
    Ok(out)
}

/// Group rows by key values in order of first appearance.
///
/// Without keys the whole input is one group, even when it is empty.
pub(crate) fn aggregate(
    input: NodeId,
    rows: &[Row],
    keys: &[(String, Expr)],
    metrics: &[(String, Expr)],
) -> BackendResult<Vec<Row>> {
    let key_exprs: Vec<&Expr> = keys.iter().map(|(_, e)| e).collect();
    let key_values = eval_keys(&key_exprs, input, rows)?;

    let mut groups: Vec<(Vec<ScalarValue>, Vec<&Row>)> = Vec::new();
    let mut index: HashMap<&[ScalarValue], usize> = HashMap::new();
    for (row, key) in rows.iter().zip(key_values.iter()) {
        match index.get(key.as_slice()) {
            Some(slot) => {
                if let Some((_, members)) = groups.get_mut(*slot) {
                    members.push(row);
                }
            }
            None => {
                index.insert(key.as_slice(), groups.len());
                groups.push((key.clone(), vec![row]));
            }
        }
    }
    if keys.is_empty() && groups.is_empty() {
        groups.push((Vec::new(), Vec::new()));
    }

    groups
        .into_iter()
        .map(|(mut out, members)| {
            for (_, metric) in metrics {
                out.push(eval_group(metric, input, &members)?);
            }
            Ok(out)
        })
        .collect()
}

/// Stable sort on the key values
pub(crate) fn sort(input: NodeId, rows: &[Row], keys: &[SortKey]) -> BackendResult<Vec<Row>> {
    let exprs: Vec<&Expr> = keys.iter().map(|k| &k.expr).collect();
    let values = eval_keys(&exprs, input, rows)?;
    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.sort_by(|a, b| compare_keys(&values[*a], &values[*b], keys));
    Ok(order.into_iter().map(|i| rows[i].clone()).collect())
}

pub(crate) fn limit(rows: &[Row], limit: Option<u64>, offset: u64) -> Vec<Row> {
    let skipped = rows.iter().skip(offset as usize);
    match limit {
        Some(n) => skipped.take(n as usize).cloned().collect(),
        None => skipped.cloned().collect(),
    }
}

/// One side of a join
pub(crate) struct JoinSide<'a> {
    pub id: NodeId,
    pub rows: &'a [Row],
    pub width: usize,
}

/// Nested-loop join; unmatched rows of the preserved side are null-padded
pub(crate) fn join(
    left: JoinSide<'_>,
    right: JoinSide<'_>,
    kind: JoinKind,
    predicates: &[Expr],
) -> BackendResult<Vec<Row>> {
    let satisfied = |l: &Row, r: &Row| -> BackendResult<bool> {
        let binding = [(left.id, l.as_slice()), (right.id, r.as_slice())];
        let scope = RowScope::new(&binding);
        for predicate in predicates {
            if eval(predicate, &scope)?.as_bool() != Some(true) {
                return Ok(false);
            }
        }
        Ok(true)
    };
    let left_nulls = vec![ScalarValue::Null; left.width];
    let right_nulls = vec![ScalarValue::Null; right.width];

    let mut out = Vec::new();
    let mut right_matched = vec![false; right.rows.len()];
    for l in left.rows {
        let mut matched = false;
        for (j, r) in right.rows.iter().enumerate() {
            if !satisfied(l, r)? {
                continue;
            }
            matched = true;
            if kind.is_filtering() {
                break;
            }
            right_matched[j] = true;
            out.push(concat(l, r));
        }
        match kind {
            JoinKind::Left | JoinKind::Full if !matched => out.push(concat(l, &right_nulls)),
            JoinKind::Semi if matched => out.push(l.clone()),
            JoinKind::Anti if !matched => out.push(l.clone()),
            _ => {}
        }
    }
    if matches!(kind, JoinKind::Right | JoinKind::Full) {
        for (r, seen) in right.rows.iter().zip(right_matched) {
            if !seen {
                out.push(concat(&left_nulls, r));
            }
        }
    }
    Ok(out)
}

/// Set operation with bag semantics, or set semantics when `distinct`.
///
/// Both inputs are first converted to the unified output types so equal
/// values compare equal regardless of their input representation.
pub(crate) fn set_op(
    schema: &Schema,
    left: &[Row],
    right: &[Row],
    kind: SetOpKind,
    distinct: bool,
) -> BackendResult<Vec<Row>> {
    let left = conform(schema, left)?;
    let right = conform(schema, right)?;

    let out: Vec<Row> = match kind {
        SetOpKind::Union => left.into_iter().chain(right).collect(),
        SetOpKind::Intersect | SetOpKind::Difference => {
            let mut counts: HashMap<Row, usize> = HashMap::new();
            for row in right {
                *counts.entry(row).or_insert(0) += 1;
            }
            let keep_present = kind == SetOpKind::Intersect;
            let mut out = Vec::new();
            for row in left {
                let present = match counts.get_mut(&row) {
                    Some(n) if *n > 0 => {
                        if !distinct {
                            *n -= 1;
                        }
                        true
                    }
                    _ => false,
                };
                if present == keep_present {
                    out.push(row);
                }
            }
            out
        }
    };
    Ok(if distinct { dedup(out) } else { out })
}

fn concat(left: &[ScalarValue], right: &[ScalarValue]) -> Row {
    left.iter().chain(right.iter()).cloned().collect()
}

fn conform(schema: &Schema, rows: &[Row]) -> BackendResult<Vec<Row>> {
    rows.iter()
        .map(|row| {
            row.iter()
                .zip(schema.fields())
                .map(|(v, f)| {
                    v.cast_to(&f.data_type)
                        .map_err(|e| BackendError::from(PlanError::from(e)))
                })
                .collect::<BackendResult<Row>>()
        })
        .collect()
}

fn dedup(rows: Vec<Row>) -> Vec<Row> {
    let mut seen = std::collections::HashSet::new();
    rows.into_iter().filter(|r| seen.insert(r.clone())).collect()
}

pub(crate) fn missing_input(label: &str) -> BackendError {
    BackendError::Internal(format!("input of {label} was not evaluated"))
}
