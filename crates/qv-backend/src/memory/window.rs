//! Window function evaluation over a materialized input

use super::eval::{compare_keys, eval_keys, reduce, WindowColumns};
use crate::error::{BackendError, BackendResult};
use crate::result::Row;
use qv_core::{NodeId, ScalarValue};
use qv_plan::{Expr, ExprKind, FrameBound, FrameUnits, SortKey, WindowFrame, WindowFunc};
use std::collections::HashMap;

/// Every distinct window call inside `exprs`, outermost first
pub(crate) fn window_calls(exprs: &[&Expr]) -> Vec<Expr> {
    let mut out: Vec<Expr> = Vec::new();
    for expr in exprs {
        expr.any(&mut |e| {
            if matches!(e.kind(), ExprKind::Window { .. }) && !out.contains(e) {
                out.push(e.clone());
            }
            false
        });
    }
    out
}

/// Compute each window call once over all rows of `input`
pub(crate) fn evaluate_windows(
    calls: &[Expr],
    input: NodeId,
    rows: &[Row],
) -> BackendResult<WindowColumns> {
    calls
        .iter()
        .map(|call| Ok((call.id(), evaluate_window(call, input, rows)?)))
        .collect()
}

fn evaluate_window(call: &Expr, input: NodeId, rows: &[Row]) -> BackendResult<Vec<ScalarValue>> {
    let ExprKind::Window {
        func,
        args,
        partition_by,
        order_by,
        frame,
    } = call.kind()
    else {
        return Err(BackendError::Internal(format!("{call} is not a window call")));
    };

    let partition_exprs: Vec<&Expr> = partition_by.iter().collect();
    let order_exprs: Vec<&Expr> = order_by.iter().map(|k| &k.expr).collect();
    let arg_exprs: Vec<&Expr> = args.iter().collect();
    let partition_keys = eval_keys(&partition_exprs, input, rows)?;
    let order_keys = eval_keys(&order_exprs, input, rows)?;
    let arg_values = eval_keys(&arg_exprs, input, rows)?;

    // Partitions in order of first appearance
    let mut partitions: Vec<Vec<usize>> = Vec::new();
    let mut index: HashMap<&[ScalarValue], usize> = HashMap::new();
    for (row, key) in partition_keys.iter().enumerate() {
        let slot = *index.entry(key.as_slice()).or_insert_with(|| {
            partitions.push(Vec::new());
            partitions.len() - 1
        });
        if let Some(members) = partitions.get_mut(slot) {
            members.push(row);
        }
    }

    let mut out = vec![ScalarValue::Null; rows.len()];
    for mut members in partitions {
        members.sort_by(|a, b| compare_keys(&order_keys[*a], &order_keys[*b], order_by));
        let sorted = Partition::new(&members, &order_keys, order_by);
        for pos in 0..members.len() {
            let value = match func {
                WindowFunc::RowNumber => ScalarValue::Integer(pos as i64 + 1),
                WindowFunc::Rank => ScalarValue::Integer(sorted.peer_start[pos] as i64 + 1),
                WindowFunc::DenseRank => ScalarValue::Integer(sorted.peer_group[pos] as i64 + 1),
                WindowFunc::Lag(n) => pos
                    .checked_sub(*n as usize)
                    .and_then(|p| first_arg(&arg_values, members[p]))
                    .unwrap_or(ScalarValue::Null),
                WindowFunc::Lead(n) => pos
                    .checked_add(*n as usize)
                    .filter(|p| *p < members.len())
                    .and_then(|p| first_arg(&arg_values, members[p]))
                    .unwrap_or(ScalarValue::Null),
                WindowFunc::Aggregate(agg) => {
                    let (lo, hi) = sorted.frame(pos, frame)?;
                    let frame_rows = if lo < hi { &members[lo..hi] } else { &[][..] };
                    let values: Vec<ScalarValue> = frame_rows
                        .iter()
                        .filter_map(|r| first_arg(&arg_values, *r))
                        .collect();
                    reduce(*agg, false, frame_rows.len(), values)?
                }
            };
            out[members[pos]] = value;
        }
    }
    Ok(out)
}

fn first_arg(values: &[Vec<ScalarValue>], row: usize) -> Option<ScalarValue> {
    values.get(row).and_then(|v| v.first()).cloned()
}

/// Peer structure of one sorted partition
struct Partition {
    len: usize,
    /// Position of the first peer of each position
    peer_start: Vec<usize>,
    /// One past the last peer of each position
    peer_end: Vec<usize>,
    /// Zero-based index of each position's peer group
    peer_group: Vec<usize>,
}

impl Partition {
    fn new(members: &[usize], order_keys: &[Vec<ScalarValue>], order_by: &[SortKey]) -> Self {
        let len = members.len();
        let mut peer_start = vec![0; len];
        let mut peer_group = vec![0; len];
        for pos in 1..len {
            let prev = &order_keys[members[pos - 1]];
            let cur = &order_keys[members[pos]];
            if compare_keys(prev, cur, order_by).is_eq() {
                peer_start[pos] = peer_start[pos - 1];
                peer_group[pos] = peer_group[pos - 1];
            } else {
                peer_start[pos] = pos;
                peer_group[pos] = peer_group[pos - 1] + 1;
            }
        }
        let mut peer_end = vec![len; len];
        for pos in (0..len.saturating_sub(1)).rev() {
            peer_end[pos] = if peer_start[pos + 1] == peer_start[pos] {
                peer_end[pos + 1]
            } else {
                pos + 1
            };
        }
        Self {
            len,
            peer_start,
            peer_end,
            peer_group,
        }
    }

    /// Half-open range of positions inside the frame of `pos`
    fn frame(&self, pos: usize, frame: &WindowFrame) -> BackendResult<(usize, usize)> {
        let unsupported = || {
            BackendError::Internal(format!("offset bound in RANGE frame {frame}"))
        };
        let (lo, hi) = match frame.units {
            FrameUnits::Rows => {
                let lo = match frame.start {
                    FrameBound::UnboundedPreceding => 0,
                    FrameBound::Preceding(n) => pos.saturating_sub(n as usize),
                    FrameBound::CurrentRow => pos,
                    FrameBound::Following(n) => pos.saturating_add(n as usize),
                    FrameBound::UnboundedFollowing => self.len,
                };
                let hi = match frame.end {
                    FrameBound::UnboundedPreceding => 0,
                    FrameBound::Preceding(n) => (pos + 1).saturating_sub(n as usize),
                    FrameBound::CurrentRow => pos + 1,
                    FrameBound::Following(n) => pos.saturating_add(n as usize).saturating_add(1),
                    FrameBound::UnboundedFollowing => self.len,
                };
                (lo, hi)
            }
            FrameUnits::Range => {
                let lo = match frame.start {
                    FrameBound::UnboundedPreceding => 0,
                    FrameBound::CurrentRow => self.peer_start[pos],
                    _ => return Err(unsupported()),
                };
                let hi = match frame.end {
                    FrameBound::CurrentRow => self.peer_end[pos],
                    FrameBound::UnboundedFollowing => self.len,
                    _ => return Err(unsupported()),
                };
                (lo, hi)
            }
        };
        Ok((lo.min(self.len), hi.min(self.len)))
    }
}

#[cfg(test)]
#[path = "window_test.rs"]
mod tests;
