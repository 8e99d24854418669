//! Merge a filter into the filter directly beneath it

use super::{RewriteResult, RewriteRule, RewriteSafetyError};
use crate::ir::rel::{Rel, RelOp};
use crate::ir::traverse::rebind_fields;

pub(crate) const NAME: &str = "filter_coalescing";

/// `Filter(p2) over Filter(p1)` becomes `Filter([p1, p2])`
pub(crate) struct FilterCoalescing;

impl RewriteRule for FilterCoalescing {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Merge adjacent filters into one predicate list, inner predicates first"
    }

    fn apply(&self, rel: &Rel) -> RewriteResult {
        let RelOp::Filter {
            input: inner,
            predicates: outer,
        } = rel.op()
        else {
            return Ok(None);
        };
        let RelOp::Filter {
            input: base,
            predicates: first,
        } = inner.op()
        else {
            return Ok(None);
        };
        if let Some(volatile) = outer.iter().find(|p| p.is_volatile()) {
            return Err(RewriteSafetyError::VolatileCall(volatile.to_string()));
        }

        let mut merged = first.clone();
        for p in outer {
            let p = rebind_fields(p, std::slice::from_ref(inner), std::slice::from_ref(base))?;
            if !p.is_volatile() && merged.contains(&p) {
                continue;
            }
            merged.push(p);
        }
        Ok(Some(base.filter(merged)?))
    }
}

#[cfg(test)]
#[path = "filter_coalescing_test.rs"]
mod tests;
