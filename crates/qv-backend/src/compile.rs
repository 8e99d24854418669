//! Capability-gated compilation of optimized plans

use crate::capability::required_capabilities;
use crate::error::{BackendError, BackendResult};
use crate::traits::Backend;
use log::debug;
use qv_core::Schema;
use qv_plan::{PlanGraph, Rel};

/// A plan lowered by one backend, together with the plan it came from
#[derive(Debug, Clone)]
pub struct CompiledPlan<P> {
    root: Rel,
    backend: String,
    plan: P,
}

impl<P> CompiledPlan<P> {
    /// The plan that was compiled
    pub fn root(&self) -> &Rel {
        &self.root
    }

    /// Output schema of the compiled plan
    pub fn schema(&self) -> &Schema {
        self.root.schema()
    }

    /// Name of the backend that lowered the plan
    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// Backend-specific lowered form
    pub fn plan(&self) -> &P {
        &self.plan
    }
}

/// Compile `root` for `backend`.
///
/// Every distinct node is checked once, inputs before consumers; the first
/// node needing an undeclared capability fails the whole compilation with an
/// [`BackendError::UnsupportedOperation`] naming that node. Nothing is lowered
/// partially.
pub fn compile<B: Backend + ?Sized>(backend: &B, root: &Rel) -> BackendResult<CompiledPlan<B::Plan>> {
    let graph = PlanGraph::from_root(root);
    let capabilities = backend.capabilities();
    for rel in graph.topological_order()? {
        let missing = required_capabilities(&rel)
            .into_iter()
            .find(|cap| !capabilities.supports(cap));
        if let Some(cap) = missing {
            debug!(
                "Backend '{}' rejected {}: missing capability {}",
                backend.name(),
                rel.label(),
                cap
            );
            return Err(BackendError::UnsupportedOperation {
                backend: backend.name().to_string(),
                node: rel.label(),
                kind: cap.to_string(),
            });
        }
    }

    let plan = backend.lower(&graph)?;
    debug!(
        "Compiled {} for backend '{}' ({} nodes)",
        root.label(),
        backend.name(),
        graph.node_count()
    );
    Ok(CompiledPlan {
        root: root.clone(),
        backend: backend.name().to_string(),
        plan,
    })
}

#[cfg(test)]
#[path = "compile_test.rs"]
mod tests;
