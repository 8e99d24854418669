//! Backend trait definitions

use crate::capability::CapabilitySet;
use crate::compile::CompiledPlan;
use crate::error::BackendResult;
use crate::result::ResultSet;
use async_trait::async_trait;
use qv_plan::PlanGraph;

/// A target that lowers optimized plans into its own executable form.
///
/// Implementations declare what they support up front; [`crate::compile`]
/// rejects any plan that needs more before `lower` is ever called.
pub trait Backend: Send + Sync {
    /// Backend-specific lowered plan
    type Plan: Send + Sync;

    /// Backend identifier for logging and errors
    fn name(&self) -> &str;

    /// Operator and function kinds this backend can lower
    fn capabilities(&self) -> &CapabilitySet;

    /// Lower a plan whose every node has passed the capability check
    fn lower(&self, graph: &PlanGraph) -> BackendResult<Self::Plan>;
}

/// A backend that can run what it compiled
#[async_trait]
pub trait Executor: Backend {
    /// Run a compiled plan to completion
    async fn execute(&self, plan: &CompiledPlan<Self::Plan>) -> BackendResult<ResultSet>;
}
