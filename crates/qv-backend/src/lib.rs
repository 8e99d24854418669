//! qv-backend - Backend contract for Quiver
//!
//! This crate provides the capability model backends declare, the
//! capability-gated [`compile`] entry point, the async [`Executor`] boundary
//! and [`MemoryBackend`], a reference executor over in-memory tables.
//! Nothing in the plan IR or the rewrite engine depends on this crate.

pub mod capability;
pub mod compile;
pub mod error;
pub mod memory;
pub mod result;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

pub use capability::{required_capabilities, Capability, CapabilitySet};
pub use compile::{compile, CompiledPlan};
pub use error::{BackendError, BackendResult};
pub use memory::{MemoryBackend, MemoryPlan, MEMORY_BACKEND};
pub use result::{ResultSet, Row};
pub use traits::{Backend, Executor};
