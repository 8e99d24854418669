//! Immutable, structurally hashed plan nodes.
//!
//! A plan is a DAG of [`Rel`] nodes whose scalar payloads are [`Expr`] nodes.
//! Both are `Arc` handles identified by a [`NodeId`](qv_core::NodeId) derived
//! from the node kind, the ids of its children and its literal payload, so
//! equality and hashing are O(1) and two independently built but identical
//! plans compare equal.

pub mod cache;
mod display;
pub mod expr;
pub mod graph;
pub mod rel;
pub mod traverse;

pub use cache::{CacheStats, NodeCache};
pub use expr::{can_cast, Expr, ExprKind, FieldRef, SortKey};
pub use graph::PlanGraph;
pub use rel::{JoinKind, Rel, RelOp, SetOpKind};
pub use traverse::Transformed;
