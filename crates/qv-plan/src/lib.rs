//! qv-plan: deferred query-expression IR for Quiver
//!
//! This crate provides the immutable, structurally hashed plan DAG
//! ([`Rel`] / [`Expr`]), the validating builder, the scalar function and UDF
//! registry, and the rule-based rewrite engine that optimizes plans while
//! preserving their output schema.

pub mod builder;
pub mod error;
pub mod function;
pub mod ir;
pub mod rewrite;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

pub use error::{ErrorKind, PlanError, PlanResult};
pub use function::aggregate::{AggregateFunc, FrameBound, FrameUnits, WindowFrame, WindowFunc};
pub use function::{
    eval_fn, CmpOp, Domain, EvalFn, FunctionDef, FunctionRegistry, InputConstraint, Signature,
    Specializer, UdfDefinition, UdfInput, Volatility,
};
pub use ir::{
    CacheStats, Expr, ExprKind, FieldRef, JoinKind, NodeCache, PlanGraph, Rel, RelOp, SetOpKind,
    SortKey, Transformed,
};
pub use rewrite::{optimize, OptimizeReport, Optimizer, RuleSet, RULE_NAMES};
