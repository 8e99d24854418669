//! qv-core - Core library for Quiver
//!
//! This crate provides the scalar type system and promotion lattice, literal
//! values, relation schemas, structural hashing primitives, strongly-typed
//! names and `quiver.yml` configuration shared by every Quiver crate.

pub mod config;
pub mod error;
pub mod hashing;
pub mod names;
mod newtype_string;
pub mod schema;
pub(crate) mod serde_helpers;
pub mod types;
pub mod value;

pub use config::{Config, OptimizerConfig, RuleConfig};
pub use error::{CastError, CoreError, CoreResult};
pub use hashing::{NodeId, StructuralHash, StructuralHasher};
pub use names::{FunctionName, SourceName};
pub use schema::{Field, Schema};
pub use types::{
    is_assignable, parse_data_type, unify, unify_all, DataType, FloatBitWidth, IntBitWidth,
    IntervalUnit, Nullability, StructField, TimeUnit, MAX_DECIMAL_PRECISION,
};
pub use value::ScalarValue;
