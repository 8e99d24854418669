//! Error types for qv-core

use crate::types::DataType;
use thiserror::Error;

/// Core error type for Quiver
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Configuration file not found
    #[error("[C001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// C002: Failed to parse configuration file
    #[error("[C002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// C003: Invalid configuration value
    #[error("[C003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// C004: A relation schema with no columns
    #[error("[C004] Schema must contain at least one column")]
    EmptySchema,

    /// C005: Duplicate column name in a schema
    #[error("[C005] Duplicate column name '{name}' in schema")]
    DuplicateColumn { name: String },

    /// C006: Unrecognized type name
    #[error("[C006] Unrecognized data type '{name}'")]
    InvalidType { name: String },

    /// C007: A literal value cannot be represented in the requested type
    #[error("[C007] Cannot cast value {value} to {target}")]
    InvalidCast { value: String, target: String },

    /// C008: Empty name where a non-empty identifier is required
    #[error("[C008] Empty name for {context}")]
    EmptyName { context: String },

    /// C009: IO error with path context
    #[error("[C009] IO error at {path}: {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// C010: Column name not present in a schema
    #[error("[C010] Column '{name}' not found in schema")]
    ColumnNotFound { name: String },

    /// C011: Decimal precision or scale out of range
    #[error("[C011] Invalid DECIMAL({precision}, {scale}): precision must be 1..={max} and scale at most precision")]
    InvalidDecimal { precision: u8, scale: u8, max: u8 },
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;

/// Two types have no common supertype in the promotion lattice.
///
/// Raised by [`crate::types::unify`]; callers surface it as a type error at
/// expression-construction time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("[T001] Cannot unify {left} with {right}")]
pub struct CastError {
    /// Left operand type
    pub left: DataType,
    /// Right operand type
    pub right: DataType,
}

impl CastError {
    pub(crate) fn new(left: &DataType, right: &DataType) -> Self {
        Self {
            left: left.clone(),
            right: right.clone(),
        }
    }
}
