//! Error types for qv-plan

use qv_core::{CastError, CoreError, DataType};
use thiserror::Error;

/// Broad category of a construction-time failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Incompatible types
    Type,
    /// Arity, schema or operator-shape mismatch
    Shape,
    /// A name that cannot be resolved to exactly one column, relation or function
    AmbiguousReference,
    /// A backend cannot lower a node kind
    UnsupportedOperation,
    /// A function failed while evaluating concrete values
    Evaluation,
}

/// Plan construction and evaluation errors
#[derive(Error, Debug)]
pub enum PlanError {
    /// P001: Expression type does not match what the context requires
    #[error("[P001] Type mismatch in {context}: expected {expected}, found {found}")]
    TypeMismatch {
        context: String,
        expected: String,
        found: DataType,
    },

    /// P002: Two types have no common supertype
    #[error("[P002] {0}")]
    Cast(#[from] CastError),

    /// P003: Function argument cannot be coerced to the declared input type
    #[error("[P003] Argument {position} of '{function}' has type {found}, expected {expected}")]
    InvalidArgumentType {
        function: String,
        position: usize,
        expected: String,
        found: DataType,
    },

    /// P004: Filter or join predicate is not boolean
    #[error("[P004] Predicate in {context} must be BOOLEAN, found {found}")]
    NonBooleanPredicate { context: String, found: DataType },

    /// P005: Wrong number of arguments
    #[error("[P005] Function '{function}' expects {expected} argument(s), got {found}")]
    ArityMismatch {
        function: String,
        expected: String,
        found: usize,
    },

    /// P006: Operator shape violation
    #[error("[P006] Invalid {operator}: {message}")]
    InvalidShape { operator: String, message: String },

    /// P007: Column not present in the referenced relation
    #[error("[P007] Column '{column}' not found in {relation}")]
    UnresolvedColumn { column: String, relation: String },

    /// P008: Column reachable through more than one path
    #[error("[P008] Column '{column}' is ambiguous: reachable through more than one input of {relation}")]
    AmbiguousColumn { column: String, relation: String },

    /// P009: Field bound to a relation that is not visible from the consumer
    #[error("[P009] Column '{column}' of {origin} is not visible from {relation}")]
    ForeignReference {
        column: String,
        origin: String,
        relation: String,
    },

    /// P010: Join of a relation with itself without an alias
    #[error("[P010] Cannot join {relation} with itself; alias one side first")]
    SelfJoin { relation: String },

    /// P011: Unknown function name
    #[error("[P011] Unknown function '{name}'")]
    UnknownFunction { name: String },

    /// P012: Set operation inputs do not line up
    #[error("[P012] Set operation inputs differ: {message}")]
    SetOpMismatch { message: String },

    /// P013: Function evaluation failed on concrete values
    #[error("[P013] Evaluation of '{function}' failed: {message}")]
    Evaluation { function: String, message: String },

    /// P014: Core error propagation
    #[error("[P014] {0}")]
    Core(#[from] CoreError),
}

impl PlanError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlanError::TypeMismatch { .. }
            | PlanError::Cast(_)
            | PlanError::InvalidArgumentType { .. }
            | PlanError::NonBooleanPredicate { .. } => ErrorKind::Type,
            PlanError::ArityMismatch { .. }
            | PlanError::InvalidShape { .. }
            | PlanError::SetOpMismatch { .. } => ErrorKind::Shape,
            PlanError::UnresolvedColumn { .. }
            | PlanError::AmbiguousColumn { .. }
            | PlanError::ForeignReference { .. }
            | PlanError::SelfJoin { .. }
            | PlanError::UnknownFunction { .. } => ErrorKind::AmbiguousReference,
            PlanError::Evaluation { .. } => ErrorKind::Evaluation,
            PlanError::Core(e) => match e {
                CoreError::InvalidType { .. }
                | CoreError::InvalidCast { .. }
                | CoreError::InvalidDecimal { .. } => ErrorKind::Type,
                CoreError::ColumnNotFound { .. } => ErrorKind::AmbiguousReference,
                _ => ErrorKind::Shape,
            },
        }
    }

    pub(crate) fn shape(operator: &str, message: impl Into<String>) -> Self {
        PlanError::InvalidShape {
            operator: operator.to_string(),
            message: message.into(),
        }
    }

    /// Evaluation failure raised by a function body
    pub fn eval(function: &str, message: impl Into<String>) -> Self {
        PlanError::Evaluation {
            function: function.to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias for PlanError
pub type PlanResult<T> = Result<T, PlanError>;
