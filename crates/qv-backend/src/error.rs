//! Error types for qv-backend

use qv_plan::{ErrorKind, PlanError};
use thiserror::Error;

/// Compilation and execution errors
#[derive(Error, Debug)]
pub enum BackendError {
    /// B001: The backend cannot lower a node
    #[error("[B001] Backend '{backend}' cannot lower {node}: unsupported {kind}")]
    UnsupportedOperation {
        backend: String,
        node: String,
        kind: String,
    },

    /// B002: A source relation has no registered table
    #[error("[B002] Table '{name}' is not registered with backend '{backend}'")]
    TableNotFound { name: String, backend: String },

    /// B003: Registered table rows or schema are unusable
    #[error("[B003] Invalid table '{table}': {message}")]
    InvalidTable { table: String, message: String },

    /// B004: Registered table does not provide the schema a source declares
    #[error("[B004] Table '{table}' has schema {found}, source declares {expected}")]
    SchemaMismatch {
        table: String,
        expected: String,
        found: String,
    },

    /// B005: Runtime failure while evaluating a node
    #[error("[B005] Execution of {node} failed: {message}")]
    Execution { node: String, message: String },

    /// B006: Plan error propagation
    #[error("[B006] {0}")]
    Plan(#[from] PlanError),

    /// B007: Internal error
    #[error("[B007] Internal backend error: {0}")]
    Internal(String),
}

impl BackendError {
    /// Category of this error, when it maps onto the construction taxonomy
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            BackendError::UnsupportedOperation { .. } => Some(ErrorKind::UnsupportedOperation),
            BackendError::Execution { .. } => Some(ErrorKind::Evaluation),
            BackendError::Plan(e) => Some(e.kind()),
            _ => None,
        }
    }

    pub(crate) fn execution(node: &str, message: impl Into<String>) -> Self {
        BackendError::Execution {
            node: node.to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias for BackendError
pub type BackendResult<T> = Result<T, BackendError>;
