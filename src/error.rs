//! Runtime error type
//!
//! Every user-visible failure of the runtime is a [`RuntimeError`] carrying a
//! descriptive message. The variant only records which class of failure
//! happened; callers are expected to abort the enclosing top-level call on any
//! of them. Nothing in the runtime retries or rolls back.

use crate::backend::BackendError;

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors surfaced by circuit execution, codecs and the crypto façade
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    /// A circuit-level assertion failed
    #[error("failed assert: {0}")]
    Assertion(String),

    /// Argument or value did not have the expected shape
    #[error("type error: {0}")]
    TypeMismatch(String),

    /// Ledger, private or confidential-transfer state missing for an address
    #[error("missing state: {0}")]
    MissingState(String),

    /// Witness lookup failed
    #[error("missing witness: {0}")]
    MissingWitness(String),

    /// Circuit lookup failed
    #[error("missing circuit: {0}")]
    MissingCircuit(String),

    /// Decoded or encoded value outside of its declared range
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// Failure reported by the cryptographic or ledger backend
    #[error("backend error: {0}")]
    Backend(String),

    /// Context used in a way its lifecycle does not allow
    #[error("usage error: {0}")]
    Usage(String),

    /// Invalid runtime configuration
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RuntimeError {
    /// Build an assertion failure
    pub fn assertion(msg: impl Into<String>) -> Self {
        RuntimeError::Assertion(msg.into())
    }

    /// Build a shape/type mismatch
    pub fn type_mismatch(msg: impl Into<String>) -> Self {
        RuntimeError::TypeMismatch(msg.into())
    }

    /// Build a range violation
    pub fn out_of_range(msg: impl Into<String>) -> Self {
        RuntimeError::OutOfRange(msg.into())
    }

    /// Build a lifecycle violation
    pub fn usage(msg: impl Into<String>) -> Self {
        RuntimeError::Usage(msg.into())
    }

    /// The descriptive message without the category prefix
    pub fn message(&self) -> &str {
        match self {
            RuntimeError::Assertion(msg)
            | RuntimeError::TypeMismatch(msg)
            | RuntimeError::MissingState(msg)
            | RuntimeError::MissingWitness(msg)
            | RuntimeError::MissingCircuit(msg)
            | RuntimeError::OutOfRange(msg)
            | RuntimeError::Backend(msg)
            | RuntimeError::Usage(msg)
            | RuntimeError::Config(msg) => msg,
        }
    }
}

impl From<BackendError> for RuntimeError {
    fn from(err: BackendError) -> Self {
        RuntimeError::Backend(err.to_string())
    }
}

impl From<crate::types::ConfigError> for RuntimeError {
    fn from(err: crate::types::ConfigError) -> Self {
        RuntimeError::Config(err.to_string())
    }
}
