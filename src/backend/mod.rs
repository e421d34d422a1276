//! Cryptographic backend abstraction and the in-process reference backend
//!
//! The runtime never implements field arithmetic, hashing or curve operations
//! itself; it consumes them through [`CryptoBackend`].

pub mod reference;
pub mod r#trait;

pub use reference::ReferenceBackend;
pub use r#trait::CryptoBackend;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors reported by a backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Ledger query failed
    #[error("query failed: {0}")]
    Query(String),

    /// Input was not a valid encoding for the operation
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Curve operation failed
    #[error("curve error: {0}")]
    Curve(String),
}
