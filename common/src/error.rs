//! Error taxonomy shared by the store facade and all backends.
//!
//! Errors fall into four families with different recovery expectations:
//!
//! - [`Error::Usage`]: a programming mistake (operation issued in the wrong
//!   lifecycle state, invalid argument shape). Surfaced immediately, never
//!   retried or swallowed.
//! - [`Error::Validation`]: a rejected key or batch entry. Recoverable by the
//!   caller; a rejected batch guarantees zero partial writes.
//! - [`Error::NotFound`]: a `get` target that does not exist. Distinguishable
//!   via [`Error::is_not_found`] so callers can treat it as "no value"
//!   without string matching.
//! - [`Error::Engine`] / [`Error::Corruption`]: an underlying storage
//!   failure, surfaced verbatim. Retry policy is a caller concern.

use std::io;

/// Error type for store and backend operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Operation issued in a state or shape that is a programming error.
    Usage(String),

    /// Key or batch entry rejected before reaching the engine.
    Validation(String),

    /// The requested key does not exist.
    NotFound,

    /// Failure reported by the underlying storage engine.
    Engine(String),

    /// The engine detected malformed on-disk data (e.g. a torn log frame).
    Corruption(String),
}

impl Error {
    /// Creates a [`Error::Usage`] error.
    pub fn usage(msg: impl Into<String>) -> Self {
        Error::Usage(msg.into())
    }

    /// Creates a [`Error::Validation`] error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Creates an [`Error::Engine`] error.
    pub fn engine(msg: impl Into<String>) -> Self {
        Error::Engine(msg.into())
    }

    /// Creates a [`Error::Corruption`] error.
    pub fn corruption(msg: impl Into<String>) -> Self {
        Error::Corruption(msg.into())
    }

    /// Returns true if this error means the key was absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }

    /// Returns true if this error is a programming mistake.
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::Usage(_))
    }

    /// Returns true if this error is an input validation failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// Returns true if this error came from the storage engine.
    pub fn is_engine(&self) -> bool {
        matches!(self, Error::Engine(_) | Error::Corruption(_))
    }
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Usage(msg) => write!(f, "Usage error: {}", msg),
            Error::Validation(msg) => write!(f, "Validation error: {}", msg),
            Error::NotFound => write!(f, "Key not found"),
            Error::Engine(msg) => write!(f, "Engine error: {}", msg),
            Error::Corruption(msg) => write!(f, "Corruption detected: {}", msg),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Engine(err.to_string())
    }
}

/// Result type alias for store and backend operations.
pub type Result<T> = std::result::Result<T, Error>;
