//! Error types for rill-core

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type
///
/// Dataset implementations report failures through this type; the evaluation
/// engine propagates them unmodified.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Dataset lookup or enumeration failed
    #[error("Dataset access error: {0}")]
    DatasetAccess(String),

    /// Named graph or resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed term (bad lexical form, empty IRI, ...)
    #[error("Invalid term: {0}")]
    InvalidTerm(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a dataset access error
    pub fn dataset(msg: impl Into<String>) -> Self {
        Error::DatasetAccess(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Create an invalid term error
    pub fn invalid_term(msg: impl Into<String>) -> Self {
        Error::InvalidTerm(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }
}
