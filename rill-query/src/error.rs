//! Error types for query evaluation
//!
//! Two tiers:
//! - [`ExpressionError`] is row-level. FILTER, EXTEND and aggregates catch it
//!   at the innermost scope and never let it abort a query.
//! - [`QueryError`] is operator-level and aborts evaluation.

use rill_core::Term;
use thiserror::Error;

/// Relational comparison could not be decided
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComparisonError {
    #[error("Cannot apply {operator} to {left} and {right}: no ordering is defined")]
    Incomparable {
        operator: &'static str,
        left: String,
        right: String,
    },
}

impl ComparisonError {
    pub fn incomparable(operator: &'static str, left: &Term, right: &Term) -> Self {
        ComparisonError::Incomparable {
            operator,
            left: left.to_string(),
            right: right.to_string(),
        }
    }
}

/// Row-level expression evaluation error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    /// Dereference of a variable with no value in the current solution
    #[error("Variable ?{0} is unbound")]
    UnboundVariable(String),

    /// Operand of the wrong kind or datatype
    #[error("Type mismatch in {context}: {detail}")]
    TypeMismatch {
        context: &'static str,
        detail: String,
    },

    #[error("Division by zero")]
    DivideByZero,

    /// Integer arithmetic overflowed
    #[error("Arithmetic overflow")]
    Overflow,

    /// Literal whose lexical form does not match its datatype
    #[error("Invalid lexical form {lexical:?} for {datatype}")]
    InvalidLexicalForm { lexical: String, datatype: String },

    #[error("Cannot cast {from} to {to}")]
    UnsupportedCast { from: String, to: String },

    /// Argument rejected by a function (bad arity, bad flags, ...)
    #[error("Invalid argument to {function}: {detail}")]
    InvalidArgument {
        function: &'static str,
        detail: String,
    },

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Expression or aggregate with no value to return (all COALESCE
    /// arguments failed, MIN over an empty group, ...)
    #[error("{0} produced no value")]
    NoValue(&'static str),

    /// Aggregate used outside a grouped multiset
    #[error("Aggregate evaluated outside of a group")]
    NotGrouped,

    /// Row-level failure of a nested operator evaluation (EXISTS)
    #[error("Nested evaluation failed: {0}")]
    Nested(String),

    #[error(transparent)]
    Comparison(#[from] ComparisonError),
}

impl ExpressionError {
    pub fn type_mismatch(context: &'static str, detail: impl Into<String>) -> Self {
        ExpressionError::TypeMismatch {
            context,
            detail: detail.into(),
        }
    }

    pub fn invalid_argument(function: &'static str, detail: impl Into<String>) -> Self {
        ExpressionError::InvalidArgument {
            function,
            detail: detail.into(),
        }
    }

    pub fn invalid_lexical(lexical: &str, datatype: &str) -> Self {
        ExpressionError::InvalidLexicalForm {
            lexical: lexical.to_string(),
            datatype: datatype.to_string(),
        }
    }
}

/// Cooperative timeout fired
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Query execution time exceeded the timeout of {timeout_ms}ms, aborted after {elapsed_ms}ms")]
pub struct TimeoutError {
    pub timeout_ms: u64,
    pub elapsed_ms: u64,
}

/// Operator-level evaluation errors
#[derive(Error, Debug, Clone)]
pub enum QueryError {
    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    /// Operator with no evaluation strategy
    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    /// Error from the dataset collaborator, propagated unmodified
    #[error(transparent)]
    Dataset(#[from] rill_core::Error),

    /// Remote SERVICE evaluation failed and was not SILENT
    #[error("Service error: {0}")]
    Service(String),

    /// Structurally invalid algebra (e.g. BIND to an in-scope variable)
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Expression error in a position where it is fatal
    #[error(transparent)]
    Expression(#[from] ExpressionError),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl QueryError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, QueryError::Timeout(_))
    }
}

/// Result type for query operations
pub type Result<T> = std::result::Result<T, QueryError>;

/// Result type for expression evaluation
pub type ExprResult<T> = std::result::Result<T, ExpressionError>;
