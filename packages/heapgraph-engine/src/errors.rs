//! Error types for heapgraph-engine
//!
//! All expected failures are returned as values. Snapshot-consistency
//! anomalies (dangling references, broken root-pointer chains) never
//! surface here; the heap graph degrades to "no further data" instead.

use thiserror::Error;

/// Malformed query text, or a wrapped expression-evaluation failure.
///
/// Always surfaced to the caller, never retried.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QueryError {
    /// Empty query text with no `select` clause at all.
    #[error("query syntax error: no select clause")]
    NoSelectClause,

    /// Nothing between `select` and `from`/end of input.
    #[error("query syntax error: empty select expression")]
    EmptySelect,

    /// `from` present but no class token follows.
    #[error("query syntax error: missing class name after 'from'")]
    FromNoClassName,

    /// `instanceof` present but no class token follows.
    #[error("query syntax error: missing class name after 'instanceof'")]
    InstanceofNoClassName,

    /// Class given but no identifier follows (or the identifier slot holds
    /// the `where` keyword).
    #[error("query syntax error: missing identifier after class name")]
    NoIdentifier,

    /// A token follows the identifier but is not `where`.
    #[error("query syntax error: expected 'where', found '{0}'")]
    ExpectingWhere(String),

    /// `where` present but nothing follows.
    #[error("query syntax error: empty where expression")]
    EmptyWhere,

    /// The `from` class resolved to nothing in this snapshot.
    #[error("class not found: {0}")]
    UnknownClass(String),

    /// Failure from the expression-evaluation capability, cause preserved.
    #[error("expression evaluation failed: {0}")]
    Evaluation(#[from] EvalError),
}

/// Failure reported by the expression-evaluation capability.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct EvalError {
    pub message: String,
}

impl EvalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Programmer error: an iterator was advanced past exhaustion.
///
/// Not expected in correct integration code; callers check `has_next()`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("iteration advanced past exhaustion")]
pub struct EmptyIteration;

/// Result type alias for query operations.
pub type Result<T> = std::result::Result<T, QueryError>;
