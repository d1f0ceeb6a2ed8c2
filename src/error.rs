use std::{io, time::Duration};

use thiserror::Error;

/// Errors surfaced by [`SplitPruner::filter`](crate::SplitPruner::filter).
///
/// Everything below the leaf-predicate level (missing indexes, failed loads,
/// unsupported values) is absorbed by keeping splits. Only a structurally
/// invalid expression tree is reported.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// A logical node joins its operands with an operator that has no
    /// split-set semantics.
    #[error("Unsupported logical expression type: {operator}")]
    UnsupportedLogicalOperator {
        /// The operator symbol
        operator: String,
    },
}

/// Errors produced while loading index metadata for a cache key.
///
/// These never reach the query path; the cache logs them and leaves the slot
/// empty.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("No index found for {path}")]
    NotFound { path: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Corrupt index for {path}: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Loading index for {path} timed out after {timeout:?}")]
    Timeout { path: String, timeout: Duration },
}

/// Errors raised by [`Index`](crate::Index) implementations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The value cannot be encoded for this index (nulls, nested types, ...).
    #[error("Value of type {value_type} is not supported by the {kind} index")]
    UnsupportedValue { kind: String, value_type: String },

    #[error("Operator '{operator}' is not supported by the {kind} index")]
    UnsupportedOperator { kind: String, operator: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed {kind} index: {reason}")]
    Malformed { kind: String, reason: String },
}

/// Invalid filter configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown option '{key}'")]
    UnknownOption { key: String },

    #[error("Invalid value '{value}' for option '{key}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}
