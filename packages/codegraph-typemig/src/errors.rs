//! Error types for codegraph-typemig
//!
//! Provides unified error handling across the crate.

use crate::config::ConfigError;
use crate::shared::models::TextRange;
use thiserror::Error;

/// Main error type for type migration
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The progress port reported cancellation; no edits were produced
    #[error("Migration cancelled")]
    Cancelled,

    /// Internal consistency check failed
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// A name or id did not resolve to a program element
    #[error("Unknown element: {0}")]
    UnknownElement(String),

    /// The element exists but cannot start a migration (library member, out of scope)
    #[error("Element cannot be migrated: {0}")]
    InvalidRoot(String),

    /// Malformed program model
    #[error("Program error: {0}")]
    Program(String),

    /// Edit application error
    #[error("Edit error: {0}")]
    Edit(#[from] EditError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Program snapshot (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrationError {
    pub fn invariant(msg: impl Into<String>) -> Self {
        MigrationError::InvariantViolation(msg.into())
    }

    pub fn program(msg: impl Into<String>) -> Self {
        MigrationError::Program(msg.into())
    }
}

/// Errors raised by the syntax editor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("no source for file '{0}'")]
    UnknownFile(String),

    #[error("range {range} is outside '{file}'")]
    OutOfBounds { file: String, range: TextRange },

    #[error("edit at {range} in '{file}' overlaps an earlier edit at {applied}")]
    Overlap {
        file: String,
        range: TextRange,
        applied: TextRange,
    },

    #[error("{0}")]
    Unsupported(String),
}

/// Result type alias for migration operations
pub type Result<T> = std::result::Result<T, MigrationError>;
