//! Shared module - Common types and utilities
//!
//! Types shared across features. No feature-specific dependencies.

pub mod models;

pub use models::*;
