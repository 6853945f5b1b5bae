//! Common test utilities for codegraph-typemig
//!
//! Shared program fixtures and migration assertions for the integration
//! tests.

#![allow(dead_code)]

mod fixtures;
mod assertions;

pub use fixtures::*;
pub use assertions::*;
