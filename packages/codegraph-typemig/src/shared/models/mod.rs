//! Shared models

mod span;

pub use span::TextRange;
