//! Migration results presented to callers
//!
//! The human-readable report mirrors what a review dialog shows: migrated
//! types, inserted conversions, retyped `new` expressions and failures.

use super::program::ElementRef;
use super::types::JType;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Counters collected while the labeler runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationStats {
    pub roots_accepted: usize,
    pub roots_rejected: usize,
    pub dequeued: usize,
    pub statements_visited: usize,
    pub conversions: usize,
    pub failures: usize,
}

/// One failure, resolved to text for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureMessage {
    pub element: ElementRef,
    pub owner_root: Option<ElementRef>,
    pub ty: JType,
    /// `Cannot convert type of expression <text> from <A> to <B>` and friends.
    pub message: String,
}

/// Sections of the text report, each a list of `(subject, detail)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub types: Vec<(String, String)>,
    pub conversions: Vec<(String, String)>,
    pub new_expressions: Vec<(String, String)>,
    pub failures: Vec<(String, String)>,
}

impl MigrationReport {
    pub fn render(&self) -> String {
        let mut out = String::new();
        section(&mut out, "Types", &self.types);
        section(&mut out, "Conversions", &self.conversions);
        section(&mut out, "New expression type changes", &self.new_expressions);
        section(&mut out, "Fails", &self.failures);
        out
    }
}

fn section(out: &mut String, title: &str, lines: &[(String, String)]) {
    if lines.is_empty() {
        return;
    }
    let _ = writeln!(out, "{title}:");
    for (subject, detail) in lines {
        let _ = writeln!(out, "{subject} -> {detail}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_skips_empty_sections() {
        let report = MigrationReport {
            types: vec![("Demo.count".into(), "long".into())],
            failures: vec![("x.size()".into(), "String".into())],
            ..Default::default()
        };
        assert_eq!(
            report.render(),
            "Types:\nDemo.count -> long\nFails:\nx.size() -> String\n"
        );
    }
}
