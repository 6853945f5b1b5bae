//! Custom assertions for migration results

use codegraph_typemig::features::type_migration::domain::Program;
use codegraph_typemig::{ElementRef, MigrationPreview, UsageKind};

/// Assert that the preview recorded no failures
pub fn assert_no_failures(preview: &MigrationPreview) {
    assert!(
        preview.failures.is_empty(),
        "Expected no failures, got: {:?}",
        preview.failures.iter().map(|f| &f.message).collect::<Vec<_>>()
    );
}

/// Assert the number of conversions the preview would insert
pub fn assert_conversion_count(preview: &MigrationPreview, expected: usize) {
    let actual = preview
        .usages
        .iter()
        .filter(|u| matches!(u.kind, UsageKind::Conversion(_)))
        .count();
    assert_eq!(
        actual, expected,
        "Expected {expected} conversions, got {actual}. Usages: {:?}",
        preview.usages
    );
}

/// Assert that `element` is retyped to `ty` (as written in source)
pub fn assert_retyped(program: &Program, preview: &MigrationPreview, element: ElementRef, ty: &str) {
    let found = preview.usages.iter().find_map(|u| match &u.kind {
        UsageKind::Declaration { ty, .. } if u.element == element => Some(ty.to_string()),
        _ => None,
    });
    assert_eq!(
        found.as_deref(),
        Some(ty),
        "Expected {} to be retyped to {ty}",
        program.describe(element)
    );
}

/// Assert that `element` keeps its declared type
pub fn assert_not_retyped(program: &Program, preview: &MigrationPreview, element: ElementRef) {
    assert!(
        !preview
            .usages
            .iter()
            .any(|u| u.element == element && matches!(u.kind, UsageKind::Declaration { .. })),
        "Expected {} to keep its type",
        program.describe(element)
    );
}

/// Assert that some failure message mentions `needle`
pub fn assert_failure_mentions(preview: &MigrationPreview, needle: &str) {
    assert!(
        preview.failures.iter().any(|f| f.message.contains(needle)),
        "Expected a failure mentioning '{needle}', got: {:?}",
        preview.failures.iter().map(|f| &f.message).collect::<Vec<_>>()
    );
}
