//! Configuration files driving a migration

mod common;

use codegraph_typemig::config::ConfigError;
use codegraph_typemig::features::type_migration::domain::JType;
use codegraph_typemig::features::type_migration::infrastructure::{FixedRenameAnswer, NeverCancel};
use codegraph_typemig::{ElementRef, MigrationConfig, MigrationError, RenamePolicy, TypeMigrationProcessor};
use common::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(yaml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file
}

#[test]
fn test_rule_file_drives_conversion() {
    let file = write_config(
        r#"
version: 1
preset: permissive
rules:
  - kind: template
    from: Text
    to: String
    template: "$.toString()"
"#,
    );
    let config = MigrationConfig::from_yaml(file.path().to_str().unwrap()).unwrap();
    assert_eq!(config.rename_getters(), RenamePolicy::Always);

    let fixture = fixture_string_concat();
    let processor = TypeMigrationProcessor::new(&fixture.program, config).unwrap();
    let seed = processor.seed("Label.s", "Text").unwrap();
    let preview = processor.preview(&[seed], &NeverCancel).unwrap();
    assert_no_failures(&preview);
    assert_conversion_count(&preview, 1);
}

#[test]
fn test_allowed_roots_stop_propagation() {
    let file = write_config(
        r#"
version: 1
allowed_roots:
  - Chain.d
  - Chain.c
"#,
    );
    let config = MigrationConfig::from_yaml(file.path().to_str().unwrap()).unwrap();
    let fixture = fixture_assignment_chain();
    let program = &fixture.program;
    let [a, b, c, d] = fixture.fields;

    let processor = TypeMigrationProcessor::new(program, config).unwrap();
    let preview = processor.preview(&[(d, JType::string())], &NeverCancel).unwrap();

    assert_retyped(program, &preview, ElementRef::Decl(d), "String");
    assert_retyped(program, &preview, ElementRef::Decl(c), "String");
    assert_not_retyped(program, &preview, ElementRef::Decl(b));
    assert_not_retyped(program, &preview, ElementRef::Decl(a));
    // `b = (c = d)` now assigns a String to an int.
    assert!(preview.has_failures());
}

#[test]
fn test_dequeue_limit_aborts_runaway_migration() {
    let file = write_config(
        r#"
version: 1
preset: strict
overrides:
  max_dequeues: 1
"#,
    );
    let config = MigrationConfig::from_yaml(file.path().to_str().unwrap()).unwrap();
    let fixture = fixture_assignment_chain();
    let processor = TypeMigrationProcessor::new(&fixture.program, config).unwrap();
    let err = processor
        .apply(
            &[(fixture.fields[3], JType::string())],
            &NeverCancel,
            &mut FixedRenameAnswer(false),
        )
        .unwrap_err();
    assert!(matches!(err, MigrationError::InvariantViolation(_)));
}

#[test]
fn test_bad_rule_type_is_reported() {
    let file = write_config(
        r#"
version: 1
rules:
  - kind: member_rename
    from: "List<"
    to: Set
    member: get
    replacement: iterator
"#,
    );
    let result = MigrationConfig::from_yaml(file.path().to_str().unwrap());
    assert!(matches!(result, Err(ConfigError::InvalidRule { index: 0, .. })));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.yaml");
    let result = MigrationConfig::from_yaml(path.to_str().unwrap());
    assert!(matches!(result, Err(ConfigError::Io(_))));
}
