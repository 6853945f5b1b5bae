//! End-to-end: seed, label, order and rewrite the sources

mod common;

use codegraph_typemig::features::type_migration::domain::{JType, ProgramBuilder};
use codegraph_typemig::features::type_migration::infrastructure::{FixedRenameAnswer, NeverCancel};
use codegraph_typemig::{MigrationConfig, MigrationError, Preset, TypeMigrationProcessor, ValidatedConfig};
use common::*;
use pretty_assertions::assert_eq;

const TEXT_RULE_YAML: &str = r#"
version: 1
preset: balanced
rules:
  - kind: template
    from: Text
    to: String
    template: "$.toString()"
"#;

#[test]
fn test_widening_rewrites_field_and_return() {
    let program = fixture_counter();
    let processor = TypeMigrationProcessor::new(&program, ValidatedConfig::default()).unwrap();
    let seed = processor.seed("Counter.count", "long").unwrap();
    let outcome = processor
        .apply(&[seed], &NeverCancel, &mut FixedRenameAnswer(false))
        .unwrap();

    assert_no_failures(&outcome.preview);
    assert!(outcome.edit_failures.is_empty());
    let text = &outcome.sources["Counter.java"];
    assert!(text.contains("long count;"), "{text}");
    assert!(text.contains("long next()"), "{text}");
    assert!(text.contains("return count + 1;"), "{text}");
}

#[test]
fn test_configured_rule_wraps_operand() {
    let fixture = fixture_string_concat();
    let config = MigrationConfig::from_yaml_str(TEXT_RULE_YAML).unwrap();
    let processor = TypeMigrationProcessor::new(&fixture.program, config).unwrap();
    let seed = processor.seed("Label.s", "Text").unwrap();
    let outcome = processor
        .apply(&[seed], &NeverCancel, &mut FixedRenameAnswer(false))
        .unwrap();

    assert_no_failures(&outcome.preview);
    let text = &outcome.sources["Label.java"];
    assert!(text.contains("Text s;"), "{text}");
    assert!(text.contains("String r = s.toString() + 1;"), "{text}");
}

#[test]
fn test_override_family_rewrites_every_file() {
    let fixture = fixture_override_family();
    let processor = TypeMigrationProcessor::new(&fixture.program, ValidatedConfig::default()).unwrap();
    let outcome = processor
        .apply(
            &[(fixture.base, JType::long())],
            &NeverCancel,
            &mut FixedRenameAnswer(false),
        )
        .unwrap();

    // Every returned int widens to long, so only the signatures change.
    assert_no_failures(&outcome.preview);
    assert!(outcome.sources["Base.java"].contains("long value()"));
    for file in ["Impl1.java", "Impl2.java"] {
        let text = &outcome.sources[file];
        assert!(text.contains("int count;"), "{text}");
        assert!(text.contains("long value()"), "{text}");
    }
    assert!(outcome.sources["Impl3.java"].contains("return 42;"));
}

#[test]
fn test_applied_edits_are_deterministic() {
    let fixture = fixture_override_family();
    let processor = TypeMigrationProcessor::new(&fixture.program, ValidatedConfig::default()).unwrap();
    let run = || {
        processor
            .apply(
                &[(fixture.base, JType::long())],
                &NeverCancel,
                &mut FixedRenameAnswer(false),
            )
            .unwrap()
    };
    let first = run();
    let second = run();
    assert_eq!(first.edits, second.edits);
    assert_eq!(first.sources, second.sources);
}

#[test]
fn test_split_declaration_keeps_sibling_type() {
    let mut b = ProgramBuilder::new();
    b.file("Pair.java").class("Pair");
    let vars = b.fields(JType::int(), &[("left", None), ("right", None)]);
    b.end_class();
    let program = b.finish().unwrap();

    let processor = TypeMigrationProcessor::new(&program, ValidatedConfig::default()).unwrap();
    let outcome = processor
        .apply(
            &[(vars[1], JType::long())],
            &NeverCancel,
            &mut FixedRenameAnswer(false),
        )
        .unwrap();
    let text = &outcome.sources["Pair.java"];
    assert!(text.contains("int left;"), "{text}");
    assert!(text.contains("long right;"), "{text}");

    let strict = MigrationConfig::preset(Preset::Strict).build().unwrap();
    let processor = TypeMigrationProcessor::new(&program, strict).unwrap();
    let outcome = processor
        .apply(
            &[(vars[1], JType::long())],
            &NeverCancel,
            &mut FixedRenameAnswer(false),
        )
        .unwrap();
    assert_eq!(outcome.edit_failures.len(), 1);
    assert_eq!(outcome.sources["Pair.java"], program.source("Pair.java").unwrap());
}

#[test]
fn test_seed_outside_scope_is_rejected() {
    let program = fixture_counter();
    let config = MigrationConfig::preset(Preset::Balanced)
        .scope_files(["Other.java"])
        .build()
        .unwrap();
    let processor = TypeMigrationProcessor::new(&program, config).unwrap();
    let seed = processor.seed("Counter.count", "long").unwrap();
    let err = processor
        .apply(&[seed], &NeverCancel, &mut FixedRenameAnswer(false))
        .unwrap_err();
    assert!(matches!(err, MigrationError::InvalidRoot(_)));
}

#[test]
fn test_program_snapshot_round_trip_migrates_the_same() {
    let program = fixture_counter();
    let restored = codegraph_typemig::Program::from_json(&program.to_json().unwrap()).unwrap();

    let count = program.find_decl("Counter.count").unwrap();
    assert_eq!(restored.find_decl("Counter.count"), Some(count));
    let before = preview_default(&program, count, JType::long());
    let after = preview_default(&restored, count, JType::long());
    assert_eq!(before.usages, after.usages);
}
