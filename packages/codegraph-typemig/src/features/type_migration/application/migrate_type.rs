//! Type Migration UseCase
//!
//! Entry point for callers: resolves names, runs the labeler for a preview
//! and, on request, applies the edits.
//!
//! # Architecture
//! ```text
//! CLI / host
//!      ↓
//! TypeMigrationProcessor (this module)
//!      ↓
//! TypeMigrationLabeler → sort_usages → MigrationProducer
//!      ↓
//! ProgramIndex, RuleRegistry, SourceEditor (infrastructure)
//! ```

use super::labeler::{failure_message, LabelerSettings, TypeMigrationLabeler};
use super::migration_producer::{MigrationProducer, ProducerReport, ProducerSettings};
use crate::config::{parse_config_type, ValidatedConfig};
use crate::errors::{MigrationError, Result};
use crate::features::type_migration::domain::{
    DeclId, FailureMessage, JType, MigrationReport, MigrationStats, Program, UsageInfo,
};
use crate::features::type_migration::infrastructure::{EditRecord, ProgramIndex, RuleRegistry, SourceEditor};
use crate::features::type_migration::ports::{ConversionRule, ProgressIndicator, RenamePrompt};
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use serde::Serialize;
use tracing::{debug, info};

/// What a migration would do, before anything is edited.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationPreview {
    /// Every edit, in application order.
    pub usages: Vec<UsageInfo>,
    pub failures: Vec<FailureMessage>,
    pub report: MigrationReport,
    pub stats: MigrationStats,
}

impl MigrationPreview {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Result of an applied migration.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationOutcome {
    pub preview: MigrationPreview,
    /// Rewritten text of every file.
    pub sources: IndexMap<String, String>,
    pub edits: Vec<EditRecord>,
    pub producer: ProducerReport,
    /// Failures found while editing (declarations that could not be split).
    pub edit_failures: Vec<FailureMessage>,
}

pub struct TypeMigrationProcessor<'a> {
    program: &'a Program,
    config: ValidatedConfig,
    index: ProgramIndex,
    rules: RuleRegistry,
}

impl<'a> TypeMigrationProcessor<'a> {
    /// Index `program` and load the rules named by `config`.
    pub fn new(program: &'a Program, config: ValidatedConfig) -> Result<Self> {
        let rules = RuleRegistry::from_rule_configs(config.rules())?;
        debug!(config = %config.describe(), rules = rules.len(), "migration processor ready");
        Ok(Self {
            program,
            index: ProgramIndex::build(program),
            config,
            rules,
        })
    }

    /// Register a rule after the configured ones.
    pub fn with_rule(mut self, rule: impl ConversionRule + 'static) -> Self {
        self.rules.register(rule);
        self
    }

    pub fn program(&self) -> &'a Program {
        self.program
    }

    pub fn config(&self) -> &ValidatedConfig {
        &self.config
    }

    /// Declaration named `Class.member`, `Class.method.param` or `Class.method.local`.
    pub fn resolve(&self, qualified: &str) -> Result<DeclId> {
        self.program
            .find_decl(qualified)
            .ok_or_else(|| MigrationError::UnknownElement(qualified.to_string()))
    }

    /// Resolve a seed written as text.
    pub fn seed(&self, element: &str, ty: &str) -> Result<(DeclId, JType)> {
        Ok((self.resolve(element)?, parse_config_type("type", ty)?))
    }

    fn labeler_settings(&self) -> Result<LabelerSettings> {
        let allowed_roots = match self.config.allowed_roots() {
            Some(names) => Some(
                names
                    .iter()
                    .map(|name| self.resolve(name))
                    .collect::<Result<FxHashSet<DeclId>>>()?,
            ),
            None => None,
        };
        Ok(LabelerSettings {
            scope: self.config.scope(),
            allowed_roots,
            max_dequeues: self.config.max_dequeues(),
            eliminate_unused_locals: self.config.eliminate_unused_locals(),
        })
    }

    fn label(&self, seeds: &[(DeclId, JType)], progress: &dyn ProgressIndicator) -> Result<MigrationPreview> {
        let mut labeler = TypeMigrationLabeler::new(
            self.program,
            &self.index,
            &self.index,
            &self.rules,
            self.labeler_settings()?,
        );
        labeler.migrate(seeds, progress)?;
        Ok(MigrationPreview {
            usages: labeler.migrated_usages(),
            failures: labeler.failure_messages(),
            report: labeler.migration_report(),
            stats: labeler.stats(),
        })
    }

    /// Compute the migration without editing anything.
    pub fn preview(&self, seeds: &[(DeclId, JType)], progress: &dyn ProgressIndicator) -> Result<MigrationPreview> {
        let preview = self.label(seeds, progress)?;
        info!(
            usages = preview.usages.len(),
            failures = preview.failures.len(),
            "migration preview ready"
        );
        Ok(preview)
    }

    /// Compute the migration and apply it as one batch. Failures found while
    /// labeling do not stop the edits; they are reported alongside.
    pub fn apply(
        &self,
        seeds: &[(DeclId, JType)],
        progress: &dyn ProgressIndicator,
        prompt: &mut dyn RenamePrompt,
    ) -> Result<MigrationOutcome> {
        let preview = self.label(seeds, progress)?;
        let settings = ProducerSettings {
            scope: self.config.scope(),
            split_declarations: self.config.split_declarations(),
            rename_getters: self.config.rename_getters(),
        };
        let mut editor = SourceEditor::new(self.program);
        let producer = MigrationProducer::new(self.program, &self.index, &mut editor, prompt, settings)
            .produce(&preview.usages)?;
        let edit_failures = producer
            .failures
            .iter()
            .map(|record| failure_message(self.program, record))
            .collect();
        let edits = editor.edits().to_vec();
        Ok(MigrationOutcome {
            preview,
            sources: editor.into_sources(),
            edits,
            producer,
            edit_failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MigrationConfig, Preset, RuleConfig};
    use crate::features::type_migration::domain::{BinaryOp, ProgramBuilder};
    use crate::features::type_migration::infrastructure::{FixedRenameAnswer, NeverCancel};

    fn counter_program() -> Program {
        let mut b = ProgramBuilder::new();
        b.file("Counter.java").class("Counter");
        let count = b.field("count", JType::int(), None);
        b.method("next", JType::int(), &[]);
        let read = b.var(count);
        let one = b.int(1);
        let sum = b.binary(BinaryOp::Add, read, one);
        b.ret(Some(sum));
        b.end_method().end_class();
        b.finish().unwrap()
    }

    #[test]
    fn test_resolve_unknown_name() {
        let program = counter_program();
        let processor = TypeMigrationProcessor::new(&program, ValidatedConfig::default()).unwrap();
        assert!(processor.resolve("Counter.count").is_ok());
        assert!(matches!(
            processor.resolve("Counter.missing"),
            Err(MigrationError::UnknownElement(_))
        ));
        assert!(matches!(
            processor.seed("Counter.count", "List<"),
            Err(MigrationError::Config(_))
        ));
    }

    #[test]
    fn test_apply_widening_through_return() {
        let program = counter_program();
        let processor = TypeMigrationProcessor::new(&program, ValidatedConfig::default()).unwrap();
        let seed = processor.seed("Counter.count", "long").unwrap();
        let outcome = processor
            .apply(&[seed], &NeverCancel, &mut FixedRenameAnswer(false))
            .unwrap();

        assert!(!outcome.preview.has_failures());
        let text = &outcome.sources["Counter.java"];
        assert!(text.contains("long count;"));
        assert!(text.contains("long next()"));
    }

    #[test]
    fn test_configured_rules_are_registered() {
        let program = counter_program();
        let config = MigrationConfig::preset(Preset::Balanced)
            .rule(RuleConfig::Template {
                from: "String".into(),
                to: "int".into(),
                template: "Integer.parseInt($)".into(),
                member: None,
                result: Some("int".into()),
                convert_null: false,
            })
            .build()
            .unwrap();
        let processor = TypeMigrationProcessor::new(&program, config).unwrap();
        assert!(processor.rules.len() >= 2);
    }

    #[test]
    fn test_allowed_roots_must_resolve() {
        let program = counter_program();
        let config = MigrationConfig::preset(Preset::Balanced)
            .allowed_roots(["Counter.nothing"])
            .build()
            .unwrap();
        let processor = TypeMigrationProcessor::new(&program, config).unwrap();
        let seed = processor.seed("Counter.count", "long").unwrap();
        assert!(matches!(
            processor.preview(&[seed], &NeverCancel),
            Err(MigrationError::UnknownElement(_))
        ));
    }
}
