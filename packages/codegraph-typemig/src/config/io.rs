//! Configuration I/O (YAML loading)
//!
//! Defines the YAML schema types. Loading and resolution live in
//! `migration_config.rs`.

use super::preset::RenamePolicy;
use serde::{Deserialize, Serialize};

/// YAML Schema v1
///
/// ```yaml
/// version: 1
/// preset: balanced
/// scope:
///   files: [Billing.java, Ledger.java]
/// allowed_roots: [Ledger.total]
/// overrides:
///   max_dequeues: 5000
///   rename_getters: never
/// rules:
///   - kind: template
///     from: String
///     to: Text
///     template: "$.toString()"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationConfigV1 {
    /// Schema version (always 1 for v1)
    pub version: u32,

    /// Base preset
    #[serde(default = "default_preset")]
    pub preset: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<ScopeConfig>,

    /// Qualified names of the only declarations allowed to become roots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_roots: Option<Vec<String>>,

    /// Fine-grained overrides of preset values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<MigrationOverrides>,

    /// Conversion rules registered after the built-in ones
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleConfig>,
}

fn default_preset() -> String {
    "balanced".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScopeConfig {
    /// Files the migration may edit; empty means the whole program
    #[serde(default)]
    pub files: Vec<String>,
}

/// Configuration overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_dequeues: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rename_getters: Option<RenamePolicy>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_declarations: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub eliminate_unused_locals: Option<bool>,
}

/// A conversion rule as written in YAML. Types are source text (`List<String>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum RuleConfig {
    Template {
        from: String,
        to: String,
        template: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        member: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<String>,
        #[serde(default)]
        convert_null: bool,
    },
    MemberRename {
        from: String,
        to: String,
        member: String,
        replacement: String,
    },
}
