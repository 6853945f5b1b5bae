//! Migration configuration
//!
//! Two levels:
//! - Preset plus builder overrides from Rust
//! - YAML v1 files (see [`super::io::MigrationConfigV1`])

use super::error::{ConfigError, ConfigResult};
use super::io::{MigrationConfigV1, MigrationOverrides, RuleConfig, ScopeConfig};
use super::preset::{Preset, RenamePolicy};
use super::validation::ConfigValidator;
use crate::features::type_migration::domain::MigrationScope;

/// Settings for one migration run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationConfig {
    pub(crate) preset: Preset,
    pub(crate) scope_files: Vec<String>,
    pub(crate) allowed_roots: Option<Vec<String>>,
    pub(crate) eliminate_unused_locals: bool,
    pub(crate) split_declarations: bool,
    pub(crate) rename_getters: RenamePolicy,
    pub(crate) max_dequeues: usize,
    pub(crate) rules: Vec<RuleConfig>,
}

impl MigrationConfig {
    /// Create from preset
    pub fn preset(preset: Preset) -> Self {
        let defaults = preset.defaults();
        Self {
            preset,
            scope_files: Vec::new(),
            allowed_roots: None,
            eliminate_unused_locals: defaults.eliminate_unused_locals,
            split_declarations: defaults.split_declarations,
            rename_getters: defaults.rename_getters,
            max_dequeues: defaults.max_dequeues,
            rules: Vec::new(),
        }
    }

    /// Restrict edits to these files
    pub fn scope_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope_files = files.into_iter().map(Into::into).collect();
        self
    }

    /// Only these qualified names may become roots
    pub fn allowed_roots<I, S>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_roots = Some(roots.into_iter().map(Into::into).collect());
        self
    }

    pub fn eliminate_unused_locals(mut self, enabled: bool) -> Self {
        self.eliminate_unused_locals = enabled;
        self
    }

    pub fn split_declarations(mut self, enabled: bool) -> Self {
        self.split_declarations = enabled;
        self
    }

    pub fn rename_getters(mut self, policy: RenamePolicy) -> Self {
        self.rename_getters = policy;
        self
    }

    /// Bound on dequeued roots; 0 disables the bound
    pub fn max_dequeues(mut self, limit: usize) -> Self {
        self.max_dequeues = limit;
        self
    }

    /// Append a conversion rule
    pub fn rule(mut self, rule: RuleConfig) -> Self {
        self.rules.push(rule);
        self
    }

    /// Build and validate
    pub fn build(self) -> ConfigResult<ValidatedConfig> {
        ConfigValidator::validate(&self)?;
        Ok(ValidatedConfig(self))
    }

    pub fn get_preset(&self) -> Preset {
        self.preset
    }

    /// Load from YAML file (v1 schema)
    pub fn from_yaml(path: &str) -> ConfigResult<ValidatedConfig> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse YAML text (v1 schema)
    pub fn from_yaml_str(content: &str) -> ConfigResult<ValidatedConfig> {
        let raw: serde_yaml::Value = serde_yaml::from_str(content)?;
        if raw.get("version").is_none() {
            return Err(ConfigError::MissingVersion);
        }
        let export: MigrationConfigV1 = serde_yaml::from_value(raw)?;

        if export.version != 1 {
            return Err(ConfigError::UnsupportedVersion {
                found: export.version,
                supported: vec![1],
            });
        }

        let preset =
            Preset::from_str(&export.preset).map_err(|_| ConfigError::UnknownPreset(export.preset.clone()))?;
        let mut config = Self::preset(preset);

        if let Some(scope) = export.scope {
            config.scope_files = scope.files;
        }
        config.allowed_roots = export.allowed_roots;

        if let Some(overrides) = export.overrides {
            if let Some(limit) = overrides.max_dequeues {
                config.max_dequeues = limit;
            }
            if let Some(policy) = overrides.rename_getters {
                config.rename_getters = policy;
            }
            if let Some(split) = overrides.split_declarations {
                config.split_declarations = split;
            }
            if let Some(eliminate) = overrides.eliminate_unused_locals {
                config.eliminate_unused_locals = eliminate;
            }
        }
        config.rules = export.rules;

        config.build()
    }

    /// Export to YAML. Only values differing from the preset are written
    /// as overrides.
    pub fn to_yaml(&self) -> ConfigResult<String> {
        let defaults = self.preset.defaults();
        let overrides = MigrationOverrides {
            max_dequeues: (self.max_dequeues != defaults.max_dequeues).then_some(self.max_dequeues),
            rename_getters: (self.rename_getters != defaults.rename_getters).then_some(self.rename_getters),
            split_declarations: (self.split_declarations != defaults.split_declarations)
                .then_some(self.split_declarations),
            eliminate_unused_locals: (self.eliminate_unused_locals != defaults.eliminate_unused_locals)
                .then_some(self.eliminate_unused_locals),
        };
        let export = MigrationConfigV1 {
            version: 1,
            preset: self.preset.to_string(),
            scope: (!self.scope_files.is_empty()).then(|| ScopeConfig {
                files: self.scope_files.clone(),
            }),
            allowed_roots: self.allowed_roots.clone(),
            overrides: (overrides != MigrationOverrides::default()).then_some(overrides),
            rules: self.rules.clone(),
        };
        Ok(serde_yaml::to_string(&export)?)
    }

    /// Get a human-readable description of the configuration
    pub fn describe(&self) -> String {
        let bound = match self.max_dequeues {
            0 => "unbounded".to_string(),
            n => n.to_string(),
        };
        format!(
            "preset={} rules={} max_dequeues={} rename_getters={:?} split={} eliminate_locals={}",
            self.preset,
            self.rules.len(),
            bound,
            self.rename_getters,
            self.split_declarations,
            self.eliminate_unused_locals,
        )
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self::preset(Preset::default())
    }
}

/// Validated configuration (immutable, safe to use)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedConfig(MigrationConfig);

impl ValidatedConfig {
    pub fn into_inner(self) -> MigrationConfig {
        self.0
    }

    pub fn as_inner(&self) -> &MigrationConfig {
        &self.0
    }

    pub fn describe(&self) -> String {
        self.0.describe()
    }

    pub fn scope(&self) -> MigrationScope {
        if self.0.scope_files.is_empty() {
            MigrationScope::whole_program()
        } else {
            MigrationScope::files(self.0.scope_files.iter().cloned())
        }
    }

    pub fn allowed_roots(&self) -> Option<&[String]> {
        self.0.allowed_roots.as_deref()
    }

    pub fn eliminate_unused_locals(&self) -> bool {
        self.0.eliminate_unused_locals
    }

    pub fn split_declarations(&self) -> bool {
        self.0.split_declarations
    }

    pub fn rename_getters(&self) -> RenamePolicy {
        self.0.rename_getters
    }

    /// `None` when unbounded
    pub fn max_dequeues(&self) -> Option<usize> {
        (self.0.max_dequeues > 0).then_some(self.0.max_dequeues)
    }

    pub fn rules(&self) -> &[RuleConfig] {
        &self.0.rules
    }
}

impl Default for ValidatedConfig {
    fn default() -> Self {
        ValidatedConfig(MigrationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
version: 1
preset: strict
scope:
  files: [Billing.java]
allowed_roots: [Billing.total]
overrides:
  max_dequeues: 500
  rename_getters: always
rules:
  - kind: template
    from: String
    to: Text
    template: "Text.of($)"
    convert_null: true
  - kind: member_rename
    from: AtomicInteger
    to: AtomicLong
    member: get
    replacement: get
"#;

    #[test]
    fn test_yaml_loading() {
        let config = MigrationConfig::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(config.as_inner().get_preset(), Preset::Strict);
        assert_eq!(config.max_dequeues(), Some(500));
        assert_eq!(config.rename_getters(), RenamePolicy::Always);
        assert!(!config.split_declarations());
        assert_eq!(config.rules().len(), 2);
        assert!(config.scope().contains("Billing.java"));
        assert!(!config.scope().contains("Other.java"));
        assert_eq!(config.allowed_roots(), Some(&["Billing.total".to_string()][..]));
    }

    #[test]
    fn test_yaml_file_loading() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let path = file.path().to_str().unwrap();
        let config = MigrationConfig::from_yaml(path).unwrap();
        assert_eq!(config.max_dequeues(), Some(500));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let original = MigrationConfig::preset(Preset::Balanced)
            .max_dequeues(42)
            .split_declarations(false)
            .scope_files(["A.java"]);
        let yaml = original.to_yaml().unwrap();
        let loaded = MigrationConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(loaded.as_inner(), &original);
    }

    #[test]
    fn test_missing_version() {
        let result = MigrationConfig::from_yaml_str("preset: balanced\n");
        assert!(matches!(result, Err(ConfigError::MissingVersion)));
    }

    #[test]
    fn test_unsupported_version() {
        let result = MigrationConfig::from_yaml_str("version: 2\npreset: balanced\n");
        assert!(matches!(result, Err(ConfigError::UnsupportedVersion { found: 2, .. })));
    }

    #[test]
    fn test_unknown_preset_and_fields() {
        let result = MigrationConfig::from_yaml_str("version: 1\npreset: turbo\n");
        assert!(matches!(result, Err(ConfigError::UnknownPreset(_))));
        let result = MigrationConfig::from_yaml_str("version: 1\nturbo: true\n");
        assert!(matches!(result, Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_permissive_is_unbounded() {
        let config = MigrationConfig::preset(Preset::Permissive).build().unwrap();
        assert_eq!(config.max_dequeues(), None);
        assert!(config.describe().contains("max_dequeues=unbounded"));
    }
}
