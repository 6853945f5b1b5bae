//! Checks run before a configuration is accepted
//!
//! Rules are validated one by one and reported with their position in the
//! `rules` list.

use super::error::{ConfigError, ConfigResult};
use super::io::RuleConfig;
use super::migration_config::MigrationConfig;
use crate::features::type_migration::domain::{parse_template, JType};

// ═══════════════════════════════════════════════════════════════════════════
// Validatable Trait
// ═══════════════════════════════════════════════════════════════════════════

/// A configuration fragment that can check itself.
pub trait Validatable {
    fn validate(&self) -> ConfigResult<()>;
}

// ═══════════════════════════════════════════════════════════════════════════
// Validators
// ═══════════════════════════════════════════════════════════════════════════

/// Upper bound accepted for `max_dequeues`
pub const MAX_DEQUEUES_LIMIT: usize = 10_000_000;

/// Parse a type written in configuration
pub fn parse_config_type(field: &str, value: &str) -> ConfigResult<JType> {
    JType::parse(value).map_err(|reason| ConfigError::InvalidType {
        field: field.to_string(),
        value: value.to_string(),
        reason,
    })
}

impl Validatable for RuleConfig {
    fn validate(&self) -> ConfigResult<()> {
        match self {
            RuleConfig::Template {
                from,
                to,
                template,
                result,
                ..
            } => {
                parse_config_type("from", from)?;
                parse_config_type("to", to)?;
                if let Some(result) = result {
                    parse_config_type("result", result)?;
                }
                if template.trim().is_empty() {
                    return Err(ConfigError::Validation("template must not be empty".to_string()));
                }
                parse_template(template).map_err(ConfigError::Validation)?;
            }
            RuleConfig::MemberRename {
                from,
                to,
                member,
                replacement,
            } => {
                parse_config_type("from", from)?;
                parse_config_type("to", to)?;
                if member.is_empty() || replacement.is_empty() {
                    return Err(ConfigError::Validation(
                        "member_rename needs both 'member' and 'replacement'".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Whole-configuration checks.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Check bounds, every rule and the allowed-roots list.
    pub fn validate(config: &MigrationConfig) -> ConfigResult<()> {
        if config.max_dequeues > MAX_DEQUEUES_LIMIT {
            return Err(ConfigError::Range {
                field: "max_dequeues".to_string(),
                value: config.max_dequeues.to_string(),
                min: "0".to_string(),
                max: MAX_DEQUEUES_LIMIT.to_string(),
                hint: "Use 0 for an unbounded worklist.".to_string(),
            });
        }
        for (index, rule) in config.rules.iter().enumerate() {
            rule.validate().map_err(|e| ConfigError::InvalidRule {
                index,
                reason: e.to_string(),
            })?;
        }
        if let Some(roots) = &config.allowed_roots {
            if let Some(bad) = roots.iter().find(|r| r.trim().is_empty()) {
                return Err(ConfigError::Validation(format!(
                    "allowed_roots contains an empty name ({bad:?})"
                )));
            }
        }
        Ok(())
    }

}

#[cfg(test)]
mod tests {
    use super::super::preset::Preset;
    use super::*;

    fn template_rule(template: &str) -> RuleConfig {
        RuleConfig::Template {
            from: "String".into(),
            to: "Text".into(),
            template: template.into(),
            member: None,
            result: None,
            convert_null: false,
        }
    }

    #[test]
    fn test_config_validator_presets() {
        for preset in [Preset::Strict, Preset::Balanced, Preset::Permissive] {
            assert!(ConfigValidator::validate(&MigrationConfig::preset(preset)).is_ok());
        }
    }

    #[test]
    fn test_max_dequeues_range() {
        let config = MigrationConfig::preset(Preset::Balanced).max_dequeues(MAX_DEQUEUES_LIMIT + 1);
        assert!(matches!(
            ConfigValidator::validate(&config),
            Err(ConfigError::Range { .. })
        ));
    }

    #[test]
    fn test_rule_validation() {
        assert!(template_rule("$.toString()").validate().is_ok());
        assert!(template_rule("  ").validate().is_err());
        assert!(template_rule("$bogus").validate().is_err());

        let bad_type = RuleConfig::MemberRename {
            from: "List<".into(),
            to: "Set".into(),
            member: "get".into(),
            replacement: "iterator".into(),
        };
        assert!(matches!(bad_type.validate(), Err(ConfigError::InvalidType { .. })));
    }

    #[test]
    fn test_invalid_rule_reports_index() {
        let config = MigrationConfig::preset(Preset::Balanced)
            .rule(template_rule("$.toString()"))
            .rule(template_rule(""));
        match ConfigValidator::validate(&config) {
            Err(ConfigError::InvalidRule { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected InvalidRule, got {other:?}"),
        }
    }
}
