//! Ordered conversion rule registry
//!
//! Rules are consulted in registration order; the first descriptor wins.
//! The registry holds no per-lookup state.

use super::builtin_rules::{IdentityRule, MemberRenameRule, TemplateRule};
use crate::config::{parse_config_type, ConfigError, ConfigResult, RuleConfig};
use crate::features::type_migration::domain::typing::TypeParamBinder;
use crate::features::type_migration::domain::{ConversionDescriptor, DeclId, ExprId, JType, Program};
use crate::features::type_migration::ports::{ConversionRule, RuleContext};
use std::fmt;

#[derive(Default)]
pub struct RuleRegistry {
    rules: Vec<Box<dyn ConversionRule>>,
}

impl RuleRegistry {
    /// Registry without any rule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the identity rule.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(IdentityRule);
        registry
    }

    pub fn register(&mut self, rule: impl ConversionRule + 'static) -> &mut Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Defaults followed by the configured rules, in declaration order.
    pub fn from_rule_configs(configs: &[RuleConfig]) -> ConfigResult<Self> {
        let mut registry = Self::with_defaults();
        for (index, config) in configs.iter().enumerate() {
            match config {
                RuleConfig::Template {
                    from,
                    to,
                    template,
                    member,
                    result,
                    convert_null,
                } => {
                    let mut rule =
                        TemplateRule::new(parse_config_type("from", from)?, parse_config_type("to", to)?, template.clone());
                    if let Some(member) = member {
                        rule = rule.for_member(member.clone());
                    }
                    if let Some(result) = result {
                        rule = rule.with_result(parse_config_type("result", result)?);
                    }
                    if *convert_null {
                        rule = rule.converting_null();
                    }
                    registry.register(rule);
                }
                RuleConfig::MemberRename {
                    from,
                    to,
                    member,
                    replacement,
                } => {
                    let class_of = |field: &str, text: &str| -> ConfigResult<String> {
                        let ty = parse_config_type(field, text)?;
                        ty.class_name().map(str::to_string).ok_or_else(|| ConfigError::InvalidRule {
                            index,
                            reason: format!("'{field}' must name a class, got '{text}'"),
                        })
                    };
                    registry.register(MemberRenameRule::new(
                        class_of("from", from)?,
                        class_of("to", to)?,
                        member.clone(),
                        replacement.clone(),
                    ));
                }
            }
        }
        Ok(registry)
    }

    /// First descriptor any rule supplies for `from` -> `to`.
    pub fn find(&self, from: &JType, to: &JType, ctx: &RuleContext<'_>) -> Option<ConversionDescriptor> {
        self.rules.iter().find_map(|rule| rule.find_conversion(from, to, ctx))
    }

    /// Like [`find`](Self::find), but accepts the pair as a no-op when
    /// assignability already holds in the required direction. A covariant
    /// position reads the value (`to` must accept `from`, a variadic `to`
    /// accepts its element type); otherwise the value is written into a
    /// slot of type `from`.
    pub fn find_or_fallback(
        &self,
        from: &JType,
        to: &JType,
        ctx: &RuleContext<'_>,
        covariant: bool,
    ) -> Option<ConversionDescriptor> {
        if let Some(found) = self.find(from, to, ctx) {
            return Some(found);
        }
        let classes = ctx.program.classes();
        let holds = if covariant {
            match to {
                JType::Varargs(component) if classes.is_assignable(component, from) => true,
                _ => classes.is_assignable(to, from),
            }
        } else {
            classes.is_assignable(from, to)
        };
        holds.then(|| ConversionDescriptor::noop().with_result(to.clone()))
    }

    /// True when some rule wants `null` rewritten for this pair.
    pub fn should_convert_null(&self, from: &JType, to: &JType, ctx: &RuleContext<'_>) -> bool {
        self.rules.iter().any(|rule| rule.should_convert_null(from, to, ctx))
    }
}

impl TypeParamBinder for RuleRegistry {
    fn bind_type_parameters(
        &self,
        program: &Program,
        formal: &JType,
        actual: &JType,
        method: DeclId,
        call: ExprId,
    ) -> Option<(JType, JType)> {
        self.rules
            .iter()
            .find_map(|rule| rule.bind_type_parameters(program, formal, actual, method, call))
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry").field("rules", &self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::type_migration::domain::{ProgramBuilder, Replacement};

    fn context(program: &Program) -> RuleContext<'_> {
        RuleContext {
            program,
            member: None,
            expr: ExprId(0),
        }
    }

    #[test]
    fn test_first_rule_wins() {
        let program = ProgramBuilder::new().finish().unwrap();
        let mut registry = RuleRegistry::with_defaults();
        registry
            .register(TemplateRule::new(JType::string(), JType::class("Text"), "Text.of($)"))
            .register(TemplateRule::new(JType::string(), JType::class("Text"), "new Text($)"));
        let found = registry
            .find(&JType::string(), &JType::class("Text"), &context(&program))
            .unwrap();
        assert_eq!(found.replacement, Replacement::Template("Text.of($)".into()));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_fallback_directions() {
        let program = ProgramBuilder::new().finish().unwrap();
        let registry = RuleRegistry::with_defaults();
        let ctx = context(&program);

        // int read where long is expected: widening
        assert!(registry.find_or_fallback(&JType::int(), &JType::long(), &ctx, true).is_some());
        assert!(registry.find_or_fallback(&JType::long(), &JType::int(), &ctx, true).is_none());
        // long slot receiving an int
        assert!(registry.find_or_fallback(&JType::long(), &JType::int(), &ctx, false).is_some());
        // variadic tail
        let tail = JType::varargs(JType::object());
        assert!(registry.find_or_fallback(&JType::string(), &tail, &ctx, true).is_some());
    }

    #[test]
    fn test_from_rule_configs() {
        let configs = vec![
            RuleConfig::Template {
                from: "String".into(),
                to: "Text".into(),
                template: "Text.of($)".into(),
                member: None,
                result: None,
                convert_null: true,
            },
            RuleConfig::MemberRename {
                from: "AtomicInteger".into(),
                to: "AtomicLong".into(),
                member: "get".into(),
                replacement: "get".into(),
            },
        ];
        let registry = RuleRegistry::from_rule_configs(&configs).unwrap();
        assert_eq!(registry.names(), vec!["identity", "Text.of($)", "get"]);

        let program = ProgramBuilder::new().finish().unwrap();
        assert!(registry.should_convert_null(&JType::string(), &JType::class("Text"), &context(&program)));
    }

    #[test]
    fn test_member_rename_needs_class_types() {
        let configs = vec![RuleConfig::MemberRename {
            from: "int".into(),
            to: "AtomicLong".into(),
            member: "get".into(),
            replacement: "get".into(),
        }];
        assert!(matches!(
            RuleRegistry::from_rule_configs(&configs),
            Err(ConfigError::InvalidRule { index: 0, .. })
        ));
    }
}
