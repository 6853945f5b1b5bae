//! Built-in conversion rules

use crate::features::type_migration::domain::typing::member_binding;
use crate::features::type_migration::domain::{ConversionDescriptor, JType};
use crate::features::type_migration::ports::{ConversionRule, RuleContext};

/// Accepts identical types and `null` flowing into a reference type.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityRule;

impl ConversionRule for IdentityRule {
    fn name(&self) -> &str {
        "identity"
    }

    fn find_conversion(&self, from: &JType, to: &JType, _ctx: &RuleContext<'_>) -> Option<ConversionDescriptor> {
        if from == to || (from.is_null() && to.is_reference()) {
            return Some(ConversionDescriptor::noop().with_result(to.clone()));
        }
        None
    }
}

/// A pattern matches a type exactly, or by class name when written raw.
fn type_matches(pattern: &JType, actual: &JType) -> bool {
    if pattern == actual {
        return true;
    }
    match (pattern, actual) {
        (JType::Class { name, args }, JType::Class { name: other, .. }) => args.is_empty() && name == other,
        _ => false,
    }
}

/// Rewrites expressions of one type into another through a text template.
///
/// ```ignore
/// let rule = TemplateRule::new(JType::string(), JType::class("Text"), "$.toString()");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateRule {
    from: JType,
    to: JType,
    member: Option<String>,
    template: String,
    result_type: Option<JType>,
    convert_null: bool,
}

impl TemplateRule {
    pub fn new(from: JType, to: JType, template: impl Into<String>) -> Self {
        Self {
            from,
            to,
            member: None,
            template: template.into(),
            result_type: None,
            convert_null: false,
        }
    }

    /// Only fire when the expression resolves to a member with this name.
    pub fn for_member(mut self, member: impl Into<String>) -> Self {
        self.member = Some(member.into());
        self
    }

    /// Type of the rewritten expression.
    pub fn with_result(mut self, ty: JType) -> Self {
        self.result_type = Some(ty);
        self
    }

    /// Also rewrite `null` literals flowing into migrated slots.
    pub fn converting_null(mut self) -> Self {
        self.convert_null = true;
        self
    }

    fn applies(&self, from: &JType, to: &JType) -> bool {
        type_matches(&self.from, from) && type_matches(&self.to, to)
    }
}

impl ConversionRule for TemplateRule {
    fn name(&self) -> &str {
        &self.template
    }

    fn find_conversion(&self, from: &JType, to: &JType, ctx: &RuleContext<'_>) -> Option<ConversionDescriptor> {
        if !self.applies(from, to) {
            return None;
        }
        if let Some(wanted) = &self.member {
            let member = ctx.member?;
            if &ctx.program.decl(member).name != wanted {
                return None;
            }
        }
        let descriptor = ConversionDescriptor::template(self.template.clone());
        Some(match &self.result_type {
            Some(ty) => descriptor.with_result(ty.clone()),
            None => descriptor,
        })
    }

    fn should_convert_null(&self, from: &JType, to: &JType, _ctx: &RuleContext<'_>) -> bool {
        self.convert_null && self.applies(from, to)
    }
}

/// Redirects a member access to a differently named member of the new type
/// (`count.incrementAndGet()` on `AtomicInteger` -> `LongAdder.increment()`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRenameRule {
    from_class: String,
    to_class: String,
    member: String,
    replacement: String,
}

impl MemberRenameRule {
    pub fn new(
        from_class: impl Into<String>,
        to_class: impl Into<String>,
        member: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        Self {
            from_class: from_class.into(),
            to_class: to_class.into(),
            member: member.into(),
            replacement: replacement.into(),
        }
    }
}

impl ConversionRule for MemberRenameRule {
    fn name(&self) -> &str {
        &self.member
    }

    fn find_conversion(&self, from: &JType, to: &JType, ctx: &RuleContext<'_>) -> Option<ConversionDescriptor> {
        if from.class_name() != Some(self.from_class.as_str()) || to.class_name() != Some(self.to_class.as_str()) {
            return None;
        }
        let member = ctx.program.decl(ctx.member?);
        if member.name != self.member {
            return None;
        }
        let arity = member.params().len();
        let target = ctx
            .program
            .find_method(&self.to_class, &self.replacement, arity)
            .or_else(|| ctx.program.find_field(&self.to_class, &self.replacement))?;
        let result = ctx
            .program
            .decl(target)
            .ty
            .substitute(&member_binding(ctx.program, to, target));
        Some(ConversionDescriptor::retarget(target, self.replacement.clone()).with_result(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::type_migration::domain::{ExprId, ProgramBuilder, Replacement};

    #[test]
    fn test_identity_rule() {
        let program = ProgramBuilder::new().finish().unwrap();
        let ctx = RuleContext {
            program: &program,
            member: None,
            expr: ExprId(0),
        };
        assert!(IdentityRule.find_conversion(&JType::int(), &JType::int(), &ctx).is_some());
        assert!(IdentityRule.find_conversion(&JType::Null, &JType::string(), &ctx).is_some());
        assert!(IdentityRule.find_conversion(&JType::Null, &JType::int(), &ctx).is_none());
        assert!(IdentityRule.find_conversion(&JType::int(), &JType::long(), &ctx).is_none());
    }

    #[test]
    fn test_template_rule_matches_raw_pattern() {
        let program = ProgramBuilder::new().finish().unwrap();
        let ctx = RuleContext {
            program: &program,
            member: None,
            expr: ExprId(0),
        };
        let rule = TemplateRule::new(JType::class("List"), JType::class("Set"), "new HashSet<>($)");
        let from = JType::generic("List", vec![JType::string()]);
        let to = JType::generic("Set", vec![JType::string()]);
        let found = rule.find_conversion(&from, &to, &ctx).unwrap();
        assert_eq!(found.replacement, Replacement::Template("new HashSet<>($)".into()));
        assert!(rule.find_conversion(&to, &from, &ctx).is_none());
    }

    #[test]
    fn test_template_rule_member_filter() {
        let b = ProgramBuilder::new();
        let length = b.find_method("String", "length", 0).unwrap();
        let trim = b.find_method("String", "trim", 0).unwrap();
        let program = b.finish().unwrap();
        let rule = TemplateRule::new(JType::string(), JType::class("Text"), "$q.size()")
            .for_member("length")
            .with_result(JType::int());
        let on_length = RuleContext {
            program: &program,
            member: Some(length),
            expr: ExprId(0),
        };
        let on_trim = RuleContext {
            member: Some(trim),
            ..on_length
        };
        let found = rule
            .find_conversion(&JType::string(), &JType::class("Text"), &on_length)
            .unwrap();
        assert_eq!(found.result_type, Some(JType::int()));
        assert!(rule.find_conversion(&JType::string(), &JType::class("Text"), &on_trim).is_none());
    }

    #[test]
    fn test_member_rename_rule_finds_target() {
        let b = ProgramBuilder::new();
        let increment = b.find_method("AtomicInteger", "incrementAndGet", 0).unwrap();
        let program = b.finish().unwrap();
        let ctx = RuleContext {
            program: &program,
            member: Some(increment),
            expr: ExprId(0),
        };
        let rule = MemberRenameRule::new("AtomicInteger", "AtomicLong", "incrementAndGet", "incrementAndGet");
        let found = rule
            .find_conversion(&JType::class("AtomicInteger"), &JType::class("AtomicLong"), &ctx)
            .unwrap();
        assert_eq!(found.result_type, Some(JType::long()));
        assert!(matches!(found.replacement, Replacement::Retarget { .. }));
    }
}
