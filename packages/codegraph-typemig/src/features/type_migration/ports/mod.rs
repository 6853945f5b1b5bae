//! Ports (Interfaces) for Type Migration
//!
//! The engine reaches the host through these traits:
//! - **ReferenceIndex / OverrideSearch**: read-only program queries
//! - **ConversionRule**: pluggable knowledge about type pairs
//! - **SyntaxEditor**: applies edits, atomically
//! - **ProgressIndicator / RenamePrompt**: cancellation and user decisions
//!
//! Default implementations live in `infrastructure`.

use crate::errors::EditError;
use crate::features::type_migration::domain::{
    ConversionDescriptor, DeclId, ExprId, GroupId, JType, MigrationScope, Program, StmtId,
};

// ============================================================================
// Program queries
// ============================================================================

/// Finds the expressions that refer to a declaration.
pub trait ReferenceIndex: Send + Sync {
    /// References and calls resolving to `decl` inside `scope`, in arena order.
    fn references_to(&self, decl: DeclId, scope: &MigrationScope) -> Vec<ExprId>;
}

/// Answers override questions for methods.
pub trait OverrideSearch: Send + Sync {
    /// Every method that overrides `method`, transitively.
    fn overriders_of(&self, method: DeclId) -> Vec<DeclId>;

    /// Every method `method` overrides, transitively.
    fn overridden_by(&self, method: DeclId) -> Vec<DeclId>;
}

// ============================================================================
// Conversion rules
// ============================================================================

/// What a rule knows about the place a conversion is requested for.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub program: &'a Program,
    /// Member the expression resolves to, if any.
    pub member: Option<DeclId>,
    pub expr: ExprId,
}

/// A source of conversions between two types.
///
/// # Example
/// ```ignore
/// struct ToStringRule;
///
/// impl ConversionRule for ToStringRule {
///     fn name(&self) -> &str { "to-string" }
///     fn find_conversion(&self, from: &JType, to: &JType, _ctx: &RuleContext<'_>) -> Option<ConversionDescriptor> {
///         (to == &JType::string()).then(|| ConversionDescriptor::template("String.valueOf($)"))
///     }
/// }
/// ```
pub trait ConversionRule: Send + Sync {
    fn name(&self) -> &str;

    /// A descriptor rewriting an expression of type `from` so it fits `to`.
    fn find_conversion(&self, from: &JType, to: &JType, ctx: &RuleContext<'_>) -> Option<ConversionDescriptor>;

    /// Whether a `null` flowing into a slot migrated from `from` to `to` needs rewriting.
    fn should_convert_null(&self, _from: &JType, _to: &JType, _ctx: &RuleContext<'_>) -> bool {
        false
    }

    /// Adjust the (formal, actual) pair used to infer a generic method's type
    /// parameters at `call`.
    fn bind_type_parameters(
        &self,
        _program: &Program,
        _formal: &JType,
        _actual: &JType,
        _method: DeclId,
        _call: ExprId,
    ) -> Option<(JType, JType)> {
        None
    }
}

// ============================================================================
// Editing
// ============================================================================

/// Where a type is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeSite {
    /// Type of a single-variable declaration, a parameter or a method return type.
    Decl(DeclId),
    /// Shared type of a multi-variable declaration.
    Group(GroupId),
    /// Type written after `new`.
    NewExpr(ExprId),
}

/// Applies edits to the program text.
///
/// Ranges are expressed against the original program; implementations
/// track how earlier edits moved them. Nothing is visible until `commit`.
pub trait SyntaxEditor {
    fn replace_type(&mut self, site: TypeSite, ty: &JType) -> Result<(), EditError>;

    fn replace_expression(&mut self, expr: ExprId, text: &str) -> Result<(), EditError>;

    /// Current text of `expr`, earlier edits inside it included.
    fn expression_text(&self, expr: ExprId) -> Result<String, EditError>;

    /// Rename a declaration and the given references to it.
    fn rename(&mut self, decl: DeclId, new_name: &str, references: &[ExprId]) -> Result<(), EditError>;

    /// Rewrite a multi-variable declaration as one declaration per variable.
    fn split_declaration(&mut self, group: GroupId, types: &[(DeclId, JType)]) -> Result<(), EditError>;

    fn replace_statement(&mut self, stmt: StmtId, text: &str) -> Result<(), EditError>;

    fn commit(&mut self) -> Result<(), EditError>;

    fn rollback(&mut self);
}

// ============================================================================
// User interaction
// ============================================================================

/// Progress reporting and cancellation.
pub trait ProgressIndicator {
    fn is_cancelled(&self) -> bool;

    /// Called once per dequeued root.
    fn report(&self, _dequeued: usize, _pending: usize) {}
}

/// Decides whether a getter whose naming convention broke gets renamed.
pub trait RenamePrompt {
    fn confirm_rename(&mut self, current: &str, suggested: &str) -> bool;
}
