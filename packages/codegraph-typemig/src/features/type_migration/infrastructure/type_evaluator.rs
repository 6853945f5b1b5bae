//! Type state store
//!
//! Records the types the migration assigns to declarations and expressions
//! and evaluates expressions under those assignments.
//!
//! A declaration accepts exactly one assignment: a second one, even with the
//! same type, reports "already processed". That single rule is what makes the
//! worklist terminate. Expressions may be reassigned; the latest wins.

use crate::features::type_migration::domain::typing::{self, TypeEnv, TypeParamBinder};
use crate::features::type_migration::domain::{ConversionDescriptor, DeclId, ElementRef, ExprId, JType, Program};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use std::fmt::Write as _;

#[derive(Debug, Default, Clone)]
pub struct TypeEvaluator {
    types: FxHashMap<ElementRef, Vec<JType>>,
    /// Declarations in the order they were first migrated.
    migrated: IndexMap<DeclId, JType>,
}

impl TypeEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `ty` for `usage`. Returns `false` when a declaration already
    /// holds a type.
    pub fn assign(&mut self, usage: ElementRef, ty: JType) -> bool {
        let stack = self.types.entry(usage).or_default();
        match usage {
            ElementRef::Decl(id) => {
                if !stack.is_empty() {
                    return false;
                }
                stack.push(ty.clone());
                self.migrated.insert(id, ty);
                true
            }
            ElementRef::Expr(_) => {
                if stack.last() != Some(&ty) {
                    stack.push(ty);
                }
                true
            }
        }
    }

    /// Most recent type recorded for `usage`, if any.
    pub fn recorded(&self, usage: ElementRef) -> Option<&JType> {
        self.types.get(&usage).and_then(|s| s.last())
    }

    /// Every type recorded for `usage`, oldest first.
    pub fn history(&self, usage: ElementRef) -> &[JType] {
        self.types.get(&usage).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_migrated(&self, decl: DeclId) -> bool {
        self.migrated.contains_key(&decl)
    }

    /// Migrated type of a declaration, or its declared type.
    pub fn current_decl_type(&self, program: &Program, decl: DeclId) -> JType {
        self.migrated
            .get(&decl)
            .cloned()
            .unwrap_or_else(|| program.decl(decl).ty.clone())
    }

    pub fn migrated_declarations(&self) -> impl Iterator<Item = (DeclId, &JType)> {
        self.migrated.iter().map(|(id, ty)| (*id, ty))
    }

    /// Type of `expr` under the current assignments.
    pub fn evaluate(
        &self,
        program: &Program,
        conversions: &IndexMap<ExprId, ConversionDescriptor>,
        binder: Option<&dyn TypeParamBinder>,
        expr: ExprId,
    ) -> Option<JType> {
        let view = MigratedView {
            program,
            evaluator: self,
            conversions,
        };
        typing::evaluate(program, &view, binder, expr)
    }

    /// Type-parameter binding of `call` under the current assignments.
    pub fn call_substitution(
        &self,
        program: &Program,
        conversions: &IndexMap<ExprId, ConversionDescriptor>,
        binder: Option<&dyn TypeParamBinder>,
        call: ExprId,
    ) -> FxHashMap<String, JType> {
        let view = MigratedView {
            program,
            evaluator: self,
            conversions,
        };
        typing::call_substitution(program, &view, binder, call)
    }

    /// Debug dump: one `element -> type` line per recorded element.
    pub fn report(&self, program: &Program) -> String {
        let mut lines: Vec<(String, String)> = self
            .types
            .iter()
            .filter_map(|(usage, stack)| {
                let ty = stack.last()?;
                Some((program.describe(*usage), ty.to_string()))
            })
            .collect();
        lines.sort();
        let mut out = String::new();
        for (element, ty) in lines {
            let _ = writeln!(out, "{element} -> {ty}");
        }
        out
    }
}

/// The program as the migration currently sees it.
struct MigratedView<'a> {
    program: &'a Program,
    evaluator: &'a TypeEvaluator,
    conversions: &'a IndexMap<ExprId, ConversionDescriptor>,
}

impl TypeEnv for MigratedView<'_> {
    fn declared_type(&self, decl: DeclId) -> JType {
        self.evaluator.current_decl_type(self.program, decl)
    }

    fn expression_type(&self, expr: ExprId) -> Option<JType> {
        if let Some(ty) = self.evaluator.recorded(ElementRef::Expr(expr)) {
            return Some(ty.clone());
        }
        self.conversions.get(&expr).and_then(|c| c.result_type.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::type_migration::domain::{BinaryOp, ProgramBuilder};

    #[test]
    fn test_declaration_accepts_one_assignment() {
        let mut evaluator = TypeEvaluator::new();
        let usage = ElementRef::Decl(DeclId(7));
        assert!(evaluator.assign(usage, JType::long()));
        assert!(!evaluator.assign(usage, JType::long()));
        assert!(!evaluator.assign(usage, JType::string()));
        assert_eq!(evaluator.recorded(usage), Some(&JType::long()));
    }

    #[test]
    fn test_expression_reassignment_keeps_history() {
        let mut evaluator = TypeEvaluator::new();
        let usage = ElementRef::Expr(ExprId(3));
        assert!(evaluator.assign(usage, JType::int()));
        assert!(evaluator.assign(usage, JType::int()));
        assert!(evaluator.assign(usage, JType::long()));
        assert_eq!(evaluator.history(usage), &[JType::int(), JType::long()]);
    }

    #[test]
    fn test_evaluate_sees_migrated_declarations() {
        let mut b = ProgramBuilder::new();
        b.file("A.java").class("A");
        let x = b.field("x", JType::int(), None);
        b.method("f", JType::void(), &[]);
        let read = b.var(x);
        let one = b.int(1);
        let sum = b.binary(BinaryOp::Add, read, one);
        b.expr_stmt(sum);
        b.end_method().end_class();
        let program = b.finish().unwrap();

        let mut evaluator = TypeEvaluator::new();
        let none = IndexMap::new();
        assert_eq!(evaluator.evaluate(&program, &none, None, sum), Some(JType::int()));
        evaluator.assign(ElementRef::Decl(x), JType::long());
        assert_eq!(evaluator.evaluate(&program, &none, None, sum), Some(JType::long()));
        assert_eq!(program.static_type(sum), Some(JType::int()));
        assert!(evaluator.report(&program).contains("A.x -> long"));
    }
}
