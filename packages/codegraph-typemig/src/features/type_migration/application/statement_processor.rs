//! Statement processor
//!
//! Visits one unit (a statement, a field initializer or a branch condition)
//! after something inside it changed type, and decides per construct what the
//! change means. Sub-expressions are checked before their parents, so an outer
//! check sees the conversions inner checks recorded.
//!
//! For every value flowing into a slot the two sides are compared with their
//! declared types:
//!
//! | slot changed | value changed | action                                   |
//! |--------------|---------------|------------------------------------------|
//! | yes          | no            | retype the value to fit the slot         |
//! | no           | yes           | make the slot a root, or convert         |
//! | yes          | yes           | convert when the value no longer fits    |

use super::labeler::TypeMigrationLabeler;
use crate::features::type_migration::domain::typing::{self, formal_for_argument, member_binding};
use crate::features::type_migration::domain::{
    BinaryOp, DeclId, ElementRef, ExprId, ExprKind, FailureKind, JType, NodeRef, PrimitiveKind, Program, StmtId,
    StmtKind, UnaryOp, VisitTarget,
};
use tracing::trace;

pub(crate) struct StatementProcessor<'l, 'a> {
    labeler: &'l mut TypeMigrationLabeler<'a>,
    program: &'a Program,
}

impl<'l, 'a> StatementProcessor<'l, 'a> {
    pub(crate) fn new(labeler: &'l mut TypeMigrationLabeler<'a>) -> Self {
        let program = labeler.program();
        Self { labeler, program }
    }

    pub(crate) fn process(&mut self, target: VisitTarget) {
        match target {
            VisitTarget::Stmt(stmt) => self.visit_statement(stmt),
            VisitTarget::Field(field) => {
                if let Some(init) = self.program.decl(field).initializer() {
                    self.visit_expression(init);
                    self.check_initializer(field, init);
                }
            }
            VisitTarget::Condition(condition) => {
                self.visit_expression(condition);
                self.check_condition(condition);
            }
        }
    }

    fn visit_statement(&mut self, stmt: StmtId) {
        let program = self.program;
        match &program.stmt(stmt).kind {
            StmtKind::LocalDecl { group } => {
                for &var in &program.group(*group).vars {
                    if let Some(init) = program.decl(var).initializer() {
                        self.visit_expression(init);
                        self.check_initializer(var, init);
                    }
                }
            }
            StmtKind::Expression { expr } => self.visit_expression(*expr),
            StmtKind::Return { value: Some(value) } => {
                self.visit_expression(*value);
                self.check_return(stmt, *value);
            }
            StmtKind::Return { value: None } => {}
            StmtKind::If { condition, .. } | StmtKind::While { condition, .. } => {
                self.visit_expression(*condition);
                self.check_condition(*condition);
            }
            StmtKind::ForEach { variable, iterable, .. } => {
                self.visit_expression(*iterable);
                self.check_foreach(*variable, *iterable);
            }
            // Nested statements are visited only when a usage sits in them.
            StmtKind::Block { .. } => {}
        }
    }

    fn visit_expression(&mut self, expr: ExprId) {
        let program = self.program;
        if let ExprKind::Lambda { .. } = &program.expr(expr).kind {
            trace!(expr = %program.expr_text(expr), "lambda body not analyzed");
            return;
        }
        for child in program.children(expr) {
            self.visit_expression(child);
        }

        match &program.expr(expr).kind {
            ExprKind::Reference {
                target,
                qualifier: Some(qualifier),
            } => self.check_qualifier(expr, *qualifier, *target),
            ExprKind::MethodCall {
                method,
                qualifier,
                args,
            } => {
                if let Some(qualifier) = qualifier {
                    self.check_qualifier(expr, *qualifier, *method);
                }
                self.check_call_arguments(expr, *method, args);
            }
            ExprKind::ArrayInit { ty, elements } => self.check_array_initializer(expr, ty, elements),
            ExprKind::ArrayAccess { index, .. } => self.check_array_index(*index),
            ExprKind::Assign { op, lhs, rhs } => self.check_assignment(expr, *op, *lhs, *rhs),
            ExprKind::Binary { op, operands } => self.check_polyadic(*op, operands),
            ExprKind::Unary { op, operand } => self.check_unary(*op, *operand),
            ExprKind::Conditional { condition, .. } => self.check_condition(*condition),
            ExprKind::Cast { ty, operand } | ExprKind::InstanceOf { operand, ty } => self.check_castable(ty, *operand),
            ExprKind::Literal { .. }
            | ExprKind::Reference { qualifier: None, .. }
            | ExprKind::New { .. }
            | ExprKind::Paren { .. }
            | ExprKind::Lambda { .. } => {}
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Types
    // ═══════════════════════════════════════════════════════════════════

    /// (declared, current) types of `expr`.
    fn types_of(&self, expr: ExprId) -> Option<(JType, JType)> {
        let original = self.program.static_type(expr)?;
        let current = self.labeler.evaluate(expr)?;
        Some((original, current))
    }

    /// Like [`types_of`](Self::types_of), but only when the type changed.
    fn changed(&self, expr: ExprId) -> Option<(JType, JType)> {
        self.types_of(expr).filter(|(original, current)| original != current)
    }

    /// A value of type `value_*` flowing into a slot of type `slot_*`.
    #[allow(clippy::too_many_arguments)]
    fn process_flow(
        &mut self,
        slot: Option<DeclId>,
        value: ExprId,
        slot_original: &JType,
        slot_current: &JType,
        value_original: &JType,
        value_current: &JType,
        place: Option<ElementRef>,
    ) {
        let fits = self.labeler.classes().is_assignable(slot_current, value_current);
        let slot_changed = slot_original != slot_current;
        let value_changed = value_original != value_current;
        match (slot_changed, value_changed) {
            (false, false) => {}
            (true, false) => self
                .labeler
                .migrate_expression_type(value, slot_current, place, fits, true),
            (false, true) => {
                let rooted = match slot {
                    Some(decl) => self
                        .labeler
                        .add_migration_root(decl, value_current.clone(), place, fits, false),
                    None => false,
                };
                if !rooted && !fits {
                    self.labeler
                        .convert_expression(value, slot_current, value_current, true);
                }
            }
            (true, true) => {
                if !fits {
                    self.labeler
                        .convert_expression(value, slot_current, value_current, true);
                }
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Slots
    // ═══════════════════════════════════════════════════════════════════

    fn check_initializer(&mut self, var: DeclId, init: ExprId) {
        let Some((value_original, value_current)) = self.types_of(init) else {
            return;
        };
        let slot_original = self.program.decl(var).ty.clone();
        let slot_current = self.labeler.current_decl_type(var);
        self.process_flow(
            Some(var),
            init,
            &slot_original,
            &slot_current,
            &value_original,
            &value_current,
            Some(ElementRef::Decl(var)),
        );
    }

    fn check_return(&mut self, stmt: StmtId, value: ExprId) {
        let Some(method) = self.program.enclosing_method(NodeRef::Stmt(stmt)) else {
            return;
        };
        let Some((value_original, value_current)) = self.types_of(value) else {
            return;
        };
        let slot_original = self.program.decl(method).ty.clone();
        let slot_current = self.labeler.current_decl_type(method);
        if slot_current.is_void() && slot_original != slot_current {
            self.labeler
                .convert_expression(value, &slot_current, &value_current, true);
            return;
        }
        self.process_flow(
            Some(method),
            value,
            &slot_original,
            &slot_current,
            &value_original,
            &value_current,
            Some(ElementRef::Expr(value)),
        );
    }

    fn check_assignment(&mut self, assign: ExprId, op: Option<BinaryOp>, lhs: ExprId, rhs: ExprId) {
        let Some((lhs_original, lhs_current)) = self.types_of(lhs) else {
            return;
        };
        let Some((rhs_original, rhs_current)) = self.types_of(rhs) else {
            return;
        };
        let lhs_changed = lhs_original != lhs_current;
        let rhs_changed = rhs_original != rhs_current;
        if !lhs_changed && !rhs_changed {
            return;
        }

        if let Some(op) = op {
            if self
                .labeler
                .classes()
                .is_binary_operator_applicable(op, &lhs_current, &rhs_current)
            {
                return;
            }
            if lhs_changed {
                self.labeler
                    .find_conversion_or_fail(lhs, &lhs_current, &lhs_original);
            }
            if rhs_changed {
                self.labeler
                    .find_conversion_or_fail(rhs, &rhs_current, &rhs_original);
            }
            return;
        }

        let program = self.program;
        let place = Some(ElementRef::Expr(assign));
        let fits = self.labeler.classes().is_assignable(&lhs_current, &rhs_current);
        match (lhs_changed, rhs_changed) {
            (true, false) => self
                .labeler
                .migrate_expression_type(rhs, &lhs_current, place, fits, true),
            (false, true) => {
                let target = program.skip_parens(lhs);
                match &program.expr(target).kind {
                    ExprKind::Reference { target: decl, .. } => {
                        let decl = *decl;
                        if (rhs_current.is_void() || rhs_current.is_null()) && program.decl(decl).is_local() {
                            self.labeler.eliminate_local_or_fail(decl, assign, &rhs_current);
                            return;
                        }
                        if !self
                            .labeler
                            .add_migration_root(decl, rhs_current.clone(), place, fits, false)
                            && !fits
                        {
                            self.labeler
                                .convert_expression(rhs, &lhs_current, &rhs_current, true);
                        }
                    }
                    ExprKind::ArrayAccess { array, .. } if !fits => {
                        self.labeler.migrate_expression_type(
                            *array,
                            &JType::array(rhs_current.clone()),
                            place,
                            false,
                            false,
                        );
                    }
                    _ => {
                        if !fits {
                            self.labeler
                                .convert_expression(rhs, &lhs_current, &rhs_current, true);
                        }
                    }
                }
            }
            _ => {
                if !fits {
                    self.labeler
                        .convert_expression(rhs, &lhs_current, &rhs_current, true);
                }
            }
        }
    }

    fn check_call_arguments(&mut self, call: ExprId, method: DeclId, args: &[ExprId]) {
        let program = self.program;
        let m = program.decl(method);
        let params = m.params();
        if args.is_empty() || params.is_empty() {
            return;
        }
        // Equality takes any object.
        if m.name == "equals" && args.len() == 1 {
            return;
        }

        let original_binding = typing::call_substitution(program, program, None, call);
        let current_binding = self.labeler.call_substitution(call);
        for (i, &arg) in args.iter().enumerate() {
            let Some(&param) = params.get(i).or_else(|| params.last()) else {
                break;
            };
            let Some((value_original, value_current)) = self.types_of(arg) else {
                continue;
            };
            let declared = &program.decl(param).ty;
            let slot_original = formal_for_argument(declared, i, params.len(), args.len(), &value_original)
                .substitute(&original_binding);
            let slot_current = formal_for_argument(
                &self.labeler.current_decl_type(param),
                i,
                params.len(),
                args.len(),
                &value_current,
            )
            .substitute(&current_binding);
            let slot = (!declared.is_varargs()).then_some(param);
            self.process_flow(
                slot,
                arg,
                &slot_original,
                &slot_current,
                &value_original,
                &value_current,
                Some(ElementRef::Expr(call)),
            );
        }
    }

    fn check_foreach(&mut self, variable: DeclId, iterable: ExprId) {
        let Some((iterable_original, iterable_current)) = self.types_of(iterable) else {
            return;
        };
        let classes = self.labeler.classes();
        let var_original = self.program.decl(variable).ty.clone();
        let var_current = self.labeler.current_decl_type(variable);
        let place = Some(ElementRef::Decl(variable));

        if iterable_original != iterable_current {
            let Some(element) = self.element_type(&iterable_current) else {
                self.labeler
                    .mark_failed(iterable_current, ElementRef::Expr(iterable), FailureKind::Unconvertible);
                return;
            };
            let fits = classes.is_assignable(&var_current, &element);
            if !self
                .labeler
                .add_migration_root(variable, element, place, fits, false)
                && !fits
            {
                self.labeler
                    .mark_failed(iterable_current, ElementRef::Expr(iterable), FailureKind::Unconvertible);
            }
        } else if var_original != var_current {
            let Some(element) = self.element_type(&iterable_current) else {
                return;
            };
            if classes.is_assignable(&var_current, &element) {
                return;
            }
            let retyped = match &iterable_current {
                JType::Array(_) | JType::Varargs(_) => Some(JType::array(var_current.clone())),
                JType::Class { name, args } if args.len() == 1 => {
                    Some(JType::generic(name.clone(), vec![classes.boxed(&var_current)]))
                }
                _ => None,
            };
            match retyped {
                Some(ty) => self.labeler.migrate_expression_type(iterable, &ty, place, false, true),
                None => self
                    .labeler
                    .mark_failed(var_current, ElementRef::Expr(iterable), FailureKind::Unconvertible),
            }
        }
    }

    /// Element type an enhanced `for` reads from `ty`.
    fn element_type(&self, ty: &JType) -> Option<JType> {
        if let Some(component) = ty.component() {
            return Some(component.clone());
        }
        let iterable = self.labeler.classes().as_super(ty, "Iterable")?;
        Some(iterable.type_args().first().cloned().unwrap_or_else(JType::object))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Operators and members
    // ═══════════════════════════════════════════════════════════════════

    /// A member reached through a qualifier whose type changed.
    fn check_qualifier(&mut self, access: ExprId, qualifier: ExprId, member: DeclId) {
        let Some((qualifier_original, qualifier_current)) = self.changed(qualifier) else {
            return;
        };
        let program = self.program;
        let classes = self.labeler.classes();
        let member_decl = program.decl(member);
        if classes.as_super(&qualifier_current, &member_decl.class).is_some() {
            return;
        }

        // Same member name on the new type: the text stays, the type follows.
        let arity = member_decl.params().len();
        let counterpart = qualifier_current.class_name().and_then(|class| {
            if member_decl.is_method() {
                program.find_method(class, &member_decl.name, arity)
            } else {
                program.find_field(class, &member_decl.name)
            }
        });
        if let Some(found) = counterpart {
            let ty = program
                .decl(found)
                .ty
                .varargs_to_array()
                .substitute(&member_binding(program, &qualifier_current, found));
            self.labeler.retype_expression(access, ty);
            return;
        }

        self.labeler
            .convert_member_access(access, qualifier, &qualifier_original, &qualifier_current);
    }

    fn check_polyadic(&mut self, op: BinaryOp, operands: &[ExprId]) {
        let program = self.program;
        let mut types = Vec::with_capacity(operands.len());
        for &operand in operands {
            let Some(pair) = self.types_of(operand) else {
                return;
            };
            types.push(pair);
        }
        if types.iter().all(|(original, current)| original == current) {
            return;
        }
        if matches!(op, BinaryOp::Eq | BinaryOp::Ne) && operands.iter().any(|o| program.is_null_literal(*o)) {
            return;
        }

        let classes = self.labeler.classes();
        let mut applicable = true;
        let mut acc = types[0].1.clone();
        for (_, current) in &types[1..] {
            if !classes.is_binary_operator_applicable(op, &acc, current) {
                applicable = false;
                break;
            }
            match classes.binary_result_type(op, &acc, current) {
                Some(next) => acc = next,
                None if matches!(
                    op,
                    BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge
                ) => {}
                None => {
                    applicable = false;
                    break;
                }
            }
        }
        if applicable {
            return;
        }
        for (&operand, (original, current)) in operands.iter().zip(&types) {
            if original != current {
                self.labeler.find_conversion_or_fail(operand, current, original);
            }
        }
    }

    fn check_unary(&mut self, op: UnaryOp, operand: ExprId) {
        let Some((original, current)) = self.changed(operand) else {
            return;
        };
        if !self.labeler.classes().is_unary_operator_applicable(op, &current) {
            self.labeler.find_conversion_or_fail(operand, &current, &original);
        }
    }

    fn check_array_index(&mut self, index: ExprId) {
        let Some((original, current)) = self.changed(index) else {
            return;
        };
        let usable = self
            .labeler
            .classes()
            .unbox(&current)
            .is_some_and(|k| k.is_integral() && k != PrimitiveKind::Long);
        if !usable {
            self.labeler.find_conversion_or_fail(index, &current, &original);
        }
    }

    fn check_castable(&mut self, ty: &JType, operand: ExprId) {
        let Some((original, current)) = self.changed(operand) else {
            return;
        };
        if !self.labeler.classes().is_castable(ty, &current) {
            self.labeler.find_conversion_or_fail(operand, &current, &original);
        }
    }

    fn check_condition(&mut self, condition: ExprId) {
        let Some((original, current)) = self.changed(condition) else {
            return;
        };
        if self.labeler.classes().unbox(&current) != Some(PrimitiveKind::Boolean) {
            self.labeler.find_conversion_or_fail(condition, &current, &original);
        }
    }

    /// Widen an array initializer's element type to hold changed elements.
    fn check_array_initializer(&mut self, init: ExprId, ty: &JType, elements: &[ExprId]) {
        let program = self.program;
        if elements.iter().all(|e| self.changed(*e).is_none()) {
            return;
        }
        let Some(component) = ty.component() else {
            return;
        };
        let classes = self.labeler.classes();
        let mut candidate = component.clone();
        for &element in elements {
            let Some(current) = self.labeler.evaluate(element) else {
                continue;
            };
            if classes.is_assignable(&candidate, &current) {
                continue;
            }
            if classes.is_assignable(&current, &candidate) {
                candidate = current;
            } else {
                self.labeler.find_conversion_or_fail(element, &current, component);
            }
        }
        if &candidate == component {
            return;
        }

        let retyped = JType::array(candidate);
        self.labeler.retype_expression(init, retyped.clone());
        if let Some(NodeRef::Expr(parent)) = program.expr(init).parent {
            if matches!(&program.expr(parent).kind, ExprKind::New { initializer: Some(i), .. } if *i == init) {
                self.labeler.record_new_expression(parent, retyped);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::features::type_migration::application::labeler::{LabelerSettings, TypeMigrationLabeler};
    use crate::features::type_migration::domain::{BinaryOp, ElementRef, JType, ProgramBuilder};
    use crate::features::type_migration::infrastructure::{NeverCancel, ProgramIndex, RuleRegistry};

    #[test]
    fn test_null_comparison_is_exempt() {
        let mut b = ProgramBuilder::new();
        b.file("A.java").class("Box").end_class();
        b.class("A");
        let value = b.field("value", JType::string(), None);
        b.method("f", JType::boolean(), &[]);
        let read = b.var(value);
        let null = b.null();
        let cmp = b.binary(BinaryOp::Eq, read, null);
        b.ret(Some(cmp));
        b.end_method().end_class();
        let program = b.finish().unwrap();

        let index = ProgramIndex::build(&program);
        let rules = RuleRegistry::with_defaults();
        let mut labeler = TypeMigrationLabeler::new(&program, &index, &index, &rules, LabelerSettings::default());
        labeler.migrate(&[(value, JType::class("Box"))], &NeverCancel).unwrap();
        assert!(!labeler.has_failures());
    }

    #[test]
    fn test_assignment_roots_the_target() {
        let mut b = ProgramBuilder::new();
        b.file("A.java").class("A");
        let source = b.field("source", JType::int(), None);
        let sink = b.field("sink", JType::int(), None);
        b.method("f", JType::void(), &[]);
        let lhs = b.var(sink);
        let rhs = b.var(source);
        let assign = b.assign(lhs, rhs);
        b.expr_stmt(assign);
        b.end_method().end_class();
        let program = b.finish().unwrap();

        let index = ProgramIndex::build(&program);
        let rules = RuleRegistry::with_defaults();
        let mut labeler = TypeMigrationLabeler::new(&program, &index, &index, &rules, LabelerSettings::default());
        labeler.migrate(&[(source, JType::string())], &NeverCancel).unwrap();
        assert_eq!(labeler.evaluator().recorded(ElementRef::Decl(sink)), Some(&JType::string()));
        assert!(!labeler.has_failures());
    }

    #[test]
    fn test_condition_must_stay_boolean() {
        let mut b = ProgramBuilder::new();
        b.file("A.java").class("A");
        let flag = b.field("flag", JType::boolean(), None);
        b.method("f", JType::void(), &[]);
        let read = b.var(flag);
        b.if_then(read, |_| {});
        b.end_method().end_class();
        let program = b.finish().unwrap();

        let index = ProgramIndex::build(&program);
        let rules = RuleRegistry::with_defaults();
        let mut labeler = TypeMigrationLabeler::new(&program, &index, &index, &rules, LabelerSettings::default());
        labeler.migrate(&[(flag, JType::int())], &NeverCancel).unwrap();
        assert_eq!(labeler.failure_messages().len(), 1);
        labeler.migrate(&[(flag, JType::int())], &NeverCancel).unwrap();
        assert_eq!(labeler.stats().roots_accepted, 1);
    }

    #[test]
    fn test_boolean_wrapper_passes_condition() {
        let mut b = ProgramBuilder::new();
        b.file("A.java").class("A");
        let flag = b.field("flag", JType::boolean(), None);
        b.method("f", JType::void(), &[]);
        let read = b.var(flag);
        b.while_loop(read, |_| {});
        b.end_method().end_class();
        let program = b.finish().unwrap();

        let index = ProgramIndex::build(&program);
        let rules = RuleRegistry::with_defaults();
        let mut labeler = TypeMigrationLabeler::new(&program, &index, &index, &rules, LabelerSettings::default());
        labeler.migrate(&[(flag, JType::class("Boolean"))], &NeverCancel).unwrap();
        assert!(!labeler.has_failures());
    }
}
