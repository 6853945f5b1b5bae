//! Structural expression typing
//!
//! One evaluator serves both the declared view of the program (static types)
//! and the migrated view: the difference is the [`TypeEnv`] it reads
//! declaration and expression types from.

use super::program::{BinaryOp, DeclId, ExprId, ExprKind, Program, UnaryOp};
use super::types::JType;
use super::class_table::ClassTable;
use rustc_hash::FxHashMap;

/// Source of declaration types and per-expression overrides.
pub trait TypeEnv {
    fn declared_type(&self, decl: DeclId) -> JType;

    /// A type recorded for the expression itself, taking precedence over
    /// structural evaluation.
    fn expression_type(&self, _expr: ExprId) -> Option<JType> {
        None
    }
}

/// Hook letting conversion rules adjust how a call argument binds the
/// method's type parameters.
pub trait TypeParamBinder {
    fn bind_type_parameters(
        &self,
        program: &Program,
        formal: &JType,
        actual: &JType,
        method: DeclId,
        call: ExprId,
    ) -> Option<(JType, JType)>;
}

pub fn evaluate(
    program: &Program,
    env: &dyn TypeEnv,
    binder: Option<&dyn TypeParamBinder>,
    expr: ExprId,
) -> Option<JType> {
    if let Some(ty) = env.expression_type(expr) {
        return Some(ty);
    }
    let classes = program.classes();
    let eval = |e: ExprId| evaluate(program, env, binder, e);
    match &program.expr(expr).kind {
        ExprKind::Literal { ty, .. } => Some(ty.clone()),
        ExprKind::Reference { target, qualifier } => {
            let declared = env.declared_type(*target).varargs_to_array();
            match qualifier {
                Some(q) => {
                    let qualifier_ty = eval(*q)?;
                    let map = member_binding(program, &qualifier_ty, *target);
                    Some(declared.substitute(&map))
                }
                None => Some(declared),
            }
        }
        ExprKind::MethodCall { method, .. } => {
            let map = call_substitution(program, env, binder, expr);
            Some(env.declared_type(*method).substitute(&map))
        }
        ExprKind::New {
            ty,
            qualifier: Some(q),
            ..
        } => {
            let qualifier_ty = eval(*q)?;
            Some(ty.substitute(&class_binding(program, &qualifier_ty)))
        }
        ExprKind::New { ty, .. } | ExprKind::ArrayInit { ty, .. } => Some(ty.clone()),
        ExprKind::ArrayAccess { array, .. } => eval(*array)?.component().cloned(),
        ExprKind::Assign { lhs, .. } => eval(*lhs),
        ExprKind::Binary { op, operands } => {
            if is_boolean_operator(*op) {
                return Some(JType::boolean());
            }
            let mut iter = operands.iter();
            let mut acc = eval(*iter.next()?)?;
            for operand in iter {
                let right = eval(*operand)?;
                let next = classes.binary_result_type(*op, &acc, &right);
                acc = next.unwrap_or(acc);
            }
            Some(acc)
        }
        ExprKind::Unary { op: UnaryOp::Not, .. } => Some(JType::boolean()),
        ExprKind::Unary { operand, .. } => eval(*operand),
        ExprKind::Paren { inner } => eval(*inner),
        ExprKind::Conditional {
            then_expr, else_expr, ..
        } => {
            let then_ty = eval(*then_expr)?;
            let else_ty = eval(*else_expr)?;
            classes
                .conditional_type(&then_ty, &else_ty)
                .or_else(|| declared_conditional_type(program, *then_expr, *else_expr))
        }
        ExprKind::Cast { ty, .. } | ExprKind::Lambda { ty, .. } => Some(ty.clone()),
        ExprKind::InstanceOf { .. } => Some(JType::boolean()),
    }
}

/// Fallback for a conditional whose branches no longer convert to each
/// other: the type it had under the declared types. Unrelated declared
/// branches meet at `Object`.
fn declared_conditional_type(program: &Program, then_expr: ExprId, else_expr: ExprId) -> Option<JType> {
    let then_ty = program.static_type(then_expr)?;
    let else_ty = program.static_type(else_expr)?;
    Some(
        program
            .classes()
            .conditional_type(&then_ty, &else_ty)
            .unwrap_or_else(JType::object),
    )
}

fn is_boolean_operator(op: BinaryOp) -> bool {
    matches!(
        op,
        BinaryOp::Lt
            | BinaryOp::Gt
            | BinaryOp::Le
            | BinaryOp::Ge
            | BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::And
            | BinaryOp::Or
    )
}

/// Binding of the declaring class's type parameters when `member` is accessed
/// through a qualifier of type `qualifier_ty`.
pub fn member_binding(program: &Program, qualifier_ty: &JType, member: DeclId) -> FxHashMap<String, JType> {
    let decl = program.decl(member);
    let mut map = FxHashMap::default();
    let Some(class) = program.classes().get(&decl.class) else {
        return map;
    };
    if class.type_params.is_empty() {
        return map;
    }
    if let Some(found) = program.classes().as_super(qualifier_ty, &class.name) {
        if found.type_args().len() == class.type_params.len() {
            map.extend(class.type_params.iter().cloned().zip(found.type_args().iter().cloned()));
        }
    }
    map
}

/// Binding of a parameterized class type's own parameters, used for
/// `outer.new Inner()` where `Inner` mentions the outer class's parameters.
pub fn class_binding(program: &Program, ty: &JType) -> FxHashMap<String, JType> {
    let mut map = FxHashMap::default();
    let Some(class) = ty.class_name().and_then(|name| program.classes().get(name)) else {
        return map;
    };
    if class.type_params.len() == ty.type_args().len() {
        map.extend(class.type_params.iter().cloned().zip(ty.type_args().iter().cloned()));
    }
    map
}

/// Type-parameter binding for a call: class parameters from the qualifier,
/// method parameters inferred from the arguments.
pub fn call_substitution(
    program: &Program,
    env: &dyn TypeEnv,
    binder: Option<&dyn TypeParamBinder>,
    call: ExprId,
) -> FxHashMap<String, JType> {
    let ExprKind::MethodCall {
        method,
        qualifier,
        args,
    } = &program.expr(call).kind
    else {
        return FxHashMap::default();
    };
    let mut map = match qualifier.and_then(|q| evaluate(program, env, binder, q)) {
        Some(qualifier_ty) => member_binding(program, &qualifier_ty, *method),
        None => FxHashMap::default(),
    };
    let decl = program.decl(*method);
    let method_params = decl.method_type_params();
    if method_params.is_empty() {
        return map;
    }
    let params = decl.params();
    for (i, arg) in args.iter().enumerate() {
        let Some(param) = params.get(i).or_else(|| params.last()) else {
            break;
        };
        let Some(actual) = evaluate(program, env, binder, *arg) else {
            continue;
        };
        let formal = formal_for_argument(&env.declared_type(*param), i, params.len(), args.len(), &actual);
        let (formal, actual) = binder
            .and_then(|b| b.bind_type_parameters(program, &formal, &actual, *method, call))
            .unwrap_or((formal, actual));
        unify(program.classes(), &formal, &actual, method_params, &mut map);
    }
    map
}

/// Formal type an argument is checked against. A varargs slot takes either
/// the array itself or one element.
pub fn formal_for_argument(
    param_ty: &JType,
    index: usize,
    param_count: usize,
    arg_count: usize,
    actual: &JType,
) -> JType {
    match param_ty {
        JType::Varargs(component) => {
            let passes_array = arg_count == param_count && index + 1 == param_count && actual.is_array_like();
            if passes_array {
                param_ty.varargs_to_array()
            } else {
                (**component).clone()
            }
        }
        other => other.clone(),
    }
}

fn unify(
    classes: &ClassTable,
    formal: &JType,
    actual: &JType,
    method_params: &[String],
    map: &mut FxHashMap<String, JType>,
) {
    match formal {
        JType::TypeParam(name) if method_params.contains(name) => {
            if !actual.is_null() && !actual.is_void() {
                map.entry(name.clone()).or_insert_with(|| classes.boxed(actual));
            }
        }
        JType::Class { name, args } if !args.is_empty() => {
            if let Some(found) = classes.as_super(actual, name) {
                for (f, a) in args.iter().zip(found.type_args()) {
                    unify(classes, f, a, method_params, map);
                }
            }
        }
        JType::Array(component) | JType::Varargs(component) => {
            if let Some(actual_component) = actual.component() {
                unify(classes, component, actual_component, method_params, map);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::type_migration::domain::ProgramBuilder;

    #[test]
    fn test_formal_for_varargs_element() {
        let param = JType::varargs(JType::string());
        assert_eq!(formal_for_argument(&param, 0, 1, 3, &JType::string()), JType::string());
        assert_eq!(
            formal_for_argument(&param, 0, 1, 1, &JType::array(JType::string())),
            JType::array(JType::string())
        );
        assert_eq!(formal_for_argument(&JType::int(), 0, 1, 1, &JType::int()), JType::int());
    }

    #[test]
    fn test_unify_through_supertype() {
        let mut classes = ClassTable::new();
        let mut list = super::super::class_table::ClassDecl::new("List");
        list.type_params = vec!["E".into()];
        classes.insert(list);
        let mut array_list = super::super::class_table::ClassDecl::new("ArrayList");
        array_list.type_params = vec!["E".into()];
        array_list.supers = vec![JType::generic("List", vec![JType::type_param("E")])];
        classes.insert(array_list);

        let mut map = FxHashMap::default();
        let formal = JType::generic("List", vec![JType::type_param("T")]);
        let actual = JType::generic("ArrayList", vec![JType::string()]);
        unify(&classes, &formal, &actual, &["T".to_string()], &mut map);
        assert_eq!(map.get("T"), Some(&JType::string()));
    }

    #[test]
    fn test_qualified_new_binds_outer_parameters() {
        let mut b = ProgramBuilder::new();
        b.file("Outer.java").class_with("Outer", &["T"], vec![]).end_class();
        b.class_with("Inner", &["T"], vec![]).end_class();
        b.class("User");
        let outer = b.field("outer", JType::generic("Outer", vec![JType::string()]), None);
        b.method("f", JType::void(), &[]);
        let read = b.var(outer);
        let inner = b.new_inner(read, JType::generic("Inner", vec![JType::type_param("T")]), vec![]);
        let plain = b.new_object(JType::generic("Inner", vec![JType::type_param("T")]), vec![]);
        b.expr_stmt(inner);
        b.expr_stmt(plain);
        b.end_method().end_class();
        let program = b.finish().unwrap();

        assert_eq!(
            program.static_type(inner),
            Some(JType::generic("Inner", vec![JType::string()]))
        );
        assert_eq!(
            program.static_type(plain),
            Some(JType::generic("Inner", vec![JType::type_param("T")]))
        );
    }

    #[test]
    fn test_unify_boxes_primitives() {
        let classes = ClassTable::new();
        let mut map = FxHashMap::default();
        unify(&classes, &JType::type_param("T"), &JType::int(), &["T".to_string()], &mut map);
        assert_eq!(map.get("T"), Some(&JType::class("Integer")));
    }
}
