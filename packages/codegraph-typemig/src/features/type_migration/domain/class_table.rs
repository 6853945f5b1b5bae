//! Class hierarchy and the type relations derived from it
//!
//! Assignability, castability, numeric promotion and operator applicability
//! all live here so the evaluator, the rules and the statement processor
//! agree on one definition of "compatible".

use super::program::{BinaryOp, DeclId, GroupId, UnaryOp};
use super::types::{JType, PrimitiveKind};
use crate::shared::models::TextRange;
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Upper bound on hierarchy walks; guards against malformed cyclic input.
const MAX_HIERARCHY_DEPTH: usize = 64;

/// A member slot inside a class body, in source order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Member {
    /// A field declaration statement (one or more fields sharing a type).
    Fields(GroupId),
    Method(DeclId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    pub type_params: Vec<String>,
    /// Direct supertypes, with type arguments expressed in this class's parameters.
    pub supers: Vec<JType>,
    pub is_interface: bool,
    /// Library classes are visible for typing but never edited.
    pub library: bool,
    pub file: String,
    pub members: Vec<Member>,
    pub range: TextRange,
}

impl ClassDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_params: Vec::new(),
            supers: Vec::new(),
            is_interface: false,
            library: false,
            file: String::new(),
            members: Vec::new(),
            range: TextRange::default(),
        }
    }

    pub fn methods(&self) -> impl Iterator<Item = DeclId> + '_ {
        self.members.iter().filter_map(|m| match m {
            Member::Method(id) => Some(*id),
            Member::Fields(_) => None,
        })
    }
}

/// All classes known to a program, library prelude included.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassTable {
    classes: IndexMap<String, ClassDecl>,
}

impl ClassTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, class: ClassDecl) {
        self.classes.insert(class.name.clone(), class);
    }

    pub fn get(&self, name: &str) -> Option<&ClassDecl> {
        self.classes.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut ClassDecl> {
        self.classes.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassDecl> {
        self.classes.values()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Transitive supertypes of `name` in breadth-first order, `Object` excluded.
    pub fn supertypes_of(&self, name: &str) -> Vec<String> {
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        let mut queue: VecDeque<String> = VecDeque::new();
        queue.push_back(name.to_string());
        seen.insert(name.to_string());
        while let Some(current) = queue.pop_front() {
            let Some(decl) = self.get(&current) else {
                continue;
            };
            for sup in &decl.supers {
                if let Some(sup_name) = sup.class_name() {
                    if seen.insert(sup_name.to_string()) {
                        out.push(sup_name.to_string());
                        queue.push_back(sup_name.to_string());
                    }
                }
            }
            if out.len() > MAX_HIERARCHY_DEPTH * 4 {
                break;
            }
        }
        out.retain(|n| n != "Object");
        out
    }

    pub fn is_subclass(&self, sub: &str, sup: &str) -> bool {
        sub == sup || sup == "Object" || self.supertypes_of(sub).iter().any(|s| s == sup)
    }

    /// View `ty` as an instance of class `target`, with type arguments rebound.
    ///
    /// `ArrayList<String>` seen as `List` is `List<String>`. Raw inputs give
    /// raw results.
    pub fn as_super(&self, ty: &JType, target: &str) -> Option<JType> {
        self.as_super_at(ty, target, 0)
    }

    fn as_super_at(&self, ty: &JType, target: &str, depth: usize) -> Option<JType> {
        if depth > MAX_HIERARCHY_DEPTH {
            return None;
        }
        match ty {
            JType::Class { name, args } => {
                if name == target {
                    return Some(ty.clone());
                }
                if target == "Object" {
                    return Some(JType::object());
                }
                let decl = self.get(name)?;
                let binding = if !args.is_empty() && args.len() == decl.type_params.len() {
                    let map: FxHashMap<String, JType> = decl
                        .type_params
                        .iter()
                        .cloned()
                        .zip(args.iter().cloned())
                        .collect();
                    Some(map)
                } else {
                    None
                };
                decl.supers.iter().find_map(|sup| {
                    let rebound = match &binding {
                        Some(map) => sup.substitute(map),
                        None => sup.erasure(),
                    };
                    self.as_super_at(&rebound, target, depth + 1)
                })
            }
            JType::Array(_) | JType::Varargs(_) | JType::TypeParam(_) if target == "Object" => {
                Some(JType::object())
            }
            _ => None,
        }
    }

    /// Primitive behind `ty`: the primitive itself or the one a wrapper class boxes.
    pub fn unbox(&self, ty: &JType) -> Option<PrimitiveKind> {
        match ty {
            JType::Primitive(p) if *p != PrimitiveKind::Void => Some(*p),
            JType::Class { name, .. } => PrimitiveKind::from_box_name(name),
            _ => None,
        }
    }

    pub fn box_type(kind: PrimitiveKind) -> Option<JType> {
        kind.box_name().map(JType::class)
    }

    /// Reference form of `ty`: primitives are boxed, everything else passes through.
    pub fn boxed(&self, ty: &JType) -> JType {
        match ty {
            JType::Primitive(p) => Self::box_type(*p).unwrap_or_else(|| ty.clone()),
            other => other.clone(),
        }
    }

    pub fn is_string(ty: &JType) -> bool {
        ty.class_name() == Some("String")
    }

    fn is_widening(from: PrimitiveKind, to: PrimitiveKind) -> bool {
        from.is_numeric()
            && to.is_numeric()
            && to != PrimitiveKind::Char
            && to.widening_rank() > from.widening_rank()
    }

    /// Can a value of type `from` be stored in a slot of type `to`?
    pub fn is_assignable(&self, to: &JType, from: &JType) -> bool {
        if to == from {
            return true;
        }
        match (to, from) {
            (_, JType::Null) => to.is_reference(),
            (JType::Primitive(t), JType::Primitive(f)) => Self::is_widening(*f, *t),
            (JType::Primitive(t), JType::Class { .. }) => match self.unbox(from) {
                Some(f) => f == *t || Self::is_widening(f, *t),
                None => false,
            },
            (JType::Class { .. }, JType::Primitive(f)) => match Self::box_type(*f) {
                Some(boxed) => self.is_assignable(to, &boxed),
                None => false,
            },
            (JType::Class { name, args }, _) => match from {
                JType::Array(_) | JType::Varargs(_) | JType::TypeParam(_) => name == "Object",
                JType::Class { .. } => match self.as_super(from, name) {
                    Some(found) => {
                        args.is_empty() || found.type_args().is_empty() || found.type_args() == args.as_slice()
                    }
                    None => false,
                },
                _ => false,
            },
            (JType::Array(t) | JType::Varargs(t), JType::Array(f) | JType::Varargs(f)) => {
                if t.is_primitive() || f.is_primitive() {
                    t == f
                } else {
                    self.is_assignable(t, f)
                }
            }
            _ => false,
        }
    }

    /// Would `(to) expr` compile for an `expr` of type `from`?
    pub fn is_castable(&self, to: &JType, from: &JType) -> bool {
        if self.is_assignable(to, from) || self.is_assignable(from, to) {
            return true;
        }
        match (to, from) {
            (JType::Primitive(t), JType::Primitive(f)) => t.is_numeric() && f.is_numeric(),
            (JType::Primitive(_), JType::Class { .. }) | (JType::Class { .. }, JType::Primitive(_)) => {
                // Unboxing then widening, or boxing to a supertype.
                let t = self.unbox(to);
                let f = self.unbox(from);
                matches!((t, f), (Some(t), Some(f)) if t == f || Self::is_widening(f, t))
            }
            (JType::Class { name: t, .. }, JType::Class { name: f, .. }) => {
                let t_iface = self.get(t).map(|c| c.is_interface).unwrap_or(false);
                let f_iface = self.get(f).map(|c| c.is_interface).unwrap_or(false);
                t_iface || f_iface || self.is_subclass(t, f) || self.is_subclass(f, t)
            }
            (JType::TypeParam(_), other) | (other, JType::TypeParam(_)) => other.is_reference(),
            (JType::Array(t), JType::Array(f)) => !t.is_primitive() && !f.is_primitive() && self.is_castable(t, f),
            _ => false,
        }
    }

    pub fn unary_promotion(kind: PrimitiveKind) -> PrimitiveKind {
        match kind {
            PrimitiveKind::Byte | PrimitiveKind::Short | PrimitiveKind::Char => PrimitiveKind::Int,
            other => other,
        }
    }

    pub fn binary_numeric_promotion(&self, left: &JType, right: &JType) -> Option<PrimitiveKind> {
        let l = self.unbox(left)?;
        let r = self.unbox(right)?;
        if !l.is_numeric() || !r.is_numeric() {
            return None;
        }
        let promoted = [PrimitiveKind::Double, PrimitiveKind::Float, PrimitiveKind::Long]
            .into_iter()
            .find(|k| l == *k || r == *k)
            .unwrap_or(PrimitiveKind::Int);
        Some(promoted)
    }

    fn is_integral(&self, ty: &JType) -> bool {
        self.unbox(ty).map(|p| p.is_integral()).unwrap_or(false)
    }

    fn is_boolean_like(&self, ty: &JType) -> bool {
        self.unbox(ty) == Some(PrimitiveKind::Boolean)
    }

    pub fn is_binary_operator_applicable(&self, op: BinaryOp, left: &JType, right: &JType) -> bool {
        if left.is_void() || right.is_void() {
            return false;
        }
        match op {
            BinaryOp::Add if Self::is_string(left) || Self::is_string(right) => true,
            BinaryOp::Add
            | BinaryOp::Sub
            | BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Rem
            | BinaryOp::Lt
            | BinaryOp::Gt
            | BinaryOp::Le
            | BinaryOp::Ge => self.binary_numeric_promotion(left, right).is_some(),
            BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => {
                self.is_integral(left) && self.is_integral(right)
            }
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
                (self.is_integral(left) && self.is_integral(right))
                    || (self.is_boolean_like(left) && self.is_boolean_like(right))
            }
            BinaryOp::And | BinaryOp::Or => self.is_boolean_like(left) && self.is_boolean_like(right),
            BinaryOp::Eq | BinaryOp::Ne => {
                if left.is_primitive() || right.is_primitive() {
                    self.binary_numeric_promotion(left, right).is_some()
                        || (self.is_boolean_like(left) && self.is_boolean_like(right))
                } else {
                    left.is_null()
                        || right.is_null()
                        || self.is_castable(left, right)
                        || self.is_castable(right, left)
                }
            }
        }
    }

    pub fn binary_result_type(&self, op: BinaryOp, left: &JType, right: &JType) -> Option<JType> {
        if !self.is_binary_operator_applicable(op, left, right) {
            return None;
        }
        let ty = match op {
            BinaryOp::Add if Self::is_string(left) || Self::is_string(right) => JType::string(),
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                JType::Primitive(self.binary_numeric_promotion(left, right)?)
            }
            BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => {
                JType::Primitive(Self::unary_promotion(self.unbox(left)?))
            }
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
                if self.is_boolean_like(left) {
                    JType::boolean()
                } else {
                    JType::Primitive(self.binary_numeric_promotion(left, right)?)
                }
            }
            BinaryOp::Lt
            | BinaryOp::Gt
            | BinaryOp::Le
            | BinaryOp::Ge
            | BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::And
            | BinaryOp::Or => JType::boolean(),
        };
        Some(ty)
    }

    pub fn is_unary_operator_applicable(&self, op: UnaryOp, operand: &JType) -> bool {
        match op {
            UnaryOp::Not => self.is_boolean_like(operand),
            UnaryOp::BitNot => self.is_integral(operand),
            UnaryOp::Neg
            | UnaryOp::Plus
            | UnaryOp::PreInc
            | UnaryOp::PreDec
            | UnaryOp::PostInc
            | UnaryOp::PostDec => self.unbox(operand).map(|p| p.is_numeric()).unwrap_or(false),
        }
    }

    /// Type of `c ? a : b`, or `None` when neither branch converts to the
    /// other.
    pub fn conditional_type(&self, then_ty: &JType, else_ty: &JType) -> Option<JType> {
        if then_ty == else_ty {
            return Some(then_ty.clone());
        }
        if then_ty.is_null() {
            return Some(self.boxed(else_ty));
        }
        if else_ty.is_null() {
            return Some(self.boxed(then_ty));
        }
        if let Some(p) = self.binary_numeric_promotion(then_ty, else_ty) {
            return Some(JType::Primitive(p));
        }
        if self.is_assignable(then_ty, else_ty) {
            return Some(then_ty.clone());
        }
        if self.is_assignable(else_ty, then_ty) {
            return Some(else_ty.clone());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ClassTable {
        let mut t = ClassTable::new();
        let mut iterable = ClassDecl::new("Iterable");
        iterable.type_params = vec!["T".into()];
        iterable.is_interface = true;
        t.insert(iterable);
        let mut list = ClassDecl::new("List");
        list.type_params = vec!["E".into()];
        list.is_interface = true;
        list.supers = vec![JType::generic("Iterable", vec![JType::type_param("E")])];
        t.insert(list);
        let mut array_list = ClassDecl::new("ArrayList");
        array_list.type_params = vec!["E".into()];
        array_list.supers = vec![JType::generic("List", vec![JType::type_param("E")])];
        t.insert(array_list);
        let mut number = ClassDecl::new("Number");
        number.supers = vec![JType::object()];
        t.insert(number);
        let mut integer = ClassDecl::new("Integer");
        integer.supers = vec![JType::class("Number")];
        t.insert(integer);
        t.insert(ClassDecl::new("String"));
        t
    }

    #[test]
    fn test_as_super_rebinds_arguments() {
        let t = table();
        let ty = JType::generic("ArrayList", vec![JType::string()]);
        assert_eq!(
            t.as_super(&ty, "Iterable"),
            Some(JType::generic("Iterable", vec![JType::string()]))
        );
        assert_eq!(t.as_super(&JType::class("ArrayList"), "List"), Some(JType::class("List")));
        assert_eq!(t.as_super(&JType::string(), "List"), None);
    }

    #[test]
    fn test_conditional_type_of_unrelated_branches() {
        let t = table();
        assert_eq!(
            t.conditional_type(&JType::class("Integer"), &JType::class("Number")),
            Some(JType::class("Number"))
        );
        assert_eq!(t.conditional_type(&JType::int(), &JType::Null), Some(JType::class("Integer")));
        assert_eq!(t.conditional_type(&JType::class("Integer"), &JType::string()), None);
    }

    #[test]
    fn test_primitive_widening() {
        let t = table();
        assert!(t.is_assignable(&JType::long(), &JType::int()));
        assert!(!t.is_assignable(&JType::int(), &JType::long()));
        assert!(!t.is_assignable(&JType::char(), &JType::int()));
        assert!(!t.is_assignable(&JType::int(), &JType::boolean()));
    }

    #[test]
    fn test_boxing_assignability() {
        let t = table();
        assert!(t.is_assignable(&JType::class("Integer"), &JType::int()));
        assert!(t.is_assignable(&JType::class("Number"), &JType::int()));
        assert!(t.is_assignable(&JType::long(), &JType::class("Integer")));
        assert!(!t.is_assignable(&JType::class("Long"), &JType::int()));
    }

    #[test]
    fn test_generic_invariance() {
        let t = table();
        let list_string = JType::generic("List", vec![JType::string()]);
        let list_integer = JType::generic("List", vec![JType::class("Integer")]);
        let array_list = JType::generic("ArrayList", vec![JType::string()]);
        assert!(t.is_assignable(&list_string, &array_list));
        assert!(!t.is_assignable(&list_integer, &array_list));
        assert!(t.is_assignable(&JType::class("List"), &array_list));
    }

    #[test]
    fn test_null_only_to_references() {
        let t = table();
        assert!(t.is_assignable(&JType::string(), &JType::Null));
        assert!(!t.is_assignable(&JType::int(), &JType::Null));
    }

    #[test]
    fn test_operator_applicability() {
        let t = table();
        assert!(t.is_binary_operator_applicable(BinaryOp::Add, &JType::string(), &JType::int()));
        assert!(t.is_binary_operator_applicable(BinaryOp::Mul, &JType::class("Integer"), &JType::long()));
        assert!(!t.is_binary_operator_applicable(BinaryOp::Sub, &JType::string(), &JType::int()));
        assert!(!t.is_binary_operator_applicable(BinaryOp::And, &JType::int(), &JType::boolean()));
        assert!(t.is_binary_operator_applicable(BinaryOp::Eq, &JType::string(), &JType::Null));
        assert_eq!(
            t.binary_result_type(BinaryOp::Add, &JType::int(), &JType::long()),
            Some(JType::long())
        );
        assert_eq!(
            t.binary_result_type(BinaryOp::Lt, &JType::int(), &JType::double()),
            Some(JType::boolean())
        );
    }

    #[test]
    fn test_castability() {
        let t = table();
        assert!(t.is_castable(&JType::int(), &JType::double()));
        assert!(t.is_castable(&JType::class("ArrayList"), &JType::class("List")));
        assert!(!t.is_castable(&JType::string(), &JType::class("Integer")));
        assert!(!t.is_castable(&JType::boolean(), &JType::int()));
    }
}
