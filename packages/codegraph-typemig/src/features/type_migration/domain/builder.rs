//! Program construction
//!
//! `ProgramBuilder` assembles a [`Program`] top-down: files, classes, members,
//! statements and expressions. Ranges and parent links are filled in by
//! [`ProgramBuilder::finish`], which prints Java-like source for every file.
//!
//! ```text
//! let mut b = ProgramBuilder::new();
//! b.file("Demo.java").class("Demo");
//! let count = b.field("count", JType::int(), None);
//! let run = b.method("run", JType::void(), &[]);
//! let one = b.int(1);
//! let target = b.var(count);
//! let assign = b.assign(target, one);
//! b.expr_stmt(assign);
//! b.end_method().end_class();
//! let program = b.finish()?;
//! ```

use super::class_table::{ClassDecl, Member};
use super::printer;
use super::program::{
    BinaryOp, Decl, DeclGroup, DeclId, DeclKind, Expr, ExprId, ExprKind, GroupId, Program, Stmt, StmtId,
    StmtKind, UnaryOp,
};
use super::types::JType;
use crate::errors::{MigrationError, Result};
use crate::shared::models::TextRange;
use indexmap::IndexMap;

/// File name used for prelude declarations. Never printed.
pub const LIBRARY_FILE: &str = "<library>";

pub struct ProgramBuilder {
    program: Program,
    current_file: String,
    current_class: Option<String>,
    current_method: Option<DeclId>,
    blocks: Vec<Vec<StmtId>>,
    file_classes: IndexMap<String, Vec<String>>,
    errors: Vec<String>,
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramBuilder {
    /// A builder preloaded with the library prelude (`Object`, `String`,
    /// wrappers, collections, `AtomicInteger`, `Optional`).
    pub fn new() -> Self {
        let mut builder = Self::empty();
        builder.install_prelude();
        builder.current_file = "Main.java".to_string();
        builder
    }

    /// A builder with no library classes at all.
    pub fn empty() -> Self {
        Self {
            program: Program::default(),
            current_file: "Main.java".to_string(),
            current_class: None,
            current_method: None,
            blocks: Vec::new(),
            file_classes: IndexMap::new(),
            errors: Vec::new(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Structure
    // ═══════════════════════════════════════════════════════════════════

    pub fn file(&mut self, name: &str) -> &mut Self {
        if self.current_class.is_some() {
            self.errors.push(format!("file '{name}' opened inside a class"));
        }
        self.current_file = name.to_string();
        self.file_classes.entry(name.to_string()).or_default();
        self
    }

    pub fn class(&mut self, name: &str) -> &mut Self {
        self.open_class(name, &[], Vec::new(), false)
    }

    pub fn class_with(&mut self, name: &str, type_params: &[&str], supers: Vec<JType>) -> &mut Self {
        self.open_class(name, type_params, supers, false)
    }

    pub fn interface(&mut self, name: &str, type_params: &[&str], supers: Vec<JType>) -> &mut Self {
        self.open_class(name, type_params, supers, true)
    }

    fn open_class(&mut self, name: &str, type_params: &[&str], supers: Vec<JType>, is_interface: bool) -> &mut Self {
        if let Some(open) = &self.current_class {
            self.errors.push(format!("class '{name}' opened inside '{open}'"));
        }
        if self.program.classes.contains(name) {
            self.errors.push(format!("class '{name}' declared twice"));
        }
        let mut class = ClassDecl::new(name);
        class.type_params = type_params.iter().map(|s| s.to_string()).collect();
        class.supers = supers;
        class.is_interface = is_interface;
        class.file = self.current_file.clone();
        class.library = self.current_file == LIBRARY_FILE;
        self.program.classes.insert(class);
        if !class_is_library(&self.current_file) {
            self.file_classes
                .entry(self.current_file.clone())
                .or_default()
                .push(name.to_string());
        }
        self.current_class = Some(name.to_string());
        self
    }

    pub fn end_class(&mut self) -> &mut Self {
        if self.current_method.is_some() {
            self.errors.push("class closed with an open method".to_string());
        }
        if self.current_class.take().is_none() {
            self.errors.push("end_class without an open class".to_string());
        }
        self
    }

    fn class_name(&mut self) -> String {
        match &self.current_class {
            Some(name) => name.clone(),
            None => {
                self.errors.push("member declared outside a class".to_string());
                String::new()
            }
        }
    }

    fn add_member(&mut self, member: Member) {
        let Some(name) = self.current_class.clone() else {
            return;
        };
        if let Some(class) = self.program.classes.get_mut(&name) {
            class.members.push(member);
        }
    }

    fn new_decl(&mut self, name: &str, ty: JType, kind: DeclKind) -> DeclId {
        let class = self.class_name();
        let id = DeclId(self.program.decls.len() as u32);
        self.program.decls.push(Decl {
            name: name.to_string(),
            ty,
            kind,
            class,
            file: self.current_file.clone(),
            library: class_is_library(&self.current_file),
            is_static: false,
            range: TextRange::default(),
            type_range: TextRange::default(),
            name_range: TextRange::default(),
            parent: None,
        });
        id
    }

    fn new_group(&mut self, ty: JType, stmt: Option<StmtId>) -> GroupId {
        let id = GroupId(self.program.groups.len() as u32);
        self.program.groups.push(DeclGroup {
            ty,
            vars: Vec::new(),
            file: self.current_file.clone(),
            range: TextRange::default(),
            type_range: TextRange::default(),
            stmt,
        });
        id
    }

    pub fn field(&mut self, name: &str, ty: JType, initializer: Option<ExprId>) -> DeclId {
        self.fields(ty, &[(name, initializer)])[0]
    }

    /// One field declaration introducing several fields (`int a = 1, b;`).
    pub fn fields(&mut self, ty: JType, vars: &[(&str, Option<ExprId>)]) -> Vec<DeclId> {
        let group = self.new_group(ty.clone(), None);
        let ids: Vec<DeclId> = vars
            .iter()
            .map(|(name, initializer)| {
                self.new_decl(
                    name,
                    ty.clone(),
                    DeclKind::Field {
                        group,
                        initializer: *initializer,
                    },
                )
            })
            .collect();
        self.program.groups[group.index()].vars = ids.clone();
        self.add_member(Member::Fields(group));
        ids
    }

    fn declare_method(
        &mut self,
        type_params: &[&str],
        name: &str,
        ret: JType,
        params: &[(&str, JType)],
        has_body: bool,
    ) -> DeclId {
        let method = self.new_decl(
            name,
            ret,
            DeclKind::Method {
                params: Vec::new(),
                type_params: type_params.iter().map(|s| s.to_string()).collect(),
                body: None,
            },
        );
        let param_ids: Vec<DeclId> = params
            .iter()
            .enumerate()
            .map(|(index, (pname, pty))| {
                self.new_decl(pname, pty.clone(), DeclKind::Parameter { method, index })
            })
            .collect();
        if let DeclKind::Method { params, .. } = &mut self.program.decls[method.index()].kind {
            *params = param_ids;
        }
        self.add_member(Member::Method(method));
        if has_body {
            if self.current_method.is_some() {
                self.errors.push(format!("method '{name}' opened inside another method"));
            }
            self.current_method = Some(method);
            self.blocks.push(Vec::new());
        }
        method
    }

    /// Open a method with a body; close it with [`ProgramBuilder::end_method`].
    pub fn method(&mut self, name: &str, ret: JType, params: &[(&str, JType)]) -> DeclId {
        self.declare_method(&[], name, ret, params, true)
    }

    pub fn generic_method(
        &mut self,
        type_params: &[&str],
        name: &str,
        ret: JType,
        params: &[(&str, JType)],
    ) -> DeclId {
        self.declare_method(type_params, name, ret, params, true)
    }

    /// A method without a body (abstract or interface method).
    pub fn abstract_method(&mut self, name: &str, ret: JType, params: &[(&str, JType)]) -> DeclId {
        self.declare_method(&[], name, ret, params, false)
    }

    pub fn set_static(&mut self, decl: DeclId) -> &mut Self {
        self.program.decls[decl.index()].is_static = true;
        self
    }

    pub fn end_method(&mut self) -> &mut Self {
        let Some(method) = self.current_method.take() else {
            self.errors.push("end_method without an open method".to_string());
            return self;
        };
        let statements = self.blocks.pop().unwrap_or_default();
        let body = self.new_stmt(StmtKind::Block { statements });
        if let DeclKind::Method { body: slot, .. } = &mut self.program.decls[method.index()].kind {
            *slot = Some(body);
        }
        self
    }

    pub fn param(&self, method: DeclId, index: usize) -> DeclId {
        self.program.decl(method).params()[index]
    }

    /// Method `name` with `arity` parameters visible in `class`.
    pub fn find_method(&self, class: &str, name: &str, arity: usize) -> Option<DeclId> {
        self.program.find_method(class, name, arity)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Statements
    // ═══════════════════════════════════════════════════════════════════

    fn new_stmt(&mut self, kind: StmtKind) -> StmtId {
        let id = StmtId(self.program.stmts.len() as u32);
        self.program.stmts.push(Stmt {
            kind,
            file: self.current_file.clone(),
            range: TextRange::default(),
            parent: None,
        });
        id
    }

    fn append(&mut self, stmt: StmtId) -> StmtId {
        match self.blocks.last_mut() {
            Some(block) => block.push(stmt),
            None => self.errors.push("statement outside a method body".to_string()),
        }
        stmt
    }

    fn nested_block(&mut self, body: impl FnOnce(&mut Self)) -> StmtId {
        self.blocks.push(Vec::new());
        body(self);
        let statements = self.blocks.pop().unwrap_or_default();
        self.new_stmt(StmtKind::Block { statements })
    }

    pub fn local(&mut self, name: &str, ty: JType, initializer: Option<ExprId>) -> DeclId {
        self.locals(ty, &[(name, initializer)])[0]
    }

    /// One local declaration statement introducing several variables.
    pub fn locals(&mut self, ty: JType, vars: &[(&str, Option<ExprId>)]) -> Vec<DeclId> {
        let stmt = StmtId(self.program.stmts.len() as u32);
        let group = self.new_group(ty.clone(), Some(stmt));
        let created = self.new_stmt(StmtKind::LocalDecl { group });
        debug_assert_eq!(created, stmt);
        let ids: Vec<DeclId> = vars
            .iter()
            .map(|(name, initializer)| {
                self.new_decl(
                    name,
                    ty.clone(),
                    DeclKind::Local {
                        group: Some(group),
                        initializer: *initializer,
                    },
                )
            })
            .collect();
        self.program.groups[group.index()].vars = ids.clone();
        self.append(stmt);
        ids
    }

    pub fn expr_stmt(&mut self, expr: ExprId) -> StmtId {
        let stmt = self.new_stmt(StmtKind::Expression { expr });
        self.append(stmt)
    }

    pub fn ret(&mut self, value: Option<ExprId>) -> StmtId {
        let stmt = self.new_stmt(StmtKind::Return { value });
        self.append(stmt)
    }

    pub fn if_then(&mut self, condition: ExprId, then: impl FnOnce(&mut Self)) -> StmtId {
        let then_branch = self.nested_block(then);
        let stmt = self.new_stmt(StmtKind::If {
            condition,
            then_branch,
            else_branch: None,
        });
        self.append(stmt)
    }

    pub fn if_else(
        &mut self,
        condition: ExprId,
        then: impl FnOnce(&mut Self),
        otherwise: impl FnOnce(&mut Self),
    ) -> StmtId {
        let then_branch = self.nested_block(then);
        let else_branch = Some(self.nested_block(otherwise));
        let stmt = self.new_stmt(StmtKind::If {
            condition,
            then_branch,
            else_branch,
        });
        self.append(stmt)
    }

    pub fn while_loop(&mut self, condition: ExprId, body: impl FnOnce(&mut Self)) -> StmtId {
        let body = self.nested_block(body);
        let stmt = self.new_stmt(StmtKind::While { condition, body });
        self.append(stmt)
    }

    /// `for (ty name : iterable) { body }`; the closure receives the loop variable.
    pub fn for_each(
        &mut self,
        name: &str,
        ty: JType,
        iterable: ExprId,
        body: impl FnOnce(&mut Self, DeclId),
    ) -> StmtId {
        let variable = self.new_decl(
            name,
            ty,
            DeclKind::Local {
                group: None,
                initializer: None,
            },
        );
        let body = self.nested_block(|b| body(b, variable));
        let stmt = self.new_stmt(StmtKind::ForEach {
            variable,
            iterable,
            body,
        });
        self.append(stmt)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Expressions
    // ═══════════════════════════════════════════════════════════════════

    fn new_expr(&mut self, kind: ExprKind) -> ExprId {
        let id = ExprId(self.program.exprs.len() as u32);
        self.program.exprs.push(Expr {
            kind,
            file: self.current_file.clone(),
            range: TextRange::default(),
            type_range: None,
            name_range: None,
            parent: None,
        });
        id
    }

    pub fn literal(&mut self, text: &str, ty: JType) -> ExprId {
        self.new_expr(ExprKind::Literal {
            text: text.to_string(),
            ty,
        })
    }

    pub fn int(&mut self, value: i64) -> ExprId {
        self.literal(&value.to_string(), JType::int())
    }

    pub fn long(&mut self, value: i64) -> ExprId {
        self.literal(&format!("{value}L"), JType::long())
    }

    pub fn double(&mut self, value: f64) -> ExprId {
        self.literal(&format!("{value:?}"), JType::double())
    }

    pub fn boolean(&mut self, value: bool) -> ExprId {
        self.literal(if value { "true" } else { "false" }, JType::boolean())
    }

    pub fn char(&mut self, value: char) -> ExprId {
        self.literal(&format!("'{value}'"), JType::char())
    }

    pub fn string(&mut self, value: &str) -> ExprId {
        self.literal(&format!("\"{}\"", value.replace('"', "\\\"")), JType::string())
    }

    pub fn null(&mut self) -> ExprId {
        self.literal("null", JType::Null)
    }

    pub fn var(&mut self, target: DeclId) -> ExprId {
        self.new_expr(ExprKind::Reference {
            target,
            qualifier: None,
        })
    }

    pub fn field_of(&mut self, qualifier: ExprId, target: DeclId) -> ExprId {
        self.new_expr(ExprKind::Reference {
            target,
            qualifier: Some(qualifier),
        })
    }

    pub fn call(&mut self, method: DeclId, args: Vec<ExprId>) -> ExprId {
        self.new_expr(ExprKind::MethodCall {
            method,
            qualifier: None,
            args,
        })
    }

    pub fn call_on(&mut self, qualifier: ExprId, method: DeclId, args: Vec<ExprId>) -> ExprId {
        self.new_expr(ExprKind::MethodCall {
            method,
            qualifier: Some(qualifier),
            args,
        })
    }

    pub fn new_object(&mut self, ty: JType, args: Vec<ExprId>) -> ExprId {
        self.new_expr(ExprKind::New {
            ty,
            qualifier: None,
            args,
            initializer: None,
        })
    }

    /// `qualifier.new T(args)` for an inner class.
    pub fn new_inner(&mut self, qualifier: ExprId, ty: JType, args: Vec<ExprId>) -> ExprId {
        self.new_expr(ExprKind::New {
            ty,
            qualifier: Some(qualifier),
            args,
            initializer: None,
        })
    }

    /// `new T[n]`; `ty` is the array type, `dims` the written dimensions.
    pub fn new_array(&mut self, ty: JType, dims: Vec<ExprId>) -> ExprId {
        self.new_expr(ExprKind::New {
            ty,
            qualifier: None,
            args: dims,
            initializer: None,
        })
    }

    /// `new T[] {a, b}`.
    pub fn new_array_with(&mut self, ty: JType, elements: Vec<ExprId>) -> ExprId {
        let initializer = self.array_init(ty.clone(), elements);
        self.new_expr(ExprKind::New {
            ty,
            qualifier: None,
            args: Vec::new(),
            initializer: Some(initializer),
        })
    }

    /// Bare `{a, b}` initializer of a declaration.
    pub fn array_init(&mut self, ty: JType, elements: Vec<ExprId>) -> ExprId {
        self.new_expr(ExprKind::ArrayInit { ty, elements })
    }

    pub fn index(&mut self, array: ExprId, index: ExprId) -> ExprId {
        self.new_expr(ExprKind::ArrayAccess { array, index })
    }

    pub fn assign(&mut self, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.new_expr(ExprKind::Assign { op: None, lhs, rhs })
    }

    pub fn compound(&mut self, op: BinaryOp, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.new_expr(ExprKind::Assign {
            op: Some(op),
            lhs,
            rhs,
        })
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.polyadic(op, vec![lhs, rhs])
    }

    pub fn polyadic(&mut self, op: BinaryOp, operands: Vec<ExprId>) -> ExprId {
        if operands.len() < 2 {
            self.errors.push(format!("'{}' needs at least two operands", op.symbol()));
        }
        self.new_expr(ExprKind::Binary { op, operands })
    }

    pub fn unary(&mut self, op: UnaryOp, operand: ExprId) -> ExprId {
        self.new_expr(ExprKind::Unary { op, operand })
    }

    pub fn paren(&mut self, inner: ExprId) -> ExprId {
        self.new_expr(ExprKind::Paren { inner })
    }

    pub fn conditional(&mut self, condition: ExprId, then_expr: ExprId, else_expr: ExprId) -> ExprId {
        self.new_expr(ExprKind::Conditional {
            condition,
            then_expr,
            else_expr,
        })
    }

    pub fn cast(&mut self, ty: JType, operand: ExprId) -> ExprId {
        self.new_expr(ExprKind::Cast { ty, operand })
    }

    pub fn instance_of(&mut self, operand: ExprId, ty: JType) -> ExprId {
        self.new_expr(ExprKind::InstanceOf { operand, ty })
    }

    pub fn lambda(&mut self, ty: JType, params: &[&str], body: ExprId) -> ExprId {
        self.new_expr(ExprKind::Lambda {
            ty,
            params: params.iter().map(|s| s.to_string()).collect(),
            body,
        })
    }

    // ═══════════════════════════════════════════════════════════════════
    // Finish
    // ═══════════════════════════════════════════════════════════════════

    /// Validate nesting, print every file and return the program.
    pub fn finish(mut self) -> Result<Program> {
        if let Some(class) = &self.current_class {
            self.errors.push(format!("class '{class}' was never closed"));
        }
        if !self.errors.is_empty() {
            return Err(MigrationError::Program(self.errors.join("; ")));
        }
        printer::print_program(&mut self.program, &self.file_classes);
        Ok(self.program)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Library prelude
    // ═══════════════════════════════════════════════════════════════════

    fn lib_method(&mut self, name: &str, ret: JType, params: &[(&str, JType)]) -> DeclId {
        self.declare_method(&[], name, ret, params, false)
    }

    fn lib_static(&mut self, type_params: &[&str], name: &str, ret: JType, params: &[(&str, JType)]) -> DeclId {
        let id = self.declare_method(type_params, name, ret, params, false);
        self.set_static(id);
        id
    }

    fn install_prelude(&mut self) {
        let t = |name: &str| JType::type_param(name);
        let cls = |name: &str| JType::class(name);
        let generic = |name: &str, arg: JType| JType::generic(name, vec![arg]);
        self.current_file = LIBRARY_FILE.to_string();

        self.class("Object");
        self.lib_method("equals", JType::boolean(), &[("o", JType::object())]);
        self.lib_method("toString", JType::string(), &[]);
        self.lib_method("hashCode", JType::int(), &[]);
        self.end_class();

        self.interface("Comparable", &["T"], vec![]);
        self.lib_method("compareTo", JType::int(), &[("o", t("T"))]);
        self.end_class();

        self.interface("CharSequence", &[], vec![]);
        self.lib_method("length", JType::int(), &[]);
        self.end_class();

        self.class_with("String", &[], vec![generic("Comparable", JType::string()), cls("CharSequence")]);
        self.lib_method("length", JType::int(), &[]);
        self.lib_method("isEmpty", JType::boolean(), &[]);
        self.lib_method("trim", JType::string(), &[]);
        self.lib_method("charAt", JType::char(), &[("index", JType::int())]);
        self.lib_method("substring", JType::string(), &[("begin", JType::int())]);
        self.lib_static(&[], "valueOf", JType::string(), &[("value", JType::object())]);
        self.end_class();

        self.class("Number");
        self.lib_method("intValue", JType::int(), &[]);
        self.lib_method("longValue", JType::long(), &[]);
        self.lib_method("doubleValue", JType::double(), &[]);
        self.end_class();

        self.class_with("Integer", &[], vec![cls("Number"), generic("Comparable", cls("Integer"))]);
        self.lib_static(&[], "valueOf", cls("Integer"), &[("value", JType::int())]);
        self.lib_static(&[], "parseInt", JType::int(), &[("text", JType::string())]);
        self.end_class();

        self.class_with("Long", &[], vec![cls("Number"), generic("Comparable", cls("Long"))]);
        self.lib_static(&[], "valueOf", cls("Long"), &[("value", JType::long())]);
        self.lib_static(&[], "parseLong", JType::long(), &[("text", JType::string())]);
        self.end_class();

        self.class_with("Double", &[], vec![cls("Number"), generic("Comparable", cls("Double"))]);
        self.lib_static(&[], "valueOf", cls("Double"), &[("value", JType::double())]);
        self.end_class();

        for name in ["Float", "Short", "Byte"] {
            self.class_with(name, &[], vec![cls("Number"), generic("Comparable", cls(name))]);
            self.end_class();
        }

        self.class_with("Boolean", &[], vec![generic("Comparable", cls("Boolean"))]);
        self.lib_method("booleanValue", JType::boolean(), &[]);
        self.lib_static(&[], "valueOf", cls("Boolean"), &[("value", JType::boolean())]);
        self.end_class();

        self.class_with("Character", &[], vec![generic("Comparable", cls("Character"))]);
        self.lib_method("charValue", JType::char(), &[]);
        self.end_class();

        self.interface("Iterable", &["T"], vec![]);
        self.end_class();

        self.interface("Collection", &["E"], vec![generic("Iterable", t("E"))]);
        self.lib_method("size", JType::int(), &[]);
        self.lib_method("isEmpty", JType::boolean(), &[]);
        self.lib_method("add", JType::boolean(), &[("e", t("E"))]);
        self.lib_method("contains", JType::boolean(), &[("o", JType::object())]);
        self.end_class();

        self.interface("List", &["E"], vec![generic("Collection", t("E"))]);
        self.lib_method("get", t("E"), &[("index", JType::int())]);
        self.lib_method("set", t("E"), &[("index", JType::int()), ("e", t("E"))]);
        self.end_class();

        self.class_with("ArrayList", &["E"], vec![generic("List", t("E"))]);
        self.end_class();

        self.interface("Set", &["E"], vec![generic("Collection", t("E"))]);
        self.end_class();

        self.class_with("HashSet", &["E"], vec![generic("Set", t("E"))]);
        self.end_class();

        self.class_with("AtomicInteger", &[], vec![cls("Number")]);
        self.lib_method("get", JType::int(), &[]);
        self.lib_method("set", JType::void(), &[("value", JType::int())]);
        self.lib_method("incrementAndGet", JType::int(), &[]);
        self.lib_method("getAndIncrement", JType::int(), &[]);
        self.lib_method("addAndGet", JType::int(), &[("delta", JType::int())]);
        self.end_class();

        self.class_with("AtomicLong", &[], vec![cls("Number")]);
        self.lib_method("get", JType::long(), &[]);
        self.lib_method("set", JType::void(), &[("value", JType::long())]);
        self.lib_method("incrementAndGet", JType::long(), &[]);
        self.end_class();

        self.class_with("Optional", &["T"], vec![]);
        self.lib_method("get", t("T"), &[]);
        self.lib_method("isPresent", JType::boolean(), &[]);
        self.lib_method("orElse", t("T"), &[("other", t("T"))]);
        self.lib_static(&["U"], "of", generic("Optional", t("U")), &[("value", t("U"))]);
        self.end_class();

        self.interface("Supplier", &["T"], vec![]);
        self.lib_method("get", t("T"), &[]);
        self.end_class();

        self.interface("Runnable", &[], vec![]);
        self.lib_method("run", JType::void(), &[]);
        self.end_class();

        self.class("Arrays");
        self.lib_static(&["T"], "asList", generic("List", t("T")), &[("items", JType::varargs(t("T")))]);
        self.end_class();
    }
}

fn class_is_library(file: &str) -> bool {
    file == LIBRARY_FILE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_is_library() {
        let b = ProgramBuilder::new();
        let length = b.find_method("String", "length", 0).unwrap();
        let program = b.finish().unwrap();
        assert!(program.decl(length).library);
        assert!(program.classes().get("ArrayList").unwrap().library);
        assert_eq!(
            program.classes().as_super(&JType::generic("ArrayList", vec![JType::string()]), "Iterable"),
            Some(JType::generic("Iterable", vec![JType::string()]))
        );
    }

    #[test]
    fn test_inherited_method_lookup() {
        let b = ProgramBuilder::new();
        let size = b.find_method("ArrayList", "size", 0).unwrap();
        let equals = b.find_method("ArrayList", "equals", 1).unwrap();
        let program = b.finish().unwrap();
        assert_eq!(program.decl(size).class, "Collection");
        assert_eq!(program.decl(equals).class, "Object");
    }

    #[test]
    fn test_statement_outside_method_is_an_error() {
        let mut b = ProgramBuilder::new();
        b.file("A.java").class("A");
        let one = b.int(1);
        b.expr_stmt(one);
        b.end_class();
        assert!(b.finish().is_err());
    }

    #[test]
    fn test_unclosed_class_is_an_error() {
        let mut b = ProgramBuilder::new();
        b.file("A.java").class("A");
        assert!(b.finish().is_err());
    }
}
