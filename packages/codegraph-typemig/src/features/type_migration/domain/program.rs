//! Program arena
//!
//! Declarations, expressions and statements live in flat vectors and refer to
//! each other through copyable ids. Every node knows its parent, its file and
//! its text range in the printed source, so the engine can navigate upward
//! (to the enclosing statement or method) and the editor can locate text.

use super::class_table::ClassTable;
use super::types::JType;
use super::typing::{self, TypeEnv};
use crate::errors::{MigrationError, Result};
use crate::shared::models::TextRange;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

macro_rules! arena_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

arena_id!(DeclId, "decl");
arena_id!(ExprId, "expr");
arena_id!(StmtId, "stmt");
arena_id!(GroupId, "group");

/// A program element whose type can change: a declaration or an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementRef {
    Decl(DeclId),
    Expr(ExprId),
}

impl ElementRef {
    pub fn as_decl(self) -> Option<DeclId> {
        match self {
            ElementRef::Decl(id) => Some(id),
            ElementRef::Expr(_) => None,
        }
    }

    pub fn as_expr(self) -> Option<ExprId> {
        match self {
            ElementRef::Expr(id) => Some(id),
            ElementRef::Decl(_) => None,
        }
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementRef::Decl(id) => write!(f, "{id}"),
            ElementRef::Expr(id) => write!(f, "{id}"),
        }
    }
}

/// Any node of the arena, used for parent links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeRef {
    Decl(DeclId),
    Expr(ExprId),
    Stmt(StmtId),
}

/// The unit the statement processor visits for a usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VisitTarget {
    Stmt(StmtId),
    /// A field declaration together with its initializer.
    Field(DeclId),
    /// The condition of an `if` or `while`, visited alone.
    Condition(ExprId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    UShr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitOr,
    BitXor,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::PreInc | UnaryOp::PostInc => "++",
            UnaryOp::PreDec | UnaryOp::PostDec => "--",
        }
    }

    pub fn is_postfix(&self) -> bool {
        matches!(self, UnaryOp::PostInc | UnaryOp::PostDec)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeclKind {
    Field {
        group: GroupId,
        initializer: Option<ExprId>,
    },
    Local {
        /// `None` for the variable of an enhanced `for`.
        group: Option<GroupId>,
        initializer: Option<ExprId>,
    },
    Parameter {
        method: DeclId,
        index: usize,
    },
    Method {
        params: Vec<DeclId>,
        type_params: Vec<String>,
        /// `None` for abstract and interface methods.
        body: Option<StmtId>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decl {
    pub name: String,
    /// Declared type; the return type for methods.
    pub ty: JType,
    pub kind: DeclKind,
    /// Declaring class.
    pub class: String,
    pub file: String,
    pub library: bool,
    pub is_static: bool,
    pub range: TextRange,
    pub type_range: TextRange,
    pub name_range: TextRange,
    pub parent: Option<NodeRef>,
}

impl Decl {
    pub fn is_method(&self) -> bool {
        matches!(self.kind, DeclKind::Method { .. })
    }

    pub fn is_field(&self) -> bool {
        matches!(self.kind, DeclKind::Field { .. })
    }

    pub fn is_local(&self) -> bool {
        matches!(self.kind, DeclKind::Local { .. })
    }

    pub fn is_parameter(&self) -> bool {
        matches!(self.kind, DeclKind::Parameter { .. })
    }

    pub fn initializer(&self) -> Option<ExprId> {
        match &self.kind {
            DeclKind::Field { initializer, .. } | DeclKind::Local { initializer, .. } => *initializer,
            _ => None,
        }
    }

    pub fn group(&self) -> Option<GroupId> {
        match &self.kind {
            DeclKind::Field { group, .. } => Some(*group),
            DeclKind::Local { group, .. } => *group,
            _ => None,
        }
    }

    pub fn params(&self) -> &[DeclId] {
        match &self.kind {
            DeclKind::Method { params, .. } => params,
            _ => &[],
        }
    }

    pub fn method_type_params(&self) -> &[String] {
        match &self.kind {
            DeclKind::Method { type_params, .. } => type_params,
            _ => &[],
        }
    }
}

/// Variables declared by one declaration statement, sharing one type node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclGroup {
    pub ty: JType,
    pub vars: Vec<DeclId>,
    pub file: String,
    pub range: TextRange,
    pub type_range: TextRange,
    /// Owning statement for locals; `None` for fields.
    pub stmt: Option<StmtId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Literal {
        text: String,
        ty: JType,
    },
    Reference {
        target: DeclId,
        qualifier: Option<ExprId>,
    },
    MethodCall {
        method: DeclId,
        qualifier: Option<ExprId>,
        args: Vec<ExprId>,
    },
    New {
        ty: JType,
        qualifier: Option<ExprId>,
        args: Vec<ExprId>,
        initializer: Option<ExprId>,
    },
    ArrayInit {
        ty: JType,
        elements: Vec<ExprId>,
    },
    ArrayAccess {
        array: ExprId,
        index: ExprId,
    },
    /// `op` is `Some` for compound assignments (`+=`).
    Assign {
        op: Option<BinaryOp>,
        lhs: ExprId,
        rhs: ExprId,
    },
    /// Binary and polyadic expressions share one shape.
    Binary {
        op: BinaryOp,
        operands: Vec<ExprId>,
    },
    Unary {
        op: UnaryOp,
        operand: ExprId,
    },
    Paren {
        inner: ExprId,
    },
    Conditional {
        condition: ExprId,
        then_expr: ExprId,
        else_expr: ExprId,
    },
    Cast {
        ty: JType,
        operand: ExprId,
    },
    InstanceOf {
        operand: ExprId,
        ty: JType,
    },
    Lambda {
        ty: JType,
        params: Vec<String>,
        body: ExprId,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub file: String,
    pub range: TextRange,
    /// Range of the written type for `new`, casts and instanceof.
    pub type_range: Option<TextRange>,
    /// Range of the member name for references and calls.
    pub name_range: Option<TextRange>,
    pub parent: Option<NodeRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    LocalDecl {
        group: GroupId,
    },
    Expression {
        expr: ExprId,
    },
    Return {
        value: Option<ExprId>,
    },
    If {
        condition: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
    },
    While {
        condition: ExprId,
        body: StmtId,
    },
    ForEach {
        variable: DeclId,
        iterable: ExprId,
        body: StmtId,
    },
    Block {
        statements: Vec<StmtId>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub file: String,
    pub range: TextRange,
    pub parent: Option<NodeRef>,
}

/// Set of files a migration may touch. The default covers the whole program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationScope {
    files: Option<BTreeSet<String>>,
}

impl MigrationScope {
    pub fn whole_program() -> Self {
        Self::default()
    }

    pub fn files<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            files: Some(files.into_iter().map(Into::into).collect()),
        }
    }

    pub fn contains(&self, file: &str) -> bool {
        self.files.as_ref().map(|f| f.contains(file)).unwrap_or(true)
    }
}

/// A resolved host program: class table, node arena and printed sources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub(crate) classes: ClassTable,
    pub(crate) decls: Vec<Decl>,
    pub(crate) exprs: Vec<Expr>,
    pub(crate) stmts: Vec<Stmt>,
    pub(crate) groups: Vec<DeclGroup>,
    pub(crate) sources: IndexMap<String, String>,
}

impl Program {
    pub fn classes(&self) -> &ClassTable {
        &self.classes
    }

    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id.index()]
    }

    pub fn try_decl(&self, id: DeclId) -> Option<&Decl> {
        self.decls.get(id.index())
    }

    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    pub fn try_expr(&self, id: ExprId) -> Option<&Expr> {
        self.exprs.get(id.index())
    }

    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }

    pub fn group(&self, id: GroupId) -> &DeclGroup {
        &self.groups[id.index()]
    }

    pub fn decls(&self) -> impl Iterator<Item = (DeclId, &Decl)> {
        self.decls.iter().enumerate().map(|(i, d)| (DeclId(i as u32), d))
    }

    pub fn exprs(&self) -> impl Iterator<Item = (ExprId, &Expr)> {
        self.exprs.iter().enumerate().map(|(i, e)| (ExprId(i as u32), e))
    }

    pub fn contains_element(&self, element: ElementRef) -> bool {
        match element {
            ElementRef::Decl(id) => id.index() < self.decls.len(),
            ElementRef::Expr(id) => id.index() < self.exprs.len(),
        }
    }

    /// Load a snapshot written by [`Program::to_json`]. Every id must resolve.
    pub fn from_json(text: &str) -> Result<Program> {
        let program: Program = serde_json::from_str(text)?;
        program.check_links()?;
        Ok(program)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn check_links(&self) -> Result<()> {
        let decl = |id: DeclId| id.index() < self.decls.len();
        let expr = |id: ExprId| id.index() < self.exprs.len();
        let stmt = |id: StmtId| id.index() < self.stmts.len();
        let group = |id: GroupId| id.index() < self.groups.len();
        let node = |n: Option<NodeRef>| match n {
            None => true,
            Some(NodeRef::Decl(id)) => decl(id),
            Some(NodeRef::Expr(id)) => expr(id),
            Some(NodeRef::Stmt(id)) => stmt(id),
        };
        let broken = |what: String| Err(MigrationError::program(format!("dangling reference in {what}")));

        for (i, d) in self.decls.iter().enumerate() {
            let ok = node(d.parent)
                && match &d.kind {
                    DeclKind::Field { group: g, initializer } => group(*g) && initializer.map_or(true, expr),
                    DeclKind::Local { group: g, initializer } => {
                        g.map_or(true, group) && initializer.map_or(true, expr)
                    }
                    DeclKind::Parameter { method, .. } => decl(*method),
                    DeclKind::Method { params, body, .. } => {
                        params.iter().all(|p| decl(*p)) && body.map_or(true, stmt)
                    }
                };
            if !ok {
                return broken(format!("declaration {}", DeclId(i as u32)));
            }
        }
        for (i, e) in self.exprs.iter().enumerate() {
            let id = ExprId(i as u32);
            let member_ok = match &e.kind {
                ExprKind::Reference { target, .. } => decl(*target),
                ExprKind::MethodCall { method, .. } => decl(*method),
                _ => true,
            };
            let children_ok = member_ok && {
                let children = child_exprs(&e.kind);
                children.into_iter().all(expr)
            };
            if !(children_ok && node(e.parent)) {
                return broken(format!("expression {id}"));
            }
        }
        for (i, s) in self.stmts.iter().enumerate() {
            let ok = node(s.parent)
                && match &s.kind {
                    StmtKind::LocalDecl { group: g } => group(*g),
                    StmtKind::Expression { expr: e } => expr(*e),
                    StmtKind::Return { value } => value.map_or(true, expr),
                    StmtKind::If {
                        condition,
                        then_branch,
                        else_branch,
                    } => expr(*condition) && stmt(*then_branch) && else_branch.map_or(true, stmt),
                    StmtKind::While { condition, body } => expr(*condition) && stmt(*body),
                    StmtKind::ForEach {
                        variable,
                        iterable,
                        body,
                    } => decl(*variable) && expr(*iterable) && stmt(*body),
                    StmtKind::Block { statements } => statements.iter().all(|s| stmt(*s)),
                };
            if !ok {
                return broken(format!("statement {}", StmtId(i as u32)));
            }
        }
        for (i, g) in self.groups.iter().enumerate() {
            if !(g.vars.iter().all(|v| decl(*v)) && g.stmt.map_or(true, stmt)) {
                return broken(format!("declaration group {}", GroupId(i as u32)));
            }
        }
        Ok(())
    }

    pub fn sources(&self) -> &IndexMap<String, String> {
        &self.sources
    }

    pub fn source(&self, file: &str) -> Option<&str> {
        self.sources.get(file).map(String::as_str)
    }

    pub fn text(&self, file: &str, range: TextRange) -> &str {
        self.source(file)
            .and_then(|s| s.get(range.start..range.end))
            .unwrap_or("")
    }

    pub fn expr_text(&self, id: ExprId) -> &str {
        let expr = self.expr(id);
        self.text(&expr.file, expr.range)
    }

    /// `Class.member` for fields and methods, `Class.method.name` for
    /// parameters and locals.
    pub fn qualified_name(&self, id: DeclId) -> String {
        let decl = self.decl(id);
        match &decl.kind {
            DeclKind::Field { .. } | DeclKind::Method { .. } => format!("{}.{}", decl.class, decl.name),
            DeclKind::Parameter { method, .. } => {
                format!("{}.{}", self.qualified_name(*method), decl.name)
            }
            DeclKind::Local { .. } => match self.enclosing_method(NodeRef::Decl(id)) {
                Some(m) => format!("{}.{}", self.qualified_name(m), decl.name),
                None => format!("{}.{}", decl.class, decl.name),
            },
        }
    }

    /// Resolve a qualified name produced by [`Program::qualified_name`].
    /// User declarations win over library ones.
    pub fn find_decl(&self, qualified: &str) -> Option<DeclId> {
        let mut library_hit = None;
        for (id, decl) in self.decls() {
            if decl.name != qualified.rsplit('.').next().unwrap_or(qualified) {
                continue;
            }
            if self.qualified_name(id) == qualified {
                if !decl.library {
                    return Some(id);
                }
                library_hit.get_or_insert(id);
            }
        }
        library_hit
    }

    /// Methods named `name` declared directly in `class`.
    pub fn methods_named(&self, class: &str, name: &str) -> Vec<DeclId> {
        self.classes
            .get(class)
            .map(|c| {
                c.methods()
                    .filter(|m| self.decl(*m).name == name)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Method `name` with `arity` parameters declared in `class` or inherited.
    pub fn find_method(&self, class: &str, name: &str, arity: usize) -> Option<DeclId> {
        std::iter::once(class.to_string())
            .chain(self.classes.supertypes_of(class))
            .chain(std::iter::once("Object".to_string()))
            .find_map(|c| {
                self.methods_named(&c, name)
                    .into_iter()
                    .find(|m| self.decl(*m).params().len() == arity)
            })
    }

    /// Field `name` declared in `class` or inherited.
    pub fn find_field(&self, class: &str, name: &str) -> Option<DeclId> {
        std::iter::once(class.to_string())
            .chain(self.classes.supertypes_of(class))
            .find_map(|c| {
                let decl = self.classes.get(&c)?;
                decl.members.iter().find_map(|m| match m {
                    super::class_table::Member::Fields(g) => self
                        .group(*g)
                        .vars
                        .iter()
                        .copied()
                        .find(|v| self.decl(*v).name == name),
                    super::class_table::Member::Method(_) => None,
                })
            })
    }

    /// Type parameters in scope for a member: those of its class, plus the
    /// method's own for methods and their parameters.
    pub fn type_params_in_scope(&self, id: DeclId) -> Vec<String> {
        let decl = self.decl(id);
        let mut out: Vec<String> = self
            .classes
            .get(&decl.class)
            .map(|c| c.type_params.clone())
            .unwrap_or_default();
        let method = match &decl.kind {
            DeclKind::Method { .. } => Some(id),
            DeclKind::Parameter { method, .. } => Some(*method),
            _ => self.enclosing_method(NodeRef::Decl(id)),
        };
        if let Some(m) = method {
            out.extend(self.decl(m).method_type_params().iter().cloned());
        }
        out
    }

    pub fn describe(&self, element: ElementRef) -> String {
        match element {
            ElementRef::Decl(id) => self.qualified_name(id),
            ElementRef::Expr(id) => self.expr_text(id).to_string(),
        }
    }

    /// File and range of an element's text.
    pub fn element_range(&self, element: ElementRef) -> (&str, TextRange) {
        match element {
            ElementRef::Decl(id) => {
                let d = self.decl(id);
                (&d.file, d.range)
            }
            ElementRef::Expr(id) => {
                let e = self.expr(id);
                (&e.file, e.range)
            }
        }
    }

    pub fn parent_of(&self, node: NodeRef) -> Option<NodeRef> {
        match node {
            NodeRef::Decl(id) => self.decl(id).parent,
            NodeRef::Expr(id) => self.expr(id).parent,
            NodeRef::Stmt(id) => self.stmt(id).parent,
        }
    }

    /// Direct sub-expressions in evaluation order.
    pub fn children(&self, id: ExprId) -> Vec<ExprId> {
        child_exprs(&self.expr(id).kind)
    }

    /// Strip redundant parentheses.
    pub fn skip_parens(&self, mut id: ExprId) -> ExprId {
        while let ExprKind::Paren { inner } = &self.expr(id).kind {
            id = *inner;
        }
        id
    }

    pub fn is_null_literal(&self, id: ExprId) -> bool {
        matches!(&self.expr(self.skip_parens(id)).kind, ExprKind::Literal { ty: JType::Null, .. })
    }

    /// Declaration a reference or call resolves to.
    pub fn resolved_member(&self, id: ExprId) -> Option<DeclId> {
        match &self.expr(id).kind {
            ExprKind::Reference { target, .. } => Some(*target),
            ExprKind::MethodCall { method, .. } => Some(*method),
            _ => None,
        }
    }

    pub fn qualifier(&self, id: ExprId) -> Option<ExprId> {
        match &self.expr(id).kind {
            ExprKind::Reference { qualifier, .. }
            | ExprKind::MethodCall { qualifier, .. }
            | ExprKind::New { qualifier, .. } => *qualifier,
            _ => None,
        }
    }

    pub fn enclosing_method(&self, node: NodeRef) -> Option<DeclId> {
        let mut current = self.parent_of(node);
        while let Some(n) = current {
            if let NodeRef::Decl(id) = n {
                if self.decl(id).is_method() {
                    return Some(id);
                }
            }
            current = self.parent_of(n);
        }
        None
    }

    /// True when `node` sits inside a lambda body.
    pub fn inside_lambda(&self, node: NodeRef) -> bool {
        let mut current = self.parent_of(node);
        while let Some(n) = current {
            if let NodeRef::Expr(id) = n {
                if matches!(self.expr(id).kind, ExprKind::Lambda { .. }) {
                    return true;
                }
            }
            current = self.parent_of(n);
        }
        false
    }

    /// Unit to visit when `expr` changes: the innermost statement holding it,
    /// narrowed to the condition for `if`/`while`, or the field it initializes.
    pub fn containing_target(&self, expr: ExprId) -> Option<VisitTarget> {
        let mut child = NodeRef::Expr(expr);
        let mut current = self.parent_of(child);
        while let Some(node) = current {
            match node {
                NodeRef::Stmt(id) => {
                    return Some(match &self.stmt(id).kind {
                        StmtKind::If { condition, .. } | StmtKind::While { condition, .. }
                            if child == NodeRef::Expr(*condition) =>
                        {
                            VisitTarget::Condition(*condition)
                        }
                        _ => VisitTarget::Stmt(id),
                    });
                }
                NodeRef::Decl(id) if self.decl(id).is_field() => return Some(VisitTarget::Field(id)),
                _ => {}
            }
            child = node;
            current = self.parent_of(node);
        }
        None
    }

    /// Unit holding the declaration of a variable.
    pub fn declaration_target(&self, id: DeclId) -> Option<VisitTarget> {
        let decl = self.decl(id);
        match &decl.kind {
            DeclKind::Field { .. } => Some(VisitTarget::Field(id)),
            DeclKind::Local { .. } => match decl.parent {
                Some(NodeRef::Stmt(stmt)) => Some(VisitTarget::Stmt(stmt)),
                _ => None,
            },
            _ => None,
        }
    }

    /// `return` statements of a method body, nested blocks included.
    pub fn return_statements(&self, method: DeclId) -> Vec<StmtId> {
        let mut out = Vec::new();
        if let DeclKind::Method { body: Some(body), .. } = &self.decl(method).kind {
            self.collect_returns(*body, &mut out);
        }
        out
    }

    fn collect_returns(&self, id: StmtId, out: &mut Vec<StmtId>) {
        match &self.stmt(id).kind {
            StmtKind::Return { .. } => out.push(id),
            StmtKind::Block { statements } => statements.iter().for_each(|s| self.collect_returns(*s, out)),
            StmtKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                self.collect_returns(*then_branch, out);
                if let Some(e) = else_branch {
                    self.collect_returns(*e, out);
                }
            }
            StmtKind::While { body, .. } | StmtKind::ForEach { body, .. } => self.collect_returns(*body, out),
            StmtKind::LocalDecl { .. } | StmtKind::Expression { .. } => {}
        }
    }

    /// Declared type of the slot `expr` flows into, used for `null` literals.
    pub fn expected_type(&self, expr: ExprId) -> Option<JType> {
        let parent = self.expr(expr).parent?;
        match parent {
            NodeRef::Decl(d) => Some(self.decl(d).ty.clone()),
            NodeRef::Expr(p) => match &self.expr(p).kind {
                ExprKind::Assign { lhs, rhs, .. } if *rhs == expr => self.static_type(*lhs),
                ExprKind::MethodCall { method, args, .. } => {
                    let index = args.iter().position(|a| *a == expr)?;
                    let params = self.decl(*method).params();
                    let param = params.get(index).or_else(|| params.last())?;
                    let ty = &self.decl(*param).ty;
                    Some(ty.component().filter(|_| ty.is_varargs()).cloned().unwrap_or_else(|| ty.clone()))
                }
                ExprKind::Paren { .. } => self.expected_type(p),
                _ => None,
            },
            NodeRef::Stmt(s) => match &self.stmt(s).kind {
                StmtKind::Return { .. } => self
                    .enclosing_method(NodeRef::Stmt(s))
                    .map(|m| self.decl(m).ty.clone()),
                _ => None,
            },
        }
    }

    /// Type of `expr` under the declared types, before any migration.
    pub fn static_type(&self, expr: ExprId) -> Option<JType> {
        typing::evaluate(self, self, None, expr)
    }
}

impl TypeEnv for Program {
    fn declared_type(&self, decl: DeclId) -> JType {
        self.decl(decl).ty.clone()
    }
}

/// Direct sub-expressions of an expression of `kind`.
fn child_exprs(kind: &ExprKind) -> Vec<ExprId> {
    match kind {
        ExprKind::Literal { .. } => Vec::new(),
        ExprKind::Reference { qualifier, .. } => qualifier.iter().copied().collect(),
        ExprKind::MethodCall { qualifier, args, .. } => {
            qualifier.iter().chain(args.iter()).copied().collect()
        }
        ExprKind::New {
            qualifier,
            args,
            initializer,
            ..
        } => qualifier
            .iter()
            .chain(args.iter())
            .chain(initializer.iter())
            .copied()
            .collect(),
        ExprKind::ArrayInit { elements, .. } => elements.clone(),
        ExprKind::ArrayAccess { array, index } => vec![*array, *index],
        ExprKind::Assign { lhs, rhs, .. } => vec![*lhs, *rhs],
        ExprKind::Binary { operands, .. } => operands.clone(),
        ExprKind::Unary { operand, .. } => vec![*operand],
        ExprKind::Paren { inner } => vec![*inner],
        ExprKind::Conditional {
            condition,
            then_expr,
            else_expr,
        } => vec![*condition, *then_expr, *else_expr],
        ExprKind::Cast { operand, .. } | ExprKind::InstanceOf { operand, .. } => vec![*operand],
        ExprKind::Lambda { body, .. } => vec![*body],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_defaults_to_everything() {
        let scope = MigrationScope::whole_program();
        assert!(scope.contains("A.java"));
        let narrow = MigrationScope::files(["A.java"]);
        assert!(narrow.contains("A.java"));
        assert!(!narrow.contains("B.java"));
    }

    #[test]
    fn test_json_snapshot_checks_links() {
        let mut b = super::super::ProgramBuilder::new();
        b.file("A.java").class("A");
        b.field("x", JType::int(), None);
        b.end_class();
        let program = b.finish().unwrap();
        let json = program.to_json().unwrap();
        assert_eq!(Program::from_json(&json).unwrap(), program);

        let mut broken = program.clone();
        broken.groups.clear();
        let json = broken.to_json().unwrap();
        assert!(matches!(Program::from_json(&json), Err(MigrationError::Program(_))));
        assert!(matches!(Program::from_json("{"), Err(MigrationError::Json(_))));
    }

    #[test]
    fn test_element_ordering_is_total() {
        let mut items = vec![
            ElementRef::Expr(ExprId(1)),
            ElementRef::Decl(DeclId(3)),
            ElementRef::Decl(DeclId(1)),
        ];
        items.sort();
        assert_eq!(
            items,
            vec![
                ElementRef::Decl(DeclId(1)),
                ElementRef::Decl(DeclId(3)),
                ElementRef::Expr(ExprId(1)),
            ]
        );
    }
}
