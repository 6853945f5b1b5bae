//! Source printer
//!
//! Renders every non-library class as Java-like text and records, while
//! writing, the range of each node, its written type and its member name.
//! Parent links are assigned on the same walk.

use super::class_table::Member;
use super::program::{DeclId, ExprId, ExprKind, GroupId, NodeRef, Program, StmtId, StmtKind};
use super::types::JType;
use crate::shared::models::TextRange;
use indexmap::IndexMap;

const INDENT: &str = "    ";

pub(crate) fn print_program(program: &mut Program, file_classes: &IndexMap<String, Vec<String>>) {
    for (file, classes) in file_classes {
        let mut printer = Printer {
            program: &mut *program,
            file: file.clone(),
            out: String::new(),
            depth: 0,
        };
        for (i, class) in classes.iter().enumerate() {
            if i > 0 {
                printer.out.push('\n');
            }
            printer.class(class);
        }
        let text = printer.out;
        program.sources.insert(file.clone(), text);
    }
}

struct Printer<'p> {
    program: &'p mut Program,
    file: String,
    out: String,
    depth: usize,
}

impl Printer<'_> {
    fn pos(&self) -> usize {
        self.out.len()
    }

    fn push(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn newline(&mut self) {
        self.out.push('\n');
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
    }

    /// Write `ty` and return its range.
    fn ty(&mut self, ty: &JType) -> TextRange {
        let start = self.pos();
        self.push(&ty.to_string());
        TextRange::new(start, self.pos())
    }

    fn class(&mut self, name: &str) {
        let Some(class) = self.program.classes.get(name).cloned() else {
            return;
        };
        let start = self.pos();
        self.push(if class.is_interface { "interface " } else { "class " });
        self.push(&class.name);
        if !class.type_params.is_empty() {
            self.push(&format!("<{}>", class.type_params.join(", ")));
        }
        let (extends, implements): (Vec<&JType>, Vec<&JType>) = class.supers.iter().partition(|s| {
            class.is_interface
                || !s
                    .class_name()
                    .and_then(|n| self.program.classes.get(n))
                    .map(|c| c.is_interface)
                    .unwrap_or(false)
        });
        if !extends.is_empty() {
            self.push(" extends ");
            self.push(&join(&extends));
        }
        if !implements.is_empty() {
            self.push(" implements ");
            self.push(&join(&implements));
        }
        self.push(" {");
        self.depth += 1;
        for member in &class.members {
            self.newline();
            match member {
                Member::Fields(group) => self.group(*group, None),
                Member::Method(method) => self.method(*method, class.is_interface),
            }
        }
        self.depth -= 1;
        self.newline();
        self.push("}\n");
        if let Some(c) = self.program.classes.get_mut(name) {
            c.range = TextRange::new(start, self.out.len());
        }
    }

    /// `T a = init, b;` for fields and local declaration statements.
    fn group(&mut self, id: GroupId, stmt: Option<StmtId>) {
        let group = self.program.group(id).clone();
        let start = self.pos();
        let type_range = self.ty(&group.ty);
        self.push(" ");
        for (i, var) in group.vars.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            let var_start = self.pos();
            let name_range = self.name(*var);
            if let Some(init) = self.program.decl(*var).initializer() {
                self.push(" = ");
                self.expr(init, Some(NodeRef::Decl(*var)));
            }
            let decl = &mut self.program.decls[var.index()];
            decl.type_range = type_range;
            decl.name_range = name_range;
            decl.range = TextRange::new(if i == 0 { start } else { var_start }, self.out.len());
            decl.parent = stmt.map(NodeRef::Stmt);
            decl.file = self.file.clone();
        }
        self.push(";");
        let g = &mut self.program.groups[id.index()];
        g.range = TextRange::new(start, self.out.len());
        g.type_range = type_range;
        g.file = self.file.clone();
    }

    fn name(&mut self, id: DeclId) -> TextRange {
        let start = self.pos();
        let name = self.program.decl(id).name.clone();
        self.push(&name);
        TextRange::new(start, self.pos())
    }

    fn method(&mut self, id: DeclId, in_interface: bool) {
        let decl = self.program.decl(id).clone();
        let body = match &decl.kind {
            super::program::DeclKind::Method { body, .. } => *body,
            _ => None,
        };
        let start = self.pos();
        if decl.is_static {
            self.push("static ");
        }
        if body.is_none() && !in_interface {
            self.push("abstract ");
        }
        if !decl.method_type_params().is_empty() {
            self.push(&format!("<{}> ", decl.method_type_params().join(", ")));
        }
        let type_range = self.ty(&decl.ty);
        self.push(" ");
        let name_range = self.name(id);
        self.push("(");
        for (i, param) in decl.params().iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            let param_ty = self.program.decl(*param).ty.clone();
            let param_start = self.pos();
            let param_type_range = self.ty(&param_ty);
            self.push(" ");
            let param_name_range = self.name(*param);
            let p = &mut self.program.decls[param.index()];
            p.type_range = param_type_range;
            p.name_range = param_name_range;
            p.range = TextRange::new(param_start, self.out.len());
            p.parent = Some(NodeRef::Decl(id));
            p.file = self.file.clone();
        }
        self.push(")");
        match body {
            Some(block) => {
                self.push(" ");
                self.stmt(block, Some(NodeRef::Decl(id)));
            }
            None => self.push(";"),
        }
        let m = &mut self.program.decls[id.index()];
        m.type_range = type_range;
        m.name_range = name_range;
        m.range = TextRange::new(start, self.out.len());
        m.file = self.file.clone();
    }

    fn stmt(&mut self, id: StmtId, parent: Option<NodeRef>) {
        let kind = self.program.stmt(id).kind.clone();
        let me = Some(NodeRef::Stmt(id));
        let start = self.pos();
        match kind {
            StmtKind::LocalDecl { group } => self.group(group, Some(id)),
            StmtKind::Expression { expr } => {
                self.expr(expr, me);
                self.push(";");
            }
            StmtKind::Return { value } => {
                self.push("return");
                if let Some(v) = value {
                    self.push(" ");
                    self.expr(v, me);
                }
                self.push(";");
            }
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.push("if (");
                self.expr(condition, me);
                self.push(") ");
                self.stmt(then_branch, me);
                if let Some(e) = else_branch {
                    self.push(" else ");
                    self.stmt(e, me);
                }
            }
            StmtKind::While { condition, body } => {
                self.push("while (");
                self.expr(condition, me);
                self.push(") ");
                self.stmt(body, me);
            }
            StmtKind::ForEach {
                variable,
                iterable,
                body,
            } => {
                self.push("for (");
                let var_ty = self.program.decl(variable).ty.clone();
                let var_start = self.pos();
                let type_range = self.ty(&var_ty);
                self.push(" ");
                let name_range = self.name(variable);
                let v = &mut self.program.decls[variable.index()];
                v.type_range = type_range;
                v.name_range = name_range;
                v.range = TextRange::new(var_start, self.out.len());
                v.parent = me;
                v.file = self.file.clone();
                self.push(" : ");
                self.expr(iterable, me);
                self.push(") ");
                self.stmt(body, me);
            }
            StmtKind::Block { statements } => {
                self.push("{");
                self.depth += 1;
                for s in statements {
                    self.newline();
                    self.stmt(s, me);
                }
                self.depth -= 1;
                self.newline();
                self.push("}");
            }
        }
        let s = &mut self.program.stmts[id.index()];
        s.range = TextRange::new(start, self.out.len());
        s.parent = parent;
        s.file = self.file.clone();
    }

    fn exprs(&mut self, ids: &[ExprId], parent: Option<NodeRef>) {
        for (i, id) in ids.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.expr(*id, parent);
        }
    }

    fn expr(&mut self, id: ExprId, parent: Option<NodeRef>) {
        let kind = self.program.expr(id).kind.clone();
        let me = Some(NodeRef::Expr(id));
        let start = self.pos();
        let mut type_range = None;
        let mut name_range = None;
        match kind {
            ExprKind::Literal { text, .. } => self.push(&text),
            ExprKind::Reference { target, qualifier } => {
                if let Some(q) = qualifier {
                    self.expr(q, me);
                    self.push(".");
                }
                name_range = Some(self.name(target));
            }
            ExprKind::MethodCall {
                method,
                qualifier,
                args,
            } => {
                let decl = self.program.decl(method);
                let static_prefix = (decl.is_static && decl.library).then(|| decl.class.clone());
                if let Some(q) = qualifier {
                    self.expr(q, me);
                    self.push(".");
                } else if let Some(class) = static_prefix {
                    self.push(&class);
                    self.push(".");
                }
                name_range = Some(self.name(method));
                self.push("(");
                self.exprs(&args, me);
                self.push(")");
            }
            ExprKind::New {
                ty,
                qualifier,
                args,
                initializer,
            } => {
                if let Some(q) = qualifier {
                    self.expr(q, me);
                    self.push(".");
                }
                self.push("new ");
                match (&ty, initializer) {
                    (JType::Array(_), Some(init)) => {
                        type_range = Some(self.ty(&ty));
                        self.push(" ");
                        self.expr(init, me);
                    }
                    (JType::Array(_), None) => {
                        type_range = Some(self.ty(ty.deep_component()));
                        let mut depth = 0;
                        let mut current = &ty;
                        while let Some(c) = current.component() {
                            depth += 1;
                            current = c;
                        }
                        for dim in &args {
                            self.push("[");
                            self.expr(*dim, me);
                            self.push("]");
                        }
                        for _ in args.len()..depth {
                            self.push("[]");
                        }
                    }
                    _ => {
                        type_range = Some(self.ty(&ty));
                        self.push("(");
                        self.exprs(&args, me);
                        self.push(")");
                    }
                }
            }
            ExprKind::ArrayInit { elements, .. } => {
                self.push("{");
                self.exprs(&elements, me);
                self.push("}");
            }
            ExprKind::ArrayAccess { array, index } => {
                self.expr(array, me);
                self.push("[");
                self.expr(index, me);
                self.push("]");
            }
            ExprKind::Assign { op, lhs, rhs } => {
                self.expr(lhs, me);
                match op {
                    Some(op) => self.push(&format!(" {}= ", op.symbol())),
                    None => self.push(" = "),
                }
                self.expr(rhs, me);
            }
            ExprKind::Binary { op, operands } => {
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        self.push(&format!(" {} ", op.symbol()));
                    }
                    self.expr(*operand, me);
                }
            }
            ExprKind::Unary { op, operand } => {
                if op.is_postfix() {
                    self.expr(operand, me);
                    self.push(op.symbol());
                } else {
                    self.push(op.symbol());
                    self.expr(operand, me);
                }
            }
            ExprKind::Paren { inner } => {
                self.push("(");
                self.expr(inner, me);
                self.push(")");
            }
            ExprKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                self.expr(condition, me);
                self.push(" ? ");
                self.expr(then_expr, me);
                self.push(" : ");
                self.expr(else_expr, me);
            }
            ExprKind::Cast { ty, operand } => {
                self.push("(");
                type_range = Some(self.ty(&ty));
                self.push(") ");
                self.expr(operand, me);
            }
            ExprKind::InstanceOf { operand, ty } => {
                self.expr(operand, me);
                self.push(" instanceof ");
                type_range = Some(self.ty(&ty));
            }
            ExprKind::Lambda { params, body, .. } => {
                if params.len() == 1 {
                    self.push(&params[0]);
                } else {
                    self.push(&format!("({})", params.join(", ")));
                }
                self.push(" -> ");
                self.expr(body, me);
            }
        }
        let e = &mut self.program.exprs[id.index()];
        e.range = TextRange::new(start, self.out.len());
        e.type_range = type_range;
        e.name_range = name_range;
        e.parent = parent;
        e.file = self.file.clone();
    }
}

fn join(types: &[&JType]) -> String {
    types.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::super::builder::ProgramBuilder;
    use super::super::program::{BinaryOp, ElementRef};
    use super::*;

    #[test]
    fn test_prints_class_with_ranges() {
        let mut b = ProgramBuilder::new();
        b.file("Demo.java").class("Demo");
        let count = b.field("count", JType::int(), None);
        b.method("run", JType::void(), &[]);
        let target = b.var(count);
        let one = b.int(1);
        let two = b.int(2);
        let sum = b.binary(BinaryOp::Add, one, two);
        let assign = b.assign(target, sum);
        b.expr_stmt(assign);
        b.end_method().end_class();
        let program = b.finish().unwrap();

        let text = program.source("Demo.java").unwrap();
        assert_eq!(
            text,
            "class Demo {\n    int count;\n    void run() {\n        count = 1 + 2;\n    }\n}\n"
        );
        assert_eq!(program.expr_text(assign), "count = 1 + 2");
        assert_eq!(program.expr_text(sum), "1 + 2");
        let decl = program.decl(count);
        assert_eq!(program.text("Demo.java", decl.type_range), "int");
        assert_eq!(program.describe(ElementRef::Decl(count)), "Demo.count");
    }

    #[test]
    fn test_parents_are_linked() {
        let mut b = ProgramBuilder::new();
        b.file("A.java").class("A");
        let m = b.method("f", JType::int(), &[("p", JType::int())]);
        let p = b.param(m, 0);
        let read = b.var(p);
        let local = b.local("x", JType::int(), Some(read));
        let x = b.var(local);
        let ret = b.ret(Some(x));
        b.end_method().end_class();
        let program = b.finish().unwrap();

        assert_eq!(program.enclosing_method(NodeRef::Expr(read)), Some(m));
        assert_eq!(program.return_statements(m), vec![ret]);
        assert_eq!(program.qualified_name(local), "A.f.x");
        assert_eq!(program.qualified_name(p), "A.f.p");
    }

    #[test]
    fn test_interface_and_implements() {
        let mut b = ProgramBuilder::new();
        b.file("Shapes.java");
        b.interface("Shape", &[], vec![]);
        b.abstract_method("area", JType::double(), &[]);
        b.end_class();
        b.class_with("Square", &[], vec![JType::class("Shape")]);
        b.end_class();
        let program = b.finish().unwrap();
        let text = program.source("Shapes.java").unwrap();
        assert!(text.contains("interface Shape {\n    double area();\n}"));
        assert!(text.contains("class Square implements Shape {"));
    }
}
