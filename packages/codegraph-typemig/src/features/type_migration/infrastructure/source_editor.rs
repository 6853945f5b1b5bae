//! Text editor over the printed program
//!
//! Edits are addressed with ranges of the original text. Each file buffer
//! remembers the spans already replaced, so later ranges are shifted by the
//! length changes before them, and an edit enclosing earlier edits swallows
//! them. Edits that cut through an earlier edit are rejected.
//!
//! Everything is staged until `commit`; `rollback` drops the staged batch.

use crate::errors::EditError;
use crate::features::type_migration::domain::{DeclId, ExprId, ExprKind, GroupId, JType, Program, StmtId};
use crate::features::type_migration::ports::{SyntaxEditor, TypeSite};
use crate::shared::models::TextRange;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One applied replacement, in original coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRecord {
    pub file: String,
    pub range: TextRange,
    pub text: String,
}

#[derive(Debug, Clone, Copy)]
struct AppliedSpan {
    range: TextRange,
    delta: isize,
}

#[derive(Debug, Clone)]
struct FileBuffer {
    text: String,
    spans: Vec<AppliedSpan>,
}

impl FileBuffer {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            spans: Vec::new(),
        }
    }

    /// Current offset of an original offset.
    fn map(&self, offset: usize) -> usize {
        let shift: isize = self
            .spans
            .iter()
            .filter(|s| s.range.end <= offset)
            .map(|s| s.delta)
            .sum();
        (offset as isize + shift).max(0) as usize
    }

    /// An earlier edit `range` cuts through.
    fn conflict(&self, range: TextRange) -> Option<TextRange> {
        self.spans
            .iter()
            .find(|s| s.range.overlaps(&range) && !range.contains(&s.range))
            .map(|s| s.range)
    }

    fn current(&self, file: &str, range: TextRange) -> Result<String, EditError> {
        if let Some(applied) = self.conflict(range) {
            return Err(EditError::Overlap {
                file: file.to_string(),
                range,
                applied,
            });
        }
        let (start, end) = (self.map(range.start), self.map(range.end));
        self.text
            .get(start..end)
            .map(str::to_string)
            .ok_or_else(|| EditError::OutOfBounds {
                file: file.to_string(),
                range,
            })
    }
}

pub struct SourceEditor<'p> {
    program: &'p Program,
    committed: IndexMap<String, FileBuffer>,
    staged: IndexMap<String, FileBuffer>,
    staged_log: Vec<EditRecord>,
    committed_log: Vec<EditRecord>,
}

impl<'p> SourceEditor<'p> {
    pub fn new(program: &'p Program) -> Self {
        let committed = program
            .sources()
            .iter()
            .map(|(file, text)| (file.clone(), FileBuffer::new(text)))
            .collect();
        Self {
            program,
            committed,
            staged: IndexMap::new(),
            staged_log: Vec::new(),
            committed_log: Vec::new(),
        }
    }

    /// Committed text of `file`.
    pub fn text(&self, file: &str) -> Option<&str> {
        self.committed.get(file).map(|b| b.text.as_str())
    }

    /// Committed edits in application order.
    pub fn edits(&self) -> &[EditRecord] {
        &self.committed_log
    }

    /// Edits staged since the last commit.
    pub fn pending(&self) -> &[EditRecord] {
        &self.staged_log
    }

    /// Committed text of every file.
    pub fn into_sources(self) -> IndexMap<String, String> {
        self.committed.into_iter().map(|(file, b)| (file, b.text)).collect()
    }

    fn buffer(&self, file: &str) -> Result<&FileBuffer, EditError> {
        self.staged
            .get(file)
            .or_else(|| self.committed.get(file))
            .ok_or_else(|| EditError::UnknownFile(file.to_string()))
    }

    fn current_text(&self, file: &str, range: TextRange) -> Result<String, EditError> {
        self.buffer(file)?.current(file, range)
    }

    fn apply(&mut self, file: &str, range: TextRange, text: &str) -> Result<(), EditError> {
        let original_len = self
            .program
            .source(file)
            .map(str::len)
            .ok_or_else(|| EditError::UnknownFile(file.to_string()))?;
        if range.start > range.end || range.end > original_len {
            return Err(EditError::OutOfBounds {
                file: file.to_string(),
                range,
            });
        }
        if !self.staged.contains_key(file) {
            let base = self
                .committed
                .get(file)
                .cloned()
                .ok_or_else(|| EditError::UnknownFile(file.to_string()))?;
            self.staged.insert(file.to_string(), base);
        }
        let buffer = self
            .staged
            .get_mut(file)
            .ok_or_else(|| EditError::UnknownFile(file.to_string()))?;
        if let Some(applied) = buffer.conflict(range) {
            return Err(EditError::Overlap {
                file: file.to_string(),
                range,
                applied,
            });
        }
        let (start, end) = (buffer.map(range.start), buffer.map(range.end));
        buffer.text.replace_range(start..end, text);
        buffer.spans.retain(|s| !range.contains(&s.range));
        buffer.spans.push(AppliedSpan {
            range,
            delta: text.len() as isize - range.len() as isize,
        });
        self.staged_log.push(EditRecord {
            file: file.to_string(),
            range,
            text: text.to_string(),
        });
        Ok(())
    }

    fn library_guard(&self, decl: DeclId) -> Result<(), EditError> {
        let d = self.program.decl(decl);
        if d.library {
            return Err(EditError::Unsupported(format!(
                "{} is a library declaration",
                self.program.qualified_name(decl)
            )));
        }
        Ok(())
    }

    /// Leading whitespace of the line holding `offset` in the original text.
    fn indentation(&self, file: &str, offset: usize) -> String {
        let source = self.program.source(file).unwrap_or("");
        let line_start = source[..offset.min(source.len())]
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        source[line_start..]
            .chars()
            .take_while(|c| *c == ' ' || *c == '\t')
            .collect()
    }
}

impl SyntaxEditor for SourceEditor<'_> {
    fn replace_type(&mut self, site: TypeSite, ty: &JType) -> Result<(), EditError> {
        let (file, range, text) = match site {
            TypeSite::Decl(id) => {
                self.library_guard(id)?;
                let d = self.program.decl(id);
                (d.file.clone(), d.type_range, ty.to_string())
            }
            TypeSite::Group(id) => {
                let g = self.program.group(id);
                (g.file.clone(), g.type_range, ty.to_string())
            }
            TypeSite::NewExpr(id) => {
                let e = self.program.expr(id);
                let range = e.type_range.ok_or_else(|| {
                    EditError::Unsupported(format!("'{}' has no written type", self.program.expr_text(id)))
                })?;
                let text = match &e.kind {
                    ExprKind::New {
                        ty: JType::Array(_),
                        initializer: None,
                        ..
                    } => ty.deep_component().to_string(),
                    _ => ty.to_string(),
                };
                (e.file.clone(), range, text)
            }
        };
        self.apply(&file, range, &text)
    }

    fn replace_expression(&mut self, expr: ExprId, text: &str) -> Result<(), EditError> {
        let e = self.program.expr(expr);
        let (file, range) = (e.file.clone(), e.range);
        self.apply(&file, range, text)
    }

    fn expression_text(&self, expr: ExprId) -> Result<String, EditError> {
        let e = self.program.expr(expr);
        self.current_text(&e.file, e.range)
    }

    fn rename(&mut self, decl: DeclId, new_name: &str, references: &[ExprId]) -> Result<(), EditError> {
        self.library_guard(decl)?;
        let d = self.program.decl(decl);
        let (file, range) = (d.file.clone(), d.name_range);
        self.apply(&file, range, new_name)?;
        for reference in references {
            let e = self.program.expr(*reference);
            let range = e.name_range.ok_or_else(|| {
                EditError::Unsupported(format!("'{}' does not name a member", self.program.expr_text(*reference)))
            })?;
            let file = e.file.clone();
            self.apply(&file, range, new_name)?;
        }
        Ok(())
    }

    fn split_declaration(&mut self, group: GroupId, types: &[(DeclId, JType)]) -> Result<(), EditError> {
        let g = self.program.group(group);
        let (file, range) = (g.file.clone(), g.range);
        let indent = self.indentation(&file, range.start);
        let mut pieces = Vec::with_capacity(g.vars.len());
        for var in &g.vars {
            let decl = self.program.decl(*var);
            let ty = types
                .iter()
                .find(|(id, _)| id == var)
                .map(|(_, ty)| ty.clone())
                .unwrap_or_else(|| g.ty.clone());
            let mut piece = format!("{ty} {}", decl.name);
            if let Some(init) = decl.initializer() {
                piece.push_str(" = ");
                piece.push_str(&self.expression_text(init)?);
            }
            piece.push(';');
            pieces.push(piece);
        }
        let text = pieces.join(&format!("\n{indent}"));
        self.apply(&file, range, &text)
    }

    fn replace_statement(&mut self, stmt: StmtId, text: &str) -> Result<(), EditError> {
        let s = self.program.stmt(stmt);
        let (file, range) = (s.file.clone(), s.range);
        self.apply(&file, range, text)
    }

    fn commit(&mut self) -> Result<(), EditError> {
        for (file, buffer) in self.staged.drain(..) {
            self.committed.insert(file, buffer);
        }
        self.committed_log.append(&mut self.staged_log);
        Ok(())
    }

    fn rollback(&mut self) {
        self.staged.clear();
        self.staged_log.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::type_migration::domain::{BinaryOp, ProgramBuilder};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_nested_edits_compose() {
        let mut b = ProgramBuilder::new();
        b.file("A.java").class("A");
        let count = b.field("count", JType::int(), None);
        b.method("run", JType::void(), &[]);
        let read = b.var(count);
        let one = b.int(1);
        let sum = b.binary(BinaryOp::Add, read, one);
        let paren = b.paren(sum);
        b.expr_stmt(paren);
        b.end_method().end_class();
        let program = b.finish().unwrap();

        let mut editor = SourceEditor::new(&program);
        editor.replace_expression(read, "count.get()").unwrap();
        assert_eq!(editor.expression_text(sum).unwrap(), "count.get() + 1");
        let outer = format!("Math.abs({})", editor.expression_text(paren).unwrap());
        editor.replace_expression(paren, &outer).unwrap();
        editor.replace_type(TypeSite::Decl(count), &JType::class("AtomicInteger")).unwrap();
        editor.commit().unwrap();

        assert_eq!(
            editor.text("A.java").unwrap(),
            "class A {\n    AtomicInteger count;\n    void run() {\n        Math.abs((count.get() + 1));\n    }\n}\n"
        );
        assert_eq!(editor.edits().len(), 3);
    }

    #[test]
    fn test_edit_inside_replaced_range_is_rejected() {
        let mut b = ProgramBuilder::new();
        b.file("A.java").class("A");
        b.method("run", JType::int(), &[]);
        let one = b.int(1);
        let two = b.int(2);
        let sum = b.binary(BinaryOp::Add, one, two);
        b.ret(Some(sum));
        b.end_method().end_class();
        let program = b.finish().unwrap();

        let mut editor = SourceEditor::new(&program);
        editor.replace_expression(sum, "3").unwrap();
        let err = editor.replace_expression(one, "1L").unwrap_err();
        assert!(matches!(err, EditError::Overlap { .. }));
    }

    #[test]
    fn test_rollback_discards_staged_edits() {
        let mut b = ProgramBuilder::new();
        b.file("A.java").class("A");
        let x = b.field("x", JType::int(), None);
        b.end_class();
        let program = b.finish().unwrap();
        let original = program.source("A.java").unwrap().to_string();

        let mut editor = SourceEditor::new(&program);
        editor.replace_type(TypeSite::Decl(x), &JType::long()).unwrap();
        assert_eq!(editor.pending().len(), 1);
        editor.rollback();
        editor.commit().unwrap();
        assert_eq!(editor.text("A.java").unwrap(), original);
        assert!(editor.edits().is_empty());
    }

    #[test]
    fn test_split_declaration_keeps_initializers() {
        let mut b = ProgramBuilder::new();
        b.file("A.java").class("A");
        b.method("run", JType::void(), &[]);
        let one = b.int(1);
        let two = b.int(2);
        let vars = b.locals(JType::int(), &[("a", Some(one)), ("c", Some(two))]);
        b.end_method().end_class();
        let program = b.finish().unwrap();
        let group = program.decl(vars[0]).group().unwrap();

        let mut editor = SourceEditor::new(&program);
        editor.replace_expression(two, "2L").unwrap();
        editor
            .split_declaration(group, &[(vars[1], JType::long())])
            .unwrap();
        editor.commit().unwrap();
        assert!(editor
            .text("A.java")
            .unwrap()
            .contains("        int a = 1;\n        long c = 2L;\n"));
    }

    #[test]
    fn test_library_declarations_cannot_change() {
        let b = ProgramBuilder::new();
        let length = b.find_method("String", "length", 0).unwrap();
        let program = b.finish().unwrap();
        let mut editor = SourceEditor::new(&program);
        assert!(matches!(
            editor.replace_type(TypeSite::Decl(length), &JType::long()),
            Err(EditError::Unsupported(_))
        ));
    }
}
