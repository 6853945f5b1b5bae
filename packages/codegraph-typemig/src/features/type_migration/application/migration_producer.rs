//! Edit producer
//!
//! Turns ordered usages into edits through a [`SyntaxEditor`]:
//! 1. Getter renames (the rest of the batch reads the renamed text)
//! 2. Every usage, in the labeler's order
//! 3. Multi-variable declarations, once every variable's type is known
//!
//! The batch is committed once. Any edit error rolls everything back.

use crate::config::RenamePolicy;
use crate::errors::{EditError, MigrationError, Result};
use crate::features::type_migration::domain::{
    parse_template, ConversionDescriptor, DeclId, ElementRef, ExprId, ExprKind, FailureKind, FailureRecord, GroupId,
    JType, MigrationScope, NodeRef, Placeholder, Program, Replacement, TemplatePiece, UsageInfo, UsageKind, UsageRole,
};
use crate::features::type_migration::ports::{ReferenceIndex, RenamePrompt, SyntaxEditor, TypeSite};
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

#[derive(Debug, Clone)]
pub struct ProducerSettings {
    /// Files whose references follow a rename.
    pub scope: MigrationScope,
    pub split_declarations: bool,
    pub rename_getters: RenamePolicy,
}

impl Default for ProducerSettings {
    fn default() -> Self {
        Self {
            scope: MigrationScope::whole_program(),
            split_declarations: true,
            rename_getters: RenamePolicy::Ask,
        }
    }
}

/// What the producer did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerReport {
    pub applied: usize,
    /// Excluded usages and no-op conversions.
    pub skipped: usize,
    /// (qualified name before, new name)
    pub renamed: Vec<(String, String)>,
    /// Declarations that could not take their type.
    pub failures: Vec<FailureRecord>,
}

/// A variable of a multi-variable declaration waiting for its siblings.
struct GroupMember {
    decl: DeclId,
    ty: JType,
    owner: Option<ElementRef>,
}

pub struct MigrationProducer<'a, 'e> {
    program: &'a Program,
    references: &'a dyn ReferenceIndex,
    editor: &'e mut dyn SyntaxEditor,
    prompt: &'e mut dyn RenamePrompt,
    settings: ProducerSettings,
    /// First answer of the rename prompt, reused for the rest of the run.
    rename_answer: Option<bool>,
    report: ProducerReport,
}

impl<'a, 'e> MigrationProducer<'a, 'e> {
    pub fn new(
        program: &'a Program,
        references: &'a dyn ReferenceIndex,
        editor: &'e mut dyn SyntaxEditor,
        prompt: &'e mut dyn RenamePrompt,
        settings: ProducerSettings,
    ) -> Self {
        Self {
            program,
            references,
            editor,
            prompt,
            settings,
            rename_answer: None,
            report: ProducerReport::default(),
        }
    }

    /// Apply `usages` (already ordered) as one unit.
    pub fn produce(mut self, usages: &[UsageInfo]) -> Result<ProducerReport> {
        info!(usages = usages.len(), "applying type migration");
        let outcome = self
            .apply_all(usages)
            .and_then(|()| self.editor.commit().map_err(MigrationError::from));
        if let Err(err) = outcome {
            warn!(error = %err, "edit failed, rolling back the migration");
            self.editor.rollback();
            return Err(err);
        }
        info!(
            applied = self.report.applied,
            skipped = self.report.skipped,
            renamed = self.report.renamed.len(),
            failures = self.report.failures.len(),
            "type migration applied"
        );
        Ok(self.report)
    }

    fn apply_all(&mut self, usages: &[UsageInfo]) -> Result<()> {
        self.apply_renames(usages)?;

        let mut groups: IndexMap<GroupId, Vec<GroupMember>> = IndexMap::new();
        for usage in usages {
            if usage.excluded {
                trace!(element = %self.program.describe(usage.element), "usage excluded");
                self.report.skipped += 1;
                continue;
            }
            match (&usage.kind, usage.element) {
                (UsageKind::Declaration { ty, .. }, ElementRef::Decl(decl)) => {
                    if ty == &self.program.decl(decl).ty {
                        continue;
                    }
                    match self.shared_group(decl) {
                        Some(group) => groups.entry(group).or_default().push(GroupMember {
                            decl,
                            ty: ty.clone(),
                            owner: usage.owner_root,
                        }),
                        None => {
                            self.editor.replace_type(TypeSite::Decl(decl), ty)?;
                            self.report.applied += 1;
                        }
                    }
                }
                (UsageKind::Conversion(descriptor), ElementRef::Expr(expr)) => {
                    self.apply_conversion(expr, descriptor)?;
                }
                (UsageKind::NewExpression { ty }, ElementRef::Expr(expr)) => {
                    self.editor.replace_type(TypeSite::NewExpr(expr), ty)?;
                    self.report.applied += 1;
                }
                (UsageKind::EliminatedLocal, ElementRef::Decl(local)) => self.eliminate_local(local)?,
                (kind, element) => {
                    return Err(MigrationError::invariant(format!(
                        "usage {kind:?} cannot apply to {element}"
                    )));
                }
            }
        }

        for (group, members) in groups {
            self.apply_group(group, members)?;
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Renames
    // ═══════════════════════════════════════════════════════════════════

    fn apply_renames(&mut self, usages: &[UsageInfo]) -> Result<()> {
        let mut renamed: FxHashSet<DeclId> = FxHashSet::default();
        for usage in usages {
            let (UsageKind::Declaration { rename: Some(name), .. }, ElementRef::Decl(method)) =
                (&usage.kind, usage.element)
            else {
                continue;
            };
            if usage.excluded || renamed.contains(&method) {
                continue;
            }
            let current = self.program.decl(method).name.clone();
            if !self.confirm_rename(&current, name) {
                debug!(method = %self.program.qualified_name(method), "getter rename declined");
                continue;
            }
            let followers: Vec<DeclId> = usages
                .iter()
                .filter(|u| !u.excluded)
                .filter_map(|u| match (&u.role, u.element) {
                    (UsageRole::Overrider { base }, ElementRef::Decl(d)) if *base == method => Some(d),
                    _ => None,
                })
                .collect();
            for decl in std::iter::once(method).chain(followers) {
                if renamed.insert(decl) {
                    self.rename(decl, name)?;
                }
            }
        }
        Ok(())
    }

    fn confirm_rename(&mut self, current: &str, suggested: &str) -> bool {
        match self.settings.rename_getters {
            RenamePolicy::Always => true,
            RenamePolicy::Never => false,
            RenamePolicy::Ask => {
                if let Some(answer) = self.rename_answer {
                    return answer;
                }
                let answer = self.prompt.confirm_rename(current, suggested);
                self.rename_answer = Some(answer);
                answer
            }
        }
    }

    fn rename(&mut self, decl: DeclId, name: &str) -> Result<()> {
        let program = self.program;
        let references: Vec<ExprId> = self
            .references
            .references_to(decl, &self.settings.scope)
            .into_iter()
            .filter(|r| program.expr(*r).name_range.is_some())
            .collect();
        self.editor.rename(decl, name, &references)?;
        debug!(decl = %program.qualified_name(decl), new_name = name, references = references.len(), "renamed");
        self.report.renamed.push((program.qualified_name(decl), name.to_string()));
        self.report.applied += 1;
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Conversions
    // ═══════════════════════════════════════════════════════════════════

    fn apply_conversion(&mut self, expr: ExprId, descriptor: &ConversionDescriptor) -> Result<()> {
        let text = match &descriptor.replacement {
            Replacement::Noop => {
                self.report.skipped += 1;
                return Ok(());
            }
            Replacement::Text(text) => text.clone(),
            Replacement::Template(template) => self.render_template(expr, template)?,
            Replacement::Retarget { member, name } => self.render_retarget(expr, *member, name)?,
        };
        trace!(expr = %self.program.expr_text(expr), replacement = %text, "conversion");
        self.editor.replace_expression(expr, &text)?;
        self.report.applied += 1;
        Ok(())
    }

    fn render_template(&self, expr: ExprId, template: &str) -> Result<String> {
        let pieces = parse_template(template)
            .map_err(|e| EditError::Unsupported(format!("template '{template}': {e}")))?;
        let mut out = String::new();
        for piece in pieces {
            match piece {
                TemplatePiece::Text(text) => out.push_str(&text),
                TemplatePiece::Hole(hole) => out.push_str(&self.placeholder_text(expr, hole)?),
            }
        }
        Ok(out)
    }

    fn placeholder_text(&self, expr: ExprId, hole: Placeholder) -> Result<String> {
        let program = self.program;
        let missing = |what: &str| {
            MigrationError::from(EditError::Unsupported(format!(
                "'{}' has no {what}",
                program.expr_text(expr)
            )))
        };
        let text = match hole {
            Placeholder::Expr => self.editor.expression_text(expr)?,
            Placeholder::Qualifier => match program.qualifier(expr) {
                Some(q) => self.editor.expression_text(q)?,
                None => "this".to_string(),
            },
            Placeholder::Arg(i) => {
                let arg = match &program.expr(expr).kind {
                    ExprKind::MethodCall { args, .. } | ExprKind::New { args, .. } => args.get(i).copied(),
                    _ => None,
                };
                let arg = arg.ok_or_else(|| missing(&format!("argument {i}")))?;
                self.editor.expression_text(arg)?
            }
            Placeholder::Lhs | Placeholder::Rhs => {
                let ExprKind::Assign { lhs, rhs, .. } = &program.expr(expr).kind else {
                    return Err(missing("assignment side"));
                };
                let side = if hole == Placeholder::Lhs { *lhs } else { *rhs };
                self.editor.expression_text(side)?
            }
        };
        Ok(text)
    }

    /// `q.name(args)` for methods, `q.name` for fields.
    fn render_retarget(&self, expr: ExprId, member: DeclId, name: &str) -> Result<String> {
        let program = self.program;
        let prefix = match program.qualifier(expr) {
            Some(q) => format!("{}.", self.editor.expression_text(q)?),
            None => String::new(),
        };
        if program.decl(member).is_field() {
            return Ok(format!("{prefix}{name}"));
        }
        let args = match &program.expr(expr).kind {
            ExprKind::MethodCall { args, .. } => args
                .iter()
                .map(|a| self.editor.expression_text(*a))
                .collect::<std::result::Result<Vec<_>, _>>()?,
            _ => Vec::new(),
        };
        Ok(format!("{prefix}{name}({})", args.join(", ")))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Declarations
    // ═══════════════════════════════════════════════════════════════════

    fn shared_group(&self, decl: DeclId) -> Option<GroupId> {
        self.program
            .decl(decl)
            .group()
            .filter(|g| self.program.group(*g).vars.len() > 1)
    }

    fn apply_group(&mut self, group: GroupId, members: Vec<GroupMember>) -> Result<()> {
        let g = self.program.group(group);
        let Some(first) = members.first() else {
            return Ok(());
        };
        let uniform = members.len() == g.vars.len() && members.iter().all(|m| m.ty == first.ty);
        if uniform {
            self.editor.replace_type(TypeSite::Group(group), &first.ty)?;
            self.report.applied += 1;
            return Ok(());
        }
        if self.settings.split_declarations {
            let types: Vec<(DeclId, JType)> = members.iter().map(|m| (m.decl, m.ty.clone())).collect();
            self.editor.split_declaration(group, &types)?;
            debug!(variables = g.vars.len(), "declaration split");
            self.report.applied += 1;
            return Ok(());
        }
        for member in members {
            warn!(decl = %self.program.qualified_name(member.decl), ty = %member.ty, "declaration needs a split");
            self.report.failures.push(FailureRecord {
                element: ElementRef::Decl(member.decl),
                ty: member.ty,
                kind: FailureKind::DeclarationSplit,
                owner_root: member.owner,
            });
        }
        Ok(())
    }

    /// Drop the declaration; each write keeps its right side as a statement,
    /// writes of `null` go away entirely.
    fn eliminate_local(&mut self, local: DeclId) -> Result<()> {
        let program = self.program;
        let stmt = program
            .decl(local)
            .group()
            .and_then(|g| program.group(g).stmt)
            .ok_or_else(|| {
                MigrationError::invariant(format!("{} has no declaration statement", program.qualified_name(local)))
            })?;
        for reference in self.references.references_to(local, &self.settings.scope) {
            let Some(NodeRef::Expr(assign)) = program.expr(reference).parent else {
                continue;
            };
            let ExprKind::Assign { rhs, .. } = &program.expr(assign).kind else {
                continue;
            };
            if program.is_null_literal(*rhs) {
                if let Some(NodeRef::Stmt(s)) = program.expr(assign).parent {
                    self.editor.replace_statement(s, "")?;
                }
            } else {
                let text = self.editor.expression_text(*rhs)?;
                self.editor.replace_expression(assign, &text)?;
            }
        }
        self.editor.replace_statement(stmt, "")?;
        debug!(local = %program.qualified_name(local), "local removed");
        self.report.applied += 1;
        Ok(())
    }
}
