/*
 * Type Migration Labeler
 *
 * Propagates a requested type change through the program and records what
 * has to change: declarations, conversions, retyped `new` expressions and
 * failures. Nothing is edited here; the producer turns the labels into edits.
 *
 * # Algorithm
 * - Seeds become roots; each root is queued once (the type store refuses a
 *   second assignment to the same declaration)
 * - The most recently queued root is processed first
 * - Processing a root visits the statement holding its declaration and every
 *   statement holding a reference to it; the statement processor decides
 *   whether the change flows further (new root), needs a conversion, or fails
 * - An override family enters the worklist as one root, so either all its
 *   members are migrated or the failures name the ones that could not be
 *
 * # Termination
 * Declarations are finite and each accepts one type, so at most one root per
 * declaration is ever queued. `max_dequeues` guards against a broken
 * invariant rather than bounding real work.
 */

use super::statement_processor::StatementProcessor;
use super::usage_sorter::sort_usages;
use crate::errors::{MigrationError, Result};
use crate::features::type_migration::domain::{
    ClassTable, ConversionDescriptor, DeclId, DeclKind, ElementRef, ExprId, ExprKind, FailureKind, FailureMessage,
    FailureRecord, JType, MigrationReport, MigrationScope, MigrationStats, NodeRef, PrimitiveKind, Program, StmtKind,
    TypeParamBinder, UsageInfo, UsageKind, UsageRole, VisitTarget,
};
use crate::features::type_migration::infrastructure::{RuleRegistry, TypeEvaluator};
use crate::features::type_migration::ports::{OverrideSearch, ProgressIndicator, ReferenceIndex, RuleContext};
use indexmap::{IndexMap, IndexSet};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::{BTreeSet, VecDeque};
use tracing::{debug, info, trace, warn};

/// Knobs the labeler reads; built from a validated configuration.
#[derive(Debug, Clone, Default)]
pub struct LabelerSettings {
    pub scope: MigrationScope,
    /// When set, only these declarations may become roots.
    pub allowed_roots: Option<FxHashSet<DeclId>>,
    pub max_dequeues: Option<usize>,
    pub eliminate_unused_locals: bool,
}

/// A queued root: one declaration, or every member of an override family.
#[derive(Debug, Clone)]
struct PendingRoot {
    members: Vec<(DeclId, JType)>,
}

/// Root -> roots it queued, with the type each was given.
pub type RootGraph = IndexMap<ElementRef, IndexSet<(ElementRef, JType)>>;

pub struct TypeMigrationLabeler<'a> {
    program: &'a Program,
    references: &'a dyn ReferenceIndex,
    overrides: &'a dyn OverrideSearch,
    rules: &'a RuleRegistry,
    settings: LabelerSettings,

    evaluator: TypeEvaluator,
    conversions: IndexMap<ExprId, ConversionDescriptor>,
    /// Keyed by (element, required type); the first owner wins.
    failures: IndexMap<(ElementRef, JType), FailureRecord>,
    roots: VecDeque<PendingRoot>,

    provenance: RootGraph,
    processed_roots: FxHashSet<ElementRef>,
    /// (usage, root) -> places where the root met the usage
    type_usages: IndexMap<(ElementRef, ElementRef), IndexSet<ElementRef>>,
    root_owners: IndexMap<DeclId, Option<ElementRef>>,
    family_leaders: FxHashMap<DeclId, DeclId>,
    roles: FxHashMap<DeclId, UsageRole>,

    new_expression_types: IndexMap<ExprId, (JType, Option<ElementRef>)>,
    eliminated_locals: IndexMap<DeclId, Option<ElementRef>>,
    rename_proposals: IndexMap<DeclId, String>,
    /// Type parameters a user-requested root dropped on purpose.
    disappeared_type_params: BTreeSet<String>,

    current_root: Option<ElementRef>,
    stats: MigrationStats,
}

impl<'a> TypeMigrationLabeler<'a> {
    pub fn new(
        program: &'a Program,
        references: &'a dyn ReferenceIndex,
        overrides: &'a dyn OverrideSearch,
        rules: &'a RuleRegistry,
        settings: LabelerSettings,
    ) -> Self {
        Self {
            program,
            references,
            overrides,
            rules,
            settings,
            evaluator: TypeEvaluator::new(),
            conversions: IndexMap::new(),
            failures: IndexMap::new(),
            roots: VecDeque::new(),
            provenance: IndexMap::new(),
            processed_roots: FxHashSet::default(),
            type_usages: IndexMap::new(),
            root_owners: IndexMap::new(),
            family_leaders: FxHashMap::default(),
            roles: FxHashMap::default(),
            new_expression_types: IndexMap::new(),
            eliminated_locals: IndexMap::new(),
            rename_proposals: IndexMap::new(),
            disappeared_type_params: BTreeSet::new(),
            current_root: None,
            stats: MigrationStats::default(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Worklist
    // ═══════════════════════════════════════════════════════════════════

    /// Migrate every seed to its requested type and drain the worklist.
    ///
    /// Calling this again with seeds that were already migrated is a no-op.
    pub fn migrate(&mut self, seeds: &[(DeclId, JType)], progress: &dyn ProgressIndicator) -> Result<()> {
        for (decl, _) in seeds {
            self.check_seed(*decl)?;
        }
        info!(seeds = seeds.len(), "type migration started");

        for (decl, ty) in seeds {
            self.current_root = None;
            if !self.add_migration_root(*decl, ty.clone(), None, false, true) {
                debug!(root = %self.program.qualified_name(*decl), "seed already migrated");
            }
        }

        while let Some(root) = self.roots.pop_front() {
            if progress.is_cancelled() {
                info!(dequeued = self.stats.dequeued, "type migration cancelled");
                return Err(MigrationError::Cancelled);
            }
            self.stats.dequeued += 1;
            if let Some(limit) = self.settings.max_dequeues {
                if self.stats.dequeued > limit {
                    return Err(MigrationError::invariant(format!(
                        "worklist dequeued more than {limit} roots"
                    )));
                }
            }
            progress.report(self.stats.dequeued, self.roots.len());
            self.process_root(root);
        }
        self.current_root = None;

        info!(
            roots = self.stats.roots_accepted,
            conversions = self.conversions.len(),
            failures = self.failures.len(),
            "type migration finished"
        );
        Ok(())
    }

    fn check_seed(&self, decl: DeclId) -> Result<()> {
        let Some(d) = self.program.try_decl(decl) else {
            return Err(MigrationError::UnknownElement(decl.to_string()));
        };
        let name = self.program.qualified_name(decl);
        if d.library {
            return Err(MigrationError::InvalidRoot(format!("{name} is a library member")));
        }
        if !self.settings.scope.contains(&d.file) {
            return Err(MigrationError::InvalidRoot(format!("{name} is outside the migration scope")));
        }
        if let Some(allowed) = &self.settings.allowed_roots {
            if !allowed.contains(&decl) {
                return Err(MigrationError::InvalidRoot(format!("{name} is not an allowed root")));
            }
        }
        Ok(())
    }

    fn process_root(&mut self, root: PendingRoot) {
        for (member, ty) in root.members {
            let usage = ElementRef::Decl(member);
            if self.evaluator.recorded(usage) != Some(&ty) {
                debug!(root = %self.program.qualified_name(member), "root holds another type, skipped");
                continue;
            }
            debug!(
                root = %self.program.qualified_name(member),
                ty = %ty,
                pending = self.roots.len(),
                "processing root"
            );
            self.current_root = Some(usage);
            let references = self.sorted_references(member);
            self.migrate_root(member, &ty, &references);
        }
    }

    fn sorted_references(&self, decl: DeclId) -> Vec<ExprId> {
        let program = self.program;
        let mut refs = self.references.references_to(decl, &self.settings.scope);
        refs.sort_by(|a, b| {
            let (ea, eb) = (program.expr(*a), program.expr(*b));
            (&ea.file, ea.range.start, *a).cmp(&(&eb.file, eb.range.start, *b))
        });
        refs
    }

    fn migrate_root(&mut self, decl: DeclId, ty: &JType, references: &[ExprId]) {
        let program = self.program;
        match &program.decl(decl).kind {
            DeclKind::Method { .. } => self.migrate_method_returns(decl, ty),
            DeclKind::Parameter { method, index } => self.migrate_call_arguments(decl, *method, *index, ty),
            DeclKind::Field { .. } | DeclKind::Local { .. } => {
                if let Some(target) = program.declaration_target(decl) {
                    self.visit(target);
                }
            }
        }

        let mut visited = FxHashSet::default();
        for reference in references {
            if program.inside_lambda(NodeRef::Expr(*reference)) {
                trace!(reference = %program.expr_text(*reference), "reference inside a lambda left alone");
                continue;
            }
            if let Some(target) = program.containing_target(*reference) {
                if visited.insert(target) {
                    self.visit(target);
                }
            }
        }
    }

    fn visit(&mut self, target: VisitTarget) {
        self.stats.statements_visited += 1;
        trace!(?target, "visiting");
        StatementProcessor::new(self).process(target);
    }

    /// Return values of a migrated method must fit the new return type.
    fn migrate_method_returns(&mut self, method: DeclId, ty: &JType) {
        let program = self.program;
        for stmt in program.return_statements(method) {
            let StmtKind::Return { value: Some(value) } = &program.stmt(stmt).kind else {
                continue;
            };
            let value = *value;
            let Some(current) = self.evaluate(value) else {
                continue;
            };
            if &current == ty {
                continue;
            }
            if ty.is_void() {
                self.convert_expression(value, ty, &current, true);
            } else {
                let fits = program.classes().is_assignable(ty, &current);
                self.migrate_expression_type(value, ty, Some(ElementRef::Expr(value)), fits, true);
            }
        }
    }

    /// Arguments passed for a migrated parameter must fit its new type.
    fn migrate_call_arguments(&mut self, param: DeclId, method: DeclId, index: usize, ty: &JType) {
        let program = self.program;
        let classes = program.classes();
        let source = &program.decl(param).ty;
        let check_count = source.is_varargs() && !ty.is_varargs();
        let element_ty = match ty {
            JType::Varargs(component) => (**component).clone(),
            other => other.clone(),
        };
        let param_count = program.decl(method).params().len();

        for call in self.sorted_references(method) {
            let ExprKind::MethodCall { args, .. } = &program.expr(call).kind else {
                continue;
            };
            let place = Some(ElementRef::Expr(call));
            if check_count {
                if matches!(ty, JType::Array(_)) && self.is_variadic_call(call) && index < args.len() {
                    let arg = args[index];
                    if let Some(current) = self.evaluate(arg) {
                        self.convert_expression(arg, ty, &current, false);
                    }
                    continue;
                }
                if param_count != args.len() {
                    self.mark_failed(ty.clone(), ElementRef::Expr(call), FailureKind::VarargsArity);
                }
            }
            if index >= args.len() {
                continue;
            }
            let end = if source.is_varargs() { args.len() } else { index + 1 };
            for &arg in &args[index..end] {
                let Some(actual) = self.evaluate(arg) else {
                    continue;
                };
                if actual.is_array_like() && ty.is_varargs() {
                    self.migrate_expression_type(arg, &ty.varargs_to_array(), place, false, true);
                } else {
                    let fits = classes.is_assignable(&element_ty, &actual);
                    self.migrate_expression_type(arg, &element_ty, place, fits, true);
                }
            }
        }
    }

    /// A call that spreads its trailing arguments into a varargs parameter.
    fn is_variadic_call(&self, call: ExprId) -> bool {
        let program = self.program;
        let ExprKind::MethodCall { method, args, .. } = &program.expr(call).kind else {
            return false;
        };
        let params = program.decl(*method).params();
        let Some(last) = params.last() else {
            return false;
        };
        if !program.decl(*last).ty.is_varargs() {
            return false;
        }
        if args.len() != params.len() {
            return true;
        }
        match args.last().and_then(|a| self.evaluate(*a)) {
            Some(ty) => !ty.is_array_like(),
            None => true,
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Roots
    // ═══════════════════════════════════════════════════════════════════

    /// Try to make `decl` a root of type `ty`. Returns `true` when it was
    /// queued; `false` tells the caller to convert the usage instead.
    ///
    /// `already_processed` marks a usage that needs no new root (its value
    /// already fits); it is still remembered for ordering.
    pub(crate) fn add_migration_root(
        &mut self,
        decl: DeclId,
        ty: JType,
        place: Option<ElementRef>,
        already_processed: bool,
        user_defined: bool,
    ) -> bool {
        if let Some(allowed) = &self.settings.allowed_roots {
            if !allowed.contains(&decl) {
                trace!(decl = %self.program.qualified_name(decl), "not an allowed root");
                return false;
            }
        }
        if ty.is_null() || (ty.is_void() && self.current_root.is_some()) {
            return false;
        }
        if !self.can_be_root(decl) {
            return false;
        }
        let program = self.program;
        let d = program.decl(decl);
        let ty = fit_declaration(&d.ty, ty);

        if user_defined {
            let kept = ty.type_params();
            self.disappeared_type_params
                .extend(d.ty.type_params().into_iter().filter(|p| !kept.contains(p)));
        } else if self.mentions_unbound_type_params(&d.ty, &ty) {
            trace!(decl = %program.qualified_name(decl), ty = %ty, "type parameters would be lost");
            return false;
        }

        match &d.kind {
            DeclKind::Method { .. } => {
                self.propose_getter_rename(decl);
                let members = self
                    .override_family(decl)
                    .into_iter()
                    .map(|m| (m, ty.clone()))
                    .collect();
                self.add_family(members, place, already_processed)
            }
            DeclKind::Parameter { method, index } => {
                let members = self
                    .override_family(*method)
                    .into_iter()
                    .filter_map(|m| program.decl(m).params().get(*index).copied())
                    .map(|p| (p, fit_declaration(&program.decl(p).ty, ty.clone())))
                    .collect();
                self.add_family(members, place, already_processed)
            }
            DeclKind::Field { .. } | DeclKind::Local { .. } => {
                let already = self.add_root(decl, &ty, place, already_processed, false);
                if !already {
                    self.roots.push_front(PendingRoot {
                        members: vec![(decl, ty)],
                    });
                }
                !already
            }
        }
    }

    /// Queue a family as one root. The first member is the one the
    /// migration reached; the rest follow it.
    fn add_family(&mut self, members: Vec<(DeclId, JType)>, place: Option<ElementRef>, already_processed: bool) -> bool {
        let Some(&(leader, _)) = members.first() else {
            return false;
        };
        let program = self.program;
        let is_family = members.len() > 1;
        let mut accepted = Vec::new();
        let mut leader_accepted = false;

        for (i, (member, ty)) in members.into_iter().enumerate() {
            let follower = i > 0;
            if follower {
                let d = program.decl(member);
                if d.library {
                    self.mark_failed(ty, ElementRef::Decl(member), FailureKind::LibraryMember);
                    continue;
                }
                if !self.settings.scope.contains(&d.file) {
                    debug!(member = %program.qualified_name(member), "family member outside scope left alone");
                    continue;
                }
                self.family_leaders.entry(member).or_insert(leader);
                self.roles
                    .entry(member)
                    .or_insert(UsageRole::Overrider { base: leader });
            } else if is_family {
                self.roles.entry(member).or_insert(UsageRole::Overridden);
            }

            let already = self.add_root(member, &ty, place, already_processed, follower);
            if !already {
                leader_accepted |= !follower;
                accepted.push((member, ty));
            }
        }

        if !accepted.is_empty() {
            self.roots.push_front(PendingRoot { members: accepted });
        }
        leader_accepted
    }

    /// Record `decl` as a root. Returns `true` when it was already processed.
    fn add_root(
        &mut self,
        decl: DeclId,
        ty: &JType,
        place: Option<ElementRef>,
        already_processed: bool,
        overrider: bool,
    ) -> bool {
        let usage = ElementRef::Decl(decl);
        self.remember_root_trace(usage, ty, place, already_processed, overrider);
        if already_processed {
            return true;
        }
        if !self.evaluator.assign(usage, ty.clone()) {
            self.stats.roots_rejected += 1;
            trace!(root = %self.program.qualified_name(decl), ty = %ty, "already migrated");
            return true;
        }
        self.root_owners.insert(decl, self.owner());
        self.stats.roots_accepted += 1;
        debug!(root = %self.program.qualified_name(decl), ty = %ty, "root accepted");
        false
    }

    fn remember_root_trace(
        &mut self,
        usage: ElementRef,
        ty: &JType,
        place: Option<ElementRef>,
        already_processed: bool,
        overrider: bool,
    ) {
        let Some(current) = self.current_root else {
            return;
        };
        if !already_processed {
            self.processed_roots.insert(usage);
        }
        if self.processed_roots.contains(&usage) {
            let from = self.leader_of(current);
            let to = self.leader_of(usage);
            if from != to {
                self.provenance.entry(from).or_default().insert((to, ty.clone()));
            }
        }
        if !overrider {
            let places = self.type_usages.entry((usage, current)).or_default();
            if let Some(place) = place {
                places.insert(place);
            }
        }
    }

    fn can_be_root(&self, decl: DeclId) -> bool {
        let d = self.program.decl(decl);
        !d.library && self.settings.scope.contains(&d.file)
    }

    fn mentions_unbound_type_params(&self, original: &JType, ty: &JType) -> bool {
        if !matches!(original, JType::Class { .. } | JType::TypeParam(_)) {
            return false;
        }
        let bound = ty.type_params();
        original
            .type_params()
            .iter()
            .any(|p| !bound.contains(p) && !self.disappeared_type_params.contains(p))
    }

    /// `method` followed by everything it overrides or is overridden by.
    fn override_family(&self, method: DeclId) -> Vec<DeclId> {
        let mut family = vec![method];
        let mut seen: FxHashSet<DeclId> = family.iter().copied().collect();
        let mut queue = VecDeque::from([method]);
        while let Some(m) = queue.pop_front() {
            let related = self
                .overrides
                .overriders_of(m)
                .into_iter()
                .chain(self.overrides.overridden_by(m));
            for other in related {
                if seen.insert(other) {
                    family.push(other);
                    queue.push_back(other);
                }
            }
        }
        family
    }

    fn leader_of(&self, element: ElementRef) -> ElementRef {
        match element {
            ElementRef::Decl(d) => ElementRef::Decl(self.family_leaders.get(&d).copied().unwrap_or(d)),
            other => other,
        }
    }

    /// Root new labels are attributed to.
    fn owner(&self) -> Option<ElementRef> {
        self.current_root.map(|r| self.leader_of(r))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Getter renames
    // ═══════════════════════════════════════════════════════════════════

    fn propose_getter_rename(&mut self, method: DeclId) {
        if let Some(name) = self.getter_rename(method) {
            debug!(method = %self.program.qualified_name(method), suggested = %name, "getter rename proposed");
            self.rename_proposals.entry(method).or_insert(name);
        }
    }

    /// New name for a getter whose field moved between boolean and
    /// non-boolean, when the convention breaks and the name is free.
    fn getter_rename(&self, method: DeclId) -> Option<String> {
        let program = self.program;
        let classes = program.classes();
        let field = self.current_root?.as_decl().filter(|d| program.decl(*d).is_field())?;
        let field_decl = program.decl(field);
        let source = &field_decl.ty;
        let migrated = self.evaluator.recorded(ElementRef::Decl(field))?;
        if classes.is_assignable(migrated, source) {
            return None;
        }
        let booleanish = |t: &JType| classes.unbox(t) == Some(PrimitiveKind::Boolean);
        if !booleanish(source) && !booleanish(migrated) {
            return None;
        }

        let m = program.decl(method);
        if m.class != field_decl.class || !m.params().is_empty() || m.is_static != field_decl.is_static {
            return None;
        }
        let stem = capitalize(&field_decl.name);
        let (getter, predicate) = (format!("get{stem}"), format!("is{stem}"));
        if m.name != getter && m.name != predicate {
            return None;
        }
        let suggested = if booleanish(migrated) { predicate } else { getter };
        if suggested == m.name || program.find_method(&m.class, &suggested, 0).is_some() {
            return None;
        }
        Some(suggested)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Expressions
    // ═══════════════════════════════════════════════════════════════════

    /// Make `expr` produce a value of type `ty`: by migrating what it reads,
    /// by retyping it, or by a conversion.
    pub(crate) fn migrate_expression_type(
        &mut self,
        expr: ExprId,
        ty: &JType,
        place: Option<ElementRef>,
        already_processed: bool,
        covariant: bool,
    ) {
        let program = self.program;
        let expr = program.skip_parens(expr);
        let Some(original) = program.static_type(expr) else {
            return;
        };
        if &original == ty {
            return;
        }

        if original.is_null() {
            if ty.is_primitive() {
                self.mark_failed(ty.clone(), ElementRef::Expr(expr), FailureKind::Unconvertible);
                return;
            }
            if let Some(expected) = program.expected_type(expr) {
                let ctx = self.context(expr);
                if !expected.is_null() && self.rules.should_convert_null(&expected, ty, &ctx) {
                    self.convert_expression(expr, ty, &expected, covariant);
                }
            }
            return;
        }

        match &program.expr(expr).kind {
            ExprKind::Conditional {
                then_expr, else_expr, ..
            } => {
                self.migrate_expression_type(*then_expr, ty, place, already_processed, false);
                self.migrate_expression_type(*else_expr, ty, place, already_processed, false);
                self.evaluator.assign(ElementRef::Expr(expr), ty.clone());
                return;
            }
            ExprKind::ArrayInit { elements, .. } => {
                if let Some(component) = ty.component() {
                    let component = component.clone();
                    for &element in elements {
                        self.migrate_expression_type(element, &component, place, already_processed, true);
                    }
                    self.evaluator.assign(ElementRef::Expr(expr), ty.varargs_to_array());
                    return;
                }
            }
            ExprKind::ArrayAccess { array, .. } => {
                self.migrate_expression_type(*array, &JType::array(ty.clone()), place, already_processed, covariant);
                return;
            }
            ExprKind::Reference { target, .. } | ExprKind::MethodCall { method: target, .. } => {
                if !self.add_migration_root(*target, ty.clone(), place, already_processed, false) {
                    let current = self.evaluate(expr).unwrap_or(original);
                    self.convert_expression(expr, ty, &current, covariant);
                }
                return;
            }
            ExprKind::New { initializer, .. } => {
                if self.migrate_new_expression(expr, *initializer, &original, ty, place, already_processed) {
                    return;
                }
            }
            ExprKind::Lambda { .. } => {
                trace!(expr = %program.expr_text(expr), "lambda left alone");
                return;
            }
            _ => {}
        }

        let current = self.evaluate(expr).unwrap_or(original);
        self.convert_expression(expr, ty, &current, covariant);
    }

    /// Retype a `new` expression. Returns `false` when the shapes differ and
    /// a conversion is needed instead.
    fn migrate_new_expression(
        &mut self,
        expr: ExprId,
        initializer: Option<ExprId>,
        original: &JType,
        ty: &JType,
        place: Option<ElementRef>,
        already_processed: bool,
    ) -> bool {
        let program = self.program;
        if array_depth(original) != array_depth(ty) {
            return false;
        }

        if let Some(component) = ty.component() {
            let component = component.clone();
            if let Some(init) = initializer {
                if let ExprKind::ArrayInit { elements, .. } = &program.expr(init).kind {
                    for &element in elements.iter().rev() {
                        self.migrate_expression_type(element, &component, place, false, true);
                    }
                }
            }
            let innermost = ty.deep_component();
            if matches!(innermost, JType::TypeParam(_)) || !innermost.type_args().is_empty() {
                // Generic array creation does not compile.
                self.mark_failed(ty.clone(), ElementRef::Expr(expr), FailureKind::Unconvertible);
                return true;
            }
            if !already_processed {
                self.record_new_expression(expr, ty.varargs_to_array());
            }
            return true;
        }

        let (Some(from), Some(to)) = (original.class_name(), ty.class_name()) else {
            return false;
        };
        if !program.classes().is_subclass(from, to) {
            return false;
        }
        match self.rebind_created_type(original, ty) {
            Some(rebound) => {
                if &rebound != original {
                    self.record_new_expression(expr, rebound);
                }
                true
            }
            None => false,
        }
    }

    /// `new ArrayList<String>()` flowing into `List<Integer>` becomes
    /// `new ArrayList<Integer>()`.
    fn rebind_created_type(&self, original: &JType, target: &JType) -> Option<JType> {
        let classes = self.program.classes();
        let name = original.class_name()?;
        let class = classes.get(name)?;
        if class.type_params.is_empty() || target.type_args().is_empty() {
            return Some(original.clone());
        }
        let generic = JType::generic(
            name,
            class.type_params.iter().map(|p| JType::type_param(p.clone())).collect(),
        );
        let viewed = classes.as_super(&generic, target.class_name()?)?;
        let mut binding: FxHashMap<String, JType> = FxHashMap::default();
        for (formal, actual) in viewed.type_args().iter().zip(target.type_args()) {
            match formal {
                JType::TypeParam(p) => {
                    if let Some(previous) = binding.insert(p.clone(), actual.clone()) {
                        if &previous != actual {
                            return None;
                        }
                    }
                }
                other if other == actual => {}
                _ => return None,
            }
        }
        let args = class
            .type_params
            .iter()
            .enumerate()
            .map(|(i, p)| {
                binding
                    .get(p)
                    .cloned()
                    .or_else(|| original.type_args().get(i).cloned())
                    .unwrap_or_else(JType::object)
            })
            .collect();
        Some(JType::generic(name, args))
    }

    pub(crate) fn record_new_expression(&mut self, expr: ExprId, ty: JType) {
        trace!(expr = %self.program.expr_text(expr), ty = %ty, "new expression retyped");
        self.evaluator.assign(ElementRef::Expr(expr), ty.clone());
        let owner = self.owner();
        self.new_expression_types.insert(expr, (ty, owner));
    }

    /// Record a type for an expression without editing it.
    pub(crate) fn retype_expression(&mut self, expr: ExprId, ty: JType) {
        self.evaluator.assign(ElementRef::Expr(expr), ty);
    }

    /// Ask the rules how to turn `expr` (now of type `from`) into `to`.
    pub(crate) fn convert_expression(&mut self, expr: ExprId, to: &JType, from: &JType, covariant: bool) {
        let ctx = self.context(expr);
        match self.rules.find_or_fallback(from, to, &ctx, covariant) {
            None => self.mark_failed(to.clone(), ElementRef::Expr(expr), FailureKind::Unconvertible),
            Some(descriptor) if descriptor.is_noop() => {}
            Some(mut descriptor) => {
                descriptor.result_type.get_or_insert_with(|| to.clone());
                self.set_conversion_mapping(expr, descriptor);
            }
        }
    }

    /// Operand checks: `expr` changed from `original` to `current` and the
    /// operator no longer accepts it, so only an explicit rule can help.
    pub(crate) fn find_conversion_or_fail(&mut self, expr: ExprId, current: &JType, original: &JType) {
        let ctx = self.context(expr);
        match self.rules.find(current, original, &ctx) {
            Some(descriptor) if descriptor.is_noop() => {}
            Some(mut descriptor) => {
                descriptor.result_type.get_or_insert_with(|| original.clone());
                self.set_conversion_mapping(expr, descriptor);
            }
            None => self.mark_failed(current.clone(), ElementRef::Expr(expr), FailureKind::Unconvertible),
        }
    }

    /// A member reached through a qualifier whose type no longer declares it.
    pub(crate) fn convert_member_access(&mut self, access: ExprId, qualifier: ExprId, from: &JType, to: &JType) {
        let ctx = self.context(access);
        match self.rules.find(from, to, &ctx) {
            Some(descriptor) if descriptor.is_noop() => {}
            Some(mut descriptor) => {
                if descriptor.result_type.is_none() {
                    descriptor.result_type = self.program.static_type(access);
                }
                self.set_conversion_mapping(access, descriptor);
            }
            None => self.mark_failed(to.clone(), ElementRef::Expr(qualifier), FailureKind::Unconvertible),
        }
    }

    fn set_conversion_mapping(&mut self, expr: ExprId, mut descriptor: ConversionDescriptor) {
        if self.conversions.contains_key(&expr) {
            return;
        }
        descriptor.owner_root = self.owner();
        trace!(expr = %self.program.expr_text(expr), conversion = %descriptor, "conversion recorded");
        self.stats.conversions += 1;
        self.conversions.insert(expr, descriptor);
    }

    pub(crate) fn mark_failed(&mut self, ty: JType, element: ElementRef, kind: FailureKind) {
        let key = (element, ty);
        if self.failures.contains_key(&key) {
            return;
        }
        warn!(
            element = %self.program.describe(element),
            ty = %key.1,
            reason = kind.describe(),
            "migration failure"
        );
        self.stats.failures += 1;
        let record = FailureRecord {
            element,
            ty: key.1.clone(),
            kind,
            owner_root: self.owner(),
        };
        self.failures.insert(key, record);
    }

    /// A local whose assigned value became `void` or `null`-typed: drop the
    /// local when it is only ever written, otherwise fail the assignment.
    pub(crate) fn eliminate_local_or_fail(&mut self, local: DeclId, assignment: ExprId, ty: &JType) {
        if self.settings.eliminate_unused_locals && self.is_write_only_local(local) {
            if !self.eliminated_locals.contains_key(&local) {
                debug!(local = %self.program.qualified_name(local), "local eliminated");
                let owner = self.owner();
                self.eliminated_locals.insert(local, owner);
            }
            return;
        }
        self.mark_failed(ty.clone(), ElementRef::Expr(assignment), FailureKind::LocalElimination);
    }

    fn is_write_only_local(&self, local: DeclId) -> bool {
        let program = self.program;
        let d = program.decl(local);
        let Some(group) = d.group() else {
            return false;
        };
        if !d.is_local() || program.group(group).vars.len() != 1 {
            return false;
        }
        if d
            .initializer()
            .is_some_and(|init| !matches!(program.expr(init).kind, ExprKind::Literal { .. }))
        {
            return false;
        }
        self.references
            .references_to(local, &self.settings.scope)
            .into_iter()
            .all(|r| {
                let Some(NodeRef::Expr(parent)) = program.expr(r).parent else {
                    return false;
                };
                let plain_write = matches!(
                    &program.expr(parent).kind,
                    ExprKind::Assign { op: None, lhs, .. } if *lhs == r
                );
                let standalone = matches!(
                    program.expr(parent).parent,
                    Some(NodeRef::Stmt(s)) if matches!(program.stmt(s).kind, StmtKind::Expression { .. })
                );
                plain_write && standalone
            })
    }

    fn context(&self, expr: ExprId) -> RuleContext<'a> {
        RuleContext {
            program: self.program,
            member: self.program.resolved_member(expr),
            expr,
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Queries used while visiting
    // ═══════════════════════════════════════════════════════════════════

    pub(crate) fn program(&self) -> &'a Program {
        self.program
    }

    pub(crate) fn classes(&self) -> &'a ClassTable {
        self.program.classes()
    }

    /// Type of `expr` as the migration currently sees it.
    pub fn evaluate(&self, expr: ExprId) -> Option<JType> {
        self.evaluator
            .evaluate(self.program, &self.conversions, Some(self.binder()), expr)
    }

    pub(crate) fn call_substitution(&self, call: ExprId) -> FxHashMap<String, JType> {
        self.evaluator
            .call_substitution(self.program, &self.conversions, Some(self.binder()), call)
    }

    fn binder(&self) -> &'a dyn TypeParamBinder {
        self.rules
    }

    pub(crate) fn current_decl_type(&self, decl: DeclId) -> JType {
        self.evaluator.current_decl_type(self.program, decl)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Results
    // ═══════════════════════════════════════════════════════════════════

    pub fn stats(&self) -> MigrationStats {
        self.stats
    }

    pub fn evaluator(&self) -> &TypeEvaluator {
        &self.evaluator
    }

    pub fn conversions(&self) -> &IndexMap<ExprId, ConversionDescriptor> {
        &self.conversions
    }

    pub fn failures(&self) -> impl Iterator<Item = &FailureRecord> {
        self.failures.values()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn provenance(&self) -> &RootGraph {
        &self.provenance
    }

    /// Places where `root` met `usage`.
    pub fn type_usages(&self, usage: ElementRef, root: ElementRef) -> Vec<ElementRef> {
        self.type_usages
            .get(&(usage, root))
            .map(|places| places.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn rename_proposals(&self) -> &IndexMap<DeclId, String> {
        &self.rename_proposals
    }

    pub fn eliminated_locals(&self) -> impl Iterator<Item = DeclId> + '_ {
        self.eliminated_locals.keys().copied()
    }

    pub fn new_expression_type(&self, expr: ExprId) -> Option<&JType> {
        self.new_expression_types.get(&expr).map(|(ty, _)| ty)
    }

    pub fn disappeared_type_params(&self) -> &BTreeSet<String> {
        &self.disappeared_type_params
    }

    /// Every edit the migration needs, in application order.
    pub fn migrated_usages(&self) -> Vec<UsageInfo> {
        let program = self.program;
        let mut usages = Vec::new();

        for (decl, ty) in self.evaluator.migrated_declarations() {
            if self.eliminated_locals.contains_key(&decl) {
                continue;
            }
            let rename = self.rename_proposals.get(&decl).cloned();
            if ty == &program.decl(decl).ty && rename.is_none() {
                continue;
            }
            let kind = UsageKind::Declaration { ty: ty.clone(), rename };
            let role = self.roles.get(&decl).cloned().unwrap_or(UsageRole::Plain);
            let owner = self.root_owners.get(&decl).copied().flatten();
            usages.push(UsageInfo::new(ElementRef::Decl(decl), kind).with_owner(owner).with_role(role));
        }
        for (expr, descriptor) in &self.conversions {
            usages.push(
                UsageInfo::new(ElementRef::Expr(*expr), UsageKind::Conversion(descriptor.clone()))
                    .with_owner(descriptor.owner_root),
            );
        }
        for (expr, (ty, owner)) in &self.new_expression_types {
            usages.push(
                UsageInfo::new(ElementRef::Expr(*expr), UsageKind::NewExpression { ty: ty.clone() })
                    .with_owner(*owner),
            );
        }
        for (local, owner) in &self.eliminated_locals {
            usages.push(UsageInfo::new(ElementRef::Decl(*local), UsageKind::EliminatedLocal).with_owner(*owner));
        }

        sort_usages(program, usages, &self.provenance)
    }

    pub fn failure_messages(&self) -> Vec<FailureMessage> {
        self.failures
            .values()
            .map(|record| failure_message(self.program, record))
            .collect()
    }

    /// The text report: types, conversions, retyped `new` expressions, failures.
    pub fn migration_report(&self) -> MigrationReport {
        let program = self.program;
        let mut types: Vec<(String, String)> = self
            .evaluator
            .migrated_declarations()
            .map(|(decl, ty)| (program.qualified_name(decl), ty.to_string()))
            .collect();
        let mut conversions: Vec<(String, String)> = self
            .conversions
            .iter()
            .map(|(expr, d)| (program.expr_text(*expr).to_string(), d.to_string()))
            .collect();
        let mut new_expressions: Vec<(String, String)> = self
            .new_expression_types
            .iter()
            .map(|(expr, (ty, _))| (program.expr_text(*expr).to_string(), ty.to_string()))
            .collect();
        let mut failures: Vec<(String, String)> = self
            .failures
            .values()
            .map(|r| (program.describe(r.element), r.ty.to_string()))
            .collect();
        types.sort();
        conversions.sort();
        new_expressions.sort();
        failures.sort();
        MigrationReport {
            types,
            conversions,
            new_expressions,
            failures,
        }
    }
}

/// Resolve a failure to display text.
pub fn failure_message(program: &Program, record: &FailureRecord) -> FailureMessage {
    let subject = program.describe(record.element);
    let ty = &record.ty;
    let message = match record.kind {
        FailureKind::Unconvertible => match record.element {
            ElementRef::Expr(expr) => match program.static_type(expr) {
                Some(from) => format!("Cannot convert type of expression {subject} from {from} to {ty}"),
                None => format!("Cannot convert type of expression {subject} to {ty}"),
            },
            ElementRef::Decl(_) => format!("Cannot convert type of {subject} to {ty}"),
        },
        FailureKind::VarargsArity => {
            format!("Cannot convert call {subject}: the argument count does not fit {ty}")
        }
        FailureKind::LibraryMember => format!("Cannot change library member {subject} to {ty}"),
        FailureKind::LocalElimination => {
            format!("Cannot remove the local written by {subject} once its value becomes {ty}")
        }
        FailureKind::DeclarationSplit => format!("Cannot split the declaration of {subject} to give it type {ty}"),
    };
    FailureMessage {
        element: record.element,
        owner_root: record.owner_root,
        ty: ty.clone(),
        message,
    }
}

/// A varargs declaration keeps its `...` when handed an array type.
fn fit_declaration(declared: &JType, ty: JType) -> JType {
    match (declared, ty) {
        (JType::Varargs(_), JType::Array(component)) => JType::Varargs(component),
        (_, ty) => ty,
    }
}

fn array_depth(ty: &JType) -> usize {
    let mut depth = 0;
    let mut current = ty;
    while let Some(component) = current.component() {
        depth += 1;
        current = component;
    }
    depth
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::type_migration::domain::{BinaryOp, ProgramBuilder};
    use crate::features::type_migration::infrastructure::{NeverCancel, ProgramIndex, TemplateRule};
    use crate::features::type_migration::ports::ConversionRule;

    fn run(program: &Program, rules: &RuleRegistry, seeds: &[(DeclId, JType)]) -> (MigrationStats, Vec<FailureMessage>) {
        let index = ProgramIndex::build(program);
        let mut labeler = TypeMigrationLabeler::new(program, &index, &index, rules, LabelerSettings::default());
        labeler.migrate(seeds, &NeverCancel).unwrap();
        (labeler.stats(), labeler.failure_messages())
    }

    #[test]
    fn test_widening_assignment_needs_no_root() {
        let mut b = ProgramBuilder::new();
        b.file("A.java").class("A");
        b.method("f", JType::void(), &[]);
        let one = b.int(1);
        let x = b.local("x", JType::int(), Some(one));
        let read = b.var(x);
        let y = b.local("y", JType::long(), Some(read));
        b.end_method().end_class();
        let program = b.finish().unwrap();

        let index = ProgramIndex::build(&program);
        let rules = RuleRegistry::with_defaults();
        let mut labeler = TypeMigrationLabeler::new(&program, &index, &index, &rules, LabelerSettings::default());
        labeler.migrate(&[(x, JType::long())], &NeverCancel).unwrap();

        assert!(labeler.evaluator().is_migrated(x));
        assert!(!labeler.evaluator().is_migrated(y));
        assert!(labeler.conversions().is_empty());
        assert_eq!(labeler.stats().roots_accepted, 1);
    }

    #[test]
    fn test_narrowing_initializer_roots_the_reader() {
        let mut b = ProgramBuilder::new();
        b.file("A.java").class("A");
        let x = b.field("x", JType::int(), None);
        b.method("f", JType::void(), &[]);
        let read = b.var(x);
        let y = b.local("y", JType::int(), Some(read));
        b.end_method().end_class();
        let program = b.finish().unwrap();

        let index = ProgramIndex::build(&program);
        let rules = RuleRegistry::with_defaults();
        let mut labeler = TypeMigrationLabeler::new(&program, &index, &index, &rules, LabelerSettings::default());
        labeler.migrate(&[(x, JType::string())], &NeverCancel).unwrap();

        assert_eq!(labeler.evaluator().recorded(ElementRef::Decl(y)), Some(&JType::string()));
        assert_eq!(labeler.provenance().len(), 1);
    }

    #[test]
    fn test_unconvertible_return_fails() {
        let mut b = ProgramBuilder::new();
        b.file("A.java").class("A");
        let get = b.method("get", JType::int(), &[]);
        let value = b.int(42);
        b.ret(Some(value));
        b.end_method().end_class();
        let program = b.finish().unwrap();

        let (stats, failures) = run(&program, &RuleRegistry::with_defaults(), &[(get, JType::string())]);
        assert_eq!(stats.roots_accepted, 1);
        assert_eq!(failures.len(), 1);
        assert_eq!(
            failures[0].message,
            "Cannot convert type of expression 42 from int to String"
        );
    }

    #[test]
    fn test_operand_conversion_from_rule() {
        let mut b = ProgramBuilder::new();
        b.file("A.java").class("Text").end_class();
        b.class("A");
        let s = b.field("s", JType::string(), None);
        b.method("f", JType::void(), &[]);
        let read = b.var(s);
        let n = b.int(1);
        let sum = b.binary(BinaryOp::Add, read, n);
        b.local("r", JType::string(), Some(sum));
        b.end_method().end_class();
        let program = b.finish().unwrap();

        let mut rules = RuleRegistry::with_defaults();
        rules.register(TemplateRule::new(JType::class("Text"), JType::string(), "$.toString()"));
        let (stats, failures) = run(&program, &rules, &[(s, JType::class("Text"))]);
        assert_eq!(stats.conversions, 1);
        assert!(failures.is_empty());
    }

    #[test]
    fn test_library_seed_is_rejected() {
        let b = ProgramBuilder::new();
        let length = b.find_method("String", "length", 0).unwrap();
        let program = b.finish().unwrap();
        let index = ProgramIndex::build(&program);
        let rules = RuleRegistry::with_defaults();
        let mut labeler = TypeMigrationLabeler::new(&program, &index, &index, &rules, LabelerSettings::default());
        let err = labeler.migrate(&[(length, JType::long())], &NeverCancel).unwrap_err();
        assert!(matches!(err, MigrationError::InvalidRoot(_)));
    }

    #[test]
    fn test_getter_rename_proposed_for_boolean_field() {
        let mut b = ProgramBuilder::new();
        b.file("A.java").class("A");
        let flag = b.field("flag", JType::int(), None);
        let getter = b.method("getFlag", JType::int(), &[]);
        let read = b.var(flag);
        b.ret(Some(read));
        b.end_method().end_class();
        let program = b.finish().unwrap();

        let index = ProgramIndex::build(&program);
        let rules = RuleRegistry::with_defaults();
        let mut labeler = TypeMigrationLabeler::new(&program, &index, &index, &rules, LabelerSettings::default());
        labeler.migrate(&[(flag, JType::boolean())], &NeverCancel).unwrap();

        assert_eq!(labeler.rename_proposals().get(&getter).map(String::as_str), Some("isFlag"));
    }

    #[test]
    fn test_unrelated_conditional_keeps_declared_type() {
        let mut b = ProgramBuilder::new();
        b.file("A.java").class("Box").end_class();
        b.class("A");
        let x = b.field("x", JType::string(), None);
        let y = b.field("y", JType::string(), None);
        let c = b.field("c", JType::boolean(), None);
        b.method("f", JType::void(), &[]);
        let (read_c, read_x, read_y) = (b.var(c), b.var(x), b.var(y));
        let choice = b.conditional(read_c, read_x, read_y);
        let r = b.local("r", JType::string(), Some(choice));
        b.end_method().end_class();
        let program = b.finish().unwrap();

        let index = ProgramIndex::build(&program);
        let rules = RuleRegistry::with_defaults();
        let mut labeler = TypeMigrationLabeler::new(&program, &index, &index, &rules, LabelerSettings::default());
        labeler.migrate(&[(x, JType::class("Box"))], &NeverCancel).unwrap();

        assert_eq!(labeler.evaluate(read_x), Some(JType::class("Box")));
        assert_eq!(labeler.evaluate(choice), Some(JType::string()));
        assert!(!labeler.evaluator().is_migrated(r));
        assert!(!labeler.evaluator().is_migrated(y));
    }

    /// Infers type parameters from `Text` arguments as if they were `String`.
    struct TextAsString;

    impl ConversionRule for TextAsString {
        fn name(&self) -> &str {
            "text-as-string"
        }

        fn find_conversion(&self, _from: &JType, _to: &JType, _ctx: &RuleContext<'_>) -> Option<ConversionDescriptor> {
            None
        }

        fn bind_type_parameters(
            &self,
            _program: &Program,
            formal: &JType,
            actual: &JType,
            _method: DeclId,
            _call: ExprId,
        ) -> Option<(JType, JType)> {
            (actual.class_name() == Some("Text")).then(|| (formal.clone(), JType::string()))
        }
    }

    /// `<T> T pick(T a)` called as `String r = pick(s)`; returns the program,
    /// `s`, `r` and the call.
    fn generic_pick() -> (Program, DeclId, DeclId, ExprId) {
        let mut b = ProgramBuilder::new();
        b.file("A.java").class("Text").end_class();
        b.class("A");
        let s = b.field("s", JType::string(), None);
        let pick = b.generic_method(&["T"], "pick", JType::type_param("T"), &[("a", JType::type_param("T"))]);
        let a = b.param(pick, 0);
        let read_a = b.var(a);
        b.ret(Some(read_a));
        b.end_method();
        b.method("f", JType::void(), &[]);
        let read_s = b.var(s);
        let call = b.call(pick, vec![read_s]);
        let r = b.local("r", JType::string(), Some(call));
        b.end_method().end_class();
        (b.finish().unwrap(), s, r, call)
    }

    #[test]
    fn test_rule_binding_drives_call_type() {
        let (program, s, r, call) = generic_pick();
        let index = ProgramIndex::build(&program);
        let mut rules = RuleRegistry::with_defaults();
        rules.register(TextAsString);
        let mut labeler = TypeMigrationLabeler::new(&program, &index, &index, &rules, LabelerSettings::default());
        labeler.migrate(&[(s, JType::class("Text"))], &NeverCancel).unwrap();

        assert_eq!(labeler.evaluate(call), Some(JType::string()));
        assert!(!labeler.evaluator().is_migrated(r));
    }

    #[test]
    fn test_call_type_follows_argument_without_binding_rule() {
        let (program, s, _, call) = generic_pick();
        let index = ProgramIndex::build(&program);
        let rules = RuleRegistry::with_defaults();
        let mut labeler = TypeMigrationLabeler::new(&program, &index, &index, &rules, LabelerSettings::default());
        labeler.migrate(&[(s, JType::class("Text"))], &NeverCancel).unwrap();

        assert_eq!(labeler.evaluate(call), Some(JType::class("Text")));
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("flag"), "Flag");
        assert_eq!(capitalize(""), "");
    }
}
