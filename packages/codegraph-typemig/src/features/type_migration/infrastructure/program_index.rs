//! In-memory reference and override index over a [`Program`]

use crate::features::type_migration::domain::{DeclId, ExprId, ExprKind, MigrationScope, Program};
use crate::features::type_migration::ports::{OverrideSearch, ReferenceIndex};
use rustc_hash::FxHashMap;
use tracing::debug;

/// Precomputed reference lists and override relations.
///
/// A method overrides another when both are instance methods with the same
/// name and parameter count and the second is declared in a supertype of the
/// first's class.
#[derive(Debug, Default)]
pub struct ProgramIndex {
    references: FxHashMap<DeclId, Vec<(ExprId, String)>>,
    overriders: FxHashMap<DeclId, Vec<DeclId>>,
    overridden: FxHashMap<DeclId, Vec<DeclId>>,
}

impl ProgramIndex {
    pub fn build(program: &Program) -> Self {
        let mut index = Self::default();

        for (id, expr) in program.exprs() {
            let target = match &expr.kind {
                ExprKind::Reference { target, .. } => *target,
                ExprKind::MethodCall { method, .. } => *method,
                _ => continue,
            };
            index
                .references
                .entry(target)
                .or_default()
                .push((id, expr.file.clone()));
        }

        for class in program.classes().iter() {
            let mut supers = program.classes().supertypes_of(&class.name);
            if class.name != "Object" {
                supers.push("Object".to_string());
            }
            for method in class.methods() {
                let decl = program.decl(method);
                if decl.is_static {
                    continue;
                }
                for sup in &supers {
                    for candidate in program.methods_named(sup, &decl.name) {
                        let other = program.decl(candidate);
                        if other.is_static || other.params().len() != decl.params().len() {
                            continue;
                        }
                        index.overridden.entry(method).or_default().push(candidate);
                        index.overriders.entry(candidate).or_default().push(method);
                    }
                }
            }
        }
        for list in index.overriders.values_mut().chain(index.overridden.values_mut()) {
            list.sort();
            list.dedup();
        }

        debug!(
            referenced = index.references.len(),
            overriding = index.overridden.len(),
            "program index built"
        );
        index
    }
}

impl ReferenceIndex for ProgramIndex {
    fn references_to(&self, decl: DeclId, scope: &MigrationScope) -> Vec<ExprId> {
        self.references
            .get(&decl)
            .map(|refs| {
                refs.iter()
                    .filter(|(_, file)| scope.contains(file))
                    .map(|(id, _)| *id)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl OverrideSearch for ProgramIndex {
    fn overriders_of(&self, method: DeclId) -> Vec<DeclId> {
        self.overriders.get(&method).cloned().unwrap_or_default()
    }

    fn overridden_by(&self, method: DeclId) -> Vec<DeclId> {
        self.overridden.get(&method).cloned().unwrap_or_default()
    }
}
