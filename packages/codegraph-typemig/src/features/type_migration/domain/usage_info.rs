//! Migration usages
//!
//! One `UsageInfo` per element the edit phase must touch.

use super::conversion::ConversionDescriptor;
use super::program::{DeclId, ElementRef};
use super::types::JType;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Place of a declaration inside an override family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsageRole {
    Plain,
    /// The method the migration reached first; others in its family follow it.
    Overridden,
    /// Migrated because it overrides (or is overridden by) `base`.
    Overrider { base: DeclId },
}

/// What the edit phase does with a usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsageKind {
    /// Replace the declared type, and rename the declaration when `rename` is set.
    Declaration { ty: JType, rename: Option<String> },
    Conversion(ConversionDescriptor),
    /// Replace the type written in a `new` expression.
    NewExpression { ty: JType },
    /// Remove a local whose value cannot take the new type.
    EliminatedLocal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageInfo {
    pub element: ElementRef,
    /// Root whose migration produced this usage; `None` for seeds.
    pub owner_root: Option<ElementRef>,
    /// Set by callers who want to skip the edit while keeping the record.
    pub excluded: bool,
    pub role: UsageRole,
    pub kind: UsageKind,
}

impl UsageInfo {
    pub fn new(element: ElementRef, kind: UsageKind) -> Self {
        Self {
            element,
            owner_root: None,
            excluded: false,
            role: UsageRole::Plain,
            kind,
        }
    }

    pub fn with_owner(mut self, owner: Option<ElementRef>) -> Self {
        self.owner_root = owner;
        self
    }

    pub fn with_role(mut self, role: UsageRole) -> Self {
        self.role = role;
        self
    }
}

impl PartialEq for UsageInfo {
    fn eq(&self, other: &Self) -> bool {
        self.element == other.element && self.kind == other.kind
    }
}

impl Eq for UsageInfo {}

impl Hash for UsageInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.element.hash(state);
    }
}
