/*
 * Codegraph TypeMig - Type Migration Engine
 *
 * Feature-First Hexagonal Architecture:
 * - shared/      : Common models (TextRange)
 * - features/    : type_migration (domain → ports → infrastructure → application)
 * - config/      : Presets, YAML v1 files, validation
 * - errors       : MigrationError / EditError
 *
 * Flow:
 * - Seed (declaration, new type) → labeler worklist → ordered usages
 * - Usages → edit producer → one committed batch of text edits
 */

// Crate-level lint configuration
#![allow(clippy::too_many_arguments)] // Flow checks take both sides' original and current types
#![allow(clippy::type_complexity)] // Provenance and usage tables
#![allow(clippy::should_implement_trait)] // Preset::from_str returns a plain String error
#![allow(clippy::new_without_default)] // Stores and editors keep explicit constructors

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports - Feature-First Architecture
// ═══════════════════════════════════════════════════════════════════════════

/// Shared models and utilities
pub mod shared;

/// Feature modules
pub mod features;

/// Configuration system
pub mod config;

/// Error types
pub mod errors;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use config::{MigrationConfig, Preset, RenamePolicy, ValidatedConfig};
pub use errors::{EditError, MigrationError, Result};
pub use features::type_migration::{
    DeclId, ElementRef, ExprId, JType, MigrationOutcome, MigrationPreview, Program, ProgramBuilder,
    TypeMigrationLabeler, TypeMigrationProcessor, UsageInfo, UsageKind,
};
