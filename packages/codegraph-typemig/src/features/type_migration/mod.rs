//! Type migration
//!
//! Changes the type of a declaration and follows the change through every
//! place that reads or writes it: dependent declarations are migrated too,
//! expressions that cannot take the new type get a conversion or are
//! reported.
//!
//! Hexagonal layout:
//! - `domain`: program model, types, conversions, usages
//! - `ports`: what the engine needs from a host
//! - `infrastructure`: in-memory host and default rules
//! - `application`: labeler, edit producer, use case

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use application::{
    LabelerSettings, MigrationOutcome, MigrationPreview, MigrationProducer, ProducerReport, ProducerSettings,
    TypeMigrationLabeler, TypeMigrationProcessor,
};
pub use domain::{DeclId, ElementRef, ExprId, JType, Program, ProgramBuilder, UsageInfo, UsageKind};
