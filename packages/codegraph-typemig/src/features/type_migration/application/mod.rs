//! Type Migration Application Layer (UseCase)
//!
//! - `TypeMigrationProcessor`: entry point; preview and apply
//! - `TypeMigrationLabeler`: worklist that labels what must change
//! - `MigrationProducer`: turns labels into edits

pub mod labeler;
pub mod migrate_type;
pub mod migration_producer;
mod statement_processor;
pub mod usage_sorter;

pub use labeler::{failure_message, LabelerSettings, RootGraph, TypeMigrationLabeler};
pub use migrate_type::{MigrationOutcome, MigrationPreview, TypeMigrationProcessor};
pub use migration_producer::{MigrationProducer, ProducerReport, ProducerSettings};
pub use usage_sorter::{edit_range, sort_usages};
