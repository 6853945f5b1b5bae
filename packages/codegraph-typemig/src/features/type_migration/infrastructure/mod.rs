//! Infrastructure implementations of the type migration ports

pub mod builtin_rules;
pub mod program_index;
pub mod progress;
pub mod rule_registry;
pub mod source_editor;
pub mod type_evaluator;

pub use builtin_rules::{IdentityRule, MemberRenameRule, TemplateRule};
pub use program_index::ProgramIndex;
pub use progress::{CancellationFlag, FixedRenameAnswer, NeverCancel};
pub use rule_registry::RuleRegistry;
pub use source_editor::{EditRecord, SourceEditor};
pub use type_evaluator::TypeEvaluator;
