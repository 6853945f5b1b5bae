//! Domain models for type migration

pub mod builder;
pub mod class_table;
pub mod conversion;
mod printer;
pub mod program;
pub mod report;
pub mod types;
pub mod typing;
pub mod usage_info;

pub use builder::{ProgramBuilder, LIBRARY_FILE};
pub use class_table::{ClassDecl, ClassTable, Member};
pub use conversion::{
    parse_template, ConversionDescriptor, FailureKind, FailureRecord, Placeholder, Replacement, TemplatePiece,
};
pub use program::{
    BinaryOp, Decl, DeclGroup, DeclId, DeclKind, ElementRef, Expr, ExprId, ExprKind, GroupId, MigrationScope, NodeRef,
    Program, Stmt, StmtId, StmtKind, UnaryOp, VisitTarget,
};
pub use report::{FailureMessage, MigrationReport, MigrationStats};
pub use types::{JType, PrimitiveKind};
pub use typing::{TypeEnv, TypeParamBinder};
pub use usage_info::{UsageInfo, UsageKind, UsageRole};
