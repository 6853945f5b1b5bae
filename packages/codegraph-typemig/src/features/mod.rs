//! Feature modules

pub mod type_migration;
