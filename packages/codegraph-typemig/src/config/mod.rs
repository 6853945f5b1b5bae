//! Migration configuration
//!
//! Two ways in:
//! - Preset plus builder overrides
//! - YAML v1 files
//!
//! # Examples
//!
//! ```rust,ignore
//! use codegraph_typemig::config::{MigrationConfig, Preset, RenamePolicy};
//!
//! let config = MigrationConfig::preset(Preset::Strict)
//!     .rename_getters(RenamePolicy::Always)
//!     .build()?;
//!
//! let config = MigrationConfig::from_yaml("migration.yaml")?;
//! ```

pub mod error;
pub mod io;
pub mod migration_config;
pub mod preset;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use io::{MigrationConfigV1, MigrationOverrides, RuleConfig, ScopeConfig};
pub use migration_config::{MigrationConfig, ValidatedConfig};
pub use preset::{Preset, PresetDefaults, RenamePolicy};
pub use validation::{parse_config_type, ConfigValidator, Validatable};
