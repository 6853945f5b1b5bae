//! Preset configurations
//!
//! Presets provide complete default settings for common migration styles.

use serde::{Deserialize, Serialize};

/// Configuration preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Review-first: never rewrites beyond type nodes and conversions
    ///
    /// - Unused locals with a void/null right-hand side: reported as failures
    /// - Multi-variable declarations: reported instead of split
    /// - Getter renames: never
    /// - Dequeue bound: 10 000
    Strict,

    /// Default behaviour
    ///
    /// - Unused locals eliminated, declarations split
    /// - Getter renames: ask the rename prompt
    /// - Dequeue bound: 100 000
    Balanced,

    /// Apply everything without asking
    ///
    /// - Getter renames: always
    /// - No dequeue bound
    Permissive,
}

/// What to do with getters whose naming convention a migration breaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenamePolicy {
    Ask,
    Always,
    Never,
}

/// Settings a preset expands to before per-field overrides apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresetDefaults {
    pub eliminate_unused_locals: bool,
    pub split_declarations: bool,
    pub rename_getters: RenamePolicy,
    /// 0 means unbounded
    pub max_dequeues: usize,
}

impl Preset {
    pub fn defaults(&self) -> PresetDefaults {
        match self {
            Self::Strict => PresetDefaults {
                eliminate_unused_locals: false,
                split_declarations: false,
                rename_getters: RenamePolicy::Never,
                max_dequeues: 10_000,
            },
            Self::Balanced => PresetDefaults {
                eliminate_unused_locals: true,
                split_declarations: true,
                rename_getters: RenamePolicy::Ask,
                max_dequeues: 100_000,
            },
            Self::Permissive => PresetDefaults {
                eliminate_unused_locals: true,
                split_declarations: true,
                rename_getters: RenamePolicy::Always,
                max_dequeues: 0,
            },
        }
    }

    /// Parse preset from string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "balanced" => Ok(Self::Balanced),
            "permissive" => Ok(Self::Permissive),
            _ => Err(format!(
                "Unknown preset '{}'. Valid presets: strict, balanced, permissive",
                s
            )),
        }
    }

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Balanced => "balanced",
            Self::Permissive => "permissive",
        }
    }
}

impl Default for Preset {
    fn default() -> Self {
        Self::Balanced
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_parsing() {
        assert_eq!(Preset::from_str("strict").unwrap(), Preset::Strict);
        assert_eq!(Preset::from_str("STRICT").unwrap(), Preset::Strict);
        assert_eq!(Preset::from_str("balanced").unwrap(), Preset::Balanced);
        assert_eq!(Preset::from_str("permissive").unwrap(), Preset::Permissive);
        assert!(Preset::from_str("invalid").is_err());
    }

    #[test]
    fn test_preset_display() {
        assert_eq!(Preset::Strict.to_string(), "strict");
        assert_eq!(Preset::Balanced.to_string(), "balanced");
        assert_eq!(Preset::Permissive.to_string(), "permissive");
    }

    #[test]
    fn test_preset_defaults() {
        assert!(!Preset::Strict.defaults().eliminate_unused_locals);
        assert_eq!(Preset::Balanced.defaults().rename_getters, RenamePolicy::Ask);
        assert_eq!(Preset::Permissive.defaults().max_dequeues, 0);
    }

    #[test]
    fn test_default_is_balanced() {
        assert_eq!(Preset::default(), Preset::Balanced);
    }
}
