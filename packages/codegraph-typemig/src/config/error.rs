//! Errors raised while loading or validating a migration configuration

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric setting outside its bounds
    #[error("'{field}' = {value} is outside {min}..={max}. {hint}")]
    Range {
        field: String,
        value: String,
        min: String,
        max: String,
        hint: String,
    },

    #[error("Migration config has no 'version' key; start the file with 'version: 1'.")]
    MissingVersion,

    #[error("Migration config version {found} is not supported (known: {})", join_versions(supported))]
    UnsupportedVersion { found: u32, supported: Vec<u32> },

    /// Unknown preset name
    #[error("Unknown preset '{0}'. Valid presets: strict, balanced, permissive")]
    UnknownPreset(String),

    /// A type written in the configuration does not parse
    #[error("Invalid type '{value}' in '{field}': {reason}")]
    InvalidType {
        field: String,
        value: String,
        reason: String,
    },

    /// A conversion rule entry is malformed
    #[error("Invalid rule #{index}: {reason}")]
    InvalidRule { index: usize, reason: String },

    #[error("Cannot read migration config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed migration config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid migration config: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

fn join_versions(versions: &[u32]) -> String {
    versions.iter().map(u32::to_string).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_version_message() {
        let err = ConfigError::UnsupportedVersion {
            found: 7,
            supported: vec![1],
        };
        assert_eq!(
            err.to_string(),
            "Migration config version 7 is not supported (known: 1)"
        );
    }

    #[test]
    fn test_invalid_rule_message() {
        let err = ConfigError::InvalidRule {
            index: 2,
            reason: "empty template".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid rule #2: empty template");
    }
}
