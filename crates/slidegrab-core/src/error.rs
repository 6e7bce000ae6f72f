//! Error types for command-line selections and configuration.

use thiserror::Error;

/// A category or section value the site does not list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlidegrabError {
    /// Category slug outside the supported list
    #[error("unsupported category '{0}' (use `list-categories` to see valid values or 'all')")]
    UnknownCategory(String),

    /// Section name other than featured, popular or new
    #[error("unsupported section '{0}' (expected featured, popular, new or 'all')")]
    UnknownSection(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// Config file not found at an explicitly requested path
    #[error("config file not found at {path}")]
    NotFound {
        /// Path where config was expected
        path: String,
    },

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// I/O error reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SlidegrabError::UnknownCategory("cats".to_string());
        assert_eq!(
            err.to_string(),
            "unsupported category 'cats' (use `list-categories` to see valid values or 'all')"
        );

        let err = ConfigError::InvalidValue {
            field: "pool.concurrency".to_string(),
            reason: "must be at least 1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value for pool.concurrency: must be at least 1"
        );
    }

    #[test]
    fn test_config_error_from_toml() {
        let toml_err = toml::from_str::<toml::Value>("= broken").unwrap_err();
        let err: ConfigError = toml_err.into();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}
