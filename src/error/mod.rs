use std::path::PathBuf;
use thiserror::Error;

pub mod codes;

pub use codes::{describe_error_code, is_core_error_code, ErrorCode};

/// Errors raised to the *programmer* rather than returned as command data.
///
/// Runtime command failures never use this type; they travel inside
/// [`CommandResult`](crate::CommandResult) as a [`CommandError`](crate::CommandError).
/// `SwitchyardError` covers setup mistakes: duplicate registrations and
/// configuration that cannot be loaded.
#[derive(Error, Debug)]
pub enum SwitchyardError {
    #[error("Command '{name}' is already registered")]
    DuplicateCommand { name: String },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl SwitchyardError {
    /// Create a configuration error without an underlying source
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            path: None,
            source: None,
        }
    }

    /// Create a configuration error tied to a file
    pub fn config_at(
        message: impl Into<String>,
        path: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Config {
            message: message.into(),
            path: Some(path.into()),
            source: Some(source.into()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SwitchyardError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_duplicate_command_display() {
        let err = SwitchyardError::DuplicateCommand {
            name: "todo-create".to_string(),
        };
        assert_eq!(err.to_string(), "Command 'todo-create' is already registered");
    }

    #[test]
    fn test_config_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = SwitchyardError::config_at("Failed to read config", "/etc/switchyard.toml", io);
        assert!(err.to_string().contains("Failed to read config"));
        assert!(err.source().is_some());

        let plain = SwitchyardError::config("bad value");
        assert!(plain.source().is_none());
    }
}
