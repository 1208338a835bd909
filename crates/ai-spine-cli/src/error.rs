//! Error types and handling for the CLI
//!
//! Library errors pass through unchanged; the CLI only adds the failure
//! modes of its own surface (files, config, argument parsing).

use ai_spine_core::ErrorKind;
use std::io;
use std::path::PathBuf;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for CLI operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error from ai-spine-core
    #[error(transparent)]
    Core(#[from] ai_spine_core::Error),

    /// Configuration file could not be read or parsed
    #[error("Invalid configuration file {}: {message}", path.display())]
    ConfigFile { path: PathBuf, message: String },

    /// An argument expected to hold JSON did not
    #[error("Invalid JSON for {argument}: {source}")]
    InvalidJson {
        argument: String,
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization error while writing output
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn invalid_json(argument: impl Into<String>, source: serde_json::Error) -> Self {
        Self::InvalidJson {
            argument: argument.into(),
            source,
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Io(_) => 1,
            Self::Core(core) => match core.kind() {
                ErrorKind::Configuration => 2,
                ErrorKind::Authentication => 3,
                ErrorKind::Validation => 4,
                ErrorKind::InsufficientCredits => 5,
                ErrorKind::RateLimit => 6,
                ErrorKind::Execution => 7,
                ErrorKind::Timeout => 8,
                ErrorKind::ResponseFormat => 9,
            },
            Self::ConfigFile { .. } => 2,
            Self::InvalidJson { .. } => 4,
            Self::Json(_) => 10,
        }
    }

    /// Check if this error should display usage help
    pub fn should_show_help(&self) -> bool {
        matches!(self, Self::InvalidJson { .. })
    }
}

/// Format an error for display to the user
pub fn format_error(error: &Error, use_color: bool) -> String {
    let label = match error {
        Error::Core(core) => core.kind().to_string(),
        _ => "Error".to_string(),
    };

    if use_color {
        use colored::Colorize;
        format!("{} {}", format!("{}:", label).red().bold(), error)
    } else {
        format!("{}: {}", label, error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_by_core_kind() {
        let auth: Error = ai_spine_core::Error::missing_api_key().into();
        assert_eq!(auth.exit_code(), 3);

        let timeout: Error = ai_spine_core::Error::Timeout {
            message: "execution exec-123 did not finish".to_string(),
            elapsed: None,
        }
        .into();
        assert_eq!(timeout.exit_code(), 8);

        let config: Error = ai_spine_core::Error::configuration("timeout cannot be zero").into();
        assert_eq!(config.exit_code(), 2);
    }

    #[test]
    fn test_format_error_labels_core_kind() {
        let err: Error = ai_spine_core::Error::validation("Flow ID is required").into();
        let formatted = format_error(&err, false);
        assert!(formatted.starts_with("ValidationError:"));
        assert!(formatted.contains("Flow ID is required"));
    }

    #[test]
    fn test_invalid_json_shows_help() {
        let source = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = Error::invalid_json("--input", source);
        assert!(err.should_show_help());
        assert_eq!(err.exit_code(), 4);
        assert!(err.to_string().contains("--input"));
    }
}
