//! Error types for Crucible
//!
//! All modules use `CrucibleResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Crucible operations
pub type CrucibleResult<T> = Result<T, CrucibleError>;

/// All errors that can occur in Crucible
#[derive(Error, Debug)]
pub enum CrucibleError {
    // Engine errors
    #[error("Container engine not found: {name}. {hint}")]
    EngineNotFound { name: String, hint: String },

    #[error("Container engine not ready: {reason}")]
    EngineNotReady { reason: String },

    // Provisioning errors
    #[error("Failed to build base image {tag}: {reason}")]
    ImageBuild { tag: String, reason: String },

    #[error("Failed to stage mount {path}: {reason}")]
    MountStage { path: PathBuf, reason: String },

    #[error("No directory mounted at {0}")]
    MountNotFound(String),

    // Command errors
    #[error("Command failed: {command}, exit code: {code}\n{output}")]
    CommandExit {
        command: String,
        code: i32,
        output: String,
    },

    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    // Serialization errors
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CrucibleError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a command exit error with captured output
    pub fn command_exit(command: impl Into<String>, code: i32, output: impl Into<String>) -> Self {
        Self::CommandExit {
            command: command.into(),
            code,
            output: output.into(),
        }
    }

    /// Captured output of the failed command, if any
    pub fn captured_output(&self) -> Option<&str> {
        match self {
            Self::CommandExit { output, .. } => Some(output),
            Self::ImageBuild { reason, .. } => Some(reason),
            _ => None,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::EngineNotFound { .. } => {
                Some("Install Podman: https://podman.io/docs/installation")
            }
            Self::EngineNotReady { .. } => Some("Run: podman system migrate"),
            Self::PathNotFound(_) => Some("Check the --source and --toolchain-file paths"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CrucibleError::command_exit("cargo check", 101, "error[E0308]");
        let msg = err.to_string();
        assert!(msg.contains("cargo check"));
        assert!(msg.contains("101"));
        assert!(msg.contains("error[E0308]"));
    }

    #[test]
    fn error_hint() {
        let err = CrucibleError::EngineNotFound {
            name: "podman".to_string(),
            hint: "install it".to_string(),
        };
        assert!(err.hint().unwrap().contains("podman.io"));
        assert!(CrucibleError::Internal("x".to_string()).hint().is_none());
    }

    #[test]
    fn captured_output_on_command_exit() {
        let err = CrucibleError::command_exit("cargo fmt", 1, "Diff in main.rs");
        assert_eq!(err.captured_output(), Some("Diff in main.rs"));
        assert!(CrucibleError::PathNotFound(PathBuf::from("/x"))
            .captured_output()
            .is_none());
    }
}
