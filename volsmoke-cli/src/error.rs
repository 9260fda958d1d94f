//! CLI-specific error types and exit code mapping

use volsmoke_core::error::{StorageError, VolsmokeError};
use volsmoke_docker::DockerVolumeError;
use volsmoke_harness::HarnessError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The lifecycle ran and did not pass.
    #[error("lifecycle failed: {0}")]
    LifecycleFailed(String),

    /// Cannot reach the storage backend.
    #[error("storage backend not reachable: {0}")]
    BackendUnavailable(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from volsmoke-core.
    #[error("{0}")]
    Core(#[from] VolsmokeError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                      |
    /// |------|------------------------------|
    /// | 0    | Success                      |
    /// | 1    | Lifecycle / command failure  |
    /// | 2    | Configuration error          |
    /// | 3    | Storage backend unreachable  |
    /// | 10   | IO error                     |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::BackendUnavailable(_) => 3,
            Self::Io(_) => 10,
            Self::Core(VolsmokeError::Config(_)) => 2,
            Self::Core(VolsmokeError::Storage(StorageError::Connection(_))) => 3,
            Self::Core(VolsmokeError::Io(_)) => 10,
            Self::Core(VolsmokeError::Storage(_))
            | Self::JsonSerialize(_)
            | Self::Command(_)
            | Self::LifecycleFailed(_) => 1,
        }
    }
}

impl From<HarnessError> for CliError {
    fn from(e: HarnessError) -> Self {
        match e {
            HarnessError::Config { .. } => Self::Config(e.to_string()),
            other => Self::LifecycleFailed(other.to_string()),
        }
    }
}

impl From<DockerVolumeError> for CliError {
    fn from(e: DockerVolumeError) -> Self {
        match e {
            DockerVolumeError::Config { .. } => Self::Config(e.to_string()),
            DockerVolumeError::DockerConnection(msg) => Self::BackendUnavailable(msg),
            other => Self::Command(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use volsmoke_core::error::ConfigError;
    use volsmoke_harness::LifecycleState;

    #[test]
    fn test_exit_code_config_error() {
        let err = CliError::Config("test error".to_owned());
        assert_eq!(err.exit_code(), 2, "config error should return exit code 2");
    }

    #[test]
    fn test_exit_code_lifecycle_failed() {
        let err = CliError::LifecycleFailed("mounted step failed".to_owned());
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_backend_unavailable() {
        let err = CliError::BackendUnavailable("no socket".to_owned());
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = CliError::Io(io_err);
        assert_eq!(err.exit_code(), 10, "io error should return exit code 10");
    }

    #[test]
    fn test_exit_code_core_errors_follow_their_kind() {
        let config: CliError = VolsmokeError::Config(ConfigError::FileNotFound {
            path: "volsmoke.toml".to_owned(),
        })
        .into();
        assert_eq!(config.exit_code(), 2);

        let connection: CliError =
            VolsmokeError::Storage(StorageError::Connection("refused".to_owned())).into();
        assert_eq!(connection.exit_code(), 3);

        let operation: CliError =
            VolsmokeError::Storage(StorageError::operation("create", "quota")).into();
        assert_eq!(operation.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_json_serialize_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid json")
            .expect_err("should fail parsing");
        let err = CliError::JsonSerialize(json_err);
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_from_harness_config_error() {
        let err: CliError = HarnessError::Config {
            field: "max_attempts".to_owned(),
            reason: "must be 1-100".to_owned(),
        }
        .into();
        assert!(matches!(err, CliError::Config(_)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_from_harness_lifecycle_error() {
        let err: CliError = HarnessError::Operation {
            state: LifecycleState::Mounted,
            reason: "mount failed: busy".to_owned(),
        }
        .into();
        assert!(matches!(err, CliError::LifecycleFailed(_)));
        assert!(err.to_string().contains("mounted"));
    }

    #[test]
    fn test_from_docker_connection_error() {
        let err: CliError = DockerVolumeError::DockerConnection("refused".to_owned()).into();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_error_display_config() {
        let err = CliError::Config("invalid TOML syntax".to_owned());
        let display_str = format!("{}", err);
        assert!(display_str.contains("configuration error"));
        assert!(display_str.contains("invalid TOML syntax"));
    }
}
