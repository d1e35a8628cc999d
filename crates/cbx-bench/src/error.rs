//! Benchmark harness errors.

use std::path::PathBuf;

use cbx_core::CoreError;

/// Where a launcher was being run when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Local,
    Remote,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Local => f.write_str("locally"),
            RunMode::Remote => f.write_str("remotely"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error(
        "It seems you don't have benchmarking provider cloned in {}.\n\
         clone it with: git clone {}",
        .path.display(),
        .url
    )]
    ProviderMissing { path: PathBuf, url: &'static str },

    #[error("Failed to run the slave: {0}")]
    SlaveStart(#[source] CoreError),

    #[error("Failed to {mode} run launcher {}", .launcher.display())]
    LauncherFailed {
        mode: RunMode,
        launcher: PathBuf,
        #[source]
        source: CoreError,
    },

    #[error("Slave died by its own. Benchmarking failed")]
    SlaveDied,

    #[error("failed to prepare the benchmark environment: {0}")]
    Environment(#[source] CoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl BenchError {
    /// Output captured from the failing command, for diagnosis.
    pub fn captured_output(&self) -> Option<&str> {
        match self {
            BenchError::LauncherFailed { source, .. }
            | BenchError::Environment(source)
            | BenchError::SlaveStart(source)
            | BenchError::Core(source) => source.command_output(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launcher_failed_message() {
        let err = BenchError::LauncherFailed {
            mode: RunMode::Remote,
            launcher: PathBuf::from("/bench/benchmarking-provider/launcher-alpha"),
            source: CoreError::CommandFailed {
                command: "checkbox-cli master localhost launcher-alpha".to_string(),
                code: 1,
                output: "Connection refused".to_string(),
            },
        };
        assert_eq!(
            err.to_string(),
            "Failed to remotely run launcher /bench/benchmarking-provider/launcher-alpha"
        );
        assert_eq!(err.captured_output(), Some("Connection refused"));
    }

    #[test]
    fn test_provider_missing_mentions_clone_command() {
        let err = BenchError::ProviderMissing {
            path: PathBuf::from("/bench/benchmarking-provider"),
            url: "https://example.invalid/benchmarking-provider",
        };
        let msg = err.to_string();
        assert!(msg.contains("git clone https://example.invalid/benchmarking-provider"));
        assert!(err.captured_output().is_none());
    }
}
