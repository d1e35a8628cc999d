//! Error taxonomy shared by the release tools.

/// Errors produced by process execution and the helpers built on top of it.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with status {code}")]
    CommandFailed {
        command: String,
        code: i32,
        output: String,
    },

    #[error("git error: {0}")]
    Git(String),

    #[error("logging setup failed: {0}")]
    Logging(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Captured output of a failed command, if this error carries one.
    pub fn command_output(&self) -> Option<&str> {
        match self {
            CoreError::CommandFailed { output, .. } => Some(output),
            _ => None,
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_display() {
        let err = CoreError::CommandFailed {
            command: "git clone lp:checkbox".to_string(),
            code: 128,
            output: "fatal: repository not found".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("git clone lp:checkbox"));
        assert!(msg.contains("128"));
        assert_eq!(err.command_output(), Some("fatal: repository not found"));
    }

    #[test]
    fn test_spawn_error_keeps_source() {
        let err = CoreError::Spawn {
            command: "bumpversion".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert!(err.to_string().contains("failed to start `bumpversion`"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.command_output().is_none());
    }
}
