//! Release tool errors.

use cbx_core::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum ReleaseError {
    #[error("no tag found for {part}")]
    NoTagFound { part: String },

    #[error("unexpected bumpversion output, last line is {0:?}")]
    MalformedBumpOutput(String),

    #[error("manifest error: {0}")]
    Manifest(String),

    #[error("invalid source URL '{url}': {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to parse manifest: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ReleaseError {
    /// Output captured from the failing command, if any.
    pub fn captured_output(&self) -> Option<&str> {
        match self {
            ReleaseError::Core(e) => e.command_output(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReleaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_tag_message_names_part() {
        let err = ReleaseError::NoTagFound {
            part: "checkbox-provider-base".to_string(),
        };
        assert_eq!(err.to_string(), "no tag found for checkbox-provider-base");
        assert!(err.captured_output().is_none());
    }

    #[test]
    fn test_command_output_is_exposed() {
        let err: ReleaseError = CoreError::CommandFailed {
            command: "bumpversion release".to_string(),
            code: 2,
            output: "bumpversion: error".to_string(),
        }
        .into();
        assert_eq!(err.captured_output(), Some("bumpversion: error"));
    }
}
