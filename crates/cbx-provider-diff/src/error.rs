//! Provider diff errors.

use std::path::PathBuf;

use cbx_core::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    #[error("Configuration file '{}' not found!", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl DiffError {
    /// Output captured from the failing command, if any.
    pub fn captured_output(&self) -> Option<&str> {
        match self {
            DiffError::Core(e) => e.command_output(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DiffError>;
