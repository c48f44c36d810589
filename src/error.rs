use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The framework installer ran but left no shell configuration file behind.
    #[error("Config file not found: {}. The framework install did not create it.", .0.display())]
    MissingConfigFile(PathBuf),

    #[error("Command `{program}` failed: {message}")]
    Command { program: String, message: String },

    #[error("Download of {url} failed with status {status}")]
    Download { url: String, status: u16 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unsupported archive type: {0}")]
    UnsupportedArchive(String),

    #[error("Shell '{name}' not found in PATH: {source}")]
    ShellNotFound {
        name: String,
        #[source]
        source: which::Error,
    },

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    IoRaw(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl ProvisionError {
    /// Attach the offending path to an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn command(program: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Command {
            program: program.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProvisionError>;
