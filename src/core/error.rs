use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type ShellResult<T> = Result<T, ShellError>;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("invalid navigation target {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to write window settings to {}: {source}", .path.display())]
    PersistenceWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read window settings from {}: {source}", .path.display())]
    PersistenceRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("window error: {0}")]
    Window(String),
}

impl ShellError {
    pub fn window(msg: impl Into<String>) -> Self {
        Self::Window(msg.into())
    }
}
