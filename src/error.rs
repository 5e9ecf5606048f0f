// Error types shared by the library modules. The binary wraps these in
// `anyhow` at the top level, the same way the API client used to.

use std::path::PathBuf;

use thiserror::Error;

use crate::state::ConnectionState;

pub type Result<T> = std::result::Result<T, UploadError>;

#[derive(Error, Debug)]
pub enum UploadError {
    /// A send was attempted while the connection was not in the Open state.
    #[error("connection is not open (state: {0})")]
    NotOpen(ConnectionState),
    /// Reading the selected file failed. Only that upload attempt is lost.
    #[error("failed to read {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid server url: {0}")]
    InvalidUrl(String),
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("upload handler is no longer running")]
    HandlerGone,
}

impl UploadError {
    /// True when the error came from the out-of-state send check.
    pub fn is_not_open(&self) -> bool {
        matches!(self, UploadError::NotOpen(_))
    }
}
