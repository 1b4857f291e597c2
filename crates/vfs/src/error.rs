//! Error taxonomy shared by the virtual and local file objects

use thiserror::Error;

/// Errors raised by file and folder operations
#[derive(Debug, Error)]
pub enum FsError {
    /// Path has no resolvable object
    #[error("No such file or folder: {0}")]
    NotFound(String),

    /// Destination of a create/move/copy is already taken
    #[error("File or folder already exists: {0}")]
    Exists(String),

    /// Content is not valid UTF-8
    #[error("Could not decode file as UTF-8: {0}")]
    Unicode(String),

    /// Etag check failed: the file was modified since it was read
    #[error("File changed on disk since last read: {0}")]
    Changed(String),

    /// A required folder segment of a path did not resolve
    #[error("Invalid folder: {0}")]
    InvalidFolder(String),

    /// Path is not below the folder it was requested from
    #[error("{path} is not below {parent}")]
    PathLookup { path: String, parent: String },

    /// Credentials are missing or could not be refreshed
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Any failure reported by the remote service
    #[error(transparent)]
    Remote(#[from] anyhow::Error),
}

impl FsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, FsError>;
