//! Error types for bgw-core
//!
//! Every rejection the gateway can produce carries the human-readable
//! message that callers print or send back as the response body.

use thiserror::Error;

/// Result type alias for bgw-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the gateway and its storage backends
#[derive(Debug, Error)]
pub enum Error {
    /// The configured bucket does not exist (fatal at construction)
    #[error("Bucket does not exist: '{0}'")]
    BucketNotFound(String),

    /// Target key is already present; writes never overwrite
    #[error("{0}")]
    AlreadyExists(String),

    /// Object key does not exist
    #[error("{0}")]
    NotFound(String),

    /// No object lives under the folder prefix
    #[error("{0}")]
    FolderNotFound(String),

    /// Rename source and destination are identical
    #[error("{0}")]
    SameName(String),

    /// The backend call returned but the follow-up existence check disagreed
    #[error("{0}")]
    Unconfirmed(String),

    /// Key cannot be used as given
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    General(String),
}

impl Error {
    /// Whether the error is a contract rejection rather than an infrastructure failure
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::AlreadyExists(_)
                | Error::NotFound(_)
                | Error::FolderNotFound(_)
                | Error::SameName(_)
                | Error::InvalidKey(_)
        )
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}
