use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error while {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode {0}")]
    Encode(String),

    #[error("Failed to decode {0}")]
    Decode(String),

    #[error("Unsupported snapshot format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("List '{0}' already exists")]
    DuplicateList(String),

    #[error("List '{0}' not found")]
    NotFound(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl StoreError {
    pub fn io(context: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |source| Self::Io { context, source }
    }
}

impl From<rmp_serde::encode::Error> for StoreError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        Self::Encode(err.to_string())
    }
}

impl From<rmp_serde::decode::Error> for StoreError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
