use std::path::PathBuf;

/// Errors returned by [`Vault`](crate::Vault) operations.
///
/// Transfer failures are not errors: they come back as the transfer's
/// outcome.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error(transparent)]
    Store(#[from] televault_index::StoreError),

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not a file path: {0}")]
    InvalidPath(PathBuf),

    #[error("{0} is empty")]
    EmptyFile(PathBuf),

    #[error("file is {size} bytes, the limit is {limit} bytes")]
    SizeLimitExceeded { size: u64, limit: u64 },

    #[error("no record with id {0}")]
    NotFound(String),

    #[error("record {0} is already uploaded")]
    AlreadyUploaded(String),

    #[error("an upload of record {0} is already in flight")]
    UploadInProgress(String),

    #[error("record {0} has no remote file to download")]
    NotDownloadable(String),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
