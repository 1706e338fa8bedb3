//! Transfers between local files and the remote blob store.
//!
//! - [`Uploader`]: streams a local file into the channel; the only
//!   cancellable transfer.
//! - [`Downloader`]: resolves a remote handle and writes the bytes into a
//!   destination directory without overwriting anything.
//! - [`Deleter`]: removes a remote message.
//! - [`TransferRegistry`]: in-flight uploads by record id, for routing
//!   cancel requests.
//!
//! Every transfer reports progress as whole percentages on an unbounded
//! channel and finishes with exactly one tagged outcome.

mod delete;
mod download;
pub mod naming;
mod progress;
mod registry;
mod types;
mod upload;

#[cfg(test)]
mod mock;

pub use delete::Deleter;
pub use download::Downloader;
pub use progress::{PercentTracker, ProgressStep};
pub use registry::TransferRegistry;
pub use types::{DeleteOutcome, DownloadOutcome, UploadOutcome, UploadSource, UploadState};
pub use upload::Uploader;

/// Receiving end of a transfer's progress channel.
pub type ProgressReceiver = tokio::sync::mpsc::UnboundedReceiver<u8>;

/// Sending end of a transfer's progress channel.
pub type ProgressSender = tokio::sync::mpsc::UnboundedSender<u8>;

/// Errors produced inside a transfer before they are folded into its outcome.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Remote(#[from] televault_remote::RemoteError),

    #[error("invalid file name: {0}")]
    InvalidName(String),
}
