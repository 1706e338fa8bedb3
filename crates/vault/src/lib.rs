//! The vault: a local index of files kept in a remote channel.
//!
//! [`Vault`] is the entry point. It owns the [`MetadataStore`], the
//! [`TransferRegistry`] of in-flight uploads and the [`RemoteTransport`],
//! and keeps the index consistent with the outcome of every transfer.
//!
//! [`MetadataStore`]: televault_index::MetadataStore
//! [`TransferRegistry`]: televault_transfer::TransferRegistry
//! [`RemoteTransport`]: televault_remote::RemoteTransport

mod error;
mod listing;
mod vault;

pub use error::VaultError;
pub use listing::{SortOrder, VaultStats};
pub use vault::{DownloadHandle, UploadHandle, Vault};

/// Largest file accepted for upload by default (the Bot API's limit).
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 50 * 1024 * 1024;

/// How many records a "recent files" listing shows by default.
pub const DEFAULT_RECENT_LIMIT: usize = 10;
