//! Remote side of the vault: the Telegram Bot API used as a blob store.
//!
//! [`RemoteTransport`] is the seam the transfer logic is written against;
//! [`Client`] implements it over HTTPS with `reqwest`.

pub mod client;
pub mod transport;
pub mod types;

pub use client::{Client, RemoteError};
pub use transport::{
    ByteStream, BytesSentCallback, DocumentUpload, RemoteDownload, RemoteTransport, SentDocument,
    TransportFuture, UploadReader,
};

use std::time::Duration;

/// Size of the chunks streamed into an upload body and written during downloads.
pub const TRANSFER_CHUNK_SIZE: usize = 8 * 1024;

/// Connect timeout for every request.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Read timeout for small JSON API calls (`getFile`, `deleteMessage`).
pub const API_READ_TIMEOUT: Duration = Duration::from_secs(15);

/// Read timeout for document transfers (`sendDocument`, file download).
pub const TRANSFER_READ_TIMEOUT: Duration = Duration::from_secs(30);
