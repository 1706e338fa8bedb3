//! The transport seam used by uploads, downloads and deletes.
//!
//! Transfer logic only sees this trait, so it can be driven by mocks in
//! tests and by [`Client`](crate::Client) in production.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;
use tokio::io::AsyncRead;

use crate::client::RemoteError;

/// Boxed future returned by every transport call.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RemoteError>> + Send + 'a>>;

/// Byte source streamed into an upload.
pub type UploadReader = Pin<Box<dyn AsyncRead + Send + Sync>>;

/// Callback receiving the cumulative number of body bytes handed to the
/// connection, after each chunk.
pub type BytesSentCallback = Box<dyn FnMut(u64) + Send + Sync>;

/// Body of a remote file being downloaded.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, RemoteError>> + Send>>;

/// A document to push to the channel.
pub struct DocumentUpload {
    /// File name presented to the remote (and shown in the channel).
    pub file_name: String,
    pub mime_type: String,
    pub reader: UploadReader,
    /// Total size if known; lets the body carry a `Content-Length`.
    pub size_hint: Option<u64>,
    pub on_bytes_sent: BytesSentCallback,
}

/// Handles returned by a successful `sendDocument`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentDocument {
    pub file_handle: String,
    pub message_handle: String,
}

/// An open download.
pub struct RemoteDownload {
    pub content_length: Option<u64>,
    pub body: ByteStream,
}

/// Operations the vault needs from the remote blob store.
pub trait RemoteTransport: Send + Sync {
    /// Resolves a remote-file handle to the path it can be fetched from.
    fn resolve_download_location<'a>(&'a self, file_handle: &'a str) -> TransportFuture<'a, String>;

    /// Opens a byte stream for a path returned by
    /// [`resolve_download_location`](Self::resolve_download_location).
    fn open_download<'a>(&'a self, remote_path: &'a str) -> TransportFuture<'a, RemoteDownload>;

    /// Streams a document into the channel.
    fn send_document<'a>(
        &'a self,
        chat_target: &'a str,
        upload: DocumentUpload,
    ) -> TransportFuture<'a, SentDocument>;

    /// Deletes a previously sent message from the channel.
    fn delete_message<'a>(
        &'a self,
        chat_target: &'a str,
        message_handle: &'a str,
    ) -> TransportFuture<'a, ()>;
}
