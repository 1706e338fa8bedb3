//! Bot API client.
//!
//! Async HTTP client using `reqwest`. Two connection pools are kept: one
//! for short JSON calls and one for document transfers, which get a longer
//! read timeout.

use futures_util::StreamExt;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use crate::transport::{
    DocumentUpload, RemoteDownload, RemoteTransport, SentDocument, TransportFuture,
};
use crate::types::{BareEnvelope, Envelope, RemoteFile, SentMessage};
use crate::{
    API_READ_TIMEOUT, CONNECT_TIMEOUT, TRANSFER_CHUNK_SIZE, TRANSFER_READ_TIMEOUT,
};

const DEFAULT_BASE_URL: &str = "https://api.telegram.org";

/// Characters left unescaped in a file path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Errors from the Bot API.
///
/// The `Display` output is meant to be shown to the user as is: the
/// remote's own description when it supplied one, else the HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Http(reqwest::Error),

    #[error("{}", status_message(.status, .description))]
    Status {
        status: u16,
        description: Option<String>,
    },

    #[error("{0}")]
    Api(String),

    #[error("invalid response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        // Request URLs embed the bot token.
        Self::Http(e.without_url())
    }
}

fn status_message(status: &u16, description: &Option<String>) -> String {
    match description {
        Some(d) if !d.is_empty() => d.clone(),
        _ => format!("HTTP error: {status}"),
    }
}

/// Telegram Bot API client bound to one bot token.
pub struct Client {
    api: reqwest::Client,
    transfer: reqwest::Client,
    base_url: String,
    token: String,
}

impl Client {
    /// Creates a client for the given bot token against the public Bot API.
    pub fn new(token: &str) -> Result<Self, RemoteError> {
        let api = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(API_READ_TIMEOUT)
            .build()?;
        let transfer = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(TRANSFER_READ_TIMEOUT)
            .build()?;

        Ok(Self {
            api,
            transfer,
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.to_string(),
        })
    }

    /// Points the client at another Bot API server (self-hosted or a test mock).
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.base_url, self.token)
    }

    fn file_url(&self, remote_path: &str) -> String {
        let encoded: Vec<String> = remote_path
            .split('/')
            .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
            .collect();
        format!("{}/file/bot{}/{}", self.base_url, self.token, encoded.join("/"))
    }

    /// `getFile`: resolves a file handle to its download path.
    pub async fn get_file_path(&self, file_handle: &str) -> Result<String, RemoteError> {
        let resp = self
            .api
            .get(self.method_url("getFile"))
            .query(&[("file_id", file_handle)])
            .send()
            .await?;
        let file: RemoteFile = read_result(resp).await?;

        file.file_path
            .filter(|p| !p.is_empty())
            .ok_or_else(|| RemoteError::InvalidResponse("missing file_path".into()))
    }

    /// Downloads the raw bytes at a path returned by [`get_file_path`](Self::get_file_path).
    pub async fn download(&self, remote_path: &str) -> Result<RemoteDownload, RemoteError> {
        let resp = self.transfer.get(self.file_url(remote_path)).send().await?;
        if resp.status() != StatusCode::OK {
            return Err(status_error(resp).await);
        }

        let content_length = resp.content_length();
        debug!(path = remote_path, ?content_length, "download stream opened");

        let body = resp.bytes_stream().map(|chunk| chunk.map_err(RemoteError::from));
        Ok(RemoteDownload {
            content_length,
            body: Box::pin(body),
        })
    }

    /// `sendDocument`: streams the document as a multipart upload.
    pub async fn send_document(
        &self,
        chat_target: &str,
        upload: DocumentUpload,
    ) -> Result<SentDocument, RemoteError> {
        let DocumentUpload {
            file_name,
            mime_type,
            reader,
            size_hint,
            mut on_bytes_sent,
        } = upload;

        let mut sent: u64 = 0;
        let stream = ReaderStream::with_capacity(reader, TRANSFER_CHUNK_SIZE).inspect(move |chunk| {
            if let Ok(bytes) = chunk {
                sent += bytes.len() as u64;
                on_bytes_sent(sent);
            }
        });
        let body = reqwest::Body::wrap_stream(stream);

        let part = match size_hint {
            Some(len) => Part::stream_with_length(body, len),
            None => Part::stream(body),
        }
        .file_name(file_name.clone())
        .mime_str(&mime_type)?;

        let form = Form::new()
            .text("chat_id", chat_target.to_string())
            .part("document", part);

        debug!(file = %file_name, ?size_hint, "sending document");
        let resp = self
            .transfer
            .post(self.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await?;
        let message: SentMessage = read_result(resp).await?;

        let file_handle = message
            .document
            .map(|d| d.file_id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| RemoteError::InvalidResponse("missing document.file_id".into()))?;
        if message.message_id.is_empty() {
            return Err(RemoteError::InvalidResponse("missing message_id".into()));
        }

        Ok(SentDocument {
            file_handle,
            message_handle: message.message_id,
        })
    }

    /// `deleteMessage`: removes a message from the channel.
    pub async fn delete_message(
        &self,
        chat_target: &str,
        message_handle: &str,
    ) -> Result<(), RemoteError> {
        let resp = self
            .api
            .get(self.method_url("deleteMessage"))
            .query(&[("chat_id", chat_target), ("message_id", message_handle)])
            .send()
            .await?;
        if resp.status() != StatusCode::OK {
            return Err(status_error(resp).await);
        }

        let envelope: BareEnvelope = serde_json::from_slice(&resp.bytes().await?)?;
        if !envelope.ok {
            return Err(api_error(envelope.description));
        }
        Ok(())
    }
}

impl RemoteTransport for Client {
    fn resolve_download_location<'a>(&'a self, file_handle: &'a str) -> TransportFuture<'a, String> {
        Box::pin(self.get_file_path(file_handle))
    }

    fn open_download<'a>(&'a self, remote_path: &'a str) -> TransportFuture<'a, RemoteDownload> {
        Box::pin(self.download(remote_path))
    }

    fn send_document<'a>(
        &'a self,
        chat_target: &'a str,
        upload: DocumentUpload,
    ) -> TransportFuture<'a, SentDocument> {
        Box::pin(Client::send_document(self, chat_target, upload))
    }

    fn delete_message<'a>(
        &'a self,
        chat_target: &'a str,
        message_handle: &'a str,
    ) -> TransportFuture<'a, ()> {
        Box::pin(Client::delete_message(self, chat_target, message_handle))
    }
}

/// Unwraps the `result` of a 200 response, or maps the failure.
async fn read_result<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, RemoteError> {
    if resp.status() != StatusCode::OK {
        return Err(status_error(resp).await);
    }

    let envelope: Envelope<T> = serde_json::from_slice(&resp.bytes().await?)?;
    if !envelope.ok {
        return Err(api_error(envelope.description));
    }
    envelope
        .result
        .ok_or_else(|| RemoteError::InvalidResponse("missing result".into()))
}

/// Builds a status error, pulling the description out of a JSON error body
/// when there is one.
async fn status_error(resp: reqwest::Response) -> RemoteError {
    let status = resp.status().as_u16();
    let description = match resp.bytes().await {
        Ok(body) => serde_json::from_slice::<BareEnvelope>(&body)
            .ok()
            .and_then(|e| e.description),
        Err(e) => {
            warn!(status, error = %e.without_url(), "failed to read error body");
            None
        }
    };
    warn!(status, ?description, "Bot API returned an error status");
    RemoteError::Status {
        status,
        description,
    }
}

fn api_error(description: Option<String>) -> RemoteError {
    RemoteError::Api(
        description
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| "Unknown error".into()),
    )
}
