//! Scriptable [`RemoteTransport`] for transfer tests.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use televault_remote::{
    DocumentUpload, RemoteDownload, RemoteError, RemoteTransport, SentDocument, TransportFuture,
};
use tokio::io::AsyncReadExt;
use tokio::sync::Notify;

use crate::Uploader;

/// What `send_document` does once the body has been consumed.
pub(crate) enum SendBehavior {
    Succeed,
    Fail(String),
    /// Signals `body_sent`, then waits for `release` before succeeding.
    WaitThenSucceed,
    /// Cancels the given uploader and fails, as a torn-down connection would.
    CancelThenFail(Uploader),
}

pub(crate) struct MockTransport {
    pub send: Mutex<SendBehavior>,
    pub body_sent: Arc<Notify>,
    pub release: Arc<Notify>,
    pub received: Mutex<Vec<u8>>,
    pub file_path: Result<String, String>,
    pub chunks: Vec<Vec<u8>>,
    pub content_length: Option<u64>,
    /// Fail the download stream after this many chunks.
    pub fail_after: Option<usize>,
    pub delete_error: Option<String>,
    pub deleted: Mutex<Vec<(String, String)>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self {
            send: Mutex::new(SendBehavior::Succeed),
            body_sent: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
            received: Mutex::new(Vec::new()),
            file_path: Ok("documents/file_1".into()),
            chunks: Vec::new(),
            content_length: None,
            fail_after: None,
            delete_error: None,
            deleted: Mutex::new(Vec::new()),
        }
    }
}

impl MockTransport {
    pub fn with_send(behavior: SendBehavior) -> Self {
        Self {
            send: Mutex::new(behavior),
            ..Self::default()
        }
    }

    /// A download of `data` split into `chunk` sized pieces.
    pub fn serving(data: &[u8], chunk: usize) -> Self {
        Self {
            chunks: data.chunks(chunk).map(<[u8]>::to_vec).collect(),
            content_length: Some(data.len() as u64),
            ..Self::default()
        }
    }
}

impl RemoteTransport for MockTransport {
    fn resolve_download_location<'a>(&'a self, _file_handle: &'a str) -> TransportFuture<'a, String> {
        Box::pin(async move { self.file_path.clone().map_err(RemoteError::Api) })
    }

    fn open_download<'a>(&'a self, _remote_path: &'a str) -> TransportFuture<'a, RemoteDownload> {
        Box::pin(async move {
            let mut items: Vec<Result<Bytes, RemoteError>> = self
                .chunks
                .iter()
                .map(|c| Ok(Bytes::from(c.clone())))
                .collect();
            if let Some(n) = self.fail_after {
                items.truncate(n);
                items.push(Err(RemoteError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "connection reset",
                ))));
            }
            Ok(RemoteDownload {
                content_length: self.content_length,
                body: Box::pin(futures_util::stream::iter(items)),
            })
        })
    }

    fn send_document<'a>(
        &'a self,
        _chat_target: &'a str,
        upload: DocumentUpload,
    ) -> TransportFuture<'a, SentDocument> {
        Box::pin(async move {
            let DocumentUpload {
                mut reader,
                mut on_bytes_sent,
                ..
            } = upload;

            let mut buf = vec![0u8; 8192];
            let mut sent = 0u64;
            loop {
                let n = reader.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                self.received.lock().unwrap().extend_from_slice(&buf[..n]);
                sent += n as u64;
                on_bytes_sent(sent);
            }

            let behavior = std::mem::replace(&mut *self.send.lock().unwrap(), SendBehavior::Succeed);
            match behavior {
                SendBehavior::Succeed => {}
                SendBehavior::Fail(msg) => return Err(RemoteError::Api(msg)),
                SendBehavior::WaitThenSucceed => {
                    self.body_sent.notify_one();
                    self.release.notified().await;
                }
                SendBehavior::CancelThenFail(uploader) => {
                    uploader.cancel();
                    return Err(RemoteError::Io(std::io::Error::new(
                        std::io::ErrorKind::ConnectionAborted,
                        "socket closed",
                    )));
                }
            }

            Ok(SentDocument {
                file_handle: "fid-1".into(),
                message_handle: "mid-1".into(),
            })
        })
    }

    fn delete_message<'a>(
        &'a self,
        chat_target: &'a str,
        message_handle: &'a str,
    ) -> TransportFuture<'a, ()> {
        Box::pin(async move {
            if let Some(msg) = &self.delete_error {
                return Err(RemoteError::Api(msg.clone()));
            }
            self.deleted
                .lock()
                .unwrap()
                .push((chat_target.to_string(), message_handle.to_string()));
            Ok(())
        })
    }
}
