//! Upload state machine.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use televault_remote::{DocumentUpload, RemoteTransport};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::progress::{PercentTracker, ProgressStep};
use crate::types::{UploadOutcome, UploadSource, UploadState};
use crate::ProgressSender;

/// One upload of one record.
///
/// Cheap to clone: clones share the cancellation token and state, which is
/// how the [`TransferRegistry`](crate::TransferRegistry) cancels a transfer
/// that another task is driving.
#[derive(Clone)]
pub struct Uploader {
    id: String,
    cancel: CancellationToken,
    state: Arc<Mutex<UploadState>>,
}

impl Uploader {
    /// Creates an idle uploader for the record `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            cancel: CancellationToken::new(),
            state: Arc::new(Mutex::new(UploadState::Idle)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> UploadState {
        *self.lock_state()
    }

    /// Requests cancellation.
    ///
    /// The in-flight request is dropped, which closes its connection. A
    /// cancel that arrives before the remote's answer always ends the
    /// upload as [`UploadOutcome::Cancelled`], even if the remote may have
    /// stored the document.
    pub fn cancel(&self) {
        debug!(id = %self.id, "upload cancel requested");
        self.cancel.cancel();
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Runs the upload to completion.
    ///
    /// Progress percentages go to `progress`; in-flight values stop at 99
    /// and 100 is sent only after the remote confirmed the document. The
    /// sender is dropped before this returns, so a receiver drained to the
    /// end has seen every event before the outcome is observed.
    ///
    /// An uploader runs once; calling `start` again fails without touching
    /// its state.
    pub async fn start(
        &self,
        transport: &dyn RemoteTransport,
        chat_target: &str,
        source: UploadSource,
        progress: ProgressSender,
    ) -> UploadOutcome {
        if !self.begin() {
            return UploadOutcome::Failed("upload already started".into());
        }

        let outcome = self.send(transport, chat_target, source, &progress).await;
        if matches!(outcome, UploadOutcome::Succeeded { .. }) {
            let _ = progress.send(100);
        }
        *self.lock_state() = outcome.state();

        match &outcome {
            UploadOutcome::Succeeded { message_handle, .. } => {
                info!(id = %self.id, message = %message_handle, "upload succeeded");
            }
            UploadOutcome::Failed(error) => warn!(id = %self.id, %error, "upload failed"),
            UploadOutcome::Cancelled => info!(id = %self.id, "upload cancelled"),
        }
        outcome
    }

    async fn send(
        &self,
        transport: &dyn RemoteTransport,
        chat_target: &str,
        source: UploadSource,
        progress: &ProgressSender,
    ) -> UploadOutcome {
        if self.cancel.is_cancelled() {
            return UploadOutcome::Cancelled;
        }

        let (file, size) = match open_source(&source).await {
            Ok(opened) => opened,
            Err(e) => return UploadOutcome::Failed(format!("could not read file: {e}")),
        };
        debug!(id = %self.id, file = %source.file_name, size, "upload started");

        let mut tracker = PercentTracker::new(Some(size), ProgressStep::EveryPercent).with_ceiling(99);
        let tx = progress.clone();
        let upload = DocumentUpload {
            file_name: source.file_name,
            mime_type: source.mime_type,
            reader: Box::pin(file),
            size_hint: Some(size),
            on_bytes_sent: Box::new(move |sent| {
                if let Some(percent) = tracker.update(sent) {
                    let _ = tx.send(percent);
                }
            }),
        };

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return UploadOutcome::Cancelled,
            result = transport.send_document(chat_target, upload) => result,
        };

        match result {
            Ok(sent) => UploadOutcome::Succeeded {
                file_handle: sent.file_handle,
                message_handle: sent.message_handle,
            },
            // The failure may be the aborted connection itself.
            Err(_) if self.cancel.is_cancelled() => UploadOutcome::Cancelled,
            Err(e) => UploadOutcome::Failed(e.to_string()),
        }
    }

    /// Moves `Idle` to `Sending`; false if the uploader already ran.
    fn begin(&self) -> bool {
        let mut state = self.lock_state();
        if *state != UploadState::Idle {
            return false;
        }
        *state = UploadState::Sending;
        true
    }

    fn lock_state(&self) -> MutexGuard<'_, UploadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn open_source(source: &UploadSource) -> std::io::Result<(tokio::fs::File, u64)> {
    let file = tokio::fs::File::open(&source.path).await?;
    let size = file.metadata().await?.len();
    Ok((file, size))
}
