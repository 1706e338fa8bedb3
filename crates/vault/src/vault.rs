use std::path::{Path, PathBuf};
use std::sync::Arc;

use televault_index::{FileKind, FileRecord, MetadataStore, StoreError, mime_type};
use televault_remote::RemoteTransport;
use televault_transfer::{
    DeleteOutcome, Deleter, DownloadOutcome, Downloader, ProgressReceiver, TransferRegistry,
    UploadOutcome, UploadSource, Uploader,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::{DEFAULT_MAX_UPLOAD_SIZE, SortOrder, VaultError, VaultStats};

/// A running upload.
///
/// `progress` closes before `task` resolves, so draining it first and then
/// awaiting `task` sees every percentage before the outcome. By the time
/// `task` resolves the index already reflects the outcome.
pub struct UploadHandle {
    pub id: String,
    pub progress: ProgressReceiver,
    pub task: JoinHandle<UploadOutcome>,
}

/// A running download. Same ordering guarantees as [`UploadHandle`].
pub struct DownloadHandle {
    pub progress: ProgressReceiver,
    pub task: JoinHandle<DownloadOutcome>,
}

/// Coordinates the index, the remote channel and in-flight uploads.
///
/// Cloning is cheap and clones share all state.
#[derive(Clone)]
pub struct Vault {
    store: Arc<MetadataStore>,
    registry: Arc<TransferRegistry>,
    transport: Arc<dyn RemoteTransport>,
    chat_target: Arc<str>,
    max_upload_size: u64,
    /// Creation time of this vault in epoch milliseconds. Pending records
    /// indexed since then are never treated as abandoned.
    opened_at: i64,
}

impl Vault {
    pub fn new(
        store: MetadataStore,
        transport: Arc<dyn RemoteTransport>,
        chat_target: impl Into<String>,
    ) -> Self {
        Self {
            store: Arc::new(store),
            registry: Arc::new(TransferRegistry::new()),
            transport,
            chat_target: Arc::from(chat_target.into()),
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            opened_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Overrides the per-file upload limit.
    pub fn with_max_upload_size(mut self, limit: u64) -> Self {
        self.max_upload_size = limit;
        self
    }

    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    pub fn registry(&self) -> &TransferRegistry {
        &self.registry
    }

    /// All records, newest first.
    pub async fn list(&self) -> Result<Vec<FileRecord>, VaultError> {
        self.list_sorted(SortOrder::Newest).await
    }

    pub async fn list_sorted(&self, order: SortOrder) -> Result<Vec<FileRecord>, VaultError> {
        let mut records = on_store(&self.store, |s| s.load_all()).await?;
        order.sort(&mut records);
        Ok(records)
    }

    /// The `limit` newest records.
    pub async fn list_recent(&self, limit: usize) -> Result<Vec<FileRecord>, VaultError> {
        let mut records = self.list().await?;
        records.truncate(limit);
        Ok(records)
    }

    /// Records of one kind, newest first.
    pub async fn list_by_kind(&self, kind: FileKind) -> Result<Vec<FileRecord>, VaultError> {
        let mut records = self.list().await?;
        records.retain(|r| r.kind() == kind);
        Ok(records)
    }

    /// Counts per kind and the total size of everything indexed.
    pub async fn stats(&self) -> Result<VaultStats, VaultError> {
        let records = on_store(&self.store, |s| s.load_all()).await?;
        Ok(VaultStats::from_records(&records))
    }

    pub async fn get(&self, id: &str) -> Result<Option<FileRecord>, VaultError> {
        let id = id.to_string();
        on_store(&self.store, move |s| s.get(&id)).await
    }

    /// Validates `path` and appends a pending record for it.
    ///
    /// The record keeps the canonical absolute path, so the upload reads the
    /// same file whatever the working directory. Paths that are not valid
    /// UTF-8 are rejected, as are empty files and files above the upload
    /// limit, before anything is written to the index.
    pub async fn prepare_upload(&self, path: &Path) -> Result<FileRecord, VaultError> {
        let io_err = |source| VaultError::Io {
            path: path.to_path_buf(),
            source,
        };
        let canonical = tokio::fs::canonicalize(path).await.map_err(io_err)?;
        let meta = tokio::fs::metadata(&canonical).await.map_err(io_err)?;
        if !meta.is_file() {
            return Err(VaultError::InvalidPath(path.to_path_buf()));
        }

        let local_ref = canonical
            .to_str()
            .filter(|p| !p.contains(['|', '\r', '\n']))
            .ok_or_else(|| VaultError::InvalidPath(path.to_path_buf()))?;
        let name = canonical
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| VaultError::InvalidPath(path.to_path_buf()))?;

        let size = meta.len();
        if size == 0 {
            return Err(VaultError::EmptyFile(path.to_path_buf()));
        }
        if size > self.max_upload_size {
            return Err(VaultError::SizeLimitExceeded {
                size,
                limit: self.max_upload_size,
            });
        }

        let record = FileRecord::new(name, size, local_ref);
        let appended = record.clone();
        on_store(&self.store, move |s| s.append(&appended)).await?;

        info!(id = %record.id(), file = %name, size, "upload prepared");
        Ok(record)
    }

    /// Starts uploading a pending record on its own task.
    ///
    /// On success the record is marked uploaded in the index; on failure or
    /// cancellation it is removed. If the index cannot record a finished
    /// upload, the remote copy is deleted and the upload fails.
    pub fn start_upload(&self, record: &FileRecord) -> Result<UploadHandle, VaultError> {
        if record.is_uploaded() {
            return Err(VaultError::AlreadyUploaded(record.id().to_string()));
        }
        let uploader = Uploader::new(record.id());
        if !self.registry.register(uploader.clone()) {
            return Err(VaultError::UploadInProgress(record.id().to_string()));
        }

        let source = UploadSource {
            path: PathBuf::from(record.local_ref()),
            file_name: record.name().to_string(),
            mime_type: mime_type(record.name()).to_string(),
        };
        let id = record.id().to_string();
        let (tx, rx) = mpsc::unbounded_channel();
        let vault = self.clone();
        let mut record = record.clone();

        let task = tokio::spawn(async move {
            let (inner_tx, mut inner_rx) = mpsc::unbounded_channel();
            let upload = uploader.start(
                vault.transport.as_ref(),
                &vault.chat_target,
                source,
                inner_tx,
            );
            let forward = async {
                while let Some(percent) = inner_rx.recv().await {
                    record.set_progress(percent);
                    // 100 waits until the index has recorded the upload.
                    if percent < 100 {
                        let _ = tx.send(percent);
                    }
                }
            };

            let (outcome, ()) = tokio::join!(upload, forward);
            let outcome = vault.finish_upload(record, outcome).await;
            if matches!(outcome, UploadOutcome::Succeeded { .. }) {
                let _ = tx.send(100);
            }
            drop(tx);
            // Only after the index is settled, so a late cancel cannot
            // remove a record that just finished uploading.
            vault.registry.deregister(uploader.id());
            outcome
        });

        Ok(UploadHandle {
            id,
            progress: rx,
            task,
        })
    }

    /// Validates `path`, indexes it and starts the upload.
    pub async fn upload(&self, path: &Path) -> Result<UploadHandle, VaultError> {
        let record = self.prepare_upload(path).await?;
        match self.start_upload(&record) {
            Ok(handle) => Ok(handle),
            Err(e) => {
                self.discard(record.id()).await;
                Err(e)
            }
        }
    }

    /// Cancels the in-flight upload of `id`.
    ///
    /// Returns `true` if an upload was in flight; its task then removes the
    /// record. Otherwise a pending record for `id` is removed here, and
    /// uploaded records are left alone.
    pub async fn cancel_upload(&self, id: &str) -> Result<bool, VaultError> {
        if self.registry.cancel(id) {
            return Ok(true);
        }

        let target = id.to_string();
        let removed =
            on_store(&self.store, move |s| s.retain(|r| r.id() != target || r.is_uploaded()))
                .await?;
        if !removed.is_empty() {
            info!(id, "removed pending record with no upload in flight");
        }
        Ok(false)
    }

    /// Starts downloading the record `id` into `dest_dir` on its own task.
    pub async fn start_download(
        &self,
        id: &str,
        dest_dir: &Path,
    ) -> Result<DownloadHandle, VaultError> {
        let record = self
            .get(id)
            .await?
            .ok_or_else(|| VaultError::NotFound(id.to_string()))?;
        if !record.can_download() {
            return Err(VaultError::NotDownloadable(id.to_string()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Arc::clone(&self.transport);
        let dest_dir = dest_dir.to_path_buf();
        let task = tokio::spawn(async move {
            Downloader::new()
                .download(
                    transport.as_ref(),
                    record.remote_file_handle(),
                    record.name(),
                    &dest_dir,
                    tx,
                )
                .await
        });

        Ok(DownloadHandle { progress: rx, task })
    }

    /// Deletes the record `id`.
    ///
    /// An in-flight upload of the record is cancelled and waited for first,
    /// then the record is read again: the upload may have finished before
    /// the cancel landed. Records with no remote message are removed
    /// locally; otherwise the remote message is deleted and the record is
    /// removed only if that succeeded.
    pub async fn delete(&self, id: &str) -> Result<DeleteOutcome, VaultError> {
        let cancelled = self.registry.cancel(id);
        if cancelled {
            info!(id, "cancelling upload of deleted record");
            self.registry.wait_until_settled(id).await;
        }

        let record = match self.get(id).await? {
            Some(record) => record,
            // The cancelled upload already dropped its record.
            None if cancelled => return Ok(DeleteOutcome::Succeeded),
            None => return Err(VaultError::NotFound(id.to_string())),
        };

        if !record.has_remote_message() {
            self.remove(id).await?;
            info!(id, "record deleted locally");
            return Ok(DeleteOutcome::Succeeded);
        }

        let outcome = Deleter::new()
            .delete(
                self.transport.as_ref(),
                &self.chat_target,
                record.remote_message_handle(),
            )
            .await;
        if outcome == DeleteOutcome::Succeeded {
            self.remove(id).await?;
        }
        Ok(outcome)
    }

    /// Removes pending records left behind by a crash mid-upload and
    /// returns them.
    ///
    /// Only records indexed before this vault was opened, with no upload in
    /// flight here, are removed. Another client sharing the index may still
    /// be uploading such a record; if so, it indexes the record again when
    /// its upload succeeds.
    pub async fn reconcile_abandoned(&self) -> Result<Vec<FileRecord>, VaultError> {
        let registry = Arc::clone(&self.registry);
        let opened_at = self.opened_at;
        let removed = on_store(&self.store, move |s| {
            s.retain(|r| {
                r.is_uploaded() || r.created_at() >= opened_at || registry.contains(r.id())
            })
        })
        .await?;

        for record in &removed {
            info!(id = %record.id(), file = %record.name(), "removed abandoned record");
        }
        Ok(removed)
    }

    async fn finish_upload(&self, mut record: FileRecord, outcome: UploadOutcome) -> UploadOutcome {
        let UploadOutcome::Succeeded {
            file_handle,
            message_handle,
        } = &outcome
        else {
            self.discard(record.id()).await;
            return outcome;
        };

        if let Err(e) = record.mark_uploaded(file_handle, message_handle) {
            warn!(id = %record.id(), error = %e, "remote returned unusable handles");
            self.discard(record.id()).await;
            return UploadOutcome::Failed(e.to_string());
        }

        let id = record.id().to_string();
        let message_handle = message_handle.clone();
        match on_store(&self.store, move |s| s.upsert(&record)).await {
            Ok(true) => {
                debug!(id = %id, "record marked uploaded");
                outcome
            }
            Ok(false) => {
                warn!(id = %id, "uploaded record had been dropped from the index, re-added");
                outcome
            }
            Err(e) => {
                error!(id = %id, error = %e, "failed to persist uploaded record");
                self.roll_back_upload(&id, &message_handle).await;
                UploadOutcome::Failed(format!("upload could not be recorded in the index: {e}"))
            }
        }
    }

    /// Deletes the remote copy of an upload the index could not record, so
    /// no message is left in the channel without a record pointing at it.
    async fn roll_back_upload(&self, id: &str, message_handle: &str) {
        let outcome = Deleter::new()
            .delete(self.transport.as_ref(), &self.chat_target, message_handle)
            .await;
        if let DeleteOutcome::Failed(msg) = outcome {
            error!(
                id,
                message_handle,
                error = %msg,
                "remote copy of unrecorded upload left behind"
            );
        }
        self.discard(id).await;
    }

    async fn remove(&self, id: &str) -> Result<bool, VaultError> {
        let id = id.to_string();
        on_store(&self.store, move |s| s.remove(&id)).await
    }

    /// Removes a record after a failed or cancelled upload. Errors are
    /// logged since the outcome has already been decided.
    async fn discard(&self, id: &str) {
        if let Err(e) = self.remove(id).await {
            error!(id, error = %e, "failed to remove record");
        }
    }
}

/// Runs a store operation on the blocking pool.
async fn on_store<T, F>(store: &Arc<MetadataStore>, op: F) -> Result<T, VaultError>
where
    T: Send + 'static,
    F: FnOnce(&MetadataStore) -> Result<T, StoreError> + Send + 'static,
{
    let store = Arc::clone(store);
    Ok(tokio::task::spawn_blocking(move || op(&store)).await??)
}
