//! Remote handle to local file.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use televault_remote::{RemoteTransport, TRANSFER_CHUNK_SIZE};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::naming::create_unique_file;
use crate::progress::{PercentTracker, ProgressStep};
use crate::types::DownloadOutcome;
use crate::{ProgressSender, TransferError};

/// Fetches remote files into a local directory.
///
/// Downloads are not cancellable. Progress is reported in steps of ten,
/// followed by 100 once the file is complete. A failed download leaves no
/// partial file behind.
#[derive(Debug, Default, Clone, Copy)]
pub struct Downloader;

impl Downloader {
    pub fn new() -> Self {
        Self
    }

    /// Downloads `file_handle` into `dest_dir` under `file_name`, adding a
    /// ` (n)` suffix when the name is taken.
    pub async fn download(
        &self,
        transport: &dyn RemoteTransport,
        file_handle: &str,
        file_name: &str,
        dest_dir: &Path,
        progress: ProgressSender,
    ) -> DownloadOutcome {
        let remote_path = match transport.resolve_download_location(file_handle).await {
            Ok(path) => path,
            Err(e) => {
                warn!(file = %file_name, error = %e, "download location not resolved");
                return DownloadOutcome::Failed(format!("could not resolve remote file: {e}"));
            }
        };

        match fetch(transport, &remote_path, file_name, dest_dir, &progress).await {
            Ok(path) => {
                let _ = progress.send(100);
                info!(path = %path.display(), "download complete");
                DownloadOutcome::Succeeded(path)
            }
            Err(e) => {
                warn!(file = %file_name, error = %e, "download failed");
                DownloadOutcome::Failed(e.to_string())
            }
        }
    }
}

async fn fetch(
    transport: &dyn RemoteTransport,
    remote_path: &str,
    file_name: &str,
    dest_dir: &Path,
    progress: &ProgressSender,
) -> Result<PathBuf, TransferError> {
    let download = transport.open_download(remote_path).await?;
    let (path, mut file) = create_unique_file(dest_dir, file_name).await?;
    debug!(path = %path.display(), size = ?download.content_length, "download started");

    let mut tracker = PercentTracker::new(download.content_length, ProgressStep::Tens);
    let mut body = download.body;
    let mut written = 0u64;

    let result: Result<(), TransferError> = async {
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for slice in chunk.chunks(TRANSFER_CHUNK_SIZE) {
                file.write_all(slice).await?;
                written += slice.len() as u64;
                if let Some(percent) = tracker.update(written) {
                    let _ = progress.send(percent);
                }
            }
        }
        file.flush().await?;
        file.sync_all().await?;
        Ok(())
    }
    .await;

    if let Err(e) = result {
        drop(file);
        if let Err(rm) = tokio::fs::remove_file(&path).await {
            warn!(path = %path.display(), error = %rm, "could not remove partial download");
        }
        return Err(e);
    }
    Ok(path)
}
