use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::debug;

use crate::Uploader;

/// In-flight uploads keyed by record id.
///
/// Owned by whoever starts uploads; used to route cancel requests to the
/// right transfer and to wait for one to finish. At most one upload per id
/// can be registered.
pub struct TransferRegistry {
    uploads: Mutex<HashMap<String, Uploader>>,
    /// Bumped on every deregister.
    settled: watch::Sender<u64>,
}

impl Default for TransferRegistry {
    fn default() -> Self {
        let (settled, _) = watch::channel(0);
        Self {
            uploads: Mutex::default(),
            settled,
        }
    }
}

impl TransferRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an uploader under its id.
    ///
    /// Returns `false`, leaving the existing entry in place, if an upload
    /// with the same id is already in flight.
    pub fn register(&self, uploader: Uploader) -> bool {
        let mut uploads = self.lock();
        if uploads.contains_key(uploader.id()) {
            return false;
        }
        debug!(id = uploader.id(), "upload registered");
        uploads.insert(uploader.id().to_string(), uploader);
        true
    }

    /// Removes and returns the entry for `id`.
    pub fn deregister(&self, id: &str) -> Option<Uploader> {
        let removed = self.lock().remove(id);
        if removed.is_some() {
            debug!(id, "upload deregistered");
            self.settled.send_modify(|generation| *generation += 1);
        }
        removed
    }

    /// Waits until no upload is registered under `id`.
    ///
    /// Returns at once if nothing is in flight for that id.
    pub async fn wait_until_settled(&self, id: &str) {
        // Subscribed before the check so a deregister in between is not missed.
        let mut settled = self.settled.subscribe();
        while self.contains(id) {
            if settled.changed().await.is_err() {
                return;
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Uploader> {
        self.lock().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    /// Requests cancellation of the upload for `id`.
    ///
    /// Returns `false` if nothing is in flight for that id; the caller then
    /// owns the cleanup a failed upload would have done.
    pub fn cancel(&self, id: &str) -> bool {
        match self.lock().get(id) {
            Some(uploader) => {
                uploader.cancel();
                true
            }
            None => false,
        }
    }

    /// Ids of all in-flight uploads.
    pub fn active_ids(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Uploader>> {
        self.uploads.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
