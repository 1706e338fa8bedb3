//! Durable, line-oriented persistence of [`FileRecord`]s.
//!
//! Every mutation other than [`MetadataStore::append`] rewrites the whole
//! file. Operations are serialized by an internal mutex, and a rewrite goes
//! through a sibling temp file that is renamed over the index, so a crash
//! mid-write leaves either the old or the new content.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::record::FileRecord;

/// Errors from index persistence.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("index I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// The local index file.
pub struct MetadataStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl MetadataStore {
    /// Opens (lazily) the index at `path`. Nothing is touched on disk until
    /// the first operation.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record without touching existing lines.
    pub fn append(&self, record: &FileRecord) -> Result<(), StoreError> {
        let _guard = self.lock();
        self.ensure_parent_dir()?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StoreError::io(&self.path, e))?;
        writeln!(file, "{}", record.to_line()).map_err(|e| StoreError::io(&self.path, e))?;

        debug!(id = %record.id(), "record appended");
        Ok(())
    }

    /// Loads every parsable record in file order.
    ///
    /// Lines that fail to parse are dropped so one bad line cannot block
    /// the rest of the index. A missing file is an empty index.
    pub fn load_all(&self) -> Result<Vec<FileRecord>, StoreError> {
        let _guard = self.lock();
        self.read_records()
    }

    /// Returns the record with the given id, if present.
    pub fn get(&self, id: &str) -> Result<Option<FileRecord>, StoreError> {
        Ok(self.load_all()?.into_iter().find(|r| r.id() == id))
    }

    /// Replaces the index content with exactly `records`, in order.
    pub fn rewrite(&self, records: &[FileRecord]) -> Result<(), StoreError> {
        let _guard = self.lock();
        self.write_records(records)
    }

    /// Replaces the stored record that has the same id as `record`.
    ///
    /// Returns `false` (and leaves the file untouched) if no such record
    /// exists; a record removed concurrently is not resurrected.
    pub fn update(&self, record: &FileRecord) -> Result<bool, StoreError> {
        let _guard = self.lock();
        let mut records = self.read_records()?;

        let Some(slot) = records.iter_mut().find(|r| r.id() == record.id()) else {
            return Ok(false);
        };
        *slot = record.clone();

        self.write_records(&records)?;
        debug!(id = %record.id(), "record updated");
        Ok(true)
    }

    /// Replaces the record with the same id, or appends it if there is none.
    ///
    /// Returns whether a record was replaced.
    pub fn upsert(&self, record: &FileRecord) -> Result<bool, StoreError> {
        let _guard = self.lock();
        let mut records = self.read_records()?;

        let replaced = match records.iter_mut().find(|r| r.id() == record.id()) {
            Some(slot) => {
                *slot = record.clone();
                true
            }
            None => {
                records.push(record.clone());
                false
            }
        };

        self.write_records(&records)?;
        debug!(id = %record.id(), replaced, "record upserted");
        Ok(replaced)
    }

    /// Removes the record with the given id. Returns whether it existed.
    pub fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let _guard = self.lock();
        let mut records = self.read_records()?;
        let before = records.len();
        records.retain(|r| r.id() != id);

        if records.len() == before {
            return Ok(false);
        }

        self.write_records(&records)?;
        debug!(id, "record removed");
        Ok(true)
    }

    /// Keeps only the records for which `keep` returns true and returns
    /// the ones dropped. The file is rewritten only if something changed.
    pub fn retain<F>(&self, mut keep: F) -> Result<Vec<FileRecord>, StoreError>
    where
        F: FnMut(&FileRecord) -> bool,
    {
        let _guard = self.lock();
        let (kept, dropped): (Vec<_>, Vec<_>) =
            self.read_records()?.into_iter().partition(|r| keep(r));

        if !dropped.is_empty() {
            self.write_records(&kept)?;
            debug!(removed = dropped.len(), "records pruned");
        }
        Ok(dropped)
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_parent_dir(&self) -> Result<(), StoreError> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))
            }
            _ => Ok(()),
        }
    }

    fn read_records(&self) -> Result<Vec<FileRecord>, StoreError> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };

        let mut records = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| StoreError::io(&self.path, e))?;
            match FileRecord::parse_line(&line) {
                Ok(record) => records.push(record),
                Err(e) => debug!(line = index + 1, error = %e, "skipping corrupt index line"),
            }
        }
        Ok(records)
    }

    fn write_records(&self, records: &[FileRecord]) -> Result<(), StoreError> {
        self.ensure_parent_dir()?;
        let tmp_path = self.tmp_path();

        let result = (|| -> std::io::Result<()> {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            for record in records {
                writeln!(writer, "{}", record.to_line())?;
            }
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
            fs::rename(&tmp_path, &self.path)
        })();

        if let Err(e) = result {
            if let Err(cleanup) = fs::remove_file(&tmp_path)
                && cleanup.kind() != std::io::ErrorKind::NotFound
            {
                warn!(path = %tmp_path.display(), error = %cleanup, "failed to remove temp index");
            }
            return Err(StoreError::io(&self.path, e));
        }
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
