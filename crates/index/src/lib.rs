//! Local index of files stored in the vault.
//!
//! The remote blob store has no listing API, so every file the client knows
//! about is tracked here: one [`FileRecord`] per line in a flat text file
//! managed by [`MetadataStore`].

pub mod kind;
mod record;
mod store;

pub use kind::{FileKind, extension, format_size, mime_type};
pub use record::{FileRecord, RecordError};
pub use store::{MetadataStore, StoreError};

/// Default file name of the index inside the data directory.
pub const INDEX_FILE_NAME: &str = "televault_files.txt";
