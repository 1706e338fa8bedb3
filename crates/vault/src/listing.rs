//! Sort orders and summary counts for listings.

use std::fmt;
use std::str::FromStr;

use televault_index::{FileKind, FileRecord};

/// Order of a file listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// By name, A to Z, ignoring case.
    Name,
    /// By name, Z to A, ignoring case.
    NameDesc,
    #[default]
    Newest,
    Oldest,
    Largest,
    Smallest,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::NameDesc => "name-desc",
            Self::Newest => "newest",
            Self::Oldest => "oldest",
            Self::Largest => "largest",
            Self::Smallest => "smallest",
        }
    }

    /// Sorts `records` in place. Ties keep their index order.
    pub fn sort(&self, records: &mut [FileRecord]) {
        match self {
            Self::Name => records.sort_by_cached_key(|r| r.name().to_lowercase()),
            Self::NameDesc => {
                records.sort_by(|a, b| b.name().to_lowercase().cmp(&a.name().to_lowercase()))
            }
            Self::Newest => records.sort_by(|a, b| b.created_at().cmp(&a.created_at())),
            Self::Oldest => records.sort_by_key(|r| r.created_at()),
            Self::Largest => records.sort_by(|a, b| b.size().cmp(&a.size())),
            Self::Smallest => records.sort_by_key(|r| r.size()),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "name" | "name-asc" => Ok(Self::Name),
            "name-desc" => Ok(Self::NameDesc),
            "newest" | "date-desc" => Ok(Self::Newest),
            "oldest" | "date-asc" => Ok(Self::Oldest),
            "largest" | "size-desc" => Ok(Self::Largest),
            "smallest" | "size-asc" => Ok(Self::Smallest),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// File counts per kind and the total stored size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VaultStats {
    pub files: usize,
    pub total_size: u64,
    /// Records whose upload has not completed.
    pub pending: usize,
    pub images: usize,
    pub videos: usize,
    pub audio: usize,
    pub pdfs: usize,
    pub others: usize,
}

impl VaultStats {
    pub fn from_records(records: &[FileRecord]) -> Self {
        let mut stats = Self::default();
        for record in records {
            stats.files += 1;
            stats.total_size += record.size();
            if !record.is_uploaded() {
                stats.pending += 1;
            }
            match record.kind() {
                FileKind::Image => stats.images += 1,
                FileKind::Video => stats.videos += 1,
                FileKind::Audio => stats.audio += 1,
                FileKind::Pdf => stats.pdfs += 1,
                FileKind::Other => stats.others += 1,
            }
        }
        stats
    }

    /// Number of files of `kind`.
    pub fn count(&self, kind: FileKind) -> usize {
        match kind {
            FileKind::Image => self.images,
            FileKind::Video => self.videos,
            FileKind::Audio => self.audio,
            FileKind::Pdf => self.pdfs,
            FileKind::Other => self.others,
        }
    }
}
