use std::path::PathBuf;

/// Lifecycle of an [`Uploader`](crate::Uploader).
///
/// `Succeeded`, `Failed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    Sending,
    Succeeded,
    Failed,
    Cancelled,
}

impl UploadState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

/// Terminal result of an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Succeeded {
        file_handle: String,
        message_handle: String,
    },
    Failed(String),
    Cancelled,
}

impl UploadOutcome {
    /// The terminal state this outcome puts an uploader in.
    pub fn state(&self) -> UploadState {
        match self {
            Self::Succeeded { .. } => UploadState::Succeeded,
            Self::Failed(_) => UploadState::Failed,
            Self::Cancelled => UploadState::Cancelled,
        }
    }
}

/// Terminal result of a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Path of the written file.
    Succeeded(PathBuf),
    Failed(String),
}

/// Terminal result of a remote delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Succeeded,
    Failed(String),
}

/// Local bytes to upload.
#[derive(Debug, Clone)]
pub struct UploadSource {
    pub path: PathBuf,
    /// Name the document is sent under.
    pub file_name: String,
    pub mime_type: String,
}
