//! The [`FileRecord`] entity and its line codec.

use std::fmt;

use crate::kind::FileKind;

/// Field separator of the index line format.
const SEPARATOR: char = '|';

/// Minimum number of fields a line needs (the legacy format).
const LEGACY_FIELD_COUNT: usize = 6;

/// Errors produced while parsing or mutating a record.
///
/// Parse errors mark a corrupt index line. [`MetadataStore::load_all`]
/// drops such lines instead of surfacing the error.
///
/// [`MetadataStore::load_all`]: crate::MetadataStore::load_all
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("expected at least 6 fields, found {0}")]
    TooFewFields(usize),

    #[error("invalid {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("remote handles must not be empty")]
    MissingHandle,
}

/// One locally known file and its transfer state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    id: String,
    name: String,
    size: u64,
    created_at: i64,
    local_ref: String,
    uploaded: bool,
    progress: u8,
    remote_file_handle: String,
    remote_message_handle: String,
}

impl FileRecord {
    /// Creates a record for a file about to be uploaded.
    ///
    /// Assigns a fresh UUID and the current time in milliseconds.
    pub fn new(name: &str, size: u64, local_ref: &str) -> Self {
        Self::with_id(
            &uuid::Uuid::new_v4().to_string(),
            name,
            size,
            chrono::Utc::now().timestamp_millis(),
            local_ref,
        )
    }

    /// Creates a not-yet-uploaded record with explicit identity and timestamp.
    pub fn with_id(id: &str, name: &str, size: u64, created_at: i64, local_ref: &str) -> Self {
        Self {
            id: sanitize_field(id),
            name: sanitize_field(name),
            size,
            created_at,
            local_ref: sanitize_field(local_ref),
            uploaded: false,
            progress: 0,
            remote_file_handle: String::new(),
            remote_message_handle: String::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Creation time in milliseconds since the Unix epoch.
    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn local_ref(&self) -> &str {
        &self.local_ref
    }

    pub fn is_uploaded(&self) -> bool {
        self.uploaded
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn remote_file_handle(&self) -> &str {
        &self.remote_file_handle
    }

    pub fn remote_message_handle(&self) -> &str {
        &self.remote_message_handle
    }

    /// Classifies the file by its name's extension.
    pub fn kind(&self) -> FileKind {
        FileKind::from_name(&self.name)
    }

    /// Records upload progress. Ignored once the record is uploaded.
    pub fn set_progress(&mut self, progress: u8) {
        if !self.uploaded {
            self.progress = progress.min(100);
        }
    }

    /// Marks the upload as complete with the handles returned by the remote.
    ///
    /// Both handles are required; progress jumps to 100.
    pub fn mark_uploaded(
        &mut self,
        file_handle: &str,
        message_handle: &str,
    ) -> Result<(), RecordError> {
        if file_handle.is_empty() || message_handle.is_empty() {
            return Err(RecordError::MissingHandle);
        }
        self.uploaded = true;
        self.progress = 100;
        self.remote_file_handle = sanitize_field(file_handle);
        self.remote_message_handle = sanitize_field(message_handle);
        Ok(())
    }

    /// Returns `true` if the file can be pulled back from the remote.
    pub fn can_download(&self) -> bool {
        self.uploaded && !self.remote_file_handle.is_empty()
    }

    /// Returns `true` if a remote message exists that a delete can target.
    pub fn has_remote_message(&self) -> bool {
        !self.remote_message_handle.is_empty()
    }

    /// Serializes the record as one index line, without the trailing newline.
    pub fn to_line(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}|{}|{}",
            self.id,
            self.name,
            self.size,
            self.created_at,
            self.local_ref,
            self.uploaded,
            self.remote_file_handle,
            self.remote_message_handle,
        )
    }

    /// Parses one index line.
    ///
    /// Trailing empty fields are ignored, so a current-format line with
    /// empty handles reads the same as a legacy six-field line.
    pub fn parse_line(line: &str) -> Result<Self, RecordError> {
        let mut fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split(SEPARATOR).collect();
        while fields.last().is_some_and(|f| f.is_empty()) {
            fields.pop();
        }
        if fields.len() < LEGACY_FIELD_COUNT {
            return Err(RecordError::TooFewFields(fields.len()));
        }

        let size = parse_number::<u64>("size", fields[2])?;
        let created_at = parse_number::<i64>("created_at", fields[3])?;
        let uploaded = fields[5].eq_ignore_ascii_case("true");
        let remote_file_handle = fields.get(6).copied().unwrap_or_default();
        let remote_message_handle = fields.get(7).copied().unwrap_or_default();

        Ok(Self {
            id: fields[0].to_string(),
            name: fields[1].to_string(),
            size,
            created_at,
            local_ref: fields[4].to_string(),
            uploaded,
            progress: if uploaded { 100 } else { 0 },
            remote_file_handle: remote_file_handle.to_string(),
            remote_message_handle: remote_message_handle.to_string(),
        })
    }
}

impl fmt::Display for FileRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {} bytes)", self.name, self.id, self.size)
    }
}

fn parse_number<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, RecordError> {
    value.parse().map_err(|_| RecordError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

/// Replaces characters that would break the line format.
fn sanitize_field(value: &str) -> String {
    value.replace([SEPARATOR, '\r', '\n'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uploaded_record() -> FileRecord {
        let mut r = FileRecord::with_id("a", "f1.txt", 10, 100, "/tmp/f1.txt");
        r.mark_uploaded("fid1", "mid1").unwrap();
        r
    }

    #[test]
    fn new_record_is_pending() {
        let r = FileRecord::new("photo.jpg", 42, "/sdcard/photo.jpg");
        assert!(!r.id().is_empty());
        assert!(!r.is_uploaded());
        assert_eq!(r.progress(), 0);
        assert!(r.remote_file_handle().is_empty());
        assert!(r.remote_message_handle().is_empty());
        assert!(r.created_at() > 0);
    }

    #[test]
    fn new_records_get_distinct_ids() {
        let a = FileRecord::new("x", 1, "");
        let b = FileRecord::new("x", 1, "");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn uploaded_line_round_trips() {
        let r = uploaded_record();
        assert_eq!(r.to_line(), "a|f1.txt|10|100|/tmp/f1.txt|true|fid1|mid1");
        assert_eq!(FileRecord::parse_line(&r.to_line()).unwrap(), r);
    }

    #[test]
    fn pending_line_round_trips() {
        let r = FileRecord::with_id("b", "f2.txt", 20, 200, "u2");
        assert_eq!(r.to_line(), "b|f2.txt|20|200|u2|false||");
        assert_eq!(FileRecord::parse_line(&r.to_line()).unwrap(), r);
    }

    #[test]
    fn pending_line_with_empty_local_ref_round_trips() {
        let r = FileRecord::with_id("c", "n.bin", 1, 2, "");
        assert_eq!(FileRecord::parse_line(&r.to_line()).unwrap(), r);
    }

    #[test]
    fn legacy_six_field_line_has_empty_handles() {
        let r = FileRecord::parse_line("a|f1.txt|10|100|u1|true").unwrap();
        assert!(r.is_uploaded());
        assert_eq!(r.progress(), 100);
        assert_eq!(r.remote_file_handle(), "");
        assert_eq!(r.remote_message_handle(), "");
        assert!(!r.can_download());
        assert!(!r.has_remote_message());
    }

    #[test]
    fn trailing_separators_read_as_legacy() {
        let r = FileRecord::parse_line("b|f2.txt|20|200|u2|false|||").unwrap();
        assert_eq!(r.id(), "b");
        assert!(!r.is_uploaded());
        assert_eq!(r.remote_file_handle(), "");
    }

    #[test]
    fn extra_fields_are_ignored() {
        let r = FileRecord::parse_line("a|f|1|2|u|true|fid|mid|future").unwrap();
        assert_eq!(r.remote_message_handle(), "mid");
    }

    #[test]
    fn uploaded_flag_is_case_insensitive() {
        assert!(FileRecord::parse_line("a|f|1|2|u|TRUE|x|y").unwrap().is_uploaded());
        assert!(!FileRecord::parse_line("a|f|1|2|u|yes").unwrap().is_uploaded());
    }

    #[test]
    fn too_few_fields_is_rejected() {
        assert_eq!(
            FileRecord::parse_line("garbage-line"),
            Err(RecordError::TooFewFields(1))
        );
        assert!(FileRecord::parse_line("a|b|1|2|c").is_err());
        assert!(FileRecord::parse_line("").is_err());
    }

    #[test]
    fn non_numeric_fields_are_rejected() {
        let err = FileRecord::parse_line("a|f|ten|100|u|false").unwrap_err();
        assert!(matches!(err, RecordError::InvalidNumber { field: "size", .. }));

        let err = FileRecord::parse_line("a|f|10|soon|u|false").unwrap_err();
        assert!(matches!(err, RecordError::InvalidNumber { field: "created_at", .. }));

        assert!(FileRecord::parse_line("a|f|-1|100|u|false").is_err());
    }

    #[test]
    fn separators_in_fields_are_replaced() {
        let r = FileRecord::with_id("a", "we|ird\nname.txt", 1, 2, "/p|q");
        assert_eq!(r.name(), "we_ird_name.txt");
        assert_eq!(FileRecord::parse_line(&r.to_line()).unwrap(), r);
    }

    #[test]
    fn mark_uploaded_requires_both_handles() {
        let mut r = FileRecord::with_id("a", "f", 1, 2, "");
        assert_eq!(r.mark_uploaded("", "m"), Err(RecordError::MissingHandle));
        assert_eq!(r.mark_uploaded("f", ""), Err(RecordError::MissingHandle));
        assert!(!r.is_uploaded());

        r.set_progress(40);
        r.mark_uploaded("f", "m").unwrap();
        assert!(r.is_uploaded());
        assert_eq!(r.progress(), 100);
        assert!(r.can_download());
        assert!(r.has_remote_message());
    }

    #[test]
    fn progress_is_frozen_after_upload() {
        let mut r = uploaded_record();
        r.set_progress(3);
        assert_eq!(r.progress(), 100);
    }

    #[test]
    fn kind_follows_extension() {
        let r = FileRecord::with_id("a", "Report.PDF", 1, 2, "");
        assert_eq!(r.kind(), FileKind::Pdf);
    }
}
