//! Destination naming for downloads.
//!
//! A download never overwrites an existing file: on collision a counter
//! suffix ` (n)` is inserted before the extension.

use std::path::{Component, Path, PathBuf};

use tokio::fs::{File, OpenOptions};

use crate::TransferError;

/// Upper bound on collision suffixes tried before giving up.
const MAX_SUFFIX: u32 = 10_000;

/// Reduces a stored display name to a bare file name.
///
/// Directory components are stripped so a name like `../../etc/passwd`
/// cannot escape the destination directory. Rejects names with no
/// usable final component (empty, `..`, `/`).
pub fn sanitize_file_name(name: &str) -> Result<String, TransferError> {
    match Path::new(name).components().next_back() {
        Some(Component::Normal(part)) => Ok(part.to_string_lossy().into_owned()),
        _ => Err(TransferError::InvalidName(name.to_string())),
    }
}

/// Splits `name` into stem and extension (with its dot).
///
/// A leading dot does not start an extension.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(dot) if dot > 0 => name.split_at(dot),
        _ => (name, ""),
    }
}

/// The `n`th candidate name: `name` itself for 0, else `stem (n).ext`.
pub fn candidate_name(name: &str, n: u32) -> String {
    if n == 0 {
        return name.to_string();
    }
    let (stem, ext) = split_extension(name);
    format!("{stem} ({n}){ext}")
}

/// Creates `dir` if needed and atomically reserves the first free
/// candidate name in it, returning the path and the open file.
pub async fn create_unique_file(dir: &Path, name: &str) -> Result<(PathBuf, File), TransferError> {
    let name = sanitize_file_name(name)?;
    tokio::fs::create_dir_all(dir).await?;

    for n in 0..=MAX_SUFFIX {
        let path = dir.join(candidate_name(&name, n));
        match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(TransferError::InvalidName(format!(
        "no free name for {name} in {}",
        dir.display()
    )))
}
