//! Data-file helpers shared by the JSON stores

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

/// `<name>.bak` next to `path`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".bak");
    path.with_file_name(name)
}

/// Move an unreadable data file to `<name>.bak` so a fresh file can take its place
///
/// An earlier backup with the same name is replaced. Returns the backup path.
pub fn set_aside(path: &Path) -> io::Result<PathBuf> {
    if path.file_name().is_none() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"));
    }
    let backup = backup_path(path);
    fs::rename(path, &backup)?;
    warn!("Moved unreadable {} to {}", path.display(), backup.display());
    Ok(backup)
}
