//! Product image storage
//!
//! Images live under `<data-dir>/Images/` and are referenced from the catalog
//! by the relative path `Images/<file>`. Local imports get a fresh UUID name so
//! they never collide with peer images, which keep the name they were sent with.

use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use smartpos_core::{CoreError, Result, IMAGES_DIR};
use tracing::{debug, warn};
use uuid::Uuid;

/// Extensions accepted from the product entry form
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Image copied into the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl StoredImage {
    /// Catalog path for this image
    pub fn relative_path(&self) -> String {
        ImageStore::relative_path(&self.file_name)
    }
}

#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    /// Open the store under `data_dir`, creating `Images/` if needed
    pub fn new(data_dir: &Path) -> Result<Self> {
        let dir = data_dir.join(IMAGES_DIR);
        fs::create_dir_all(&dir)
            .map_err(|e| CoreError::Image(format!("Failed to create {}: {}", dir.display(), e)))?;
        Ok(Self { dir })
    }

    #[cfg(test)]
    fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether an image with this name is already stored
    pub fn contains(&self, file_name: &str) -> bool {
        self.dir.join(file_name).is_file()
    }

    pub fn relative_path(file_name: &str) -> String {
        format!("{IMAGES_DIR}/{file_name}")
    }

    /// Copy a user-selected image into the store under a new unique name
    pub fn import(&self, source: &Path) -> Result<StoredImage> {
        let extension = source
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .filter(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
            .ok_or_else(|| {
                CoreError::Image(format!("Unsupported image type: {}", source.display()))
            })?;

        let bytes = fs::read(source)
            .map_err(|e| CoreError::Image(format!("Failed to read {}: {}", source.display(), e)))?;

        let file_name = format!("{}.{}", Uuid::new_v4().simple(), extension);
        let target = self.dir.join(&file_name);
        fs::write(&target, &bytes)
            .map_err(|e| CoreError::Image(format!("Failed to copy image: {}", e)))?;

        debug!("Imported {} as {}", source.display(), file_name);
        Ok(StoredImage { file_name, bytes })
    }

    /// Write a peer's image unless a file with that name already exists
    ///
    /// Returns `true` if the file was written. Existing files are never replaced.
    /// A failed write removes the partial file so a later copy can still land.
    pub fn materialize(&self, file_name: &str, bytes: &[u8]) -> Result<bool> {
        let target = self.dir.join(file_name);
        let file = match OpenOptions::new().write(true).create_new(true).open(&target) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(CoreError::Image(format!("Failed to create {}: {}", file_name, e))),
        };
        fill_new(&target, file, bytes)
            .map_err(|e| CoreError::Image(format!("Failed to write {}: {}", file_name, e)))?;
        Ok(true)
    }

    /// Best-effort removal of an image nothing refers to
    pub fn discard(&self, file_name: &str) {
        if let Err(e) = fs::remove_file(self.dir.join(file_name)) {
            warn!("Failed to remove unused image {}: {}", file_name, e);
        }
    }
}

/// Write `bytes` to a file just created at `target`, removing it on failure
fn fill_new(target: &Path, mut out: impl Write, bytes: &[u8]) -> io::Result<()> {
    let result = out.write_all(bytes).and_then(|()| out.flush());
    if result.is_err() {
        drop(out);
        if let Err(e) = fs::remove_file(target) {
            warn!("Failed to remove partial image {}: {}", target.display(), e);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Accepts a few bytes, then reports a full disk
    struct FullDisk {
        room: usize,
    }

    impl Write for FullDisk {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.room == 0 {
                return Err(io::Error::new(ErrorKind::Other, "no space left on device"));
            }
            let n = buf.len().min(self.room);
            self.room -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_import_renames_and_keeps_extension() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path()).unwrap();
        let source = dir.path().join("My Photo.PNG");
        fs::write(&source, b"png-bytes").unwrap();

        let stored = store.import(&source).unwrap();
        assert!(stored.file_name.ends_with(".png"));
        assert_eq!(stored.file_name.len(), 32 + 4);
        assert_eq!(stored.bytes, b"png-bytes");
        assert_eq!(stored.relative_path(), format!("Images/{}", stored.file_name));
        assert_eq!(fs::read(store.dir().join(&stored.file_name)).unwrap(), b"png-bytes");
    }

    #[test]
    fn test_import_rejects_other_types() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path()).unwrap();
        let source = dir.path().join("notes.txt");
        fs::write(&source, b"text").unwrap();
        assert!(matches!(store.import(&source), Err(CoreError::Image(_))));
    }

    #[test]
    fn test_import_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path()).unwrap();
        assert!(store.import(&dir.path().join("gone.jpg")).is_err());
    }

    #[test]
    fn test_materialize_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path()).unwrap();

        assert!(store.materialize("abc.jpg", b"first").unwrap());
        assert!(!store.materialize("abc.jpg", b"second").unwrap());
        assert_eq!(fs::read(store.dir().join("abc.jpg")).unwrap(), b"first");
    }

    #[test]
    fn test_failed_write_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path()).unwrap();
        let target = store.dir().join("abc.jpg");
        fs::write(&target, b"pix").unwrap();

        assert!(fill_new(&target, FullDisk { room: 3 }, b"pixels").is_err());
        assert!(!store.contains("abc.jpg"));

        // The next copy of the same image is written in full
        assert!(store.materialize("abc.jpg", b"pixels").unwrap());
        assert_eq!(fs::read(&target).unwrap(), b"pixels");
    }

    #[test]
    fn test_contains() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path()).unwrap();
        assert!(!store.contains("abc.jpg"));
        store.materialize("abc.jpg", b"x").unwrap();
        assert!(store.contains("abc.jpg"));
    }

    #[test]
    fn test_discard() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path()).unwrap();
        store.materialize("abc.jpg", b"x").unwrap();
        store.discard("abc.jpg");
        assert!(!store.dir().join("abc.jpg").exists());
    }
}
