//! Filesystem-backed file store.
//!
//! Maps each [`EntryId`] to exactly one backing file under the store's
//! `files/` directory. Knows nothing about metadata.

use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::id::EntryId;
use super::types::AccessMode;
use super::validation::{object_path, validate_id};
use crate::error::{Error, Result};

/// File store rooted at one directory.
///
/// Paths are derived only from validated ids, so nothing outside the
/// directory is ever touched.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Creates the store, creating `dir` if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .map_err(|e| Error::io(format!("create files directory {}", dir.display()), e))?;
        Ok(Self { dir })
    }

    /// Returns the directory holding the backing files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates an empty backing file for `id` and returns a writable handle.
    ///
    /// The file is created exclusively: an existing file is never reused. On
    /// unix it is readable and writable by the owner only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailed`] on any IO error (disk full,
    /// permission denied, file already present).
    pub fn allocate(&self, id: &EntryId) -> Result<File> {
        let path = object_path(&self.dir, id);

        let mut options = OpenOptions::new();
        options.read(true).write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        options
            .open(&path)
            .map_err(|source| Error::AllocationFailed { path, source })
    }

    /// Opens the backing file for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no backing file, or an IO
    /// error if it exists but cannot be opened.
    pub fn open(&self, id: &EntryId, mode: AccessMode) -> Result<File> {
        let path = object_path(&self.dir, id);
        mode.open_options().open(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::NotFound,
            _ => Error::io(format!("open backing file for {id}"), e),
        })
    }

    /// Returns the current length of the backing file for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no backing file.
    pub fn size_of(&self, id: &EntryId) -> Result<u64> {
        let path = object_path(&self.dir, id);
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Ok(meta.len()),
            Ok(_) => Err(Error::NotFound),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::NotFound),
            Err(e) => Err(Error::io(format!("stat backing file for {id}"), e)),
        }
    }

    /// Deletes the backing file for `id`.
    ///
    /// Returns `true` if a file existed and was removed. Deleting a missing
    /// file is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file exists but cannot be removed.
    pub fn delete(&self, id: &EntryId) -> Result<bool> {
        let path = object_path(&self.dir, id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::io(format!("delete backing file for {id}"), e)),
        }
    }

    /// Returns the ids of all backing files present on disk.
    ///
    /// Names that are not canonical ids are skipped. Used only by orphan
    /// compaction.
    pub(crate) fn scan_ids(&self) -> Result<Vec<EntryId>> {
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| Error::io(format!("read files directory {}", self.dir.display()), e))?;

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io("read files directory entry", e))?;
            let name = entry.file_name();
            match name.to_str().map(validate_id) {
                Some(Ok(id)) => ids.push(id),
                _ => {
                    tracing::debug!(name = ?name, "Ignoring non-entry file in files directory");
                },
            }
        }
        Ok(ids)
    }
}
