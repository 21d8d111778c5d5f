use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::database::models::{Expense, Property};
use crate::storage::path::{receipt_dir, receipt_file};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("receipt not found: {0}")]
    NotFound(String),
    #[error("receipt storage failure at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Durable persistence of a single receipt file per expense, rooted at a
/// configured base directory. Holds no other state; all paths come from
/// the resolver. Does not touch the expense record itself — callers
/// persist the returned relative path only after a successful write.
#[derive(Debug, Clone)]
pub struct ReceiptStore {
    base_dir: PathBuf,
}

impl ReceiptStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        ReceiptStore {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Writes `content` under the resolved directory, creating missing
    /// ancestors and overwriting any file already at that exact path.
    /// Returns the relative path for the caller to persist on the expense.
    pub fn store(
        &self,
        property: &Property,
        expense: &Expense,
        content: &[u8],
        original_filename: &str,
    ) -> Result<String, StorageError> {
        let dir = receipt_dir(
            property.id,
            &property.name,
            expense.id,
            &expense.category,
            expense.date,
        );
        let abs_dir = self.base_dir.join(&dir);
        fs::create_dir_all(&abs_dir).map_err(|e| StorageError::io(&abs_dir, e))?;

        let rel = receipt_file(&dir, original_filename);
        let abs = self.base_dir.join(&rel);
        fs::write(&abs, content).map_err(|e| StorageError::io(&abs, e))?;

        Ok(rel.to_string_lossy().replace('\\', "/"))
    }

    /// Reads a stored receipt back, plus a content-type guessed from the
    /// file extension (falling back to `application/octet-stream`).
    /// A missing file is `NotFound`, never a panic, so a stale record
    /// pointing at a deleted file degrades gracefully.
    pub fn retrieve(&self, relative_path: &str) -> Result<(Vec<u8>, String), StorageError> {
        let rel = self.checked_relative(relative_path)?;
        let abs = self.base_dir.join(rel);
        let bytes = match fs::read(&abs) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(relative_path.to_string()))
            }
            Err(e) => return Err(StorageError::io(&abs, e)),
        };
        let content_type = mime_guess::from_path(&abs)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok((bytes, content_type))
    }

    /// Deletes the receipt file if present; an already-absent file is Ok,
    /// so the operation is idempotent. If the immediate parent directory
    /// (the expense-level directory) is left empty it is removed too —
    /// single level only, the property-level directory is never touched.
    pub fn remove(&self, relative_path: &str) -> Result<(), StorageError> {
        let rel = self.checked_relative(relative_path)?;
        let abs = self.base_dir.join(rel);
        match fs::remove_file(&abs) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(StorageError::io(&abs, e)),
        }

        if let Some(parent) = abs.parent() {
            if parent != self.base_dir && dir_is_empty(parent) {
                // Best effort; a file landing here concurrently just
                // keeps the directory alive.
                let _ = fs::remove_dir(parent);
            }
        }
        Ok(())
    }

    // Rejects absolute paths and any non-normal component so a tampered
    // receipt_path value in the database cannot escape the base directory.
    fn checked_relative<'a>(&self, relative_path: &'a str) -> Result<&'a Path, StorageError> {
        let rel = Path::new(relative_path);
        let safe = !rel.as_os_str().is_empty()
            && rel.is_relative()
            && rel.components().all(|c| matches!(c, Component::Normal(_)));
        if safe {
            Ok(rel)
        } else {
            Err(StorageError::NotFound(relative_path.to_string()))
        }
    }
}

fn dir_is_empty(dir: &Path) -> bool {
    match fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => false,
    }
}
