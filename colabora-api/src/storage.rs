/// File storage for task attachments
///
/// Handlers only see the [`FileStorage`] trait; the server wires in
/// [`LocalDiskStorage`], which writes into the configured uploads directory
/// that is also served under `/uploads`.
///
/// Stored names are `<uuid>-<sanitized original name>`, so two uploads of
/// `report.pdf` never collide and a name like `../../etc/passwd` cannot
/// escape the directory.
///
/// # Example
///
/// ```no_run
/// use colabora_api::storage::{FileStorage, LocalDiskStorage};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let storage = LocalDiskStorage::new("./uploads");
/// let stored = storage.store("notes.txt", b"hello").await?;
/// assert!(stored.url.starts_with("/uploads/"));
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// URL prefix stored files are served under
pub const PUBLIC_PREFIX: &str = "/uploads";

/// Name used when the client sends an empty or unusable file name
const FALLBACK_NAME: &str = "file";

/// Longest file name most filesystems accept, in bytes
const MAX_FILE_NAME_BYTES: usize = 255;

/// Room left for the original name after the `<uuid>-` prefix
const MAX_BASE_BYTES: usize = MAX_FILE_NAME_BYTES - 37;

/// Longest original name kept for display (`task_files.name` column)
pub const MAX_ORIGINAL_NAME_CHARS: usize = 255;

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Writing to the backing store failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A file after it has been written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Name as uploaded by the client
    pub original_name: String,

    /// Name on disk
    pub stored_name: String,

    /// Public URL of the file
    pub url: String,
}

/// Backend for attached files
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Persists `bytes` and returns where the file can be fetched
    async fn store(&self, original_name: &str, bytes: &[u8]) -> Result<StoredFile, StorageError>;

    /// Best-effort removal of a stored file, used to clean up after a
    /// failed request
    async fn remove(&self, stored: &StoredFile) -> Result<(), StorageError>;
}

/// Stores files in a local directory
#[derive(Debug, Clone)]
pub struct LocalDiskStorage {
    root: PathBuf,
}

impl LocalDiskStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory files are written to
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the uploads directory if needed
    pub async fn ensure_root(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }
}

/// Cuts `value` to at most `max` bytes without splitting a character
fn truncate_bytes(value: &str, max: usize) -> &str {
    if value.len() <= max {
        return value;
    }

    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

/// Builds a unique, filesystem-safe name for an upload
///
/// Long names are truncated so the result never exceeds 255 bytes.
pub fn stored_name_for(original_name: &str) -> String {
    let sanitized = sanitize_filename::sanitize(original_name.trim());
    let base = match truncate_bytes(&sanitized, MAX_BASE_BYTES) {
        "" => FALLBACK_NAME,
        base => base,
    };

    format!("{}-{}", Uuid::new_v4(), base)
}

/// Original name as recorded, capped at [`MAX_ORIGINAL_NAME_CHARS`]
pub fn display_name_for(original_name: &str) -> String {
    original_name.chars().take(MAX_ORIGINAL_NAME_CHARS).collect()
}

#[async_trait]
impl FileStorage for LocalDiskStorage {
    async fn store(&self, original_name: &str, bytes: &[u8]) -> Result<StoredFile, StorageError> {
        let stored_name = stored_name_for(original_name);
        let path = self.root.join(&stored_name);

        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(path = %path.display(), size = bytes.len(), "Stored attachment");

        Ok(StoredFile {
            original_name: display_name_for(original_name),
            url: format!("{}/{}", PUBLIC_PREFIX, stored_name),
            stored_name,
        })
    }

    async fn remove(&self, stored: &StoredFile) -> Result<(), StorageError> {
        match tokio::fs::remove_file(self.root.join(&stored.stored_name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
