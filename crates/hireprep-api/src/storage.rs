use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::{ApiError, ApiResult};

/// Longest title accepted as a stored file name.
pub const MAX_TITLE_CHARS: usize = 200;

/// Per-component file name limit on common filesystems, in bytes.
pub const MAX_FILE_NAME_BYTES: usize = 255;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("a file with this name already exists")]
    AlreadyExists,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    AlreadyAbsent,
}

/// Filesystem blob store for uploaded resources.
///
/// Each resource is stored as a single flat file at `{dir}/{file_name}`,
/// where `file_name` is derived from the resource title. Files are created
/// exclusively, so two uploads can never share a name.
pub struct ResourceStore {
    dir: PathBuf,
}

impl ResourceStore {
    pub async fn new(dir: PathBuf) -> anyhow::Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Resource storage directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// `<title><extension of the uploaded name>`. The uploaded base name is
    /// discarded. Titles that cannot stand alone as one file name are
    /// rejected rather than rewritten.
    pub fn derive_file_name(title: &str, original_name: &str) -> ApiResult<String> {
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(ApiError::validation(format!(
                "Title must be at most {MAX_TITLE_CHARS} characters"
            )));
        }
        if title == "." || title == ".." || title.contains(['/', '\\', '\0']) {
            return Err(ApiError::validation("Title cannot be used as a file name"));
        }

        let extension = extension_of(original_name);
        if title.len() + extension.len() > MAX_FILE_NAME_BYTES {
            return Err(ApiError::validation("Title is too long to be used as a file name"));
        }

        Ok(format!("{}{}", title, extension))
    }

    /// Write a new blob. Fails with `AlreadyExists` instead of overwriting.
    pub async fn write_new(&self, file_name: &str, data: &[u8]) -> Result<(), WriteError> {
        // The root may have been removed since startup
        fs::create_dir_all(&self.dir).await?;

        let path = self.file_path(file_name);
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Err(WriteError::AlreadyExists),
            Err(e) => return Err(e.into()),
        };

        let written = async {
            file.write_all(data).await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            drop(file);
            if let Err(cleanup) = fs::remove_file(&path).await {
                warn!("Failed to remove partial file {}: {}", path.display(), cleanup);
            }
            return Err(e.into());
        }

        debug!(file = %file_name, size = data.len(), "Stored resource file");
        Ok(())
    }

    /// Delete a blob. A file that is already gone counts as removed.
    pub async fn remove(&self, file_name: &str) -> std::io::Result<Removal> {
        let path = self.file_path(file_name);
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted resource file {}", file_name);
                Ok(Removal::Removed)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Resource file {} already gone", file_name);
                Ok(Removal::AlreadyAbsent)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn open(&self, file_name: &str) -> std::io::Result<fs::File> {
        fs::File::open(self.file_path(file_name)).await
    }

    pub async fn exists(&self, file_name: &str) -> std::io::Result<bool> {
        fs::try_exists(self.file_path(file_name)).await
    }

    /// Names of all regular files in the store.
    pub async fn list_files(&self) -> std::io::Result<Vec<String>> {
        let mut entries = fs::read_dir(&self.dir).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }
}

/// Extension of the last path component, dot included. Leading dots belong
/// to the name, so ".pdf" has no extension.
fn extension_of(original_name: &str) -> &str {
    let base = original_name.rsplit(['/', '\\']).next().unwrap_or(original_name);
    let stem_start = base.len() - base.trim_start_matches('.').len();
    match base[stem_start..].rfind('.') {
        Some(i) => &base[stem_start + i..],
        None => "",
    }
}
