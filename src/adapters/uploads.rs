use crate::domain::ports::ConfigProvider;
use crate::utils::error::{RelayError, Result, UploadError};
use regex::Regex;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

pub const DEFAULT_ALLOWED_TYPES: &str = "jpeg|jpg|png|gif|pdf|doc|docx";
pub const DEFAULT_MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

/// Disk storage for uploaded media. Files are kept after the request.
#[derive(Debug, Clone)]
pub struct UploadStore {
    base_path: PathBuf,
    max_file_size: usize,
    allowed_types: Regex,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: PathBuf,
    pub original_name: String,
    pub mime_type: String,
    pub size: usize,
}

impl StoredFile {
    /// Deletes an accepted upload whose request was rejected afterwards.
    pub async fn remove(&self) {
        if let Err(e) = fs::remove_file(&self.path).await {
            tracing::warn!("Failed to remove upload {}: {}", self.path.display(), e);
        }
    }
}

impl UploadStore {
    pub fn new(base_path: impl Into<PathBuf>, max_file_size: usize, allowed_types: &str) -> Result<Self> {
        let allowed_types = Regex::new(allowed_types).map_err(|e| RelayError::InvalidConfigValueError {
            field: "uploads.allowed_types".to_string(),
            value: allowed_types.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            base_path: base_path.into(),
            max_file_size,
            allowed_types,
        })
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        Self::new(config.upload_dir(), config.max_file_size(), config.allowed_types())
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// Both the extension and the declared mimetype must match the allowed types.
    pub fn check_type(&self, original_name: &str, mime_type: &str) -> std::result::Result<(), UploadError> {
        let extension = Path::new(original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .unwrap_or_default();

        if self.allowed_types.is_match(&extension) && self.allowed_types.is_match(mime_type) {
            Ok(())
        } else {
            Err(UploadError::InvalidFileType)
        }
    }

    /// Creates `file-<millis><ext>`, or `file-<millis>-<n><ext>` when that name is taken.
    /// Existing files are never truncated.
    async fn open_unique(&self, extension: &str) -> std::io::Result<(PathBuf, fs::File)> {
        let millis = chrono::Utc::now().timestamp_millis();
        let mut attempt = 0u32;

        loop {
            let filename = if attempt == 0 {
                format!("file-{}{}", millis, extension)
            } else {
                format!("file-{}-{}{}", millis, attempt, extension)
            };
            let path = self.base_path.join(filename);

            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e),
            }
        }
    }

    /// Opens a destination file named `file-<millis><ext>` after the type check passes.
    pub async fn create(
        &self,
        original_name: &str,
        mime_type: &str,
    ) -> std::result::Result<UploadWriter, UploadError> {
        self.check_type(original_name, mime_type)?;
        fs::create_dir_all(&self.base_path).await?;

        let extension = Path::new(original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();
        let (path, file) = self.open_unique(&extension).await?;
        tracing::debug!("Receiving upload {} into {}", original_name, path.display());

        Ok(UploadWriter {
            path,
            file,
            written: 0,
            limit: self.max_file_size,
            original_name: original_name.to_string(),
            mime_type: mime_type.to_string(),
        })
    }
}

/// An in-progress upload. Call `finish` to keep it or `discard` to remove it.
pub struct UploadWriter {
    path: PathBuf,
    file: fs::File,
    written: usize,
    limit: usize,
    original_name: String,
    mime_type: String,
}

impl UploadWriter {
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> std::result::Result<(), UploadError> {
        if self.written + chunk.len() > self.limit {
            return Err(UploadError::FileTooLarge { limit: self.limit });
        }
        self.file.write_all(chunk).await?;
        self.written += chunk.len();
        Ok(())
    }

    pub async fn finish(mut self) -> std::result::Result<StoredFile, UploadError> {
        self.file.flush().await?;
        Ok(StoredFile {
            path: self.path,
            original_name: self.original_name,
            mime_type: self.mime_type,
            size: self.written,
        })
    }

    pub async fn discard(self) {
        let UploadWriter { path, file, .. } = self;
        drop(file);
        if let Err(e) = fs::remove_file(&path).await {
            tracing::warn!("Failed to remove rejected upload {}: {}", path.display(), e);
        }
    }
}
