//! File-backed persistence for report logs and their attachment binaries
//!
//! The log store reads the whole JSON document, lets the caller mutate it in
//! memory and writes the whole document back. There is no locking: two
//! concurrent load/mutate/save cycles race and the last write wins.

use anyhow::Context;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{AppError, Result};
use crate::models::ReportLog;

/// JSON array of report logs on disk
#[derive(Debug, Clone)]
pub struct LogStore {
    path: PathBuf,
}

impl LogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every log, creating an empty store file when none exists
    pub async fn load(&self) -> Result<Vec<ReportLog>> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "Creating empty log store");
                self.save(&[]).await?;
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Serialize the full list, replacing the previous document
    pub async fn save(&self, logs: &[ReportLog]) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_vec_pretty(logs)?;
        fs::write(&self.path, content).await?;
        Ok(())
    }
}

/// Directory of uploaded binaries, one file per attachment
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    dir: PathBuf,
    url_prefix: String,
}

impl AttachmentStore {
    pub fn new(dir: impl Into<PathBuf>, url_prefix: &str) -> Self {
        Self {
            dir: dir.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Create the uploads directory up front so the first upload cannot race it
    pub async fn init(&self) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create uploads dir {}", self.dir.display()))
    }

    /// Storage name for an attachment: its id plus the original extension
    pub fn stored_name(attachment_id: &str, original_name: &str) -> String {
        match Path::new(original_name).extension().and_then(|e| e.to_str()) {
            Some(ext) if !ext.is_empty() => format!("{}.{}", attachment_id, ext),
            _ => attachment_id.to_string(),
        }
    }

    /// Server-relative URL a stored binary is reachable at
    pub fn url_for(&self, stored_name: &str) -> String {
        format!("{}/{}", self.url_prefix, stored_name)
    }

    /// Recover the storage name from a URL produced by [`Self::url_for`]
    pub fn stored_name_from_url(url: &str) -> Option<&str> {
        url.rsplit('/').next().filter(|name| !name.is_empty())
    }

    /// Resolve a storage name inside the uploads dir, refusing anything that
    /// would escape it
    fn resolve(&self, stored_name: &str) -> Result<PathBuf> {
        let name = Path::new(stored_name);
        let plain = name.components().count() == 1
            && matches!(name.components().next(), Some(std::path::Component::Normal(_)));
        if !plain {
            return Err(AppError::BadRequest(format!(
                "Invalid file name: {}",
                stored_name
            )));
        }
        Ok(self.dir.join(name))
    }

    pub async fn write(&self, stored_name: &str, data: &[u8]) -> Result<()> {
        let path = self.resolve(stored_name)?;
        fs::create_dir_all(&self.dir).await?;
        fs::write(&path, data).await?;
        tracing::debug!(path = %path.display(), bytes = data.len(), "Wrote attachment");
        Ok(())
    }

    pub async fn read(&self, stored_name: &str) -> Result<Vec<u8>> {
        let path = self.resolve(stored_name)?;
        fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::NotFound(format!("File not found: {}", stored_name))
            } else {
                e.into()
            }
        })
    }

    /// Best-effort removal; failures are logged, never returned
    pub async fn remove(&self, stored_name: &str) {
        let path = match self.resolve(stored_name) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(error = %e, "Refusing to remove attachment");
                return;
            }
        };

        if let Err(e) = fs::remove_file(&path).await {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to remove attachment binary"
            );
        }
    }
}
