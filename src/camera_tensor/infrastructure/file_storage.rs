use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use super::error::InfrastructureError;
use tokio::fs;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Writes exported snapshots below a capture directory.
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Saves a JPEG as `snapshot-<unix millis>.jpg` and returns its path.
    /// Saves landing in the same millisecond get a `-<n>` suffix; existing
    /// files are never replaced.
    pub async fn save_snapshot(&self, data: &[u8]) -> Result<PathBuf, InfrastructureError> {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| InfrastructureError::FileStorageError(e.to_string()))?
            .as_millis();
        fs::create_dir_all(&self.root).await.map_err(InfrastructureError::IoError)?;

        let (path, mut file) = self.create_unique(millis).await?;
        file.write_all(data).await.map_err(InfrastructureError::IoError)?;
        file.flush().await.map_err(InfrastructureError::IoError)?;
        log::info!(target: "storage", "saved snapshot {}", path.display());
        Ok(path)
    }

    async fn create_unique(&self, millis: u128) -> Result<(PathBuf, File), InfrastructureError> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = match attempt {
                0 => format!("snapshot-{}.jpg", millis),
                n => format!("snapshot-{}-{}.jpg", millis, n),
            };
            let path = self.root.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(InfrastructureError::IoError(e)),
            }
        }
        Err(InfrastructureError::FileStorageError(format!(
            "no free snapshot name for {} in {}",
            millis,
            self.root.display()
        )))
    }
}
