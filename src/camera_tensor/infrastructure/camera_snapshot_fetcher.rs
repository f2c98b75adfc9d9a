use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use base64::decode;
use super::error::InfrastructureError;

/// Where a still frame comes from.
#[derive(Debug, PartialEq)]
pub enum SnapshotLocation<'a> {
    DataUrl(&'a str),
    File(PathBuf),
    Http(&'a str),
}

impl<'a> SnapshotLocation<'a> {
    /// Strings without a scheme are file paths; unknown schemes are rejected.
    pub fn classify(url: &'a str) -> Result<SnapshotLocation<'a>, InfrastructureError> {
        if url.starts_with("data:") {
            Ok(SnapshotLocation::DataUrl(url))
        } else if let Some(path) = url.strip_prefix("file://") {
            Ok(SnapshotLocation::File(PathBuf::from(path)))
        } else if url.starts_with("http://") || url.starts_with("https://") {
            Ok(SnapshotLocation::Http(url))
        } else if let Some((scheme, _)) = url.split_once("://") {
            Err(InfrastructureError::UnsupportedScheme(scheme.to_string()))
        } else {
            Ok(SnapshotLocation::File(PathBuf::from(url)))
        }
    }
}

/// Pulls single frames from network cameras' snapshot endpoints.
///
/// Local files are only served from below `snapshot_root`; without a root
/// every file location is refused.
pub struct DefaultCameraSnapshotFetcher {
    client: reqwest::Client,
    snapshot_root: Option<PathBuf>,
}

impl DefaultCameraSnapshotFetcher {
    pub fn new(timeout: Duration) -> Result<Self, InfrastructureError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(InfrastructureError::ReqwestError)?;
        Ok(Self {
            client,
            snapshot_root: None,
        })
    }

    pub fn with_snapshot_root(mut self, snapshot_root: Option<PathBuf>) -> Self {
        self.snapshot_root = snapshot_root;
        self
    }

    pub async fn fetch_snapshot(&self, url: &str) -> Result<Vec<u8>, InfrastructureError> {
        match SnapshotLocation::classify(url)? {
            SnapshotLocation::DataUrl(data_url) => decode_data_url(data_url),
            SnapshotLocation::File(path) => {
                let path = self.resolve_file(&path).await?;
                read_file(&path).await
            }
            SnapshotLocation::Http(http_url) => self.fetch_http(http_url).await,
        }
    }

    /// Maps a requested file onto its canonical path below the snapshot root.
    /// Relative paths are taken relative to the root.
    pub async fn resolve_file(&self, path: &Path) -> Result<PathBuf, InfrastructureError> {
        let Some(root) = &self.snapshot_root else {
            return Err(InfrastructureError::PathNotAllowed(path.to_path_buf()));
        };
        let root = tokio::fs::canonicalize(root)
            .await
            .map_err(|_| InfrastructureError::FileNotFound(root.clone()))?;
        let candidate = root.join(path);
        if candidate.components().any(|c| c == Component::ParentDir) || !candidate.starts_with(&root) {
            return Err(InfrastructureError::PathNotAllowed(path.to_path_buf()));
        }

        let resolved = match tokio::fs::canonicalize(&candidate).await {
            Ok(resolved) => resolved,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(InfrastructureError::FileNotFound(candidate))
            }
            Err(e) => return Err(InfrastructureError::IoError(e)),
        };
        // symlinks may still point elsewhere
        if !resolved.starts_with(&root) {
            return Err(InfrastructureError::PathNotAllowed(path.to_path_buf()));
        }
        Ok(resolved)
    }

    async fn fetch_http(&self, url: &str) -> Result<Vec<u8>, InfrastructureError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(InfrastructureError::ReqwestError)?;
        let status = response.status();
        if !status.is_success() {
            return Err(InfrastructureError::ExternalApiError(format!(
                "camera at {} answered {}",
                url, status
            )));
        }
        let bytes = response.bytes().await.map_err(InfrastructureError::ReqwestError)?;
        log::debug!(target: "fetcher", "fetched {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}

fn decode_data_url(url: &str) -> Result<Vec<u8>, InfrastructureError> {
    let base64_data = url
        .split(',')
        .nth(1)
        .ok_or_else(|| InfrastructureError::DecodingError("Invalid data URL: missing comma".to_string()))?;
    decode(base64_data).map_err(InfrastructureError::Base64DecodeError)
}

async fn read_file(path: &Path) -> Result<Vec<u8>, InfrastructureError> {
    match tokio::fs::read(path).await {
        Ok(data) => Ok(data),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(InfrastructureError::FileNotFound(path.to_path_buf()))
        }
        Err(e) => Err(InfrastructureError::IoError(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> DefaultCameraSnapshotFetcher {
        DefaultCameraSnapshotFetcher::new(Duration::from_secs(1)).unwrap()
    }

    fn snapshot_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("camera_tensor_fetch_{}_{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::canonicalize(dir).unwrap()
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            SnapshotLocation::classify("data:image/png;base64,AAAA").unwrap(),
            SnapshotLocation::DataUrl("data:image/png;base64,AAAA")
        );
        assert_eq!(
            SnapshotLocation::classify("file:///tmp/frame.jpg").unwrap(),
            SnapshotLocation::File(PathBuf::from("/tmp/frame.jpg"))
        );
        assert_eq!(
            SnapshotLocation::classify("http://192.168.1.20/snapshot.jpg").unwrap(),
            SnapshotLocation::Http("http://192.168.1.20/snapshot.jpg")
        );
        assert_eq!(
            SnapshotLocation::classify("frames/latest.png").unwrap(),
            SnapshotLocation::File(PathBuf::from("frames/latest.png"))
        );
    }

    #[test]
    fn test_classify_rejects_unknown_scheme() {
        match SnapshotLocation::classify("ftp://camera/snapshot.jpg") {
            Err(InfrastructureError::UnsupportedScheme(scheme)) => assert_eq!(scheme, "ftp"),
            other => panic!("Expected UnsupportedScheme, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_data_url() {
        let bytes = fetcher().fetch_snapshot("data:text/plain;base64,aGVsbG8=").await.unwrap();
        assert_eq!(bytes, b"hello".to_vec());
    }

    #[tokio::test]
    async fn test_fetch_data_url_without_comma() {
        let result = fetcher().fetch_snapshot("data:image/png;base64").await;
        assert!(matches!(result, Err(InfrastructureError::DecodingError(_))));
    }

    #[tokio::test]
    async fn test_files_refused_without_snapshot_root() {
        let result = fetcher().fetch_snapshot("file:///etc/hostname").await;
        assert!(matches!(result, Err(InfrastructureError::PathNotAllowed(_))));
    }

    #[tokio::test]
    async fn test_fetch_file_inside_snapshot_root() {
        let root = snapshot_dir("inside");
        std::fs::write(root.join("cam1.jpg"), b"frame").unwrap();
        let fetcher = fetcher().with_snapshot_root(Some(root.clone()));

        let relative = fetcher.fetch_snapshot("cam1.jpg").await.unwrap();
        let absolute = fetcher
            .fetch_snapshot(&format!("file://{}", root.join("cam1.jpg").display()))
            .await
            .unwrap();
        std::fs::remove_dir_all(&root).ok();

        assert_eq!(relative, b"frame".to_vec());
        assert_eq!(absolute, b"frame".to_vec());
    }

    #[tokio::test]
    async fn test_files_outside_snapshot_root_are_refused() {
        let root = snapshot_dir("outside");
        let fetcher = fetcher().with_snapshot_root(Some(root.clone()));

        let escaped = fetcher.fetch_snapshot("../secret.jpg").await;
        let absolute = fetcher.fetch_snapshot("file:///etc/hostname").await;
        std::fs::remove_dir_all(&root).ok();

        assert!(matches!(escaped, Err(InfrastructureError::PathNotAllowed(_))));
        assert!(matches!(absolute, Err(InfrastructureError::PathNotAllowed(_))));
    }

    #[tokio::test]
    async fn test_fetch_missing_file() {
        let root = snapshot_dir("missing");
        let fetcher = fetcher().with_snapshot_root(Some(root.clone()));
        let result = fetcher.fetch_snapshot("no_such_snapshot.jpg").await;
        std::fs::remove_dir_all(&root).ok();
        assert!(matches!(result, Err(InfrastructureError::FileNotFound(_))));
    }
}
