// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Model artifact downloading and on-disk caching

use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{ModelArtifact, ModelSpec};

#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Directory artifacts are cached in
    pub download_dir: PathBuf,
    /// Root URL artifacts are fetched from
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("./models"),
            base_url: crate::config::DEFAULT_MODEL_BASE_URL.to_string(),
            timeout_secs: 600,
        }
    }
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Download of {url} failed with HTTP status {status}")]
    HttpStatus { url: String, status: u16 },
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Downloaded file {0} is empty")]
    EmptyFile(String),
}

impl From<reqwest::Error> for DownloadError {
    fn from(e: reqwest::Error) -> Self {
        DownloadError::NetworkError(e.to_string())
    }
}

/// Local paths of a fully cached model configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPaths {
    pub detection: PathBuf,
    pub classification: Option<PathBuf>,
    pub recognition: PathBuf,
    pub dictionary: PathBuf,
}

/// In-progress download file, removed when dropped unless kept
///
/// Covers failed downloads as well as futures dropped mid-stream.
struct PartFile {
    path: PathBuf,
    keep: bool,
}

impl PartFile {
    fn new(path: PathBuf) -> Self {
        Self { path, keep: false }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// The file was renamed into place; nothing to clean up
    fn keep(mut self) {
        self.keep = true;
    }
}

impl Drop for PartFile {
    fn drop(&mut self) {
        if !self.keep {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Fetches model artifacts on demand and keeps them in the cache directory
///
/// Files already present are reused. New files are streamed into a uniquely
/// named `.part` file and renamed into place once complete, so a crashed or
/// concurrent download never leaves a truncated artifact under its final name.
pub struct ModelDownloader {
    config: DownloadConfig,
    client: reqwest::Client,
}

impl ModelDownloader {
    pub fn new(config: DownloadConfig) -> Result<Self, DownloadError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn download_dir(&self) -> &Path {
        &self.config.download_dir
    }

    /// URL an artifact is fetched from
    pub fn artifact_url(&self, artifact: &ModelArtifact) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            artifact.remote_path.trim_start_matches('/')
        )
    }

    /// Make sure every artifact of `spec` is cached locally
    pub async fn ensure_model(&self, spec: &ModelSpec) -> Result<ModelPaths, DownloadError> {
        let detection = self.ensure_artifact(&spec.detection).await?;
        let classification = match spec.classification {
            Some(ref artifact) => Some(self.ensure_artifact(artifact).await?),
            None => None,
        };
        let recognition = self.ensure_artifact(&spec.recognition).await?;
        let dictionary = self.ensure_artifact(&spec.dictionary).await?;

        Ok(ModelPaths {
            detection,
            classification,
            recognition,
            dictionary,
        })
    }

    /// Return the cached path of `artifact`, downloading it first if missing
    pub async fn ensure_artifact(&self, artifact: &ModelArtifact) -> Result<PathBuf, DownloadError> {
        let target = self.config.download_dir.join(artifact.file_name);

        if let Ok(metadata) = tokio::fs::metadata(&target).await {
            if metadata.is_file() && metadata.len() > 0 {
                debug!("Using cached model file {}", target.display());
                return Ok(target);
            }
        }

        tokio::fs::create_dir_all(&self.config.download_dir).await?;

        let url = self.artifact_url(artifact);
        info!("📥 Downloading {} from {}", artifact.file_name, url);

        let part = PartFile::new(
            self.config
                .download_dir
                .join(format!("{}.{}.part", artifact.file_name, Uuid::new_v4())),
        );

        let outcome = self.stream_to_file(&url, part.path()).await;
        match outcome {
            Ok(bytes) => {
                tokio::fs::rename(part.path(), &target).await?;
                part.keep();
                info!(
                    "✅ Downloaded {} ({} bytes)",
                    artifact.file_name, bytes
                );
                Ok(target)
            }
            Err(e) => {
                warn!("⚠️ Download of {} failed: {}", artifact.file_name, e);
                Err(e)
            }
        }
    }

    async fn stream_to_file(&self, url: &str, path: &Path) -> Result<u64, DownloadError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(path).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        if written == 0 {
            return Err(DownloadError::EmptyFile(url.to_string()));
        }

        Ok(written)
    }
}
