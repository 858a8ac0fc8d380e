//! Authenticated file download into the configured download directory

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::FileDownloader;
use crate::{
    config::DownloadConfig,
    error::{AppError, AppResult},
};

#[derive(Clone)]
pub struct HttpFileDownloader {
    client: Client,
    directory: PathBuf,
}

impl HttpFileDownloader {
    pub fn new(config: &DownloadConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| AppError::Internal(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            directory: config.directory.clone(),
        })
    }
}

#[async_trait]
impl FileDownloader for HttpFileDownloader {
    /// Store the body of `url` as `{name}.pdf`
    async fn download(&self, name: &str, url: &str, username: &str, password: &str) -> AppResult<PathBuf> {
        let response = self
            .client
            .get(url)
            .basic_auth(username, Some(password))
            .send()
            .await
            .map_err(|e| AppError::upstream(name, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::upstream(
                name,
                format!("download of {} failed with HTTP {}", url, status.as_u16()),
            ));
        }

        let bytes = response.bytes().await.map_err(|e| AppError::upstream(name, e))?;

        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| AppError::Internal(format!("download directory: {}", e)))?;
        let path = self.directory.join(format!("{}.pdf", name));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| AppError::Internal(format!("write {}: {}", path.display(), e)))?;

        tracing::debug!("Downloaded {} to {}", url, path.display());
        Ok(path)
    }
}
