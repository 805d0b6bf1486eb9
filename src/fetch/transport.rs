//! Byte transports behind the data fetcher
//!
//! The viewer reads its endpoints either from an HTTP server or straight
//! from a directory holding the compiled `api/` tree.

use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use super::FetchError;

/// Source of raw endpoint bodies
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Read the body of an endpoint path such as `api/runs.json`
    async fn get(&self, path: &str) -> Result<Vec<u8>, FetchError>;

    /// Human readable location, for logs
    fn describe(&self) -> String;
}

/// Transport reading endpoints from an HTTP server
pub struct HttpTransport {
    client: Client,
    base: Url,
}

impl HttpTransport {
    /// Create a transport rooted at `base_url`
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let mut base = Url::parse(base_url).map_err(|e| FetchError::Transport {
            url: base_url.to_string(),
            message: e.to_string(),
        })?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            client: Client::new(),
            base,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        let url = self.base.join(path).map_err(|e| FetchError::Transport {
            url: path.to_string(),
            message: e.to_string(),
        })?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }

    fn describe(&self) -> String {
        self.base.to_string()
    }
}

/// Transport reading endpoints from files below a root directory
pub struct DirectoryTransport {
    root: PathBuf,
}

impl DirectoryTransport {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl Transport for DirectoryTransport {
    async fn get(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        let relative = path.trim_start_matches('/');
        if relative.split('/').any(|part| part == "..") {
            return Err(FetchError::Transport {
                url: path.to_string(),
                message: "path escapes the data directory".to_string(),
            });
        }

        let file = self.root.join(relative);
        match tokio::fs::read(&file).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FetchError::NotFound {
                url: file.display().to_string(),
            }),
            Err(e) => Err(FetchError::Transport {
                url: file.display().to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}
