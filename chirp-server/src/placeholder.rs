use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

use crate::db::repositories::ProfileImage;

const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// Fetches a random profile picture for users who sign up without one
#[derive(Clone)]
pub struct PlaceholderClient {
    client: Client,
    url: Option<String>,
}

impl PlaceholderClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build placeholder HTTP client")?;
        Ok(Self {
            client,
            url: Some(url.into()),
        })
    }

    /// A client that never fetches anything
    pub fn disabled() -> Self {
        Self {
            client: Client::new(),
            url: None,
        }
    }

    /// Fetch a placeholder image
    ///
    /// Failures are logged and reported as `None`; signup proceeds without a
    /// picture.
    pub async fn fetch(&self) -> Option<ProfileImage> {
        let url = self.url.as_deref()?;
        match self.try_fetch(url).await {
            Ok(image) => {
                tracing::debug!("Fetched placeholder image ({} bytes)", image.bytes.len());
                Some(image)
            }
            Err(e) => {
                tracing::warn!("Error fetching placeholder profile picture: {:#}", e);
                None
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<ProfileImage> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Placeholder request failed")?
            .error_for_status()
            .context("Placeholder service returned an error status")?;

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .filter(|v| v.starts_with("image/"))
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());

        let bytes = response
            .bytes()
            .await
            .context("Failed to read placeholder body")?;

        Ok(ProfileImage {
            bytes: bytes.to_vec(),
            mime_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_client_returns_none() {
        assert!(PlaceholderClient::disabled().fetch().await.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_service_degrades_to_none() {
        // Nothing listens on port 9 of the loopback interface
        let client = PlaceholderClient::new("http://127.0.0.1:9/200/300", Duration::from_secs(2))
            .expect("client should build");
        assert!(client.fetch().await.is_none());
    }
}
