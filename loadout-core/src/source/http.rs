//! HTTP content source

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use super::ContentSource;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches resources over HTTP(S)
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    /// Create a source with no overall request timeout
    ///
    /// The loader bounds every download with `download_timeout_seconds`,
    /// so only connecting is limited here.
    pub fn new() -> Result<Self> {
        Self::from_builder(Self::client_builder())
    }

    /// Create a source whose client gives up after `timeout`
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        Self::from_builder(Self::client_builder().timeout(timeout))
    }

    fn client_builder() -> reqwest::ClientBuilder {
        reqwest::Client::builder()
            .user_agent(concat!("loadout/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
    }

    fn from_builder(builder: reqwest::ClientBuilder) -> Result<Self> {
        let client = builder.build().context("Failed to create HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ContentSource for HttpSource {
    async fn fetch(&self, url: &str) -> Result<String> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {url}"))?;

        if !response.status().is_success() {
            anyhow::bail!("HTTP {} from {}", response.status(), url);
        }

        response
            .text()
            .await
            .context("Failed to read response body")
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CatalogManifest, Loader, LoaderError, Settings};
    use std::net::TcpListener;
    use std::sync::Arc;

    /// Accepts connections and never answers
    fn silent_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let mut held = Vec::new();
            for stream in listener.incoming().flatten() {
                held.push(stream);
            }
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_hung_request_is_reported_as_timeout() {
        let base = silent_server();
        let catalog = CatalogManifest::from_yaml(&format!(
            "resources:\n  x: {{ displayName: X, type: script, url: \"{base}/x.js\" }}\n"
        ))
        .unwrap();
        let mut settings = Settings::default();
        settings.download_timeout_seconds = 1;

        let source = HttpSource::from_builder(HttpSource::client_builder().no_proxy()).unwrap();
        let loader = Loader::builder(catalog, "1.0")
            .settings(settings)
            .source(Arc::new(source))
            .build()
            .unwrap();

        let resource = loader.registry().get("x").unwrap().clone();
        let result = loader.download(&resource).await;

        assert!(
            matches!(result, Err(LoaderError::DownloadTimeout { .. })),
            "expected a timeout, got {result:?}"
        );
    }
}
