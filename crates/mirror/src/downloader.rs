use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use rustls::{ClientConfig, crypto::aws_lc_rs};
use rustls_platform_verifier::BuilderVerifierExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

use crate::{DownloaderConfig, MirrorError};

/// Create a reqwest Client with the provided configuration
pub fn create_client(config: &DownloaderConfig) -> Result<Client, MirrorError> {
    let provider = Arc::new(aws_lc_rs::default_provider());

    let tls_config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| MirrorError::Configuration(format!("TLS protocol versions: {e}")))?
        .with_platform_verifier()
        .map_err(|e| MirrorError::Configuration(format!("TLS platform verifier: {e}")))?
        .with_no_client_auth();

    let mut client_builder = Client::builder()
        .pool_max_idle_per_host(5)
        .user_agent(&config.user_agent)
        .default_headers(config.headers.clone())
        .use_preconfigured_tls(tls_config)
        .redirect(if config.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        });

    if !config.connect_timeout.is_zero() {
        client_builder = client_builder.connect_timeout(config.connect_timeout);
    }

    if config.use_system_proxy {
        // reqwest picks up system proxy settings unless no_proxy() is called
        info!("Using system proxy settings for downloads");
    } else {
        client_builder = client_builder.no_proxy();
        debug!("Proxy disabled for downloads");
    }

    client_builder.build().map_err(MirrorError::from)
}

/// Blocking-style "GET this URL" capability used for manifests and assets.
///
/// Exactly one request is made per call; there is no retry layer.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<Bytes, MirrorError>;
}

pub struct HttpFetcher {
    http_client: Client,
}

impl HttpFetcher {
    pub fn new(http_client: Client) -> Self {
        Self { http_client }
    }

    pub fn from_config(config: &DownloaderConfig) -> Result<Self, MirrorError> {
        Ok(Self::new(create_client(config)?))
    }
}

#[async_trait]
impl HttpFetch for HttpFetcher {
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<Bytes, MirrorError> {
        let mut request_builder = self.http_client.get(url.clone());
        if !timeout.is_zero() {
            request_builder = request_builder.timeout(timeout);
        }

        let response = request_builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, %url, %body, "Request returned a non-success status");
            return Err(MirrorError::http_status(status, url.as_str()));
        }

        let bytes = response.bytes().await?;
        debug!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(bytes)
    }
}
