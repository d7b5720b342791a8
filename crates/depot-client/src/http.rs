use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Body, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use depot_types::{CatalogPage, OriginKey, PackageIdent, PackageRecord};

use crate::config::{ClientTimeouts, RegistryConfig};
use crate::endpoint::endpoints;
use crate::error::{ClientError, ClientResult};
use crate::traits::RegistryClient;

/// Uploads land in this channel on the depot; promotion into it is a no-op.
const UPLOAD_CHANNEL: &str = "unstable";

/// [`RegistryClient`] over the depot REST API.
pub struct HttpRegistryClient {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
    timeouts: ClientTimeouts,
}

impl HttpRegistryClient {
    pub fn new(config: &RegistryConfig) -> ClientResult<Self> {
        let base_url = config.url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::InvalidUrl(config.url.clone()));
        }
        let client = reqwest::Client::builder()
            .user_agent(concat!("depot-mirror/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            auth_token: config.auth_token.clone(),
            timeouts: config.timeouts.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, url: &str, timeout: Duration) -> RequestBuilder {
        let builder = self.client.request(method, url).timeout(timeout);
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send and map non-success statuses to errors.
    async fn send(&self, builder: RequestBuilder, url: &str) -> ClientResult<Response> {
        let response = builder.send().await.map_err(|e| transport_error(url, e))?;
        let status = response.status();
        debug!(%url, status = status.as_u16(), "depot response");
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(ClientError::Status { url: url.to_string(), status: status.as_u16() });
        }
        Ok(response)
    }

    /// Like `send`, but a `409 Conflict` (already present) counts as success.
    async fn send_idempotent(&self, builder: RequestBuilder, url: &str) -> ClientResult<()> {
        match self.send(builder, url).await {
            Ok(_) => Ok(()),
            Err(ClientError::Status { status, .. }) if status == StatusCode::CONFLICT.as_u16() => {
                debug!(%url, "already present on depot");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        timeout: Duration,
    ) -> ClientResult<T> {
        debug!("HTTP GET {url}");
        let builder = self.request(Method::GET, url, timeout).query(query);
        let response = self.send(builder, url).await?;
        let body = response.bytes().await.map_err(|e| transport_error(url, e))?;
        serde_json::from_slice(&body)
            .map_err(|e| ClientError::Decode { url: url.to_string(), reason: e.to_string() })
    }
}

fn transport_error(url: &str, e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        ClientError::Timeout { url: url.to_string() }
    } else {
        ClientError::Transport(format!("{url}: {e}"))
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    fn name(&self) -> &str {
        &self.base_url
    }

    async fn list_packages(
        &self,
        origin: &str,
        channel: &str,
        range: Option<u64>,
    ) -> ClientResult<CatalogPage> {
        let url = self.url(&endpoints::channel_packages(origin, channel));
        let query: Vec<(&str, String)> =
            range.map(|r| vec![("range", r.to_string())]).unwrap_or_default();
        self.get_json(&url, &query, self.timeouts.listing()).await
    }

    async fn fetch_package(&self, ident: &PackageIdent) -> ClientResult<PackageRecord> {
        let url = self.url(&endpoints::package(ident));
        self.get_json(&url, &[], self.timeouts.package()).await
    }

    async fn package_exists(&self, ident: &PackageIdent) -> ClientResult<bool> {
        let url = self.url(&endpoints::package(ident));
        debug!("HTTP GET {url}");
        let builder = self.request(Method::GET, &url, self.timeouts.package());
        match self.send(builder, &url).await {
            Ok(_) => Ok(true),
            Err(ClientError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn download_artifact(&self, record: &PackageRecord, dest: &Path) -> ClientResult<u64> {
        let url = self.url(&endpoints::download(&record.ident));
        debug!("HTTP GET {url} -> {}", dest.display());
        let builder = self
            .request(Method::GET, &url, self.timeouts.transfer())
            .query(&[("target", record.target.as_str())]);
        let mut response = self.send(builder, &url).await?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await.map_err(|e| transport_error(&url, e))? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }

    async fn upload_artifact(
        &self,
        record: &PackageRecord,
        src: &Path,
        channel: &str,
    ) -> ClientResult<()> {
        let file = tokio::fs::File::open(src).await?;
        let len = file.metadata().await?.len();
        let url = self.url(&endpoints::package(&record.ident));
        debug!("HTTP POST {url} ({len} bytes)");
        let builder = self
            .request(Method::POST, &url, self.timeouts.transfer())
            .query(&[("checksum", record.checksum.as_str()), ("target", record.target.as_str())])
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .header(reqwest::header::CONTENT_LENGTH, len)
            .body(Body::from(file));
        self.send_idempotent(builder, &url).await?;

        if channel != UPLOAD_CHANNEL {
            let url = self.url(&endpoints::promote(channel, &record.ident));
            debug!("HTTP PUT {url}");
            let builder = self
                .request(Method::PUT, &url, self.timeouts.package())
                .query(&[("target", record.target.as_str())]);
            self.send(builder, &url).await?;
        }
        Ok(())
    }

    async fn list_origin_keys(&self, origin: &str) -> ClientResult<Vec<OriginKey>> {
        let url = self.url(&endpoints::origin_keys(origin));
        self.get_json(&url, &[], self.timeouts.listing()).await
    }

    async fn fetch_key(&self, key: &OriginKey) -> ClientResult<String> {
        let url = self.url(&endpoints::key_material(&key.location));
        debug!("HTTP GET {url}");
        let builder = self.request(Method::GET, &url, self.timeouts.listing());
        let response = self.send(builder, &url).await?;
        response.text().await.map_err(|e| transport_error(&url, e))
    }

    async fn import_key(&self, key: &OriginKey, src: &Path) -> ClientResult<()> {
        let body = tokio::fs::read(src).await?;
        let url = self.url(&endpoints::origin_key(key));
        debug!("HTTP POST {url}");
        let builder = self
            .request(Method::POST, &url, self.timeouts.package())
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(body);
        self.send_idempotent(builder, &url).await
    }
}

impl std::fmt::Debug for HttpRegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRegistryClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.auth_token.is_some())
            .finish()
    }
}
