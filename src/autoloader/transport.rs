//! Paced HTTP Transport
//!
//! The autoloader's embedded web server falls over when it receives
//! requests in quick succession. Every request goes through one mutex that
//! also remembers when the previous request was issued, so requests are
//! serialized and spaced at least `request_interval` apart.

use crate::domain::ports::{DeviceRequest, DeviceTransport, RequestMethod};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

// =============================================================================
// Configuration
// =============================================================================

/// Observed minimum safe gap between two requests
pub const DEFAULT_REQUEST_INTERVAL: Duration = Duration::from_secs(10);

/// Response bodies are cut off after this many bytes
pub const MAX_BODY_BYTES: usize = 100 * 1024;

/// Configuration for the paced transport
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Minimum time between two paced requests
    pub request_interval: Duration,
    /// Timeout for a single request, including reading the body
    pub request_timeout: Duration,
    /// Response body cap in bytes
    pub max_body_bytes: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            request_interval: DEFAULT_REQUEST_INTERVAL,
            request_timeout: Duration::from_secs(60),
            max_body_bytes: MAX_BODY_BYTES,
        }
    }
}

// =============================================================================
// Paced Transport
// =============================================================================

/// HTTP transport to the autoloader web interface
pub struct PacedTransport {
    client: reqwest::Client,
    /// Device root, always ending in `/`
    base_url: String,
    /// Pre-encoded HTTP basic auth header
    auth: HeaderValue,
    config: TransportConfig,
    /// When the previous request was issued
    last_sent: Mutex<Option<Instant>>,
}

impl PacedTransport {
    /// Create a transport for the autoloader at `host`
    ///
    /// `host` is a hostname or address, optionally with a port or an
    /// explicit `http://` prefix.
    pub fn new(host: &str, username: &str, password: &str, config: TransportConfig) -> Result<Self> {
        let base_url = if host.starts_with("http://") || host.starts_with("https://") {
            format!("{}/", host.trim_end_matches('/'))
        } else {
            format!("http://{}/", host)
        };

        let encoded = base64::encode(format!("{}:{}", username, password));
        let mut auth = HeaderValue::from_str(&format!("Basic {}", encoded))
            .map_err(|e| Error::Configuration(format!("Invalid credentials: {}", e)))?;
        auth.set_sensitive(true);

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            auth,
            config,
            last_sent: Mutex::new(None),
        })
    }

    /// Device root URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of a page on the device
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Sleep until `request_interval` has passed since `last_sent`
    async fn wait_for_interval(&self, last_sent: Option<Instant>) {
        let Some(last_sent) = last_sent else {
            return;
        };

        let wait = self
            .config
            .request_interval
            .saturating_sub(last_sent.elapsed());
        if !wait.is_zero() {
            debug!("Sleeping for {:?}", wait);
            tokio::time::sleep(wait).await;
            debug!("Done sleeping");
        }
    }

    /// Read the response body, stopping at `max_body_bytes`
    async fn read_capped(&self, mut response: reqwest::Response, url: &str) -> Result<String> {
        let max = self.config.max_body_bytes;
        let mut body = Vec::new();

        while let Some(chunk) = response.chunk().await.map_err(|e| Error::Network {
            url: url.to_string(),
            reason: e.to_string(),
        })? {
            let take = chunk.len().min(max - body.len());
            body.extend_from_slice(&chunk[..take]);
            if body.len() >= max {
                debug!("Response from {} capped at {} bytes", url, max);
                break;
            }
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

#[async_trait]
impl DeviceTransport for PacedTransport {
    async fn send(&self, request: &DeviceRequest) -> Result<String> {
        let url = self.url_for(&request.path);

        // Held until the response is read: one request at a time
        let mut last_sent = self.last_sent.lock().await;
        if request.paced {
            self.wait_for_interval(*last_sent).await;
        }

        let builder = match request.method {
            RequestMethod::Get => self.client.get(&url),
            RequestMethod::Post => self.client.post(&url).form(&request.form),
        }
        .header(AUTHORIZATION, self.auth.clone());

        // Stamped before sending so a slow response does not shorten the gap
        *last_sent = Some(Instant::now());
        debug!("{:?} {}", request.method, url);

        let response = builder.send().await.map_err(|e| Error::Network {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => return Err(Error::NotFound { url }),
            StatusCode::UNAUTHORIZED => return Err(Error::Unauthorized { url }),
            status => {
                return Err(Error::HttpStatus {
                    url,
                    status: status.as_u16(),
                })
            }
        }

        let body = self.read_capped(response, &url).await?;
        debug!("Got {} bytes of HTML from {}", body.len(), url);

        Ok(body)
    }
}
