//! HTTP document transport.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use linkpeek_core::constants::{DEFAULT_FETCH_TIMEOUT_SECONDS, DEFAULT_USER_AGENT};
use linkpeek_core::error::{FetchError, PreviewError, Result};
use linkpeek_core::DocumentTransport;

/// HTTP transport configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpTransportConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent header
    pub user_agent: String,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_FETCH_TIMEOUT_SECONDS,
            user_agent: DEFAULT_USER_AGENT.into(),
        }
    }
}

/// Downloads documents with a single GET.
pub struct HttpTransport {
    config: HttpTransportConfig,
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(HttpTransportConfig::default())
    }

    /// Creates a transport with custom configuration.
    pub fn with_config(config: HttpTransportConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| PreviewError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn classify(&self, url: &str, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                seconds: self.config.timeout_seconds,
            }
        } else {
            FetchError::Network {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl DocumentTransport for HttpTransport {
    #[instrument(skip(self))]
    async fn fetch_document(&self, url: &str) -> std::result::Result<Bytes, FetchError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(url, e))?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        // Decodes with the charset from Content-Type, UTF-8 when absent.
        let body = response.text().await.map_err(|e| self.classify(url, e))?;
        debug!(url, bytes = body.len(), "Downloaded document");
        Ok(Bytes::from(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_document_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .and(header("user-agent", DEFAULT_USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_string("<title>A</title>"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::new().unwrap();
        let body = transport
            .fetch_document(&format!("{}/a", server.uri()))
            .await
            .unwrap();

        assert_eq!(&body[..], b"<title>A</title>");
    }

    #[tokio::test]
    async fn test_declared_charset_is_transcoded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=iso-8859-1")
                    .set_body_bytes(b"<title>Caf\xe9</title>".to_vec()),
            )
            .mount(&server)
            .await;

        let transport = HttpTransport::new().unwrap();
        let body = transport
            .fetch_document(&format!("{}/latin1", server.uri()))
            .await
            .unwrap();

        assert_eq!(std::str::from_utf8(&body).unwrap(), "<title>Café</title>");
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let transport = HttpTransport::new().unwrap();
        let err = transport
            .fetch_document(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let transport = HttpTransport::with_config(HttpTransportConfig {
            timeout_seconds: 1,
            ..Default::default()
        })
        .unwrap();
        let err = transport
            .fetch_document(&format!("{}/slow", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Timeout { seconds: 1, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_host() {
        let transport = HttpTransport::new().unwrap();
        let err = transport
            .fetch_document("http://127.0.0.1:1/")
            .await
            .unwrap_err();

        assert!(err.is_transport());
    }
}
