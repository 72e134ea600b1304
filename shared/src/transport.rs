//! Outbound HTTP transport.
//!
//! Every outbound call in this crate goes through [`Transport`], so clients
//! can be exercised against an in-memory transport in tests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use thiserror::Error;
use tracing::debug;

use crate::{Config, Error, Result};

/// Raw HTTP response: status and full body text.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failures before an HTTP response was fully received.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("{0}")]
    Network(String),
    #[error("{0}")]
    Timeout(String),
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Network(msg) => Error::Network(msg),
            TransportError::Timeout(msg) => Error::Timeout(msg),
        }
    }
}

/// Sends a JSON body with POST and returns the complete response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        body: Vec<u8>,
    ) -> std::result::Result<TransportResponse, TransportError>;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport with static default headers and an overall timeout.
    pub fn new(default_headers: HeaderMap, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().default_headers(default_headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Build a transport from the toolkit settings in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &config.toolkit_api_key {
            let value = HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|_| Error::Config("TOOLKIT_API_KEY is not a valid header value".to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }
        for (name, value) in &config.extra_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| Error::Config(format!("Invalid header name: {}", name)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| Error::Config(format!("Invalid header value for {}", name)))?;
            headers.insert(name, value);
        }
        Self::new(headers, Some(config.request_timeout))
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else {
        TransportError::Network(err.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(
        &self,
        url: &str,
        body: Vec<u8>,
    ) -> std::result::Result<TransportResponse, TransportError> {
        debug!(url = %url, bytes = body.len(), "POST");

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;

        Ok(TransportResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_success_range() {
        let ok = TransportResponse {
            status: 204,
            body: String::new(),
        };
        let moved = TransportResponse {
            status: 301,
            body: String::new(),
        };
        assert!(ok.is_success());
        assert!(!moved.is_success());
    }

    #[tokio::test]
    async fn test_refused_connection_is_network_error() {
        // Bind then drop to get a local port with nothing listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = HttpTransport::new(HeaderMap::new(), Some(Duration::from_secs(5))).unwrap();
        let err = transport
            .post_json(&format!("http://{}/agent/object", addr), b"{}".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Network(_)));
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            // Read the request and never answer.
            let _ = socket.read(&mut buf).await;
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let transport =
            HttpTransport::new(HeaderMap::new(), Some(Duration::from_millis(200))).unwrap();
        let err = transport
            .post_json(&format!("http://{}/agent/object", addr), b"{}".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_configured_headers_reach_the_wire() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head: Vec<u8> = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            socket
                .write_all(
                    b"HTTP/1.1 500 Internal Server Error\r\n\
                      Content-Type: text/plain\r\n\
                      Content-Length: 14\r\n\
                      Connection: close\r\n\r\n\
                      internal error",
                )
                .await
                .unwrap();
            String::from_utf8_lossy(&head).to_lowercase()
        });

        let config = Config::from_lookup(|key| match key {
            "TOOLKIT_API_KEY" => Some("secret-key".to_string()),
            "TOOLKIT_HEADERS" => Some("X-App: lawn-doctor".to_string()),
            _ => None,
        })
        .unwrap();
        let transport = HttpTransport::from_config(&config).unwrap();
        let response = transport
            .post_json(&format!("http://{}/agent/object", addr), br#"{"messages":[]}"#.to_vec())
            .await
            .unwrap();

        assert_eq!(
            response,
            TransportResponse {
                status: 500,
                body: "internal error".to_string(),
            }
        );
        assert!(!response.is_success());

        let head = server.await.unwrap();
        assert!(head.starts_with("post /agent/object "), "{}", head);
        assert!(head.contains("content-type: application/json\r\n"), "{}", head);
        assert!(head.contains("authorization: bearer secret-key\r\n"), "{}", head);
        assert!(head.contains("x-app: lawn-doctor\r\n"), "{}", head);
    }
}
