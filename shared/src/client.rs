//! Structured generation client.
//!
//! Sends messages plus a translated schema to the generation service and
//! hands back the JSON the service produced. The service constrains the
//! model with the schema, so a response that parses as JSON is trusted as
//! having the schema's shape; it is not re-checked here.

use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::messages::{ChatRequest, GenerationRequest, Message, Prompt, Role};
use crate::schema::{translate, SchemaNode};
use crate::transport::{HttpTransport, Transport, TransportResponse};
use crate::{Config, Error, Result};

/// Path of the structured generation endpoint.
pub const OBJECT_PATH: &str = "/agent/object";
/// Path of the free-form text endpoint.
pub const CHAT_PATH: &str = "/agent/chat";

/// Per-call settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestOptions {
    /// Deadline for this call, overriding the client default. An
    /// [`HttpTransport`] still enforces its own configured timeout.
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

/// Client for the generation service. One outbound call per operation, no retries.
pub struct GenerationClient<T = HttpTransport> {
    transport: T,
    base_url: String,
    default_timeout: Option<Duration>,
}

impl GenerationClient<HttpTransport> {
    /// Create a client for the toolkit configured in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = HttpTransport::from_config(config)?;
        Ok(Self::new(transport, config.toolkit_url.clone()).with_timeout(config.request_timeout))
    }
}

impl<T: Transport> GenerationClient<T> {
    pub fn new(transport: T, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            default_timeout: None,
        }
    }

    /// Set the deadline applied to calls that do not carry their own.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[cfg(test)]
    pub(crate) fn transport_ref(&self) -> &T {
        &self.transport
    }

    /// Ask the service for a JSON value shaped like `schema`.
    pub async fn generate_object(&self, messages: &[Message], schema: &SchemaNode) -> Result<Value> {
        self.generate_object_with(messages, schema, RequestOptions::default())
            .await
    }

    pub async fn generate_object_with(
        &self,
        messages: &[Message],
        schema: &SchemaNode,
        options: RequestOptions,
    ) -> Result<Value> {
        validate_messages(messages)?;
        let request = GenerationRequest {
            messages,
            schema: translate(schema)?,
        };
        let body = serde_json::to_vec(&request)?;

        let response = self.send(OBJECT_PATH, body, options).await?;
        serde_json::from_str(&response.body)
            .map_err(|e| Error::MalformedResponse(format!("Response body is not JSON: {}", e)))
    }

    /// Like [`generate_object`](Self::generate_object), decoding into `R`.
    pub async fn generate<R: DeserializeOwned>(
        &self,
        messages: &[Message],
        schema: &SchemaNode,
        options: RequestOptions,
    ) -> Result<R> {
        let value = self.generate_object_with(messages, schema, options).await?;
        serde_json::from_value(value).map_err(|e| {
            Error::MalformedResponse(format!("Response does not match the expected shape: {}", e))
        })
    }

    /// Ask the service for free-form text.
    pub async fn generate_text(&self, prompt: impl Into<Prompt>) -> Result<String> {
        self.generate_text_with(prompt, RequestOptions::default())
            .await
    }

    pub async fn generate_text_with(
        &self,
        prompt: impl Into<Prompt>,
        options: RequestOptions,
    ) -> Result<String> {
        let messages = prompt.into().into_messages();
        validate_messages(&messages)?;
        let body = serde_json::to_vec(&ChatRequest {
            messages: &messages,
        })?;

        let response = self.send(CHAT_PATH, body, options).await?;
        let value: Value = serde_json::from_str(&response.body)
            .map_err(|e| Error::MalformedResponse(format!("Response body is not JSON: {}", e)))?;

        extract_text(&value)
            .ok_or_else(|| Error::MalformedResponse("Response carries no text".to_string()))
    }

    async fn send(
        &self,
        path: &str,
        body: Vec<u8>,
        options: RequestOptions,
    ) -> Result<TransportResponse> {
        let url = format!("{}{}", self.base_url, path);
        let started = Instant::now();
        debug!(url = %url, "Sending generation request");

        let call = self.transport.post_json(&url, body);
        let response = match options.timeout.or(self.default_timeout) {
            Some(deadline) => tokio::time::timeout(deadline, call)
                .await
                .map_err(|_| {
                    Error::Timeout(format!("{} did not answer within {:?}", url, deadline))
                })??,
            None => call.await?,
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        if !response.is_success() {
            warn!(url = %url, status = response.status, elapsed_ms, "Generation service failed");
            return Err(Error::RemoteService {
                status: response.status,
                body: response.body,
            });
        }

        info!(url = %url, status = response.status, elapsed_ms, "Generation service answered");
        Ok(response)
    }
}

fn validate_messages(messages: &[Message]) -> Result<()> {
    if messages.is_empty() {
        return Err(Error::Validation("At least one message is required".to_string()));
    }
    if !messages.iter().any(|m| m.role == Role::User) {
        return Err(Error::Validation("At least one user message is required".to_string()));
    }
    Ok(())
}

/// A bare string, or the first non-empty `text` / `content` field.
fn extract_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Object(map) => ["text", "content"]
            .iter()
            .filter_map(|key| map.get(*key).and_then(Value::as_str))
            .find(|text| !text.trim().is_empty())
            .map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::ContentPart;
    use crate::testing::MockTransport;
    use crate::transport::TransportError;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use serde_json::json;

    fn diagnosis_schema() -> SchemaNode {
        SchemaNode::object([
            ("diagnosis", SchemaNode::string()),
            ("riskLevel", SchemaNode::enumeration(["low", "medium", "high"])),
            ("confidence", SchemaNode::number().min(0.0).max(100.0)),
        ])
    }

    fn photo_message() -> Vec<Message> {
        vec![Message::user_parts(vec![
            ContentPart::Text {
                text: "Diagnose this lawn".to_string(),
            },
            ContentPart::Image {
                image: "data:image/jpeg;base64,/9j/4AAQ".to_string(),
            },
        ])]
    }

    #[tokio::test]
    async fn test_success_returns_body_as_value() {
        let transport = MockTransport::new().respond(
            200,
            r#"{"diagnosis":"Brown patch","riskLevel":"medium","confidence":82}"#,
        );
        let client = GenerationClient::new(transport, "https://toolkit.example.com/");

        let value = client
            .generate_object(&photo_message(), &diagnosis_schema())
            .await
            .unwrap();
        assert_eq!(
            value,
            json!({"diagnosis": "Brown patch", "riskLevel": "medium", "confidence": 82})
        );

        let calls = client.transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].url, "https://toolkit.example.com/agent/object");
        assert_eq!(calls[0].body["schema"]["type"], "object");
        assert_eq!(
            calls[0].body["schema"]["properties"]["riskLevel"]["enum"],
            json!(["low", "medium", "high"])
        );
        assert_eq!(calls[0].body["messages"][0]["content"][1]["type"], "image");
    }

    #[tokio::test]
    async fn test_http_failure_is_not_retried() {
        let transport = MockTransport::new()
            .respond(500, "internal error")
            .respond(200, "{}");
        let client = GenerationClient::new(transport, "https://toolkit.example.com");

        let err = client
            .generate_object(&photo_message(), &diagnosis_schema())
            .await
            .unwrap_err();
        match err {
            Error::RemoteService { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "internal error");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(client.transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed() {
        let client = GenerationClient::new(
            MockTransport::new().respond(200, "not json{"),
            "https://toolkit.example.com",
        );
        let err = client
            .generate_object(&photo_message(), &diagnosis_schema())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_typed_decode_mismatch_is_malformed() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Diagnosis {
            diagnosis: String,
            confidence: f64,
        }

        let client = GenerationClient::new(
            MockTransport::new().respond(200, r#"{"diagnosis": 3}"#),
            "https://toolkit.example.com",
        );
        let err = client
            .generate::<Diagnosis>(&photo_message(), &diagnosis_schema(), RequestOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_transport_failures_map_to_network_errors() {
        let client = GenerationClient::new(
            MockTransport::new()
                .fail(TransportError::Network("connection refused".to_string()))
                .fail(TransportError::Timeout("timed out".to_string())),
            "https://toolkit.example.com",
        );
        let first = client
            .generate_object(&photo_message(), &diagnosis_schema())
            .await
            .unwrap_err();
        let second = client
            .generate_object(&photo_message(), &diagnosis_schema())
            .await
            .unwrap_err();
        assert!(matches!(first, Error::Network(_)));
        assert!(matches!(second, Error::Timeout(_)));
        assert!(second.is_network());
    }

    #[tokio::test]
    async fn test_deadline_expiry_is_timeout() {
        let client = GenerationClient::new(
            MockTransport::new().stall(Duration::from_secs(5)),
            "https://toolkit.example.com",
        )
        .with_timeout(Duration::from_secs(30));

        let err = client
            .generate_object_with(
                &photo_message(),
                &diagnosis_schema(),
                RequestOptions::with_timeout(Duration::from_millis(20)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[tokio::test]
    async fn test_invalid_messages_make_no_call() {
        let client = GenerationClient::new(MockTransport::new(), "https://toolkit.example.com");

        let empty = client.generate_object(&[], &diagnosis_schema()).await;
        assert!(matches!(empty, Err(Error::Validation(_))));

        let assistant_only = client
            .generate_object(&[Message::assistant("hello")], &diagnosis_schema())
            .await;
        assert!(matches!(assistant_only, Err(Error::Validation(_))));

        assert!(client.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_bad_schema_makes_no_call() {
        let client = GenerationClient::new(MockTransport::new(), "https://toolkit.example.com");
        let err = client
            .generate_object(&photo_message(), &SchemaNode::enumeration(Vec::<String>::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SchemaDefinition(_)));
        assert!(client.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_text_from_content_field() {
        let client = GenerationClient::new(
            MockTransport::new().respond(200, r#"{"content":"Hello"}"#),
            "https://toolkit.example.com",
        );
        assert_eq!(client.generate_text("Say hello").await.unwrap(), "Hello");

        let calls = client.transport.calls();
        assert_eq!(calls[0].url, "https://toolkit.example.com/agent/chat");
        assert_eq!(
            calls[0].body,
            json!({"messages": [{"role": "user", "content": "Say hello"}]})
        );
    }

    #[tokio::test]
    async fn test_text_from_bare_string() {
        let client = GenerationClient::new(
            MockTransport::new().respond(200, r#""Hello""#),
            "https://toolkit.example.com",
        );
        let text = client
            .generate_text(vec![Message::user("Say hello")])
            .await
            .unwrap();
        assert_eq!(text, "Hello");
    }

    #[tokio::test]
    async fn test_text_without_text_field_is_malformed() {
        let client = GenerationClient::new(
            MockTransport::new().respond(200, r#"{"answer":"Hello"}"#),
            "https://toolkit.example.com",
        );
        let err = client.generate_text("Say hello").await.unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[test]
    fn test_text_extraction_order() {
        assert_eq!(
            extract_text(&json!({"text": "", "content": "fallback"})),
            Some("fallback".to_string())
        );
        assert_eq!(
            extract_text(&json!({"text": "first", "content": "second"})),
            Some("first".to_string())
        );
        assert_eq!(extract_text(&json!("  ")), None);
        assert_eq!(extract_text(&json!(42)), None);
    }
}
