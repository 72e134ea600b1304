//! Outbound email relayed through the toolkit.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use validator::Validate;

use crate::models::SendEmailRequest;
use crate::transport::{HttpTransport, Transport};
use crate::{Config, Error, Result};

/// Path of the email relay endpoint.
pub const EMAIL_PATH: &str = "/email/send";

/// Acknowledgement of a relayed email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailReceipt {
    pub accepted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

/// Single-shot email relay client. Failures are returned, never retried.
pub struct EmailClient<T = HttpTransport> {
    transport: T,
    base_url: String,
}

impl EmailClient<HttpTransport> {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            HttpTransport::from_config(config)?,
            config.toolkit_url.clone(),
        ))
    }
}

impl<T: Transport> EmailClient<T> {
    pub fn new(transport: T, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn send(&self, request: &SendEmailRequest) -> Result<EmailReceipt> {
        request.validate()?;
        let has_body = [&request.html, &request.text]
            .into_iter()
            .flatten()
            .any(|body| !body.trim().is_empty());
        if !has_body {
            return Err(Error::Validation(
                "Email needs an html or text body".to_string(),
            ));
        }

        let url = format!("{}{}", self.base_url, EMAIL_PATH);
        let response = self
            .transport
            .post_json(&url, serde_json::to_vec(request)?)
            .await?;

        if !response.is_success() {
            warn!(status = response.status, "Email relay rejected message");
            return Err(Error::RemoteService {
                status: response.status,
                body: response.body,
            });
        }

        // The relay may answer with an empty body.
        let message_id = serde_json::from_str::<Value>(&response.body)
            .ok()
            .and_then(|v| {
                ["messageId", "id"]
                    .iter()
                    .find_map(|key| v.get(*key).and_then(Value::as_str).map(str::to_string))
            });

        info!(message_id = message_id.as_deref().unwrap_or("-"), "Email relayed");
        Ok(EmailReceipt {
            accepted: true,
            message_id,
        })
    }
}
