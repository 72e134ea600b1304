//! Client for the app's own backend routes.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::email::EmailReceipt;
use crate::http::ApiResponse;
use crate::lawn::{LawnDiagnosis, PlantIdentification, SeasonalPlan, WateringSchedule};
use crate::models::{
    AnalyzeLawnRequest, AskRequest, AskResponse, IdentifyPlantRequest, SeasonalTasksRequest,
    SendEmailRequest, WateringScheduleRequest,
};
use crate::transport::{HttpTransport, Transport};
use crate::{Config, Error, Result};

/// Route paths served by the backend Lambdas.
pub mod routes {
    pub const ANALYZE_LAWN: &str = "/lawn/analyze";
    pub const IDENTIFY_PLANT: &str = "/lawn/identify-plant";
    pub const SEASONAL_TASKS: &str = "/lawn/seasonal-tasks";
    pub const WATERING_SCHEDULE: &str = "/lawn/watering-schedule";
    pub const ASK: &str = "/lawn/ask";
    pub const SEND_EMAIL: &str = "/email/send";
}

pub struct BackendClient<T = HttpTransport> {
    transport: T,
    base_url: String,
}

impl BackendClient<HttpTransport> {
    /// Fails with [`Error::Config`] when `RPC_BASE_URL` is not configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        let base_url = config.require_rpc_base_url()?.to_string();
        Ok(Self::new(HttpTransport::from_config(config)?, base_url))
    }
}

impl<T: Transport> BackendClient<T> {
    pub fn new(transport: T, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn analyze_lawn(&self, request: &AnalyzeLawnRequest) -> Result<LawnDiagnosis> {
        self.call(routes::ANALYZE_LAWN, request).await
    }

    pub async fn identify_plant(
        &self,
        request: &IdentifyPlantRequest,
    ) -> Result<PlantIdentification> {
        self.call(routes::IDENTIFY_PLANT, request).await
    }

    pub async fn seasonal_tasks(&self, request: &SeasonalTasksRequest) -> Result<SeasonalPlan> {
        self.call(routes::SEASONAL_TASKS, request).await
    }

    pub async fn watering_schedule(
        &self,
        request: &WateringScheduleRequest,
    ) -> Result<WateringSchedule> {
        self.call(routes::WATERING_SCHEDULE, request).await
    }

    pub async fn ask(&self, request: &AskRequest) -> Result<String> {
        let response: AskResponse = self.call(routes::ASK, request).await?;
        Ok(response.answer)
    }

    pub async fn send_email(&self, request: &SendEmailRequest) -> Result<EmailReceipt> {
        self.call(routes::SEND_EMAIL, request).await
    }

    async fn call<B, R>(&self, route: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, route);
        let response = self
            .transport
            .post_json(&url, serde_json::to_vec(body)?)
            .await?;

        let envelope: Option<ApiResponse<R>> = serde_json::from_str(&response.body).ok();
        if !response.is_success() {
            warn!(route, status = response.status, "Backend call failed");
            let body = envelope
                .and_then(|e| e.error)
                .unwrap_or(response.body);
            return Err(Error::RemoteService {
                status: response.status,
                body,
            });
        }

        match envelope {
            Some(ApiResponse {
                success: true,
                data: Some(data),
                ..
            }) => Ok(data),
            Some(ApiResponse { error, .. }) => Err(Error::MalformedResponse(
                error.unwrap_or_else(|| format!("{} returned no data", route)),
            )),
            None => Err(Error::MalformedResponse(format!(
                "{} returned an unreadable body",
                route
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lawn::RiskLevel;
    use crate::testing::MockTransport;
    use std::collections::HashMap;

    #[test]
    fn test_requires_rpc_base_url() {
        let vars: HashMap<&str, &str> = HashMap::new();
        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert!(matches!(
            BackendClient::from_config(&config),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_unwraps_success_envelope() {
        let client = BackendClient::new(
            MockTransport::new().respond(
                200,
                r#"{"success":true,"data":{"diagnosis":"Grub damage","riskLevel":"high","confidence":70,"symptoms":[],"causes":[],"treatments":[{"step":"Apply grub control"}]}}"#,
            ),
            "https://api.example.com/",
        );
        let diagnosis = client
            .analyze_lawn(&AnalyzeLawnRequest {
                image: "AAAA".to_string(),
                grass_type: None,
                location: Some("Austin, TX".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(diagnosis.risk_level, RiskLevel::High);

        let calls = client.transport.calls();
        assert_eq!(calls[0].url, "https://api.example.com/lawn/analyze");
        assert_eq!(calls[0].body["location"], "Austin, TX");
    }

    #[tokio::test]
    async fn test_error_envelope_message_is_kept() {
        let client = BackendClient::new(
            MockTransport::new().respond(504, r#"{"success":false,"error":"Request timed out"}"#),
            "https://api.example.com",
        );
        let err = client
            .ask(&AskRequest {
                question: "When should I overseed?".to_string(),
            })
            .await
            .unwrap_err();
        match err {
            Error::RemoteService { status, body } => {
                assert_eq!(status, 504);
                assert_eq!(body, "Request timed out");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_data_is_malformed() {
        let client = BackendClient::new(
            MockTransport::new().respond(200, r#"{"success":true}"#),
            "https://api.example.com",
        );
        let err = client
            .seasonal_tasks(&SeasonalTasksRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }
}
