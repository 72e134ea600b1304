//! Request payloads accepted by the backend routes.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Lawn photo analysis request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeLawnRequest {
    /// Base64 photo or data URI
    #[validate(length(min = 1, message = "image is required"))]
    pub image: String,
    #[validate(length(max = 80))]
    pub grass_type: Option<String>,
    #[validate(length(max = 120))]
    pub location: Option<String>,
}

/// Weed or plant identification request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyPlantRequest {
    #[validate(length(min = 1, message = "image is required"))]
    pub image: String,
    #[validate(length(max = 120))]
    pub location: Option<String>,
}

/// Seasonal task plan request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SeasonalTasksRequest {
    #[validate(length(max = 80))]
    pub grass_type: Option<String>,
    #[validate(length(max = 120))]
    pub location: Option<String>,
    /// Calendar month 1-12; the current month when absent
    #[validate(range(min = 1, max = 12))]
    pub month: Option<u32>,
}

/// Watering schedule request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WateringScheduleRequest {
    #[validate(length(max = 80))]
    pub grass_type: Option<String>,
    #[validate(length(max = 120))]
    pub location: Option<String>,
    #[validate(length(max = 200))]
    pub climate: Option<String>,
}

/// Free-form lawn question.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AskRequest {
    #[validate(length(min = 1, max = 2000))]
    pub question: String,
}

/// Outbound email relayed through the toolkit.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailRequest {
    #[validate(email)]
    pub to: String,
    #[validate(length(min = 1, max = 200))]
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(email)]
    pub reply_to: Option<String>,
}

/// Answer to a free-form question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
}
