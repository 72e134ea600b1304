//! Lawn-care use cases backed by the generation service.
//!
//! Each feature pairs a hand-authored [`SchemaNode`] with a prompt and
//! decodes the service's answer into a typed result.

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::client::{GenerationClient, RequestOptions};
use crate::messages::{ContentPart, Message};
use crate::models::{
    AnalyzeLawnRequest, AskRequest, IdentifyPlantRequest, SeasonalTasksRequest,
    WateringScheduleRequest,
};
use crate::schema::SchemaNode;
use crate::transport::{HttpTransport, Transport};
use crate::Result;

/// Implements `as_str` and `ALL` for a fieldless wire enum.
macro_rules! wire_enum {
    ($name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }

            fn schema() -> SchemaNode {
                SchemaNode::enumeration(Self::ALL.iter().map(|v| v.as_str()))
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

wire_enum!(RiskLevel { Low => "low", Medium => "medium", High => "high" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

wire_enum!(Season { Spring => "spring", Summer => "summer", Fall => "fall", Winter => "winter" });

impl Season {
    /// Northern-hemisphere season for a calendar month (1-12).
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Fall,
            _ => Season::Winter,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskCategory {
    Mowing,
    Watering,
    Fertilizing,
    WeedControl,
    Aeration,
    Seeding,
    PestControl,
    General,
}

wire_enum!(TaskCategory {
    Mowing => "mowing",
    Watering => "watering",
    Fertilizing => "fertilizing",
    WeedControl => "weed-control",
    Aeration => "aeration",
    Seeding => "seeding",
    PestControl => "pest-control",
    General => "general",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeOfDay {
    EarlyMorning,
    Morning,
    Evening,
}

wire_enum!(TimeOfDay { EarlyMorning => "early-morning", Morning => "morning", Evening => "evening" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

wire_enum!(Weekday {
    Monday => "monday",
    Tuesday => "tuesday",
    Wednesday => "wednesday",
    Thursday => "thursday",
    Friday => "friday",
    Saturday => "saturday",
    Sunday => "sunday",
});

/// One step of a treatment plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentStep {
    pub step: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing: Option<String>,
}

/// Diagnosis and treatment plan for a lawn photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LawnDiagnosis {
    pub diagnosis: String,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub symptoms: Vec<String>,
    pub causes: Vec<String>,
    pub treatments: Vec<TreatmentStep>,
    #[serde(default)]
    pub prevention: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_days: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantIdentification {
    pub common_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scientific_name: Option<String>,
    pub is_weed: bool,
    pub confidence: f64,
    pub description: String,
    pub control_methods: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonalTask {
    pub title: String,
    pub description: String,
    pub category: TaskCategory,
    pub priority: RiskLevel,
    pub due_in_days: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalPlan {
    pub season: Season,
    pub tasks: Vec<SeasonalTask>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WateringSchedule {
    pub sessions_per_week: f64,
    pub minutes_per_session: f64,
    pub best_time_of_day: TimeOfDay,
    pub days: Vec<Weekday>,
    #[serde(default)]
    pub notes: Vec<String>,
}

pub fn lawn_analysis_schema() -> SchemaNode {
    SchemaNode::object([
        (
            "diagnosis",
            SchemaNode::string().describe("Most likely problem, in a few words"),
        ),
        (
            "riskLevel",
            RiskLevel::schema().describe("How much damage the problem will do if untreated"),
        ),
        (
            "confidence",
            SchemaNode::number()
                .min(0.0)
                .max(100.0)
                .describe("Confidence in the diagnosis, 0-100"),
        ),
        (
            "symptoms",
            SchemaNode::array(SchemaNode::string()).describe("Visible symptoms in the photo"),
        ),
        (
            "causes",
            SchemaNode::array(SchemaNode::string()).describe("Likely causes"),
        ),
        (
            "treatments",
            SchemaNode::array(SchemaNode::object([
                ("step", SchemaNode::string().describe("What to do")),
                ("product", SchemaNode::string().optional().describe("Product type to use")),
                ("timing", SchemaNode::string().optional().describe("When to do it")),
            ]))
            .min(1.0)
            .describe("Ordered treatment plan"),
        ),
        (
            "prevention",
            SchemaNode::array(SchemaNode::string())
                .optional()
                .describe("How to keep it from coming back"),
        ),
        (
            "followUpDays",
            SchemaNode::number()
                .min(1.0)
                .max(90.0)
                .optional()
                .describe("Days until the lawn should be checked again"),
        ),
    ])
}

pub fn plant_identification_schema() -> SchemaNode {
    SchemaNode::object([
        ("commonName", SchemaNode::string()),
        ("scientificName", SchemaNode::string().optional()),
        (
            "isWeed",
            SchemaNode::boolean().describe("Whether the plant is unwanted in a lawn"),
        ),
        ("confidence", SchemaNode::number().min(0.0).max(100.0)),
        ("description", SchemaNode::string()),
        (
            "controlMethods",
            SchemaNode::array(SchemaNode::string())
                .describe("Removal or control methods, empty for desirable plants"),
        ),
    ])
}

pub fn seasonal_tasks_schema() -> SchemaNode {
    SchemaNode::object([
        ("season", Season::schema()),
        (
            "tasks",
            SchemaNode::array(SchemaNode::object([
                ("title", SchemaNode::string()),
                ("description", SchemaNode::string()),
                ("category", TaskCategory::schema()),
                ("priority", RiskLevel::schema()),
                (
                    "dueInDays",
                    SchemaNode::number()
                        .min(0.0)
                        .max(90.0)
                        .describe("Days from today the task should be done by"),
                ),
            ]))
            .min(1.0)
            .max(12.0),
        ),
    ])
}

pub fn watering_schedule_schema() -> SchemaNode {
    SchemaNode::object([
        ("sessionsPerWeek", SchemaNode::number().min(1.0).max(7.0)),
        ("minutesPerSession", SchemaNode::number().min(1.0).max(120.0)),
        ("bestTimeOfDay", TimeOfDay::schema()),
        (
            "days",
            SchemaNode::array(Weekday::schema())
                .min(1.0)
                .max(7.0)
                .describe("Days of the week to water"),
        ),
        ("notes", SchemaNode::array(SchemaNode::string()).optional()),
    ])
}

/// Prefix bare base64 photos with a JPEG data URI header.
fn image_data(image: &str) -> String {
    let image = image.trim();
    if image.starts_with("data:") {
        image.to_string()
    } else {
        format!("data:image/jpeg;base64,{}", image)
    }
}

fn or_unknown(value: &Option<String>) -> &str {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("unknown")
}

/// Lawn-care features on top of a [`GenerationClient`].
pub struct LawnAssistant<T = HttpTransport> {
    client: GenerationClient<T>,
}

impl<T: Transport> LawnAssistant<T> {
    pub fn new(client: GenerationClient<T>) -> Self {
        Self { client }
    }

    /// Diagnose a lawn problem from a photo.
    pub async fn analyze_lawn(&self, request: &AnalyzeLawnRequest) -> Result<LawnDiagnosis> {
        request.validate()?;
        info!(
            grass_type = or_unknown(&request.grass_type),
            location = or_unknown(&request.location),
            "Analyzing lawn photo"
        );

        let prompt = format!(
            "You are an expert lawn-care agronomist. Examine the photo of this lawn and \
             diagnose the most likely problem. Grass type: {}. Location: {}. \
             Give a confidence from 0 to 100, list the visible symptoms and likely causes, \
             and an ordered treatment plan a homeowner can follow.",
            or_unknown(&request.grass_type),
            or_unknown(&request.location),
        );
        let messages = [Message::user_parts(vec![
            ContentPart::Text { text: prompt },
            ContentPart::Image {
                image: image_data(&request.image),
            },
        ])];

        self.client
            .generate(&messages, &lawn_analysis_schema(), RequestOptions::default())
            .await
    }

    /// Identify a plant or weed from a photo.
    pub async fn identify_plant(
        &self,
        request: &IdentifyPlantRequest,
    ) -> Result<PlantIdentification> {
        request.validate()?;
        info!(location = or_unknown(&request.location), "Identifying plant");

        let prompt = format!(
            "Identify the plant in this photo taken in a residential lawn. Location: {}. \
             Say whether it is a weed, and if so how to control it.",
            or_unknown(&request.location),
        );
        let messages = [Message::user_parts(vec![
            ContentPart::Text { text: prompt },
            ContentPart::Image {
                image: image_data(&request.image),
            },
        ])];

        self.client
            .generate(&messages, &plant_identification_schema(), RequestOptions::default())
            .await
    }

    /// Build a task list for the season of the requested (or current) month.
    pub async fn seasonal_tasks(&self, request: &SeasonalTasksRequest) -> Result<SeasonalPlan> {
        request.validate()?;
        let month = request.month.unwrap_or_else(|| Utc::now().month());
        let season = Season::from_month(month);
        info!(month, season = season.as_str(), "Planning seasonal tasks");

        let prompt = format!(
            "Create a lawn-care task list for {} (month {}). Grass type: {}. Location: {}. \
             Order tasks by priority and give each a due date in days from today.",
            season.as_str(),
            month,
            or_unknown(&request.grass_type),
            or_unknown(&request.location),
        );

        self.client
            .generate(
                &[Message::user(prompt)],
                &seasonal_tasks_schema(),
                RequestOptions::default(),
            )
            .await
    }

    /// Recommend a weekly watering schedule.
    pub async fn watering_schedule(
        &self,
        request: &WateringScheduleRequest,
    ) -> Result<WateringSchedule> {
        request.validate()?;
        info!(grass_type = or_unknown(&request.grass_type), "Planning watering schedule");

        let prompt = format!(
            "Recommend a weekly lawn watering schedule. Grass type: {}. Location: {}. \
             Climate: {}. Prefer deep, infrequent watering.",
            or_unknown(&request.grass_type),
            or_unknown(&request.location),
            or_unknown(&request.climate),
        );

        self.client
            .generate(
                &[Message::user(prompt)],
                &watering_schedule_schema(),
                RequestOptions::default(),
            )
            .await
    }

    /// Answer a free-form lawn-care question.
    pub async fn ask(&self, request: &AskRequest) -> Result<String> {
        request.validate()?;
        let messages = vec![
            Message::assistant(
                "I'm your lawn-care assistant. Ask me anything about grass, weeds, \
                 watering or treatments.",
            ),
            Message::user(request.question.trim()),
        ];
        self.client.generate_text(messages).await
    }
}
