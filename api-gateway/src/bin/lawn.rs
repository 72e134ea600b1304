//! Lawn Lambda - Serves the AI-backed lawn-care routes.
//!
//! Endpoints:
//! - POST /lawn/analyze - Diagnose a lawn photo
//! - POST /lawn/identify-plant - Identify a plant or weed from a photo
//! - POST /lawn/seasonal-tasks - Task list for the current season
//! - POST /lawn/watering-schedule - Weekly watering recommendation
//! - POST /lawn/ask - Free-form lawn question

use std::sync::Arc;

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use serde::Serialize;
use shared::backend::routes;
use shared::http::{error_response, failure_response, json_response, ApiResponse};
use shared::models::{
    AnalyzeLawnRequest, AskRequest, AskResponse, IdentifyPlantRequest, SeasonalTasksRequest,
    WateringScheduleRequest,
};
use shared::{parse_body, Config, GenerationClient, HttpTransport, LawnAssistant, Transport};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Application state
struct AppState<T = HttpTransport> {
    assistant: LawnAssistant<T>,
}

impl AppState {
    fn new() -> Result<Self, Error> {
        let config = Config::from_env()?;
        let client = GenerationClient::from_config(&config)?;
        info!(
            toolkit_url = %config.toolkit_url,
            timeout_secs = config.request_timeout.as_secs(),
            "Lawn Lambda configured"
        );

        Ok(Self {
            assistant: LawnAssistant::new(client),
        })
    }
}

fn respond<T: Serialize>(result: shared::Result<T>) -> Result<Response<Body>, Error> {
    match result {
        Ok(data) => json_response(200, &ApiResponse::success(data)),
        Err(e) => {
            error!(error = %e, status = e.status_code(), "Lawn request failed");
            failure_response(&e)
        }
    }
}

async fn handler<T: Transport>(state: Arc<AppState<T>>, event: Request) -> Result<Response<Body>, Error> {
    let method = event.method().as_str();
    let path = event.uri().path();

    info!("Lawn request: {} {}", method, path);

    match (method, path) {
        ("POST", routes::ANALYZE_LAWN) => {
            let request: AnalyzeLawnRequest = parse_body!(event.body());
            respond(state.assistant.analyze_lawn(&request).await)
        }

        ("POST", routes::IDENTIFY_PLANT) => {
            let request: IdentifyPlantRequest = parse_body!(event.body());
            respond(state.assistant.identify_plant(&request).await)
        }

        ("POST", routes::SEASONAL_TASKS) => {
            let request: SeasonalTasksRequest = parse_body!(event.body());
            respond(state.assistant.seasonal_tasks(&request).await)
        }

        ("POST", routes::WATERING_SCHEDULE) => {
            let request: WateringScheduleRequest = parse_body!(event.body());
            respond(state.assistant.watering_schedule(&request).await)
        }

        ("POST", routes::ASK) => {
            let request: AskRequest = parse_body!(event.body());
            respond(
                state
                    .assistant
                    .ask(&request)
                    .await
                    .map(|answer| AskResponse { answer }),
            )
        }

        _ => error_response(404, "Not found"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new()?);

    run(service_fn(move |event| {
        let state = state.clone();
        async move { handler(state, event).await }
    }))
    .await
}
