//! Email Lambda - Relays outbound email (treatment plans, support replies).
//!
//! Endpoints:
//! - POST /email/send - Send one email through the toolkit relay

use std::sync::Arc;

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use shared::backend::routes;
use shared::http::{error_response, failure_response, json_response, ApiResponse};
use shared::models::SendEmailRequest;
use shared::{parse_body, Config, EmailClient, HttpTransport, Transport};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Application state
struct AppState<T = HttpTransport> {
    email: EmailClient<T>,
}

impl AppState {
    fn new() -> Result<Self, Error> {
        let config = Config::from_env()?;
        Ok(Self {
            email: EmailClient::from_config(&config)?,
        })
    }
}

async fn handler<T: Transport>(state: Arc<AppState<T>>, event: Request) -> Result<Response<Body>, Error> {
    let method = event.method().as_str();
    let path = event.uri().path();

    info!("Email request: {} {}", method, path);

    match (method, path) {
        ("POST", routes::SEND_EMAIL) => {
            let request: SendEmailRequest = parse_body!(event.body());
            match state.email.send(&request).await {
                Ok(receipt) => json_response(200, &ApiResponse::success(receipt)),
                Err(e) => {
                    error!(error = %e, "Email relay failed");
                    failure_response(&e)
                }
            }
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
