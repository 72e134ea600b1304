//! Response envelope and body parsing shared by the lawn and email Lambdas.

use lambda_http::{Body, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Envelope every route answers with: `data` on success, `error` otherwise.
#[derive(Debug, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Serialize `data` as the JSON body of a `status` response.
pub fn json_response<T: Serialize>(status: u16, data: &T) -> Result<Response<Body>, lambda_http::Error> {
    let response = Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(data)?))?;
    Ok(response)
}

/// Failure envelope carrying `message`.
pub fn error_response(status: u16, message: impl Into<String>) -> Result<Response<Body>, lambda_http::Error> {
    json_response(status, &ApiResponse::<()>::error(message))
}

/// Map a crate error to a JSON error response.
///
/// Upstream response bodies are kept out of the message sent to clients.
pub fn failure_response(err: &Error) -> Result<Response<Body>, lambda_http::Error> {
    let message = match err {
        Error::RemoteService { status, .. } => format!("Upstream service returned {}", status),
        other => other.to_string(),
    };
    error_response(err.status_code(), message)
}

/// Decode an inbound JSON body.
///
/// A body that does not decode into `T` yields the 400 reply to send back
/// in the inner `Err`; the outer error only covers building that reply.
pub fn parse_json_body<T: DeserializeOwned>(body: &Body) -> Result<Result<T, Response<Body>>, lambda_http::Error> {
    match serde_json::from_slice(body.as_ref()) {
        Ok(parsed) => Ok(Ok(parsed)),
        Err(e) => {
            let response = error_response(400, format!("Invalid request body: {}", e))?;
            Ok(Err(response))
        }
    }
}

/// Decode a handler's request body or return its 400 reply from the handler.
///
/// ```ignore
/// let request: AskRequest = parse_body!(event.body());
/// ```
#[macro_export]
macro_rules! parse_body {
    ($body:expr) => {
        match $crate::http::parse_json_body($body)? {
            Ok(parsed) => parsed,
            Err(response) => return Ok(response),
        }
    };
}
