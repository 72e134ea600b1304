//! In-memory transport for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::transport::{Transport, TransportError, TransportResponse};

/// A request captured by [`MockTransport`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub url: String,
    pub body: Value,
}

enum Reply {
    Respond(TransportResponse),
    Fail(TransportError),
    Stall(Duration),
}

/// Replays queued replies in order and records every call.
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, status: u16, body: &str) -> Self {
        self.push(Reply::Respond(TransportResponse {
            status,
            body: body.to_string(),
        }))
    }

    pub fn fail(self, err: TransportError) -> Self {
        self.push(Reply::Fail(err))
    }

    pub fn stall(self, delay: Duration) -> Self {
        self.push(Reply::Stall(delay))
    }

    fn push(self, reply: Reply) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post_json(
        &self,
        url: &str,
        body: Vec<u8>,
    ) -> Result<TransportResponse, TransportError> {
        self.calls.lock().unwrap().push(RecordedCall {
            url: url.to_string(),
            body: serde_json::from_slice(&body).unwrap_or(Value::Null),
        });

        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Fail(err)) => Err(err),
            Some(Reply::Stall(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(TransportResponse {
                    status: 200,
                    body: "{}".to_string(),
                })
            }
            None => Err(TransportError::Network("no reply queued".to_string())),
        }
    }
}
