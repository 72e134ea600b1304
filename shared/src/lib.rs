//! Shared library for the lawn-care backend.
//!
//! The core is the schema-driven structured generation client: [`schema`]
//! turns a hand-authored [`SchemaNode`] into a JSON Schema document and
//! [`client`] asks the generation service for output of that shape. The
//! lawn-care features, the email relay and the backend client build on it.

pub mod backend;
pub mod client;
pub mod config;
pub mod email;
pub mod error;
pub mod http;
pub mod lawn;
pub mod messages;
pub mod models;
pub mod schema;
pub mod transport;

#[cfg(test)]
mod testing;

pub use backend::BackendClient;
pub use client::{GenerationClient, RequestOptions};
pub use config::Config;
pub use email::{EmailClient, EmailReceipt};
pub use error::{Error, Result};
pub use lawn::{LawnAssistant, LawnDiagnosis, PlantIdentification, SeasonalPlan, WateringSchedule};
pub use messages::{Content, ContentPart, Message, Prompt, Role};
pub use schema::{translate, JsonSchema, SchemaDefinitionError, SchemaNode};
pub use transport::{HttpTransport, Transport, TransportError, TransportResponse};
