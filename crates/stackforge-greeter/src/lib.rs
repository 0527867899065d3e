//! Example greeter function.
//!
//! Demonstrates the runtime adapter's calling convention: the binary in
//! `main.rs` hands raw invocation payloads to `parse_event`, and a decoded
//! event produces a greeting. Payloads of any other shape are a typed
//! error with no result.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The event shape the greeter accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GreeterEvent {
    /// Who to greet.
    #[serde(alias = "Name")]
    pub name: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GreeterError {
    #[error("event is not a greeter event: {0}")]
    MalformedEvent(String),
}

/// Decode a raw invocation payload into the expected event shape.
pub fn parse_event(payload: Value) -> Result<GreeterEvent, GreeterError> {
    serde_json::from_value(payload).map_err(|error| GreeterError::MalformedEvent(error.to_string()))
}

/// The greeting logged for a well-formed event.
pub fn greeting(event: &GreeterEvent) -> String {
    format!("Hello, {}!", event.name)
}
