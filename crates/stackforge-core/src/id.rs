//! Logical resource identifiers.

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::error::{SynthError, SynthResult};

/// A logical identifier for a declared resource.
/// Alphanumeric, unique within its stack, and stable across syntheses.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[display("{_0}")]
pub struct LogicalId(String);

impl LogicalId {
    pub fn new(id: &str) -> SynthResult<Self> {
        if id.is_empty() || id.len() > 255 || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SynthError::InvalidLogicalId(id.to_string()));
        }
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
