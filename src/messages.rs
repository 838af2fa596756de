//! Messages pushed from the options page to every running content script

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::settings::{DomainOverrides, PartialSettings};

/// Settings change notifications, tagged by `type` on the wire
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuntimeMessage {
    /// Fields to merge into the global settings
    SettingsUpdated { settings: PartialSettings },

    /// The complete replacement override map
    DomainOverridesUpdated { overrides: DomainOverrides },
}

/// Synchronous acknowledgment sent back to the options page
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub success: bool,
}

impl Ack {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

impl RuntimeMessage {
    pub fn decode(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to decode runtime message")
    }
}
