//! Button settings and per-site overrides
//!
//! Field names follow the persisted records (camelCase), so a record written by
//! the options page deserializes directly. Missing fields fall back to the
//! defaults below; out-of-range numbers are clamped on load and on update.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use crate::constants::remote;

pub const OFFSET_RANGE: RangeInclusive<i32> = -50..=100;
pub const BUTTON_SIZE_RANGE: RangeInclusive<u32> = 24..=48;
pub const HIDE_DELAY_RANGE: RangeInclusive<u64> = 0..=1000;

pub const DEFAULT_REWORD_PROMPT: &str = "Rephrase the provided text into a formal comment suitable for Jira. Return only the rephrased comment without any additional text, explanations, or introductions. Ensure the tone is professional, clear, and concise, avoiding colloquial language or contractions.";

/// Where the button sits relative to its anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ButtonPosition {
    #[default]
    BottomRight,
    Right,
    Left,
    Top,
    Bottom,
}

/// Process-wide settings (the `rewordSettings` record)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub show_on_hover: bool,
    #[serde(default = "default_auto_hide")]
    pub auto_hide: bool,
    /// Wait before the blur check runs (ms)
    #[serde(default = "default_hide_delay")]
    pub hide_delay: u64,
    #[serde(default)]
    pub button_position: ButtonPosition,
    #[serde(default = "default_offset_x")]
    pub offset_x: i32,
    #[serde(default = "default_offset_y")]
    pub offset_y: i32,
    #[serde(default = "default_button_size")]
    pub button_size: u32,
    #[serde(rename = "openRouterApiKey", default)]
    pub api_key: String,
    #[serde(default = "default_reword_prompt")]
    pub reword_prompt: String,
    #[serde(default = "default_model")]
    pub model: String,
}

/// Global settings with the matching site override applied.
/// Recomputed at every decision point, never cached.
pub type EffectiveSettings = GlobalSettings;

// Default value functions
fn default_enabled() -> bool {
    true
}

fn default_auto_hide() -> bool {
    true
}

fn default_hide_delay() -> u64 {
    150
}

fn default_offset_x() -> i32 {
    16
}

fn default_offset_y() -> i32 {
    4
}

fn default_button_size() -> u32 {
    32
}

fn default_reword_prompt() -> String {
    DEFAULT_REWORD_PROMPT.to_string()
}

fn default_model() -> String {
    remote::DEFAULT_MODEL.to_string()
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            show_on_hover: false,
            auto_hide: default_auto_hide(),
            hide_delay: default_hide_delay(),
            button_position: ButtonPosition::default(),
            offset_x: default_offset_x(),
            offset_y: default_offset_y(),
            button_size: default_button_size(),
            api_key: String::new(),
            reword_prompt: default_reword_prompt(),
            model: default_model(),
        }
    }
}

impl GlobalSettings {
    /// Clamp numeric fields into their allowed ranges
    pub fn clamped(mut self) -> Self {
        self.offset_x = self.offset_x.clamp(*OFFSET_RANGE.start(), *OFFSET_RANGE.end());
        self.offset_y = self.offset_y.clamp(*OFFSET_RANGE.start(), *OFFSET_RANGE.end());
        self.button_size = self
            .button_size
            .clamp(*BUTTON_SIZE_RANGE.start(), *BUTTON_SIZE_RANGE.end());
        self.hide_delay = self
            .hide_delay
            .clamp(*HIDE_DELAY_RANGE.start(), *HIDE_DELAY_RANGE.end());
        self
    }
}

/// Any subset of settings: a site override, or a pushed settings update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_on_hover: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_hide: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hide_delay: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button_position: Option<ButtonPosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset_x: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset_y: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button_size: Option<u32>,
    #[serde(rename = "openRouterApiKey", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reword_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Per-site override, keyed by `hostname` or `hostname/pathFragment`
pub type DomainOverride = PartialSettings;

/// Override map in persisted (iteration) order
pub type DomainOverrides = IndexMap<String, DomainOverride>;

impl PartialSettings {
    /// Shallow merge: every field present here replaces the base value
    pub fn merged_over(&self, base: &GlobalSettings) -> GlobalSettings {
        let mut merged = base.clone();
        if let Some(v) = self.enabled {
            merged.enabled = v;
        }
        if let Some(v) = self.show_on_hover {
            merged.show_on_hover = v;
        }
        if let Some(v) = self.auto_hide {
            merged.auto_hide = v;
        }
        if let Some(v) = self.hide_delay {
            merged.hide_delay = v;
        }
        if let Some(v) = self.button_position {
            merged.button_position = v;
        }
        if let Some(v) = self.offset_x {
            merged.offset_x = v;
        }
        if let Some(v) = self.offset_y {
            merged.offset_y = v;
        }
        if let Some(v) = self.button_size {
            merged.button_size = v;
        }
        if let Some(v) = &self.api_key {
            merged.api_key = v.clone();
        }
        if let Some(v) = &self.reword_prompt {
            merged.reword_prompt = v.clone();
        }
        if let Some(v) = &self.model {
            merged.model = v.clone();
        }
        merged.clamped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let settings = GlobalSettings::default();
        assert!(settings.enabled);
        assert!(!settings.show_on_hover);
        assert!(settings.auto_hide);
        assert_eq!(settings.hide_delay, 150);
        assert_eq!(settings.offset_x, 16);
        assert_eq!(settings.offset_y, 4);
        assert_eq!(settings.button_size, 32);
        assert_eq!(settings.button_position, ButtonPosition::BottomRight);
        assert!(settings.api_key.is_empty());
        assert_eq!(settings.model, remote::DEFAULT_MODEL);
    }

    #[test]
    fn test_deserialize_partial_record_fills_defaults() {
        let json = r#"{"buttonSize": 40, "openRouterApiKey": "sk-test", "buttonPosition": "left"}"#;
        let settings: GlobalSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.button_size, 40);
        assert_eq!(settings.api_key, "sk-test");
        assert_eq!(settings.button_position, ButtonPosition::Left);
        assert_eq!(settings.offset_x, 16);
        assert_eq!(settings.reword_prompt, DEFAULT_REWORD_PROMPT);
    }

    #[test]
    fn test_clamped_enforces_ranges() {
        let settings = GlobalSettings {
            offset_x: -500,
            offset_y: 500,
            button_size: 8,
            hide_delay: 60_000,
            ..GlobalSettings::default()
        }
        .clamped();
        assert_eq!(settings.offset_x, -50);
        assert_eq!(settings.offset_y, 100);
        assert_eq!(settings.button_size, 24);
        assert_eq!(settings.hide_delay, 1000);
    }

    #[test]
    fn test_partial_merge_only_touches_present_fields() {
        let base = GlobalSettings::default();
        let patch = PartialSettings {
            button_size: Some(40),
            show_on_hover: Some(true),
            ..PartialSettings::default()
        };
        let merged = patch.merged_over(&base);
        assert_eq!(merged.button_size, 40);
        assert!(merged.show_on_hover);
        assert_eq!(merged.offset_x, base.offset_x);
        assert_eq!(merged.reword_prompt, base.reword_prompt);
    }

    #[test]
    fn test_partial_serializes_sparse() {
        let patch = PartialSettings {
            enabled: Some(false),
            ..PartialSettings::default()
        };
        assert_eq!(serde_json::to_string(&patch).unwrap(), r#"{"enabled":false}"#);
    }

    #[test]
    fn test_override_map_keeps_insertion_order() {
        let json = r#"{"z.example.com": {"buttonSize": 30}, "a.example.com": {"enabled": false}}"#;
        let overrides: DomainOverrides = serde_json::from_str(json).unwrap();
        let keys: Vec<_> = overrides.keys().cloned().collect();
        assert_eq!(keys, vec!["z.example.com", "a.example.com"]);
    }
}
