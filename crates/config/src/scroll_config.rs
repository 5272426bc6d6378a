//! Scroll synchronization configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};

/// Scroll synchronization settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScrollConfig {
    /// How long a verse stays highlighted after a jump, in milliseconds
    pub highlight_ms: u64,

    /// Estimated content height used before any verse position is known
    pub content_height_estimate: f64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            highlight_ms: 2_000,
            content_height_estimate: 10_000.0,
        }
    }
}

impl ConfigSection for ScrollConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::collect_errors(vec![
            Validator::in_range(self.highlight_ms, 100, 60_000, "scroll.highlight_ms"),
            Validator::in_range(
                self.content_height_estimate,
                1.0,
                10_000_000.0,
                "scroll.content_height_estimate",
            ),
        ])
    }

    fn merge(&mut self, other: Self) {
        self.highlight_ms = other.highlight_ms;
        self.content_height_estimate = other.content_height_estimate;
    }

    fn section_name(&self) -> &'static str {
        "scroll"
    }
}
