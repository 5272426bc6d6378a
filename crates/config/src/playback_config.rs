//! Playback policy configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};

/// Narrator selection and playback policy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Narrator used when the caller does not pick one
    pub default_narrator: String,

    /// Consecutive failed verses after which chapter playback is aborted
    pub consecutive_failure_limit: usize,

    /// Time allowed for the audio backend to load a resolved URI, in milliseconds
    pub load_timeout_ms: u64,

    /// Play a narrator's whole-chapter file when one is published
    pub prefer_chapter_audio: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            default_narrator: "alafasy".to_string(),
            consecutive_failure_limit: 3,
            load_timeout_ms: 15_000,
            prefer_chapter_audio: false,
        }
    }
}

impl ConfigSection for PlaybackConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::collect_errors(vec![
            Validator::not_empty(&self.default_narrator, "playback.default_narrator"),
            Validator::in_range(
                self.consecutive_failure_limit,
                1,
                20,
                "playback.consecutive_failure_limit",
            ),
            Validator::in_range(self.load_timeout_ms, 1_000, 120_000, "playback.load_timeout_ms"),
        ])
    }

    fn merge(&mut self, other: Self) {
        self.default_narrator = other.default_narrator;
        self.consecutive_failure_limit = other.consecutive_failure_limit;
        self.load_timeout_ms = other.load_timeout_ms;
        self.prefer_chapter_audio = other.prefer_chapter_audio;
    }

    fn section_name(&self) -> &'static str {
        "playback"
    }
}
