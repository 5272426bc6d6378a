//! Audio source configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};

/// Bitrates published by the verse audio CDN
pub const SUPPORTED_BITRATES: [u32; 5] = [32, 48, 64, 128, 192];

/// Remote locations the resolver builds candidates from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourceConfig {
    /// Metadata API base, queried for a verse's canonical audio URL
    pub metadata_endpoint: String,

    /// Primary audio CDN base
    pub cdn_base: String,

    /// Legacy media CDN base
    pub legacy_cdn_base: String,

    /// Preferred audio bitrate in kbps
    pub bitrate: u32,

    /// Per-candidate timeout, in milliseconds
    pub attempt_timeout_ms: u64,

    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            metadata_endpoint: "https://api.alquran.cloud/v1".to_string(),
            cdn_base: "https://cdn.islamic.network/quran".to_string(),
            legacy_cdn_base: "https://cdn.alquran.cloud".to_string(),
            bitrate: 128,
            attempt_timeout_ms: 8_000,
            user_agent: format!("Tilawa/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ConfigSection for SourceConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::collect_errors(vec![
            Validator::is_http_url(&self.metadata_endpoint, "sources.metadata_endpoint"),
            Validator::is_http_url(&self.cdn_base, "sources.cdn_base"),
            Validator::is_http_url(&self.legacy_cdn_base, "sources.legacy_cdn_base"),
            Validator::one_of(&self.bitrate, &SUPPORTED_BITRATES, "sources.bitrate"),
            Validator::in_range(
                self.attempt_timeout_ms,
                500,
                60_000,
                "sources.attempt_timeout_ms",
            ),
            Validator::not_empty(&self.user_agent, "sources.user_agent"),
        ])
    }

    fn merge(&mut self, other: Self) {
        self.metadata_endpoint = other.metadata_endpoint;
        self.cdn_base = other.cdn_base;
        self.legacy_cdn_base = other.legacy_cdn_base;
        self.bitrate = other.bitrate;
        self.attempt_timeout_ms = other.attempt_timeout_ms;
        self.user_agent = other.user_agent;
    }

    fn section_name(&self) -> &'static str {
        "sources"
    }
}
