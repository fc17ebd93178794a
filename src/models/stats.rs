// src/models/stats.rs
use std::time::Duration;
use chrono::{ DateTime, Utc };
use serde::{ Deserialize, Serialize };

pub const DEFAULT_TIMEOUT_MS: u64 = 8000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommunitySource {
    Provider,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerSource {
    ProviderA,
    ProviderB,
    Fallback,
}

/// Member count of the community invite at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityStats {
    pub member_count: u64,
    pub fetched_at: DateTime<Utc>,
    pub source: CommunitySource,
    pub error: Option<String>,
}

/// Minecraft server status at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStats {
    pub player_count: u64,
    pub online: bool,
    pub version: String,
    pub message_of_day: String,
    pub fetched_at: DateTime<Utc>,
    pub source: ServerSource,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionRequest {
    /// Invite code/URL or `host[:port]`.
    pub target: Option<String>,
    pub fallback_value: u64,
    /// Upper bound for jittered fallback values.
    pub fallback_max: Option<u64>,
    /// Bound for each individual provider call.
    pub timeout: Duration,
}

impl ResolutionRequest {
    pub fn new(target: Option<String>, fallback_value: u64) -> Self {
        Self {
            target,
            fallback_value,
            fallback_max: None,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_fallback_max(mut self, max: u64) -> Self {
        self.fallback_max = Some(max);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout = Duration::from_millis(timeout_ms);
        self
    }

    /// The target with surrounding whitespace removed, or `None` when nothing is left.
    pub fn trimmed_target(&self) -> Option<&str> {
        self.target
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// What the resolver substitutes when no provider yields usable data.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackPolicy {
    /// Fallback player counts move uniformly within `±jitter`.
    pub jitter: u64,
    /// Report the server as online when stats are unavailable.
    pub online_on_fallback: bool,
    pub default_version: String,
    pub default_motd: String,
    /// Used when the secondary provider omits the max player field.
    pub secondary_default_max_players: u64,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            jitter: 5,
            online_on_fallback: true,
            default_version: "1.21.x".to_string(),
            default_motd: "ZaosMS - Premium Minecraft Server".to_string(),
            secondary_default_max_players: 100,
        }
    }
}
