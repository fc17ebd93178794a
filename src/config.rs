use std::env;
use std::time::Duration;
use std::num::NonZeroU32;
use std::str::FromStr;
use governor::Quota;
use log::warn;

use crate::models::stats::{ FallbackPolicy, ResolutionRequest };
use crate::refresher::RefreshPolicy;
use crate::resolver::Endpoints;

pub const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";
pub const DEFAULT_PRIMARY_STATUS_BASE: &str = "https://api.mcsrvstat.us";
pub const DEFAULT_SECONDARY_STATUS_BASE: &str = "https://mcapi.us";

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: String,
    pub port: u16,

    // Targets. Unset means the resolver serves fallback values without touching the network.
    pub discord_invite: Option<String>,
    pub minecraft_server: Option<String>,

    // Fallback values
    pub fallback_member_count: u64,
    pub fallback_player_count: u64,
    pub fallback_max_players: u64,
    pub fallback_jitter: u64,
    pub fallback_online: bool,
    pub default_version: String,
    pub default_motd: String,

    // Provider calls
    pub provider_timeout_ms: u64,
    pub refresh_interval_secs: u64,
    pub discord_api_base: String,
    pub primary_status_base: String,
    pub secondary_status_base: String,

    // Rate limiting configs
    pub stats_period_secs: u64,
    pub stats_burst_limit: u32,
    pub trust_forwarded_for: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            discord_invite: None,
            minecraft_server: None,
            fallback_member_count: 5000,
            fallback_player_count: 139,
            fallback_max_players: 260,
            fallback_jitter: 5,
            fallback_online: true,
            default_version: "1.21.x".to_string(),
            default_motd: "ZaosMS - Premium Minecraft Server".to_string(),
            provider_timeout_ms: 8000,
            refresh_interval_secs: 0, // resolve once at startup
            discord_api_base: DEFAULT_DISCORD_API_BASE.to_string(),
            primary_status_base: DEFAULT_PRIMARY_STATUS_BASE.to_string(),
            secondary_status_base: DEFAULT_SECONDARY_STATUS_BASE.to_string(),
            stats_period_secs: 1,
            stats_burst_limit: 30,
            trust_forwarded_for: false,
        }
    }
}

fn parsed<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            port: parsed("PORT", defaults.port),

            discord_invite: optional("DISCORD_INVITE"),
            minecraft_server: optional("MINECRAFT_SERVER"),

            fallback_member_count: parsed("FALLBACK_MEMBER_COUNT", defaults.fallback_member_count),
            fallback_player_count: parsed("FALLBACK_PLAYER_COUNT", defaults.fallback_player_count),
            fallback_max_players: parsed("FALLBACK_MAX_PLAYERS", defaults.fallback_max_players),
            fallback_jitter: parsed("FALLBACK_JITTER", defaults.fallback_jitter),
            fallback_online: flag("FALLBACK_ONLINE", defaults.fallback_online),
            default_version: optional("DEFAULT_VERSION").unwrap_or(defaults.default_version),
            default_motd: optional("DEFAULT_MOTD").unwrap_or(defaults.default_motd),

            provider_timeout_ms: parsed("PROVIDER_TIMEOUT_MS", defaults.provider_timeout_ms),
            refresh_interval_secs: parsed("REFRESH_INTERVAL_SECS", defaults.refresh_interval_secs),
            discord_api_base: optional("DISCORD_API_BASE").unwrap_or(defaults.discord_api_base),
            primary_status_base: optional("PRIMARY_STATUS_BASE").unwrap_or(defaults.primary_status_base),
            secondary_status_base: optional("SECONDARY_STATUS_BASE").unwrap_or(
                defaults.secondary_status_base
            ),

            stats_period_secs: parsed("STATS_PERIOD_SECS", defaults.stats_period_secs),
            stats_burst_limit: parsed("STATS_BURST_LIMIT", defaults.stats_burst_limit),
            trust_forwarded_for: flag("TRUST_FORWARDED_FOR", defaults.trust_forwarded_for),
        }
    }

    pub fn bind(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn stats_quota(&self) -> Quota {
        let burst = NonZeroU32::new(self.stats_burst_limit).unwrap_or_else(|| {
            warn!("STATS_BURST_LIMIT must be non-zero, using 30");
            NonZeroU32::new(30).unwrap_or(NonZeroU32::MIN)
        });
        match Quota::with_period(Duration::from_secs(self.stats_period_secs)) {
            Some(quota) => quota.allow_burst(burst),
            None => {
                warn!("STATS_PERIOD_SECS must be non-zero, using 1 second");
                Quota::per_second(burst)
            }
        }
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            discord_api_base: self.discord_api_base.clone(),
            primary_status_base: self.primary_status_base.clone(),
            secondary_status_base: self.secondary_status_base.clone(),
        }
    }

    pub fn fallback_policy(&self) -> FallbackPolicy {
        FallbackPolicy {
            jitter: self.fallback_jitter,
            online_on_fallback: self.fallback_online,
            default_version: self.default_version.clone(),
            default_motd: self.default_motd.clone(),
            ..FallbackPolicy::default()
        }
    }

    pub fn community_request(&self) -> ResolutionRequest {
        ResolutionRequest::new(self.discord_invite.clone(), self.fallback_member_count)
            .with_timeout_ms(self.provider_timeout_ms)
    }

    pub fn server_request(&self) -> ResolutionRequest {
        ResolutionRequest::new(self.minecraft_server.clone(), self.fallback_player_count)
            .with_fallback_max(self.fallback_max_players)
            .with_timeout_ms(self.provider_timeout_ms)
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        RefreshPolicy::from_secs(self.refresh_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_site() {
        let config = Config::default();
        let server = config.server_request();
        assert_eq!(server.fallback_value, 139);
        assert_eq!(server.fallback_max, Some(260));
        assert_eq!(server.timeout, Duration::from_millis(8000));
        assert!(server.target.is_none());

        let community = config.community_request();
        assert_eq!(community.fallback_value, 5000);
        assert_eq!(community.fallback_max, None);
        assert_eq!(config.refresh_policy(), RefreshPolicy::Once);
    }

    #[test]
    fn zero_quota_settings_fall_back() {
        let config = Config {
            stats_period_secs: 0,
            stats_burst_limit: 0,
            ..Config::default()
        };
        let quota = config.stats_quota();
        assert_eq!(quota.burst_size().get(), 30);
    }
}
