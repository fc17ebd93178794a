// src/resolver/mod.rs
//! Best-effort resolution of community and server statistics.
//!
//! Every resolution returns a snapshot. Provider failures are logged and
//! folded into the snapshot's `error` field, never returned as `Err`.
pub mod error;

use std::time::Duration;
use chrono::Utc;
use log::{ debug, info, warn };
use rand::Rng;
use reqwest::Url;
use serde::de::DeserializeOwned;

use crate::config::{ DEFAULT_DISCORD_API_BASE, DEFAULT_PRIMARY_STATUS_BASE, DEFAULT_SECONDARY_STATUS_BASE };
use crate::models::providers::{ InviteResponse, PrimaryResponse, SecondaryResponse, ServerStatus };
use crate::models::stats::{
    CommunitySource,
    CommunityStats,
    FallbackPolicy,
    ResolutionRequest,
    ServerSource,
    ServerStats,
};
pub use error::ResolveError;

const INVITE_MARKERS: [&str; 3] = ["discord.gg/", "discord.com/invite/", "discordapp.com/invite/"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub discord_api_base: String,
    pub primary_status_base: String,
    pub secondary_status_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            discord_api_base: DEFAULT_DISCORD_API_BASE.to_string(),
            primary_status_base: DEFAULT_PRIMARY_STATUS_BASE.to_string(),
            secondary_status_base: DEFAULT_SECONDARY_STATUS_BASE.to_string(),
        }
    }
}

pub struct StatsResolver {
    client: reqwest::Client,
    endpoints: Endpoints,
    policy: FallbackPolicy,
}

impl StatsResolver {
    pub fn new(endpoints: Endpoints, policy: FallbackPolicy) -> Self {
        Self::with_client(reqwest::Client::new(), endpoints, policy)
    }

    pub fn with_client(client: reqwest::Client, endpoints: Endpoints, policy: FallbackPolicy) -> Self {
        Self { client, endpoints, policy }
    }

    pub fn policy(&self) -> &FallbackPolicy {
        &self.policy
    }

    pub async fn resolve_community_stats(&self, request: &ResolutionRequest) -> CommunityStats {
        let target = match request.trimmed_target() {
            Some(target) => target,
            None => {
                return community_fallback(request, None);
            }
        };

        let code = invite_code(target);
        if code.is_empty() {
            warn!("Community invite {:?} has no invite code", target);
            return community_fallback(request, Some(format!("No invite code in {:?}", target)));
        }

        match self.fetch_member_count(code, request.timeout).await {
            Ok(member_count) => {
                debug!("Invite {} reports {} members", code, member_count);
                CommunityStats {
                    member_count,
                    fetched_at: Utc::now(),
                    source: CommunitySource::Provider,
                    error: None,
                }
            }
            Err(e) => {
                warn!("Failed to fetch community stats for {}, using fallback: {}", code, e);
                community_fallback(request, Some(e.to_string()))
            }
        }
    }

    pub async fn resolve_server_stats(&self, request: &ResolutionRequest) -> ServerStats {
        let host = match request.trimmed_target().and_then(server_host) {
            Some(host) => host,
            None => {
                // Nothing configured: simulate around the fallback, capped at the max.
                return self.server_fallback(request, request.fallback_max, None);
            }
        };

        // Provider B only runs once provider A has fully settled.
        let primary_error = match self.fetch_primary(host, request.timeout).await {
            Ok(status) => {
                return self.server_stats(status, ServerSource::ProviderA);
            }
            Err(e) => {
                warn!("Primary status provider failed for {}: {}", host, e);
                e
            }
        };

        let secondary_error = match self.fetch_secondary(host, request.timeout).await {
            Ok(status) => {
                return self.server_stats(status, ServerSource::ProviderB);
            }
            Err(e) => {
                warn!("Secondary status provider failed for {}: {}", host, e);
                e
            }
        };

        let message = format!(
            "Both providers failed to return valid data (primary: {}; secondary: {})",
            primary_error,
            secondary_error
        );
        info!("Using fallback server stats for {}", host);
        // Failure fallback is only floored at zero.
        self.server_fallback(request, None, Some(message))
    }

    async fn fetch_member_count(&self, code: &str, timeout: Duration) -> Result<u64, ResolveError> {
        let url = endpoint_url(&self.endpoints.discord_api_base, &["invites", code])?;
        let request = self.client.get(url).query(&[("with_counts", "true")]);
        let invite: InviteResponse = self.get_json(request, timeout).await?;
        invite.approximate_member_count.ok_or_else(|| {
            ResolveError::Schema("missing `approximate_member_count`".to_string())
        })
    }

    async fn fetch_primary(&self, host: &str, timeout: Duration) -> Result<ServerStatus, ResolveError> {
        let url = endpoint_url(&self.endpoints.primary_status_base, &["2", host])?;
        debug!("Trying primary status provider: {}", url);
        let response: PrimaryResponse = self.get_json(self.client.get(url), timeout).await?;
        response
            .normalize(&self.policy)
            .ok_or_else(|| ResolveError::Schema("missing boolean `online`".to_string()))
    }

    async fn fetch_secondary(&self, host: &str, timeout: Duration) -> Result<ServerStatus, ResolveError> {
        let url = endpoint_url(&self.endpoints.secondary_status_base, &["server", "status"])?;
        debug!("Trying secondary status provider: {}", url);
        let request = self.client.get(url).query(&[("ip", host)]);
        let response: SecondaryResponse = self.get_json(request, timeout).await?;
        response
            .normalize(&self.policy)
            .ok_or_else(|| ResolveError::Schema("missing boolean `online`".to_string()))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        timeout: Duration
    ) -> Result<T, ResolveError> {
        let request = request.header(reqwest::header::ACCEPT, "application/json");
        let call = async {
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(ResolveError::HttpStatus(status.as_u16()));
            }
            let bytes = response.bytes().await?;
            serde_json::from_slice::<T>(&bytes).map_err(|e| ResolveError::Schema(e.to_string()))
        };

        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ResolveError::Timeout(timeout)),
        }
    }

    fn server_stats(&self, status: ServerStatus, source: ServerSource) -> ServerStats {
        debug!(
            "Resolved server stats from {:?}: online={} players={}/{}",
            source,
            status.online,
            status.players_online,
            status.players_max
        );
        ServerStats {
            player_count: status.players_online,
            online: status.online,
            message_of_day: status.message_of_day(&self.policy),
            version: status.version,
            fetched_at: Utc::now(),
            source,
            error: None,
        }
    }

    fn server_fallback(
        &self,
        request: &ResolutionRequest,
        cap: Option<u64>,
        error: Option<String>
    ) -> ServerStats {
        let player_count = jittered(
            &mut rand::thread_rng(),
            request.fallback_value,
            self.policy.jitter,
            cap
        );
        ServerStats {
            player_count,
            online: self.policy.online_on_fallback,
            version: self.policy.default_version.clone(),
            message_of_day: self.policy.default_motd.clone(),
            fetched_at: Utc::now(),
            source: ServerSource::Fallback,
            error,
        }
    }
}

fn community_fallback(request: &ResolutionRequest, error: Option<String>) -> CommunityStats {
    CommunityStats {
        member_count: request.fallback_value,
        fetched_at: Utc::now(),
        source: CommunitySource::Fallback,
        error,
    }
}

fn endpoint_url(base: &str, segments: &[&str]) -> Result<Url, ResolveError> {
    let mut url = Url::parse(base).map_err(|e| ResolveError::Endpoint(format!("{}: {}", base, e)))?;
    url.path_segments_mut()
        .map_err(|_| ResolveError::Endpoint(format!("{} cannot take a path", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Invite code for a community target: the code segment of a full invite
/// URL, otherwise the target itself.
pub fn invite_code(target: &str) -> &str {
    for marker in INVITE_MARKERS {
        if let Some(idx) = target.find(marker) {
            let rest = &target[idx + marker.len()..];
            return rest.split(&['?', '#', '/'][..]).next().unwrap_or(rest);
        }
    }
    target
}

/// `host[:port]` of a server target with any http(s) scheme removed.
pub fn server_host(target: &str) -> Option<&str> {
    let target = target.trim();
    let host = target
        .strip_prefix("https://")
        .or_else(|| target.strip_prefix("http://"))
        .unwrap_or(target)
        .trim()
        .trim_end_matches('/');
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

/// `value` moved by a uniform offset in `[-jitter, jitter]`, clamped to `[0, max]`.
pub fn jittered<R: Rng + ?Sized>(rng: &mut R, value: u64, jitter: u64, max: Option<u64>) -> u64 {
    let jitter = i128::from(jitter);
    let offset = if jitter == 0 { 0 } else { rng.gen_range(-jitter..=jitter) };
    let moved = (i128::from(value) + offset).clamp(0, i128::from(u64::MAX)) as u64;
    match max {
        Some(max) => moved.min(max),
        None => moved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn invite_code_from_url_or_verbatim() {
        assert_eq!(invite_code("https://discord.gg/HskUVye3mr"), "HskUVye3mr");
        assert_eq!(invite_code("discord.gg/HskUVye3mr?event=1"), "HskUVye3mr");
        assert_eq!(invite_code("https://discord.com/invite/abc123/"), "abc123");
        assert_eq!(invite_code("abc123"), "abc123");
        assert_eq!(invite_code("https://discord.gg/"), "");
    }

    #[test]
    fn server_host_strips_scheme_and_whitespace() {
        assert_eq!(server_host("play.example.com"), Some("play.example.com"));
        assert_eq!(server_host(" https://play.example.com:25565 "), Some("play.example.com:25565"));
        assert_eq!(server_host("http://play.example.com/"), Some("play.example.com"));
        assert_eq!(server_host("https://"), None);
        assert_eq!(server_host("   "), None);
    }

    #[test]
    fn jitter_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let value = jittered(&mut rng, 139, 5, Some(260));
            assert!((134..=144).contains(&value), "{} out of range", value);
        }
        for _ in 0..500 {
            assert!(jittered(&mut rng, 2, 5, None) <= 7);
            assert!(jittered(&mut rng, 258, 5, Some(260)) <= 260);
        }
        assert_eq!(jittered(&mut rng, 42, 0, None), 42);
        assert_eq!(jittered(&mut rng, 0, 0, Some(0)), 0);
    }

    #[test]
    fn endpoint_url_appends_encoded_segments() {
        let url = endpoint_url("https://api.mcsrvstat.us", &["2", "play.example.com:25565"]).unwrap();
        assert_eq!(url.as_str(), "https://api.mcsrvstat.us/2/play.example.com:25565");

        let url = endpoint_url("https://discord.com/api/v10/", &["invites", "a b"]).unwrap();
        assert_eq!(url.as_str(), "https://discord.com/api/v10/invites/a%20b");

        assert!(matches!(endpoint_url("not a url", &["x"]), Err(ResolveError::Endpoint(_))));
    }

    #[tokio::test]
    async fn unset_targets_resolve_to_fallback() {
        let resolver = StatsResolver::new(Endpoints::default(), FallbackPolicy::default());

        let community = resolver
            .resolve_community_stats(&ResolutionRequest::new(None, 5000)).await;
        assert_eq!(community.member_count, 5000);
        assert_eq!(community.source, CommunitySource::Fallback);
        assert_eq!(community.error, None);

        let request = ResolutionRequest::new(Some("https://".to_string()), 139).with_fallback_max(260);
        let server = resolver.resolve_server_stats(&request).await;
        assert_eq!(server.source, ServerSource::Fallback);
        assert!(server.online);
        assert!((134..=144).contains(&server.player_count));
        assert_eq!(server.version, "1.21.x");
        assert_eq!(server.error, None);
    }
}
