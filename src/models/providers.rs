// src/models/providers.rs
//
// Response shapes of the remote status providers. Every field is optional and
// a field of the wrong type reads as absent, so one odd value never discards
// the payload; validation happens when converting into `ServerStatus`.
use serde::de::DeserializeOwned;
use serde::{ Deserialize, Deserializer };
use serde_json::Value;

use super::stats::FallbackPolicy;

/// `None` for a missing, null or mistyped field.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where D: Deserializer<'de>, T: DeserializeOwned
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

/// String entries of a list, skipping anything else.
fn lenient_lines<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where D: Deserializer<'de>
{
    let lines = match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(line) => Some(line),
                _ => None,
            })
            .collect(),
        Value::String(line) => vec![line],
        _ => Vec::new(),
    };
    Ok(lines)
}

#[derive(Debug, Clone, Deserialize)]
pub struct InviteResponse {
    #[serde(default, deserialize_with = "lenient")]
    pub approximate_member_count: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrimaryPlayers {
    #[serde(default, deserialize_with = "lenient")]
    pub online: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub max: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PrimaryVersion {
    Plain(String),
    Named { name: Option<String> },
}

impl PrimaryVersion {
    fn name(self) -> Option<String> {
        match self {
            PrimaryVersion::Plain(name) => Some(name),
            PrimaryVersion::Named { name } => name,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrimaryMotd {
    #[serde(default, deserialize_with = "lenient_lines")]
    pub clean: Vec<String>,
}

/// `GET /2/{host}` on the primary status mirror.
#[derive(Debug, Clone, Deserialize)]
pub struct PrimaryResponse {
    #[serde(default, deserialize_with = "lenient")]
    pub online: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub players: Option<PrimaryPlayers>,
    #[serde(default, deserialize_with = "lenient")]
    pub version: Option<PrimaryVersion>,
    #[serde(default, deserialize_with = "lenient")]
    pub motd: Option<PrimaryMotd>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecondaryPlayers {
    #[serde(default, deserialize_with = "lenient")]
    pub now: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub max: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecondaryServer {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
}

/// `GET /server/status?ip={host}` on the secondary status mirror.
#[derive(Debug, Clone, Deserialize)]
pub struct SecondaryResponse {
    #[serde(default, deserialize_with = "lenient")]
    pub online: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub players: Option<SecondaryPlayers>,
    #[serde(default, deserialize_with = "lenient")]
    pub server: Option<SecondaryServer>,
    #[serde(default, deserialize_with = "lenient")]
    pub motd: Option<String>,
}

/// Provider-independent server status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerStatus {
    pub online: bool,
    pub players_online: u64,
    pub players_max: u64,
    pub version: String,
    pub motd_lines: Vec<String>,
}

impl ServerStatus {
    pub fn message_of_day(&self, policy: &FallbackPolicy) -> String {
        let joined = self.motd_lines.join(" ");
        if joined.trim().is_empty() {
            policy.default_motd.clone()
        } else {
            joined
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl PrimaryResponse {
    /// `None` when the payload lacks the boolean `online` field.
    pub fn normalize(self, policy: &FallbackPolicy) -> Option<ServerStatus> {
        let online = self.online?;
        let players = self.players.unwrap_or_default();
        Some(ServerStatus {
            online,
            players_online: players.online.unwrap_or(0),
            players_max: players.max.unwrap_or(0),
            version: non_empty(self.version.and_then(PrimaryVersion::name))
                .unwrap_or_else(|| policy.default_version.clone()),
            motd_lines: self.motd.unwrap_or_default().clean,
        })
    }
}

impl SecondaryResponse {
    /// `None` when the payload lacks the boolean `online` field.
    pub fn normalize(self, policy: &FallbackPolicy) -> Option<ServerStatus> {
        let online = self.online?;
        let players = self.players.unwrap_or_default();
        let motd_lines = match non_empty(self.motd) {
            Some(motd) => vec![motd],
            None => vec![policy.default_motd.clone()],
        };
        Some(ServerStatus {
            online,
            players_online: players.now.unwrap_or(0),
            players_max: players.max.unwrap_or(policy.secondary_default_max_players),
            version: non_empty(self.server.and_then(|s| s.name))
                .unwrap_or_else(|| policy.default_version.clone()),
            motd_lines,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_accepts_object_and_plain_version() {
        let policy = FallbackPolicy::default();
        let named: PrimaryResponse = serde_json::from_str(
            r#"{"online":false,"players":{"online":0,"max":50},"version":{"name":"1.20"},"motd":{"clean":["Down for maintenance"]}}"#
        ).unwrap();
        let status = named.normalize(&policy).unwrap();
        assert!(!status.online);
        assert_eq!(status.players_max, 50);
        assert_eq!(status.version, "1.20");
        assert_eq!(status.message_of_day(&policy), "Down for maintenance");

        let plain: PrimaryResponse = serde_json::from_str(
            r#"{"online":true,"players":{"online":7},"version":"Paper 1.21.1","motd":{"clean":["Line one","Line two"]}}"#
        ).unwrap();
        let status = plain.normalize(&policy).unwrap();
        assert_eq!(status.players_online, 7);
        assert_eq!(status.version, "Paper 1.21.1");
        assert_eq!(status.message_of_day(&policy), "Line one Line two");
    }

    #[test]
    fn primary_without_online_flag_is_rejected() {
        let policy = FallbackPolicy::default();
        let response: PrimaryResponse = serde_json::from_str(r#"{"players":{"online":3}}"#).unwrap();
        assert!(response.normalize(&policy).is_none());
    }

    #[test]
    fn secondary_fills_defaults() {
        let policy = FallbackPolicy::default();
        let response: SecondaryResponse = serde_json::from_str(r#"{"online":true,"motd":""}"#).unwrap();
        let status = response.normalize(&policy).unwrap();
        assert_eq!(status.players_online, 0);
        assert_eq!(status.players_max, 100);
        assert_eq!(status.version, "1.21.x");
        assert_eq!(status.message_of_day(&policy), policy.default_motd);
    }

    #[test]
    fn mistyped_fields_read_as_absent() {
        let policy = FallbackPolicy::default();
        let primary: PrimaryResponse = serde_json::from_str(
            r#"{"online":true,"players":{"online":12,"max":"?"},"version":42,"motd":{"clean":["Hi",7,"there"]}}"#
        ).unwrap();
        let status = primary.normalize(&policy).unwrap();
        assert_eq!(status.players_online, 12);
        assert_eq!(status.players_max, 0);
        assert_eq!(status.version, "1.21.x");
        assert_eq!(status.message_of_day(&policy), "Hi there");

        let secondary: SecondaryResponse = serde_json::from_str(
            r#"{"online":true,"players":"n/a","server":{"name":null},"motd":["not","a","string"]}"#
        ).unwrap();
        let status = secondary.normalize(&policy).unwrap();
        assert_eq!(status.players_online, 0);
        assert_eq!(status.players_max, 100);
        assert_eq!(status.version, "1.21.x");
        assert_eq!(status.message_of_day(&policy), policy.default_motd);
    }

    #[test]
    fn mistyped_online_flag_is_still_rejected() {
        let policy = FallbackPolicy::default();
        let response: SecondaryResponse = serde_json::from_str(r#"{"online":"yes"}"#).unwrap();
        assert!(response.normalize(&policy).is_none());
    }
}
