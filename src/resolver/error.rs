// src/resolver/error.rs
use std::fmt;
use std::time::Duration;

/// Why a single provider attempt produced nothing usable. These never reach
/// the caller of the resolver; they end up as the snapshot's `error` text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    Endpoint(String),
    Network(String),
    Timeout(Duration),
    HttpStatus(u16),
    Schema(String),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Endpoint(msg) => write!(f, "Invalid provider endpoint: {}", msg),
            Self::Network(msg) => write!(f, "Network failure: {}", msg),
            Self::Timeout(after) => write!(f, "Timed out after {} ms", after.as_millis()),
            Self::HttpStatus(status) => write!(f, "Provider returned HTTP {}", status),
            Self::Schema(msg) => write!(f, "Unexpected response: {}", msg),
        }
    }
}

impl std::error::Error for ResolveError {}

impl From<reqwest::Error> for ResolveError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Schema(e.to_string())
        } else if let Some(status) = e.status() {
            Self::HttpStatus(status.as_u16())
        } else {
            Self::Network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_readable() {
        assert_eq!(
            ResolveError::Timeout(Duration::from_millis(8000)).to_string(),
            "Timed out after 8000 ms"
        );
        assert_eq!(ResolveError::HttpStatus(404).to_string(), "Provider returned HTTP 404");
        assert_eq!(
            ResolveError::Schema("missing `online`".to_string()).to_string(),
            "Unexpected response: missing `online`"
        );
    }
}
