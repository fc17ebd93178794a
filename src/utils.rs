// src/utils.rs
use actix_web::{ HttpRequest, HttpResponse, ResponseError };
use governor::{ RateLimiter, clock::DefaultClock };
use governor::state::keyed::DefaultKeyedStateStore;
use std::net::IpAddr;
use log::debug;
use std::fmt;

pub type KeyedRateLimiter = RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>;

#[derive(Debug)]
pub enum RequestError {
    MissingPeerIP,
    RateLimitExceeded,
    SnapshotUnavailable(&'static str),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPeerIP => write!(f, "Failed to extract client IP"),
            Self::RateLimitExceeded => write!(f, "Rate limit exceeded"),
            Self::SnapshotUnavailable(which) => write!(f, "{} stats are not available yet", which),
        }
    }
}

impl ResponseError for RequestError {
    fn error_response(&self) -> HttpResponse {
        match self {
            Self::RateLimitExceeded => HttpResponse::TooManyRequests().body(self.to_string()),
            Self::SnapshotUnavailable(_) => {
                HttpResponse::ServiceUnavailable().body(self.to_string())
            }
            Self::MissingPeerIP => HttpResponse::BadRequest().body(self.to_string()),
        }
    }
}

/// Client address used as the rate limiting key. Behind a reverse proxy the
/// first `X-Forwarded-For` entry is the client; otherwise the peer address is.
pub fn client_ip(req: &HttpRequest, trust_forwarded_for: bool) -> Result<IpAddr, RequestError> {
    if trust_forwarded_for {
        let forwarded = req
            .headers()
            .get("X-Forwarded-For")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .and_then(|first| first.trim().parse::<IpAddr>().ok());
        if let Some(ip) = forwarded {
            debug!("Using X-Forwarded-For client IP {}", ip);
            return Ok(ip);
        }
    }

    req.peer_addr()
        .map(|addr| addr.ip())
        .ok_or(RequestError::MissingPeerIP)
}

pub fn check_rate_limit(limiter: &KeyedRateLimiter, ip: &IpAddr) -> Result<(), RequestError> {
    limiter.check_key(ip).map_err(|_| RequestError::RateLimitExceeded)
}
