// src/handlers/stats.rs
use std::sync::Arc;
use actix_web::{ web, HttpRequest, HttpResponse };
use log::debug;
use serde::Serialize;

use crate::models::stats::{ CommunityStats, ServerStats };
use crate::storage::snapshot::SnapshotCell;
use crate::utils::{ check_rate_limit, client_ip, KeyedRateLimiter, RequestError };

/// Read side of the snapshot cells shared with the refresher.
#[derive(Clone)]
pub struct StatsState {
    pub community: Arc<SnapshotCell<CommunityStats>>,
    pub server: Arc<SnapshotCell<ServerStats>>,
    pub trust_forwarded_for: bool,
}

#[derive(Serialize)]
struct StatsResponse<'a> {
    community: &'a CommunityStats,
    server: &'a ServerStats,
}

fn admit(
    req: &HttpRequest,
    state: &StatsState,
    rate_limiter: &KeyedRateLimiter
) -> Result<(), RequestError> {
    let ip = client_ip(req, state.trust_forwarded_for)?;
    if let Err(e) = check_rate_limit(rate_limiter, &ip) {
        debug!("Rate limit exceeded for stats for ip: {}", ip);
        return Err(e);
    }
    Ok(())
}

fn community_snapshot(state: &StatsState) -> Result<Arc<CommunityStats>, RequestError> {
    state.community.current().ok_or(RequestError::SnapshotUnavailable("Community"))
}

fn server_snapshot(state: &StatsState) -> Result<Arc<ServerStats>, RequestError> {
    state.server.current().ok_or(RequestError::SnapshotUnavailable("Server"))
}

pub async fn get_stats(
    req: HttpRequest,
    state: web::Data<StatsState>,
    rate_limiter: web::Data<KeyedRateLimiter>
) -> Result<HttpResponse, RequestError> {
    admit(&req, &state, &rate_limiter)?;
    let community = community_snapshot(&state)?;
    let server = server_snapshot(&state)?;

    Ok(HttpResponse::Ok().json(StatsResponse {
        community: &community,
        server: &server,
    }))
}

pub async fn get_community_stats(
    req: HttpRequest,
    state: web::Data<StatsState>,
    rate_limiter: web::Data<KeyedRateLimiter>
) -> Result<HttpResponse, RequestError> {
    admit(&req, &state, &rate_limiter)?;
    Ok(HttpResponse::Ok().json(&*community_snapshot(&state)?))
}

pub async fn get_server_stats(
    req: HttpRequest,
    state: web::Data<StatsState>,
    rate_limiter: web::Data<KeyedRateLimiter>
) -> Result<HttpResponse, RequestError> {
    admit(&req, &state, &rate_limiter)?;
    Ok(HttpResponse::Ok().json(&*server_snapshot(&state)?))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/stats", web::get().to(get_stats))
        .route("/stats/community", web::get().to(get_community_stats))
        .route("/stats/server", web::get().to(get_server_stats));
}
