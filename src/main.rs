// src/main.rs
use std::sync::Arc;

use actix_web::{ web, App, HttpServer };
use env_logger::Env;
use governor::RateLimiter;
use log::info;

use zaos_stats::config::Config;
use zaos_stats::handlers;
use zaos_stats::handlers::stats::StatsState;
use zaos_stats::refresher::StatsRefresher;
use zaos_stats::resolver::StatsResolver;
use zaos_stats::storage::snapshot::SnapshotCell;
use zaos_stats::utils::KeyedRateLimiter;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    // Initialize logger only once at the start
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = Config::from_env();
    info!(
        "Community target: {}, server target: {}",
        config.discord_invite.as_deref().unwrap_or("<fallback>"),
        config.minecraft_server.as_deref().unwrap_or("<fallback>")
    );

    let community = Arc::new(SnapshotCell::new());
    let server = Arc::new(SnapshotCell::new());

    let refresher = StatsRefresher::new(
        StatsResolver::new(config.endpoints(), config.fallback_policy()),
        config.community_request(),
        config.server_request(),
        Arc::clone(&community),
        Arc::clone(&server)
    );
    // Serve the first snapshots before accepting requests.
    let _background = refresher.start(config.refresh_policy()).await;

    let state = web::Data::new(StatsState {
        community,
        server,
        trust_forwarded_for: config.trust_forwarded_for,
    });
    let stats_rate_limiter: web::Data<KeyedRateLimiter> = web::Data::new(
        RateLimiter::keyed(config.stats_quota())
    );

    let bind = config.bind();
    info!("Starting server on {}", bind);
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(stats_rate_limiter.clone())
            .route("/", web::get().to(handlers::index::index))
            .configure(handlers::stats::configure)
    })
        .bind(&bind)?
        .run().await
}
