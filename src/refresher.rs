// src/refresher.rs
use std::sync::Arc;
use std::time::Duration;
use log::{ debug, info };
use tokio::task::JoinHandle;
use tokio::time::{ Instant, MissedTickBehavior };

use crate::models::stats::{ CommunityStats, ResolutionRequest, ServerStats };
use crate::resolver::StatsResolver;
use crate::storage::snapshot::SnapshotCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPolicy {
    Once,
    Every(Duration),
}

impl RefreshPolicy {
    /// `0` means resolve once.
    pub fn from_secs(secs: u64) -> Self {
        if secs == 0 {
            RefreshPolicy::Once
        } else {
            RefreshPolicy::Every(Duration::from_secs(secs))
        }
    }
}

/// Re-resolves both statistics and installs them into the shared cells.
pub struct StatsRefresher {
    resolver: StatsResolver,
    community_request: ResolutionRequest,
    server_request: ResolutionRequest,
    community: Arc<SnapshotCell<CommunityStats>>,
    server: Arc<SnapshotCell<ServerStats>>,
}

impl StatsRefresher {
    pub fn new(
        resolver: StatsResolver,
        community_request: ResolutionRequest,
        server_request: ResolutionRequest,
        community: Arc<SnapshotCell<CommunityStats>>,
        server: Arc<SnapshotCell<ServerStats>>
    ) -> Self {
        Self {
            resolver,
            community_request,
            server_request,
            community,
            server,
        }
    }

    pub fn community_cell(&self) -> Arc<SnapshotCell<CommunityStats>> {
        Arc::clone(&self.community)
    }

    pub fn server_cell(&self) -> Arc<SnapshotCell<ServerStats>> {
        Arc::clone(&self.server)
    }

    /// One resolution cycle. The two statistics resolve concurrently.
    pub async fn refresh_once(&self) {
        let community_ticket = self.community.begin();
        let server_ticket = self.server.begin();

        let (community, server) = tokio::join!(
            self.resolver.resolve_community_stats(&self.community_request),
            self.resolver.resolve_server_stats(&self.server_request)
        );

        info!(
            "Resolved stats: {} members ({:?}), {} players ({:?}, online={})",
            community.member_count,
            community.source,
            server.player_count,
            server.source,
            server.online
        );

        if !self.community.publish(community_ticket, community) {
            debug!("Community snapshot #{} superseded", community_ticket);
        }
        if !self.server.publish(server_ticket, server) {
            debug!("Server snapshot #{} superseded", server_ticket);
        }
    }

    /// Runs the first cycle to completion, then keeps refreshing in the
    /// background when the policy asks for it.
    pub async fn start(self, policy: RefreshPolicy) -> Option<JoinHandle<()>> {
        self.refresh_once().await;

        let period = match policy {
            RefreshPolicy::Once => {
                return None;
            }
            RefreshPolicy::Every(period) => period,
        };

        info!("Refreshing stats every {:?}", period);
        Some(
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    self.refresh_once().await;
                }
            })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::stats::{ CommunitySource, FallbackPolicy, ServerSource };
    use crate::resolver::Endpoints;

    fn offline_refresher() -> StatsRefresher {
        let policy = FallbackPolicy { jitter: 0, ..FallbackPolicy::default() };
        StatsRefresher::new(
            StatsResolver::new(Endpoints::default(), policy),
            ResolutionRequest::new(None, 5000),
            ResolutionRequest::new(None, 139).with_fallback_max(260),
            Arc::new(SnapshotCell::new()),
            Arc::new(SnapshotCell::new())
        )
    }

    #[test]
    fn zero_seconds_means_once() {
        assert_eq!(RefreshPolicy::from_secs(0), RefreshPolicy::Once);
        assert_eq!(RefreshPolicy::from_secs(30), RefreshPolicy::Every(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn each_cycle_installs_a_new_snapshot() {
        let refresher = offline_refresher();
        let community = refresher.community_cell();
        let server = refresher.server_cell();

        refresher.refresh_once().await;
        let first = community.current().unwrap();
        assert_eq!(first.member_count, 5000);
        assert_eq!(first.source, CommunitySource::Fallback);
        assert_eq!(server.current().unwrap().player_count, 139);
        assert_eq!(server.current().unwrap().source, ServerSource::Fallback);

        refresher.refresh_once().await;
        let second = community.current().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(community.sequence(), 2);
        assert_eq!(server.sequence(), 2);
    }

    #[tokio::test]
    async fn start_once_populates_cells_without_background_task() {
        let refresher = offline_refresher();
        let community = refresher.community_cell();
        let server = refresher.server_cell();

        assert!(refresher.start(RefreshPolicy::Once).await.is_none());
        assert!(community.current().is_some());
        assert!(server.current().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_refresh_issues_new_cycles() {
        let refresher = offline_refresher();
        let community = refresher.community_cell();
        let server = refresher.server_cell();

        let handle = refresher
            .start(RefreshPolicy::Every(Duration::from_secs(30))).await
            .expect("periodic policy spawns a task");
        assert_eq!(community.sequence(), 1);

        tokio::time::advance(Duration::from_secs(29)).await;
        tokio::task::yield_now().await;
        assert_eq!(community.sequence(), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(community.sequence(), 2);

        tokio::time::advance(Duration::from_secs(30)).await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(community.sequence(), 3);
        assert_eq!(server.sequence(), 3);
        handle.abort();
    }
}
