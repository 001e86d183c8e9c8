//! Connection statistics (ambient expansion, grounded on the teacher's
//! `client/stats.rs` / `telemetry/client_stats.rs`): plain atomic counters
//! exposed as a point-in-time snapshot, not a push-based metrics exporter.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, Default)]
pub struct StatsSnapshot {
    pub pool_hits: u64,
    pub pool_misses: u64,
    pub nat64_hedge_wins: u64,
    pub nat64_hedge_losses: u64,
    pub dns_cache_hits: u64,
    pub dns_cache_misses: u64,
}

#[derive(Default)]
pub struct EngineStats {
    pool_hits: AtomicU64,
    pool_misses: AtomicU64,
    nat64_hedge_wins: AtomicU64,
    nat64_hedge_losses: AtomicU64,
    dns_cache_hits: AtomicU64,
    dns_cache_misses: AtomicU64,
}

impl EngineStats {
    #[must_use]
    pub fn new() -> Self {
        EngineStats::default()
    }

    pub fn record_pool_hit(&self) {
        self.pool_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pool_miss(&self) {
        self.pool_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_nat64_hedge_win(&self) {
        self.nat64_hedge_wins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_nat64_hedge_loss(&self) {
        self.nat64_hedge_losses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dns_cache_hit(&self) {
        self.dns_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dns_cache_miss(&self) {
        self.dns_cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            pool_hits: self.pool_hits.load(Ordering::Relaxed),
            pool_misses: self.pool_misses.load(Ordering::Relaxed),
            nat64_hedge_wins: self.nat64_hedge_wins.load(Ordering::Relaxed),
            nat64_hedge_losses: self.nat64_hedge_losses.load(Ordering::Relaxed),
            dns_cache_hits: self.dns_cache_hits.load(Ordering::Relaxed),
            dns_cache_misses: self.dns_cache_misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_events() {
        let stats = EngineStats::new();
        stats.record_pool_hit();
        stats.record_pool_hit();
        stats.record_pool_miss();
        stats.record_nat64_hedge_win();
        let snap = stats.snapshot();
        assert_eq!(snap.pool_hits, 2);
        assert_eq!(snap.pool_misses, 1);
        assert_eq!(snap.nat64_hedge_wins, 1);
    }
}
