//! Engine context (spec §9 design note: "wrap ambient caches in a single
//! engine context value so tests can construct isolated instances without
//! globals"). Holds the process-wide-in-spirit, but here instance-scoped,
//! pool/memo/DNS/NAT64 state plus the engine configuration and stats.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::dns::DnsResolver;
use crate::nat64::Nat64Tracker;
use crate::pool::ConnectionPool;
use crate::protocol_memo::ProtocolMemo;
use crate::stats::EngineStats;

/// Everything a `request()` call needs that outlives a single request.
/// Cheap to clone: every field is already behind an `Arc` or is itself
/// cheaply shareable internally (`DashMap`-backed caches).
#[derive(Clone)]
pub struct EngineContext {
    pub config: Arc<EngineConfig>,
    pub pool: Arc<ConnectionPool>,
    pub protocol_memo: Arc<ProtocolMemo>,
    pub dns: Arc<DnsResolver>,
    pub nat64: Arc<Nat64Tracker>,
    pub stats: Arc<EngineStats>,
}

impl EngineContext {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        EngineContext {
            config: Arc::new(config),
            pool: Arc::new(ConnectionPool::new()),
            protocol_memo: Arc::new(ProtocolMemo::new()),
            dns: Arc::new(DnsResolver::new()),
            nat64: Arc::new(Nat64Tracker::new()),
            stats: Arc::new(EngineStats::new()),
        }
    }

    /// `clearPool` / `clearDnsCache` / `clearNat64PrefixStats` /
    /// `clearProtocolMemo` lifecycle operations, available individually or
    /// all at once.
    pub fn clear_all(&self) {
        self.pool.clear();
        self.protocol_memo.clear();
        self.nat64.clear();
    }
}

impl Default for EngineContext {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
