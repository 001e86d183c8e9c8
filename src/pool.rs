//! M5 — connection pool (spec §4/§9): per-origin LRU of reusable H2
//! clients, keyed also by connect-hostname so a NAT64-routed origin and a
//! direct one never share a pooled connection.
//!
//! The source's capacity check is advisory: a GOAWAY can race between
//! [`ConnectionPool::get`] and the caller opening a stream on it. We
//! tolerate that by treating the failed attempt as a pool miss and letting
//! the dispatcher retry once on a fresh connection, rather than trying to
//! make the check atomic with stream creation.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::h2::H2Client;

const TTL: Duration = Duration::from_secs(60);
const CAPACITY: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoolKey {
    pub hostname: String,
    pub port: u16,
    pub connect_hostname: Option<String>,
}

impl PoolKey {
    #[must_use]
    pub fn new(hostname: impl Into<String>, port: u16, connect_hostname: Option<String>) -> Self {
        PoolKey { hostname: hostname.into(), port, connect_hostname }
    }
}

struct PoolEntry {
    client: H2Client,
    expires_at: Instant,
    last_used: Instant,
}

/// Process-wide pool of live H2 clients, one per origin.
pub struct ConnectionPool {
    entries: DashMap<PoolKey, PoolEntry>,
}

impl ConnectionPool {
    #[must_use]
    pub fn new() -> Self {
        ConnectionPool { entries: DashMap::new() }
    }

    /// Returns a still-live, not-yet-expired client for `key`, removing it
    /// from the pool first if it's stale or the connection actor already
    /// tore down.
    #[must_use]
    pub fn get(&self, key: &PoolKey) -> Option<H2Client> {
        let mut entry = self.entries.get_mut(key)?;
        if Instant::now() >= entry.expires_at || entry.client.is_closed() {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        entry.last_used = Instant::now();
        Some(entry.client.clone())
    }

    pub fn insert(&self, key: PoolKey, client: H2Client) {
        let now = Instant::now();
        self.entries.insert(key, PoolEntry { client, expires_at: now + TTL, last_used: now });
        self.evict_if_over_capacity();
    }

    fn evict_if_over_capacity(&self) {
        let now = Instant::now();
        let stale: Vec<PoolKey> = self
            .entries
            .iter()
            .filter(|e| now >= e.expires_at || e.client.is_closed())
            .map(|e| e.key().clone())
            .collect();
        for key in stale {
            tracing::debug!(host = %key.hostname, port = key.port, "evicting stale pool entry");
            self.entries.remove(&key);
        }
        while self.entries.len() > CAPACITY {
            let Some(oldest) = self.entries.iter().min_by_key(|e| e.last_used).map(|e| e.key().clone())
            else {
                break;
            };
            tracing::debug!(host = %oldest.hostname, port = oldest.port, "evicting lru pool entry over capacity");
            self.entries.remove(&oldest);
        }
    }

    /// `clearPool` lifecycle operation.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Default for ConnectionPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    fn key(host: &str) -> PoolKey {
        PoolKey::new(host, 443, None)
    }

    #[tokio::test]
    async fn inserted_client_is_returned_by_get() {
        let pool = ConnectionPool::new();
        let (client_io, _server_io) = duplex(4096);
        let client = H2Client::new(client_io);
        pool.insert(key("example.com"), client);
        assert!(pool.get(&key("example.com")).is_some());
    }

    #[tokio::test]
    async fn distinct_connect_hostnames_are_distinct_keys() {
        let pool = ConnectionPool::new();
        let (direct_io, _s1) = duplex(4096);
        let (nat64_io, _s2) = duplex(4096);
        pool.insert(PoolKey::new("cdn.example", 443, None), H2Client::new(direct_io));
        pool.insert(
            PoolKey::new("cdn.example", 443, Some("[64:ff9b::6810:1234]".to_string())),
            H2Client::new(nat64_io),
        );
        assert!(pool.get(&PoolKey::new("cdn.example", 443, None)).is_some());
        assert!(pool
            .get(&PoolKey::new("cdn.example", 443, Some("[64:ff9b::6810:1234]".to_string())))
            .is_some());
    }

    #[tokio::test]
    async fn dead_connection_is_treated_as_a_miss() {
        let pool = ConnectionPool::new();
        let (client_io, server_io) = duplex(4096);
        let client = H2Client::new(client_io);
        pool.insert(key("example.com"), client);
        drop(server_io);
        // Give the actor a beat to notice the closed socket and exit.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(pool.get(&key("example.com")).is_none());
    }

    #[tokio::test]
    async fn clear_empties_the_pool() {
        let pool = ConnectionPool::new();
        let (client_io, _server_io) = duplex(4096);
        pool.insert(key("example.com"), H2Client::new(client_io));
        pool.clear();
        assert!(pool.get(&key("example.com")).is_none());
    }
}
