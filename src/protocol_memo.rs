//! M4 — protocol memo (spec §4): remembers which ALPN a host:port last
//! negotiated so the dispatcher can skip straight to an H2-only or
//! H1-only connect attempt instead of re-probing every request.

use std::time::{Duration, Instant};

use dashmap::DashMap;

const TTL: Duration = Duration::from_secs(5 * 60);
const CAPACITY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiatedAlpn {
    Http2,
    Http1,
}

struct Entry {
    alpn: NegotiatedAlpn,
    expires_at: Instant,
    last_used: Instant,
}

/// Process-wide, capacity-bounded memo of negotiated ALPN per `host:port`.
/// Eviction is TTL-first, then least-recently-used once over capacity —
/// cheap to do with a linear scan since `CAPACITY` is small.
pub struct ProtocolMemo {
    entries: DashMap<String, Entry>,
}

impl ProtocolMemo {
    #[must_use]
    pub fn new() -> Self {
        ProtocolMemo { entries: DashMap::new() }
    }

    #[must_use]
    pub fn lookup(&self, host: &str, port: u16) -> Option<NegotiatedAlpn> {
        let key = key(host, port);
        let mut entry = self.entries.get_mut(&key)?;
        if Instant::now() >= entry.expires_at {
            drop(entry);
            self.entries.remove(&key);
            return None;
        }
        entry.last_used = Instant::now();
        Some(entry.alpn)
    }

    pub fn record(&self, host: &str, port: u16, alpn: NegotiatedAlpn) {
        let now = Instant::now();
        self.entries.insert(key(host, port), Entry { alpn, expires_at: now + TTL, last_used: now });
        self.evict_if_over_capacity();
    }

    fn evict_if_over_capacity(&self) {
        if self.entries.len() <= CAPACITY {
            return;
        }
        let now = Instant::now();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|e| now >= e.expires_at)
            .map(|e| e.key().clone())
            .collect();
        for key in expired {
            self.entries.remove(&key);
        }
        while self.entries.len() > CAPACITY {
            let Some(oldest) = self.entries.iter().min_by_key(|e| e.last_used).map(|e| e.key().clone())
            else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }

    /// `clearProtocolMemo` lifecycle operation.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Default for ProtocolMemo {
    fn default() -> Self {
        Self::new()
    }
}

fn key(host: &str, port: u16) -> String {
    format!("{host}:{port}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_looks_up() {
        let memo = ProtocolMemo::new();
        memo.record("example.com", 443, NegotiatedAlpn::Http2);
        assert_eq!(memo.lookup("example.com", 443), Some(NegotiatedAlpn::Http2));
        assert_eq!(memo.lookup("other.com", 443), None);
    }

    #[test]
    fn distinct_ports_are_distinct_keys() {
        let memo = ProtocolMemo::new();
        memo.record("example.com", 443, NegotiatedAlpn::Http2);
        memo.record("example.com", 8443, NegotiatedAlpn::Http1);
        assert_eq!(memo.lookup("example.com", 443), Some(NegotiatedAlpn::Http2));
        assert_eq!(memo.lookup("example.com", 8443), Some(NegotiatedAlpn::Http1));
    }

    #[test]
    fn clear_empties_the_memo() {
        let memo = ProtocolMemo::new();
        memo.record("example.com", 443, NegotiatedAlpn::Http2);
        memo.clear();
        assert_eq!(memo.lookup("example.com", 443), None);
    }

    #[test]
    fn evicts_least_recently_used_past_capacity() {
        let memo = ProtocolMemo::new();
        for i in 0..CAPACITY {
            memo.record(&format!("host{i}.example"), 443, NegotiatedAlpn::Http1);
        }
        // Touch host0 so it's no longer the least-recently-used entry.
        assert_eq!(memo.lookup("host0.example", 443), Some(NegotiatedAlpn::Http1));
        memo.record("overflow.example", 443, NegotiatedAlpn::Http2);
        assert_eq!(memo.lookup("host0.example", 443), Some(NegotiatedAlpn::Http1));
        assert!(memo.entries.len() <= CAPACITY);
    }
}
