//! Time-limited cache of match-winner odds.
//!
//! Cache hits never touch the request gate: only the HTTP client acquires
//! slots, and it is only called on a miss.

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::football::MatchOdds;

/// Default time-to-live for cached odds.
pub const DEFAULT_ODDS_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy)]
struct CachedOdds {
    odds: MatchOdds,
    cached_at: Instant,
}

/// Odds by fixture ID, expiring after a fixed TTL.
#[derive(Debug)]
pub struct OddsCache {
    entries: DashMap<u64, CachedOdds>,
    ttl: Duration,
}

impl OddsCache {
    /// Create a cache with the given TTL.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Fresh odds for a fixture, if cached.
    pub fn get(&self, fixture_id: u64) -> Option<MatchOdds> {
        let entry = self.entries.get(&fixture_id)?;
        if entry.cached_at.elapsed() < self.ttl {
            Some(entry.odds)
        } else {
            None
        }
    }

    /// Store odds, replacing any previous entry.
    pub fn insert(&self, fixture_id: u64, odds: MatchOdds) {
        self.entries.insert(
            fixture_id,
            CachedOdds {
                odds,
                cached_at: Instant::now(),
            },
        );
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, cached| cached.cached_at.elapsed() < self.ttl);
        before - self.entries.len()
    }

    /// Number of entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for OddsCache {
    fn default() -> Self {
        Self::new(DEFAULT_ODDS_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tokio::time::advance;

    fn odds() -> MatchOdds {
        MatchOdds {
            home: Some(dec!(3.2)),
            draw: Some(dec!(3.4)),
            away: Some(dec!(2.2)),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = OddsCache::default();
        cache.insert(1, odds());
        assert_eq!(cache.get(1), Some(odds()));

        advance(Duration::from_secs(3599)).await;
        assert!(cache.get(1).is_some());

        advance(Duration::from_secs(1)).await;
        assert!(cache.get(1).is_none());
        assert_eq!(cache.len(), 1);

        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn insert_refreshes_expired_entry() {
        let cache = OddsCache::new(Duration::from_secs(10));
        cache.insert(1, odds());
        advance(Duration::from_secs(11)).await;
        assert!(cache.get(1).is_none());

        cache.insert(1, odds());
        assert!(cache.get(1).is_some());
    }
}
