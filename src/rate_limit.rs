//! Per-actor, per-endpoint request quotas
//!
//! Fixed one-minute windows aligned to UTC minutes. Counters live in a
//! [`DashMap`]; the entry API holds the shard lock for the whole
//! lookup-and-mutate sequence, so concurrent callers for the same key
//! never admit more than `limit` requests per window.
//!
//! State is process local. Counters for stale windows are only removed
//! by [`spawn_cleanup_task`]; without it the table grows with the number
//! of distinct actors.

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::types::{Endpoint, EndpointClass};

/// Admissions counted for one (actor, endpoint) key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateCounter {
    pub window_start: DateTime<Utc>,
    pub count: u64,
}

/// In-memory fixed-window rate limiter
pub struct RateLimiter {
    save_limit_per_minute: i64,
    read_limit_per_minute: i64,
    counters: DashMap<String, RateCounter>,
}

impl RateLimiter {
    /// Create a limiter. A limit of zero or less disables that class.
    pub fn new(save_limit_per_minute: i64, read_limit_per_minute: i64) -> Self {
        Self {
            save_limit_per_minute,
            read_limit_per_minute,
            counters: DashMap::new(),
        }
    }

    /// Record a request and report whether it is admitted
    pub fn allow(&self, actor: &str, endpoint: Endpoint) -> bool {
        self.allow_at(actor, endpoint, Utc::now())
    }

    /// Same as [`allow`](Self::allow) with an explicit clock reading
    pub fn allow_at(&self, actor: &str, endpoint: Endpoint, now: DateTime<Utc>) -> bool {
        let limit = self.limit_for(endpoint.class());
        if limit <= 0 {
            return true;
        }
        let limit = limit as u64;
        let window_start = minute_window(now);
        let key = format!("{}:{}", actor, endpoint.path());

        match self.counters.entry(key) {
            Entry::Vacant(vacant) => {
                vacant.insert(RateCounter {
                    window_start,
                    count: 1,
                });
                true
            }
            Entry::Occupied(mut occupied) => {
                let counter = occupied.get_mut();
                if counter.window_start != window_start {
                    *counter = RateCounter {
                        window_start,
                        count: 1,
                    };
                    true
                } else if counter.count >= limit {
                    debug!(key = occupied.key().as_str(), limit, "Rate limit exceeded");
                    false
                } else {
                    counter.count += 1;
                    true
                }
            }
        }
    }

    /// Quota for an endpoint class
    pub fn limit_for(&self, class: EndpointClass) -> i64 {
        match class {
            EndpointClass::Save => self.save_limit_per_minute,
            EndpointClass::Read => self.read_limit_per_minute,
            EndpointClass::Unlimited => 0,
        }
    }

    /// Current counter for a key, if any
    pub fn counter(&self, actor: &str, endpoint: Endpoint) -> Option<RateCounter> {
        self.counters
            .get(&format!("{}:{}", actor, endpoint.path()))
            .map(|entry| *entry)
    }

    /// Number of tracked keys
    pub fn tracked_keys(&self) -> usize {
        self.counters.len()
    }

    /// Drop counters whose window ended before the window containing `now`
    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let current = minute_window(now);
        let before = self.counters.len();
        self.counters.retain(|_, counter| counter.window_start >= current);
        before.saturating_sub(self.counters.len())
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }
}

/// Truncate a timestamp to the start of its UTC minute
fn minute_window(now: DateTime<Utc>) -> DateTime<Utc> {
    now.duration_trunc(TimeDelta::minutes(1)).unwrap_or(now)
}

/// Spawn a background task that periodically removes stale counters
pub fn spawn_cleanup_task(limiter: Arc<RateLimiter>, interval: Duration) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            let removed = limiter.sweep();
            debug!(
                removed = removed,
                tracked = limiter.tracked_keys(),
                "Rate limiter sweep completed"
            );
        }
    });

    info!(interval_secs = interval.as_secs(), "Rate limiter sweep task started");
}
