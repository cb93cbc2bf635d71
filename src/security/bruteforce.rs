//! Brute-force detection for the authentication endpoints.
//!
//! Per-client-IP attempt counting plus a blocklist. The guard is an
//! explicitly owned, injectable component shared behind an `Arc`; there is
//! no module-level state. Increments are linearizable per key via the
//! `DashMap` entry API, so concurrent failed-login storms from one IP never
//! lose updates.

use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::{DashMap, DashSet};

/// Per-client-IP state for brute-force detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptRecord {
    /// Failed attempts observed so far. Always >= 1 once tracked.
    pub attempts: u32,

    /// Unix timestamp of the first failed attempt.
    pub first_seen: u64,
}

/// Attempt tracker plus blocklist, keyed by client IP string.
///
/// State machine per IP: unseen → tracked(1) → tracked(n+1) → blocked once
/// `attempts >= threshold`. Blocked is terminal unless [`release_expired`]
/// is invoked by a collaborator after the configured block time.
///
/// [`release_expired`]: BruteForceGuard::release_expired
pub struct BruteForceGuard {
    stats: DashMap<String, AttemptRecord>,
    blocked: DashSet<String>,
    threshold: u32,
}

impl BruteForceGuard {
    /// Create a guard with the given attempt threshold (config
    /// `access.max_login_attempts`, default 5).
    pub fn new(threshold: u32) -> Self {
        Self {
            stats: DashMap::new(),
            blocked: DashSet::new(),
            threshold: threshold.max(1),
        }
    }

    /// Record one failed authentication attempt from `ip`.
    ///
    /// Returns the total attempts recorded for that IP. Blocks the IP once
    /// the threshold is reached. The read-modify-write happens under the
    /// per-key shard lock.
    pub fn record_failed_attempt(&self, ip: &str) -> u32 {
        let attempts = {
            let mut entry = self
                .stats
                .entry(ip.to_string())
                .or_insert_with(|| AttemptRecord {
                    attempts: 0,
                    first_seen: unix_now(),
                });
            entry.attempts += 1;
            entry.attempts
        };

        if attempts >= self.threshold && self.blocked.insert(ip.to_string()) {
            tracing::warn!(
                client = %ip,
                attempts,
                "IP blocked due to exceeded number of login attempts"
            );
        }

        attempts
    }

    /// Whether `ip` is currently on the blocklist.
    pub fn is_blocked(&self, ip: &str) -> bool {
        self.blocked.contains(ip)
    }

    /// Current attempt record for `ip`, if tracked.
    pub fn attempts(&self, ip: &str) -> Option<AttemptRecord> {
        self.stats.get(ip).map(|record| *record)
    }

    /// Release `ip` if its block window has elapsed.
    ///
    /// The base state machine never decays on its own; collaborators call
    /// this before consulting [`is_blocked`] to implement the configured
    /// `access.block_time` window. A no-op for untracked IPs.
    ///
    /// [`is_blocked`]: BruteForceGuard::is_blocked
    pub fn release_expired(&self, ip: &str, block_time_secs: u64) {
        self.release_expired_at(ip, block_time_secs, unix_now());
    }

    fn release_expired_at(&self, ip: &str, block_time_secs: u64, now: u64) {
        let expired = self
            .stats
            .get(ip)
            .is_some_and(|record| now.saturating_sub(block_time_secs) >= record.first_seen);

        if expired {
            self.stats.remove(ip);
            self.blocked.remove(ip);
            tracing::info!(client = %ip, "IP released from blocklist");
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}
