//! Per-identity rate limiting with severity tiers.
//!
//! # Algorithms
//! - Cooldown tiers: reject while `now - last_admitted < cooldown`.
//! - Window tiers: keep the admission times of the trailing window (at most
//!   `max_requests` of them) and reject when the window is full. This is an
//!   exact sliding log, so no window position ever holds more than the maximum.
//!
//! State is keyed by `(identity, tier)` in a sharded map. Each admission does
//! its read-modify-write under the shard lock of its key; the periodic sweep
//! uses `retain`, which locks one shard at a time.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::time;

use crate::config::{DeploymentMode, RateLimitConfig, TierPolicy};
use crate::observability::metrics;
use crate::security::clock::{Clock, SystemClock};
use crate::security::identity::ClientIdentity;

/// Severity of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PolicyTier {
    Read,
    Write,
    Destructive,
}

impl PolicyTier {
    pub fn as_str(self) -> &'static str {
        match self {
            PolicyTier::Read => "read",
            PolicyTier::Write => "write",
            PolicyTier::Destructive => "destructive",
        }
    }
}

impl fmt::Display for PolicyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which rule produced a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitReason {
    CooldownExceeded,
    WindowExceeded,
}

impl LimitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            LimitReason::CooldownExceeded => "cooldown_exceeded",
            LimitReason::WindowExceeded => "window_exceeded",
        }
    }
}

/// Outcome of [`RateLimiter::admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Counted and admitted.
    Allow,
    /// Skipped by the exemption predicate; nothing recorded.
    Exempt,
    /// Rejected; the client may retry after `retry_after_secs`.
    Deny {
        retry_after_secs: u64,
        reason: LimitReason,
    },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, RateDecision::Deny { .. })
    }
}

/// Policies for every tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierPolicies {
    pub read: TierPolicy,
    pub write: TierPolicy,
    pub destructive: TierPolicy,
}

impl TierPolicies {
    pub fn get(&self, tier: PolicyTier) -> &TierPolicy {
        match tier {
            PolicyTier::Read => &self.read,
            PolicyTier::Write => &self.write,
            PolicyTier::Destructive => &self.destructive,
        }
    }
}

impl From<&RateLimitConfig> for TierPolicies {
    fn from(config: &RateLimitConfig) -> Self {
        Self {
            read: config.read,
            write: config.write,
            destructive: config.destructive,
        }
    }
}

/// Exemption check evaluated before any counting.
pub type SkipPredicate = Arc<dyn Fn(&ClientIdentity) -> bool + Send + Sync>;

/// Admission times for one `(identity, tier)` key, oldest first.
#[derive(Debug)]
struct RateWindowEntry {
    admitted: VecDeque<Instant>,
}

impl RateWindowEntry {
    fn new() -> Self {
        Self {
            admitted: VecDeque::new(),
        }
    }

    fn last_activity(&self) -> Option<Instant> {
        self.admitted.back().copied()
    }

    fn check_cooldown(&mut self, now: Instant, cooldown: Duration) -> RateDecision {
        if let Some(last) = self.last_activity() {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < cooldown {
                return RateDecision::Deny {
                    retry_after_secs: retry_secs(cooldown - elapsed),
                    reason: LimitReason::CooldownExceeded,
                };
            }
        }
        self.admitted.clear();
        self.admitted.push_back(now);
        RateDecision::Allow
    }

    fn check_window(&mut self, now: Instant, window: Duration, max: usize) -> RateDecision {
        while let Some(oldest) = self.admitted.front() {
            if now.saturating_duration_since(*oldest) >= window {
                self.admitted.pop_front();
            } else {
                break;
            }
        }

        if self.admitted.len() >= max {
            let oldest = self.admitted.front().copied().unwrap_or(now);
            // Past the clock's range the slot never frees; report the full window.
            let wait = oldest
                .checked_add(window)
                .map_or(window, |frees_at| frees_at.saturating_duration_since(now));
            return RateDecision::Deny {
                retry_after_secs: retry_secs(wait),
                reason: LimitReason::WindowExceeded,
            };
        }

        self.admitted.push_back(now);
        RateDecision::Allow
    }
}

/// Whole seconds until retry, rounded up, never zero.
fn retry_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    secs.max(1)
}

/// Tiered rate limiter. Owns its state; callers only `admit` and `sweep`.
pub struct RateLimiter {
    entries: DashMap<(ClientIdentity, PolicyTier), RateWindowEntry>,
    policies: TierPolicies,
    skip: Option<SkipPredicate>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(policies: TierPolicies) -> Self {
        Self::with_clock(policies, Arc::new(SystemClock))
    }

    pub fn with_clock(policies: TierPolicies, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            policies,
            skip: None,
            clock,
        }
    }

    /// Build from configuration. Loopback identities are exempt in development
    /// when the config asks for it.
    pub fn from_config(config: &RateLimitConfig, mode: DeploymentMode, clock: Arc<dyn Clock>) -> Self {
        let limiter = Self::with_clock(TierPolicies::from(config), clock);
        if config.exempt_loopback_in_development && mode == DeploymentMode::Development {
            limiter.with_skip(Arc::new(|identity: &ClientIdentity| identity.is_loopback()))
        } else {
            limiter
        }
    }

    pub fn with_skip(mut self, skip: SkipPredicate) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn policies(&self) -> &TierPolicies {
        &self.policies
    }

    /// Decide whether `identity` may perform one more `tier` operation now.
    pub fn admit(&self, identity: &ClientIdentity, tier: PolicyTier) -> RateDecision {
        if let Some(skip) = &self.skip {
            if skip(identity) {
                return RateDecision::Exempt;
            }
        }

        let now = self.clock.now();
        let policy = *self.policies.get(tier);
        let mut entry = self
            .entries
            .entry((identity.clone(), tier))
            .or_insert_with(RateWindowEntry::new);

        match policy {
            TierPolicy::Cooldown { cooldown_secs } => {
                entry.check_cooldown(now, Duration::from_secs(cooldown_secs))
            }
            TierPolicy::Window {
                window_secs,
                max_requests,
            } => entry.check_window(now, Duration::from_secs(window_secs), max_requests as usize),
        }
    }

    /// Evict entries whose tier horizon has fully elapsed since their last
    /// admission. Returns the number of evicted entries.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();

        self.entries.retain(|(_, tier), entry| match entry.last_activity() {
            Some(last) => now.saturating_duration_since(last) < self.policies.get(*tier).horizon(),
            None => false,
        });

        let after = self.entries.len();
        let evicted = before.saturating_sub(after);
        metrics::record_sweep(evicted, after);
        evicted
    }

    /// Number of `(identity, tier)` keys currently tracked.
    pub fn tracked_entries(&self) -> usize {
        self.entries.len()
    }

    /// Whether any state exists for this key.
    pub fn is_tracking(&self, identity: &ClientIdentity, tier: PolicyTier) -> bool {
        self.entries.contains_key(&(identity.clone(), tier))
    }

    /// Periodically sweep until shutdown.
    pub async fn run_sweeper(self: Arc<Self>, every: Duration, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_secs = every.as_secs(), "Rate limit sweeper starting");

        let mut ticker = time::interval(every);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        // first tick fires immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = self.sweep();
                    tracing::debug!(evicted, tracked = self.tracked_entries(), "Rate limit sweep finished");
                }
                _ = shutdown.recv() => {
                    tracing::info!("Rate limit sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("policies", &self.policies)
            .field("tracked", &self.entries.len())
            .field("skip", &self.skip.is_some())
            .finish()
    }
}
