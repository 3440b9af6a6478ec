//! Property tests for the rate limiter against a reference model.

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use crud_gate::config::TierPolicy;
use crud_gate::security::{ClientIdentity, ManualClock, PolicyTier, RateDecision, RateLimiter, TierPolicies};

fn policies(write: TierPolicy) -> TierPolicies {
    TierPolicies {
        read: TierPolicy::Cooldown { cooldown_secs: 1 },
        write,
        destructive: write,
    }
}

fn limiter(write: TierPolicy) -> (RateLimiter, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    (RateLimiter::with_clock(policies(write), clock.clone()), clock)
}

fn client() -> ClientIdentity {
    ClientIdentity::new("198.51.100.9")
}

proptest! {
    #[test]
    fn window_matches_sliding_log_model(
        window_secs in 1u64..30,
        max_requests in 1u32..8,
        gaps_ms in prop::collection::vec(0u64..4_000, 1..120),
    ) {
        let (limiter, clock) = limiter(TierPolicy::Window { window_secs, max_requests });
        let window_ms = window_secs * 1_000;

        let mut now_ms = 0u64;
        let mut model: Vec<u64> = Vec::new();

        for gap in gaps_ms {
            clock.advance(Duration::from_millis(gap));
            now_ms += gap;

            model.retain(|t| now_ms - t < window_ms);
            let expected = model.len() < max_requests as usize;
            if expected {
                model.push(now_ms);
            }

            let decision = limiter.admit(&client(), PolicyTier::Write);
            prop_assert_eq!(decision.is_allowed(), expected);

            if let RateDecision::Deny { retry_after_secs, .. } = decision {
                prop_assert!(retry_after_secs >= 1);
                prop_assert!(retry_after_secs <= window_secs);
            }
        }
    }

    #[test]
    fn cooldown_spaces_admissions(
        cooldown_secs in 1u64..10,
        gaps_ms in prop::collection::vec(0u64..3_000, 1..100),
    ) {
        let (limiter, clock) = limiter(TierPolicy::Cooldown { cooldown_secs });

        let mut now_ms = 0u64;
        let mut last_admitted: Option<u64> = None;

        for gap in gaps_ms {
            clock.advance(Duration::from_millis(gap));
            now_ms += gap;

            let decision = limiter.admit(&client(), PolicyTier::Write);
            if decision.is_allowed() {
                if let Some(last) = last_admitted {
                    prop_assert!(now_ms - last >= cooldown_secs * 1_000);
                }
                last_admitted = Some(now_ms);
            } else {
                let last = last_admitted.expect("denial without a prior admission");
                prop_assert!(now_ms - last < cooldown_secs * 1_000);
            }
        }
    }

    #[test]
    fn sweeping_never_changes_decisions(
        steps in prop::collection::vec((0u64..20_000, any::<bool>()), 1..80),
    ) {
        let policy = TierPolicy::Window { window_secs: 10, max_requests: 3 };
        let (swept, swept_clock) = limiter(policy);
        let (plain, plain_clock) = limiter(policy);

        for (gap, sweep) in steps {
            swept_clock.advance(Duration::from_millis(gap));
            plain_clock.advance(Duration::from_millis(gap));

            if sweep {
                swept.sweep();
                prop_assert_eq!(swept.sweep(), 0);
            }

            prop_assert_eq!(
                swept.admit(&client(), PolicyTier::Write).is_allowed(),
                plain.admit(&client(), PolicyTier::Write).is_allowed()
            );
        }
    }
}

#[test]
fn retry_hint_is_sufficient() {
    let (limiter, clock) = limiter(TierPolicy::Window { window_secs: 60, max_requests: 2 });

    assert!(limiter.admit(&client(), PolicyTier::Write).is_allowed());
    clock.advance(Duration::from_millis(1_500));
    assert!(limiter.admit(&client(), PolicyTier::Write).is_allowed());

    let RateDecision::Deny { retry_after_secs, .. } = limiter.admit(&client(), PolicyTier::Write) else {
        panic!("third write should be denied");
    };
    assert_eq!(retry_after_secs, 59);

    clock.advance(Duration::from_secs(retry_after_secs));
    assert!(limiter.admit(&client(), PolicyTier::Write).is_allowed());
}

#[test]
fn sweep_evicts_only_expired_keys() {
    let (limiter, clock) = limiter(TierPolicy::Window { window_secs: 60, max_requests: 5 });
    let stale = ClientIdentity::new("192.0.2.1");
    let fresh = ClientIdentity::new("192.0.2.2");

    limiter.admit(&stale, PolicyTier::Write);
    clock.advance(Duration::from_secs(30));
    limiter.admit(&fresh, PolicyTier::Write);
    clock.advance(Duration::from_secs(31));

    assert_eq!(limiter.sweep(), 1);
    assert!(!limiter.is_tracking(&stale, PolicyTier::Write));
    assert!(limiter.is_tracking(&fresh, PolicyTier::Write));
}
