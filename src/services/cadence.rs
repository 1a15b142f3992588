//! Round cadence: how long to wait before the next round.
//!
//! The wait is the configured interval plus a uniformly random offset in
//! `[-jitter, +jitter]`, so competitors cannot predict check timing. The
//! result is clamped at zero when the jitter exceeds the interval.

use std::time::Duration;

use rand::Rng;

/// Outcome of one cadence computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub interval: Duration,
    /// Signed random offset that was applied, in milliseconds.
    pub jitter_offset_ms: i64,
    /// Time to sleep before the next iteration.
    pub wait: Duration,
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

/// Compute the wait for one iteration.
pub fn compute_wait<R: Rng + ?Sized>(interval: Duration, jitter: Duration, rng: &mut R) -> Cadence {
    let interval_ms = millis(interval);
    let jitter_ms = millis(jitter);

    let jitter_offset_ms = if jitter_ms == 0 {
        0
    } else {
        rng.random_range(-jitter_ms..=jitter_ms)
    };

    let wait_ms = interval_ms.saturating_add(jitter_offset_ms).max(0);

    Cadence {
        interval,
        jitter_offset_ms,
        wait: Duration::from_millis(u64::try_from(wait_ms).unwrap_or(0)),
    }
}

/// Delay before the deferred SLA recomputation: `wait - margin`, floored at zero.
pub fn sla_delay(wait: Duration, margin: Duration) -> Duration {
    wait.saturating_sub(margin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_zero_jitter_waits_exactly_interval() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let cadence = compute_wait(Duration::from_secs(60), Duration::ZERO, &mut rng);
            assert_eq!(cadence.wait, Duration::from_secs(60));
            assert_eq!(cadence.jitter_offset_ms, 0);
        }
    }

    #[test]
    fn test_jitter_larger_than_interval_clamps_to_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut saw_zero = false;
        for _ in 0..1000 {
            let cadence = compute_wait(Duration::from_secs(1), Duration::from_secs(30), &mut rng);
            assert!(cadence.wait <= Duration::from_secs(31));
            saw_zero |= cadence.wait.is_zero();
        }
        assert!(saw_zero);
    }

    #[test]
    fn test_sla_delay() {
        assert_eq!(sla_delay(Duration::from_secs(60), Duration::from_secs(5)), Duration::from_secs(55));
        assert_eq!(sla_delay(Duration::from_secs(3), Duration::from_secs(5)), Duration::ZERO);
    }

    proptest! {
        /// Property: the wait always stays within [interval - jitter, interval + jitter]
        #[test]
        fn prop_wait_within_jitter_bounds(
            interval_ms in 0u64..600_000,
            jitter_ms in 0u64..120_000,
            seed in any::<u64>(),
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let interval = Duration::from_millis(interval_ms);
            let jitter = Duration::from_millis(jitter_ms);

            let cadence = compute_wait(interval, jitter, &mut rng);

            prop_assert!(cadence.wait <= interval + jitter);
            prop_assert!(cadence.wait >= interval.saturating_sub(jitter));
            prop_assert!(cadence.jitter_offset_ms.unsigned_abs() <= jitter_ms);
        }
    }
}
