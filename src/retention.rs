use rand::{Rng, RngCore};

use crate::parameters::{DECAY, FACTOR};

pub const MAXIMUM_INTERVAL: u32 = 36500;
pub const DEFAULT_DESIRED_RETENTION: f32 = 0.9;

/// Intervals shorter than this are left alone by the fuzzer.
const FUZZ_THRESHOLD_DAYS: f32 = 2.5;
const FUZZ_RATIO: f32 = 0.05;

/// Probability of recall after `elapsed_days` for a memory of the given
/// stability: `R = (1 + FACTOR * t / S)^DECAY`.
///
/// Total over all inputs: 0.0 when no memory has formed, 1.0 when no time has
/// passed.
pub fn forgetting_curve(elapsed_days: f32, stability: f32) -> f32 {
    if stability <= 0.0 {
        return 0.0;
    }
    if elapsed_days <= 0.0 {
        return 1.0;
    }
    (1.0 + FACTOR * elapsed_days / stability).powf(DECAY)
}

/// Interval in whole days after which retrievability decays to
/// `desired_retention`, clamped to `[1, MAXIMUM_INTERVAL]`.
pub fn next_interval(stability: f32, desired_retention: f32) -> u32 {
    if stability <= 0.0 {
        return 1;
    }
    let interval = stability / FACTOR * (desired_retention.powf(1.0 / DECAY) - 1.0);
    (interval.round() as i64).clamp(1, MAXIMUM_INTERVAL as i64) as u32
}

/// Perturbs an interval by up to ±5% (at least ±1 day) so reviews scheduled
/// together do not all land on the same calendar day. Sub-2.5-day intervals
/// stay exact.
pub(crate) fn with_fuzz(interval: u32, rng: &mut (impl RngCore + ?Sized)) -> u32 {
    if (interval as f32) < FUZZ_THRESHOLD_DAYS {
        return interval;
    }
    let range = ((interval as f32 * FUZZ_RATIO).round() as i64).max(1);
    let fuzzed = interval as i64 + rng.random_range(-range..=range);
    fuzzed.clamp(1, MAXIMUM_INTERVAL as i64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn fresh_memory_is_fully_retrievable() {
        for stability in [0.1, 1.0, 36500.0] {
            assert_eq!(forgetting_curve(0.0, stability), 1.0);
            assert_eq!(forgetting_curve(-1.0, stability), 1.0);
        }
    }

    #[test]
    fn no_memory_means_no_retrievability() {
        assert_eq!(forgetting_curve(5.0, 0.0), 0.0);
        assert_eq!(forgetting_curve(5.0, -1.0), 0.0);
    }

    #[test]
    fn retrievability_hits_target_at_stability() {
        for stability in [0.5, 3.1262, 42.0] {
            assert!((forgetting_curve(stability, stability) - 0.9).abs() < 1e-4);
        }
    }

    #[test]
    fn retrievability_decays_monotonically() {
        let stability = 10.0;
        let mut previous = 1.0;
        for day in 0..1000 {
            let retrievability = forgetting_curve(day as f32, stability);
            assert!(retrievability <= previous);
            assert!((0.0..=1.0).contains(&retrievability));
            previous = retrievability;
        }
    }

    #[test]
    fn test_next_interval() {
        let desired_retentions = (1..=10).map(|i| i as f32 / 10.0).collect::<Vec<_>>();
        let intervals = desired_retentions
            .iter()
            .map(|r| next_interval(1.0, *r))
            .collect::<Vec<_>>();
        assert_eq!(intervals, [422, 102, 43, 22, 13, 8, 4, 2, 1, 1]);
    }

    #[test]
    fn interval_grows_with_stability() {
        let stabilities = [0.0, 0.1, 1.0, 5.0, 10.0, 100.0, 36500.0, 1e8];
        let mut previous = 0;
        for stability in stabilities {
            let interval = next_interval(stability, DEFAULT_DESIRED_RETENTION);
            assert!((1..=MAXIMUM_INTERVAL).contains(&interval));
            assert!(interval >= previous);
            previous = interval;
        }
    }

    #[test]
    fn at_default_retention_interval_equals_stability() {
        // desired_retention^(1/DECAY) - 1 == FACTOR at 0.9, so the planner
        // reduces to rounding the stability.
        for stability in [1.0, 2.49, 7.5, 360.2] {
            assert_eq!(
                next_interval(stability, 0.9),
                (stability.round() as u32).max(1)
            );
        }
    }

    #[test]
    fn short_intervals_are_not_fuzzed() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            assert_eq!(with_fuzz(1, &mut rng), 1);
            assert_eq!(with_fuzz(2, &mut rng), 2);
        }
    }

    #[test]
    fn fuzz_stays_within_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        for interval in [3u32, 10, 29, 30, 100, 365, 36500] {
            let range = ((interval as f32 * 0.05).round() as i64).max(1);
            for _ in 0..100 {
                let fuzzed = with_fuzz(interval, &mut rng);
                assert!((fuzzed as i64 - interval as i64).abs() <= range);
                assert!((1..=MAXIMUM_INTERVAL).contains(&fuzzed));
            }
        }
    }
}
