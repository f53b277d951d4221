use serde::{Deserialize, Serialize};

use crate::parameters::{D_MAX, D_MIN, Parameters, S_MIN};
use crate::scheduler::Rating;

/// Memory strength of one card: how long the memory lasts and how hard it is
/// to reinforce.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryState {
    /// Days until retrievability decays to the target retention. At least 0.1.
    pub stability: f32,
    /// 1.0 (easiest) to 10.0 (hardest); higher values slow stability growth.
    pub difficulty: f32,
}

fn rating_value(rating: Rating) -> f32 {
    rating as u8 as f32
}

/// `S0(G) = w[G-1]`, the per-rating stability a brand-new card starts with.
pub(crate) fn init_stability(w: &Parameters, rating: Rating) -> f32 {
    w[rating as usize - 1].max(S_MIN)
}

/// `D0(G) = w4 - e^(w5 * (G - 1)) + 1`, clamped to `[1, 10]`.
pub(crate) fn init_difficulty(w: &Parameters, rating: Rating) -> f32 {
    (w[4] - f32::exp(w[5] * (rating_value(rating) - 1.0)) + 1.0).clamp(D_MIN, D_MAX)
}

/// Mean reversion toward the difficulty a first Good rating would produce:
/// `D' = w6 * D0(Good) + (1 - w6) * (D - w7 * (G - 3))`.
pub(crate) fn next_difficulty(w: &Parameters, difficulty: f32, rating: Rating) -> f32 {
    let delta = -(w[7] * (rating_value(rating) - 3.0));
    let mean_reversion =
        w[6] * init_difficulty(w, Rating::Good) + (1.0 - w[6]) * (difficulty + delta);
    mean_reversion.clamp(D_MIN, D_MAX)
}

/// Stability after a successful recall (Hard/Good/Easy) at retrievability `r`.
pub(crate) fn next_recall_stability(
    w: &Parameters,
    difficulty: f32,
    stability: f32,
    r: f32,
    rating: Rating,
) -> f32 {
    let hard_penalty = if rating == Rating::Hard { w[15] } else { 1.0 };
    let easy_bonus = if rating == Rating::Easy { w[16] } else { 1.0 };
    let new_s = stability
        * (f32::exp(w[8])
            * (11.0 - difficulty)
            * stability.powf(-w[9])
            * (f32::exp(w[10] * (1.0 - r)) - 1.0)
            * hard_penalty
            * easy_bonus
            + 1.0);
    new_s.max(S_MIN)
}

/// Stability after a lapse (Again from the review phase). Never exceeds the
/// pre-lapse stability.
pub(crate) fn next_forget_stability(w: &Parameters, difficulty: f32, stability: f32, r: f32) -> f32 {
    let new_s = w[11]
        * difficulty.powf(-w[12])
        * ((stability + 1.0).powf(w[13]) - 1.0)
        * f32::exp(w[14] * (1.0 - r));
    new_s.min(stability).max(S_MIN)
}

/// Intra-phase stability drift while a card sits in the learning or
/// relearning steps: `S' = S * e^(w14 * (G - 3 + w15))`.
pub(crate) fn next_short_term_stability(w: &Parameters, stability: f32, rating: Rating) -> f32 {
    (stability * f32::exp(w[14] * (rating_value(rating) - 3.0 + w[15]))).max(S_MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::DEFAULT_PARAMETERS;
    use strum::IntoEnumIterator;

    const W: &[f32] = &DEFAULT_PARAMETERS;

    fn assert_approx(actual: f32, expected: f32, tolerance: f32) {
        assert!(
            (actual - expected).abs() < tolerance,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn initial_stability_reads_the_weight_table() {
        assert_eq!(init_stability(W, Rating::Again), 0.4072);
        assert_eq!(init_stability(W, Rating::Hard), 1.1829);
        assert_eq!(init_stability(W, Rating::Good), 3.1262);
        assert_eq!(init_stability(W, Rating::Easy), 15.4722);
    }

    #[test]
    fn initial_stability_is_floored() {
        let mut w = DEFAULT_PARAMETERS;
        w[0] = 0.0;
        assert_eq!(init_stability(&w, Rating::Again), 0.1);
    }

    #[test]
    fn initial_difficulty_per_rating() {
        assert_approx(init_difficulty(W, Rating::Again), 7.2102, 1e-3);
        assert_approx(init_difficulty(W, Rating::Hard), 6.5085, 1e-3);
        assert_approx(init_difficulty(W, Rating::Good), 5.3146, 1e-3);
        assert_approx(init_difficulty(W, Rating::Easy), 3.2829, 1e-3);
    }

    #[test]
    fn difficulty_stays_in_range() {
        let mut extreme = DEFAULT_PARAMETERS;
        extreme[4] = 20.0;
        for rating in Rating::iter() {
            let d0 = init_difficulty(&extreme, rating);
            assert!((1.0..=10.0).contains(&d0));
            for d in [1.0, 5.5, 10.0] {
                let next = next_difficulty(&extreme, d, rating);
                assert!((1.0..=10.0).contains(&next));
            }
        }
    }

    #[test]
    fn good_first_difficulty_is_a_fixed_point() {
        let d0 = init_difficulty(W, Rating::Good);
        assert_approx(next_difficulty(W, d0, Rating::Good), d0, 1e-4);
    }

    #[test]
    fn recall_stability_grows_on_good() {
        let next = next_recall_stability(W, 5.0, 10.0, 0.9, Rating::Good);
        assert_approx(next, 34.19, 0.05);
        assert!(next > 10.0);
    }

    #[test]
    fn hard_recall_grows_less_than_good() {
        let hard = next_recall_stability(W, 5.0, 10.0, 0.9, Rating::Hard);
        let good = next_recall_stability(W, 5.0, 10.0, 0.9, Rating::Good);
        assert_approx(hard, 16.18, 0.05);
        assert!(hard < good);
        assert!(hard >= 10.0);
    }

    #[test]
    fn recall_stability_never_shrinks() {
        for rating in [Rating::Hard, Rating::Good, Rating::Easy] {
            for r in [0.0, 0.5, 0.9, 1.0] {
                for s in [0.1, 1.0, 10.0, 1000.0] {
                    assert!(next_recall_stability(W, 5.0, s, r, rating) >= s);
                }
            }
        }
    }

    #[test]
    fn forget_stability_is_clamped_below_prior() {
        let next = next_forget_stability(W, 5.0, 10.0, 0.9);
        assert_approx(next, 2.21, 0.01);
        for s in [0.1, 0.5, 10.0, 36500.0] {
            for r in [0.0, 0.5, 1.0] {
                for d in [1.0, 5.0, 10.0] {
                    let next = next_forget_stability(W, d, s, r);
                    assert!(next <= s.max(0.1));
                    assert!(next >= 0.1);
                }
            }
        }
    }

    #[test]
    fn short_term_stability_orders_by_rating() {
        let s = 1.0;
        let again = next_short_term_stability(W, s, Rating::Again);
        let hard = next_short_term_stability(W, s, Rating::Hard);
        let good = next_short_term_stability(W, s, Rating::Good);
        let easy = next_short_term_stability(W, s, Rating::Easy);
        assert!(again < hard && hard < good && good < easy);
        assert!(again < s);
        assert!(good > s);
        assert_approx(good, 1.7653, 1e-3);
    }
}
