use crate::error::{InvalidParametersSnafu, Result};

/// This is a slice for flexibility, but should always be 19 in length.
pub type Parameters = [f32];

pub const PARAMETER_COUNT: usize = 19;

/// Default FSRS-4.5 weight table. Index meaning:
///
/// - `w0..=w3`: initial stability per first rating (Again/Hard/Good/Easy)
/// - `w4`, `w5`: initial difficulty curve
/// - `w6`, `w7`: difficulty mean reversion
/// - `w8..=w10`: recall stability growth
/// - `w11..=w14`: post-lapse stability
/// - `w15`, `w16`: hard penalty / easy bonus
/// - `w17`, `w18`: fuzz bounds, reserved for personalization
pub const DEFAULT_PARAMETERS: [f32; PARAMETER_COUNT] = [
    0.4072, 1.1829, 3.1262, 15.4722, 7.2102, 0.5316, 1.0651, 0.0234, 1.616, 0.1544, 1.0824,
    1.9813, 0.0953, 0.2975, 2.2261, 0.2553, 0.0, 2.7, 0.05,
];

/// Exponent of the power forgetting curve.
pub const DECAY: f32 = -0.5;
/// `0.9^(1/DECAY) - 1`, the unique factor giving `R(t = S) = 0.9`.
pub const FACTOR: f32 = 19.0 / 81.0;

pub(crate) const S_MIN: f32 = 0.1;
pub(crate) const D_MIN: f32 = 1.0;
pub(crate) const D_MAX: f32 = 10.0;

/// Validates a caller-supplied weight table and returns it as a fixed-size
/// array. Personalized tables must have exactly [`PARAMETER_COUNT`] finite
/// entries.
pub fn check_parameters(parameters: &Parameters) -> Result<[f32; PARAMETER_COUNT]> {
    if parameters.len() != PARAMETER_COUNT {
        return InvalidParametersSnafu {
            reason: format!("expected {PARAMETER_COUNT} weights, got {}", parameters.len()),
        }
        .fail();
    }
    if let Some(index) = parameters.iter().position(|w| !w.is_finite()) {
        return InvalidParametersSnafu {
            reason: format!("weight {index} is not finite"),
        }
        .fail();
    }
    let mut table = [0.0; PARAMETER_COUNT];
    table.copy_from_slice(parameters);
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchedulerError;

    #[test]
    fn factor_matches_decay() {
        // FACTOR is defined so that retrievability hits 0.9 at t = stability.
        assert!((0.9f32.powf(1.0 / DECAY) - 1.0 - FACTOR).abs() < 1e-5);
    }

    #[test]
    fn default_table_is_accepted() {
        assert_eq!(
            check_parameters(&DEFAULT_PARAMETERS).unwrap(),
            DEFAULT_PARAMETERS
        );
    }

    #[test]
    fn wrong_length_is_rejected() {
        let err = check_parameters(&DEFAULT_PARAMETERS[..17]).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidParameters { .. }));
    }

    #[test]
    fn non_finite_weight_is_rejected() {
        let mut table = DEFAULT_PARAMETERS;
        table[8] = f32::NAN;
        let err = check_parameters(&table).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidParameters { .. }));
    }
}
