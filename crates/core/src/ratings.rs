//! Rating dimension validation.

use std::collections::BTreeMap;

use crate::error::CoreError;

/// Inclusive score bounds for a single rating dimension.
pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;

/// A set of named scores, e.g. `{"overall": 70, "captions": 55}`.
///
/// A `BTreeMap` keeps serialization deterministic across runs.
pub type Ratings = BTreeMap<String, f64>;

/// Validate every dimension name and score in a rating set.
pub fn validate_ratings(ratings: &Ratings) -> Result<(), CoreError> {
    for (dimension, score) in ratings {
        if dimension.trim().is_empty() {
            return Err(CoreError::Validation(
                "rating dimension name must not be empty".into(),
            ));
        }
        if !score.is_finite() || !(MIN_SCORE..=MAX_SCORE).contains(score) {
            return Err(CoreError::Validation(format!(
                "rating '{dimension}' must be between {MIN_SCORE} and {MAX_SCORE}, got {score}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratings(pairs: &[(&str, f64)]) -> Ratings {
        pairs
            .iter()
            .map(|(name, score)| (name.to_string(), *score))
            .collect()
    }

    #[test]
    fn accepts_scores_in_range() {
        assert!(validate_ratings(&ratings(&[("overall", 0.0), ("captions", 100.0)])).is_ok());
    }

    #[test]
    fn accepts_empty_rating_set() {
        assert!(validate_ratings(&Ratings::new()).is_ok());
    }

    #[test]
    fn rejects_out_of_range_scores() {
        assert!(validate_ratings(&ratings(&[("overall", 100.5)])).is_err());
        assert!(validate_ratings(&ratings(&[("overall", -1.0)])).is_err());
    }

    #[test]
    fn rejects_non_finite_scores() {
        assert!(validate_ratings(&ratings(&[("overall", f64::NAN)])).is_err());
        assert!(validate_ratings(&ratings(&[("overall", f64::INFINITY)])).is_err());
    }

    #[test]
    fn rejects_blank_dimension_name() {
        assert!(validate_ratings(&ratings(&[("  ", 50.0)])).is_err());
    }
}
