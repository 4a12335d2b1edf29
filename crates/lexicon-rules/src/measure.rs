use serde::Serialize;

/// Allowed distance between the frequency sum and 1.0 for multi-meaning entries.
pub const FREQUENCY_TOLERANCE: f64 = 0.01;

/// Count whitespace-delimited tokens. Punctuation stays attached to its word.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Outcome of a frequency normalization check.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FrequencyCheck {
    pub sum: f64,
    pub passed: bool,
}

/// Check that `weights` form a distribution over an entry's meanings.
///
/// A single weight must be exactly `1.0`; longer sequences may drift from 1.0
/// by at most [`FREQUENCY_TOLERANCE`]. An empty sequence never passes, and
/// neither does one holding a negative or non-finite weight.
pub fn check_frequencies(weights: &[f64]) -> FrequencyCheck {
    let sum: f64 = weights.iter().sum();
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return FrequencyCheck { sum, passed: false };
    }
    let passed = match weights {
        [] => false,
        [only] => *only == 1.0,
        // EPSILON keeps sums like 0.5 + 0.51 on the inclusive boundary.
        _ => (sum - 1.0).abs() <= FREQUENCY_TOLERANCE + f64::EPSILON,
    };
    FrequencyCheck { sum, passed }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_whitespace_tokens() {
        assert_eq!(count_words("a b  c"), 3);
        assert_eq!(count_words(""), 0);
        assert_eq!(count_words("   \t\n"), 0);
        assert_eq!(count_words("Wait, and then?"), 3);
        assert_eq!(count_words("either...or"), 1);
    }

    #[test]
    fn single_weight_must_be_exact() {
        assert!(check_frequencies(&[1.0]).passed);
        assert!(!check_frequencies(&[0.995]).passed);
        assert!(!check_frequencies(&[1.005]).passed);
    }

    #[test]
    fn multiple_weights_allow_rounding() {
        assert!(check_frequencies(&[0.7, 0.2, 0.1]).passed);
        assert!(check_frequencies(&[0.33, 0.33, 0.33]).passed);
        assert!(check_frequencies(&[0.5, 0.51]).passed);
        let check = check_frequencies(&[0.6, 0.3]);
        assert!(!check.passed);
        assert!((check.sum - 0.9).abs() < 1e-9);
    }

    #[test]
    fn empty_and_non_finite_weights_fail() {
        assert!(!check_frequencies(&[]).passed);
        assert!(!check_frequencies(&[f64::NAN, 1.0]).passed);
        assert!(!check_frequencies(&[f64::INFINITY, f64::NEG_INFINITY]).passed);
    }

    #[test]
    fn negative_weights_fail_even_when_the_sum_is_one() {
        let check = check_frequencies(&[1.5, -0.5]);
        assert!(!check.passed);
        assert_eq!(check.sum, 1.0);
        assert!(check_frequencies(&[1.0, -0.0]).passed);
    }
}
