use std::fmt;

use num_complex::Complex64;
use tracing::debug;

/// Maximum element-wise error below which a transform result is accepted.
pub const DEFAULT_TOLERANCE: f64 = 1e-5;

/// Outcome of comparing a transform result against a reference.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Validation {
    max_error: f64,
    tolerance: f64,
}

impl Validation {
    /// Largest absolute difference between corresponding elements.
    ///
    /// NaN if any compared element was NaN.
    #[must_use]
    pub fn max_error(&self) -> f64 {
        self.max_error
    }

    /// The tolerance the result was validated against.
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Whether the maximum error is below the tolerance.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.max_error < self.tolerance
    }
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.passed() { "passed" } else { "failed" };

        write!(
            f,
            "{verdict} (max error {:.3e}, tolerance {:.1e})",
            self.max_error, self.tolerance
        )
    }
}

/// Compares `result` against `reference` element by element.
///
/// # Panics
///
/// Panics if the two slices differ in length.
#[must_use]
#[expect(
    clippy::arithmetic_side_effects,
    reason = "complex subtraction cannot panic"
)]
pub fn validate(result: &[Complex64], reference: &[Complex64], tolerance: f64) -> Validation {
    assert_eq!(
        result.len(),
        reference.len(),
        "result and reference must have the same length"
    );

    let max_error = result
        .iter()
        .zip(reference)
        .map(|(actual, expected)| (*actual - *expected).norm())
        .fold(0.0, |max, error| {
            // NaN must poison the result instead of being skipped like f64::max would.
            if error.is_nan() || error > max {
                error
            } else {
                max
            }
        });

    let validation = Validation {
        max_error,
        tolerance,
    };

    debug!(
        max_error,
        tolerance,
        passed = validation.passed(),
        "FFT result validated"
    );

    validation
}

/// The benchmark input signal `sin(0.1 i) + sin(0.5 i)` for `i` in `0..len`, as real-valued
/// complex samples.
#[must_use]
pub fn test_signal(len: usize) -> Vec<Complex64> {
    (0..len)
        .map(|index| {
            #[expect(
                clippy::cast_precision_loss,
                reason = "signal lengths are far below 2^52, where f64 is still exact"
            )]
            let x = index as f64;

            Complex64::new((0.1 * x).sin() + (0.5 * x).sin(), 0.0)
        })
        .collect()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    #![allow(clippy::indexing_slicing, reason = "panic is fine in tests")]

    use super::*;

    #[test]
    fn identical_inputs_pass_with_zero_error() {
        let signal = test_signal(32);
        let validation = validate(&signal, &signal, DEFAULT_TOLERANCE);

        assert!(validation.passed());
        assert!(validation.max_error().abs() < f64::EPSILON);
    }

    #[test]
    fn reports_largest_error() {
        let expected = vec![Complex64::new(0.0, 0.0); 3];
        let actual = vec![
            Complex64::new(0.0, 0.0),
            Complex64::new(3.0, 4.0),
            Complex64::new(0.0, 1.0),
        ];

        let validation = validate(&actual, &expected, 1.0);

        assert!(!validation.passed());
        assert!((validation.max_error() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn nan_fails_validation() {
        let expected = vec![Complex64::new(0.0, 0.0); 2];
        let actual = vec![Complex64::new(f64::NAN, 0.0), Complex64::new(0.0, 0.0)];

        let validation = validate(&actual, &expected, DEFAULT_TOLERANCE);

        assert!(validation.max_error().is_nan());
        assert!(!validation.passed());
    }

    #[test]
    #[should_panic]
    fn length_mismatch_panics() {
        let a = test_signal(4);
        let b = test_signal(8);

        _ = validate(&a, &b, DEFAULT_TOLERANCE);
    }

    #[test]
    fn display_includes_verdict() {
        let signal = test_signal(4);
        let text = validate(&signal, &signal, DEFAULT_TOLERANCE).to_string();

        assert!(text.starts_with("passed"));
    }

    #[test]
    fn signal_starts_at_zero() {
        let signal = test_signal(3);

        assert_eq!(signal.len(), 3);
        assert!(signal[0].norm() < f64::EPSILON);
        assert!(signal.iter().all(|sample| sample.im.abs() < f64::EPSILON));
    }
}
