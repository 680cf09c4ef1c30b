//! Standard normal distribution primitives

use std::f64::consts::{PI, SQRT_2};

const A1: f64 = 0.254829592;
const A2: f64 = -0.284496736;
const A3: f64 = 1.421413741;
const A4: f64 = -1.453152027;
const A5: f64 = 1.061405429;
const P: f64 = 0.3275911;

/// Standard normal CDF.
///
/// Abramowitz-Stegun 7.1.26 rational approximation of `erf`, folded through
/// `Φ(x) = 0.5 * (1 + sign(x) * erf(|x| / √2))`. Absolute error is below
/// 7.5e-8 over the whole real line.
pub fn norm_cdf(x: f64) -> f64 {
    let z = x.abs() / SQRT_2;
    let t = 1.0 / (1.0 + P * z);
    let poly = ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t;
    let erf = 1.0 - poly * (-z * z).exp();

    0.5 * (1.0 + sign(x) * erf)
}

/// Standard normal PDF
pub fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

// f64::signum maps 0.0 to 1.0, which would skew Φ(0).
fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_norm_cdf_at_zero() {
        assert!((norm_cdf(0.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_norm_cdf_symmetry() {
        for i in -80..=80 {
            let x = i as f64 * 0.1;
            assert!(
                (norm_cdf(-x) - (1.0 - norm_cdf(x))).abs() < 1e-6,
                "symmetry broken at x = {}",
                x
            );
        }
    }

    #[test]
    fn test_norm_cdf_known_values() {
        assert!((norm_cdf(1.0) - 0.841344746).abs() < 1e-7);
        assert!((norm_cdf(-1.96) - 0.024997895).abs() < 1e-7);
        assert!((norm_cdf(2.5) - 0.993790335).abs() < 1e-7);
    }

    #[test]
    fn test_norm_cdf_extreme() {
        assert!((norm_cdf(10.0) - 1.0).abs() < 1e-10);
        assert!(norm_cdf(-10.0).abs() < 1e-10);
    }

    #[test]
    fn test_norm_cdf_monotonic() {
        let mut prev = norm_cdf(-6.0);
        for i in -59..=60 {
            let next = norm_cdf(i as f64 * 0.1);
            assert!(next >= prev);
            prev = next;
        }
    }

    #[test]
    fn test_norm_pdf_peak() {
        assert!((norm_pdf(0.0) - 0.398942280).abs() < 1e-9);
        assert!((norm_pdf(1.5) - norm_pdf(-1.5)).abs() < 1e-15);
    }
}
