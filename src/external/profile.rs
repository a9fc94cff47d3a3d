//! Vertical-profile physics collaborator (§6's out-of-scope primitives,
//! **[ADDED]** as a trait since the builtin demonstration conversions and
//! the round-trip properties R1–R3 need *something* concrete to test
//! against). [`Simple`] is a reference/test implementation of the exact
//! formulas given in §8, not a physically complete profile library — real
//! altitude/pressure/geopotential relationships stay out of scope.

use crate::error::{CoreError, ErrorKind};

pub trait VerticalProfileOps: Send + Sync {
    /// `R1`: builds layer bounds from level midpoints. Requires at least
    /// two levels (the boundary levels need a neighbor to extrapolate from).
    fn altitude_bounds_from_altitude(&self, profile: &[f64]) -> Result<Vec<(f64, f64)>, CoreError>;

    /// `R2`: sums partial-column contributions, ignoring NaN; NaN only if
    /// every contribution is NaN.
    fn column_from_partial_column(&self, partial: &[f64]) -> f64;

    /// `R3`: volume-mixing-ratio covariance to number-density covariance,
    /// given the (temperature/pressure-derived) number density profile
    /// `n`. Row-major `n.len() x n.len()` matrices.
    fn vmr_cov_to_nd_cov(&self, vmr_cov: &[f64], n: &[f64]) -> Result<Vec<f64>, CoreError>;

    /// `R3`: the exact inverse of [`Self::vmr_cov_to_nd_cov`] when `n` (and
    /// so the temperature/pressure it was derived from) is held fixed.
    fn nd_cov_to_vmr_cov(&self, nd_cov: &[f64], n: &[f64]) -> Result<Vec<f64>, CoreError>;
}

/// Reference implementation used by this crate's builtin demonstration
/// conversions and by the tests exercising R1–R3.
pub struct Simple;

impl VerticalProfileOps for Simple {
    fn altitude_bounds_from_altitude(&self, profile: &[f64]) -> Result<Vec<(f64, f64)>, CoreError> {
        let n = profile.len();
        if n < 2 {
            return Err(CoreError::with_message(
                ErrorKind::InvalidArgument,
                "altitude_bounds_from_altitude requires at least two levels",
            ));
        }
        let mut bounds = Vec::with_capacity(n);
        for k in 0..n {
            let lower = if k == 0 { profile[0] - (profile[1] - profile[0]) / 2.0 } else { (profile[k - 1] + profile[k]) / 2.0 };
            let upper =
                if k == n - 1 { profile[n - 1] + (profile[n - 1] - profile[n - 2]) / 2.0 } else { (profile[k] + profile[k + 1]) / 2.0 };
            bounds.push((lower, upper));
        }
        Ok(bounds)
    }

    fn column_from_partial_column(&self, partial: &[f64]) -> f64 {
        let mut sum = 0.0;
        let mut any_valid = false;
        for &value in partial {
            if !value.is_nan() {
                sum += value;
                any_valid = true;
            }
        }
        if any_valid {
            sum
        } else {
            f64::NAN
        }
    }

    fn vmr_cov_to_nd_cov(&self, vmr_cov: &[f64], n: &[f64]) -> Result<Vec<f64>, CoreError> {
        let len = n.len();
        if vmr_cov.len() != len * len {
            return Err(CoreError::with_message(
                ErrorKind::ArrayRankMismatch,
                format!("vmr_cov has {} elements, expected {}", vmr_cov.len(), len * len),
            ));
        }
        let mut out = vec![0.0; len * len];
        for i in 0..len {
            for j in 0..len {
                out[i * len + j] = n[i] * vmr_cov[i * len + j] * n[j];
            }
        }
        Ok(out)
    }

    fn nd_cov_to_vmr_cov(&self, nd_cov: &[f64], n: &[f64]) -> Result<Vec<f64>, CoreError> {
        let len = n.len();
        if nd_cov.len() != len * len {
            return Err(CoreError::with_message(
                ErrorKind::ArrayRankMismatch,
                format!("nd_cov has {} elements, expected {}", nd_cov.len(), len * len),
            ));
        }
        let mut out = vec![0.0; len * len];
        for i in 0..len {
            for j in 0..len {
                if n[i] == 0.0 || n[j] == 0.0 {
                    return Err(CoreError::with_message(ErrorKind::InvalidArgument, "zero number density cannot be inverted"));
                }
                out[i * len + j] = nd_cov[i * len + j] / (n[i] * n[j]);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn r1_matches_scenario_2() {
        let bounds = Simple.altitude_bounds_from_altitude(&[1000.0, 2000.0, 3000.0]).unwrap();
        assert_eq!(bounds, vec![(500.0, 1500.0), (1500.0, 2500.0), (2500.0, 3500.0)]);
    }

    #[test]
    fn r1_midpoint_matches_interior_formula() {
        let profile = [1000.0, 2000.0, 3000.0, 4000.0];
        let bounds = Simple.altitude_bounds_from_altitude(&profile).unwrap();
        for k in 1..profile.len() - 1 {
            let midpoint = (bounds[k].0 + bounds[k].1) / 2.0;
            let expected = (profile[k - 1] + 2.0 * profile[k] + profile[k + 1]) / 4.0;
            assert!((midpoint - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn r2_matches_scenario_3() {
        assert_eq!(Simple.column_from_partial_column(&[f64::NAN, 2.0, 3.0, f64::NAN]), 5.0);
        assert!(Simple.column_from_partial_column(&[f64::NAN, f64::NAN]).is_nan());
    }

    #[test]
    fn r3_round_trips_with_fixed_number_density() {
        let n = [1.0, 2.0, 3.0];
        let vmr_cov = vec![1.0, 0.5, 0.2, 0.5, 1.0, 0.3, 0.2, 0.3, 1.0];
        let nd_cov = Simple.vmr_cov_to_nd_cov(&vmr_cov, &n).unwrap();
        let roundtrip = Simple.nd_cov_to_vmr_cov(&nd_cov, &n).unwrap();
        for (a, b) in vmr_cov.iter().zip(roundtrip.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }
}
