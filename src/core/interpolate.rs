//! Orbit state vector interpolation.
//!
//! Regular-interval vectors (binary orbit products) use a four-point
//! cubic; irregularly spaced vectors use a Lagrange window. Both refuse
//! to extrapolate outside the available time range.

use crate::types::{utc_from_mjd, FmtResult, FormatError, OrbitVector};

/// Four-point cubic through `y1..y2` at normalized parameter `mu` in [0, 1].
///
/// `interpolate_cubic(.., 0.0) == y1` and `interpolate_cubic(.., 1.0) == y2`.
pub fn interpolate_cubic(y0: f64, y1: f64, y2: f64, y3: f64, mu: f64) -> f64 {
    let mu2 = mu * mu;
    let a0 = y3 - y2 - y0 + y1;
    let a1 = y0 - y1 - a0;
    let a2 = y2 - y0;
    let a3 = y1;
    a0 * mu * mu2 + a1 * mu2 + a2 * mu + a3
}

/// Lagrange polynomial interpolation over a caller-selected window.
///
/// `times` must be pairwise distinct; the polynomial passes through every
/// `(times[i], values[i])` sample exactly.
pub fn lagrange_interpolate(times: &[f64], values: &[f64], t: f64) -> f64 {
    debug_assert_eq!(times.len(), values.len());
    let n = times.len();
    let mut result = 0.0;
    for i in 0..n {
        let mut li = 1.0;
        for j in 0..n {
            if i != j {
                li *= (t - times[j]) / (times[i] - times[j]);
            }
        }
        result += li * values[i];
    }
    result
}

/// A validated, strictly time-ordered array of orbit state vectors.
#[derive(Debug, Clone)]
pub struct OrbitVectors {
    vectors: Vec<OrbitVector>,
    times: Vec<f64>,
}

impl OrbitVectors {
    /// Wrap a vector array, rejecting duplicate or unordered timestamps
    /// before any interpolation can run against them.
    pub fn new(vectors: Vec<OrbitVector>) -> FmtResult<Self> {
        if vectors.is_empty() {
            return Err(FormatError::Header("empty orbit vector array".to_string()));
        }
        for pair in vectors.windows(2) {
            if pair[1].mjd <= pair[0].mjd {
                return Err(FormatError::NonMonotonicTime);
            }
        }
        let times = vectors.iter().map(|v| v.mjd).collect();
        Ok(Self { vectors, times })
    }

    pub fn vectors(&self) -> &[OrbitVector] {
        &self.vectors
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// First and last available epochs (MJD).
    pub fn time_range(&self) -> (f64, f64) {
        (self.times[0], self.times[self.times.len() - 1])
    }

    fn out_of_range(&self, mjd: f64) -> FormatError {
        let (start, end) = self.time_range();
        FormatError::OutOfRange { mjd, start, end }
    }

    /// Index of the first sample with time > `mjd`, via binary search.
    fn upper_bound(&self, mjd: f64) -> usize {
        self.times.partition_point(|&t| t <= mjd)
    }

    /// State vector at `mjd` by cubic interpolation over the four nearest
    /// bracketing samples. An exact time hit returns that sample directly;
    /// a window falling outside the array bounds is an out-of-range error,
    /// never an extrapolation.
    pub fn at(&self, mjd: f64) -> FmtResult<OrbitVector> {
        // NaN/inf would poison the binary search comparisons.
        if !mjd.is_finite() {
            return Err(self.out_of_range(mjd));
        }
        // Exact hit short-circuits the window arithmetic.
        if let Ok(i) = self
            .times
            .binary_search_by(|t| t.partial_cmp(&mjd).unwrap())
        {
            return Ok(self.vectors[i]);
        }

        let upper = self.upper_bound(mjd);
        // Need samples [upper-2, upper+1] so mjd lies between y1 and y2.
        if upper < 2 || upper > self.vectors.len() - 2 {
            return Err(self.out_of_range(mjd));
        }
        let i1 = upper - 1;
        let (t1, t2) = (self.times[i1], self.times[i1 + 1]);
        let mu = (mjd - t1) / (t2 - t1);

        let mut position = [0.0; 3];
        let mut velocity = [0.0; 3];
        for c in 0..3 {
            position[c] = interpolate_cubic(
                self.vectors[i1 - 1].position[c],
                self.vectors[i1].position[c],
                self.vectors[i1 + 1].position[c],
                self.vectors[i1 + 2].position[c],
                mu,
            );
            velocity[c] = interpolate_cubic(
                self.vectors[i1 - 1].velocity[c],
                self.vectors[i1].velocity[c],
                self.vectors[i1 + 1].velocity[c],
                self.vectors[i1 + 2].velocity[c],
                mu,
            );
        }

        Ok(OrbitVector {
            utc: utc_from_mjd(mjd),
            mjd,
            position,
            velocity,
        })
    }

    /// State vector at `mjd` by Lagrange interpolation over a window of up
    /// to eight samples centered on the target epoch; used for irregularly
    /// spaced vectors. Rejects targets outside the available range.
    pub fn at_lagrange(&self, mjd: f64) -> FmtResult<OrbitVector> {
        let (start, end) = self.time_range();
        // The range guard alone lets NaN through (both comparisons false).
        if !mjd.is_finite() || mjd < start || mjd > end {
            return Err(self.out_of_range(mjd));
        }
        if let Ok(i) = self
            .times
            .binary_search_by(|t| t.partial_cmp(&mjd).unwrap())
        {
            return Ok(self.vectors[i]);
        }

        let n = self.vectors.len();
        let window = n.min(8);
        let upper = self.upper_bound(mjd);
        let half = window / 2;
        let lo = upper.saturating_sub(half).min(n - window);

        let times = &self.times[lo..lo + window];
        let mut position = [0.0; 3];
        let mut velocity = [0.0; 3];
        for c in 0..3 {
            let pos: Vec<f64> = self.vectors[lo..lo + window]
                .iter()
                .map(|v| v.position[c])
                .collect();
            let vel: Vec<f64> = self.vectors[lo..lo + window]
                .iter()
                .map(|v| v.velocity[c])
                .collect();
            position[c] = lagrange_interpolate(times, &pos, mjd);
            velocity[c] = lagrange_interpolate(times, &vel, mjd);
        }

        Ok(OrbitVector {
            utc: utc_from_mjd(mjd),
            mjd,
            position,
            velocity,
        })
    }
}
