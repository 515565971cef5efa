//! Newton refinement of a target position against a measured slant range.
//!
//! Tie-point geolocation gives an approximate target; the accuracy-critical
//! step slides it along the sensor line of sight until the implied range
//! matches the measured one.

use crate::core::geodesy::distance;
use crate::types::{FmtResult, FormatError};

/// Convergence tolerance on the range residual, in meters.
pub const RANGE_TOLERANCE_M: f64 = 0.001;
/// Iteration cap; the residual is linear along the line of sight, so
/// anything near the cap indicates degenerate inputs.
pub const MAX_ITERATIONS: usize = 10;

/// Adjust `target` along the sensor-to-target line of sight until its
/// distance to `sensor_pos` matches `slant_range` within tolerance.
///
/// Returns the refined Cartesian position. Fails if the sensor and target
/// coincide (no line of sight) or the iteration does not converge.
pub fn refine_target_position(
    target: &[f64; 3],
    sensor_pos: &[f64; 3],
    slant_range: f64,
) -> FmtResult<[f64; 3]> {
    if slant_range <= 0.0 {
        return Err(FormatError::Header(format!(
            "non-positive slant range {}",
            slant_range
        )));
    }

    let mut refined = *target;
    let initial = distance(sensor_pos, target);
    if initial < 1e-6 {
        return Err(FormatError::Header(
            "sensor and target coincide; line of sight undefined".to_string(),
        ));
    }

    // Unit line-of-sight direction, fixed from the initial geometry.
    let los = [
        (target[0] - sensor_pos[0]) / initial,
        (target[1] - sensor_pos[1]) / initial,
        (target[2] - sensor_pos[2]) / initial,
    ];

    for iteration in 0..MAX_ITERATIONS {
        let implied = distance(sensor_pos, &refined);
        let residual = slant_range - implied;
        if residual.abs() < RANGE_TOLERANCE_M {
            log::debug!(
                "slant-range refinement converged after {} iterations (residual {:.6} m)",
                iteration,
                residual
            );
            return Ok(refined);
        }
        refined[0] += los[0] * residual;
        refined[1] += los[1] * residual;
        refined[2] += los[2] * residual;
    }

    Err(FormatError::Header(format!(
        "slant-range refinement did not converge within {} iterations",
        MAX_ITERATIONS
    )))
}
