//! WGS84 geodetic <-> Cartesian (ECEF) conversions.
//!
//! Angle units are degrees at the API boundary and radians internally;
//! distances are meters throughout.

use crate::types::GeoPos;

/// WGS84 semi-major axis in meters.
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 first eccentricity squared.
pub const WGS84_E2: f64 = 0.00669437999014;

/// WGS84 semi-minor axis derived from `WGS84_A` and `WGS84_E2`.
pub const WGS84_B: f64 = 6_356_752.314245;

/// Convert a geodetic position (degrees, meters above ellipsoid) to
/// Earth-centered Cartesian coordinates. Standard closed form.
pub fn geodetic_to_cartesian(lat: f64, lon: f64, alt: f64) -> [f64; 3] {
    let lat_rad = lat.to_radians();
    let lon_rad = lon.to_radians();
    let sin_lat = lat_rad.sin();
    let cos_lat = lat_rad.cos();

    // Prime vertical radius of curvature
    let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();

    [
        (n + alt) * cos_lat * lon_rad.cos(),
        (n + alt) * cos_lat * lon_rad.sin(),
        (n * (1.0 - WGS84_E2) + alt) * sin_lat,
    ]
}

/// Convert Earth-centered Cartesian coordinates back to a geodetic
/// position and altitude.
///
/// Single-pass closed form (Bowring's approximation), no iterative
/// refinement. Callers needing higher accuracy apply the separate Newton
/// slant-range refinement.
pub fn cartesian_to_geodetic(xyz: &[f64; 3]) -> (GeoPos, f64) {
    let [x, y, z] = *xyz;
    let p = (x * x + y * y).sqrt();

    if p < 1e-9 {
        // On the polar axis the longitude is arbitrary.
        let lat = if z >= 0.0 { 90.0 } else { -90.0 };
        return (GeoPos::new(lat, 0.0), z.abs() - WGS84_B);
    }

    let ep2 = (WGS84_A * WGS84_A - WGS84_B * WGS84_B) / (WGS84_B * WGS84_B);
    let theta = (z * WGS84_A).atan2(p * WGS84_B);
    let sin_theta = theta.sin();
    let cos_theta = theta.cos();

    let lat_rad = (z + ep2 * WGS84_B * sin_theta.powi(3))
        .atan2(p - WGS84_E2 * WGS84_A * cos_theta.powi(3));
    let lon_rad = y.atan2(x);

    let sin_lat = lat_rad.sin();
    let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
    let alt = p / lat_rad.cos() - n;

    (GeoPos::new(lat_rad.to_degrees(), lon_rad.to_degrees()), alt)
}

/// Euclidean distance between two Cartesian points.
pub fn distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_equator_prime_meridian() {
        let xyz = geodetic_to_cartesian(0.0, 0.0, 0.0);
        assert_abs_diff_eq!(xyz[0], WGS84_A, epsilon = 1e-6);
        assert_abs_diff_eq!(xyz[1], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(xyz[2], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_north_pole() {
        let xyz = geodetic_to_cartesian(90.0, 0.0, 0.0);
        assert_abs_diff_eq!(xyz[2], WGS84_B, epsilon = 1e-3);
        let (geo, alt) = cartesian_to_geodetic(&xyz);
        assert_abs_diff_eq!(geo.lat, 90.0, epsilon = 1e-6);
        assert_abs_diff_eq!(alt, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_round_trip_grid() {
        // Recover (lat, lon) within 1e-3 degrees at alt 0 over the full
        // domain. Bowring is far tighter in practice.
        let mut lat = -90.0;
        while lat <= 90.0 {
            let mut lon = -180.0;
            while lon <= 180.0 {
                let xyz = geodetic_to_cartesian(lat, lon, 0.0);
                let (geo, _) = cartesian_to_geodetic(&xyz);
                assert_abs_diff_eq!(geo.lat, lat, epsilon = 1e-3);
                if lat.abs() < 90.0 - 1e-9 {
                    // Longitude is undefined at the poles.
                    let mut dlon = (geo.lon - lon).abs();
                    if dlon > 180.0 {
                        dlon = 360.0 - dlon;
                    }
                    assert!(dlon < 1e-3, "lon {} vs {}", geo.lon, lon);
                }
                lon += 15.0;
            }
            lat += 15.0;
        }
    }

    #[test]
    fn test_altitude_recovery() {
        let xyz = geodetic_to_cartesian(45.0, 7.5, 2500.0);
        let (geo, alt) = cartesian_to_geodetic(&xyz);
        assert_abs_diff_eq!(geo.lat, 45.0, epsilon = 1e-6);
        assert_abs_diff_eq!(geo.lon, 7.5, epsilon = 1e-6);
        assert_abs_diff_eq!(alt, 2500.0, epsilon = 0.1);
    }
}
