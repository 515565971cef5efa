//! Tie-point grids: coarse regular grids of sampled values (geolocation,
//! incidence angles) bilinearly interpolated to full resolution, so
//! per-pixel geolocation never has to be computed everywhere.

use crate::types::{FmtResult, FormatError};
use ndarray::Array2;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A coarse grid of samples anchored to the full-resolution raster by an
/// offset and a sub-sampling factor per axis.
#[derive(Debug, Clone)]
pub struct TiePointGrid {
    pub name: String,
    grid_width: usize,
    grid_height: usize,
    offset_x: f64,
    offset_y: f64,
    sub_sampling_x: f64,
    sub_sampling_y: f64,
    data: Array2<f64>,
}

impl TiePointGrid {
    pub fn new(
        name: &str,
        grid_width: usize,
        grid_height: usize,
        offset_x: f64,
        offset_y: f64,
        sub_sampling_x: f64,
        sub_sampling_y: f64,
        samples: Vec<f64>,
    ) -> FmtResult<Self> {
        if grid_width < 2 || grid_height < 2 {
            return Err(FormatError::Header(format!(
                "tie-point grid '{}' must be at least 2x2, got {}x{}",
                name, grid_width, grid_height
            )));
        }
        if samples.len() != grid_width * grid_height {
            return Err(FormatError::Header(format!(
                "tie-point grid '{}': {} samples for a {}x{} grid",
                name,
                samples.len(),
                grid_width,
                grid_height
            )));
        }
        if sub_sampling_x <= 0.0 || sub_sampling_y <= 0.0 {
            return Err(FormatError::Header(format!(
                "tie-point grid '{}': non-positive sub-sampling",
                name
            )));
        }
        let data = Array2::from_shape_vec((grid_height, grid_width), samples)
            .map_err(|e| FormatError::Header(format!("tie-point grid '{}': {}", name, e)))?;
        Ok(Self {
            name: name.to_string(),
            grid_width,
            grid_height,
            offset_x,
            offset_y,
            sub_sampling_x,
            sub_sampling_y,
            data,
        })
    }

    pub fn grid_width(&self) -> usize {
        self.grid_width
    }

    pub fn grid_height(&self) -> usize {
        self.grid_height
    }

    pub fn sample(&self, col: usize, row: usize) -> f64 {
        self.data[(row, col)]
    }

    /// Bilinearly interpolated value at a full-resolution pixel position.
    /// Positions outside the grid clamp to the border samples.
    pub fn value_at(&self, pixel_x: f64, pixel_y: f64) -> f64 {
        let fx = ((pixel_x - self.offset_x) / self.sub_sampling_x)
            .clamp(0.0, (self.grid_width - 1) as f64);
        let fy = ((pixel_y - self.offset_y) / self.sub_sampling_y)
            .clamp(0.0, (self.grid_height - 1) as f64);

        let x0 = (fx.floor() as usize).min(self.grid_width - 2);
        let y0 = (fy.floor() as usize).min(self.grid_height - 2);
        let wx = fx - x0 as f64;
        let wy = fy - y0 as f64;

        let v00 = self.data[(y0, x0)];
        let v10 = self.data[(y0, x0 + 1)];
        let v01 = self.data[(y0 + 1, x0)];
        let v11 = self.data[(y0 + 1, x0 + 1)];

        v00 * (1.0 - wx) * (1.0 - wy)
            + v10 * wx * (1.0 - wy)
            + v01 * (1.0 - wx) * wy
            + v11 * wx * wy
    }

    /// Synthesize a full-resolution grid by bilinear interpolation over
    /// normalized row/column fractions.
    pub fn upsample(&self, width: usize, height: usize) -> FmtResult<Array2<f64>> {
        if width == 0 || height == 0 {
            return Err(FormatError::Header(format!(
                "tie-point grid '{}': upsample target {}x{} is empty",
                self.name, width, height
            )));
        }
        log::debug!(
            "upsampling tie-point grid '{}' {}x{} -> {}x{}",
            self.name,
            self.grid_width,
            self.grid_height,
            width,
            height
        );

        let mut out = Array2::zeros((height, width));

        #[cfg(feature = "parallel")]
        {
            out.axis_iter_mut(ndarray::Axis(0))
                .into_par_iter()
                .enumerate()
                .for_each(|(y, mut row)| {
                    for x in 0..width {
                        row[x] = self.value_at(x as f64 + 0.5, y as f64 + 0.5);
                    }
                });
        }
        #[cfg(not(feature = "parallel"))]
        {
            for y in 0..height {
                for x in 0..width {
                    out[(y, x)] = self.value_at(x as f64 + 0.5, y as f64 + 0.5);
                }
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn ramp_grid() -> TiePointGrid {
        // 3x3 grid over a 20x20 raster, values = col * 10 + row.
        let samples = vec![
            0.0, 10.0, 20.0, //
            1.0, 11.0, 21.0, //
            2.0, 12.0, 22.0,
        ];
        TiePointGrid::new("ramp", 3, 3, 0.5, 0.5, 10.0, 10.0, samples).unwrap()
    }

    #[test]
    fn test_value_at_grid_nodes() {
        let grid = ramp_grid();
        assert_abs_diff_eq!(grid.value_at(0.5, 0.5), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(grid.value_at(10.5, 0.5), 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(grid.value_at(20.5, 20.5), 22.0, epsilon = 1e-12);
    }

    #[test]
    fn test_value_at_midpoint() {
        let grid = ramp_grid();
        // Halfway between the first two columns.
        assert_abs_diff_eq!(grid.value_at(5.5, 0.5), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_clamping_outside_grid() {
        let grid = ramp_grid();
        assert_abs_diff_eq!(grid.value_at(-5.0, -5.0), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(grid.value_at(100.0, 100.0), 22.0, epsilon = 1e-12);
    }

    #[test]
    fn test_upsample_is_bilinear() {
        let grid = ramp_grid();
        let fine = grid.upsample(20, 20).unwrap();
        assert_eq!(fine.dim(), (20, 20));
        for y in 0..20 {
            for x in 0..20 {
                let expected = grid.value_at(x as f64 + 0.5, y as f64 + 0.5);
                assert_abs_diff_eq!(fine[(y, x)], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_bad_sample_count_rejected() {
        let r = TiePointGrid::new("bad", 3, 3, 0.0, 0.0, 10.0, 10.0, vec![0.0; 8]);
        assert!(r.is_err());
    }

    #[test]
    fn test_degenerate_grid_rejected() {
        let r = TiePointGrid::new("bad", 1, 3, 0.0, 0.0, 10.0, 10.0, vec![0.0; 3]);
        assert!(r.is_err());
    }
}
