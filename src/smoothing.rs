//! Edge-preserving color smoothing over a voxel set.

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::error::{Result, VoxelError};
use crate::grid::GridIndex;
use crate::voxelize::VoxelRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoothConfig {
    /// Half edge of the neighborhood cube, in cells.
    pub radius: u32,
    /// Color difference falloff, [0, 1] color scale.
    pub sigma_color: f64,
    /// Spatial falloff, in cells.
    pub sigma_space: f64,
}

impl Default for SmoothConfig {
    fn default() -> Self {
        Self {
            radius: 1,
            sigma_color: 0.5,
            sigma_space: 1.0,
        }
    }
}

impl SmoothConfig {
    pub fn with_radius(mut self, radius: u32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_sigma_color(mut self, sigma: f64) -> Self {
        self.sigma_color = sigma;
        self
    }

    pub fn with_sigma_space(mut self, sigma: f64) -> Self {
        self.sigma_space = sigma;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.sigma_color.is_finite() && self.sigma_color > 0.0) {
            return Err(VoxelError::config(format!(
                "sigma_color must be positive, got {}",
                self.sigma_color
            )));
        }
        if !(self.sigma_space.is_finite() && self.sigma_space > 0.0) {
            return Err(VoxelError::config(format!(
                "sigma_space must be positive, got {}",
                self.sigma_space
            )));
        }
        if self.radius > 16 {
            return Err(VoxelError::config(format!(
                "smoothing radius {} is too large (max 16)",
                self.radius
            )));
        }
        Ok(())
    }
}

/// Bilateral filter over the colors of `records`. Each color becomes the
/// weighted mean of the occupied cells within `radius`, weighted by spatial
/// distance and color similarity. Indices and variances are kept.
pub fn smooth_colors(records: &[VoxelRecord], config: &SmoothConfig) -> Result<Vec<VoxelRecord>> {
    config.validate()?;

    let mut colors: FxHashMap<GridIndex, Rgb> = FxHashMap::default();
    for record in records {
        colors.entry(record.index).or_insert(record.color);
    }

    let r = config.radius as i32;
    let space_denom = 2.0 * config.sigma_space * config.sigma_space;
    let color_denom = 2.0 * config.sigma_color * config.sigma_color;

    let smoothed = records
        .par_iter()
        .map(|record| {
            let center = record.color;
            let mut sum = [0.0f64; 3];
            let mut weight_sum = 0.0;

            for dx in -r..=r {
                for dy in -r..=r {
                    for dz in -r..=r {
                        let Some(&neighbor) = record
                            .index
                            .offset(dx, dy, dz)
                            .and_then(|index| colors.get(&index))
                        else {
                            continue;
                        };
                        let d2 = (dx * dx + dy * dy + dz * dz) as f64;
                        let c = center.distance(neighbor);
                        let w = (-d2 / space_denom).exp() * (-(c * c) / color_denom).exp();
                        sum[0] += neighbor.r * w;
                        sum[1] += neighbor.g * w;
                        sum[2] += neighbor.b * w;
                        weight_sum += w;
                    }
                }
            }

            let mut out = *record;
            if weight_sum > 0.0 {
                out.color = Rgb::new(sum[0] / weight_sum, sum[1] / weight_sum, sum[2] / weight_sum);
            }
            out
        })
        .collect();

    Ok(smoothed)
}
