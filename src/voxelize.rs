//! Point cloud to colored voxel grid aggregation.
//!
//! Every point is bucketed into a coarse cell `floor(p / voxel_size)`. A
//! cell's color is the mean color of its points. In two-resolution mode each
//! point is also bucketed into a fine cell `floor(p / (voxel_size / F))`;
//! the fine cells whose index floor-divided by `F` equals a coarse index are
//! that coarse cell's children, and the coarse cell's variance is the mean
//! over channels of the per-channel population variance of its children's
//! colors.
//!
//! ```ignore
//! use voxblock::{PointCloud, VoxelizeConfig, Voxelizer};
//!
//! let grid = Voxelizer::new(VoxelizeConfig::new(0.05).with_subdivision(4))
//!     .voxelize(&cloud)?;
//! for record in grid.records() {
//!     println!("{} {:?} {:?}", record.index, record.color, record.variance);
//! }
//! ```

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::error::{Result, VoxelError};
use crate::grid::GridIndex;
use crate::point_cloud::PointCloud;
use crate::table::TableSchema;

/// Nesting factor between the coarse and the fine grid.
pub const DEFAULT_SUBDIVISION: u32 = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoxelizeConfig {
    /// Edge length of a coarse voxel, in mesh units.
    pub voxel_size: f64,
    /// Fine grid factor; `None` disables the variance pass.
    pub subdivision: Option<u32>,
}

impl Default for VoxelizeConfig {
    fn default() -> Self {
        Self {
            voxel_size: 1.0,
            subdivision: Some(DEFAULT_SUBDIVISION),
        }
    }
}

impl VoxelizeConfig {
    pub fn new(voxel_size: f64) -> Self {
        Self {
            voxel_size,
            ..Self::default()
        }
    }

    pub fn with_subdivision(mut self, factor: u32) -> Self {
        self.subdivision = Some(factor);
        self
    }

    pub fn single_resolution(mut self) -> Self {
        self.subdivision = None;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.voxel_size.is_finite() && self.voxel_size > 0.0) {
            return Err(VoxelError::config(format!(
                "voxel size must be a positive number, got {}",
                self.voxel_size
            )));
        }
        match self.subdivision {
            Some(0) => Err(VoxelError::config("subdivision factor must be at least 1")),
            Some(f) if f > i32::MAX as u32 => Err(VoxelError::config(format!(
                "subdivision factor {} is too large",
                f
            ))),
            _ => Ok(()),
        }
    }

    pub fn fine_voxel_size(&self) -> Option<f64> {
        self.subdivision.map(|f| self.voxel_size / f as f64)
    }
}

/// One occupied coarse cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoxelRecord {
    pub index: GridIndex,
    /// Mean color of the cell's points, [0, 1] scale.
    pub color: Rgb,
    /// Color variance of the nested fine cells (two-resolution mode only).
    pub variance: Option<f64>,
}

impl VoxelRecord {
    pub fn new(index: GridIndex, color: Rgb) -> Self {
        Self {
            index,
            color,
            variance: None,
        }
    }

    pub fn with_variance(mut self, variance: f64) -> Self {
        self.variance = Some(variance);
        self
    }
}

/// Result of one aggregation pass, sorted by grid index.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelGrid {
    voxel_size: f64,
    subdivision: Option<u32>,
    records: Vec<VoxelRecord>,
}

impl VoxelGrid {
    pub fn voxel_size(&self) -> f64 {
        self.voxel_size
    }

    pub fn subdivision(&self) -> Option<u32> {
        self.subdivision
    }

    pub fn records(&self) -> &[VoxelRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn schema(&self) -> TableSchema {
        if self.subdivision.is_some() {
            TableSchema::ColorVariance
        } else {
            TableSchema::Color
        }
    }

    pub fn get(&self, index: GridIndex) -> Option<&VoxelRecord> {
        self.records
            .binary_search_by(|r| r.index.cmp(&index))
            .ok()
            .map(|i| &self.records[i])
    }

    /// World-space anchor of a cell: `index * voxel_size`.
    pub fn cell_origin(&self, index: GridIndex) -> [f64; 3] {
        let p = index.to_f64();
        [
            p[0] * self.voxel_size,
            p[1] * self.voxel_size,
            p[2] * self.voxel_size,
        ]
    }

    /// World-space center of a cell's cube.
    pub fn cell_center(&self, index: GridIndex) -> [f64; 3] {
        let p = index.to_f64();
        [
            (p[0] + 0.5) * self.voxel_size,
            (p[1] + 0.5) * self.voxel_size,
            (p[2] + 0.5) * self.voxel_size,
        ]
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ColorSum {
    sum: [f64; 3],
    count: u64,
}

impl ColorSum {
    fn add(&mut self, c: Rgb) {
        self.sum[0] += c.r;
        self.sum[1] += c.g;
        self.sum[2] += c.b;
        self.count += 1;
    }

    fn mean(&self) -> Rgb {
        if self.count == 0 {
            return Rgb::WHITE;
        }
        let n = self.count as f64;
        Rgb::new(self.sum[0] / n, self.sum[1] / n, self.sum[2] / n)
    }
}

/// Streaming per-channel population variance.
#[derive(Debug, Clone, Copy, Default)]
struct ChannelVariance {
    count: u64,
    mean: [f64; 3],
    m2: [f64; 3],
}

impl ChannelVariance {
    fn add(&mut self, c: Rgb) {
        self.count += 1;
        let n = self.count as f64;
        for (i, x) in c.to_array().into_iter().enumerate() {
            let delta = x - self.mean[i];
            self.mean[i] += delta / n;
            self.m2[i] += delta * (x - self.mean[i]);
        }
    }

    fn mean_variance(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let n = self.count as f64;
        let total: f64 = self.m2.iter().map(|m| (m / n).max(0.0)).sum();
        total / 3.0
    }
}

pub struct Voxelizer {
    config: VoxelizeConfig,
}

impl Voxelizer {
    pub fn new(config: VoxelizeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VoxelizeConfig {
        &self.config
    }

    pub fn voxelize(&self, cloud: &PointCloud) -> Result<VoxelGrid> {
        self.config.validate()?;
        let voxel_size = self.config.voxel_size;
        let fine_size = self.config.fine_voxel_size();

        let assigned: Vec<Option<(GridIndex, Option<GridIndex>)>> = cloud
            .points()
            .par_iter()
            .map(|p| {
                if !p.position.iter().all(|c| c.is_finite()) {
                    return Ok(None);
                }
                let coarse = cell_of(p.position, voxel_size)?;
                let fine = fine_size.map(|s| cell_of(p.position, s)).transpose()?;
                Ok(Some((coarse, fine)))
            })
            .collect::<Result<_>>()?;

        let mut coarse: FxHashMap<GridIndex, ColorSum> = FxHashMap::default();
        let mut fine: FxHashMap<GridIndex, ColorSum> = FxHashMap::default();
        let mut skipped = 0usize;

        for (point, cells) in cloud.points().iter().zip(&assigned) {
            let Some((coarse_index, fine_index)) = cells else {
                skipped += 1;
                continue;
            };
            coarse.entry(*coarse_index).or_default().add(point.color);
            if let Some(fine_index) = fine_index {
                fine.entry(*fine_index).or_default().add(point.color);
            }
        }

        if skipped > 0 {
            log::warn!("skipped {} points with non-finite coordinates", skipped);
        }

        let variances = self
            .config
            .subdivision
            .map(|factor| nested_variances(fine, factor as i32));

        let mut records: Vec<VoxelRecord> = coarse
            .into_iter()
            .map(|(index, sum)| VoxelRecord {
                index,
                color: sum.mean(),
                variance: variances
                    .as_ref()
                    .map(|v| v.get(&index).map_or(0.0, ChannelVariance::mean_variance)),
            })
            .collect();
        records.par_sort_unstable_by_key(|r| r.index);

        log::debug!(
            "aggregated {} points into {} voxels of size {}",
            cloud.len() - skipped,
            records.len(),
            voxel_size
        );

        Ok(VoxelGrid {
            voxel_size,
            subdivision: self.config.subdivision,
            records,
        })
    }
}

fn cell_of(position: [f64; 3], cell_size: f64) -> Result<GridIndex> {
    GridIndex::from_point(position, cell_size).ok_or_else(|| {
        VoxelError::config(format!(
            "voxel size {} is too small for a point at ({}, {}, {}): grid index out of range",
            cell_size, position[0], position[1], position[2]
        ))
    })
}

/// Group fine-cell mean colors under their enclosing coarse cell.
fn nested_variances(
    fine: FxHashMap<GridIndex, ColorSum>,
    factor: i32,
) -> FxHashMap<GridIndex, ChannelVariance> {
    let mut cells: Vec<(GridIndex, ColorSum)> = fine.into_iter().collect();
    cells.sort_unstable_by_key(|(index, _)| *index);

    let mut out: FxHashMap<GridIndex, ChannelVariance> = FxHashMap::default();
    for (index, sum) in cells {
        out.entry(index.coarsen(factor)).or_default().add(sum.mean());
    }
    out
}

/// Single-resolution aggregation.
pub fn voxelize(cloud: &PointCloud, voxel_size: f64) -> Result<VoxelGrid> {
    Voxelizer::new(VoxelizeConfig::new(voxel_size).single_resolution()).voxelize(cloud)
}

/// Two-resolution aggregation with a fine grid `subdivision` times finer.
pub fn voxelize_multires(
    cloud: &PointCloud,
    voxel_size: f64,
    subdivision: u32,
) -> Result<VoxelGrid> {
    Voxelizer::new(VoxelizeConfig::new(voxel_size).with_subdivision(subdivision)).voxelize(cloud)
}
