//! Nearest palette color matching.
//!
//! Queries and palette colors are on the 0-255 scale. The closest palette
//! entry is the argmin of the chosen metric; on ties the lowest palette index
//! wins.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::color::{distance3, Lab, Rgb};
use crate::error::{Result, VoxelError};
use crate::palette::BlockPalette;
use crate::voxelize::VoxelRecord;

/// Lightness weight used for CIEDE2000 matching.
const CIEDE2000_K_L: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMetric {
    /// Euclidean distance in RGB.
    #[default]
    Euclidean,
    /// CIEDE2000 difference in CIE L*a*b*.
    Ciede2000,
}

pub struct BlockMatcher {
    colors: Vec<[f64; 3]>,
    labs: Vec<Lab>,
    metric: ColorMetric,
}

impl BlockMatcher {
    pub fn new(colors: Vec<[f64; 3]>) -> Result<Self> {
        if colors.is_empty() {
            return Err(VoxelError::config("cannot match against an empty palette"));
        }
        Ok(Self {
            colors,
            labs: Vec::new(),
            metric: ColorMetric::Euclidean,
        })
    }

    pub fn from_palette(palette: &BlockPalette) -> Result<Self> {
        Self::new(palette.colors())
    }

    pub fn with_metric(mut self, metric: ColorMetric) -> Self {
        self.metric = metric;
        self.labs = match metric {
            ColorMetric::Euclidean => Vec::new(),
            ColorMetric::Ciede2000 => self.colors.iter().map(|&c| Lab::from_rgb255(c)).collect(),
        };
        self
    }

    pub fn metric(&self) -> ColorMetric {
        self.metric
    }

    pub fn palette_len(&self) -> usize {
        self.colors.len()
    }

    fn distances<'a>(&'a self, query: [f64; 3]) -> impl Iterator<Item = f64> + 'a {
        let lab = match self.metric {
            ColorMetric::Euclidean => None,
            ColorMetric::Ciede2000 => Some(Lab::from_rgb255(query)),
        };
        self.colors.iter().enumerate().map(move |(i, c)| match lab {
            Some(lab) => lab.delta_e_2000(&self.labs[i], CIEDE2000_K_L),
            None => distance3(query, *c),
        })
    }

    /// Row-major `queries.len() x palette_len()` distance matrix.
    pub fn distance_matrix(&self, queries: &[[f64; 3]]) -> Vec<f64> {
        queries
            .par_iter()
            .flat_map_iter(|&q| self.distances(q))
            .collect()
    }

    /// Index of the closest palette color.
    pub fn closest(&self, query: [f64; 3]) -> usize {
        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for (i, d) in self.distances(query).enumerate() {
            if d < best_distance {
                best = i;
                best_distance = d;
            }
        }
        best
    }

    pub fn match_colors(&self, queries: &[[f64; 3]]) -> Vec<usize> {
        queries.par_iter().map(|&q| self.closest(q)).collect()
    }
}

/// Palette index for every record, in record order.
pub fn match_voxels(
    records: &[VoxelRecord],
    palette: &BlockPalette,
    metric: ColorMetric,
) -> Result<Vec<usize>> {
    let matcher = BlockMatcher::from_palette(palette)?.with_metric(metric);
    let queries: Vec<[f64; 3]> = records.iter().map(|r| r.color.to_255()).collect();
    Ok(matcher.match_colors(&queries))
}

/// Palette index for a single canonical color.
pub fn match_color(color: Rgb, matcher: &BlockMatcher) -> usize {
    matcher.closest(color.to_255())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_palette_is_rejected() {
        assert!(matches!(
            BlockMatcher::new(Vec::new()),
            Err(VoxelError::Configuration(_))
        ));
    }

    #[test]
    fn test_ties_pick_lowest_index() {
        let matcher = BlockMatcher::new(vec![[0.0, 0.0, 0.0], [20.0, 0.0, 0.0]]).unwrap();
        assert_eq!(matcher.closest([10.0, 0.0, 0.0]), 0);

        let matcher = BlockMatcher::new(vec![[5.0, 5.0, 5.0], [5.0, 5.0, 5.0]]).unwrap();
        assert_eq!(matcher.closest([5.0, 5.0, 5.0]), 0);
    }

    #[test]
    fn test_distance_matrix_layout() {
        let matcher = BlockMatcher::new(vec![[0.0, 0.0, 0.0], [3.0, 4.0, 0.0]]).unwrap();
        let m = matcher.distance_matrix(&[[0.0, 0.0, 0.0], [3.0, 4.0, 0.0]]);
        assert_eq!(m, vec![0.0, 5.0, 5.0, 0.0]);
    }

    #[test]
    fn test_ciede2000_metric_picks_exact_match() {
        let colors = vec![[200.0, 30.0, 30.0], [30.0, 200.0, 30.0], [30.0, 30.0, 200.0]];
        let matcher = BlockMatcher::new(colors.clone())
            .unwrap()
            .with_metric(ColorMetric::Ciede2000);
        assert_eq!(matcher.match_colors(&colors), vec![0, 1, 2]);
    }

    #[test]
    fn test_match_color_scales_canonical_input() {
        let matcher = BlockMatcher::new(vec![[0.0, 0.0, 0.0], [255.0, 255.0, 255.0]]).unwrap();
        assert_eq!(match_color(Rgb::new(0.9, 0.9, 0.9), &matcher), 1);
    }
}
