//! Color reduction by density clustering in CIE Lab.
//!
//! Voxel colors are grouped with DBSCAN: a color with at least `min_points`
//! colors (itself included) closer than `epsilon` is a core color, and
//! clusters grow from core colors to everything within reach. Every member
//! of a cluster takes the cluster's Lab centroid. Noise colors join the
//! nearest centroid when it lies within `2 * epsilon` and keep their own
//! color otherwise. Positions play no part.

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::color::{distance3, Lab, Rgb};
use crate::error::{Result, VoxelError};
use crate::voxelize::VoxelRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Neighborhood radius in Lab units.
    pub epsilon: f64,
    /// Neighbors, the color itself included, that make a core color.
    pub min_points: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            epsilon: 5.0,
            min_points: 5,
        }
    }
}

impl ClusterConfig {
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_min_points(mut self, min_points: usize) -> Self {
        self.min_points = min_points;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(VoxelError::config(format!(
                "cluster epsilon must be positive, got {}",
                self.epsilon
            )));
        }
        if self.min_points == 0 {
            return Err(VoxelError::config("cluster min_points must be at least 1"));
        }
        Ok(())
    }
}

/// Lab colors bucketed into cubes of edge `epsilon`, so a neighborhood query
/// only visits the 27 cubes around a color.
struct LabGrid<'a> {
    labs: &'a [[f64; 3]],
    epsilon: f64,
    cells: FxHashMap<[i64; 3], Vec<usize>>,
}

impl<'a> LabGrid<'a> {
    fn new(labs: &'a [[f64; 3]], epsilon: f64) -> Self {
        let mut cells: FxHashMap<[i64; 3], Vec<usize>> = FxHashMap::default();
        for (i, lab) in labs.iter().enumerate() {
            cells.entry(Self::key(lab, epsilon)).or_default().push(i);
        }
        Self {
            labs,
            epsilon,
            cells,
        }
    }

    fn key(lab: &[f64; 3], epsilon: f64) -> [i64; 3] {
        lab.map(|v| (v / epsilon).floor() as i64)
    }

    fn for_each_neighbor(&self, i: usize, mut f: impl FnMut(usize)) {
        let center = self.labs[i];
        let key = Self::key(&center, self.epsilon);
        for dx in -1i64..=1 {
            for dy in -1i64..=1 {
                for dz in -1i64..=1 {
                    let cell = [
                        key[0].saturating_add(dx),
                        key[1].saturating_add(dy),
                        key[2].saturating_add(dz),
                    ];
                    let Some(members) = self.cells.get(&cell) else {
                        continue;
                    };
                    for &j in members {
                        if distance3(center, self.labs[j]) < self.epsilon {
                            f(j);
                        }
                    }
                }
            }
        }
    }

    fn neighbor_count(&self, i: usize) -> usize {
        let mut count = 0;
        self.for_each_neighbor(i, |_| count += 1);
        count
    }
}

/// Cluster label per color, `None` for noise. Clusters are numbered in
/// order of their first core color.
fn dbscan(labs: &[[f64; 3]], config: &ClusterConfig) -> (Vec<Option<usize>>, usize) {
    let grid = LabGrid::new(labs, config.epsilon);
    let core: Vec<bool> = (0..labs.len())
        .into_par_iter()
        .map(|i| grid.neighbor_count(i) >= config.min_points)
        .collect();

    let mut labels: Vec<Option<usize>> = vec![None; labs.len()];
    let mut clusters = 0;
    let mut queue = Vec::new();

    for seed in 0..labs.len() {
        if labels[seed].is_some() || !core[seed] {
            continue;
        }
        let cluster = clusters;
        clusters += 1;
        labels[seed] = Some(cluster);
        queue.push(seed);

        while let Some(p) = queue.pop() {
            if !core[p] {
                continue;
            }
            grid.for_each_neighbor(p, |q| {
                if labels[q].is_none() {
                    labels[q] = Some(cluster);
                    queue.push(q);
                }
            });
        }
    }

    (labels, clusters)
}

/// Replace each record's color with its color cluster's centroid. Indices
/// and variances are kept.
pub fn cluster_colors(records: &[VoxelRecord], config: &ClusterConfig) -> Result<Vec<VoxelRecord>> {
    config.validate()?;

    let labs: Vec<[f64; 3]> = records
        .par_iter()
        .map(|r| r.color.to_lab().to_array())
        .collect();
    let (labels, clusters) = dbscan(&labs, config);

    let mut sums = vec![([0.0f64; 3], 0usize); clusters];
    for (lab, label) in labs.iter().zip(&labels) {
        if let Some(c) = label {
            let (sum, count) = &mut sums[*c];
            for k in 0..3 {
                sum[k] += lab[k];
            }
            *count += 1;
        }
    }
    let centroids: Vec<[f64; 3]> = sums
        .iter()
        .map(|(sum, count)| sum.map(|s| s / *count as f64))
        .collect();
    let colors: Vec<Rgb> = centroids
        .iter()
        .map(|c| Lab { l: c[0], a: c[1], b: c[2] }.to_rgb())
        .collect();

    let reach = 2.0 * config.epsilon;
    let mut noise = 0usize;
    let out = records
        .iter()
        .zip(labs.iter().zip(&labels))
        .map(|(record, (lab, &label))| {
            let cluster = label.or_else(|| {
                noise += 1;
                nearest(&centroids, *lab).filter(|&(_, d)| d <= reach).map(|(c, _)| c)
            });
            let mut out = *record;
            if let Some(c) = cluster {
                out.color = colors[c];
            }
            out
        })
        .collect();

    log::debug!(
        "{} colors in {} clusters, {} noise",
        records.len(),
        clusters,
        noise
    );
    Ok(out)
}

// Strict `<` keeps the lowest cluster on ties.
fn nearest(centroids: &[[f64; 3]], lab: [f64; 3]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, c) in centroids.iter().enumerate() {
        let d = distance3(*c, lab);
        if best.map_or(true, |(_, bd)| d < bd) {
            best = Some((i, d));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridIndex;

    fn gray(x: i32, v: f64) -> VoxelRecord {
        VoxelRecord::new(GridIndex::new(x, 0, 0), Rgb::new(v, v, v))
    }

    #[test]
    fn test_dbscan_labels_dense_group_and_noise() {
        let labs = vec![
            [50.0, 0.0, 0.0],
            [51.0, 0.0, 0.0],
            [52.0, 0.0, 0.0],
            [90.0, 0.0, 0.0],
        ];
        let config = ClusterConfig::default().with_min_points(3);
        let (labels, clusters) = dbscan(&labs, &config);
        assert_eq!(clusters, 1);
        assert_eq!(labels, vec![Some(0), Some(0), Some(0), None]);
    }

    #[test]
    fn test_border_color_joins_first_cluster() {
        // 14 is within reach of the core colors 10 and 18 but is not core itself.
        let labs: Vec<[f64; 3]> = [6.0, 7.0, 10.0, 14.0, 18.0, 21.0, 22.0]
            .iter()
            .map(|&l| [l, 0.0, 0.0])
            .collect();
        let config = ClusterConfig::default().with_min_points(4);
        let (labels, clusters) = dbscan(&labs, &config);
        assert_eq!(clusters, 2);
        assert_eq!(
            labels,
            vec![Some(0), Some(0), Some(0), Some(0), Some(1), Some(1), Some(1)]
        );
    }

    #[test]
    fn test_members_take_centroid_color() {
        let records: Vec<VoxelRecord> = [0.50, 0.51, 0.52, 0.50, 0.51, 0.52]
            .iter()
            .enumerate()
            .map(|(i, &v)| gray(i as i32, v).with_variance(0.01))
            .collect();
        let out = cluster_colors(&records, &ClusterConfig::default()).unwrap();

        let labs: Vec<[f64; 3]> = records.iter().map(|r| r.color.to_lab().to_array()).collect();
        let n = labs.len() as f64;
        let centroid = Lab {
            l: labs.iter().map(|l| l[0]).sum::<f64>() / n,
            a: labs.iter().map(|l| l[1]).sum::<f64>() / n,
            b: labs.iter().map(|l| l[2]).sum::<f64>() / n,
        }
        .to_rgb();

        for (before, after) in records.iter().zip(&out) {
            assert_eq!(after.index, before.index);
            assert_eq!(after.variance, Some(0.01));
            assert!(after.color.distance(centroid) < 1e-9);
        }
    }

    #[test]
    fn test_far_noise_keeps_its_color() {
        let mut records: Vec<VoxelRecord> = (0..5).map(|i| gray(i, 0.5)).collect();
        let red = VoxelRecord::new(GridIndex::new(9, 0, 0), Rgb::new(0.9, 0.1, 0.1));
        records.push(red);

        let out = cluster_colors(&records, &ClusterConfig::default()).unwrap();
        assert_eq!(out[5], red);
    }

    #[test]
    fn test_near_noise_joins_nearest_cluster() {
        // Gray 0.57 is about 7 L* above gray 0.5: outside epsilon, inside 2 * epsilon.
        let mut records: Vec<VoxelRecord> = (0..5).map(|i| gray(i, 0.5)).collect();
        records.push(gray(9, 0.57));

        let out = cluster_colors(&records, &ClusterConfig::default()).unwrap();
        assert!(out[5].color.distance(out[0].color) < 1e-12);
        assert!(out[0].color.distance(Rgb::new(0.5, 0.5, 0.5)) < 1e-4);
    }

    #[test]
    fn test_no_clusters_leaves_colors_alone() {
        let records = vec![gray(0, 0.1), gray(1, 0.5), gray(2, 0.9)];
        let out = cluster_colors(&records, &ClusterConfig::default()).unwrap();
        assert_eq!(out, records);
        assert!(cluster_colors(&[], &ClusterConfig::default()).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        for config in [
            ClusterConfig::default().with_epsilon(0.0),
            ClusterConfig::default().with_epsilon(f64::NAN),
            ClusterConfig::default().with_min_points(0),
        ] {
            assert!(matches!(
                cluster_colors(&[], &config),
                Err(VoxelError::Configuration(_))
            ));
        }
    }
}
