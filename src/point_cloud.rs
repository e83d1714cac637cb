use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::mesh::Mesh;

/// A colored sample of the mesh surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub position: [f64; 3],
    pub color: Rgb,
}

impl Point {
    pub fn new(position: [f64; 3], color: Rgb) -> Self {
        Self { position, color }
    }
}

/// Unordered collection of colored points.
#[derive(Debug, Clone, Default)]
pub struct PointCloud {
    points: Vec<Point>,
}

impl PointCloud {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// One point per mesh vertex, colored by the part's resolved color source.
    pub fn from_mesh(mesh: &Mesh) -> Self {
        let mut points = Vec::with_capacity(mesh.vertex_count());
        for part in &mesh.parts {
            let colors = part.vertex_colors();
            points.extend(
                part.positions
                    .iter()
                    .zip(colors)
                    .map(|(&position, color)| Point { position, color }),
            );
        }
        Self { points }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point> {
        self.points.iter()
    }

    /// Axis-aligned bounds of all finite points.
    pub fn bounds(&self) -> Option<([f64; 3], [f64; 3])> {
        let mut finite = self
            .points
            .iter()
            .map(|p| p.position)
            .filter(|p| p.iter().all(|c| c.is_finite()));
        let first = finite.next()?;
        Some(finite.fold((first, first), |(mut min, mut max), p| {
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
            (min, max)
        }))
    }
}

impl FromIterator<Point> for PointCloud {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{ColorSource, MeshPart};

    #[test]
    fn test_from_mesh_concatenates_parts() {
        let red = Rgb::new(1.0, 0.0, 0.0);
        let mesh = Mesh::new(vec![
            MeshPart::new(
                vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
                Vec::new(),
                ColorSource::PerVertex(vec![red, red]),
            ),
            MeshPart::new(vec![[2.0, 2.0, 2.0]], Vec::new(), ColorSource::None),
        ]);

        let cloud = PointCloud::from_mesh(&mesh);
        assert_eq!(cloud.len(), 3);
        assert_eq!(cloud.points()[0].color, red);
        assert_eq!(cloud.points()[2].color, Rgb::WHITE);
        assert_eq!(cloud.bounds(), Some(([0.0, 0.0, 0.0], [2.0, 2.0, 2.0])));
    }

    #[test]
    fn test_empty_cloud_has_no_bounds() {
        assert!(PointCloud::default().bounds().is_none());
    }
}
