//! Exposed-face extraction for textured voxel sets.
//!
//! Voxels are unit cubes centered on their integer coordinate. A face of a
//! voxel is exposed when the neighboring coordinate in that direction is not
//! occupied; hidden faces are removed by adjacency alone.

use rayon::prelude::*;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{Result, VoxelError};
use crate::grid::{Direction, GridIndex};
use crate::palette::BlockPalette;

/// The set of occupied voxel coordinates.
#[derive(Debug, Clone, Default)]
pub struct OccupancySet {
    cells: FxHashSet<GridIndex>,
}

impl OccupancySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: GridIndex) -> bool {
        self.cells.insert(index)
    }

    pub fn contains(&self, index: GridIndex) -> bool {
        self.cells.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Whether the face of `index` pointing along `direction` is visible.
    /// Cells past the edge of the grid are never occupied.
    pub fn is_exposed(&self, index: GridIndex, direction: Direction) -> bool {
        index
            .neighbor(direction)
            .map_or(true, |neighbor| !self.contains(neighbor))
    }
}

impl FromIterator<GridIndex> for OccupancySet {
    fn from_iter<I: IntoIterator<Item = GridIndex>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

/// A voxel bound to a palette texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TexturedVoxel {
    pub index: GridIndex,
    pub texture: usize,
}

impl TexturedVoxel {
    pub fn new(index: GridIndex, texture: usize) -> Self {
        Self { index, texture }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Face {
    pub voxel: GridIndex,
    pub direction: Direction,
    pub texture: usize,
}

// In-plane axes (u, v) per direction with u x v = normal.
fn tangents(direction: Direction) -> ([f64; 3], [f64; 3]) {
    match direction {
        Direction::PosX => ([0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        Direction::NegX => ([0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        Direction::PosY => ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        Direction::NegY => ([1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        Direction::PosZ => ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        Direction::NegZ => ([-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    }
}

const CORNER_SIGNS: [(f64, f64); 4] = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

impl Face {
    /// `voxel + 0.5 * normal`
    pub fn center(&self) -> [f64; 3] {
        let v = self.voxel.to_f64();
        let n = self.direction.normal();
        [v[0] + 0.5 * n[0], v[1] + 0.5 * n[1], v[2] + 0.5 * n[2]]
    }

    pub fn normal(&self) -> [f64; 3] {
        self.direction.normal()
    }

    /// Quad corners, counter-clockwise seen from outside the voxel.
    pub fn corners(&self) -> [[f64; 3]; 4] {
        let c = self.center();
        let (u, v) = tangents(self.direction);
        CORNER_SIGNS.map(|(su, sv)| {
            [
                c[0] + 0.5 * (su * u[0] + sv * v[0]),
                c[1] + 0.5 * (su * u[1] + sv * v[1]),
                c[2] + 0.5 * (su * u[2] + sv * v[2]),
            ]
        })
    }

    /// Texture coordinates matching [`Face::corners`], origin at the top-left
    /// of the image.
    pub fn uvs(&self) -> [[f64; 2]; 4] {
        CORNER_SIGNS.map(|(su, sv)| [(su + 1.0) / 2.0, (1.0 - sv) / 2.0])
    }
}

/// Exposed faces of `voxels`, in voxel order then [`Direction::ALL`] order.
/// A coordinate listed more than once keeps its first texture.
pub fn expose_faces(voxels: &[TexturedVoxel]) -> Vec<Face> {
    let mut occupancy = OccupancySet::new();
    let unique: Vec<TexturedVoxel> = voxels
        .iter()
        .filter(|v| occupancy.insert(v.index))
        .copied()
        .collect();
    if unique.len() != voxels.len() {
        log::debug!(
            "ignored {} duplicate voxel coordinates",
            voxels.len() - unique.len()
        );
    }

    let faces: Vec<Face> = unique
        .par_iter()
        .flat_map_iter(|voxel| {
            let occupancy = &occupancy;
            Direction::ALL
                .into_iter()
                .filter(move |&d| occupancy.is_exposed(voxel.index, d))
                .map(move |direction| Face {
                    voxel: voxel.index,
                    direction,
                    texture: voxel.texture,
                })
        })
        .collect();

    log::debug!("{} voxels expose {} faces", unique.len(), faces.len());
    faces
}

/// Write `faces` as a Wavefront OBJ with a sibling MTL file holding one
/// material per used palette texture.
pub fn write_obj(faces: &[Face], palette: &BlockPalette, obj_path: impl AsRef<Path>) -> Result<()> {
    let obj_path = obj_path.as_ref();
    let mtl_path = obj_path.with_extension("mtl");
    let mtl_name = mtl_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "blocks.mtl".to_string());

    let mut used: Vec<usize> = faces.iter().map(|f| f.texture).collect();
    used.sort_unstable();
    used.dedup();

    write_mtl(&mtl_path, &used, palette).map_err(|e| VoxelError::resource(&mtl_path, e))?;
    write_faces(obj_path, &mtl_name, faces).map_err(|e| VoxelError::resource(obj_path, e))?;
    log::info!("wrote {} faces to {}", faces.len(), obj_path.display());
    Ok(())
}

fn write_mtl(path: &Path, textures: &[usize], palette: &BlockPalette) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for &id in textures {
        writeln!(out, "newmtl block_{}", id)?;
        match palette.entry(id) {
            Some(entry) => {
                let c = entry.rgb();
                writeln!(out, "Kd {:.6} {:.6} {:.6}", c.r, c.g, c.b)?;
                if !entry.texture_path.as_os_str().is_empty() {
                    writeln!(out, "map_Kd {}", entry.texture_path.display())?;
                }
            }
            None => writeln!(out, "Kd 1.000000 0.000000 1.000000")?,
        }
        writeln!(out)?;
    }
    out.flush()
}

fn write_faces(path: &Path, mtl_name: &str, faces: &[Face]) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "mtllib {}", mtl_name)?;

    let mut current = None;
    for (i, face) in faces.iter().enumerate() {
        if current != Some(face.texture) {
            writeln!(out, "usemtl block_{}", face.texture)?;
            current = Some(face.texture);
        }
        for p in face.corners() {
            writeln!(out, "v {} {} {}", p[0], p[1], p[2])?;
        }
        // OBJ texture V runs bottom to top.
        for uv in face.uvs() {
            writeln!(out, "vt {} {}", uv[0], 1.0 - uv[1])?;
        }
        let base = i * 4 + 1;
        writeln!(
            out,
            "f {a}/{a} {b}/{b} {c}/{c} {d}/{d}",
            a = base,
            b = base + 1,
            c = base + 2,
            d = base + 3
        )?;
    }
    out.flush()
}
