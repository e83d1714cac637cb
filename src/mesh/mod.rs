//! Mesh input and per-vertex color resolution.
//!
//! Importers turn a file into a [`Mesh`]: a list of [`MeshPart`]s, each with
//! its own [`ColorSource`]. The color source is resolved exactly once into one
//! color per vertex by [`MeshPart::vertex_colors`]; a part whose color data is
//! inconsistent is logged and rendered white rather than failing the load.
//!
//! ```ignore
//! use voxblock::mesh::load_mesh;
//!
//! let mesh = load_mesh("model.glb")?;
//! for part in &mesh.parts {
//!     let colors = part.vertex_colors();
//!     assert_eq!(colors.len(), part.positions.len());
//! }
//! ```

#[cfg(feature = "gltf")]
pub mod gltf_importer;
#[cfg(feature = "obj")]
pub mod obj_importer;

use image::RgbaImage;
use std::path::Path;
use std::sync::Arc;

use crate::color::Rgb;
use crate::error::{Result, VoxelError};

/// Where a mesh part's colors come from.
#[derive(Debug, Clone, Default)]
pub enum ColorSource {
    /// No color information; the part is white.
    #[default]
    None,
    /// One color per vertex.
    PerVertex(Vec<Rgb>),
    /// One color per triangle.
    PerFace(Vec<Rgb>),
    /// Base color factor and optional texture of the part's material.
    FromMaterial(Material),
}

#[derive(Debug, Clone)]
pub struct Material {
    /// RGBA multiplier on the [0, 1] scale.
    pub base_color: [f64; 4],
    pub texture: Option<MaterialTexture>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base_color: [1.0, 1.0, 1.0, 1.0],
            texture: None,
        }
    }
}

/// Base color texture plus one UV per vertex (origin at the top-left texel).
#[derive(Debug, Clone)]
pub struct MaterialTexture {
    pub image: Arc<RgbaImage>,
    pub uvs: Vec<[f64; 2]>,
}

impl MaterialTexture {
    /// Nearest texel at `uv` with repeat wrapping.
    pub fn sample(&self, uv: [f64; 2]) -> Rgb {
        let (w, h) = self.image.dimensions();
        if w == 0 || h == 0 {
            return Rgb::WHITE;
        }
        let u = uv[0] - uv[0].floor();
        let v = uv[1] - uv[1].floor();
        let x = ((u * w as f64) as u32).min(w - 1);
        let y = ((v * h as f64) as u32).min(h - 1);
        let px = self.image.get_pixel(x, y);
        Rgb::from_u8(px[0], px[1], px[2])
    }
}

/// A triangle list with a single color source.
#[derive(Debug, Clone, Default)]
pub struct MeshPart {
    pub name: Option<String>,
    pub positions: Vec<[f64; 3]>,
    pub faces: Vec<[u32; 3]>,
    pub colors: ColorSource,
}

impl MeshPart {
    pub fn new(positions: Vec<[f64; 3]>, faces: Vec<[u32; 3]>, colors: ColorSource) -> Self {
        Self {
            name: None,
            positions,
            faces,
            colors,
        }
    }

    /// One color per vertex. Falls back to white when the color data does
    /// not fit the geometry.
    pub fn vertex_colors(&self) -> Vec<Rgb> {
        match self.try_vertex_colors() {
            Ok(colors) => colors,
            Err(reason) => {
                log::warn!(
                    "color extraction failed for mesh part {}: {}; using white",
                    self.name.as_deref().unwrap_or("<unnamed>"),
                    reason
                );
                vec![Rgb::WHITE; self.positions.len()]
            }
        }
    }

    fn try_vertex_colors(&self) -> std::result::Result<Vec<Rgb>, String> {
        let n = self.positions.len();
        match &self.colors {
            ColorSource::None => Ok(vec![Rgb::WHITE; n]),
            ColorSource::PerVertex(colors) => {
                if colors.len() != n {
                    return Err(format!(
                        "{} vertex colors for {} vertices",
                        colors.len(),
                        n
                    ));
                }
                Ok(colors.clone())
            }
            ColorSource::PerFace(colors) => {
                if colors.len() != self.faces.len() {
                    return Err(format!(
                        "{} face colors for {} faces",
                        colors.len(),
                        self.faces.len()
                    ));
                }
                let mut sums = vec![([0.0f64; 3], 0u32); n];
                for (face, color) in self.faces.iter().zip(colors) {
                    for &vi in face {
                        let slot = sums
                            .get_mut(vi as usize)
                            .ok_or_else(|| format!("face references vertex {} of {}", vi, n))?;
                        slot.0[0] += color.r;
                        slot.0[1] += color.g;
                        slot.0[2] += color.b;
                        slot.1 += 1;
                    }
                }
                Ok(sums
                    .into_iter()
                    .map(|(sum, count)| {
                        if count == 0 {
                            Rgb::WHITE
                        } else {
                            let c = count as f64;
                            Rgb::new(sum[0] / c, sum[1] / c, sum[2] / c)
                        }
                    })
                    .collect())
            }
            ColorSource::FromMaterial(material) => {
                let factor = Rgb::new(
                    material.base_color[0],
                    material.base_color[1],
                    material.base_color[2],
                );
                match &material.texture {
                    None => Ok(vec![factor; n]),
                    Some(texture) => {
                        if texture.uvs.len() != n {
                            return Err(format!(
                                "{} texture coordinates for {} vertices",
                                texture.uvs.len(),
                                n
                            ));
                        }
                        Ok(texture
                            .uvs
                            .iter()
                            .map(|&uv| {
                                let t = texture.sample(uv);
                                Rgb::new(t.r * factor.r, t.g * factor.g, t.b * factor.b)
                            })
                            .collect())
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub parts: Vec<MeshPart>,
}

impl Mesh {
    pub fn new(parts: Vec<MeshPart>) -> Self {
        Self { parts }
    }

    pub fn vertex_count(&self) -> usize {
        self.parts.iter().map(|p| p.positions.len()).sum()
    }

    pub fn face_count(&self) -> usize {
        self.parts.iter().map(|p| p.faces.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_count() == 0
    }
}

/// A reader for one mesh file format.
pub trait MeshImporter: Send + Sync {
    fn name(&self) -> &'static str;
    /// Lower-case file extensions handled by this importer.
    fn extensions(&self) -> &'static [&'static str];
    fn read(&self, path: &Path) -> Result<Mesh>;
}

/// Registry of importers, selected by file extension.
pub struct MeshLoader {
    importers: Vec<Box<dyn MeshImporter>>,
}

impl Default for MeshLoader {
    fn default() -> Self {
        let mut loader = Self::new();
        #[cfg(feature = "gltf")]
        loader.register_importer(gltf_importer::GltfImporter);
        #[cfg(feature = "obj")]
        loader.register_importer(obj_importer::ObjImporter);
        loader
    }
}

impl MeshLoader {
    /// An empty loader; see [`MeshLoader::default`] for the built-in formats.
    pub fn new() -> Self {
        Self {
            importers: Vec::new(),
        }
    }

    pub fn register_importer<I: MeshImporter + 'static>(&mut self, importer: I) {
        self.importers.push(Box::new(importer));
    }

    pub fn supported_extensions(&self) -> Vec<&'static str> {
        self.importers
            .iter()
            .flat_map(|i| i.extensions().iter().copied())
            .collect()
    }

    pub fn load(&self, path: impl AsRef<Path>) -> Result<Mesh> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(VoxelError::resource(path, "mesh file not found"));
        }
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();

        let importer = self
            .importers
            .iter()
            .find(|i| i.extensions().contains(&extension.as_str()))
            .ok_or_else(|| {
                VoxelError::resource(
                    path,
                    format!(
                        "unsupported mesh format '.{}' (supported: {})",
                        extension,
                        self.supported_extensions().join(", ")
                    ),
                )
            })?;

        let mesh = importer.read(path)?;
        log::debug!(
            "{} importer read {} parts, {} vertices, {} faces from {}",
            importer.name(),
            mesh.parts.len(),
            mesh.vertex_count(),
            mesh.face_count(),
            path.display()
        );
        Ok(mesh)
    }
}

/// Load a mesh with the default importers.
pub fn load_mesh(path: impl AsRef<Path>) -> Result<Mesh> {
    MeshLoader::default().load(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Vec<[f64; 3]> {
        vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]
    }

    #[test]
    fn test_no_color_source_is_white() {
        let part = MeshPart::new(triangle(), vec![[0, 1, 2]], ColorSource::None);
        assert_eq!(part.vertex_colors(), vec![Rgb::WHITE; 3]);
    }

    #[test]
    fn test_per_face_colors_average_onto_vertices() {
        let mut positions = triangle();
        positions.push([1.0, 1.0, 0.0]);
        positions.push([5.0, 5.0, 5.0]); // on no face
        let faces = vec![[0, 1, 2], [1, 3, 2]];
        let red = Rgb::new(1.0, 0.0, 0.0);
        let blue = Rgb::new(0.0, 0.0, 1.0);
        let part = MeshPart::new(positions, faces, ColorSource::PerFace(vec![red, blue]));

        let colors = part.vertex_colors();
        assert_eq!(colors[0], red);
        assert_eq!(colors[1], Rgb::new(0.5, 0.0, 0.5));
        assert_eq!(colors[3], blue);
        assert_eq!(colors[4], Rgb::WHITE);
    }

    #[test]
    fn test_mismatched_vertex_colors_fall_back_to_white() {
        let part = MeshPart::new(
            triangle(),
            vec![[0, 1, 2]],
            ColorSource::PerVertex(vec![Rgb::BLACK]),
        );
        assert_eq!(part.vertex_colors(), vec![Rgb::WHITE; 3]);
    }

    #[test]
    fn test_face_index_out_of_range_falls_back_to_white() {
        let part = MeshPart::new(
            triangle(),
            vec![[0, 1, 9]],
            ColorSource::PerFace(vec![Rgb::BLACK]),
        );
        assert_eq!(part.vertex_colors(), vec![Rgb::WHITE; 3]);
    }

    #[test]
    fn test_material_texture_sampling() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, image::Rgba([0, 0, 255, 255]));
        let material = Material {
            base_color: [1.0, 0.5, 1.0, 1.0],
            texture: Some(MaterialTexture {
                image: Arc::new(img),
                uvs: vec![[0.25, 0.5], [0.75, 0.5], [1.25, 0.5]],
            }),
        };
        let part = MeshPart::new(triangle(), vec![[0, 1, 2]], ColorSource::FromMaterial(material));

        let colors = part.vertex_colors();
        assert_eq!(colors[0], Rgb::new(1.0, 0.0, 0.0));
        assert_eq!(colors[1], Rgb::new(0.0, 0.0, 1.0));
        // Wraps around to the first texel.
        assert_eq!(colors[2], Rgb::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_material_without_texture_uses_factor() {
        let material = Material {
            base_color: [0.2, 0.4, 0.6, 1.0],
            texture: None,
        };
        let part = MeshPart::new(triangle(), vec![[0, 1, 2]], ColorSource::FromMaterial(material));
        assert_eq!(part.vertex_colors(), vec![Rgb::new(0.2, 0.4, 0.6); 3]);
    }

    #[test]
    fn test_loader_rejects_missing_and_unknown_files() {
        let loader = MeshLoader::default();
        assert!(matches!(
            loader.load("definitely/not/here.glb"),
            Err(VoxelError::Resource { .. })
        ));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.xyz");
        std::fs::write(&path, b"1 2 3").unwrap();
        let err = loader.load(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported mesh format"));
    }
}
