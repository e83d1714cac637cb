//! Wavefront OBJ (+ MTL) input.

use image::RgbaImage;
use std::path::Path;
use std::sync::Arc;

use super::{ColorSource, Material, MaterialTexture, Mesh, MeshImporter, MeshPart};
use crate::color::Rgb;
use crate::error::{Result, VoxelError};

pub struct ObjImporter;

impl MeshImporter for ObjImporter {
    fn name(&self) -> &'static str {
        "obj"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["obj"]
    }

    fn read(&self, path: &Path) -> Result<Mesh> {
        let (models, materials) = tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS)
            .map_err(|e| VoxelError::resource(path, e))?;

        let materials = materials.unwrap_or_else(|e| {
            log::warn!("ignoring materials of {}: {}", path.display(), e);
            Vec::new()
        });
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

        let parts = models
            .into_iter()
            .map(|model| {
                let mesh = model.mesh;
                let positions: Vec<[f64; 3]> = mesh
                    .positions
                    .chunks_exact(3)
                    .map(|p| [p[0] as f64, p[1] as f64, p[2] as f64])
                    .collect();
                let faces: Vec<[u32; 3]> = mesh
                    .indices
                    .chunks_exact(3)
                    .map(|t| [t[0], t[1], t[2]])
                    .collect();

                let colors = if !mesh.vertex_color.is_empty() {
                    ColorSource::PerVertex(
                        mesh.vertex_color
                            .chunks_exact(3)
                            .map(|c| Rgb::new(c[0] as f64, c[1] as f64, c[2] as f64))
                            .collect(),
                    )
                } else if let Some(material) = mesh.material_id.and_then(|id| materials.get(id)) {
                    let base = material.diffuse.unwrap_or([1.0, 1.0, 1.0]);
                    let texture = material
                        .diffuse_texture
                        .as_deref()
                        .and_then(|name| load_texture(&base_dir.join(name)))
                        .and_then(|image| {
                            if mesh.texcoords.is_empty() {
                                log::warn!(
                                    "{}: material {} has a texture but the mesh has no UVs",
                                    model.name,
                                    material.name
                                );
                                return None;
                            }
                            // OBJ puts the V origin at the bottom of the image.
                            let uvs = mesh
                                .texcoords
                                .chunks_exact(2)
                                .map(|uv| [uv[0] as f64, 1.0 - uv[1] as f64])
                                .collect();
                            Some(MaterialTexture { image, uvs })
                        });
                    ColorSource::FromMaterial(Material {
                        base_color: [base[0] as f64, base[1] as f64, base[2] as f64, 1.0],
                        texture,
                    })
                } else {
                    ColorSource::None
                };

                let mut part = MeshPart::new(positions, faces, colors);
                part.name = Some(model.name);
                part
            })
            .collect();

        Ok(Mesh::new(parts))
    }
}

fn load_texture(path: &Path) -> Option<Arc<RgbaImage>> {
    match image::open(path) {
        Ok(img) => Some(Arc::new(img.to_rgba8())),
        Err(e) => {
            log::warn!(
                "cannot read texture {}: {}; using the material color",
                path.display(),
                e
            );
            None
        }
    }
}
