//! glTF 2.0 (`.gltf` / `.glb`) input.

use gltf::image::Format;
use gltf::mesh::Mode;
use image::RgbaImage;
use std::path::Path;
use std::sync::Arc;

use super::{ColorSource, Material, MaterialTexture, Mesh, MeshImporter, MeshPart};
use crate::color::Rgb;
use crate::error::{Result, VoxelError};
use crate::math::{mat4_mul, transform_point, Mat4, IDENTITY};

pub struct GltfImporter;

impl MeshImporter for GltfImporter {
    fn name(&self) -> &'static str {
        "gltf"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["glb", "gltf"]
    }

    fn read(&self, path: &Path) -> Result<Mesh> {
        let (document, buffers, images) =
            gltf::import(path).map_err(|e| VoxelError::resource(path, e))?;

        let textures: Vec<Option<Arc<RgbaImage>>> = images
            .iter()
            .enumerate()
            .map(|(i, data)| convert_image(i, data).map(Arc::new))
            .collect();

        let mut ctx = SceneReader {
            buffers: &buffers,
            textures: &textures,
            parts: Vec::new(),
        };

        match document
            .default_scene()
            .or_else(|| document.scenes().next())
        {
            Some(scene) => {
                for node in scene.nodes() {
                    ctx.visit_node(&node, IDENTITY);
                }
            }
            None => {
                // A scene-less file still carries meshes; take them untransformed.
                for mesh in document.meshes() {
                    ctx.read_mesh(&mesh, &IDENTITY);
                }
            }
        }

        Ok(Mesh::new(ctx.parts))
    }
}

struct SceneReader<'a> {
    buffers: &'a [gltf::buffer::Data],
    textures: &'a [Option<Arc<RgbaImage>>],
    parts: Vec<MeshPart>,
}

impl SceneReader<'_> {
    fn visit_node(&mut self, node: &gltf::Node<'_>, parent: Mat4) {
        let world = mat4_mul(parent, node.transform().matrix());
        if let Some(mesh) = node.mesh() {
            self.read_mesh(&mesh, &world);
        }
        for child in node.children() {
            self.visit_node(&child, world);
        }
    }

    fn read_mesh(&mut self, mesh: &gltf::Mesh<'_>, transform: &Mat4) {
        for primitive in mesh.primitives() {
            if let Some(mut part) = self.read_primitive(&primitive, transform) {
                part.name = mesh.name().map(str::to_string);
                self.parts.push(part);
            }
        }
    }

    fn read_primitive(
        &self,
        primitive: &gltf::Primitive<'_>,
        transform: &Mat4,
    ) -> Option<MeshPart> {
        let buffers = self.buffers;
        let reader = primitive.reader(|buffer| Some(buffers[buffer.index()].0.as_slice()));

        let Some(positions) = reader.read_positions() else {
            log::warn!("skipping primitive {} without positions", primitive.index());
            return None;
        };
        let positions: Vec<[f64; 3]> = positions
            .map(|p| transform_point(transform, [p[0] as f64, p[1] as f64, p[2] as f64]))
            .collect();

        let faces = if primitive.mode() == Mode::Triangles {
            let indices: Vec<u32> = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..positions.len() as u32).collect(),
            };
            indices
                .chunks_exact(3)
                .map(|t| [t[0], t[1], t[2]])
                .collect()
        } else {
            // Points, lines and strips still contribute their vertices.
            log::debug!(
                "primitive {} uses {:?}; keeping vertices only",
                primitive.index(),
                primitive.mode()
            );
            Vec::new()
        };

        let colors = if let Some(colors) = reader.read_colors(0) {
            ColorSource::PerVertex(
                colors
                    .into_rgb_f32()
                    .map(|c| Rgb::new(c[0] as f64, c[1] as f64, c[2] as f64))
                    .collect(),
            )
        } else {
            let material = primitive.material();
            if material.index().is_none() {
                ColorSource::None
            } else {
                let pbr = material.pbr_metallic_roughness();
                let texture = pbr.base_color_texture().and_then(|info| {
                    let image = self
                        .textures
                        .get(info.texture().source().index())
                        .cloned()
                        .flatten()?;
                    let Some(uvs) = reader.read_tex_coords(info.tex_coord()) else {
                        log::warn!(
                            "primitive {} has a base color texture but no TEXCOORD_{}",
                            primitive.index(),
                            info.tex_coord()
                        );
                        return None;
                    };
                    let uvs = uvs
                        .into_f32()
                        .map(|uv| [uv[0] as f64, uv[1] as f64])
                        .collect();
                    Some(MaterialTexture { image, uvs })
                });
                ColorSource::FromMaterial(Material {
                    base_color: pbr.base_color_factor().map(f64::from),
                    texture,
                })
            }
        };

        Some(MeshPart::new(positions, faces, colors))
    }
}

fn convert_image(index: usize, data: &gltf::image::Data) -> Option<RgbaImage> {
    let rgba: Vec<u8> = match data.format {
        Format::R8G8B8A8 => data.pixels.clone(),
        Format::R8G8B8 => data
            .pixels
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 255])
            .collect(),
        Format::R8G8 => data
            .pixels
            .chunks_exact(2)
            .flat_map(|p| [p[0], p[0], p[0], p[1]])
            .collect(),
        Format::R8 => data.pixels.iter().flat_map(|&l| [l, l, l, 255]).collect(),
        other => {
            log::warn!(
                "image {} uses unsupported pixel format {:?}; material falls back to its base color",
                index,
                other
            );
            return None;
        }
    };
    let image = RgbaImage::from_raw(data.width, data.height, rgba);
    if image.is_none() {
        log::warn!("image {} has an inconsistent pixel buffer", index);
    }
    image
}
