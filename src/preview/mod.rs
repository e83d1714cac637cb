//! Offscreen preview rendering.
//!
//! A small z-buffered software rasterizer that draws textured voxel faces or
//! point splats into an [`RgbaImage`] as seen from an orbit camera framing the
//! scene.

pub mod camera;

pub use camera::Camera;

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, VoxelError};
use crate::faces::Face;
use crate::grid::Direction;
use crate::math::{dot3, sub3, to_f32, transform4, Mat4};
use crate::palette::BlockPalette;
use crate::point_cloud::PointCloud;

const MISSING_TEXTURE: [u8; 4] = [255, 0, 255, 255];

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// Degrees around +y.
    pub yaw: f32,
    /// Degrees above the horizon.
    pub pitch: f32,
    /// Distance multiplier; above 1 moves the camera back.
    pub zoom: f32,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub background: [u8; 4],
    /// Splat edge in pixels for point rendering.
    pub point_size: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
            yaw: 45.0,
            pitch: 30.0,
            zoom: 1.0,
            fov: 45.0,
            background: [32, 32, 32, 255],
            point_size: 2,
        }
    }
}

impl RenderConfig {
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_angles(mut self, yaw: f32, pitch: f32) -> Self {
        self.yaw = yaw;
        self.pitch = pitch;
        self
    }

    pub fn with_zoom(mut self, zoom: f32) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn with_fov(mut self, fov: f32) -> Self {
        self.fov = fov;
        self
    }

    pub fn with_background(mut self, background: [u8; 4]) -> Self {
        self.background = background;
        self
    }

    pub fn with_point_size(mut self, point_size: u32) -> Self {
        self.point_size = point_size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(VoxelError::config(format!(
                "image size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if !(self.fov > 0.0 && self.fov < 180.0) {
            return Err(VoxelError::config(format!(
                "field of view must be between 0 and 180 degrees, got {}",
                self.fov
            )));
        }
        if !(self.zoom.is_finite() && self.zoom > 0.0) {
            return Err(VoxelError::config(format!(
                "zoom must be positive, got {}",
                self.zoom
            )));
        }
        if !(self.yaw.is_finite() && self.pitch.is_finite()) {
            return Err(VoxelError::config("camera angles must be finite"));
        }
        Ok(())
    }
}

/// Brightness applied per face direction.
fn shade(direction: Direction) -> f32 {
    match direction {
        Direction::PosY => 1.0,
        Direction::NegY => 0.5,
        Direction::PosX | Direction::NegX => 0.8,
        Direction::PosZ | Direction::NegZ => 0.6,
    }
}

#[derive(Clone, Copy)]
struct ScreenVertex {
    x: f32,
    y: f32,
    depth: f32,
    inv_w: f32,
}

struct Canvas {
    image: RgbaImage,
    depth: Vec<f32>,
    view_proj: Mat4,
}

impl Canvas {
    fn new(config: &RenderConfig, view_proj: Mat4) -> Self {
        Self {
            image: RgbaImage::from_pixel(config.width, config.height, Rgba(config.background)),
            depth: vec![f32::INFINITY; (config.width as usize) * (config.height as usize)],
            view_proj,
        }
    }

    fn project(&self, p: [f32; 3]) -> Option<ScreenVertex> {
        let clip = transform4(&self.view_proj, p);
        if clip[3] <= 1e-6 {
            return None;
        }
        let inv_w = 1.0 / clip[3];
        let (w, h) = self.image.dimensions();
        Some(ScreenVertex {
            x: (clip[0] * inv_w * 0.5 + 0.5) * w as f32,
            y: (0.5 - clip[1] * inv_w * 0.5) * h as f32,
            depth: clip[2] * inv_w,
            inv_w,
        })
    }

    /// Depth test and write. Returns false when the fragment is hidden.
    fn test_depth(&mut self, x: u32, y: u32, depth: f32) -> bool {
        if !(0.0..=1.0).contains(&depth) {
            return false;
        }
        let i = y as usize * self.image.width() as usize + x as usize;
        if depth >= self.depth[i] {
            return false;
        }
        self.depth[i] = depth;
        true
    }

    /// Fill a triangle, calling `fragment` with perspective-correct
    /// barycentric weights for every covered pixel center.
    fn triangle<F>(&mut self, v: [ScreenVertex; 3], mut fragment: F)
    where
        F: FnMut([f32; 3]) -> Option<[u8; 4]>,
    {
        let area = edge(v[0], v[1], v[2].x, v[2].y);
        if area.abs() < 1e-12 {
            return;
        }
        let (w, h) = self.image.dimensions();
        let min_x = v.iter().map(|p| p.x).fold(f32::INFINITY, f32::min).floor().max(0.0) as u32;
        let min_y = v.iter().map(|p| p.y).fold(f32::INFINITY, f32::min).floor().max(0.0) as u32;
        let max_x = v.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max).ceil().min(w as f32);
        let max_y = v.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max).ceil().min(h as f32);
        if max_x <= 0.0 || max_y <= 0.0 {
            return;
        }

        for y in min_y..max_y as u32 {
            for x in min_x..max_x as u32 {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;
                let l = [
                    edge(v[1], v[2], px, py) / area,
                    edge(v[2], v[0], px, py) / area,
                    edge(v[0], v[1], px, py) / area,
                ];
                if l.iter().any(|&b| b < 0.0) {
                    continue;
                }
                let depth = l[0] * v[0].depth + l[1] * v[1].depth + l[2] * v[2].depth;
                let pw = [l[0] * v[0].inv_w, l[1] * v[1].inv_w, l[2] * v[2].inv_w];
                let sum = pw[0] + pw[1] + pw[2];
                if sum <= 0.0 {
                    continue;
                }
                let bary = [pw[0] / sum, pw[1] / sum, pw[2] / sum];

                let i = y as usize * w as usize + x as usize;
                if !(0.0..=1.0).contains(&depth) || depth >= self.depth[i] {
                    continue;
                }
                if let Some(color) = fragment(bary) {
                    self.depth[i] = depth;
                    self.image.put_pixel(x, y, Rgba(color));
                }
            }
        }
    }
}

fn edge(a: ScreenVertex, b: ScreenVertex, px: f32, py: f32) -> f32 {
    (b.x - a.x) * (py - a.y) - (b.y - a.y) * (px - a.x)
}

fn bounds_of(points: impl Iterator<Item = [f32; 3]>) -> Option<([f32; 3], [f32; 3])> {
    let mut out: Option<([f32; 3], [f32; 3])> = None;
    for p in points {
        let (min, max) = out.get_or_insert((p, p));
        for i in 0..3 {
            min[i] = min[i].min(p[i]);
            max[i] = max[i].max(p[i]);
        }
    }
    out
}

/// Render textured voxel faces. Faces pointing away from the camera are
/// skipped; texels with zero alpha are see-through.
pub fn render_faces(faces: &[Face], palette: &BlockPalette, config: &RenderConfig) -> Result<RgbaImage> {
    config.validate()?;
    let Some((min, max)) = bounds_of(faces.iter().flat_map(|f| f.corners().map(to_f32))) else {
        return Ok(RgbaImage::from_pixel(config.width, config.height, Rgba(config.background)));
    };

    let camera = Camera::framing(min, max, config);
    let mut canvas = Canvas::new(config, camera.view_proj);
    let mut missing = 0usize;
    let mut drawn = 0usize;

    for face in faces {
        let center = to_f32(face.center());
        if dot3(to_f32(face.normal()), sub3(camera.eye, center)) <= 0.0 {
            continue;
        }
        let corners = face.corners().map(to_f32);
        let Some(projected) = project_all(&canvas, corners) else {
            continue;
        };
        let uvs = face.uvs();
        let light = shade(face.direction);
        let texture = palette.texture(face.texture);
        if texture.is_none() {
            missing += 1;
        }

        for [a, b, c] in [[0, 1, 2], [0, 2, 3]] {
            canvas.triangle([projected[a], projected[b], projected[c]], |bary| {
                let Some(texture) = texture else {
                    return Some(lit(MISSING_TEXTURE, light));
                };
                let u = bary[0] as f64 * uvs[a][0] + bary[1] as f64 * uvs[b][0] + bary[2] as f64 * uvs[c][0];
                let v = bary[0] as f64 * uvs[a][1] + bary[1] as f64 * uvs[b][1] + bary[2] as f64 * uvs[c][1];
                let (tw, th) = texture.dimensions();
                let tx = ((u * tw as f64) as i64).clamp(0, tw as i64 - 1) as u32;
                let ty = ((v * th as f64) as i64).clamp(0, th as i64 - 1) as u32;
                let texel = texture.get_pixel(tx, ty).0;
                (texel[3] != 0).then(|| lit(texel, light))
            });
        }
        drawn += 1;
    }

    if missing > 0 {
        log::warn!("{} faces reference a texture outside the palette", missing);
    }
    log::debug!("rendered {} of {} faces", drawn, faces.len());
    Ok(canvas.image)
}

fn project_all(canvas: &Canvas, corners: [[f32; 3]; 4]) -> Option<[ScreenVertex; 4]> {
    Some([
        canvas.project(corners[0])?,
        canvas.project(corners[1])?,
        canvas.project(corners[2])?,
        canvas.project(corners[3])?,
    ])
}

fn lit(color: [u8; 4], light: f32) -> [u8; 4] {
    let scale = |c: u8| (c as f32 * light).round().clamp(0.0, 255.0) as u8;
    [scale(color[0]), scale(color[1]), scale(color[2]), 255]
}

/// Render a point cloud as square splats of `point_size` pixels.
pub fn render_points(cloud: &PointCloud, config: &RenderConfig) -> Result<RgbaImage> {
    config.validate()?;
    let Some((min, max)) = cloud.bounds() else {
        return Ok(RgbaImage::from_pixel(config.width, config.height, Rgba(config.background)));
    };

    let camera = Camera::framing(to_f32(min), to_f32(max), config);
    let mut canvas = Canvas::new(config, camera.view_proj);
    let half = (config.point_size.max(1) as f32) * 0.5;
    let (w, h) = (config.width as f32, config.height as f32);

    for point in cloud.iter() {
        if !point.position.iter().all(|c| c.is_finite()) {
            continue;
        }
        let Some(v) = canvas.project(to_f32(point.position)) else {
            continue;
        };
        let [r, g, b] = point.color.to_u8();
        let x0 = (v.x - half).round().max(0.0);
        let y0 = (v.y - half).round().max(0.0);
        let x1 = (v.x + half).round().min(w);
        let y1 = (v.y + half).round().min(h);
        if x1 <= x0 || y1 <= y0 {
            continue;
        }
        for y in y0 as u32..y1 as u32 {
            for x in x0 as u32..x1 as u32 {
                if canvas.test_depth(x, y, v.depth) {
                    canvas.image.put_pixel(x, y, Rgba([r, g, b, 255]));
                }
            }
        }
    }

    Ok(canvas.image)
}

pub fn save_png(image: &RgbaImage, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    image
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| VoxelError::resource(path, e))
}
