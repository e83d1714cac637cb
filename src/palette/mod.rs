//! Block palettes: candidate textures with precomputed average colors.
//!
//! A palette definition is a JSON array of [`TextureStats`] (see
//! [`stats`] for how they are produced). Loading applies a
//! [`PaletteFilter`], then decodes every remaining texture; a texture that
//! cannot be read aborts the load.

pub mod stats;

pub use stats::{scan_directory, save_palette, texture_stats, FaceKind, TextureStats};

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::color::Rgb;
use crate::error::{Result, VoxelError};

/// Selects which palette definition entries take part in matching.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaletteFilter {
    /// Keep only textures for this face kind.
    pub face: Option<FaceKind>,
    /// Keep only textures without transparent pixels.
    pub require_full: bool,
    /// Keep only textures with `sqrt(var_r + var_g + var_b)` at most this.
    pub max_std: Option<f64>,
}

impl PaletteFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_face(mut self, face: FaceKind) -> Self {
        self.face = Some(face);
        self
    }

    pub fn with_require_full(mut self, require_full: bool) -> Self {
        self.require_full = require_full;
        self
    }

    pub fn with_max_std(mut self, max_std: f64) -> Self {
        self.max_std = Some(max_std);
        self
    }

    pub fn validate(&self) -> Result<()> {
        match self.max_std {
            Some(s) if !(s.is_finite() && s >= 0.0) => Err(VoxelError::config(format!(
                "maximum texture deviation must be a non-negative number, got {}",
                s
            ))),
            _ => Ok(()),
        }
    }

    pub fn accepts(&self, stats: &TextureStats) -> bool {
        if self.face.is_some_and(|face| stats.face != face) {
            return false;
        }
        if self.require_full && !stats.full {
            return false;
        }
        match self.max_std {
            Some(max) => stats.std_sum() <= max,
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaletteEntry {
    /// Position of the entry in the loaded palette.
    pub id: usize,
    pub name: SmolStr,
    /// Average texture color on the 0-255 scale.
    pub color: [f64; 3],
    pub texture_path: PathBuf,
    pub stats: TextureStats,
}

impl PaletteEntry {
    pub fn rgb(&self) -> Rgb {
        Rgb::from_255(self.color)
    }
}

/// A loaded palette. Read-only once built.
#[derive(Debug, Clone)]
pub struct BlockPalette {
    entries: Vec<PaletteEntry>,
    textures: Vec<Arc<RgbaImage>>,
}

impl BlockPalette {
    /// Build from already decoded textures. Fails on an empty palette or a
    /// texture count that does not match the entries.
    pub fn from_parts(entries: Vec<PaletteEntry>, textures: Vec<Arc<RgbaImage>>) -> Result<Self> {
        if entries.is_empty() {
            return Err(VoxelError::config("block palette is empty"));
        }
        if entries.len() != textures.len() {
            return Err(VoxelError::config(format!(
                "{} palette entries but {} textures",
                entries.len(),
                textures.len()
            )));
        }
        Ok(Self { entries, textures })
    }

    /// Palette of flat-colored 1x1 textures, one per color (0-255 scale).
    pub fn from_colors(colors: &[[f64; 3]]) -> Result<Self> {
        let mut entries = Vec::with_capacity(colors.len());
        let mut textures = Vec::with_capacity(colors.len());
        for (id, &color) in colors.iter().enumerate() {
            let rgb = Rgb::from_255(color).to_u8();
            textures.push(Arc::new(RgbaImage::from_pixel(
                1,
                1,
                image::Rgba([rgb[0], rgb[1], rgb[2], 255]),
            )));
            entries.push(PaletteEntry {
                id,
                name: SmolStr::new(format!("color {}", id)),
                color,
                texture_path: PathBuf::new(),
                stats: TextureStats::solid(color),
            });
        }
        Self::from_parts(entries, textures)
    }

    /// Read a palette definition file, filter it and load its textures.
    pub fn load(path: impl AsRef<Path>, filter: &PaletteFilter) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| VoxelError::resource(path, e))?;
        let definition: Vec<TextureStats> = serde_json::from_str(&text).map_err(|e| {
            VoxelError::data(format!(
                "invalid palette definition {}: {}",
                path.display(),
                e
            ))
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_definition(definition, base_dir, filter)
    }

    /// Filter `definition` and load its textures, resolving relative texture
    /// paths against `base_dir`.
    pub fn from_definition(
        definition: Vec<TextureStats>,
        base_dir: &Path,
        filter: &PaletteFilter,
    ) -> Result<Self> {
        filter.validate()?;
        let total = definition.len();
        let kept: Vec<TextureStats> = definition
            .into_iter()
            .filter(|s| filter.accepts(s))
            .collect();
        if kept.is_empty() {
            return Err(VoxelError::config(format!(
                "block palette is empty ({} entries defined, none pass the filter)",
                total
            )));
        }

        let mut entries = Vec::with_capacity(kept.len());
        let mut textures = Vec::with_capacity(kept.len());
        for (id, stats) in kept.into_iter().enumerate() {
            let texture_path = base_dir.join(&stats.file_path);
            let image = image::open(&texture_path)
                .map_err(|e| VoxelError::resource(&texture_path, e))?
                .to_rgba8();
            textures.push(Arc::new(image));
            entries.push(PaletteEntry {
                id,
                name: SmolStr::new(&stats.file_name),
                color: stats.average(),
                texture_path,
                stats,
            });
        }

        log::debug!("loaded {} of {} palette entries", entries.len(), total);
        Self::from_parts(entries, textures)
    }

    pub fn entries(&self) -> &[PaletteEntry] {
        &self.entries
    }

    pub fn entry(&self, id: usize) -> Option<&PaletteEntry> {
        self.entries.get(id)
    }

    pub fn texture(&self, id: usize) -> Option<&Arc<RgbaImage>> {
        self.textures.get(id)
    }

    /// Average colors on the 0-255 scale, in entry order.
    pub fn colors(&self) -> Vec<[f64; 3]> {
        self.entries.iter().map(|e| e.color).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
