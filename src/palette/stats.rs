//! Texture statistics for palette definition files.

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::error::{Result, VoxelError};

/// Which block face a texture is meant for, taken from its file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaceKind {
    Top,
    Bottom,
    Side,
    /// No suffix: the texture covers every face.
    #[default]
    #[serde(rename = "null")]
    Any,
}

impl FaceKind {
    pub fn from_stem(stem: &str) -> Self {
        if stem.ends_with("_top") {
            FaceKind::Top
        } else if stem.ends_with("_bottom") {
            FaceKind::Bottom
        } else if stem.ends_with("_side") {
            FaceKind::Side
        } else {
            FaceKind::Any
        }
    }
}

/// One palette definition entry. Averages and variances use the 0-255 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureStats {
    pub file_path: String,
    pub file_name: String,
    #[serde(rename = "type")]
    pub face: FaceKind,
    pub full: bool,
    pub avg_r: f64,
    pub avg_g: f64,
    pub avg_b: f64,
    pub var_r: f64,
    pub var_g: f64,
    pub var_b: f64,
}

impl TextureStats {
    pub(crate) fn solid(color: [f64; 3]) -> Self {
        Self {
            file_path: String::new(),
            file_name: String::new(),
            face: FaceKind::Any,
            full: true,
            avg_r: color[0],
            avg_g: color[1],
            avg_b: color[2],
            var_r: 0.0,
            var_g: 0.0,
            var_b: 0.0,
        }
    }

    pub fn average(&self) -> [f64; 3] {
        [self.avg_r, self.avg_g, self.avg_b]
    }

    /// `sqrt(var_r + var_g + var_b)`
    pub fn std_sum(&self) -> f64 {
        (self.var_r + self.var_g + self.var_b).max(0.0).sqrt()
    }
}

/// Statistics over the non-transparent pixels of `image`.
pub fn texture_stats(path: &Path, image: &RgbaImage) -> TextureStats {
    let stem = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    let stem = stem.split('.').next().unwrap_or_default();

    let mut stats = TextureStats {
        file_path: path.to_string_lossy().into_owned(),
        file_name: stem.replace('_', " "),
        face: FaceKind::from_stem(stem),
        full: false,
        avg_r: 0.0,
        avg_g: 0.0,
        avg_b: 0.0,
        var_r: 0.0,
        var_g: 0.0,
        var_b: 0.0,
    };

    let mut sum = [0.0f64; 3];
    let mut sum_sq = [0.0f64; 3];
    let mut opaque = 0u64;
    for pixel in image.pixels() {
        let [r, g, b, a] = pixel.0;
        if a == 0 {
            continue;
        }
        for (i, c) in [r, g, b].into_iter().enumerate() {
            let c = c as f64;
            sum[i] += c;
            sum_sq[i] += c * c;
        }
        opaque += 1;
    }

    if opaque == 0 {
        return stats;
    }

    let n = opaque as f64;
    let avg = sum.map(|s| s / n);
    let var = [0, 1, 2].map(|i| (sum_sq[i] / n - avg[i] * avg[i]).max(0.0));
    stats.full = opaque == image.width() as u64 * image.height() as u64;
    [stats.avg_r, stats.avg_g, stats.avg_b] = avg;
    [stats.var_r, stats.var_g, stats.var_b] = var;
    stats
}

/// Statistics for every `*.png` in `dir`, in file name order. Files that
/// cannot be decoded are skipped.
pub fn scan_directory(dir: impl AsRef<Path>) -> Result<Vec<TextureStats>> {
    let dir = dir.as_ref();
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| VoxelError::resource(dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
        })
        .collect();
    files.sort();

    let mut out = Vec::with_capacity(files.len());
    for file in files {
        match image::open(&file) {
            Ok(img) => out.push(texture_stats(&file, &img.to_rgba8())),
            Err(e) => log::warn!("skipping {}: {}", file.display(), e),
        }
    }
    log::info!("computed statistics for {} textures in {}", out.len(), dir.display());
    Ok(out)
}

/// Write a palette definition as pretty-printed JSON.
pub fn save_palette(path: impl AsRef<Path>, stats: &[TextureStats]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| VoxelError::resource(path, e))?;
    serde_json::to_writer_pretty(BufWriter::new(file), stats)
        .map_err(|e| VoxelError::resource(path, e))
}
