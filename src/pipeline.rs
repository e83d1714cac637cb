//! End-to-end runs: mesh to voxel table, and voxel table to preview image.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::clustering::{cluster_colors, ClusterConfig};
use crate::error::Result;
use crate::faces::{expose_faces, write_obj, TexturedVoxel};
use crate::matcher::{match_voxels, ColorMetric};
use crate::mesh::load_mesh;
use crate::palette::{BlockPalette, PaletteFilter};
use crate::point_cloud::PointCloud;
use crate::preview::{render_faces, save_png, RenderConfig};
use crate::smoothing::{smooth_colors, SmoothConfig};
use crate::table::{load_table, save_table};
use crate::voxelize::{VoxelGrid, VoxelizeConfig, Voxelizer};

#[derive(Debug, Clone, Serialize)]
pub struct StageTiming {
    pub stage: &'static str,
    pub elapsed: Duration,
}

/// Counts and wall time of one pipeline run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    pub mesh_parts: usize,
    pub vertices: usize,
    pub triangles: usize,
    pub points: usize,
    pub voxels: usize,
    pub faces: usize,
    pub palette_entries: usize,
    pub stages: Vec<StageTiming>,
}

impl PipelineReport {
    /// Run `f` inside a tracing span named after the stage and record how
    /// long it took.
    pub fn stage<T>(&mut self, stage: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let span = tracing::info_span!("stage", stage);
        let _guard = span.enter();
        let start = Instant::now();
        let out = f()?;
        let elapsed = start.elapsed();
        tracing::info!(stage, elapsed_ms = elapsed.as_secs_f64() * 1000.0, "stage finished");
        self.stages.push(StageTiming { stage, elapsed });
        Ok(out)
    }

    pub fn total(&self) -> Duration {
        self.stages.iter().map(|s| s.elapsed).sum()
    }
}

/// Output of [`voxelize_mesh_file`].
pub struct Voxelization {
    pub cloud: PointCloud,
    pub grid: VoxelGrid,
    pub report: PipelineReport,
}

/// Load a mesh, resolve its colors into a point cloud and aggregate it.
pub fn voxelize_mesh_file(input: impl AsRef<Path>, config: &VoxelizeConfig) -> Result<Voxelization> {
    config.validate()?;
    let input = input.as_ref();
    let mut report = PipelineReport::default();

    let mesh = report.stage("load", || load_mesh(input))?;
    report.mesh_parts = mesh.parts.len();
    report.vertices = mesh.vertex_count();
    report.triangles = mesh.face_count();
    if mesh.is_empty() {
        log::warn!("{} contains no vertices", input.display());
    }

    let cloud = report.stage("colorize", || Ok(PointCloud::from_mesh(&mesh)))?;
    report.points = cloud.len();

    let voxelizer = Voxelizer::new(config.clone());
    let grid = report.stage("voxelize", || voxelizer.voxelize(&cloud))?;
    report.voxels = grid.len();

    Ok(Voxelization {
        cloud,
        grid,
        report,
    })
}

/// Mesh file in, voxel table out.
pub fn voxelize_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &VoxelizeConfig,
) -> Result<PipelineReport> {
    let Voxelization { grid, mut report, .. } = voxelize_mesh_file(input, config)?;
    report.stage("export", || save_table(output, &grid))?;
    tracing::info!(
        voxels = report.voxels,
        total_ms = report.total().as_secs_f64() * 1000.0,
        "voxelization finished"
    );
    Ok(report)
}

#[derive(Debug, Clone, Default)]
pub struct PreviewOptions {
    pub filter: PaletteFilter,
    pub metric: ColorMetric,
    pub smoothing: Option<SmoothConfig>,
    /// Density clustering of colors in Lab, applied after smoothing.
    pub clustering: Option<ClusterConfig>,
    pub render: RenderConfig,
    /// Also write the exposed faces as OBJ + MTL.
    pub obj_output: Option<PathBuf>,
}

/// Voxel table and palette in, textured preview PNG out.
pub fn preview_file(
    table: impl AsRef<Path>,
    palette: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: &PreviewOptions,
) -> Result<PipelineReport> {
    options.render.validate()?;
    if let Some(smoothing) = &options.smoothing {
        smoothing.validate()?;
    }
    if let Some(clustering) = &options.clustering {
        clustering.validate()?;
    }
    let mut report = PipelineReport::default();

    let table = report.stage("load table", || load_table(table))?;
    report.voxels = table.len();

    let palette = report.stage("load palette", || BlockPalette::load(palette, &options.filter))?;
    report.palette_entries = palette.len();

    let records = match &options.smoothing {
        Some(config) => report.stage("smooth", || smooth_colors(&table.records, config))?,
        None => table.records,
    };
    let records = match &options.clustering {
        Some(config) => report.stage("cluster", || cluster_colors(&records, config))?,
        None => records,
    };

    let textures = report.stage("match", || match_voxels(&records, &palette, options.metric))?;
    let voxels: Vec<TexturedVoxel> = records
        .iter()
        .zip(textures)
        .map(|(r, texture)| TexturedVoxel::new(r.index, texture))
        .collect();

    let faces = report.stage("faces", || Ok(expose_faces(&voxels)))?;
    report.faces = faces.len();

    if let Some(obj) = &options.obj_output {
        report.stage("export obj", || write_obj(&faces, &palette, obj))?;
    }

    let image = report.stage("render", || render_faces(&faces, &palette, &options.render))?;
    report.stage("save", || save_png(&image, output))?;

    tracing::info!(
        voxels = report.voxels,
        faces = report.faces,
        total_ms = report.total().as_secs_f64() * 1000.0,
        "preview finished"
    );
    Ok(report)
}
