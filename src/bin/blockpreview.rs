use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

use voxblock::pipeline::{preview_file, PreviewOptions};
use voxblock::{logging, ClusterConfig, ColorMetric, FaceKind, PaletteFilter, RenderConfig, SmoothConfig};

#[derive(Clone, Copy, ValueEnum)]
enum Metric {
    Euclidean,
    Ciede2000,
}

#[derive(Clone, Copy, ValueEnum)]
enum Face {
    Top,
    Bottom,
    Side,
    Any,
}

#[derive(Parser)]
#[command(name = "blockpreview")]
#[command(about = "Match a voxel table against a block palette and render it", long_about = None)]
struct Cli {
    /// Voxel table written by `voxelize`
    table: PathBuf,

    /// Palette definition written by `blockpalette`
    palette: PathBuf,

    /// PNG to write
    output: PathBuf,

    #[arg(long, default_value_t = 1024)]
    width: u32,

    #[arg(long, default_value_t = 1024)]
    height: u32,

    /// Camera yaw in degrees
    #[arg(long, default_value_t = 45.0, allow_negative_numbers = true)]
    yaw: f32,

    /// Camera pitch in degrees
    #[arg(long, default_value_t = 30.0, allow_negative_numbers = true)]
    pitch: f32,

    #[arg(long, default_value_t = 1.0)]
    zoom: f32,

    #[arg(long, default_value_t = 45.0)]
    fov: f32,

    #[arg(long, value_enum, default_value_t = Metric::Euclidean)]
    metric: Metric,

    /// Only use textures made for this face
    #[arg(long, value_enum)]
    face: Option<Face>,

    /// Skip textures with transparent pixels
    #[arg(long)]
    full: bool,

    /// Skip textures whose color deviation exceeds this
    #[arg(long)]
    max_std: Option<f64>,

    /// Bilateral smoothing of voxel colors before matching
    #[arg(long)]
    smooth: bool,

    #[arg(long, default_value_t = 1, requires = "smooth")]
    smooth_radius: u32,

    /// Merge similar voxel colors (DBSCAN in Lab) before matching
    #[arg(long)]
    cluster: bool,

    /// Lab distance below which two colors are neighbors
    #[arg(long, default_value_t = 5.0, requires = "cluster")]
    cluster_epsilon: f64,

    /// Neighbors needed for a color to seed a cluster
    #[arg(long, default_value_t = 5, requires = "cluster")]
    cluster_min_points: usize,

    /// Also write the block model as OBJ + MTL
    #[arg(long)]
    obj: Option<PathBuf>,
}

fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> voxblock::Result<()> {
    let mut filter = PaletteFilter::new().with_require_full(cli.full);
    if let Some(face) = cli.face {
        filter = filter.with_face(match face {
            Face::Top => FaceKind::Top,
            Face::Bottom => FaceKind::Bottom,
            Face::Side => FaceKind::Side,
            Face::Any => FaceKind::Any,
        });
    }
    if let Some(max_std) = cli.max_std {
        filter = filter.with_max_std(max_std);
    }

    let options = PreviewOptions {
        filter,
        metric: match cli.metric {
            Metric::Euclidean => ColorMetric::Euclidean,
            Metric::Ciede2000 => ColorMetric::Ciede2000,
        },
        smoothing: cli
            .smooth
            .then(|| SmoothConfig::default().with_radius(cli.smooth_radius)),
        clustering: cli.cluster.then(|| {
            ClusterConfig::default()
                .with_epsilon(cli.cluster_epsilon)
                .with_min_points(cli.cluster_min_points)
        }),
        render: RenderConfig::default()
            .with_size(cli.width, cli.height)
            .with_angles(cli.yaw, cli.pitch)
            .with_zoom(cli.zoom)
            .with_fov(cli.fov),
        obj_output: cli.obj,
    };

    let report = preview_file(&cli.table, &cli.palette, &cli.output, &options)?;
    tracing::info!(
        voxels = report.voxels,
        faces = report.faces,
        "wrote {}",
        cli.output.display()
    );
    Ok(())
}
