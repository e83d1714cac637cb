use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use voxblock::pipeline::{voxelize_mesh_file, Voxelization};
use voxblock::{logging, render_points, save_png, save_table, RenderConfig, VoxelizeConfig};

#[derive(Parser)]
#[command(name = "voxelize")]
#[command(about = "Convert a colored mesh into a voxel table", long_about = None)]
struct Cli {
    /// Mesh file (.glb, .gltf or .obj)
    input: PathBuf,

    /// Voxel table to write (.csv)
    output: PathBuf,

    /// Edge length of one voxel, in mesh units
    #[arg(allow_negative_numbers = true)]
    voxel_size: f64,

    /// Fine grid factor used for the per-voxel color variance
    #[arg(short, long, default_value_t = voxblock::voxelize::DEFAULT_SUBDIVISION)]
    subdivision: u32,

    /// Only average colors; write no variance column
    #[arg(long, conflicts_with = "subdivision")]
    single_resolution: bool,

    /// Also render the colored point cloud to this PNG
    #[arg(long)]
    preview: Option<PathBuf>,
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
    let config = if cli.single_resolution {
        VoxelizeConfig::new(cli.voxel_size).single_resolution()
    } else {
        VoxelizeConfig::new(cli.voxel_size).with_subdivision(cli.subdivision)
    };

    let Voxelization {
        cloud,
        grid,
        mut report,
    } = voxelize_mesh_file(&cli.input, &config)?;
    report.stage("export", || save_table(&cli.output, &grid))?;

    if let Some(path) = &cli.preview {
        let image = report.stage("preview", || render_points(&cloud, &RenderConfig::default()))?;
        save_png(&image, path)?;
    }

    tracing::info!(
        points = report.points,
        voxels = report.voxels,
        total_ms = report.total().as_secs_f64() * 1000.0,
        "wrote {}",
        cli.output.display()
    );
    Ok(())
}
