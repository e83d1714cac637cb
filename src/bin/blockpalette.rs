use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use voxblock::palette::{save_palette, scan_directory};
use voxblock::{logging, VoxelError};

#[derive(Parser)]
#[command(name = "blockpalette")]
#[command(about = "Compute a palette definition from a directory of block textures", long_about = None)]
struct Cli {
    /// Directory holding the block textures (*.png)
    textures: PathBuf,

    /// Palette definition to write (.json)
    output: PathBuf,
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
    // Texture paths are written absolute.
    let dir = std::fs::canonicalize(&cli.textures).map_err(|e| VoxelError::resource(&cli.textures, e))?;
    let stats = scan_directory(&dir)?;
    if stats.is_empty() {
        return Err(VoxelError::config(format!(
            "no readable textures in {}",
            dir.display()
        )));
    }
    save_palette(&cli.output, &stats)?;
    tracing::info!(entries = stats.len(), "wrote {}", cli.output.display());
    Ok(())
}
