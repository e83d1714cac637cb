//! Colored voxelization of textured meshes.
//!
//! The crate turns a mesh into a sparse grid of colored voxels written as a
//! delimited text table, and turns such a table back into a block model by
//! matching every voxel color against a palette of block textures and
//! extracting the exposed faces for a preview render.
//!
//! ```ignore
//! use voxblock::{pipeline, VoxelizeConfig};
//!
//! let report = pipeline::voxelize_file("model.glb", "model.csv", &VoxelizeConfig::new(0.05))?;
//! println!("{} voxels", report.voxels);
//! ```

pub mod clustering;
pub mod color;
pub mod error;
pub mod faces;
pub mod grid;
pub mod logging;
pub mod matcher;
pub mod math;
pub mod mesh;
pub mod palette;
pub mod pipeline;
pub mod point_cloud;
pub mod preview;
pub mod smoothing;
pub mod table;
pub mod voxelize;

pub use clustering::{cluster_colors, ClusterConfig};
pub use color::{Lab, Rgb};
pub use error::{Result, VoxelError};
pub use faces::{expose_faces, write_obj, Face, OccupancySet, TexturedVoxel};
pub use grid::{Direction, GridIndex};
pub use matcher::{match_voxels, BlockMatcher, ColorMetric};
pub use mesh::{load_mesh, ColorSource, Material, MaterialTexture, Mesh, MeshImporter, MeshLoader, MeshPart};
pub use palette::{BlockPalette, FaceKind, PaletteEntry, PaletteFilter, TextureStats};
pub use pipeline::{PipelineReport, PreviewOptions};
pub use point_cloud::{Point, PointCloud};
pub use preview::{render_faces, render_points, save_png, RenderConfig};
pub use smoothing::{smooth_colors, SmoothConfig};
pub use table::{load_table, read_table, save_table, write_table, TableSchema, VoxelTable};
pub use voxelize::{voxelize, voxelize_multires, VoxelGrid, VoxelRecord, VoxelizeConfig, Voxelizer};
