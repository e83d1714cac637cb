use std::path::{Path, PathBuf};

/// Error type shared by every stage of the voxel pipeline.
#[derive(Debug, thiserror::Error)]
pub enum VoxelError {
    /// A file could not be opened, decoded or written.
    #[error("Resource error: {}: {reason}", path.display())]
    Resource { path: PathBuf, reason: String },
    /// Invalid arguments or settings (voxel size, palette contents, image size, ...).
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// Malformed input data, e.g. a voxel table with a bad header.
    #[error("Data error: {0}")]
    Data(String),
}

pub type Result<T> = std::result::Result<T, VoxelError>;

impl VoxelError {
    pub fn resource(path: impl AsRef<Path>, reason: impl ToString) -> Self {
        VoxelError::Resource {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        VoxelError::Configuration(message.into())
    }

    pub fn data(message: impl Into<String>) -> Self {
        VoxelError::Data(message.into())
    }
}
