use srtm::SrtmError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TerrainError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("unreadable tile directory {0}")]
    Path(PathBuf),

    #[error("{0}")]
    Srtm(#[from] SrtmError),
}
