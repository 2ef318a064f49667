use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SrtmError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("invalid HGT name {0}")]
    HgtName(PathBuf),

    #[error("invalid HGT byte len {0}")]
    HgtLen(u64),
}
