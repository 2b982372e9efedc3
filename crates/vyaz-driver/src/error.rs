//! Driver-level failures that are not diagnostics

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use vyaz_codegen::CodegenError;

use crate::watch::Cancelled;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("cannot access '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    #[error("cannot serialize output: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    SourceMap(#[from] CodegenError),
}

impl DriverError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DriverError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, DriverError>;
