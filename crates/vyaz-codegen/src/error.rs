//! Error types for code generation

use thiserror::Error;

/// Failures around generated output. Generation itself always succeeds.
#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("invalid source map: {0}")]
    SourceMap(#[from] serde_json::Error),
}
