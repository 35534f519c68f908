use std::path::PathBuf;

/// Top-level reasons a mesh load fails.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("mesh file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read mesh data: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed binary scene: {0}")]
    Malformed(String),

    #[error("no usable geometry: {0}")]
    Empty(&'static str),
}

pub type ParseResult<T> = Result<T, ParseError>;
