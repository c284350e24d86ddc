use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid image geometry: {0}")]
    InvalidGeometry(String),

    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("resize failed: {0}")]
    Resize(String),
}
