use pipeline::PipelineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutorError {
    /// The native runtime failed or returned an unexpected buffer.
    /// Transient per frame; callers may skip and continue.
    #[error("native runtime failure: {0}")]
    Runtime(String),

    /// A label file or model asset could not be loaded. Fatal at startup.
    #[error("failed to load asset {path}: {reason}")]
    AssetLoad { path: String, reason: String },

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}
