pub mod backend;
pub mod config;
pub mod error;
pub mod labels;
pub mod logging;
pub mod session;
pub mod worker;

// Re-export commonly used types for convenience
pub use backend::{BufferCounts, NativeModel, RuntimeDriver};
pub use config::ExecutorConfig;
pub use error::ExecutorError;
pub use session::{ClassifySession, ModelIo, PoseSession, Threshold};
pub use worker::{FrameProcessor, FrameWorker, Listener};
