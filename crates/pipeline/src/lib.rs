pub mod classify;
pub mod error;
pub mod image;
pub mod pose;
pub mod tensor;

// Re-export commonly used types for convenience
pub use classify::{Ranking, ScoredLabel};
pub use error::PipelineError;
pub use image::{RgbImage, ScalePolicy};
pub use tensor::{ElementType, TensorLayout};
