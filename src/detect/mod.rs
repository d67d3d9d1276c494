mod backend;
mod backends;
pub mod catalog;
mod merge;
mod result;
pub mod yolo;

pub use backend::{DetectionSource, SourceRole};
pub use backends::StubSource;
#[cfg(feature = "backend-tract")]
pub use backends::TractSource;
pub use catalog::ModelSpec;
pub use merge::merge;
pub use result::{DetectionResult, PixelBox, RawDetection, UnifiedDetection};
