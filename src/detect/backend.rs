use image::DynamicImage;

use crate::detect::result::RawDetection;
use crate::error::Result;

/// Role a detection source plays in the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceRole {
    /// General-purpose object detector (COCO classes).
    General,
    /// Specialized face detector.
    Face,
}

impl SourceRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Face => "face",
        }
    }
}

/// A loaded model that turns an image into raw detections.
///
/// `infer` takes `&mut self` because inference sessions are not assumed to be
/// reentrant; the pipeline wraps each source in its own `Mutex`.
pub trait DetectionSource: Send {
    /// Model identifier, used in logs and error messages.
    fn name(&self) -> &str;

    fn role(&self) -> SourceRole;

    /// Run the model over one image.
    ///
    /// Returned boxes are in the pixel space of `image`. Order is the model's
    /// own output order and is preserved by the merger.
    fn infer(&mut self, image: &DynamicImage) -> Result<Vec<RawDetection>>;

    /// Optional warm-up hook, called once after loading.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
