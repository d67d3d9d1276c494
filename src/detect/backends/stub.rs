use image::DynamicImage;

use crate::detect::backend::{DetectionSource, SourceRole};
use crate::detect::result::RawDetection;
use crate::error::{HectorError, Result};

/// Stub source for testing. Returns a fixed detection list for every image.
///
/// Can be told to fail a number of leading calls to exercise error paths.
pub struct StubSource {
    name: String,
    role: SourceRole,
    detections: Vec<RawDetection>,
    failures_remaining: usize,
    calls: u64,
}

impl StubSource {
    pub fn new(name: impl Into<String>, role: SourceRole, detections: Vec<RawDetection>) -> Self {
        Self {
            name: name.into(),
            role,
            detections,
            failures_remaining: 0,
            calls: 0,
        }
    }

    /// A source that never detects anything.
    pub fn empty(name: impl Into<String>, role: SourceRole) -> Self {
        Self::new(name, role, Vec::new())
    }

    /// Fail the next `count` calls to `infer` with an inference error.
    pub fn with_failures(mut self, count: usize) -> Self {
        self.failures_remaining = count;
        self
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl DetectionSource for StubSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> SourceRole {
        self.role
    }

    fn infer(&mut self, _image: &DynamicImage) -> Result<Vec<RawDetection>> {
        self.calls += 1;
        if self.failures_remaining > 0 {
            self.failures_remaining -= 1;
            return Err(HectorError::inference(&self.name, "stub configured to fail"));
        }
        Ok(self.detections.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_returns_fixture_after_configured_failures() {
        let image = DynamicImage::new_rgb8(4, 4);
        let fixture = vec![RawDetection::new([0.0, 0.0, 2.0, 2.0], "cat", 0.5)];
        let mut source =
            StubSource::new("stub", SourceRole::General, fixture.clone()).with_failures(1);

        assert!(matches!(
            source.infer(&image),
            Err(HectorError::Inference { .. })
        ));
        assert_eq!(source.infer(&image).unwrap(), fixture);
        assert_eq!(source.calls(), 2);
    }
}
