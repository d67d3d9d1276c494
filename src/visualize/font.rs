//! Label fonts.
//!
//! The renderer only needs to measure a string and draw it at a top-left
//! position; `LabelFont` is that seam. `GlyphFont` implements it for any
//! TrueType/OpenType font file.

use std::path::Path;

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};

use crate::error::{HectorError, Result};

/// Pixel height of the font at `font_scale == 1.0`.
pub const BASE_FONT_PX: f32 = 30.0;

const SYSTEM_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Size of a rendered string.
///
/// `height` is the extent above the baseline and `baseline` the extent below it,
/// so the full line occupies `height + baseline` pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextMetrics {
    pub width: i32,
    pub height: i32,
    pub baseline: i32,
}

pub trait LabelFont: Send + Sync {
    fn measure(&self, text: &str, font_scale: f32) -> TextMetrics;

    /// Draw `text` with its top-left corner at `(x, top)`.
    fn draw(&self, canvas: &mut RgbImage, text: &str, x: i32, top: i32, font_scale: f32, color: Rgb<u8>);
}

pub struct GlyphFont {
    font: FontVec,
}

impl GlyphFont {
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| {
            HectorError::configuration(format!("failed to read font {}: {}", path.display(), e))
        })?;
        let font = FontVec::try_from_vec(data).map_err(|_| {
            HectorError::configuration(format!("failed to parse font file {}", path.display()))
        })?;
        Ok(Self { font })
    }

    /// First font found in common system locations.
    pub fn system() -> Option<Self> {
        for path in SYSTEM_FONT_PATHS {
            if let Ok(font) = Self::from_path(Path::new(path)) {
                log::info!("loaded system font: {}", path);
                return Some(font);
            }
        }
        log::debug!("no system font found");
        None
    }

    /// Configured font when given, otherwise a system font.
    pub fn resolve(path: Option<&Path>) -> Result<Option<Self>> {
        match path {
            Some(path) => Self::from_path(path).map(Some),
            None => Ok(Self::system()),
        }
    }

    fn scale(font_scale: f32) -> PxScale {
        PxScale::from(BASE_FONT_PX * font_scale)
    }
}

impl LabelFont for GlyphFont {
    fn measure(&self, text: &str, font_scale: f32) -> TextMetrics {
        let scale = Self::scale(font_scale);
        let (width, _) = text_size(scale, &self.font, text);
        // draw_text_mut puts the baseline at `top + ascent`.
        let scaled = self.font.as_scaled(scale);
        TextMetrics {
            width: width as i32,
            height: scaled.ascent().ceil().max(0.0) as i32,
            baseline: (-scaled.descent()).ceil().max(0.0) as i32,
        }
    }

    fn draw(&self, canvas: &mut RgbImage, text: &str, x: i32, top: i32, font_scale: f32, color: Rgb<u8>) {
        draw_text_mut(canvas, color, x, top, Self::scale(font_scale), &self.font, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::PixelBox;
    use crate::visualize::label_placement;

    #[test]
    fn missing_font_file_is_configuration_error() {
        let err = GlyphFont::from_path(Path::new("/nonexistent/font.ttf"))
            .err()
            .expect("font should not load");
        assert!(matches!(err, HectorError::Configuration(_)));
    }

    #[test]
    fn drawn_label_stays_within_measured_extent() {
        let Some(font) = GlyphFont::system() else {
            return;
        };
        let text = "face (0.75)";
        let metrics = font.measure(text, 0.5);
        assert!(metrics.height > 0 && metrics.baseline > 0);

        let bbox = PixelBox { x1: 5, y1: 30, x2: 95, y2: 39 };
        let placement = label_placement(&bbox, &metrics, (100, 40));
        let background = Rgb([0, 0, 0]);
        let mut canvas = RgbImage::from_pixel(100, 40, background);
        font.draw(&mut canvas, text, placement.x, placement.top, 0.5, Rgb([255, 255, 255]));

        let rows: Vec<i32> = canvas
            .enumerate_pixels()
            .filter(|(_, _, pixel)| **pixel != background)
            .map(|(_, y, _)| y as i32)
            .collect();
        let first = *rows.iter().min().expect("label drew nothing");
        let last = *rows.iter().max().expect("label drew nothing");

        assert!(first >= placement.top, "ink at row {first} above top {}", placement.top);
        assert!(
            last < placement.top + metrics.height + metrics.baseline,
            "ink at row {last} below measured extent"
        );
        assert!(placement.top + metrics.height + metrics.baseline <= 40);
        // Baseline sits at the top of the box unless the canvas pushes it up.
        assert!(placement.top + metrics.height <= bbox.y1);
    }

    #[test]
    fn garbage_font_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"definitely not a font").unwrap();
        assert!(GlyphFont::from_path(&path).is_err());
    }
}
