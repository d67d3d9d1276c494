use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::detect::{PixelBox, UnifiedDetection};
use crate::error::{HectorError, Result};
use crate::visualize::colors::ColorMap;
use crate::visualize::font::{LabelFont, TextMetrics};

pub const DEFAULT_FONT_SCALE: f32 = 0.5;

pub const BOX_THICKNESS: i32 = 2;

/// Top-left corner of a rendered label.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LabelPlacement {
    pub x: i32,
    pub top: i32,
}

/// Where to draw the label for `bbox` on a `canvas` of `(width, height)`.
///
/// The label starts at the box's left edge unless that would overflow the
/// box's right edge, in which case it is shifted left to end at `x2`. The
/// baseline sits at `y1` unless the label would hang below `y2`. The result
/// is then clamped so the whole label stays on the canvas.
pub fn label_placement(bbox: &PixelBox, text: &TextMetrics, canvas: (u32, u32)) -> LabelPlacement {
    let (canvas_w, canvas_h) = (canvas.0 as i32, canvas.1 as i32);

    let x = bbox.x1.min(bbox.x2 - text.width);
    let x = x.min(canvas_w - text.width).max(0);

    let baseline_y = bbox.y1.min(bbox.y2 - text.height + text.baseline);
    let line_height = text.height + text.baseline;
    let top = (baseline_y - text.height)
        .min(canvas_h - line_height)
        .max(0);

    LabelPlacement { x, top }
}

/// Every class label in `detections` must have a color.
pub fn check_colors(detections: &[UnifiedDetection], colors: &ColorMap) -> Result<()> {
    match detections
        .iter()
        .find(|det| !colors.contains_key(&det.class_label))
    {
        Some(det) => Err(HectorError::MissingColor(det.class_label.clone())),
        None => Ok(()),
    }
}

/// Draw boxes and labels for `detections` onto a copy of `image`.
///
/// Detections are drawn in order, so later boxes paint over earlier ones.
/// Fails before drawing anything if a label has no color.
pub fn render(
    image: &RgbImage,
    detections: &[UnifiedDetection],
    colors: &ColorMap,
    font: &dyn LabelFont,
    font_scale: f32,
) -> Result<RgbImage> {
    check_colors(detections, colors)?;

    let mut canvas = image.clone();
    let dims = canvas.dimensions();
    for det in detections {
        let color = colors[&det.class_label];
        let text = det.label_text();
        let metrics = font.measure(&text, font_scale);
        let placement = label_placement(&det.bbox, &metrics, dims);

        draw_box(&mut canvas, &det.bbox, color);
        font.draw(&mut canvas, &text, placement.x, placement.top, font_scale, color);
    }
    Ok(canvas)
}

fn draw_box(canvas: &mut RgbImage, bbox: &PixelBox, color: Rgb<u8>) {
    for inset in 0..BOX_THICKNESS {
        let width = bbox.width() - 2 * inset + 1;
        let height = bbox.height() - 2 * inset + 1;
        if width <= 0 || height <= 0 {
            break;
        }
        let rect = Rect::at(bbox.x1 + inset, bbox.y1 + inset).of_size(width as u32, height as u32);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::detect::RawDetection;

    /// Fixed-metric font: every character is `char_width` wide. Draws a solid bar.
    pub(crate) struct BlockFont {
        pub char_width: i32,
        pub height: i32,
        pub baseline: i32,
    }

    impl LabelFont for BlockFont {
        fn measure(&self, text: &str, _font_scale: f32) -> TextMetrics {
            TextMetrics {
                width: self.char_width * text.chars().count() as i32,
                height: self.height,
                baseline: self.baseline,
            }
        }

        fn draw(&self, canvas: &mut RgbImage, text: &str, x: i32, top: i32, font_scale: f32, color: Rgb<u8>) {
            let m = self.measure(text, font_scale);
            for y in top..top + m.height + m.baseline {
                for x in x..x + m.width {
                    if x >= 0 && y >= 0 && (x as u32) < canvas.width() && (y as u32) < canvas.height() {
                        canvas.put_pixel(x as u32, y as u32, color);
                    }
                }
            }
        }
    }

    fn bbox(x1: i32, y1: i32, x2: i32, y2: i32) -> PixelBox {
        PixelBox { x1, y1, x2, y2 }
    }

    fn metrics(width: i32, height: i32, baseline: i32) -> TextMetrics {
        TextMetrics {
            width,
            height,
            baseline,
        }
    }

    fn detection(bbox: [f32; 4], label: &str) -> UnifiedDetection {
        UnifiedDetection::from_raw(&RawDetection::new(bbox, label, 0.9))
    }

    #[test]
    fn label_shifts_left_when_it_would_overflow_the_box() {
        let placement = label_placement(&bbox(80, 40, 95, 90), &metrics(30, 10, 3), (100, 100));
        assert_eq!(placement.x, 65);
    }

    #[test]
    fn label_starts_at_box_left_when_it_fits() {
        let placement = label_placement(&bbox(10, 40, 90, 90), &metrics(30, 10, 3), (100, 100));
        assert_eq!(placement.x, 10);
        assert_eq!(placement.top, 30);
    }

    #[test]
    fn label_never_leaves_the_canvas() {
        // Box hugging the top-left corner with a label wider than the box.
        let placement = label_placement(&bbox(0, 0, 10, 10), &metrics(40, 12, 4), (100, 100));
        assert_eq!(placement, LabelPlacement { x: 0, top: 0 });

        // Box hugging the bottom-right corner.
        let placement = label_placement(&bbox(90, 95, 99, 99), &metrics(40, 12, 4), (100, 100));
        assert!(placement.x + 40 <= 100);
        assert!(placement.top + 16 <= 100);
    }

    #[test]
    fn short_box_lifts_baseline_above_bottom_edge() {
        // Box shorter than the text: baseline moves to y2 - height + baseline.
        let placement = label_placement(&bbox(10, 50, 90, 55), &metrics(20, 10, 3), (100, 100));
        assert_eq!(placement.top, 38);
    }

    #[test]
    fn missing_color_fails_without_drawing() {
        let image = RgbImage::new(50, 50);
        let dets = vec![detection([1.0, 1.0, 20.0, 20.0], "car"), detection([5.0, 5.0, 9.0, 9.0], "dog")];
        let mut colors = ColorMap::new();
        colors.insert("car".to_string(), Rgb([255, 0, 0]));
        let font = BlockFont {
            char_width: 1,
            height: 2,
            baseline: 1,
        };

        let err = render(&image, &dets, &colors, &font, DEFAULT_FONT_SCALE).unwrap_err();
        assert!(matches!(err, HectorError::MissingColor(label) if label == "dog"));
    }

    #[test]
    fn draws_box_edges_and_keeps_source_untouched() {
        let image = RgbImage::new(64, 64);
        let dets = vec![detection([10.0, 20.0, 40.0, 50.0], "cat")];
        let mut colors = ColorMap::new();
        colors.insert("cat".to_string(), Rgb([0, 255, 0]));
        let font = BlockFont {
            char_width: 0,
            height: 0,
            baseline: 0,
        };

        let out = render(&image, &dets, &colors, &font, DEFAULT_FONT_SCALE).unwrap();

        let green = Rgb([0, 255, 0]);
        assert_eq!(*out.get_pixel(10, 35), green);
        assert_eq!(*out.get_pixel(11, 35), green);
        assert_eq!(*out.get_pixel(40, 35), green);
        assert_eq!(*out.get_pixel(39, 35), green);
        assert_eq!(*out.get_pixel(25, 20), green);
        assert_eq!(*out.get_pixel(25, 50), green);
        assert_eq!(*out.get_pixel(25, 35), Rgb([0, 0, 0]));
        assert_eq!(*image.get_pixel(10, 35), Rgb([0, 0, 0]));
    }

    #[test]
    fn later_detections_draw_on_top() {
        let image = RgbImage::new(32, 32);
        let dets = vec![
            detection([4.0, 4.0, 20.0, 20.0], "first"),
            detection([4.0, 4.0, 20.0, 20.0], "second"),
        ];
        let mut colors = ColorMap::new();
        colors.insert("first".to_string(), Rgb([255, 0, 0]));
        colors.insert("second".to_string(), Rgb([0, 0, 255]));
        let font = BlockFont {
            char_width: 0,
            height: 0,
            baseline: 0,
        };

        let out = render(&image, &dets, &colors, &font, DEFAULT_FONT_SCALE).unwrap();
        assert_eq!(*out.get_pixel(4, 10), Rgb([0, 0, 255]));
    }
}
