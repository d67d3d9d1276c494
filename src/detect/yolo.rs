//! YOLOv8 output decoding.
//!
//! A YOLOv8 head emits a `[features, candidates]` matrix per image where the
//! first four feature rows are `cx, cy, w, h` in model-input pixels and the
//! next `labels.len()` rows are per-class scores. Any further rows (face
//! keypoints) are ignored.

use crate::detect::result::RawDetection;

/// Thresholds and input geometry shared by YOLO-family sources.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct YoloSettings {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    /// Square model input edge in pixels.
    pub input_size: u32,
}

impl Default for YoloSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.25,
            iou_threshold: 0.7,
            input_size: 640,
        }
    }
}

/// Decode a flattened `[features, candidates]` output into detections in
/// source-image pixels, then apply per-class NMS.
///
/// `scale` is `(source_width / input_size, source_height / input_size)`.
/// Returns an empty list when the output is smaller than the declared shape.
pub fn decode(
    output: &[f32],
    features: usize,
    candidates: usize,
    labels: &[String],
    settings: &YoloSettings,
    scale: (f32, f32),
) -> Vec<RawDetection> {
    let num_classes = labels.len();
    if num_classes == 0 || features < 4 + num_classes || output.len() < features * candidates {
        return Vec::new();
    }
    let at = |feature: usize, i: usize| output[feature * candidates + i];

    let mut boxes: Vec<(usize, RawDetection)> = Vec::new();
    for i in 0..candidates {
        let mut best_class = 0;
        let mut best_score = f32::NEG_INFINITY;
        for c in 0..num_classes {
            let score = at(4 + c, i);
            if score > best_score {
                best_score = score;
                best_class = c;
            }
        }
        if best_score < settings.confidence_threshold {
            continue;
        }

        let (cx, cy, w, h) = (at(0, i), at(1, i), at(2, i), at(3, i));
        let bbox = [
            (cx - w / 2.0) * scale.0,
            (cy - h / 2.0) * scale.1,
            (cx + w / 2.0) * scale.0,
            (cy + h / 2.0) * scale.1,
        ];
        boxes.push((
            best_class,
            RawDetection::new(bbox, labels[best_class].clone(), best_score),
        ));
    }

    non_maximum_suppression(boxes, settings.iou_threshold)
}

/// Greedy per-class NMS. Output is ordered by descending confidence.
pub fn non_maximum_suppression(
    mut boxes: Vec<(usize, RawDetection)>,
    iou_threshold: f32,
) -> Vec<RawDetection> {
    boxes.sort_by(|a, b| b.1.confidence.total_cmp(&a.1.confidence));

    let mut suppressed = vec![false; boxes.len()];
    let mut keep = Vec::new();
    for i in 0..boxes.len() {
        if suppressed[i] {
            continue;
        }
        for j in (i + 1)..boxes.len() {
            if suppressed[j] || boxes[i].0 != boxes[j].0 {
                continue;
            }
            if iou(&boxes[i].1.bbox, &boxes[j].1.bbox) > iou_threshold {
                suppressed[j] = true;
            }
        }
        keep.push(boxes[i].1.clone());
    }
    keep
}

/// Intersection over union of two `(x1, y1, x2, y2)` boxes.
pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let inter_w = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
    let inter_h = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    let intersection = inter_w * inter_h;
    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - intersection;
    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}
