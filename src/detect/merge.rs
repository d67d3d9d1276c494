use crate::detect::result::{RawDetection, UnifiedDetection};

/// Merge general and face detections into one list.
///
/// General detections come first, then face detections, each group in its
/// source's order. Nothing is deduplicated: a face may also appear as a
/// `person` box from the general detector.
pub fn merge(general: &[RawDetection], faces: &[RawDetection]) -> Vec<UnifiedDetection> {
    general
        .iter()
        .chain(faces)
        .map(UnifiedDetection::from_raw)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::result::PixelBox;

    #[test]
    fn general_detections_come_first_in_order() {
        let general = vec![
            RawDetection::new([10.4, 10.6, 50.2, 50.9], "car", 0.901),
            RawDetection::new([0.0, 0.0, 5.0, 5.0], "person", 0.3),
        ];
        let faces = vec![RawDetection::new([12.0, 12.0, 40.0, 40.0], "face", 0.75)];

        let merged = merge(&general, &faces);

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].class_label, "car");
        assert_eq!(merged[1].class_label, "person");
        assert_eq!(merged[2].class_label, "face");
        assert_eq!(
            merged[2].bbox,
            PixelBox {
                x1: 12,
                y1: 12,
                x2: 40,
                y2: 40
            }
        );
    }

    #[test]
    fn overlapping_sources_are_not_suppressed() {
        let general = vec![RawDetection::new([10.0, 10.0, 40.0, 40.0], "person", 0.9)];
        let faces = vec![RawDetection::new([10.0, 10.0, 40.0, 40.0], "face", 0.9)];

        let merged = merge(&general, &faces);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].bbox, merged[1].bbox);
    }

    #[test]
    fn empty_inputs_produce_empty_output() {
        assert!(merge(&[], &[]).is_empty());

        let faces = vec![RawDetection::new([1.0, 1.0, 2.0, 2.0], "face", 0.5)];
        assert_eq!(merge(&[], &faces).len(), 1);
    }

    #[test]
    fn every_output_box_is_ordered() {
        let general: Vec<RawDetection> = (0..20)
            .map(|i| {
                let f = i as f32 * 3.7;
                RawDetection::new([f + 9.3, f * 0.5, f, f * 1.5 + 0.49], "thing", 0.123 * i as f32)
            })
            .collect();
        for det in merge(&general, &[]) {
            assert!(det.bbox.x1 <= det.bbox.x2);
            assert!(det.bbox.y1 <= det.bbox.y2);
        }
    }
}
