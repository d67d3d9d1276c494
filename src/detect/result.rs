use serde::ser::{Serialize, SerializeTuple, Serializer};

/// Unprocessed output of one detection source.
///
/// Coordinates are `(x1, y1, x2, y2)` in source-image pixels and may be fractional.
#[derive(Clone, Debug, PartialEq)]
pub struct RawDetection {
    pub bbox: [f32; 4],
    pub class_label: String,
    pub confidence: f32,
}

impl RawDetection {
    pub fn new(bbox: [f32; 4], class_label: impl Into<String>, confidence: f32) -> Self {
        Self {
            bbox,
            class_label: class_label.into(),
            confidence,
        }
    }
}

/// Pixel-aligned box with `x1 <= x2` and `y1 <= y2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl PixelBox {
    /// Rounds each coordinate to the nearest integer (ties to even) and orders the corners.
    pub fn from_float(bbox: [f32; 4]) -> Self {
        let [a, b, c, d] = bbox.map(round_coord);
        Self {
            x1: a.min(c),
            y1: b.min(d),
            x2: a.max(c),
            y2: b.max(d),
        }
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }
}

/// Normalized detection record used for merged output and rendering.
#[derive(Clone, Debug, PartialEq)]
pub struct UnifiedDetection {
    pub bbox: PixelBox,
    pub class_label: String,
    /// Always rounded to two decimal places.
    pub confidence: f64,
}

impl UnifiedDetection {
    pub fn from_raw(raw: &RawDetection) -> Self {
        Self {
            bbox: PixelBox::from_float(raw.bbox),
            class_label: raw.class_label.clone(),
            confidence: round_confidence(raw.confidence),
        }
    }

    /// Text drawn next to the box, e.g. `car (0.90)`.
    pub fn label_text(&self) -> String {
        format!("{} ({:.2})", self.class_label, self.confidence)
    }
}

/// Serialized as `[x1, y1, x2, y2, class_label, confidence]`.
impl Serialize for UnifiedDetection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(6)?;
        tuple.serialize_element(&self.bbox.x1)?;
        tuple.serialize_element(&self.bbox.y1)?;
        tuple.serialize_element(&self.bbox.x2)?;
        tuple.serialize_element(&self.bbox.y2)?;
        tuple.serialize_element(&self.class_label)?;
        tuple.serialize_element(&self.confidence)?;
        tuple.end()
    }
}

/// General-detector results followed by face-detector results.
pub type DetectionResult = Vec<UnifiedDetection>;

fn round_coord(value: f32) -> i32 {
    if !value.is_finite() {
        return 0;
    }
    value.round_ties_even() as i32
}

/// Two decimal places, halves to even.
fn round_confidence(value: f32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    (f64::from(value) * 100.0).round_ties_even() / 100.0
}
