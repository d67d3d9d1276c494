use std::collections::{BTreeMap, BTreeSet};

use image::Rgb;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::detect::UnifiedDetection;

/// Class label to RGB color.
pub type ColorMap = BTreeMap<String, Rgb<u8>>;

/// Draws one random color per distinct class label.
///
/// Colors are only stable across calls when the assigner is seeded. Callers
/// that need the same colors on several images should reuse the returned map.
pub struct ColorAssigner<R: Rng = StdRng> {
    rng: R,
}

impl ColorAssigner<StdRng> {
    /// Deterministic assigner: the same seed and label set give the same map.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Seeded when `seed` is given, otherwise from entropy.
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }
}

impl<R: Rng> ColorAssigner<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Assign a color to every distinct class label in `detections`.
    pub fn assign(&mut self, detections: &[UnifiedDetection]) -> ColorMap {
        let labels: BTreeSet<&str> = detections
            .iter()
            .map(|det| det.class_label.as_str())
            .collect();
        labels
            .into_iter()
            .map(|label| {
                let color = Rgb([self.rng.gen(), self.rng.gen(), self.rng.gen()]);
                (label.to_string(), color)
            })
            .collect()
    }
}
