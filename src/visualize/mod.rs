//! Annotated overlays: per-class colors, label fonts, and box/label rendering.

mod colors;
mod font;
mod render;

pub use colors::{ColorAssigner, ColorMap};
pub use font::{GlyphFont, LabelFont, TextMetrics, BASE_FONT_PX};
pub use render::{
    check_colors, label_placement, render, LabelPlacement, BOX_THICKNESS, DEFAULT_FONT_SCALE,
};

#[cfg(test)]
pub(crate) use render::tests::BlockFont;
