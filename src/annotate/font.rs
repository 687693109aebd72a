use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use std::path::Path;

use crate::error::{AppError, Result};

pub fn load_font(path: &Path) -> Result<FontVec> {
    let data = std::fs::read(path)
        .map_err(|e| AppError::FontLoad(format!("{:?}: {}", path, e)))?;
    FontVec::try_from_vec(data).map_err(|e| AppError::FontLoad(format!("{:?}: {}", path, e)))
}

/// Rendered width of `text`; without a font, an average glyph width of half the size.
pub fn text_width(font: Option<&FontVec>, scale: PxScale, text: &str) -> u32 {
    match font {
        Some(f) => {
            let scaled_font = f.as_scaled(scale);
            let text_w: f32 = text
                .chars()
                .map(|c| scaled_font.h_advance(scaled_font.glyph_id(c)))
                .sum();
            text_w.ceil() as u32
        }
        None => (text.chars().count() as f32 * scale.x * 0.5).ceil() as u32,
    }
}
