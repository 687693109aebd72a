use ab_glyph::{FontVec, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;

use super::annotate_uitls::draw_transparent_rect;
use super::color::PANEL_TEXT;
use super::font::text_width;
use crate::prediction::Classification;

/// Draw the top-k classification panel; needs a font
pub fn draw_classification(
    img: &mut RgbaImage,
    classes: &[Classification],
    font: Option<&FontVec>,
    top_k: usize,
) {
    let Some(font) = font else {
        return;
    };

    let (width, _height) = img.dimensions();

    // Adaptive font scale based on image width
    let scale_factor = (width as f32 / 600.0).clamp(0.6, 2.0);
    let base_size = 24.0;
    let scale = PxScale::from(base_size * scale_factor);
    let line_height = (scale.y * 1.2) as i32;

    let x_pos = (20.0 * scale_factor) as i32;
    let mut y_pos = (20.0 * scale_factor) as i32;

    let entries: Vec<String> = classes
        .iter()
        .take(top_k)
        .filter(|c| c.probability >= 0.01)
        .map(|c| format!("{} {:.2}%", c.display_label(), c.probability * 100.0))
        .collect();

    if entries.is_empty() {
        return;
    }

    let max_width = entries
        .iter()
        .map(|label| text_width(Some(font), scale, label))
        .max()
        .unwrap_or(0);

    // Draw background for all entries with padding
    let box_height = (entries.len() as i32 * line_height) + 10;
    let box_width = max_width + 20;
    draw_transparent_rect(
        img,
        x_pos - 5,
        y_pos - 5,
        box_width,
        box_height as u32,
        Rgba([0, 0, 0, 255]),
        0.4, // 40% opacity black tint
    );

    for label in entries {
        draw_text_mut(img, PANEL_TEXT, x_pos, y_pos, scale, font, &label);
        y_pos += line_height;
    }
}
