use image::Rgba;

/// Box strokes, label tags and skeleton segments
pub const PRIMARY: Rgba<u8> = Rgba([56, 189, 248, 255]);

/// Landmark point markers
pub const ACCENT: Rgba<u8> = Rgba([250, 204, 21, 255]);

/// Classification panel text
pub const PANEL_TEXT: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Black or white, whichever reads better on `background`
pub fn get_text_color(background: Rgba<u8>) -> Rgba<u8> {
    let [r, g, b, _] = background.0;
    let luminance = 0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b);
    if luminance > 150.0 {
        Rgba([0, 0, 0, 255])
    } else {
        Rgba([255, 255, 255, 255])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_color_contrast() {
        assert_eq!(get_text_color(Rgba([255, 255, 255, 255])), Rgba([0, 0, 0, 255]));
        assert_eq!(get_text_color(Rgba([0, 0, 80, 255])), Rgba([255, 255, 255, 255]));
    }
}
