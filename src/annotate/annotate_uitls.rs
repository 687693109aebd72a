use image::{Rgba, RgbaImage};

/// Composite `color` over `dst` (source-over with straight alpha)
pub fn blend_pixel(dst: &mut Rgba<u8>, color: Rgba<u8>, alpha: f32) {
    let src_a = (f32::from(color[3]) / 255.0 * alpha).clamp(0.0, 1.0);
    let dst_a = f32::from(dst[3]) / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    if out_a <= 0.0 {
        *dst = Rgba([0, 0, 0, 0]);
        return;
    }

    let mut out = [0u8; 4];
    for c in 0..3 {
        let src = f32::from(color[c]);
        let cur = f32::from(dst[c]);
        out[c] = ((src * src_a + cur * dst_a * (1.0 - src_a)) / out_a).round() as u8;
    }
    out[3] = (out_a * 255.0).round() as u8;
    *dst = Rgba(out);
}

fn put_clipped(img: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>) {
    let (width, height) = img.dimensions();
    if x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height {
        img.put_pixel(x as u32, y as u32, color);
    }
}

/// Draw a line segment on an image; pixels outside the image are skipped
pub fn draw_line_segment(
    img: &mut RgbaImage,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    color: Rgba<u8>,
    thickness: i32,
) {
    let (mut x, mut y) = (x1.round() as i32, y1.round() as i32);
    let (x2, y2) = (x2.round() as i32, y2.round() as i32);

    // Bresenham's line algorithm with thickness
    let dx = (x2 - x).abs();
    let dy = -(y2 - y).abs();
    let sx = if x < x2 { 1 } else { -1 };
    let sy = if y < y2 { 1 } else { -1 };
    let mut err = dx + dy;
    let half_t = (thickness.max(1) - 1) / 2;
    let extra = (thickness.max(1) - 1) - half_t;

    loop {
        // Draw a thick point
        for tx in -half_t..=extra {
            for ty in -half_t..=extra {
                put_clipped(img, x + tx, y + ty, color);
            }
        }

        if x == x2 && y == y2 {
            break;
        }

        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Draw a filled circle on an image
pub fn draw_filled_circle(img: &mut RgbaImage, cx: i32, cy: i32, radius: i32, color: Rgba<u8>) {
    for y in (cy - radius)..=(cy + radius) {
        for x in (cx - radius)..=(cx + radius) {
            let dx = x - cx;
            let dy = y - cy;
            if dx * dx + dy * dy <= radius * radius {
                put_clipped(img, x, y, color);
            }
        }
    }
}

/// Draw a transparent rectangle on an image
pub fn draw_transparent_rect(
    img: &mut RgbaImage,
    x: i32,
    y: i32,
    w: u32,
    h: u32,
    color: Rgba<u8>,
    alpha: f32,
) {
    let (width, height) = img.dimensions();

    for dy in 0..h {
        let py = y + dy as i32;
        if py < 0 || py >= height as i32 {
            continue;
        }

        for dx in 0..w {
            let px = x + dx as i32;
            if px < 0 || px >= width as i32 {
                continue;
            }
            blend_pixel(img.get_pixel_mut(px as u32, py as u32), color, alpha);
        }
    }
}
