use ab_glyph::{FontVec, PxScale};
use image::RgbaImage;
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use super::color::{PRIMARY, get_text_color};
use super::font::text_width;
use super::{AnnotateConfigs, Scale};
use crate::prediction::Detection;

const FONT_SIZE: f32 = 12.0;
const TAG_HEIGHT: u32 = 20;
const TAG_PADDING: i32 = 4;

/// Tag text of one detection
pub fn detection_label(det: &Detection, show_conf: bool) -> String {
    if show_conf {
        format!("{} ({:.1}%)", det.label, det.score * 100.0)
    } else {
        det.label.clone()
    }
}

/// Draw object detection results (boxes and label tags)
pub fn draw_detection(
    img: &mut RgbaImage,
    detections: &[Detection],
    scale: Scale,
    configs: &AnnotateConfigs,
    font: Option<&FontVec>,
) {
    let show_box = configs.show_box;
    let show_label = configs.show_label && show_box;
    let show_conf = configs.show_conf && show_label;

    if !show_box {
        return;
    }

    let (width, height) = img.dimensions();
    let thickness = configs.line_width.max(1) as i32;
    let text_scale = PxScale::from(FONT_SIZE);

    for det in detections {
        let (left, top) = scale.point(det.bbox.x, det.bbox.y);
        let (right, bottom) = scale.point(det.bbox.x + det.bbox.width, det.bbox.y + det.bbox.height);

        // Nothing of the box lands on the overlay
        if left >= width as f32 || top >= height as f32 {
            continue;
        }

        // Clip to the overlay; boxes may run past the frame edge
        let x1 = (left.round() as i32).clamp(0, width as i32 - 1);
        let y1 = (top.round() as i32).clamp(0, height as i32 - 1);
        let x2 = (right.round() as i32).clamp(0, width as i32);
        let y2 = (bottom.round() as i32).clamp(0, height as i32);

        if x2 <= x1 || y2 <= y1 {
            continue;
        }

        // Draw box, growing inwards
        for t in 0..thickness {
            let tx1 = x1 + t;
            let ty1 = y1 + t;
            let tx2 = x2 - t;
            let ty2 = y2 - t;
            if tx2 > tx1 && ty2 > ty1 {
                let rect = Rect::at(tx1, ty1).of_size((tx2 - tx1) as u32, (ty2 - ty1) as u32);
                draw_hollow_rect_mut(img, rect, PRIMARY);
            }
        }

        if !show_label {
            continue;
        }

        // Label tag anchored at the box's top-left corner
        let label = detection_label(det, show_conf);
        let tag_w = text_width(font, text_scale, &label) + 2 * TAG_PADDING as u32;
        let tag = Rect::at(x1, y1).of_size(tag_w, TAG_HEIGHT);
        draw_filled_rect_mut(img, tag, PRIMARY);

        if let Some(f) = font {
            let text_color = get_text_color(PRIMARY);
            let text_y = y1 + (TAG_HEIGHT as i32 - FONT_SIZE as i32) / 2;
            draw_text_mut(img, text_color, x1 + TAG_PADDING, text_y, text_scale, f, &label);
        }
    }
}
