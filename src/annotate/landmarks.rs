use image::RgbaImage;

use super::annotate_uitls::{draw_filled_circle, draw_line_segment};
use super::color::{ACCENT, PRIMARY};
use super::{AnnotateConfigs, Scale};
use crate::prediction::LandmarkInstance;

/// Draw landmark results: group segments first, then point markers.
///
/// Instances and keypoints scoring below `min_score` are skipped; a segment
/// needs both endpoints.
pub fn draw_landmarks(
    img: &mut RgbaImage,
    instances: &[LandmarkInstance],
    scale: Scale,
    configs: &AnnotateConfigs,
    min_score: f32,
) {
    let thickness = configs.line_width.max(1) as i32;
    let radius = configs.point_radius as i32;

    for instance in instances.iter().filter(|i| i.score >= min_score) {
        let visible = |idx: usize| {
            instance
                .keypoints
                .get(idx)
                .filter(|kp| kp.score >= min_score)
                .map(|kp| scale.point(kp.x, kp.y))
        };

        for group in instance.groups {
            for (a, b) in group.segments() {
                if let (Some((x1, y1)), Some((x2, y2))) = (visible(a), visible(b)) {
                    draw_line_segment(img, x1, y1, x2, y2, PRIMARY, thickness);
                }
            }
        }

        for idx in 0..instance.keypoints.len() {
            if let Some((x, y)) = visible(idx) {
                draw_filled_circle(img, x.round() as i32, y.round() as i32, radius, ACCENT);
            }
        }
    }
}
