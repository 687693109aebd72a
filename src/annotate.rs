// -- submodules
mod annotate_uitls;
mod classification;
mod color;
mod detection;
mod font;
mod landmarks;

use classification::draw_classification;
use detection::draw_detection;
use font::load_font;
use landmarks::draw_landmarks;
use serde::Deserialize;

// -- external imports
use ab_glyph::FontVec;
use image::{Rgba, RgbaImage};
use std::path::PathBuf;

use crate::catalog::ModelId;
use crate::error::Result;
use crate::prediction::{Predictions, Size};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnnotateConfigs {
    /// whether to show boxes
    pub show_box: bool,

    /// whether to show class labels
    pub show_label: bool,

    /// whether to show confidence scores
    pub show_conf: bool,

    /// stroke width of boxes and skeleton segments, in display pixels
    pub line_width: u32,

    /// radius of landmark point markers, in display pixels
    pub point_radius: u32,

    /// minimum instance/keypoint score to draw; defaults to the model's own
    pub min_keypoint_score: Option<f32>,

    /// (top-k) number of classification results to show in the panel
    pub top_k: Option<usize>,

    /// TTF/OTF font for labels; without one only label backgrounds are drawn
    pub font_path: Option<PathBuf>,
}

impl Default for AnnotateConfigs {
    fn default() -> Self {
        Self {
            show_box: true,
            show_label: true,
            show_conf: true,
            line_width: 2,
            point_radius: 5,
            min_keypoint_score: None,
            top_k: Some(3),
            font_path: None,
        }
    }
}

/// Per-axis factors mapping native frame pixels to display pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub sx: f32,
    pub sy: f32,
}

impl Scale {
    /// `None` when either size has no area
    pub fn between(native: Size, display: Size) -> Option<Self> {
        if native.is_empty() || display.is_empty() {
            return None;
        }
        Some(Self {
            sx: display.width as f32 / native.width as f32,
            sy: display.height as f32 / native.height as f32,
        })
    }

    pub fn point(&self, x: f32, y: f32) -> (f32, f32) {
        (x * self.sx, y * self.sy)
    }
}

/// Draws predictions onto a transparent overlay sized to the display
pub struct OverlayRenderer {
    configs: AnnotateConfigs,
    font: Option<FontVec>,
    min_keypoint_score: f32,
}

impl OverlayRenderer {
    pub fn new(configs: AnnotateConfigs) -> Result<Self> {
        let font = match &configs.font_path {
            Some(path) => Some(load_font(path)?),
            None => None,
        };
        let min_keypoint_score = configs.min_keypoint_score.unwrap_or(0.0);
        Ok(Self {
            configs,
            font,
            min_keypoint_score,
        })
    }

    /// Renderer with the model's keypoint threshold unless the config sets one
    pub fn for_model(model: ModelId, configs: AnnotateConfigs) -> Result<Self> {
        let mut renderer = Self::new(configs)?;
        if renderer.configs.min_keypoint_score.is_none() {
            renderer.min_keypoint_score = model.min_keypoint_score();
        }
        Ok(renderer)
    }

    pub const fn configs(&self) -> &AnnotateConfigs {
        &self.configs
    }

    pub const fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Draw on a fresh transparent surface of the display size.
    pub fn render(&self, predictions: &Predictions, native: Size, display: Size) -> RgbaImage {
        let mut surface = RgbaImage::new(display.width, display.height);
        self.draw(&mut surface, predictions, native);
        surface
    }

    /// Clear `surface` (resizing it to `display` if needed), then draw.
    pub fn render_into(
        &self,
        surface: &mut RgbaImage,
        predictions: &Predictions,
        native: Size,
        display: Size,
    ) {
        if surface.dimensions() != (display.width, display.height) {
            *surface = RgbaImage::new(display.width, display.height);
        } else {
            clear(surface);
        }
        self.draw(surface, predictions, native);
    }

    fn draw(&self, surface: &mut RgbaImage, predictions: &Predictions, native: Size) {
        let display = Size::from(surface.dimensions());
        let Some(scale) = Scale::between(native, display) else {
            return;
        };

        let font = self.font.as_ref();
        match predictions {
            Predictions::Classification(classes) => {
                draw_classification(surface, classes, font, self.configs.top_k.unwrap_or(0))
            }
            Predictions::Detection(detections) => {
                draw_detection(surface, detections, scale, &self.configs, font)
            }
            Predictions::Landmarks(instances) => draw_landmarks(
                surface,
                instances,
                scale,
                &self.configs,
                self.min_keypoint_score,
            ),
        }
    }
}

/// Reset every pixel to fully transparent
pub fn clear(surface: &mut RgbaImage) {
    for pixel in surface.pixels_mut() {
        *pixel = Rgba([0, 0, 0, 0]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::POSE_GROUPS;
    use crate::prediction::{BoundingBox, Detection, Keypoint, LandmarkGroup, LandmarkInstance};

    fn is_blank(img: &RgbaImage) -> bool {
        img.pixels().all(|p| p[3] == 0)
    }

    fn detection(bbox: BoundingBox) -> Predictions {
        Predictions::Detection(vec![Detection {
            label: "cup".into(),
            score: 0.875,
            bbox,
        }])
    }

    #[test]
    fn test_render_empty_is_transparent() {
        let renderer = OverlayRenderer::new(AnnotateConfigs::default()).unwrap();
        let img = renderer.render(
            &Predictions::Detection(vec![]),
            Size::new(640, 480),
            Size::new(320, 240),
        );
        assert_eq!(img.dimensions(), (320, 240));
        assert!(is_blank(&img));
    }

    #[test]
    fn test_scale_maps_native_to_display() {
        let scale = Scale::between(Size::new(100, 100), Size::new(200, 50)).unwrap();
        assert_eq!(scale.point(50.0, 100.0), (100.0, 50.0));
        assert!(Scale::between(Size::new(0, 10), Size::new(10, 10)).is_none());
    }

    #[test]
    fn test_in_range_points_stay_on_display() {
        let native = Size::new(640, 480);
        let display = Size::new(300, 170);
        let scale = Scale::between(native, display).unwrap();
        for (x, y) in [(0.0, 0.0), (640.0, 480.0), (321.5, 17.25), (639.0, 1.0)] {
            let (dx, dy) = scale.point(x, y);
            assert!((0.0..=300.0).contains(&dx));
            assert!((0.0..=170.0).contains(&dy));
        }
    }

    #[test]
    fn test_detection_box_is_scaled() {
        let renderer = OverlayRenderer::new(AnnotateConfigs::default()).unwrap();
        let bbox = BoundingBox {
            x: 10.0,
            y: 10.0,
            width: 50.0,
            height: 80.0,
        };
        let img = renderer.render(&detection(bbox), Size::new(100, 100), Size::new(200, 50));

        // box spans x 20..120 and y 5..45 on the display; left edge below the label tag
        assert!(img.get_pixel(20, 40)[3] > 0);
        assert!(img.get_pixel(119, 40)[3] > 0);
        // interior and far corner stay transparent
        assert_eq!(img.get_pixel(70, 40)[3], 0);
        assert_eq!(img.get_pixel(199, 49)[3], 0);
    }

    #[test]
    fn test_out_of_range_box_does_not_panic() {
        let renderer = OverlayRenderer::new(AnnotateConfigs::default()).unwrap();
        let bbox = BoundingBox {
            x: -50.0,
            y: 90.0,
            width: 500.0,
            height: 500.0,
        };
        let img = renderer.render(&detection(bbox), Size::new(100, 100), Size::new(64, 48));
        assert_eq!(img.dimensions(), (64, 48));
    }

    #[test]
    fn test_box_past_display_edge_is_skipped() {
        let renderer = OverlayRenderer::new(AnnotateConfigs::default()).unwrap();
        let native = Size::new(100, 100);
        let display = Size::new(100, 100);

        let right_of = BoundingBox {
            x: 150.0,
            y: 10.0,
            width: 40.0,
            height: 40.0,
        };
        assert!(is_blank(&renderer.render(&detection(right_of), native, display)));

        let below = BoundingBox {
            x: 10.0,
            y: 100.0,
            width: 40.0,
            height: 40.0,
        };
        assert!(is_blank(&renderer.render(&detection(below), native, display)));

        // a box straddling the edge still draws its visible part
        let straddling = BoundingBox {
            x: 80.0,
            y: 10.0,
            width: 40.0,
            height: 40.0,
        };
        let img = renderer.render(&detection(straddling), native, display);
        assert!(img.get_pixel(80, 40)[3] > 0);
    }

    #[test]
    fn test_render_into_clears_first() {
        let renderer = OverlayRenderer::new(AnnotateConfigs::default()).unwrap();
        let native = Size::new(100, 100);
        let display = Size::new(100, 100);
        let mut surface = RgbaImage::new(1, 1);

        let bbox = BoundingBox {
            x: 10.0,
            y: 10.0,
            width: 30.0,
            height: 30.0,
        };
        renderer.render_into(&mut surface, &detection(bbox), native, display);
        assert_eq!(surface.dimensions(), (100, 100));
        assert!(!is_blank(&surface));

        renderer.render_into(&mut surface, &Predictions::Detection(vec![]), native, display);
        assert!(is_blank(&surface));
    }

    #[test]
    fn test_landmarks_connect_group_members_only() {
        const GROUPS: [LandmarkGroup; 1] = [LandmarkGroup {
            name: "pair",
            path: &[0, 1],
        }];
        let configs = AnnotateConfigs {
            point_radius: 2,
            ..Default::default()
        };
        let renderer = OverlayRenderer::new(configs).unwrap();
        let kp = |x: f32| Keypoint {
            x,
            y: 50.0,
            z: None,
            score: 0.9,
        };
        let predictions = Predictions::Landmarks(vec![LandmarkInstance {
            score: 0.9,
            keypoints: vec![kp(10.0), kp(50.0), kp(90.0)],
            groups: &GROUPS,
        }]);
        let img = renderer.render(&predictions, Size::new(100, 100), Size::new(100, 100));

        assert!(img.get_pixel(30, 50)[3] > 0);
        assert_eq!(img.get_pixel(70, 50)[3], 0);
        // every keypoint gets a marker
        assert!(img.get_pixel(90, 50)[3] > 0);
    }

    #[test]
    fn test_low_score_pose_skipped() {
        let renderer =
            OverlayRenderer::for_model(ModelId::PoseNet, AnnotateConfigs::default()).unwrap();
        let predictions = Predictions::Landmarks(vec![LandmarkInstance {
            score: 0.1,
            keypoints: vec![
                Keypoint {
                    x: 20.0,
                    y: 20.0,
                    z: None,
                    score: 0.9
                };
                17
            ],
            groups: &POSE_GROUPS,
        }]);
        let img = renderer.render(&predictions, Size::new(100, 100), Size::new(100, 100));
        assert!(is_blank(&img));
    }

    #[test]
    fn test_missing_font_is_an_error() {
        let configs = AnnotateConfigs {
            font_path: Some(PathBuf::from("/nonexistent/Inter.ttf")),
            ..Default::default()
        };
        assert!(OverlayRenderer::new(configs).is_err());
    }
}
