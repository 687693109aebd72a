//! Normalized prediction shapes shared by every model family.
//!
//! All coordinates are expressed in the native resolution of the frame the
//! prediction was computed on; only the overlay renderer scales them.

use std::fmt;

/// Width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl From<(u32, u32)> for Size {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Axis-aligned box as `(x, y, width, height)` with `(x, y)` the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    /// Build from corner coordinates, tolerating swapped corners
    pub fn from_xyxy([x1, y1, x2, y2]: [f32; 4]) -> Self {
        let (left, right) = if x1 <= x2 { (x1, x2) } else { (x2, x1) };
        let (top, bottom) = if y1 <= y2 { (y1, y2) } else { (y2, y1) };
        Self {
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: String,
    pub probability: f32,
}

impl Classification {
    /// Label up to the first comma; ImageNet labels carry synonym lists.
    pub fn display_label(&self) -> &str {
        self.label.split(',').next().unwrap_or_default().trim()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub label: String,
    pub score: f32,
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub z: Option<f32>,
    pub score: f32,
}

/// Named path of keypoint indices; consecutive entries are connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LandmarkGroup {
    pub name: &'static str,
    pub path: &'static [usize],
}

impl LandmarkGroup {
    /// Pairs of keypoint indices to join with a line segment
    pub fn segments(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.path.windows(2).map(|pair| (pair[0], pair[1]))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkInstance {
    pub score: f32,
    pub keypoints: Vec<Keypoint>,
    pub groups: &'static [LandmarkGroup],
}

/// Result of one inference call, one variant per model family
#[derive(Debug, Clone, PartialEq)]
pub enum Predictions {
    Classification(Vec<Classification>),
    Detection(Vec<Detection>),
    Landmarks(Vec<LandmarkInstance>),
}

impl Predictions {
    pub fn len(&self) -> usize {
        match self {
            Predictions::Classification(items) => items.len(),
            Predictions::Detection(items) => items.len(),
            Predictions::Landmarks(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
