use image::{ImageFormat, RgbImage};
use std::sync::Arc;

use super::Frame;
use crate::error::{AppError, Result};
use crate::prediction::Size;

/// Decoded upload kept in memory for the lifetime of the activation
#[derive(Debug, Clone)]
pub struct StaticImage {
    image: Arc<RgbImage>,
    format: Option<ImageFormat>,
}

impl StaticImage {
    /// Decode uploaded bytes in any format the `image` crate recognizes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(AppError::Decode("empty upload".to_string()));
        }

        let format = image::guess_format(bytes).ok();
        let decoded = image::load_from_memory(bytes)?;
        let image = decoded.to_rgb8();
        if image.width() == 0 || image.height() == 0 {
            return Err(AppError::Decode("image has no pixels".to_string()));
        }

        tracing::debug!(
            "Decoded upload: {:?} {}x{}",
            format,
            image.width(),
            image.height()
        );

        Ok(Self {
            image: Arc::new(image),
            format,
        })
    }

    pub fn from_image(image: RgbImage) -> Self {
        Self {
            image: Arc::new(image),
            format: None,
        }
    }

    pub const fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    pub fn native_size(&self) -> Size {
        self.image.dimensions().into()
    }

    /// The sole frame of a static source
    pub fn frame(&self) -> Frame {
        Frame::new(Arc::clone(&self.image), 0)
    }
}
