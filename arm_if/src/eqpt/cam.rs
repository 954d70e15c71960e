//! # Camera Equipment Interface

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use image::{DynamicImage, GenericImageView, ImageResult};
use std::path::Path;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single frame acquired from a camera.
#[derive(Clone)]
pub struct CamImage {
    /// UTC timestamp at which the frame was acquired
    pub timestamp: DateTime<Utc>,

    /// The image itself
    pub image: DynamicImage
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CamImage {
    /// Wrap an image acquired now.
    pub fn now(image: DynamicImage) -> Self {
        Self {
            timestamp: Utc::now(),
            image
        }
    }

    /// Decode an image from an encoded buffer (such as an MJPG frame) acquired now.
    pub fn from_memory(data: &[u8], format: image::ImageFormat) -> ImageResult<Self> {
        Ok(Self::now(image::load_from_memory_with_format(data, format)?))
    }

    /// Width and height of the image in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    /// Save the image, the format is deduced from the path's extension.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        self.image.save(path)
    }
}

impl std::fmt::Debug for CamImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CamImage")
            .field("timestamp", &self.timestamp)
            .field("dimensions", &self.dimensions())
            .finish()
    }
}
