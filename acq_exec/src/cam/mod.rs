//! # Camera module
//!
//! The camera the acquisition controller captures from. The controller only needs a single frame
//! per height, so a camera is anything which can produce the current frame on demand and later be
//! released.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Simulated camera producing solid colour frames
pub mod sim;

/// Video4Linux camera
#[cfg(feature = "v4l")]
pub mod v4l;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use arm_if::eqpt::cam::CamImage;
use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A camera owned by the acquisition controller.
pub trait Camera: Send {
    /// Capture the current frame.
    fn capture_frame(&mut self) -> Result<CamImage, CamError>;

    /// Release the underlying device. Releasing an already released camera does nothing, any
    /// later capture fails with [`CamError::Released`].
    fn release(&mut self);
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Camera parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CamParams {
    /// Linux device path of the camera
    pub device: String,

    /// Width of the captured frames in pixels
    pub width: u32,

    /// Height of the captured frames in pixels
    pub height: u32,

    /// Frame rate requested from the camera
    pub fps: u32,

    /// Number of buffered frames thrown away before each capture, so that the frame returned was
    /// taken after the arm settled.
    pub stale_frames: usize,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur while capturing.
#[derive(Debug, thiserror::Error)]
pub enum CamError {
    #[error("Could not open camera {0}: {1}")]
    Open(String, std::io::Error),

    #[error("Could not configure the camera: {0}")]
    Config(String),

    #[error("Could not capture a frame: {0}")]
    Capture(String),

    #[error("Could not decode the captured frame: {0}")]
    Decode(image::ImageError),

    #[error("The camera has been released")]
    Released,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for CamParams {
    fn default() -> Self {
        Self {
            device: String::from("/dev/video0"),
            width: 640,
            height: 480,
            fps: 30,
            stale_frames: 1,
        }
    }
}

impl<C: Camera + ?Sized> Camera for Box<C> {
    fn capture_frame(&mut self) -> Result<CamImage, CamError> {
        (**self).capture_frame()
    }

    fn release(&mut self) {
        (**self).release()
    }
}
