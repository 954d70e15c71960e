//! # Simulated Camera

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::{Arc, Mutex, MutexGuard};

use arm_if::eqpt::cam::CamImage;
use image::{DynamicImage, Rgb, RgbImage};
use log::trace;

use super::{CamError, Camera};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Colours cycled through by consecutive frames.
const FRAME_COLOURS: [[u8; 3]; 4] = [
    [0, 177, 64],
    [200, 40, 40],
    [40, 40, 200],
    [230, 230, 230],
];

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A camera producing solid colour frames. Clones share the same camera, so a test can keep a
/// clone to inspect it after handing the original to a controller.
#[derive(Clone)]
pub struct SimCamera {
    inner: Arc<Mutex<SimCamInner>>,
}

struct SimCamInner {
    width: u32,
    height: u32,

    /// Number of successful captures
    captures: usize,

    /// Zero based index of the capture attempt which fails
    fail_on: Option<usize>,

    attempts: usize,

    released: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SimCamInner {
                width,
                height,
                captures: 0,
                fail_on: None,
                attempts: 0,
                released: false,
            })),
        }
    }

    /// Make the given capture attempt (zero based) fail.
    pub fn fail_on_capture(self, attempt: usize) -> Self {
        self.lock().fail_on = Some(attempt);
        self
    }

    /// Number of frames successfully captured.
    pub fn captures(&self) -> usize {
        self.lock().captures
    }

    pub fn is_released(&self) -> bool {
        self.lock().released
    }

    fn lock(&self) -> MutexGuard<'_, SimCamInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Camera for SimCamera {
    fn capture_frame(&mut self) -> Result<CamImage, CamError> {
        let mut inner = self.lock();

        if inner.released {
            return Err(CamError::Released);
        }

        let attempt = inner.attempts;
        inner.attempts += 1;

        if inner.fail_on == Some(attempt) {
            return Err(CamError::Capture(format!("simulated failure on capture {}", attempt)));
        }

        let colour = FRAME_COLOURS[inner.captures % FRAME_COLOURS.len()];
        let image = RgbImage::from_pixel(inner.width, inner.height, Rgb(colour));
        inner.captures += 1;

        trace!("Simulated camera captured frame {}", inner.captures);

        Ok(CamImage::now(DynamicImage::ImageRgb8(image)))
    }

    fn release(&mut self) {
        self.lock().released = true;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sim_camera() {
        let cam = SimCamera::new(8, 6).fail_on_capture(1);
        let mut owned = cam.clone();

        let frame = owned.capture_frame().unwrap();
        assert_eq!(frame.dimensions(), (8, 6));

        assert!(matches!(owned.capture_frame(), Err(CamError::Capture(_))));
        assert!(owned.capture_frame().is_ok());
        assert_eq!(cam.captures(), 2);

        owned.release();
        owned.release();
        assert!(cam.is_released());
        assert!(matches!(owned.capture_frame(), Err(CamError::Released)));
    }
}
