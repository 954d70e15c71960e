//! # Video4Linux Camera
//!
//! USB camera captured through `rscam` as MJPG frames.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use arm_if::eqpt::cam::CamImage;
use log::{debug, info, warn};

use super::{CamError, CamParams, Camera};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct V4lCamera {
    cam: Option<rscam::Camera>,

    stale_frames: usize,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl V4lCamera {
    /// Open and start the camera described by `params`.
    pub fn open(params: &CamParams) -> Result<Self, CamError> {
        let mut cam = rscam::Camera::new(&params.device)
            .map_err(|e| CamError::Open(params.device.clone(), e))?;

        cam.start(&rscam::Config {
            interval: (1, params.fps),
            resolution: (params.width, params.height),
            format: b"MJPG",
            ..Default::default()
        })
        .map_err(|e| CamError::Config(e.to_string()))?;

        info!(
            "Camera {} started at {}x{} {} fps",
            params.device, params.width, params.height, params.fps
        );

        Ok(Self {
            cam: Some(cam),
            stale_frames: params.stale_frames,
        })
    }
}

impl Camera for V4lCamera {
    fn capture_frame(&mut self) -> Result<CamImage, CamError> {
        let cam = self.cam.as_mut().ok_or(CamError::Released)?;

        // The driver queues frames, the first ones out were taken before the arm settled
        for _ in 0..self.stale_frames {
            cam.capture().map_err(|e| CamError::Capture(e.to_string()))?;
        }

        let frame = cam.capture().map_err(|e| CamError::Capture(e.to_string()))?;
        debug!("Captured {} byte frame", frame.len());

        CamImage::from_memory(&frame, image::ImageFormat::Jpeg).map_err(CamError::Decode)
    }

    fn release(&mut self) {
        if let Some(mut cam) = self.cam.take() {
            if let Err(e) = cam.stop() {
                warn!("Could not stop the camera: {}", e);
            }
            info!("Camera released");
        }
    }
}

impl Drop for V4lCamera {
    fn drop(&mut self) {
        self.release();
    }
}
