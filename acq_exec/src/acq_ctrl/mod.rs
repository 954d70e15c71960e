//! # Acquisition control module
//!
//! The acquisition controller owns the arm link and the camera, and drives the arm through a sweep
//! of camera heights, capturing one frame at each height and handing it to a callback.
//!
//! The sweep can be run on the caller's thread with [`AcqCtrl::run_sync`] or on a background
//! thread with [`AcqCtrl::start`]. A [`SequenceState`] shared with the sweep is the only point of
//! synchronisation between the two, every transition is made under its lock.
//!
//! Any error after the first command has been sent faults the controller. The sweep then makes a
//! single attempt to stop the arm, closes the link, releases the camera, and reports the original
//! error.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod ctrl;
mod params;
mod request;
mod state;
mod sweep;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::time::Duration;

use arm_if::{
    eqpt::arm::ReplyError,
    link::{LinkError, LinkStage},
};

use crate::{cam::CamError, kinematics::KinematicsError};

pub use ctrl::*;
pub use params::*;
pub use request::*;
pub use state::*;
pub use sweep::*;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur in the acquisition controller.
#[derive(Debug, thiserror::Error)]
pub enum AcqCtrlError {
    #[error("Requested height cannot be reached: {0}")]
    OutOfReach(KinematicsError),

    #[error("Invalid motion request: {0}")]
    InvalidRequest(String),

    #[error("Arm link timed out after {timeout:?} during {stage}")]
    LinkTimeout { stage: LinkStage, timeout: Duration },

    #[error("Arm link error: {0}")]
    Link(LinkError),

    #[error("The arm rejected command {command:?} with reply {reply:?}")]
    DeviceRejected { command: String, reply: Vec<String> },

    #[error("Could not decode the arm's reply to {command:?}: {source}")]
    MalformedReply { command: String, source: ReplyError },

    #[error("Capture at {height_mm:.1} mm failed: {source}")]
    Capture { height_mm: f64, source: CamError },

    #[error("Capture callback failed: {0}")]
    Callback(CallbackError),

    #[error("An arm link and camera are already attached")]
    AlreadyAttached,

    #[error("No arm link and camera are attached")]
    NotAttached,

    #[error("The controller is busy ({0})")]
    Busy(SequenceState),

    #[error("The controller has faulted and cannot be used again")]
    Faulted,

    #[error("Could not spawn the sweep thread: {0}")]
    Spawn(std::io::Error),

    #[error("The sweep thread panicked")]
    SweepPanicked,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl From<LinkError> for AcqCtrlError {
    fn from(e: LinkError) -> Self {
        match e {
            LinkError::Timeout(stage, timeout) => AcqCtrlError::LinkTimeout { stage, timeout },
            e => AcqCtrlError::Link(e),
        }
    }
}

impl From<KinematicsError> for AcqCtrlError {
    fn from(e: KinematicsError) -> Self {
        AcqCtrlError::OutOfReach(e)
    }
}
