//! Acquisition control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::time::Duration;

use serde::Deserialize;
use util::time::seconds_to_duration;

use crate::kinematics::AimSide;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of an acquisition sequence.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AcqCtrlParams {
    /// Time to wait after a move for the arm to stop vibrating before capturing.
    ///
    /// Units: seconds
    pub settle_time_s: f64,

    /// Side of the arm the object is on.
    pub aim_side: AimSide,

    /// Number of reply lines expected for each pose command.
    pub reply_lines: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for AcqCtrlParams {
    fn default() -> Self {
        Self {
            settle_time_s: 1.0,
            aim_side: AimSide::Front,
            reply_lines: 1,
        }
    }
}

impl AcqCtrlParams {
    pub fn settle_time(&self) -> Duration {
        seconds_to_duration(self.settle_time_s)
    }
}
