//! Sequence state and sweep results

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::fmt;

use arm_if::eqpt::cam::CamImage;
use serde::Serialize;

use crate::kinematics::Pose;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// State of an acquisition controller.
///
/// ```text
/// Idle --start--> Running --completed/stopped--> Idle
///                 Running --stop--> Stopping --> Idle
///                 Running/Stopping --fault--> Faulted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SequenceState {
    Idle,
    Running,

    /// A stop has been requested but not yet observed by the sweep.
    Stopping,

    /// An unrecoverable error occurred, the controller cannot run again.
    Faulted,
}

/// How a sweep ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SweepOutcome {
    /// Every height was visited.
    Completed,

    /// A stop was observed before every height was visited.
    Stopped,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Result of a sweep which did not fault.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    pub run_number: u64,

    pub outcome: SweepOutcome,

    /// Heights at which a frame was captured and passed to the callback, in order.
    ///
    /// Units: millimeters.
    pub heights_captured_mm: Vec<f64>,
}

/// A frame captured during a sweep, handed to the capture callback.
#[derive(Debug, Clone)]
pub struct CaptureEvent {
    pub image: CamImage,

    /// Run number of the sweep, used to namespace output.
    pub run_number: u64,

    /// Units: millimeters.
    pub height_mm: f64,

    /// Pose the arm was set to, including the wrist aim.
    pub pose: Pose,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SequenceState {
    fn default() -> Self {
        SequenceState::Idle
    }
}

impl fmt::Display for SequenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SequenceState::Idle => "idle",
            SequenceState::Running => "running",
            SequenceState::Stopping => "stopping",
            SequenceState::Faulted => "faulted",
        };
        write!(f, "{}", s)
    }
}

impl SequenceState {
    /// True while a sweep is in progress.
    pub fn is_active(&self) -> bool {
        matches!(self, SequenceState::Running | SequenceState::Stopping)
    }
}
