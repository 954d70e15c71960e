//! Arm pose

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use arm_if::eqpt::arm::DeviceCommand;
use serde::Serialize;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Index of the base (rotation about the vertical axis) servo.
pub const BASE_IDX: usize = 0;

/// Index of the shoulder servo.
pub const SHOULDER_IDX: usize = 1;

/// Index of the elbow servo.
pub const ELBOW_IDX: usize = 2;

/// Index of the wrist (vertical) servo.
pub const WRIST_IDX: usize = 3;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Commanded angles of all servos of the arm, in servo order.
///
/// Poses are only built by the kinematics, with one angle per servo.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pose {
    angles_deg: Vec<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    pub(crate) fn new(angles_deg: Vec<f64>) -> Self {
        Self { angles_deg }
    }

    /// All angles in servo order.
    ///
    /// Units: degrees
    pub fn angles_deg(&self) -> &[f64] {
        &self.angles_deg
    }

    pub fn num_servos(&self) -> usize {
        self.angles_deg.len()
    }

    pub fn shoulder_deg(&self) -> f64 {
        self.angles_deg[SHOULDER_IDX]
    }

    pub fn elbow_deg(&self) -> f64 {
        self.angles_deg[ELBOW_IDX]
    }

    pub fn wrist_deg(&self) -> f64 {
        self.angles_deg[WRIST_IDX]
    }

    /// Sum of the shoulder, elbow and wrist angles.
    pub fn chain_sum_deg(&self) -> f64 {
        self.shoulder_deg() + self.elbow_deg() + self.wrist_deg()
    }

    /// Tilt the wrist by the given angle.
    pub(crate) fn tilt_wrist(&mut self, angle_deg: f64) {
        self.angles_deg[WRIST_IDX] += angle_deg;
    }

    /// Build the command which sets the arm to this pose.
    pub fn to_set_command(&self) -> DeviceCommand {
        DeviceCommand::Set(self.angles_deg.clone())
    }
}
