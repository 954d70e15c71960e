//! Arm geometry parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::{KinematicsError, MIN_NUM_SERVOS};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Geometry of the arm. Defaults to the Braccio arm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmGeometry {
    // ---- GEOMETRY ----
    /// Height of the shoulder joint above the base plane.
    ///
    /// Units: millimeters.
    pub base_length_mm: f64,

    /// Length of the upper arm, shoulder to elbow.
    ///
    /// Units: millimeters.
    pub upperarm_length_mm: f64,

    /// Length of the forearm, elbow to wrist.
    ///
    /// Units: millimeters.
    pub forearm_length_mm: f64,

    // ---- CAPABILITIES ----
    /// Minimum angle of the upper arm above the horizontal.
    ///
    /// Units: degrees
    pub min_upperarm_deg: f64,

    /// Number of servos set by a pose.
    pub num_servos: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for ArmGeometry {
    fn default() -> Self {
        Self {
            base_length_mm: 75.0,
            upperarm_length_mm: 125.0,
            forearm_length_mm: 125.0,
            min_upperarm_deg: 15.0,
            num_servos: 6,
        }
    }
}

impl ArmGeometry {
    /// Check the geometry describes a physical arm.
    pub fn validate(&self) -> Result<(), KinematicsError> {
        let lengths = [
            ("base", self.base_length_mm),
            ("upper arm", self.upperarm_length_mm),
            ("forearm", self.forearm_length_mm),
        ];

        for (name, length) in lengths.iter() {
            if !(length.is_finite() && *length > 0.0) {
                return Err(KinematicsError::InvalidGeometry(format!(
                    "{} length must be positive, found {}", name, length
                )));
            }
        }

        if !(self.min_upperarm_deg >= 0.0 && self.min_upperarm_deg < 90.0) {
            return Err(KinematicsError::InvalidGeometry(format!(
                "minimum upper arm angle must be in [0, 90) degrees, found {}",
                self.min_upperarm_deg
            )));
        }

        if self.num_servos < MIN_NUM_SERVOS {
            return Err(KinematicsError::InvalidGeometry(format!(
                "expected at least {} servos, found {}", MIN_NUM_SERVOS, self.num_servos
            )));
        }

        Ok(())
    }

    /// Height gained by the upper arm at its minimum angle.
    ///
    /// Units: millimeters.
    pub fn min_upperarm_rise_mm(&self) -> f64 {
        self.min_upperarm_deg.to_radians().sin() * self.upperarm_length_mm
    }

    /// Lowest reachable height: upper arm at its minimum angle, forearm pointing straight down.
    ///
    /// Units: millimeters.
    pub fn min_reachable_height_mm(&self) -> f64 {
        self.base_length_mm + self.min_upperarm_rise_mm() - self.forearm_length_mm
    }

    /// Highest reachable height: the whole arm pointing straight up.
    ///
    /// Units: millimeters.
    pub fn max_reachable_height_mm(&self) -> f64 {
        self.base_length_mm + self.upperarm_length_mm + self.forearm_length_mm
    }

    /// Height at which the upper arm leaves its minimum angle.
    ///
    /// Units: millimeters.
    pub fn lower_region_boundary_mm(&self) -> f64 {
        self.base_length_mm + self.min_upperarm_rise_mm()
    }

    /// Height at which the upper arm reaches vertical.
    ///
    /// Units: millimeters.
    pub fn upper_region_boundary_mm(&self) -> f64 {
        self.base_length_mm + self.upperarm_length_mm
    }
}
