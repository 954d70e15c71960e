//! Arm kinematics module
//!
//! Closed form kinematics of the planar shoulder/elbow/wrist chain of the arm. Given a camera
//! height the inverse kinematics pick the shoulder and elbow angles, and set the wrist so that the
//! end effector stays level. The forward kinematics recover the horizontal reach of a pose so the
//! camera can be aimed at the object.
//!
//! All functions here are pure.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod forward_kinematics;
mod inverse_kinematics;
mod params;
mod pose;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use forward_kinematics::*;
pub use inverse_kinematics::*;
pub use params::*;
pub use pose::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Sum of the shoulder, elbow and wrist angles which keeps the end effector level.
///
/// Units: degrees
pub const CHAIN_TOTAL_DEG: f64 = 180.0;

/// Minimum number of servos on an arm, base, shoulder, elbow and wrist.
pub const MIN_NUM_SERVOS: usize = 4;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during kinematics calculations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KinematicsError {
    #[error(
        "Height {height_mm} mm is outside of the reachable envelope \
        [{min_mm:.3}, {max_mm:.3}] mm"
    )]
    OutOfReach {
        height_mm: f64,
        min_mm: f64,
        max_mm: f64,
    },

    #[error("Invalid arm geometry: {0}")]
    InvalidGeometry(String),
}
