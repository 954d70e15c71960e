//! # Acquisition library.
//!
//! This library allows other crates in the workspace to access items defined inside the
//! acquisition crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Acquisition control module - drives the arm through a sweep of heights and captures a frame at
/// each one
pub mod acq_ctrl;

/// Camera module - the camera the controller captures from
pub mod cam;

/// Kinematics module - converts camera heights into arm poses
pub mod kinematics;

/// Executable parameters
pub mod params;
