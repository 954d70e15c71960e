//! # Arm interface crate.
//!
//! Provides the interfaces to the acquisition equipment: the command set understood by the arm
//! firmware, the image type produced by cameras, and the framed serial link to the arm.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Command, reply and image definitions for equipment (arm and camera)
pub mod eqpt;

/// Framed serial link to the arm controller board
pub mod link;
