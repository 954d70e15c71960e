//! # Equipment Interface
//!
//! This module defines the interface structures which are exchanged with the acquisition
//! equipment.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod arm;
pub mod cam;
