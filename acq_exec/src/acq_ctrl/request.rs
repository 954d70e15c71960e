//! Motion requests

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use util::maths::linspace;

use super::AcqCtrlError;
use crate::kinematics::{ArmGeometry, KinematicsError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A request to sweep the camera through a range of heights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionRequest {
    /// Position of the object relative to the arm.
    ///
    /// Units: millimeters.
    pub object_position_mm: Point3<f64>,

    /// Height of the first stop.
    ///
    /// Units: millimeters.
    pub min_height_mm: f64,

    /// Height of the last stop.
    ///
    /// Units: millimeters.
    pub max_height_mm: f64,

    /// Number of evenly spaced stops, including both ends.
    pub num_stops: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MotionRequest {
    pub fn new(
        object_position_mm: Point3<f64>,
        min_height_mm: f64,
        max_height_mm: f64,
        num_stops: usize,
    ) -> Self {
        Self {
            object_position_mm,
            min_height_mm,
            max_height_mm,
            num_stops,
        }
    }

    /// Check the request is well formed and that every height can be reached by the arm.
    ///
    /// Returns the heights of the sweep.
    pub fn validate(&self, geometry: &ArmGeometry) -> Result<Vec<f64>, AcqCtrlError> {
        let finite = self.object_position_mm.coords.iter().all(|v| v.is_finite())
            && self.min_height_mm.is_finite()
            && self.max_height_mm.is_finite();

        if !finite {
            return Err(AcqCtrlError::InvalidRequest(format!(
                "all values must be finite: {:?}",
                self
            )));
        }

        if self.num_stops < 1 {
            return Err(AcqCtrlError::InvalidRequest(String::from(
                "at least one stop is required"
            )));
        }

        if self.min_height_mm > self.max_height_mm {
            return Err(AcqCtrlError::InvalidRequest(format!(
                "minimum height {} mm is above maximum height {} mm",
                self.min_height_mm, self.max_height_mm
            )));
        }

        let heights = self.heights();

        let min_mm = geometry.min_reachable_height_mm();
        let max_mm = geometry.max_reachable_height_mm();
        if let Some(&height_mm) = heights.iter().find(|&&h| h < min_mm || h > max_mm) {
            return Err(KinematicsError::OutOfReach {
                height_mm,
                min_mm,
                max_mm,
            }
            .into());
        }

        Ok(heights)
    }

    /// Heights of the sweep, in order. A single stop is at the minimum height.
    pub fn heights(&self) -> Vec<f64> {
        linspace(self.min_height_mm, self.max_height_mm, self.num_stops)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn request(min: f64, max: f64, stops: usize) -> MotionRequest {
        MotionRequest::new(Point3::new(250.0, 0.0, 0.0), min, max, stops)
    }

    #[test]
    fn test_heights() {
        assert_eq!(request(75.0, 75.0, 1).heights(), vec![75.0]);
        assert_eq!(request(75.0, 175.0, 1).heights(), vec![75.0]);
        assert_eq!(
            request(100.0, 200.0, 3).heights(),
            vec![100.0, 150.0, 200.0]
        );
    }

    #[test]
    fn test_validate() {
        let geometry = ArmGeometry::default();

        assert_eq!(request(75.0, 75.0, 1).validate(&geometry).unwrap(), vec![75.0]);

        assert!(matches!(
            request(200.0, 100.0, 3).validate(&geometry),
            Err(AcqCtrlError::InvalidRequest(_))
        ));
        assert!(matches!(
            request(100.0, 200.0, 0).validate(&geometry),
            Err(AcqCtrlError::InvalidRequest(_))
        ));
        assert!(matches!(
            request(f64::NAN, 200.0, 2).validate(&geometry),
            Err(AcqCtrlError::InvalidRequest(_))
        ));
        assert!(matches!(
            request(100.0, 400.0, 2).validate(&geometry),
            Err(AcqCtrlError::OutOfReach(KinematicsError::OutOfReach { .. }))
        ));
    }
}
