//! Arm forward kinematics and camera aiming

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

// Internal imports
use super::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The side of the arm the object is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AimSide {
    /// The object is further from the base than the camera.
    Front,

    /// The object is closer to the base than the camera.
    Rear,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for AimSide {
    fn default() -> Self {
        AimSide::Front
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Horizontal distance of the wrist from the shoulder axis for the given pose.
///
/// Only the shoulder and elbow angles are used, so any aim applied to the wrist is ignored.
///
/// Units: millimeters.
pub fn forward_offset(geometry: &ArmGeometry, pose: &Pose) -> f64 {
    let shoulder_rad = pose.shoulder_deg().to_radians();
    let chain_rad = (CHAIN_TOTAL_DEG - pose.shoulder_deg() - pose.elbow_deg()).to_radians();

    geometry.upperarm_length_mm * shoulder_rad.cos()
        + geometry.forearm_length_mm * chain_rad.sin()
}

/// The position of the camera for a pose at the given height, in the arm's vertical plane.
pub fn camera_position(geometry: &ArmGeometry, pose: &Pose, height_mm: f64) -> Point3<f64> {
    Point3::new(forward_offset(geometry, pose), 0.0, height_mm)
}

/// Angle from the camera to the object in the vertical plane containing both.
///
/// The `y` coordinates are ignored. Positive angles tilt the camera up.
///
/// Units: degrees
pub fn aim_angle(object_mm: &Point3<f64>, camera_mm: &Point3<f64>, side: AimSide) -> f64 {
    let dz = object_mm.z - camera_mm.z;
    let dx = match side {
        AimSide::Front => object_mm.x - camera_mm.x,
        AimSide::Rear => camera_mm.x - object_mm.x,
    };

    dz.atan2(dx).to_degrees()
}

/// Solve the pose for the given height and tilt the wrist so the camera points at the object.
pub fn solve_aimed_pose(
    geometry: &ArmGeometry,
    object_mm: &Point3<f64>,
    height_mm: f64,
    side: AimSide,
) -> Result<Pose, KinematicsError> {
    let mut pose = solve_pose(geometry, height_mm)?;

    let camera_mm = camera_position(geometry, &pose, height_mm);
    pose.tilt_wrist(aim_angle(object_mm, &camera_mm, side));

    Ok(pose)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_aim_angle() {
        let object = Point3::new(100.0, 0.0, 200.0);
        let camera = Point3::new(50.0, 0.0, 100.0);

        let expected = 100f64.atan2(50.0).to_degrees();
        assert!((aim_angle(&object, &camera, AimSide::Front) - expected).abs() < 1e-9);
        assert!((expected - 63.434948822922).abs() < 1e-9);

        // Rear side mirrors the horizontal difference
        let rear = aim_angle(&object, &camera, AimSide::Rear);
        assert!((rear - 100f64.atan2(-50.0).to_degrees()).abs() < 1e-9);

        // The y coordinate plays no part
        let offset_object = Point3::new(100.0, 75.0, 200.0);
        assert_eq!(
            aim_angle(&offset_object, &camera, AimSide::Front),
            aim_angle(&object, &camera, AimSide::Front)
        );

        // Object directly below the camera
        let below = Point3::new(50.0, 0.0, 0.0);
        assert!((aim_angle(&below, &camera, AimSide::Front) + 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_forward_offset() {
        let geometry = ArmGeometry::default();

        // Fully upright arm has no horizontal reach
        let pose = solve_pose(&geometry, 325.0).unwrap();
        assert!(forward_offset(&geometry, &pose).abs() < 1e-6);

        // Upper arm vertical and forearm horizontal reaches one forearm length
        let pose = solve_pose(&geometry, 200.0).unwrap();
        assert!((forward_offset(&geometry, &pose) - 125.0).abs() < 1e-6);

        // Lowest pose, forearm straight down
        let pose = solve_pose(&geometry, geometry.min_reachable_height_mm()).unwrap();
        let expected = 125.0 * 15f64.to_radians().cos();
        assert!((forward_offset(&geometry, &pose) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_aimed_pose_tilts_wrist_only() {
        let geometry = ArmGeometry::default();
        let object = Point3::new(300.0, 0.0, 0.0);

        let level = solve_pose(&geometry, 150.0).unwrap();
        let aimed = solve_aimed_pose(&geometry, &object, 150.0, AimSide::Front).unwrap();

        let camera = camera_position(&geometry, &level, 150.0);
        let tilt = aim_angle(&object, &camera, AimSide::Front);
        assert!(tilt < 0.0);

        assert_eq!(aimed.shoulder_deg(), level.shoulder_deg());
        assert_eq!(aimed.elbow_deg(), level.elbow_deg());
        assert!((aimed.wrist_deg() - (level.wrist_deg() + tilt)).abs() < 1e-9);
    }
}
