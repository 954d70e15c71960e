//! Arm inverse kinematics calculations

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use serde::Serialize;
use util::maths::clamp;

// Internal imports
use super::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The regions of the piecewise inverse kinematics solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Region {
    /// Below the lower boundary. The upper arm rests at its minimum angle and the forearm
    /// points down.
    Folded,

    /// Between the boundaries. The forearm is horizontal and the upper arm sets the height.
    UpperArm,

    /// Above the upper boundary. The upper arm is vertical and the forearm sets the height.
    Forearm,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Find the region of the solution a height lies in.
///
/// Boundary heights belong to the [`Region::UpperArm`] region.
pub fn region_for_height(geometry: &ArmGeometry, height_mm: f64) -> Region {
    if height_mm < geometry.lower_region_boundary_mm() {
        Region::Folded
    }
    else if height_mm <= geometry.upper_region_boundary_mm() {
        Region::UpperArm
    }
    else {
        Region::Forearm
    }
}

/// Solve the pose which places the wrist at the given height with the end effector level.
///
/// The base, wrist rotation and gripper servos are left at zero. Heights outside of
/// `[min_reachable_height, max_reachable_height]` are rejected, as are invalid geometries.
pub fn solve_pose(geometry: &ArmGeometry, height_mm: f64) -> Result<Pose, KinematicsError> {
    geometry.validate()?;

    let min_mm = geometry.min_reachable_height_mm();
    let max_mm = geometry.max_reachable_height_mm();

    if !(height_mm >= min_mm && height_mm <= max_mm) {
        return Err(KinematicsError::OutOfReach {
            height_mm,
            min_mm,
            max_mm,
        });
    }

    let region = region_for_height(geometry, height_mm);
    let pose = solve_region(geometry, region, height_mm);

    trace!(
        "Solved {:.3} mm in region {:?}: shoulder {:.3}, elbow {:.3}, wrist {:.3}",
        height_mm,
        region,
        pose.shoulder_deg(),
        pose.elbow_deg(),
        pose.wrist_deg()
    );

    Ok(pose)
}

/// Evaluate the closed form of one region at the given height.
///
/// No reach check is made, arguments to the arcsines are clamped into their domain.
pub fn solve_region(geometry: &ArmGeometry, region: Region, height_mm: f64) -> Pose {
    let (shoulder_deg, elbow_deg) = match region {
        Region::Folded => {
            let drop_mm = height_mm - geometry.lower_region_boundary_mm();
            let forearm_deg = asin_deg(drop_mm / geometry.forearm_length_mm);

            (
                geometry.min_upperarm_deg,
                90.0 + forearm_deg - geometry.min_upperarm_deg,
            )
        }
        Region::UpperArm => {
            let rise_mm = height_mm - geometry.base_length_mm;
            let shoulder_deg = asin_deg(rise_mm / geometry.upperarm_length_mm);

            (shoulder_deg, 90.0 - shoulder_deg)
        }
        Region::Forearm => {
            let rise_mm = height_mm - geometry.upper_region_boundary_mm();

            (90.0, asin_deg(rise_mm / geometry.forearm_length_mm))
        }
    };

    let mut angles_deg = vec![0.0; geometry.num_servos.max(MIN_NUM_SERVOS)];
    angles_deg[SHOULDER_IDX] = shoulder_deg;
    angles_deg[ELBOW_IDX] = elbow_deg;
    angles_deg[WRIST_IDX] = CHAIN_TOTAL_DEG - shoulder_deg - elbow_deg;

    Pose::new(angles_deg)
}

fn asin_deg(ratio: f64) -> f64 {
    clamp(ratio, -1.0, 1.0).asin().to_degrees()
}

#[cfg(test)]
mod test {
    use super::*;

    const TOL: f64 = 1e-6;

    fn assert_poses_agree(a: &Pose, b: &Pose) {
        for (x, y) in a.angles_deg().iter().zip(b.angles_deg()) {
            assert!((x - y).abs() < TOL, "{:?} != {:?}", a, b);
        }
    }

    #[test]
    fn test_chain_sum_over_envelope() {
        let geometry = ArmGeometry::default();
        let min = geometry.min_reachable_height_mm();
        let max = geometry.max_reachable_height_mm();

        for height in util::maths::linspace(min, max, 1001) {
            let pose = solve_pose(&geometry, height).unwrap();
            assert_eq!(pose.num_servos(), geometry.num_servos);
            assert!(
                (pose.chain_sum_deg() - CHAIN_TOTAL_DEG).abs() < TOL,
                "sum at {} mm was {}",
                height,
                pose.chain_sum_deg()
            );
        }
    }

    #[test]
    fn test_region_boundaries_agree() {
        let geometry = ArmGeometry::default();

        let lower = geometry.lower_region_boundary_mm();
        assert_poses_agree(
            &solve_region(&geometry, Region::Folded, lower),
            &solve_region(&geometry, Region::UpperArm, lower),
        );

        let upper = geometry.upper_region_boundary_mm();
        assert_poses_agree(
            &solve_region(&geometry, Region::UpperArm, upper),
            &solve_region(&geometry, Region::Forearm, upper),
        );

        // Either side of the lower boundary the regions converge
        let eps = 1e-9;
        assert_eq!(region_for_height(&geometry, lower - eps), Region::Folded);
        assert_poses_agree(
            &solve_pose(&geometry, lower - eps).unwrap(),
            &solve_pose(&geometry, lower + eps).unwrap(),
        );

        assert_eq!(region_for_height(&geometry, upper), Region::UpperArm);
        assert_eq!(region_for_height(&geometry, upper + eps), Region::Forearm);
    }

    #[test]
    fn test_reach_bounds() {
        let geometry = ArmGeometry::default();
        let min = geometry.min_reachable_height_mm();
        let max = geometry.max_reachable_height_mm();

        assert!(solve_pose(&geometry, min).is_ok());
        assert!(solve_pose(&geometry, max).is_ok());

        assert!(matches!(
            solve_pose(&geometry, min - 1e-6),
            Err(KinematicsError::OutOfReach { .. })
        ));
        assert!(matches!(
            solve_pose(&geometry, max + 1e-6),
            Err(KinematicsError::OutOfReach { .. })
        ));
        assert!(solve_pose(&geometry, f64::NAN).is_err());
    }

    #[test]
    fn test_known_poses() {
        let geometry = ArmGeometry::default();

        // Arm fully upright
        let pose = solve_pose(&geometry, 325.0).unwrap();
        assert!((pose.shoulder_deg() - 90.0).abs() < TOL);
        assert!((pose.elbow_deg() - 90.0).abs() < TOL);
        assert!((pose.wrist_deg() - 0.0).abs() < TOL);

        // Upper arm vertical, forearm horizontal
        let pose = solve_pose(&geometry, 200.0).unwrap();
        assert!((pose.shoulder_deg() - 90.0).abs() < TOL);
        assert!(pose.elbow_deg().abs() < TOL);
        assert!((pose.wrist_deg() - 90.0).abs() < TOL);

        // Height of the shoulder, the upper arm can't be horizontal so the arm folds
        let pose = solve_pose(&geometry, 75.0).unwrap();
        assert_eq!(region_for_height(&geometry, 75.0), Region::Folded);
        assert!((pose.shoulder_deg() - geometry.min_upperarm_deg).abs() < TOL);
    }

    #[test]
    fn test_invalid_geometry() {
        let mut geometry = ArmGeometry::default();
        assert!(geometry.validate().is_ok());

        geometry.num_servos = 3;
        assert!(geometry.validate().is_err());

        geometry = ArmGeometry {
            forearm_length_mm: 0.0,
            ..Default::default()
        };
        assert!(geometry.validate().is_err());
    }
}
