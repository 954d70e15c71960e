//! # Acquisition Executable Parameters
//!
//! This module provide parameters for the acquisition executable, loaded from `acq_exec.toml`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use arm_if::link::LinkOptions;
use serde::Deserialize;

use crate::{acq_ctrl::AcqCtrlParams, cam::CamParams, kinematics::ArmGeometry};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AcqExecParams {
    pub link: LinkParams,

    pub arm: ArmGeometry,

    pub camera: CamParams,

    pub sequence: AcqCtrlParams,
}

/// Parameters of the link to the arm's controller board
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LinkParams {
    /// Serial port the board is connected to
    pub port: String,

    #[serde(flatten)]
    pub options: LinkOptions,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for LinkParams {
    fn default() -> Self {
        Self {
            port: String::from("/dev/ttyACM0"),
            options: LinkOptions::default(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::kinematics::AimSide;

    #[test]
    fn test_partial_params() {
        let params: AcqExecParams = util::params::from_str(
            r#"
            [link]
            port = "/dev/ttyUSB1"
            timeout_s = 5.0

            [arm]
            min_upperarm_deg = 20.0

            [sequence]
            aim_side = "Rear"
            "#,
        )
        .unwrap();

        assert_eq!(params.link.port, "/dev/ttyUSB1");
        assert_eq!(params.link.options.timeout_s, 5.0);
        assert_eq!(params.link.options.baud_rate, 9600);
        assert_eq!(params.arm.min_upperarm_deg, 20.0);
        assert_eq!(params.arm.forearm_length_mm, 125.0);
        assert_eq!(params.camera.stale_frames, 1);
        assert_eq!(params.sequence.aim_side, AimSide::Rear);
        assert_eq!(params.sequence.settle_time_s, 1.0);
    }

    #[test]
    fn test_shipped_params() {
        let params: AcqExecParams =
            util::params::from_str(include_str!("../../params/acq_exec.toml")).unwrap();

        assert_eq!(params.arm, ArmGeometry::default());
        assert_eq!(params.link.options.timeout_s, 10.0);
        assert_eq!(params.link.options.poll_interval_s, 0.01);
        assert_eq!(params.camera.width, 1280);
    }

    #[test]
    fn test_empty_params() {
        let params: AcqExecParams = util::params::from_str("").unwrap();

        assert_eq!(params.arm, ArmGeometry::default());
        assert_eq!(params.link.options.receive_limit_s, None);
    }
}
