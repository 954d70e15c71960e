//! Sweep execution

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::thread;

use arm_if::{
    eqpt::arm::{DeviceCommand, ReplyError},
    link::{DeviceLink, LinkStage, SerialIo},
};
use log::{debug, info, warn};
use nalgebra::Point3;

use super::*;
use crate::{
    cam::Camera,
    kinematics::{solve_aimed_pose, ArmGeometry},
};

// ---------------------------------------------------------------------------
// TYPES
// ---------------------------------------------------------------------------

/// Error returned by a capture callback.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The link and camera owned by a controller.
pub struct Equipment<T: SerialIo, C: Camera> {
    pub link: DeviceLink<T>,
    pub camera: C,
}

/// Everything a sweep needs, owned so that it can be moved onto the sweep thread.
pub(crate) struct SweepPlan {
    pub name: String,
    pub geometry: ArmGeometry,
    pub params: AcqCtrlParams,
    pub object_mm: Point3<f64>,
    pub heights_mm: Vec<f64>,
    pub run_number: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<T: SerialIo, C: Camera> Equipment<T, C> {
    /// Make one attempt to stop the arm, then close the link and release the camera.
    ///
    /// Failures are logged and otherwise ignored. Calling this more than once only sends the stop
    /// command the first time, as the link is closed afterwards.
    pub fn shutdown(&mut self) {
        if self.link.is_ready() {
            match self.link.request_command(&DeviceCommand::Stop, 1) {
                Ok(reply) if reply.is_empty() => warn!("The arm did not acknowledge the stop command"),
                Ok(reply) => debug!("Arm stopped: {:?}", reply.lines),
                Err(e) => warn!("Could not stop the arm: {}", e),
            }
        }
        else {
            warn!("Arm link is {:?}, cannot send the stop command", self.link.state());
        }

        self.link.close();
        self.camera.release();
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Visit each height of the plan in order, capturing a frame at each one.
///
/// `should_stop` is checked before each height, if it returns true the sweep ends with
/// [`SweepOutcome::Stopped`]. The arm is left wherever it was last set.
///
/// Errors are returned as soon as they occur, cleaning up after them is left to the caller.
pub(crate) fn run_sweep<T, C, S, F>(
    plan: &SweepPlan,
    equipment: &mut Equipment<T, C>,
    should_stop: S,
    on_capture: &mut F,
) -> Result<SweepReport, AcqCtrlError>
where
    T: SerialIo,
    C: Camera,
    S: Fn() -> bool,
    F: FnMut(CaptureEvent) -> Result<(), CallbackError>,
{
    info!(
        "{}: run {} started, {} stops from {:.1} mm to {:.1} mm",
        plan.name,
        plan.run_number,
        plan.heights_mm.len(),
        plan.heights_mm.first().copied().unwrap_or(f64::NAN),
        plan.heights_mm.last().copied().unwrap_or(f64::NAN),
    );

    let mut heights_captured_mm = Vec::with_capacity(plan.heights_mm.len());

    for &height_mm in plan.heights_mm.iter() {
        if should_stop() {
            info!(
                "{}: run {} stopped after {} of {} stops",
                plan.name,
                plan.run_number,
                heights_captured_mm.len(),
                plan.heights_mm.len()
            );
            return Ok(SweepReport {
                run_number: plan.run_number,
                outcome: SweepOutcome::Stopped,
                heights_captured_mm,
            });
        }

        info!("Acquiring frame from {:.0} mm", height_mm);

        // ---- MOVE ----

        let pose = solve_aimed_pose(
            &plan.geometry,
            &plan.object_mm,
            height_mm,
            plan.params.aim_side,
        )?;
        debug!("Pose for {:.1} mm: {:?}", height_mm, pose.angles_deg());

        set_pose(&mut equipment.link, &pose.to_set_command(), plan.params.reply_lines)?;

        thread::sleep(plan.params.settle_time());

        // ---- CAPTURE ----

        let image = equipment
            .camera
            .capture_frame()
            .map_err(|source| AcqCtrlError::Capture { height_mm, source })?;

        on_capture(CaptureEvent {
            image,
            run_number: plan.run_number,
            height_mm,
            pose,
        })
        .map_err(AcqCtrlError::Callback)?;

        heights_captured_mm.push(height_mm);
    }

    info!("{}: run {} finished", plan.name, plan.run_number);

    Ok(SweepReport {
        run_number: plan.run_number,
        outcome: SweepOutcome::Completed,
        heights_captured_mm,
    })
}

/// Send a pose setting command and check the arm accepted it.
fn set_pose<T: SerialIo>(
    link: &mut DeviceLink<T>,
    command: &DeviceCommand,
    reply_lines: usize,
) -> Result<(), AcqCtrlError> {
    let reply = link.request_command(command, reply_lines)?;

    match reply.flag() {
        Ok(true) => Ok(()),
        Ok(false) => Err(AcqCtrlError::DeviceRejected {
            command: command.encode(),
            reply: reply.lines,
        }),
        // Nothing came back within the receive window
        Err(ReplyError::Empty) => Err(AcqCtrlError::LinkTimeout {
            stage: LinkStage::Receive,
            timeout: link.timeout(),
        }),
        Err(source) => Err(AcqCtrlError::MalformedReply {
            command: command.encode(),
            source,
        }),
    }
}
