//! Acquisition controller lifecycle

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    sync::{Arc, Mutex, MutexGuard},
    thread::{self, JoinHandle},
};

use arm_if::link::{DeviceLink, LinkError, SerialIo};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};

use super::*;
use crate::{
    cam::Camera,
    kinematics::{ArmGeometry, KinematicsError},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Acquisition controller.
///
/// Owns the arm link and camera between [`AcqCtrl::attach`] and [`AcqCtrl::release`]. At most one
/// sweep runs at a time.
pub struct AcqCtrl<T: SerialIo + 'static, C: Camera + 'static> {
    name: String,

    created: DateTime<Utc>,

    geometry: ArmGeometry,

    params: AcqCtrlParams,

    status: Arc<Mutex<Status>>,

    /// Attached equipment, `None` while detached or while a sweep owns it
    equipment: Option<Equipment<T, C>>,

    /// Background sweep started by [`AcqCtrl::start`] and not yet joined
    worker: Option<JoinHandle<SweepExit<T, C>>>,
}

/// Requests a stop of a running sweep from another thread, or from inside a capture callback.
#[derive(Clone)]
pub struct StopHandle {
    status: Arc<Mutex<Status>>,
}

struct Status {
    state: SequenceState,
    run_count: u64,
}

/// Holds the equipment for the length of a sweep.
///
/// A guard dropped without [`SweepGuard::finish`], because the sweep panicked or its thread never
/// started, faults the controller and shuts the equipment down.
struct SweepGuard<T: SerialIo, C: Camera> {
    status: Arc<Mutex<Status>>,
    equipment: Option<Equipment<T, C>>,
}

/// What a background sweep hands back when it exits.
struct SweepExit<T: SerialIo, C: Camera> {
    equipment: Option<Equipment<T, C>>,
    result: Result<SweepReport, AcqCtrlError>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<T: SerialIo + 'static, C: Camera + 'static> AcqCtrl<T, C> {
    /// Create a new, detached, controller.
    pub fn new(
        name: &str,
        geometry: ArmGeometry,
        params: AcqCtrlParams,
    ) -> Result<Self, KinematicsError> {
        geometry.validate()?;

        Ok(Self {
            name: name.to_string(),
            created: Utc::now(),
            geometry,
            params,
            status: Arc::new(Mutex::new(Status {
                state: SequenceState::Idle,
                run_count: 0,
            })),
            equipment: None,
            worker: None,
        })
    }

    /// Take ownership of the arm link and camera.
    ///
    /// The link must have completed its handshake.
    pub fn attach(&mut self, link: DeviceLink<T>, camera: C) -> Result<(), AcqCtrlError> {
        match self.state() {
            SequenceState::Faulted => return Err(AcqCtrlError::Faulted),
            s if s.is_active() => return Err(AcqCtrlError::Busy(s)),
            _ => (),
        }

        self.reap();

        if self.equipment.is_some() {
            return Err(AcqCtrlError::AlreadyAttached);
        }

        if !link.is_ready() {
            return Err(LinkError::NotReady(link.state()).into());
        }

        self.equipment = Some(Equipment { link, camera });
        info!("{}: arm link and camera attached", self.name);

        Ok(())
    }

    /// Start a sweep on a background thread.
    ///
    /// Returns `Ok(false)` without doing anything if the controller is not idle. Invalid or
    /// unreachable requests are rejected before any command is sent.
    pub fn start<F>(&mut self, request: &MotionRequest, on_capture: F) -> Result<bool, AcqCtrlError>
    where
        F: FnMut(CaptureEvent) -> Result<(), CallbackError> + Send + 'static,
    {
        let (plan, equipment) = match self.begin(request)? {
            Some(b) => b,
            None => {
                debug!("{}: start rejected while {}", self.name, self.state());
                return Ok(false);
            }
        };

        let mut guard = SweepGuard::new(&self.status, equipment);
        let mut on_capture = on_capture;

        let spawned = thread::Builder::new()
            .name(format!("{}::sweep", self.name))
            .spawn(move || {
                let result = guard.run(&plan, &mut on_capture);
                let equipment = guard.finish(&result);

                SweepExit { equipment, result }
            });

        match spawned {
            Ok(jh) => {
                self.worker = Some(jh);
                Ok(true)
            }
            Err(e) => {
                // Dropping the closure dropped the guard, which has shut the equipment down
                error!("{}: could not spawn the sweep thread: {}", self.name, e);
                Err(AcqCtrlError::Spawn(e))
            }
        }
    }

    /// Run a sweep on this thread, blocking until it completes, is stopped through a
    /// [`StopHandle`], or faults.
    pub fn run_sync<F>(
        &mut self,
        request: &MotionRequest,
        mut on_capture: F,
    ) -> Result<SweepReport, AcqCtrlError>
    where
        F: FnMut(CaptureEvent) -> Result<(), CallbackError>,
    {
        let (plan, equipment) = match self.begin(request)? {
            Some(b) => b,
            None => {
                return Err(match self.state() {
                    SequenceState::Faulted => AcqCtrlError::Faulted,
                    s => AcqCtrlError::Busy(s),
                })
            }
        };

        let mut guard = SweepGuard::new(&self.status, equipment);
        let result = guard.run(&plan, &mut on_capture);
        self.equipment = guard.finish(&result);

        result
    }

    /// Stop the background sweep and wait for it to exit.
    ///
    /// Returns the report of the sweep, or `None` if there was no background sweep. If the sweep
    /// faulted before observing the stop its error is returned.
    pub fn stop(&mut self) -> Result<Option<SweepReport>, AcqCtrlError> {
        self.stop_handle().request_stop();
        self.join()
    }

    /// Wait for the background sweep to exit without stopping it.
    pub fn join(&mut self) -> Result<Option<SweepReport>, AcqCtrlError> {
        let result = self.join_worker();

        if let Some(Err(AcqCtrlError::SweepPanicked)) = result {
            lock(&self.status).state = SequenceState::Faulted;
        }

        result.transpose()
    }

    /// Stop the arm, close the link, release the camera, and return to the detached state.
    ///
    /// Not allowed while a sweep is in progress. Releasing a detached controller does nothing.
    pub fn release(&mut self) -> Result<(), AcqCtrlError> {
        let state = self.state();
        if state.is_active() {
            return Err(AcqCtrlError::Busy(state));
        }

        self.reap();

        if let Some(mut equipment) = self.equipment.take() {
            equipment.shutdown();
            info!("{}: arm link and camera released", self.name);
        }

        Ok(())
    }

    /// A handle which can request a stop of the running sweep.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            status: self.status.clone(),
        }
    }

    pub fn state(&self) -> SequenceState {
        lock(&self.status).state
    }

    /// Number of sweeps started so far, however they ended.
    pub fn run_count(&self) -> u64 {
        lock(&self.status).run_count
    }

    pub fn is_attached(&self) -> bool {
        self.equipment.is_some()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created(&self) -> &DateTime<Utc> {
        &self.created
    }

    pub fn geometry(&self) -> &ArmGeometry {
        &self.geometry
    }

    pub fn params(&self) -> &AcqCtrlParams {
        &self.params
    }

    /// Move from idle to running, taking the equipment for the sweep.
    ///
    /// Returns `None` if the controller is not idle.
    fn begin(
        &mut self,
        request: &MotionRequest,
    ) -> Result<Option<(SweepPlan, Equipment<T, C>)>, AcqCtrlError> {
        let status = self.status.clone();
        let mut status = lock(&status);

        if status.state != SequenceState::Idle {
            return Ok(None);
        }

        // A finished background sweep still holds the equipment until joined
        if let Some(Err(AcqCtrlError::SweepPanicked)) = self.join_worker() {
            status.state = SequenceState::Faulted;
            return Err(AcqCtrlError::SweepPanicked);
        }

        let heights_mm = request.validate(&self.geometry)?;
        let equipment = self.equipment.take().ok_or(AcqCtrlError::NotAttached)?;

        let run_number = status.run_count;
        status.run_count += 1;
        status.state = SequenceState::Running;

        let plan = SweepPlan {
            name: self.name.clone(),
            geometry: self.geometry.clone(),
            params: self.params.clone(),
            object_mm: request.object_position_mm,
            heights_mm,
            run_number,
        };

        Ok(Some((plan, equipment)))
    }

    /// Join the background sweep if there is one, taking back its equipment.
    ///
    /// Does not lock the status.
    fn join_worker(&mut self) -> Option<Result<SweepReport, AcqCtrlError>> {
        let jh = self.worker.take()?;

        match jh.join() {
            Ok(exit) => {
                if exit.equipment.is_some() {
                    self.equipment = exit.equipment;
                }
                Some(exit.result)
            }
            Err(_) => {
                error!("{}: the sweep thread panicked", self.name);
                Some(Err(AcqCtrlError::SweepPanicked))
            }
        }
    }

    /// Join a finished background sweep whose result nobody asked for.
    fn reap(&mut self) {
        match self.join() {
            Ok(Some(report)) => debug!("{}: collected unjoined sweep {:?}", self.name, report),
            Ok(None) => (),
            Err(e) => warn!("{}: unjoined sweep ended with an error: {}", self.name, e),
        }
    }
}

impl<T: SerialIo + 'static, C: Camera + 'static> Drop for AcqCtrl<T, C> {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("{}: sweep ended with an error while dropping: {}", self.name, e);
        }
        if let Err(e) = self.release() {
            warn!("{}: could not release while dropping: {}", self.name, e);
        }
    }
}

impl<T: SerialIo, C: Camera> SweepGuard<T, C> {
    fn new(status: &Arc<Mutex<Status>>, equipment: Equipment<T, C>) -> Self {
        Self {
            status: status.clone(),
            equipment: Some(equipment),
        }
    }

    fn run<F>(&mut self, plan: &SweepPlan, on_capture: &mut F) -> Result<SweepReport, AcqCtrlError>
    where
        F: FnMut(CaptureEvent) -> Result<(), CallbackError>,
    {
        let status = &self.status;

        match self.equipment.as_mut() {
            Some(equipment) => run_sweep(plan, equipment, || is_stopping(status), on_capture),
            None => Err(AcqCtrlError::NotAttached),
        }
    }

    /// Leave the running state once the sweep has exited.
    ///
    /// On success the equipment is handed back and the controller becomes idle. On error the
    /// controller faults and the equipment is shut down and dropped.
    fn finish(mut self, result: &Result<SweepReport, AcqCtrlError>) -> Option<Equipment<T, C>> {
        let mut equipment = self.equipment.take()?;

        match result {
            Ok(_) => {
                lock(&self.status).state = SequenceState::Idle;
                Some(equipment)
            }
            Err(e) => {
                error!("Sweep faulted: {}", e);
                lock(&self.status).state = SequenceState::Faulted;
                equipment.shutdown();
                None
            }
        }
    }
}

impl<T: SerialIo, C: Camera> Drop for SweepGuard<T, C> {
    fn drop(&mut self) {
        if let Some(mut equipment) = self.equipment.take() {
            error!("Sweep ended without finishing, shutting the equipment down");
            lock(&self.status).state = SequenceState::Faulted;
            equipment.shutdown();
        }
    }
}

impl StopHandle {
    /// Ask a running sweep to stop before its next height.
    ///
    /// Returns true if the request was made, false if no sweep was running.
    pub fn request_stop(&self) -> bool {
        let mut status = lock(&self.status);

        match status.state {
            SequenceState::Running => {
                status.state = SequenceState::Stopping;
                info!("Stop requested");
                true
            }
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn lock(status: &Mutex<Status>) -> MutexGuard<'_, Status> {
    status.lock().unwrap_or_else(|e| e.into_inner())
}

fn is_stopping(status: &Mutex<Status>) -> bool {
    lock(status).state == SequenceState::Stopping
}
