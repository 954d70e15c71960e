//! # Acquisition Executable
//!
//! Sweeps the arm mounted camera through a range of heights around an object, saving a frame at
//! each height into a directory named after the sequence inside the session directory.
//!
//! # Architecture
//!
//!     - Initialise the session and logger
//!     - Load parameters
//!     - Open the arm link and camera (or their simulators) and attach them to a controller
//!     - Run the sweep, saving and archiving each capture
//!     - Release the arm link and camera

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::path::{Path, PathBuf};

use arm_if::link::{
    sim::{SimConfig, SimDevice},
    Connected, DeviceLink, SerialIo,
};
use color_eyre::{eyre::WrapErr, Report};
use log::{info, warn};
use nalgebra::Point3;
use serde::Serialize;
use structopt::StructOpt;

// Internal
use acq_lib::{
    acq_ctrl::{AcqCtrl, CallbackError, CaptureEvent, MotionRequest, SweepOutcome},
    cam::{sim::SimCamera, Camera},
    params::AcqExecParams,
};
use util::{
    archive::Archiver,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Capture a sweep of images of an object with the arm mounted camera.
#[derive(Debug, StructOpt)]
#[structopt(name = "acq_exec")]
struct Opts {
    /// Name of the sequence, used for the output directory.
    name: String,

    /// Object position along the arm's forward axis in millimeters.
    #[structopt(long, allow_hyphen_values = true)]
    object_x: f64,

    /// Object position across the arm's forward axis in millimeters.
    #[structopt(long, default_value = "0", allow_hyphen_values = true)]
    object_y: f64,

    /// Object height above the base plane in millimeters.
    #[structopt(long, default_value = "0", allow_hyphen_values = true)]
    object_z: f64,

    /// Height of the lowest stop in millimeters.
    #[structopt(long)]
    min_height: f64,

    /// Height of the highest stop in millimeters.
    #[structopt(long)]
    max_height: f64,

    /// Number of stops, including both ends.
    #[structopt(long, default_value = "10")]
    stops: usize,

    /// Parameter file, relative to `$IMAGEBOT_SW_ROOT/params` unless absolute.
    #[structopt(long, default_value = "acq_exec.toml")]
    params: PathBuf,

    /// Replace the arm and camera with simulators.
    #[structopt(long)]
    sim: bool,

    /// Directory the session is created in.
    #[structopt(long, default_value = "sessions")]
    sessions_dir: String,

    /// Minimum log level (info, debug or trace).
    #[structopt(long, default_value = "debug")]
    log_level: LevelFilter,
}

/// One row of the capture archive.
#[derive(Serialize)]
struct CaptureRecord {
    run_number: u64,
    height_mm: f64,
    shoulder_deg: f64,
    elbow_deg: f64,
    wrist_deg: f64,
    timestamp: String,
    path: String,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("acq_exec", &opts.sessions_dir)
        .wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(opts.log_level, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("ImageBot Acquisition Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params: AcqExecParams = if opts.params.is_absolute() {
        util::params::load_from_path(&opts.params)
    }
    else {
        util::params::load(&opts.params.to_string_lossy())
    }
    .wrap_err("Could not load acq_exec params")?;

    info!("Exec parameters loaded");

    let request = MotionRequest::new(
        Point3::new(opts.object_x, opts.object_y, opts.object_z),
        opts.min_height,
        opts.max_height,
        opts.stops,
    );

    // ---- INITIALISE EQUIPMENT ----

    if opts.sim {
        info!("Using the simulated arm and camera");

        let device = SimDevice::new(SimConfig::default());
        let link = ready(DeviceLink::connect(device.port(), params.link.options.clone()))?;
        let camera = SimCamera::new(params.camera.width, params.camera.height);

        run(&opts.name, &session, params, link, camera, &request)
    }
    else {
        let link = ready(
            DeviceLink::open(&params.link.port, params.link.options.clone())
                .wrap_err_with(|| format!("Could not open the arm link on {}", params.link.port))?,
        )?;
        let camera = open_camera(&params)?;

        run(&opts.name, &session, params, link, camera, &request)
    }
}

/// Attach the equipment to a controller, run the sweep and release everything.
fn run<T, C>(
    name: &str,
    session: &Session,
    params: AcqExecParams,
    link: DeviceLink<T>,
    camera: C,
    request: &MotionRequest,
) -> Result<(), Report>
where
    T: SerialIo + 'static,
    C: Camera + 'static,
{
    let mut ctrl = AcqCtrl::new(name, params.arm, params.sequence)
        .wrap_err("Invalid arm geometry")?;

    info!(
        "Sequence {:?} created at {}",
        ctrl.name(),
        ctrl.created().format(util::session::TIMESTAMP_FORMAT)
    );

    ctrl.attach(link, camera)
        .wrap_err("Could not attach the arm link and camera")?;

    // ---- OUTPUT ----

    let output_dir = session
        .output_dir(name)
        .wrap_err("Could not create the output directory")?;
    let mut archiver = Archiver::from_path(session, "captures.csv")
        .wrap_err("Could not create the capture archive")?;
    info!("Archiving captures to {:?}", archiver.path());

    // ---- SWEEP ----

    let result = ctrl.run_sync(request, |event| save_capture(&output_dir, &mut archiver, event));

    // Release whatever the outcome, a faulted controller has already released
    if let Err(e) = ctrl.release() {
        warn!("Could not release the equipment: {}", e);
    }

    let report = result.wrap_err("Acquisition failed")?;

    match report.outcome {
        SweepOutcome::Completed => info!(
            "Run {} complete, {} images saved in {:?}",
            report.run_number,
            report.heights_captured_mm.len(),
            output_dir
        ),
        SweepOutcome::Stopped => warn!(
            "Run {} stopped after {} images",
            report.run_number,
            report.heights_captured_mm.len()
        ),
    }

    Ok(())
}

/// Save a captured frame and archive its record.
fn save_capture(
    output_dir: &Path,
    archiver: &mut Archiver,
    event: CaptureEvent,
) -> Result<(), CallbackError> {
    let filename = format!("run{}-{:.0}mm.png", event.run_number, event.height_mm);
    let path = output_dir.join(filename);

    event.image.save(&path)?;
    info!("Saved {:?}", path);

    let record = CaptureRecord {
        run_number: event.run_number,
        height_mm: event.height_mm,
        shoulder_deg: event.pose.shoulder_deg(),
        elbow_deg: event.pose.elbow_deg(),
        wrist_deg: event.pose.wrist_deg(),
        timestamp: event.image.timestamp.to_rfc3339(),
        path: path.to_string_lossy().to_string(),
    };

    archiver.serialise(record)?;

    Ok(())
}

/// Take a link whose handshake succeeded, closing the connection if it failed.
fn ready<T: SerialIo>(connected: Connected<T>) -> Result<DeviceLink<T>, Report> {
    match connected {
        Ok(link) => Ok(link),
        Err((mut link, e)) => {
            link.close();
            Err(e).wrap_err("The arm controller did not complete its setup")
        }
    }
}

#[cfg(feature = "v4l")]
fn open_camera(params: &AcqExecParams) -> Result<impl Camera, Report> {
    acq_lib::cam::v4l::V4lCamera::open(&params.camera).wrap_err("Could not open the camera")
}

#[cfg(not(feature = "v4l"))]
fn open_camera(_params: &AcqExecParams) -> Result<SimCamera, Report> {
    Err(color_eyre::eyre::eyre!(
        "acq_exec was built without camera support, rebuild with `--features v4l` or use `--sim`"
    ))
}
