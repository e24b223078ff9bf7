//! Main operator console executable entry point.
//!
//! # Architecture
//!
//! The console runs a single-threaded cooperative loop at the frame cadence:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - Device link input acquisition:
//!             - Telemetry ingestion into the pose store
//!             - Roster updates
//!         - Operator intent processing and handling
//!         - Control processing:
//!             - Replay stepping (when returning to origin)
//!             - Bounded input and heading control (manual mode)
//!             - Autonomous navigation (auto/return-home, decimated cadence)
//!         - Command emission and dead-reckoning integration
//!         - Display projection publication
//!
//! Nothing in the loop blocks: sends and receives are fire-and-forget with
//! short timeouts, and the replayer's hold times are deadlines checked once
//! per cycle rather than sleeps.
//!
//! # Modules
//!
//! All cyclic control modules (e.g. `bounded_input`) shall meet the following
//! requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use comms_if::{
    dev::{DevCmd, DevMsg, MotionCmd},
    net::NetParams,
    ops::Mode,
};
use ops_lib::{
    *,
    data_store::DataStore,
    device_link::DeviceClient,
    history::ReplayOutput,
    loc::Pose,
    nav::NavOutput,
    params::OpsExecParams,
    ui_server::{UiServer, UiServerError},
};

mod intent_processor;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::{eyre, WrapErr}, Report};
use log::{debug, error, info, trace, warn};
use nalgebra::Vector2;
use serde::Serialize;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use util::{
    archive::Archiver,
    logger::{logger_init, LevelFilter},
    maths::wrap_to_pi,
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one cycle (frame cadence).
const CYCLE_PERIOD_S: f64 = 1.0 / 60.0;

/// The autonomous navigator is stepped once every this many cycles, giving
/// its fixed ~120 ms cadence.
const NAV_CYCLE_DECIMATION: u128 = 7;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A row of the emitted-command archive.
#[derive(Serialize)]
struct CmdArchiveRecord {
    time_s: f64,
    device: String,
    x: f64,
    y: f64,
    rotation: f64,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "ops_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Mesha Operator Console\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let net_params: NetParams = util::params::load(
        "net.toml"
    ).wrap_err("Could not load net params")?;

    let exec_params: OpsExecParams = util::params::load(
        "ops_exec.toml"
    ).wrap_err("Could not load exec params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();
    ds.params = exec_params;
    ds.speed_scale = ds.params.default_speed_scale;

    // ---- INITIALISE MODULES ----

    ds.board = util::params::load("board.toml")
        .wrap_err("Failed to load board params")?;
    info!("Board configured: {} x {} cells of {} m",
        ds.board.cells_per_side,
        ds.board.cells_per_side,
        ds.board.cell_size_m
    );

    ds.bounded_input.init("bounded_input.toml", &session)
        .wrap_err("Failed to initialise BoundedInput")?;
    info!("BoundedInput init complete");

    ds.heading_ctrl.init("heading_ctrl.toml", &session)
        .wrap_err("Failed to initialise HeadingCtrl")?;
    info!("HeadingCtrl init complete");

    ds.nav.init("nav.toml")
        .wrap_err("Failed to initialise Navigator")?;
    info!("Navigator init complete");

    ds.history.init("history.toml")
        .wrap_err("Failed to initialise HistoryRecorder")?;
    info!("HistoryRecorder init complete");

    info!("Module initialisation complete\n");

    // ---- INITIALISE ARCHIVES ----

    let mut arch_cmds = Archiver::from_path(&session, "commands.csv")
        .map_err(|e| eyre!("Failed to create command archive: {}", e))?;
    let mut arch_history = Archiver::from_path(&session, "history.csv")
        .map_err(|e| eyre!("Failed to create history archive: {}", e))?;

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let zmq_ctx = comms_if::net::zmq::Context::new();

    let mut ui_server = {
        let s = UiServer::new(&zmq_ctx, &net_params)
            .wrap_err("Failed to initialise the UiServer")?;
        info!("UiServer initialised");
        s
    };

    let device_client = {
        let c = DeviceClient::new(&zmq_ctx, &net_params)
            .wrap_err("Failed to initialise the DeviceClient")?;
        info!("DeviceClient initialised");
        c
    };

    info!("Network initialisation complete");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    loop {

        // Get cycle start time
        let cycle_start_instant = Instant::now();

        ds.cycle_start(NAV_CYCLE_DECIMATION);

        // ---- DEVICE LINK INPUT ----

        loop {
            match device_client.recv_msg() {
                Ok(Some(DevMsg::Telemetry(tm))) => {
                    trace!(
                        "Telemetry from {}: pose ({:.2}, {:.2}, {:.2}), battery {:.2} V",
                        tm.device, tm.pose.x, tm.pose.y, tm.pose.theta, tm.battery_v
                    );

                    ds.poses.update_from_telemetry(
                        &tm.device,
                        Pose {
                            position_m: Vector2::new(tm.pose.x, tm.pose.y),
                            heading_rad: wrap_to_pi(tm.pose.theta),
                        },
                    );
                    ds.battery_v.insert(tm.device.clone(), tm.battery_v);
                }
                Ok(Some(DevMsg::Roster(roster))) => {
                    info!("Device roster updated: {:?}", roster.devices);

                    if let Some(selected) = &ds.selected_device {
                        if !roster.devices.contains(selected) {
                            warn!("Selected device {} has left the roster", selected);
                        }
                    }

                    ds.devices = roster.devices;
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("DeviceClient receive error: {}", e);
                    break;
                }
            }
        }

        // Track connectivity. Emissions while down are skipped and the
        // autonomous loops abort, local state is kept for resumption.
        let was_connected = ds.link_connected;
        ds.link_connected = device_client.is_connected();

        if was_connected && !ds.link_connected {
            error!("Connection to the device relay lost");
            ds.nav.cancel();
        }

        // ---- OPERATOR INTENT PROCESSING ----

        loop {
            match ui_server.receive_cmd() {
                Ok(Some(cmd)) => {
                    debug!("Intent received: {:?}", cmd);

                    let response = intent_processor::exec(&mut ds, &cmd);

                    if let Err(e) = ui_server.send_response(response) {
                        warn!("Could not respond to intent: {}", e);
                    }
                }
                Ok(None) => break,
                // The Invalid response has already been sent, move on to the
                // next pending intent
                Err(UiServerError::CmdParseError(e)) => {
                    warn!("Could not parse received intent: {}", e);
                }
                Err(e) => {
                    warn!("UiServer error: {}", e);
                    break;
                }
            }
        }

        // ---- CONTROL ALGORITHM PROCESSING ----

        let now = Instant::now();
        let pose = ds.current_pose();
        let can_emit = ds.link_connected && ds.selected_device.is_some();

        let mut out_cmd: Option<DevCmd> = None;

        if ds.replayer.is_replaying() {
            match ds.replayer.step(ds.history.entries(), now, can_emit) {
                ReplayOutput::Emit(cmd) => out_cmd = Some(DevCmd::Movement(cmd)),
                ReplayOutput::Finished => {
                    info!("Return to origin complete");
                    ds.history.clear();
                    out_cmd = Some(DevCmd::Stop);
                }
                ReplayOutput::Aborted => (),
                ReplayOutput::None => (),
            }
        }
        else {
            match ds.mode {
                Mode::Manual => {
                    let input = bounded_input::InputData {
                        intent: ds.move_intent,
                        pose,
                        speed_scale: ds.speed_scale,
                        half_span_m: ds.board.half_span_m(),
                    };

                    let bounded = match ds.bounded_input.proc(&input) {
                        Ok((o, r)) => {
                            ds.bounded_input_report = r;
                            o.bounded
                        }
                        Err(e) => {
                            warn!("Error during BoundedInput processing: {}", e);
                            Vector2::new(0.0, 0.0)
                        }
                    };

                    let gesture = ds.rot_gesture.take();
                    let rotation = match ds.heading_ctrl.proc(&heading_ctrl::InputData {
                        gesture,
                        heading_rad: pose.heading_rad,
                    }) {
                        Ok((o, r)) => {
                            ds.heading_ctrl_report = r;
                            o.rotation
                        }
                        Err(e) => {
                            warn!("Error during HeadingCtrl processing: {}", e);
                            0.0
                        }
                    };

                    // The speed profile scales the translation demand, the
                    // rotation demand is already error-proportional
                    let cmd = MotionCmd {
                        x: bounded.x * ds.speed_scale,
                        y: bounded.y * ds.speed_scale,
                        rotation,
                    }
                    .clamped();

                    if can_emit {
                        if let Some(entry) = ds.history.observe(&cmd, now) {
                            if let Err(e) = arch_history.serialise(&entry) {
                                warn!("Could not archive history entry: {}", e);
                            }
                        }

                        out_cmd = Some(DevCmd::Movement(cmd));
                    }
                }

                Mode::Auto | Mode::ReturnHome => {
                    if ds.is_nav_cycle && ds.nav.is_active() {
                        match ds.nav.step(&pose) {
                            NavOutput::Cmd(cmd) => {
                                if can_emit {
                                    out_cmd = Some(DevCmd::Movement(cmd));
                                }
                            }
                            NavOutput::Arrived => {
                                // Hand control back to the operator, the
                                // transition queues the stop command
                                ds.set_mode(Mode::Manual);
                            }
                            NavOutput::None => (),
                        }
                    }
                }
            }
        }

        // ---- COMMAND EMISSION ----

        // Stops queued by mode changes, device switches, and the emergency
        // stop go out first
        let stops: Vec<String> = ds.pending_stops.drain(..).collect();
        for device in stops {
            if !ds.link_connected {
                trace!("Link down, stop for {} dropped", device);
                continue;
            }

            match device_client.send_cmd(&device, &DevCmd::Stop) {
                Ok(_) => {
                    trace!("Stop sent to {}", device);

                    if ds.selected_device.as_deref() == Some(device.as_str()) {
                        ds.emitted_cmd = Some(MotionCmd::zero());
                    }
                }
                Err(e) => warn!("Could not stop {}: {}", device, e),
            }
        }

        if let Some(cmd) = out_cmd {
            if let Some(device) = ds.selected_device.clone() {
                match device_client.send_cmd(&device, &cmd) {
                    Ok(_) => {
                        match cmd {
                            DevCmd::Movement(m) => {
                                ds.emitted_cmd = Some(m);

                                if let Err(e) = arch_cmds.serialise(CmdArchiveRecord {
                                    time_s: ds.elapsed_s,
                                    device: device.clone(),
                                    x: m.x,
                                    y: m.y,
                                    rotation: m.rotation,
                                }) {
                                    warn!("Could not archive command: {}", e);
                                }
                            }
                            DevCmd::Stop => ds.emitted_cmd = Some(MotionCmd::zero()),
                        }
                    }
                    Err(e) => warn!("Could not send command to {}: {}", device, e),
                }
            }
        }

        // ---- DEAD-RECKONING INTEGRATION ----

        // The robot keeps executing its held command between emissions, so
        // the estimate integrates every cycle, not just on change
        if ds.link_connected {
            if let (Some(cmd), Some(device)) = (ds.emitted_cmd, ds.selected_device.clone()) {
                ds.poses.integrate_command(
                    &device,
                    &cmd,
                    ds.params.max_speed_ms,
                    ds.params.max_turn_rate_rads,
                    CYCLE_PERIOD_S,
                );
            }
        }

        // ---- DISPLAY PROJECTION ----

        match ui_server.publish(&ds) {
            Ok(_) => (),
            Err(e) => warn!("UiServer publish error: {}", e),
        };

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match Duration::from_secs_f64(CYCLE_PERIOD_S)
            .checked_sub(cycle_dur)
        {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            },
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64()
                        - Duration::from_secs_f64(CYCLE_PERIOD_S).as_secs_f64()
                );
                ds.num_consec_cycle_overruns += 1;
            }
        }

        // Increment cycle counter
        ds.num_cycles += 1;
    }
}
