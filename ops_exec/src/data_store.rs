//! # Data Store

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, warn};
use nalgebra::Vector2;

// Internal
use crate::{
    board,
    bounded_input,
    heading_ctrl,
    history::{HistoryRecorder, Replayer},
    loc::{Pose, PoseStore},
    nav::Navigator,
    params::OpsExecParams,
};
use comms_if::dev::MotionCmd;
use comms_if::ops::Mode;
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the console executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// True if the autonomous navigator should be stepped on this cycle
    pub is_nav_cycle: bool,

    /// Session elapsed time
    pub elapsed_s: f64,

    // Executable parameters
    pub params: OpsExecParams,

    // Mode management
    /// The active control mode.
    pub mode: Mode,

    // Device management
    /// Roster of robots registered with the relay.
    pub devices: Vec<String>,

    /// The robot currently being controlled, if any.
    pub selected_device: Option<String>,

    /// True while the device link is up.
    pub link_connected: bool,

    /// Last reported battery voltage per robot.
    pub battery_v: HashMap<String, f64>,

    // Localisation
    pub poses: PoseStore,

    // Board
    pub board: board::Params,

    // Operator inputs
    /// The held movement intent, re-applied every cycle until changed.
    pub move_intent: Vector2<f64>,

    /// A rotation gesture received this cycle, consumed by HeadingCtrl.
    pub rot_gesture: Option<Vector2<f64>>,

    /// The operator's speed profile scale.
    pub speed_scale: f64,

    // Control modules
    pub bounded_input: bounded_input::BoundedInput,
    pub bounded_input_report: bounded_input::StatusReport,
    pub heading_ctrl: heading_ctrl::HeadingCtrl,
    pub heading_ctrl_report: heading_ctrl::StatusReport,
    pub nav: Navigator,
    pub history: HistoryRecorder,
    pub replayer: Replayer,

    // Emission management
    /// Robots which must be sent a stop command this cycle.
    pub pending_stops: Vec<String>,

    /// The most recently emitted motion command.
    pub emitted_cmd: Option<MotionCmd>,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {

    /// Perform actions required at the start of a cycle.
    pub fn cycle_start(&mut self, nav_cycle_decimation: u128) {
        self.is_nav_cycle = self.num_cycles % nav_cycle_decimation == 0;
        self.elapsed_s = util::session::get_elapsed_seconds();
    }

    /// Switch to a new control mode.
    ///
    /// Entering any mode cancels autonomous navigation and replay, zeroes the
    /// held intents, clears any target heading, and queues an immediate stop
    /// for the selected robot. Entering ReturnHome additionally targets the
    /// origin with heading alignment.
    pub fn set_mode(&mut self, new_mode: Mode) {
        info!("Mode change: {} -> {}", self.mode, new_mode);

        self.nav.cancel();
        self.replayer.cancel();
        self.clear_intents();

        // A path recorded in manual mode is no longer retraceable once the
        // robot has moved autonomously
        if self.mode == Mode::Manual && new_mode != Mode::Manual {
            self.history.clear();
        }

        self.mode = new_mode;

        if let Some(device) = &self.selected_device {
            self.pending_stops.push(device.clone());
        }

        if new_mode == Mode::ReturnHome {
            self.nav
                .set_target(Vector2::new(0.0, 0.0), true, &self.board);
        }
    }

    /// Switch control to a different robot.
    ///
    /// The previous robot is queued a stop, and all per-robot control state
    /// (navigation, replay, history, intents) is dropped.
    pub fn select_device(&mut self, name: String) {
        if self.selected_device.as_deref() == Some(name.as_str()) {
            return;
        }

        if !self.devices.iter().any(|d| d == &name) {
            warn!("Selected device {} is not on the roster", name);
        }

        if let Some(old) = self.selected_device.take() {
            self.pending_stops.push(old);
        }

        // The stop queued above supersedes the one a cancel would imply, so
        // the navigator is cancelled without queueing another
        self.nav.cancel();
        self.replayer.cancel();
        self.history.clear();
        self.clear_intents();

        // The held command belonged to the previous robot
        self.emitted_cmd = None;

        info!("Controlling device: {}", name);
        self.selected_device = Some(name);
    }

    /// Emergency stop: zero every output and cancel all autonomous activity.
    ///
    /// History is preserved, a return-to-origin can still follow the stop.
    pub fn stop_all(&mut self) {
        warn!("Emergency stop triggered");

        self.nav.cancel();
        self.replayer.cancel();
        self.clear_intents();

        if let Some(device) = &self.selected_device {
            self.pending_stops.push(device.clone());
        }
    }

    /// The last known pose of the selected robot, or the origin when no
    /// robot is selected.
    pub fn current_pose(&self) -> Pose {
        match &self.selected_device {
            Some(device) => self.poses.current_pose(device),
            None => Pose::default(),
        }
    }

    fn clear_intents(&mut self) {
        self.move_intent = Vector2::new(0.0, 0.0);
        self.rot_gesture = None;
        self.heading_ctrl.clear_target();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn store() -> DataStore {
        let mut ds = DataStore::default();
        ds.devices = vec!["mesha".to_string()];
        ds.selected_device = Some("mesha".to_string());
        ds.link_connected = true;
        ds
    }

    #[test]
    fn test_mode_change_resets_intents() {
        let mut ds = store();

        ds.move_intent = Vector2::new(0.5, 0.5);
        ds.set_mode(Mode::Auto);
        assert_eq!(ds.move_intent, Vector2::new(0.0, 0.0));

        ds.set_mode(Mode::Manual);
        assert_eq!(ds.move_intent, Vector2::new(0.0, 0.0));
        assert_eq!(ds.mode, Mode::Manual);

        // Each transition queued a stop for the selected robot
        assert_eq!(ds.pending_stops.len(), 2);
    }

    #[test]
    fn test_leaving_manual_clears_history() {
        let mut ds = store();

        let now = std::time::Instant::now();
        ds.history
            .observe(&MotionCmd { x: 1.0, y: 0.0, rotation: 0.0 }, now);
        ds.history.observe(
            &MotionCmd::zero(),
            now + std::time::Duration::from_millis(100),
        );
        assert!(!ds.history.is_empty());

        ds.set_mode(Mode::Auto);
        assert!(ds.history.is_empty());
    }

    #[test]
    fn test_return_home_targets_origin() {
        let mut ds = store();

        ds.set_mode(Mode::ReturnHome);

        let target = ds.nav.target().expect("no nav target set");
        assert_eq!(target.position_m, Vector2::new(0.0, 0.0));
        assert!(target.align_heading);
    }

    #[test]
    fn test_device_switch_stops_old_device() {
        let mut ds = store();
        ds.devices.push("mesha-2".to_string());

        ds.select_device("mesha-2".to_string());

        assert_eq!(ds.selected_device.as_deref(), Some("mesha-2"));
        assert_eq!(ds.pending_stops, vec!["mesha".to_string()]);

        // Re-selecting the same device is a no-op
        ds.pending_stops.clear();
        ds.select_device("mesha-2".to_string());
        assert!(ds.pending_stops.is_empty());
    }

    #[test]
    fn test_emergency_stop_preserves_history() {
        let mut ds = store();

        let now = std::time::Instant::now();
        ds.history
            .observe(&MotionCmd { x: 1.0, y: 0.0, rotation: 0.0 }, now);
        ds.history.observe(
            &MotionCmd::zero(),
            now + std::time::Duration::from_millis(100),
        );

        ds.move_intent = Vector2::new(1.0, 0.0);
        ds.stop_all();

        assert_eq!(ds.move_intent, Vector2::new(0.0, 0.0));
        assert!(!ds.history.is_empty());
        assert_eq!(ds.pending_stops, vec!["mesha".to_string()]);
    }
}
