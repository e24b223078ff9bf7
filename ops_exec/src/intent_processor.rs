//! # Intent processor module
//!
//! The intent processor handles operator intents coming from the UI or the
//! command line client, gatekeeping them against the active mode before they
//! reach the control modules.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, warn};
use nalgebra::Vector2;

// Internal
use comms_if::ops::{Mode, OpsCmd, OpsResponse};
use ops_lib::board;
use ops_lib::data_store::DataStore;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute an operator intent.
///
/// Mutates the datastore to route the intent to the responsible module, and
/// returns the response to be sent back to the UI.
pub(crate) fn exec(ds: &mut DataStore, cmd: &OpsCmd) -> OpsResponse {

    match cmd {
        OpsCmd::Movement { x, y } => {
            if !manual_input_allowed(ds) {
                return OpsResponse::CannotExecute;
            }

            ds.move_intent = Vector2::new(*x, *y);
            OpsResponse::Ok
        }

        OpsCmd::Rotation { x, y } => {
            if !manual_input_allowed(ds) {
                return OpsResponse::CannotExecute;
            }

            ds.rot_gesture = Some(Vector2::new(*x, *y));
            OpsResponse::Ok
        }

        OpsCmd::Direction { direction } => {
            if !manual_input_allowed(ds) {
                return OpsResponse::CannotExecute;
            }

            let (x, y) = direction.to_vector();
            ds.move_intent = Vector2::new(x, y);
            OpsResponse::Ok
        }

        OpsCmd::SetMode { mode } => {
            debug!("Received mode change request: {}", mode);
            ds.set_mode(*mode);
            OpsResponse::Ok
        }

        OpsCmd::SelectQuadrant { row, column } => {
            // Cell selection only drives navigation while in Auto
            if ds.mode != Mode::Auto {
                debug!("Quadrant selection ignored outside Auto mode");
                return OpsResponse::CannotExecute;
            }

            // Out-of-board indices are clamped onto the boundary cells
            let row = (*row).min(ds.board.cells_per_side - 1);
            let column = (*column).min(ds.board.cells_per_side - 1);

            let centre = match board::quadrant_centre(row, column, &ds.board) {
                Some(c) => c,
                None => return OpsResponse::CannotExecute,
            };

            debug!(
                "Quadrant {} selected as nav target",
                board::quadrant_label(row, column)
            );

            // Selecting a cell supersedes any run already in progress
            ds.nav.cancel();
            ds.nav.set_target(centre, false, &ds.board);
            OpsResponse::Ok
        }

        OpsCmd::SelectDevice { name } => {
            ds.select_device(name.clone());
            OpsResponse::Ok
        }

        OpsCmd::SetSpeed { scale } => {
            let clamped = scale
                .clamp(ds.params.min_speed_scale, ds.params.max_speed_scale);

            if (clamped - scale).abs() > f64::EPSILON {
                debug!("Speed scale {} clamped to {}", scale, clamped);
            }

            ds.speed_scale = clamped;
            OpsResponse::Ok
        }

        OpsCmd::ResetPose => {
            match ds.selected_device.clone() {
                Some(device) => {
                    ds.poses.reset(&device);
                    OpsResponse::Ok
                }
                None => OpsResponse::CannotExecute,
            }
        }

        OpsCmd::ReturnToOrigin => {
            if ds.replayer.is_replaying() {
                warn!("Already returning to origin");
                return OpsResponse::CannotExecute;
            }

            if !ds.link_connected || ds.selected_device.is_none() {
                warn!("Cannot return to origin without a connected device");
                return OpsResponse::CannotExecute;
            }

            // Replay only runs in manual mode, switch back first. Note that
            // leaving Auto or ReturnHome has already dropped the history, so
            // the start below will refuse.
            if ds.mode != Mode::Manual {
                ds.set_mode(Mode::Manual);
            }

            if !ds.replayer.start(ds.history.len()) {
                warn!("No history to retrace");
                return OpsResponse::CannotExecute;
            }

            OpsResponse::Ok
        }

        OpsCmd::StopAll => {
            ds.stop_all();
            OpsResponse::Ok
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Joystick and button intents only pass while driving manually and no
/// replay is blocking the inputs.
fn manual_input_allowed(ds: &DataStore) -> bool {
    if ds.replayer.is_replaying() {
        debug!("Manual input ignored while returning to origin");
        return false;
    }

    if ds.mode != Mode::Manual {
        debug!("Manual input ignored in {} mode", ds.mode);
        return false;
    }

    true
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::dev::MotionCmd;
    use comms_if::ops::Direction;
    use std::time::{Duration, Instant};

    fn store() -> DataStore {
        let mut ds = DataStore::default();
        ds.devices = vec!["mesha".to_string()];
        ds.selected_device = Some("mesha".to_string());
        ds.link_connected = true;
        ds.speed_scale = ds.params.default_speed_scale;
        ds
    }

    #[test]
    fn test_movement_held_in_manual() {
        let mut ds = store();

        let resp = exec(&mut ds, &OpsCmd::Movement { x: 0.3, y: -0.7 });
        assert_eq!(resp, OpsResponse::Ok);
        assert_eq!(ds.move_intent, Vector2::new(0.3, -0.7));
    }

    #[test]
    fn test_movement_rejected_in_auto() {
        let mut ds = store();
        ds.set_mode(Mode::Auto);

        let resp = exec(&mut ds, &OpsCmd::Movement { x: 1.0, y: 0.0 });
        assert_eq!(resp, OpsResponse::CannotExecute);
        assert_eq!(ds.move_intent, Vector2::new(0.0, 0.0));
    }

    #[test]
    fn test_direction_maps_to_vector() {
        let mut ds = store();

        exec(&mut ds, &OpsCmd::Direction { direction: Direction::ForwardLeft });
        assert_eq!(ds.move_intent, Vector2::new(-1.0, 1.0));
    }

    #[test]
    fn test_quadrant_selection_only_in_auto() {
        let mut ds = store();

        let resp = exec(&mut ds, &OpsCmd::SelectQuadrant { row: 0, column: 0 });
        assert_eq!(resp, OpsResponse::CannotExecute);
        assert!(!ds.nav.is_active());

        ds.set_mode(Mode::Auto);
        let resp = exec(&mut ds, &OpsCmd::SelectQuadrant { row: 0, column: 0 });
        assert_eq!(resp, OpsResponse::Ok);

        // A1 centre
        let target = ds.nav.target().unwrap();
        assert!((target.position_m - Vector2::new(-2.75, -2.75)).norm() < 1e-9);
        assert!(!target.align_heading);
    }

    #[test]
    fn test_out_of_board_quadrant_clamped() {
        let mut ds = store();
        ds.set_mode(Mode::Auto);

        let resp = exec(&mut ds, &OpsCmd::SelectQuadrant { row: 99, column: 99 });
        assert_eq!(resp, OpsResponse::Ok);

        // Clamped to the north-east corner cell
        let target = ds.nav.target().unwrap();
        assert!((target.position_m - Vector2::new(2.75, 2.75)).norm() < 1e-9);
    }

    #[test]
    fn test_speed_scale_clamped() {
        let mut ds = store();

        exec(&mut ds, &OpsCmd::SetSpeed { scale: 5.0 });
        assert_eq!(ds.speed_scale, ds.params.max_speed_scale);

        exec(&mut ds, &OpsCmd::SetSpeed { scale: 0.0 });
        assert_eq!(ds.speed_scale, ds.params.min_speed_scale);

        exec(&mut ds, &OpsCmd::SetSpeed { scale: 0.4 });
        assert_eq!(ds.speed_scale, 0.4);
    }

    #[test]
    fn test_return_preconditions() {
        let mut ds = store();

        // No history yet
        let resp = exec(&mut ds, &OpsCmd::ReturnToOrigin);
        assert_eq!(resp, OpsResponse::CannotExecute);

        // Record a segment
        let now = Instant::now();
        ds.history
            .observe(&MotionCmd { x: 1.0, y: 0.0, rotation: 0.0 }, now);
        ds.history
            .observe(&MotionCmd::zero(), now + Duration::from_millis(100));

        // Disconnected
        ds.link_connected = false;
        let resp = exec(&mut ds, &OpsCmd::ReturnToOrigin);
        assert_eq!(resp, OpsResponse::CannotExecute);

        // Connected, manual: starts
        ds.link_connected = true;
        let resp = exec(&mut ds, &OpsCmd::ReturnToOrigin);
        assert_eq!(resp, OpsResponse::Ok);
        assert!(ds.replayer.is_replaying());

        // Manual input is blocked while returning
        let resp = exec(&mut ds, &OpsCmd::Movement { x: 1.0, y: 0.0 });
        assert_eq!(resp, OpsResponse::CannotExecute);

        // A second return is refused
        let resp = exec(&mut ds, &OpsCmd::ReturnToOrigin);
        assert_eq!(resp, OpsResponse::CannotExecute);
    }

    #[test]
    fn test_stop_all_zeroes_everything() {
        let mut ds = store();

        exec(&mut ds, &OpsCmd::Movement { x: 1.0, y: 1.0 });
        ds.set_mode(Mode::Auto);
        exec(&mut ds, &OpsCmd::SelectQuadrant { row: 3, column: 3 });
        assert!(ds.nav.is_active());

        let resp = exec(&mut ds, &OpsCmd::StopAll);
        assert_eq!(resp, OpsResponse::Ok);
        assert!(!ds.nav.is_active());
        assert_eq!(ds.move_intent, Vector2::new(0.0, 0.0));
    }

    #[test]
    fn test_mode_round_trip_leaves_intents_zero() {
        let mut ds = store();

        exec(&mut ds, &OpsCmd::Movement { x: 0.8, y: 0.2 });
        exec(&mut ds, &OpsCmd::SetMode { mode: Mode::Auto });
        exec(&mut ds, &OpsCmd::SetMode { mode: Mode::Manual });

        assert_eq!(ds.move_intent, Vector2::new(0.0, 0.0));
        assert!(ds.rot_gesture.is_none());
        assert!(!ds.heading_ctrl.target_set());
    }
}
