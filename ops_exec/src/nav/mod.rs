//! # Autonomous navigation module
//!
//! The [`Navigator`] drives the robot to a target point on the board. While a
//! target is set the navigator is stepped on a fixed cadence: each step
//! computes a world-frame velocity proportional to the remaining distance,
//! rotates it into the robot body frame, and emits a bounded command, until
//! the robot is within tolerance of the target. Targets may additionally
//! require the heading to be aligned with zero before arrival is declared,
//! which is used when returning home.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use log::{debug, info};
use nalgebra::Vector2;
use std::f64::consts::PI;

// Internal
use crate::board;
use crate::loc::Pose;
use comms_if::dev::MotionCmd;
pub use params::Params;
use util::maths::wrap_to_pi;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Autonomous navigator.
#[derive(Debug, Default)]
pub struct Navigator {
    pub(crate) params: Params,

    target: Option<NavTarget>,
}

/// A point-to-point navigation target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavTarget {
    /// The world-frame point to drive to.
    ///
    /// Units: meters
    pub position_m: Vector2<f64>,

    /// If true arrival additionally requires the heading to be within
    /// tolerance of zero.
    pub align_heading: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Result of stepping the navigator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NavOutput {
    /// No target is set, nothing to do.
    None,

    /// A command to be emitted this tick.
    Cmd(MotionCmd),

    /// The target has been reached and cleared. The caller is expected to
    /// stop the robot and return control to the operator.
    Arrived,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Navigator {

    /// Initialise the navigator from its parameter file.
    pub fn init(&mut self, params_path: &str) -> Result<(), util::params::LoadError> {
        self.params = util::params::load(params_path)?;

        Ok(())
    }

    /// Set a new navigation target, cancelling any previous one.
    ///
    /// Points outside the board are clamped onto its boundary, never
    /// rejected.
    pub fn set_target(
        &mut self,
        point_m: Vector2<f64>,
        align_heading: bool,
        board_params: &board::Params,
    ) {
        let clamped = board::clamp_to_board(point_m, board_params);

        if clamped != point_m {
            debug!(
                "Nav target ({:.2}, {:.2}) outside the board, clamped to ({:.2}, {:.2})",
                point_m.x, point_m.y, clamped.x, clamped.y
            );
        }

        info!(
            "Nav target set: ({:.2}, {:.2}), align_heading: {}",
            clamped.x, clamped.y, align_heading
        );

        self.target = Some(NavTarget {
            position_m: clamped,
            align_heading,
        });
    }

    /// Cancel any active navigation.
    ///
    /// Idempotent, safe to call when no target is set.
    pub fn cancel(&mut self) {
        if self.target.take().is_some() {
            info!("Nav cancelled");
        }
    }

    /// True while a target is set.
    pub fn is_active(&self) -> bool {
        self.target.is_some()
    }

    /// The current target, if any.
    pub fn target(&self) -> Option<&NavTarget> {
        self.target.as_ref()
    }

    /// Perform one navigation step against the current pose.
    ///
    /// Returns the command to emit this tick, or [`NavOutput::Arrived`] once
    /// the target is reached (at which point the target is cleared).
    pub fn step(&mut self, pose: &Pose) -> NavOutput {
        let target = match self.target {
            Some(t) => t,
            None => return NavOutput::None,
        };

        let delta_m = target.position_m - pose.position_m;
        let distance_m = delta_m.norm();

        if distance_m < self.params.arrival_tol_m {
            // Close enough in position. When heading alignment is required
            // keep turning on the spot until the heading is inside tolerance.
            let heading_err_rad = wrap_to_pi(-pose.heading_rad);

            if target.align_heading
                && heading_err_rad.abs() >= self.params.heading_tol_rad
            {
                let rotation = (heading_err_rad / PI).clamp(-1.0, 1.0);

                return NavOutput::Cmd(MotionCmd {
                    x: 0.0,
                    y: 0.0,
                    rotation,
                });
            }

            info!(
                "Nav arrived at ({:.2}, {:.2})",
                target.position_m.x, target.position_m.y
            );
            self.target = None;

            return NavOutput::Arrived;
        }

        // Speed proportional to the remaining distance, capped
        let speed_ms = f64::min(self.params.cap_speed_ms, distance_m);
        let vel_world = delta_m / distance_m * speed_ms;
        let vel_body = pose.world_to_body(vel_world);

        let cmd = MotionCmd {
            x: vel_body.x / self.params.max_speed_ms,
            y: vel_body.y / self.params.max_speed_ms,
            rotation: 0.0,
        }
        .clamped();

        NavOutput::Cmd(cmd)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn navigator() -> (Navigator, board::Params) {
        let mut nav = Navigator::default();
        nav.params = Params::default();
        (nav, board::Params::default())
    }

    #[test]
    fn test_no_target_is_none() {
        let (mut nav, _) = navigator();
        assert_eq!(nav.step(&Pose::default()), NavOutput::None);
        assert!(!nav.is_active());
    }

    #[test]
    fn test_drives_towards_target() {
        let (mut nav, board_params) = navigator();

        nav.set_target(Vector2::new(1.0, 0.0), false, &board_params);

        // Robot at the origin facing the target: expect a pure forward
        // command
        let cmd = match nav.step(&Pose::default()) {
            NavOutput::Cmd(c) => c,
            o => panic!("expected a command, got {:?}", o),
        };

        assert!(cmd.y > 0.0);
        assert!(cmd.x.abs() < 1e-9);
        assert_eq!(cmd.rotation, 0.0);

        // Speed demand is the cap over max speed at this distance
        assert!((cmd.y - 0.3 / 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_speed_proportional_close_in() {
        let (mut nav, board_params) = navigator();

        nav.set_target(Vector2::new(0.1, 0.0), false, &board_params);

        let cmd = match nav.step(&Pose::default()) {
            NavOutput::Cmd(c) => c,
            o => panic!("expected a command, got {:?}", o),
        };

        // 0.1 m remaining is below the cap, demand shrinks with distance
        assert!((cmd.y - 0.1 / 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_command_accounts_for_heading() {
        let (mut nav, board_params) = navigator();

        nav.set_target(Vector2::new(1.0, 0.0), false, &board_params);

        // Facing north (pi/2) with the target due east: the body-frame
        // command is pure starboard translation
        let pose = Pose {
            position_m: Vector2::new(0.0, 0.0),
            heading_rad: PI / 2.0,
        };

        let cmd = match nav.step(&pose) {
            NavOutput::Cmd(c) => c,
            o => panic!("expected a command, got {:?}", o),
        };

        assert!(cmd.x > 0.0);
        assert!(cmd.y.abs() < 1e-9);
    }

    #[test]
    fn test_arrival_clears_target() {
        let (mut nav, board_params) = navigator();

        nav.set_target(Vector2::new(0.0, 0.0), false, &board_params);

        let pose = Pose {
            position_m: Vector2::new(0.01, 0.02),
            heading_rad: 0.1,
        };

        assert_eq!(nav.step(&pose), NavOutput::Arrived);
        assert!(!nav.is_active());
    }

    #[test]
    fn test_heading_alignment_before_arrival() {
        let (mut nav, board_params) = navigator();

        nav.set_target(Vector2::new(0.0, 0.0), true, &board_params);

        // Within the position tolerance but heading 0.1 rad off: a pure
        // rotation command is expected
        let pose = Pose {
            position_m: Vector2::new(0.01, 0.02),
            heading_rad: 0.1,
        };

        let cmd = match nav.step(&pose) {
            NavOutput::Cmd(c) => c,
            o => panic!("expected a rotation command, got {:?}", o),
        };

        assert_eq!(cmd.x, 0.0);
        assert_eq!(cmd.y, 0.0);
        assert!(cmd.rotation < 0.0);

        // Once the heading closes, arrival is declared
        let aligned = Pose {
            position_m: Vector2::new(0.01, 0.02),
            heading_rad: 0.01,
        };
        assert_eq!(nav.step(&aligned), NavOutput::Arrived);
        assert!(!nav.is_active());
    }

    #[test]
    fn test_out_of_board_target_clamped() {
        let (mut nav, board_params) = navigator();

        nav.set_target(Vector2::new(10.0, -10.0), false, &board_params);

        let target = nav.target().unwrap();
        assert_eq!(target.position_m, Vector2::new(3.0, -3.0));
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let (mut nav, board_params) = navigator();

        nav.set_target(Vector2::new(1.0, 1.0), false, &board_params);
        nav.cancel();
        assert!(!nav.is_active());

        // Second cancel must be safe
        nav.cancel();
        assert!(!nav.is_active());
    }
}
