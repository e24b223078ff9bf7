//! # Localisation module
//!
//! This module tracks the last known pose of each robot on the roster. Poses
//! come from two sources: telemetry, which is authoritative whenever the robot
//! reports it, and dead-reckoning integration of the commands the console has
//! emitted, used for robots which never report a pose.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use std::collections::HashMap;

// Internal
use comms_if::dev::MotionCmd;
use util::maths::wrap_to_pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The pose (position and heading in the world frame) of a robot.
///
/// Heading is measured anticlockwise from the world X+ axis and kept in the
/// range (-pi, pi]. The robot body frame has X lateral (starboard) and Y
/// forward along the heading.
#[derive(Debug, Copy, Clone, Default)]
pub struct Pose {

    /// The position in the world frame.
    ///
    /// Units: meters
    pub position_m: Vector2<f64>,

    /// The heading in the world frame.
    ///
    /// Units: radians
    pub heading_rad: f64,
}

/// Store of the last known pose of each robot.
#[derive(Debug, Default)]
pub struct PoseStore {
    entries: HashMap<String, PoseEntry>,
}

#[derive(Debug, Clone, Copy)]
struct PoseEntry {
    pose: Pose,

    /// True once telemetry has been received for this robot, after which
    /// command integration stops touching the stored pose.
    telemetry_seen: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {

    /// Rotate a body-frame vector into the world frame using this pose's
    /// heading.
    pub fn body_to_world(&self, v_body: Vector2<f64>) -> Vector2<f64> {
        let (sin_h, cos_h) = self.heading_rad.sin_cos();

        Vector2::new(
            v_body.y * cos_h + v_body.x * sin_h,
            v_body.y * sin_h - v_body.x * cos_h,
        )
    }

    /// Rotate a world-frame vector into the body frame using this pose's
    /// heading.
    pub fn world_to_body(&self, v_world: Vector2<f64>) -> Vector2<f64> {
        let (sin_h, cos_h) = self.heading_rad.sin_cos();

        Vector2::new(
            v_world.x * sin_h - v_world.y * cos_h,
            v_world.x * cos_h + v_world.y * sin_h,
        )
    }
}

impl PoseStore {

    /// Overwrite the stored pose for `device` with a telemetry-reported pose.
    ///
    /// Telemetry is authoritative, it always replaces whatever estimate is
    /// currently stored.
    pub fn update_from_telemetry(&mut self, device: &str, pose: Pose) {
        self.entries.insert(
            device.to_string(),
            PoseEntry {
                pose,
                telemetry_seen: true,
            },
        );
    }

    /// Get the last known pose of `device`.
    ///
    /// Before any telemetry or command integration has occured this is the
    /// origin with zero heading.
    pub fn current_pose(&self, device: &str) -> Pose {
        match self.entries.get(device) {
            Some(e) => e.pose,
            None => Pose::default(),
        }
    }

    /// True if telemetry has ever been received for `device`.
    pub fn has_telemetry(&self, device: &str) -> bool {
        match self.entries.get(device) {
            Some(e) => e.telemetry_seen,
            None => false,
        }
    }

    /// Integrate an emitted command into the pose estimate for `device`.
    ///
    /// This is the dead-reckoning fallback for robots which do not report a
    /// pose. Once telemetry has been seen for the device this function leaves
    /// the stored pose untouched.
    pub fn integrate_command(
        &mut self,
        device: &str,
        cmd: &MotionCmd,
        max_speed_ms: f64,
        max_turn_rate_rads: f64,
        dt_s: f64,
    ) {
        let entry = self
            .entries
            .entry(device.to_string())
            .or_insert(PoseEntry {
                pose: Pose::default(),
                telemetry_seen: false,
            });

        if entry.telemetry_seen {
            return;
        }

        let v_body = Vector2::new(cmd.x * max_speed_ms, cmd.y * max_speed_ms);
        let v_world = entry.pose.body_to_world(v_body);

        entry.pose.position_m += v_world * dt_s;
        entry.pose.heading_rad = wrap_to_pi(
            entry.pose.heading_rad + cmd.rotation * max_turn_rate_rads * dt_s,
        );
    }

    /// Reset the pose estimate for `device` back to the origin.
    ///
    /// The telemetry flag is also cleared so that command integration resumes
    /// until fresh telemetry arrives.
    pub fn reset(&mut self, device: &str) {
        self.entries.insert(
            device.to_string(),
            PoseEntry {
                pose: Pose::default(),
                telemetry_seen: false,
            },
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_pose_is_origin() {
        let store = PoseStore::default();
        let pose = store.current_pose("mesha");
        assert_eq!(pose.position_m, Vector2::new(0.0, 0.0));
        assert_eq!(pose.heading_rad, 0.0);
        assert!(!store.has_telemetry("mesha"));
    }

    #[test]
    fn test_telemetry_is_authoritative() {
        let mut store = PoseStore::default();

        store.integrate_command(
            "mesha",
            &MotionCmd { x: 0.0, y: 1.0, rotation: 0.0 },
            0.5,
            2.0,
            1.0,
        );
        assert!(store.current_pose("mesha").position_m.x > 0.0);

        let reported = Pose {
            position_m: Vector2::new(1.0, -1.0),
            heading_rad: 0.5,
        };
        store.update_from_telemetry("mesha", reported);
        assert_eq!(store.current_pose("mesha").position_m, reported.position_m);

        // Integration must no longer move the pose
        store.integrate_command(
            "mesha",
            &MotionCmd { x: 1.0, y: 1.0, rotation: 1.0 },
            0.5,
            2.0,
            1.0,
        );
        assert_eq!(store.current_pose("mesha").position_m, reported.position_m);
        assert_eq!(store.current_pose("mesha").heading_rad, 0.5);
    }

    #[test]
    fn test_integration_moves_along_heading() {
        let mut store = PoseStore::default();

        // Full forward command at heading zero moves along world X+
        store.integrate_command(
            "mesha",
            &MotionCmd { x: 0.0, y: 1.0, rotation: 0.0 },
            0.5,
            2.0,
            2.0,
        );
        let pose = store.current_pose("mesha");
        assert!((pose.position_m.x - 1.0).abs() < 1e-9);
        assert!(pose.position_m.y.abs() < 1e-9);
    }

    #[test]
    fn test_frame_rotations_are_inverse() {
        let pose = Pose {
            position_m: Vector2::new(0.0, 0.0),
            heading_rad: 0.7,
        };

        let v = Vector2::new(0.3, -0.8);
        let round_trip = pose.world_to_body(pose.body_to_world(v));
        assert!((round_trip - v).norm() < 1e-12);

        // At heading zero, body forward is world X+
        let level = Pose::default();
        let fwd = level.body_to_world(Vector2::new(0.0, 1.0));
        assert!((fwd - Vector2::new(1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_reset_returns_to_origin() {
        let mut store = PoseStore::default();
        store.update_from_telemetry(
            "mesha",
            Pose {
                position_m: Vector2::new(2.0, 2.0),
                heading_rad: 1.0,
            },
        );

        store.reset("mesha");
        assert_eq!(store.current_pose("mesha").position_m, Vector2::new(0.0, 0.0));
        assert!(!store.has_telemetry("mesha"));
    }
}
