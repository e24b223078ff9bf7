//! # Device command and telemetry module
//!
//! Defines the payloads exchanged between the console and the robots: the
//! normalised motion command sent out once per control tick, and the telemetry
//! and roster messages received back.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// The normalised body-frame control signal sent to a robot.
///
/// Each component is in [-1, +1]: `x` is the lateral axis, `y` the forward
/// axis, and `rotation` the turn rate about the robot's vertical axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionCmd {
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
}

/// A telemetry packet received from a robot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceTm {
    /// Roster name of the robot which produced this packet.
    pub device: String,

    /// The robot's reported pose in the world frame.
    pub pose: PoseTm,

    /// Battery voltage in volts.
    pub battery_v: f64,

    /// Time at which the packet was produced, if the robot stamps it.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Pose as reported by robot telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseTm {
    /// Position east of the arena origin in metres.
    pub x: f64,

    /// Position north of the arena origin in metres.
    pub y: f64,

    /// Heading in radians, anticlockwise from the world X+ axis.
    pub theta: f64,
}

/// The roster of robots currently registered with the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRoster {
    pub devices: Vec<String>,
}

// ------------------------------------------------------------------------------------------------
// ENUMERATIONS
// ------------------------------------------------------------------------------------------------

/// A command sent to a robot.
///
/// The serialised form is a tagged JSON object, for example
/// `{"type": "movement", "data": {"x": 0.0, "y": 1.0, "rotation": 0.0}}` or
/// `{"type": "stop"}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum DevCmd {
    /// Normalised motion demand, re-emitted once per control tick.
    Movement(MotionCmd),

    /// Bring the robot to a full stop. Carries no payload.
    Stop,
}

/// A message received from the device side of the link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum DevMsg {
    /// Telemetry from a single robot.
    Telemetry(DeviceTm),

    /// Updated roster of registered robots.
    Roster(DeviceRoster),
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum DevMsgParseError {
    #[error("Device message contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MotionCmd {
    /// A command with all components zeroed.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Get the command with every component negated.
    ///
    /// Used by history replay to retrace a recorded segment.
    pub fn negated(&self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
            rotation: -self.rotation,
        }
    }

    /// Get the command with every component clamped into [-1, +1].
    pub fn clamped(&self) -> Self {
        Self {
            x: self.x.clamp(-1.0, 1.0),
            y: self.y.clamp(-1.0, 1.0),
            rotation: self.rotation.clamp(-1.0, 1.0),
        }
    }

    /// True if any component differs from `other` by more than `tol`.
    pub fn differs_from(&self, other: &Self, tol: f64) -> bool {
        (self.x - other.x).abs() > tol
            || (self.y - other.y).abs() > tol
            || (self.rotation - other.rotation).abs() > tol
    }

    /// True if every component is within `tol` of zero.
    pub fn is_zero(&self, tol: f64) -> bool {
        !self.differs_from(&Self::zero(), tol)
    }
}

impl DevMsg {
    /// Parse a new device message from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, DevMsgParseError> {
        serde_json::from_str(json_str).map_err(DevMsgParseError::InvalidJson)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_dev_cmd_json() {
        let cmd = DevCmd::Movement(MotionCmd { x: 0.25, y: -0.5, rotation: 0.0 });
        let json = serde_json::to_string(&cmd).unwrap();
        assert_eq!(
            json,
            r#"{"type":"movement","data":{"x":0.25,"y":-0.5,"rotation":0.0}}"#
        );

        let stop = serde_json::to_string(&DevCmd::Stop).unwrap();
        assert_eq!(stop, r#"{"type":"stop"}"#);
    }

    #[test]
    fn test_dev_msg_parse() {
        let msg = DevMsg::from_json(
            r#"{"type": "telemetry", "data": {
                "device": "RoboMesha-1",
                "pose": {"x": 1.0, "y": -0.5, "theta": 0.1},
                "battery_v": 11.4
            }}"#
        ).unwrap();

        match msg {
            DevMsg::Telemetry(tm) => {
                assert_eq!(tm.device, "RoboMesha-1");
                assert_eq!(tm.pose.theta, 0.1);
                assert!(tm.timestamp.is_none());
            }
            _ => panic!("expected telemetry")
        }

        let msg = DevMsg::from_json(
            r#"{"type": "roster", "data": {"devices": ["a", "b"]}}"#
        ).unwrap();
        assert_eq!(
            msg,
            DevMsg::Roster(DeviceRoster { devices: vec!["a".into(), "b".into()] })
        );
    }

    #[test]
    fn test_motion_cmd_helpers() {
        let cmd = MotionCmd { x: 1.0, y: -0.5, rotation: 0.25 };
        assert_eq!(cmd.negated().negated(), cmd);
        assert!(cmd.differs_from(&MotionCmd::zero(), 0.01));
        assert!(!cmd.differs_from(&cmd, 0.01));
        assert!(MotionCmd { x: 0.005, y: 0.0, rotation: 0.0 }.is_zero(0.01));

        let big = MotionCmd { x: 2.0, y: -3.0, rotation: 0.5 }.clamped();
        assert_eq!(big, MotionCmd { x: 1.0, y: -1.0, rotation: 0.5 });
    }
}
