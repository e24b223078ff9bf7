//! # Operator intent module
//!
//! This module defines the discrete intents produced by the operator's UI (or
//! the command line client) and consumed by the console core. Intents carry no
//! rendering information, they are the boundary between presentation and the
//! motion control core.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use serde::{Serialize, Deserialize};
use structopt::StructOpt;
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// ENUMERATIONS
// ------------------------------------------------------------------------------------------------

/// An intent sent to the console by the operator.
///
/// The serialised form is a tagged JSON object, for example
/// `{"type": "movement", "data": {"x": 0.5, "y": 1.0}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, StructOpt)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
#[structopt(global_setting = structopt::clap::AppSettings::AllowNegativeNumbers)]
pub enum OpsCmd {
    /// A continuous 2D movement vector from the joystick, each axis in
    /// [-1, +1]. Held until superseded, a zero vector releases the stick.
    #[structopt(name = "move")]
    Movement {
        x: f64,
        y: f64
    },

    /// A continuous 2D rotation gesture vector from the rotation joystick.
    ///
    /// Below the console's deadband this clears the target heading.
    #[structopt(name = "rot")]
    Rotation {
        x: f64,
        y: f64
    },

    /// A discrete direction button press, mapped by the console onto one of
    /// the 8 movement vectors.
    #[structopt(name = "dir")]
    Direction {
        direction: Direction
    },

    /// Request a control mode change.
    #[structopt(name = "mode")]
    SetMode {
        mode: Mode
    },

    /// Select a destination cell on the board, row and column are 0-based.
    /// Only honoured in [`Mode::Auto`].
    #[structopt(name = "quad")]
    SelectQuadrant {
        row: usize,
        column: usize
    },

    /// Select the robot to be controlled, by roster name.
    #[structopt(name = "device")]
    SelectDevice {
        name: String
    },

    /// Set the speed profile scale, clamped by the console to [0.1, 0.9].
    #[structopt(name = "speed")]
    SetSpeed {
        scale: f64
    },

    /// Reset the selected robot's pose estimate to the origin.
    #[structopt(name = "reset-pose")]
    ResetPose,

    /// Retrace the recorded movement history back to the origin.
    #[structopt(name = "return")]
    ReturnToOrigin,

    /// Emergency stop: zero all outputs and cancel any autonomous activity.
    #[structopt(name = "stop")]
    StopAll,
}

/// Control modes of the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Joystick and button intents drive the robot directly.
    Manual,

    /// The robot navigates itself to a selected board cell.
    Auto,

    /// The robot navigates to the origin and aligns its heading with zero.
    ReturnHome,
}

/// Discrete direction button names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
    ForwardLeft,
    ForwardRight,
    BackwardLeft,
    BackwardRight,
}

/// Response returned to the UI for each intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpsResponse {
    /// The intent was accepted.
    Ok,

    /// The intent was valid but cannot be executed in the current state, for
    /// example a joystick vector while in Auto mode.
    CannotExecute,

    /// The intent could not be parsed.
    Invalid,
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum OpsCmdParseError {
    #[error("Intent contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl OpsCmd {

    /// Parse a new intent from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, OpsCmdParseError> {
        serde_json::from_str(json_str).map_err(OpsCmdParseError::InvalidJson)
    }

    /// Serialise the intent into a JSON packet
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl Direction {
    /// Get the movement vector associated with this direction.
    ///
    /// Diagonals drive both axes at full deflection, matching the behaviour of
    /// holding two direction buttons at once.
    pub fn to_vector(&self) -> (f64, f64) {
        match self {
            Direction::Forward => (0.0, 1.0),
            Direction::Backward => (0.0, -1.0),
            Direction::Left => (-1.0, 0.0),
            Direction::Right => (1.0, 0.0),
            Direction::ForwardLeft => (-1.0, 1.0),
            Direction::ForwardRight => (1.0, 1.0),
            Direction::BackwardLeft => (-1.0, -1.0),
            Direction::BackwardRight => (1.0, -1.0),
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forward" | "fwd" => Ok(Direction::Forward),
            "backward" | "back" => Ok(Direction::Backward),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            "forward_left" => Ok(Direction::ForwardLeft),
            "forward_right" => Ok(Direction::ForwardRight),
            "backward_left" => Ok(Direction::BackwardLeft),
            "backward_right" => Ok(Direction::BackwardRight),
            _ => Err(format!("{} is not a recognised direction", s))
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Mode::Manual),
            "auto" => Ok(Mode::Auto),
            "return_home" | "home" => Ok(Mode::ReturnHome),
            _ => Err(format!("{} is not a recognised mode", s))
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Manual => write!(f, "Manual"),
            Mode::Auto => write!(f, "Auto"),
            Mode::ReturnHome => write!(f, "ReturnHome"),
        }
    }
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Manual
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_intent_json_round_trip() {
        let cmd = OpsCmd::Movement { x: 0.5, y: -1.0 };
        let json = cmd.to_json().unwrap();
        assert_eq!(OpsCmd::from_json(&json).unwrap(), cmd);

        let cmd = OpsCmd::StopAll;
        let json = cmd.to_json().unwrap();
        assert_eq!(json, r#"{"type":"stop_all"}"#);
        assert_eq!(OpsCmd::from_json(&json).unwrap(), cmd);
    }

    #[test]
    fn test_intent_from_ui_payload() {
        let cmd = OpsCmd::from_json(
            r#"{"type": "select_quadrant", "data": {"row": 3, "column": 11}}"#
        ).unwrap();
        assert_eq!(cmd, OpsCmd::SelectQuadrant { row: 3, column: 11 });

        assert!(OpsCmd::from_json("not json").is_err());
    }
}
