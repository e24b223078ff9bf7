//! # Operator console library.
//!
//! This library allows other crates in the workspace to access items defined inside the console
//! crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Board mapper - maps world coordinates onto the labelled cells of the arena and back
pub mod board;

/// Bounded input control module - scales operator intents so the robot stays inside the arena
pub mod bounded_input;

/// Global data store for the console executable
pub mod data_store;

/// Device link - sends commands to and receives telemetry from the robots
pub mod device_link;

/// Heading control module - drives the robot's heading towards the operator's rotation gesture
pub mod heading_ctrl;

/// History module - records manual command segments and replays them in reverse to retrace a path
pub mod history;

/// Localisation module - tracks the last known pose of each robot
pub mod loc;

/// Autonomous navigation module - drives the robot to a target point on the board
pub mod nav;

/// Console executable parameters
pub mod params;

/// UI server - receives operator intents and publishes the display projection
pub mod ui_server;
