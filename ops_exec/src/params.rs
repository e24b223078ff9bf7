//! Parameters structure for the console executable

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the console executable.
#[derive(Debug, Clone, Deserialize)]
pub struct OpsExecParams {

    // ---- ROBOT CAPABILITIES ----

    /// Maximum linear speed of the robot at full command deflection.
    ///
    /// Units: meters/second
    pub max_speed_ms: f64,

    /// Maximum turn rate of the robot at full rotation command.
    ///
    /// Units: radians/second
    pub max_turn_rate_rads: f64,

    // ---- SPEED PROFILE ----

    /// Speed profile scale applied at startup.
    pub default_speed_scale: f64,

    /// Lowest speed profile scale the operator may select.
    pub min_speed_scale: f64,

    /// Highest speed profile scale the operator may select.
    pub max_speed_scale: f64,
}

impl Default for OpsExecParams {
    fn default() -> Self {
        Self {
            max_speed_ms: 0.5,
            max_turn_rate_rads: 2.0,
            default_speed_scale: 0.5,
            min_speed_scale: 0.1,
            max_speed_scale: 0.9,
        }
    }
}
