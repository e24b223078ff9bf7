//! Parameters structure for BoundedInput

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for Bounded input control.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {

    /// The lookahead interval over which a command is integrated when
    /// checking it against the boundary.
    ///
    /// Units: seconds
    pub lookahead_dt_s: f64,

    /// Maximum linear speed of the robot at full command deflection.
    ///
    /// Units: meters/second
    pub max_speed_ms: f64,

    /// Velocities smaller than this contribute no boundary constraint on
    /// their axis.
    ///
    /// Units: meters/second
    pub min_constraint_speed_ms: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            lookahead_dt_s: 0.15,
            max_speed_ms: 0.5,
            min_constraint_speed_ms: 1e-6,
        }
    }
}
