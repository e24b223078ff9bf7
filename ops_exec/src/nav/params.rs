//! Parameters structure for the Navigator

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for autonomous navigation.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {

    /// Cap on the world-frame speed demanded while navigating. The demand is
    /// proportional to the remaining distance below this cap.
    ///
    /// Units: meters/second
    pub cap_speed_ms: f64,

    /// Maximum linear speed of the robot at full command deflection, used to
    /// normalise the body-frame velocity into a command.
    ///
    /// Units: meters/second
    pub max_speed_ms: f64,

    /// Distance below which the target is considered reached.
    ///
    /// Units: meters
    pub arrival_tol_m: f64,

    /// Heading error below which a heading-aligned target is considered
    /// reached.
    ///
    /// Units: radians
    pub heading_tol_rad: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            cap_speed_ms: 0.3,
            max_speed_ms: 0.5,
            arrival_tol_m: 0.05,
            heading_tol_rad: 0.05,
        }
    }
}
