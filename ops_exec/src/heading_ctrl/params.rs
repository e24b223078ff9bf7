//! Parameters structure for HeadingCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for Heading control.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {

    /// Rotation gestures shorter than this are treated as a release and
    /// clear the target heading.
    pub gesture_deadband: f64,

    /// Angular errors smaller than this count as arrival, at which point the
    /// target is cleared.
    ///
    /// Units: radians
    pub arrival_tol_rad: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            gesture_deadband: 0.1,
            arrival_tol_rad: 0.02,
        }
    }
}
