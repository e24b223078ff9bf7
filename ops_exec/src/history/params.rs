//! Parameters structure for the history module

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for history recording.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {

    /// Most recent entries kept, the oldest are discarded first.
    pub capacity: usize,

    /// A command is committed as a new segment when any component moves by
    /// more than this since the previous segment.
    pub change_tol: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            capacity: 2000,
            change_tol: 0.01,
        }
    }
}
