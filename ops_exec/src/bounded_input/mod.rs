//! Bounded input control module
//!
//! Takes the operator's raw movement intent and scales it down so that,
//! integrated over one control tick, the robot cannot cross the arena
//! boundary.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during BoundedInput operation.
#[derive(Debug, thiserror::Error)]
pub enum BoundedInputError {
    #[error("Input intent vector is not finite: ({0}, {1})")]
    NonFiniteIntent(f64, f64),

    #[error("Input pose is not finite")]
    NonFinitePose,
}
