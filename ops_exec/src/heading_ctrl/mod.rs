//! Heading control module
//!
//! Converts the operator's rotation gesture into a target heading, then on
//! every control tick computes a bounded turn-rate command that drives the
//! current heading towards the target using the shortest angular error.

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

/// Possible errors that can occur during HeadingCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum HeadingCtrlError {
    #[error("Input heading is not finite")]
    NonFiniteHeading,
}
