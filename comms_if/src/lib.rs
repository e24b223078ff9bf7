//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the console software:
//! operator intents flowing in from the UI, command and telemetry payloads
//! exchanged with the robots, and the network layer underneath both.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Operator intent definitions (UI/CLI -> console)
pub mod ops;

/// Device command and telemetry definitions (console <-> robot)
pub mod dev;

/// Network module
pub mod net;
