//! Host environment utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::env;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Environment variable pointing at the root of the console software tree.
///
/// The `params` and `sessions` directories are resolved relative to this root.
pub const CONSOLE_ROOT_ENV_VAR: &str = "MESHA_CONSOLE_ROOT";

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the root directory of the console software tree.
///
/// The root is read from the `MESHA_CONSOLE_ROOT` environment variable, which
/// must be set before any executable is run.
pub fn get_console_root() -> Result<PathBuf, env::VarError> {
    Ok(PathBuf::from(env::var(CONSOLE_ROOT_ENV_VAR)?))
}
