//! Host platform utility functions

use std::path::PathBuf;

/// Name of the environment variable pointing at the software root directory.
pub const SW_ROOT_ENV_VAR: &str = "IMAGEBOT_SW_ROOT";

/// Get the software root directory from the `IMAGEBOT_SW_ROOT` environment
/// variable.
///
/// The root contains the `params` directory and is the default parent of
/// the `sessions` directory.
pub fn get_sw_root() -> Result<PathBuf, std::env::VarError> {
    std::env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}
