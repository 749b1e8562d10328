//! Host platform utility functions

use std::path::PathBuf;

/// Environment variable which points at the root of the software tree.
///
/// Parameter files are looked up in `$AUTO_SW_ROOT/params` and sessions are
/// created under `$AUTO_SW_ROOT/<sessions_dir>`.
pub const SW_ROOT_ENV_VAR: &str = "AUTO_SW_ROOT";

/// Get the software root directory.
pub fn get_sw_root() -> Result<PathBuf, std::env::VarError> {
    std::env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}
