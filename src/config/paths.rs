//! Home-directory expansion for configured paths.

use std::path::PathBuf;

/// Expand a leading `~` or `~/` to the current user's home directory.
///
/// Anything else (including `~user/...`) is returned unchanged, as is the
/// whole path when no home directory can be resolved.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(home) = dirs::home_dir() {
        if path == "~" {
            return home;
        }
        if let Some(rest) = path.strip_prefix("~/") {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
