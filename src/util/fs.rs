//! Preparation of destination directories.

use std::fs::DirBuilder;
use std::os::unix::fs::DirBuilderExt;
use std::path::Path;

/// Permission bits used for created directories unless configured otherwise.
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// Create `dir` and all missing ancestors with permission `mode`.
///
/// Existing directories are left untouched. Returns whether `dir` exists as
/// a directory after the call.
pub fn prepare_dir(dir: &Path, mode: u32) -> bool {
    if dir.is_dir() {
        return true;
    }

    log::debug!(target: "prepare", "Creating directory {} (mode {mode:o})", dir.display());
    if let Err(e) = DirBuilder::new().recursive(true).mode(mode).create(dir) {
        log::warn!(target: "prepare", "Creating directory {} failed: {e}", dir.display());
    }

    dir.is_dir()
}

/// Parse an octal permission string such as `0750` or `750`.
pub fn parse_mode(mode: &str) -> Option<u32> {
    let mode = mode.trim();
    let digits = mode.strip_prefix("0o").unwrap_or(mode);
    u32::from_str_radix(digits, 8).ok().filter(|m| *m <= 0o7777)
}
