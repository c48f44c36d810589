//! Shared helpers for the provisioning steps.

use std::path::Path;

use crate::error::{ProvisionError, Result};

/// Formats a duration in seconds into a human-readable string.
///
/// # Examples
///
/// ```ignore
/// use zshup::utils::format_duration;
///
/// assert_eq!(format_duration(3661), "1h 1m 1s");
/// assert_eq!(format_duration(61), "1m 1s");
/// assert_eq!(format_duration(30), "30s");
/// ```
pub fn format_duration(seconds: i64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    match (hours, minutes) {
        (0, 0) => format!("{}s", secs),
        (0, _) => format!("{}m {}s", minutes, secs),
        _ => format!("{}h {}m {}s", hours, minutes, secs),
    }
}

/// Move a file, falling back to copy + remove when a rename is not possible
/// (e.g. across filesystems).
pub fn move_file(from: &Path, to: &Path) -> Result<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }

    std::fs::copy(from, to).map_err(|e| ProvisionError::io(to, e))?;
    std::fs::remove_file(from).map_err(|e| ProvisionError::io(from, e))
}

/// Whether the current login shell already points at `target`.
///
/// `/bin/zsh` and `/usr/bin/zsh` count as the same shell.
pub fn is_same_shell(current: &str, target: &Path) -> bool {
    let current = Path::new(current);
    current == target || (current.file_name().is_some() && current.file_name() == target.file_name())
}
