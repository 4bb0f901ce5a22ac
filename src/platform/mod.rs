// Platform abstraction
// Provides platform-specific paths and process spawning for Windows,
// macOS, and Linux.
//
// Uses `cfg(target_os)` for conditional compilation to select the correct
// platform-specific implementation at compile time.

use std::path::PathBuf;
use std::process::Command;

use tracing::{debug, warn};

use crate::types::errors::SpawnError;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "windows")]
mod windows;

/// Returns the platform-specific configuration directory.
///
/// - **Linux**: `~/.config/deskbrowser` (or `$XDG_CONFIG_HOME/deskbrowser`)
/// - **macOS**: `~/Library/Application Support/DeskBrowser`
/// - **Windows**: `%APPDATA%/DeskBrowser`
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::get_config_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_config_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_config_dir()
    }
}

/// Returns the platform-specific cache directory, used as the engine's
/// profile/cache root.
///
/// - **Linux**: `~/.cache/deskbrowser` (or `$XDG_CACHE_HOME/deskbrowser`)
/// - **macOS**: `~/Library/Caches/DeskBrowser`
/// - **Windows**: `%LOCALAPPDATA%/DeskBrowser/cache`
pub fn get_cache_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::get_cache_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_cache_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_cache_dir()
    }
}

/// Cache directory for a spawned sibling process. Each top-level process
/// gets its own suffix so engine profiles never collide.
pub fn cache_dir_with_suffix(suffix: &str) -> PathBuf {
    if suffix.is_empty() {
        get_cache_dir()
    } else {
        get_cache_dir().join(sanitize_cache_suffix(suffix))
    }
}

/// Restrict a cache suffix to `[0-9A-Za-z_-]`, replacing anything else.
pub fn sanitize_cache_suffix(suffix: &str) -> String {
    suffix
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Start a new top-level process of this executable with a start URL.
///
/// Fire-and-forget: there is no return channel to the spawning process.
/// The child gets its own cache suffix derived from our pid.
pub fn spawn_new_top_level(url: &str) -> Result<(), SpawnError> {
    let exe = std::env::current_exe()
        .map_err(|e| SpawnError::MissingExecutable(e.to_string()))?;
    debug!(exe = %exe.display(), url = %url, "spawning new top-level window");
    let child = Command::new(&exe)
        .arg(format!("--open-url={}", url))
        .arg(format!("--cache-suffix={}", std::process::id()))
        .spawn()
        .map_err(|e| SpawnError::LaunchFailed(e.to_string()))?;
    debug!(pid = child.id(), "new top-level window spawned");
    Ok(())
}

/// Convenience wrapper that logs instead of propagating; navigation to a
/// new window degrades to a no-op when the spawn fails.
pub fn spawn_new_top_level_or_warn(url: &str) {
    if let Err(e) = spawn_new_top_level(url) {
        warn!(url = %url, error = %e, "spawn_new_top_level failed");
    }
}
