// Platform paths for Linux
// Config: ~/.config/deskbrowser
// Cache:  ~/.cache/deskbrowser

use std::env;
use std::path::PathBuf;

/// Returns the configuration directory on Linux.
/// Uses `$XDG_CONFIG_HOME/deskbrowser` if set, otherwise `~/.config/deskbrowser`.
pub fn get_config_dir() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg).join("deskbrowser")
    } else {
        let home = env::var("HOME").unwrap_or_else(|_| String::from("/tmp"));
        PathBuf::from(home).join(".config").join("deskbrowser")
    }
}

/// Returns the cache directory on Linux.
/// Uses `$XDG_CACHE_HOME/deskbrowser` if set, otherwise `~/.cache/deskbrowser`.
pub fn get_cache_dir() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("deskbrowser")
    } else {
        let home = env::var("HOME").unwrap_or_else(|_| String::from("/tmp"));
        PathBuf::from(home).join(".cache").join("deskbrowser")
    }
}
