// Platform paths for macOS
// Config: ~/Library/Application Support/DeskBrowser
// Cache:  ~/Library/Caches/DeskBrowser

use std::env;
use std::path::PathBuf;

/// Returns the home directory on macOS.
fn home_dir() -> PathBuf {
    PathBuf::from(env::var("HOME").unwrap_or_else(|_| String::from("/tmp")))
}

/// Returns the configuration directory on macOS.
/// `~/Library/Application Support/DeskBrowser`
pub fn get_config_dir() -> PathBuf {
    home_dir()
        .join("Library")
        .join("Application Support")
        .join("DeskBrowser")
}

/// Returns the cache directory on macOS.
/// `~/Library/Caches/DeskBrowser`
pub fn get_cache_dir() -> PathBuf {
    home_dir().join("Library").join("Caches").join("DeskBrowser")
}
