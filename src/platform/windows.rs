// Platform paths for Windows
// Config: %APPDATA%/DeskBrowser
// Cache:  %LOCALAPPDATA%/DeskBrowser/cache

use std::env;
use std::path::PathBuf;

/// Returns the configuration directory on Windows.
/// `%APPDATA%/DeskBrowser`
pub fn get_config_dir() -> PathBuf {
    let appdata =
        env::var("APPDATA").unwrap_or_else(|_| String::from("C:\\Users\\Default\\AppData\\Roaming"));
    PathBuf::from(appdata).join("DeskBrowser")
}

/// Returns the cache directory on Windows.
/// `%LOCALAPPDATA%/DeskBrowser/cache`
pub fn get_cache_dir() -> PathBuf {
    let local_appdata = env::var("LOCALAPPDATA")
        .unwrap_or_else(|_| String::from("C:\\Users\\Default\\AppData\\Local"));
    PathBuf::from(local_appdata)
        .join("DeskBrowser")
        .join("cache")
}
