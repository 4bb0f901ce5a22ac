use std::fmt;

// === EngineError ===

/// Errors reported by the embedded engine adapter.
#[derive(Debug)]
pub enum EngineError {
    /// The engine failed to construct an instance for a surface.
    CreateFailed(String),
    /// The host surface has no usable native window handle.
    SurfaceUnavailable(String),
    /// A devtools session could not be opened for this attempt.
    DevToolsUnavailable(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::CreateFailed(msg) => write!(f, "Engine instance creation failed: {}", msg),
            EngineError::SurfaceUnavailable(msg) => {
                write!(f, "Host surface unavailable: {}", msg)
            }
            EngineError::DevToolsUnavailable(msg) => {
                write!(f, "DevTools unavailable: {}", msg)
            }
        }
    }
}

impl std::error::Error for EngineError {}

// === SpawnError ===

/// Errors related to spawning a new top-level browser process.
#[derive(Debug)]
pub enum SpawnError {
    /// The current executable path could not be determined.
    MissingExecutable(String),
    /// The OS refused to launch the process.
    LaunchFailed(String),
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpawnError::MissingExecutable(msg) => {
                write!(f, "Missing executable path: {}", msg)
            }
            SpawnError::LaunchFailed(msg) => write!(f, "Process launch failed: {}", msg),
        }
    }
}

impl std::error::Error for SpawnError {}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing settings.
    IoError(String),
    /// Failed to serialize or deserialize settings.
    SerializationError(String),
    /// The provided settings key is invalid.
    InvalidKey(String),
    /// The provided settings value is invalid.
    InvalidValue(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::IoError(msg) => write!(f, "Settings I/O error: {}", msg),
            SettingsError::SerializationError(msg) => {
                write!(f, "Settings serialization error: {}", msg)
            }
            SettingsError::InvalidKey(key) => write!(f, "Invalid settings key: {}", key),
            SettingsError::InvalidValue(msg) => {
                write!(f, "Invalid settings value: {}", msg)
            }
        }
    }
}

impl std::error::Error for SettingsError {}
