use serde::{Deserialize, Serialize};

/// Top-level browser settings container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BrowserSettings {
    pub general: GeneralSettings,
    pub engine: EngineSettings,
    pub theme: ThemeSettings,
}

/// General browser settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralSettings {
    /// URL loaded by the Home action. Empty means use `default_url`.
    pub homepage: String,
    /// Initial navigation target for tabs created without a URL.
    pub default_url: String,
    /// Reopen the previous session's tabs on startup.
    pub restore_last_session: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            homepage: String::new(),
            default_url: "https://www.wikipedia.org".to_string(),
            restore_last_session: true,
        }
    }
}

/// Engine binding and work-pump timing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineSettings {
    /// Delay between creation-scheduler polls of an unready surface.
    pub creation_poll_interval_ms: u64,
    /// Cadence of the process-wide engine work pump.
    pub pump_interval_ms: u64,
    /// Zoom levels are re-read from the engine every Nth pump tick.
    pub zoom_poll_ticks: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            creation_poll_interval_ms: 20,
            pump_interval_ms: 10,
            zoom_poll_ticks: 20,
        }
    }
}

/// Theme-color negotiation limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThemeSettings {
    /// Retries allowed after a fallback-looking reply.
    pub retry_limit: u32,
    /// Retries allowed while the document is not yet ready.
    pub ready_retry_limit: u32,
    /// Delay before re-sending a theme-color request.
    pub retry_delay_ms: u64,
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self {
            retry_limit: 10,
            ready_retry_limit: 10,
            retry_delay_ms: 250,
        }
    }
}
