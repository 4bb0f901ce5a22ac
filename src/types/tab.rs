use std::fmt;
use std::rc::Rc;

use uuid::Uuid;

use crate::engine::{EngineInstance, HostSurface};
use crate::types::engine::Point;

/// Stable identity of a browsing context for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TabId(Uuid);

impl TabId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TabId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An estimated page background color, 0-255 per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThemeColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ThemeColor {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Security indicator derived from the confirmed URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecurityStatus {
    /// TLS-protected page.
    Secure,
    /// Internal or local content (about:, data:, file:, view-source:).
    LocalPage,
    /// Everything else, including plain http.
    #[default]
    Insecure,
}

impl SecurityStatus {
    pub fn from_url(url: &str) -> Self {
        if url.starts_with("https://") {
            SecurityStatus::Secure
        } else if url.starts_with("about:")
            || url.starts_with("data:")
            || url.starts_with("file:")
            || url.starts_with("view-source:")
            || url.starts_with("devtools:")
            || url.starts_with("chrome:")
        {
            SecurityStatus::LocalPage
        } else {
            SecurityStatus::Insecure
        }
    }
}

/// The lazily-created devtools sub-session of a tab.
///
/// The surface is owned by the UI layer; the engine instance is owned here
/// once the polling handshake binds it.
pub struct DevToolsPane {
    pub surface: Rc<dyn HostSurface>,
    pub instance: Option<Box<dyn EngineInstance>>,
    pub inspect_point: Point,
    pub show_scheduled: bool,
}

impl DevToolsPane {
    pub fn new(surface: Rc<dyn HostSurface>, inspect_point: Point) -> Self {
        Self {
            surface,
            instance: None,
            inspect_point,
            show_scheduled: false,
        }
    }
}

/// One browsing context: a host surface plus, once bound, the engine
/// instance rendering into it.
///
/// `surface` is owned by the UI layer and only referenced here. `instance`
/// is owned by the core; a tab binds at most one instance in its lifetime
/// (`bound_once` guards against rebinding).
pub struct Tab {
    pub id: TabId,
    pub surface: Rc<dyn HostSurface>,
    pub instance: Option<Box<dyn EngineInstance>>,
    /// Last URL requested for this tab.
    pub pending_url: String,
    /// URL last confirmed by the engine.
    pub current_url: String,
    pub can_go_back: bool,
    pub can_go_forward: bool,
    pub loading: bool,
    pub title: String,
    /// Tabs sharing a base title are numbered "Base (n)".
    pub base_title: String,
    pub status_message: String,
    pub zoom_level: f64,
    pub security: SecurityStatus,
    /// Host of the confirmed URL; favicon state resets when it changes.
    pub current_host: String,
    pub favicon_url: String,
    pub theme: ThemeColor,
    pub has_theme: bool,
    /// Retries after a plausible-but-fallback theme reply.
    pub theme_retry_count: u32,
    /// Retries while the document was not yet ready.
    pub theme_ready_retry_count: u32,
    pub devtools: Option<DevToolsPane>,
    pub creation_scheduled: bool,
    pub bound_once: bool,
}

impl Tab {
    pub fn new(surface: Rc<dyn HostSurface>, pending_url: String, base_title: &str, title: String) -> Self {
        let security = SecurityStatus::from_url(&pending_url);
        Self {
            id: TabId::new(),
            surface,
            instance: None,
            pending_url,
            current_url: String::new(),
            can_go_back: false,
            can_go_forward: false,
            loading: false,
            title,
            base_title: base_title.to_string(),
            status_message: String::new(),
            zoom_level: 0.0,
            security,
            current_host: String::new(),
            favicon_url: String::new(),
            theme: ThemeColor::default(),
            has_theme: false,
            theme_retry_count: 0,
            theme_ready_retry_count: 0,
            devtools: None,
            creation_scheduled: false,
            bound_once: false,
        }
    }

    /// Whether an engine instance is currently bound.
    pub fn is_bound(&self) -> bool {
        self.instance.is_some()
    }
}

/// Host component of a URL, used to detect cross-site navigations.
pub fn extract_host(url: &str) -> String {
    let rest = match url.find("://") {
        Some(idx) => &url[idx + 3..],
        None => return String::new(),
    };
    rest.split(['/', '?', '#'])
        .next()
        .unwrap_or("")
        .to_string()
}
