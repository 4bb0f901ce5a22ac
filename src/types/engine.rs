//! Protocol types shared between the shell core and the engine adapter.
//!
//! The engine reports activity through the single tagged [`EngineEvent`]
//! enum rather than a wide optional-callback interface, and every deferred
//! wait in the core is a [`DeferredTask`] value handed to the task
//! scheduler.

use serde::{Deserialize, Serialize};

use super::tab::TabId;

/// Opaque native window handle (X11 window id, HWND, NSView pointer).
pub type NativeHandle = u64;

/// A rectangle in surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn of_size(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// A point in surface coordinates, e.g. where an inspect was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// How the engine classified a requested navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Unknown,
    CurrentTab,
    SingletonTab,
    SwitchToTab,
    NewForegroundTab,
    NewBackgroundTab,
    NewPopup,
    NewWindow,
    NewPictureInPicture,
    SaveToDisk,
    OffTheRecord,
    IgnoreAction,
}

impl Disposition {
    /// Stable name used in log output.
    pub fn name(&self) -> &'static str {
        match self {
            Disposition::Unknown => "UNKNOWN",
            Disposition::CurrentTab => "CURRENT_TAB",
            Disposition::SingletonTab => "SINGLETON_TAB",
            Disposition::SwitchToTab => "SWITCH_TO_TAB",
            Disposition::NewForegroundTab => "NEW_FOREGROUND_TAB",
            Disposition::NewBackgroundTab => "NEW_BACKGROUND_TAB",
            Disposition::NewPopup => "NEW_POPUP",
            Disposition::NewWindow => "NEW_WINDOW",
            Disposition::NewPictureInPicture => "NEW_PICTURE_IN_PICTURE",
            Disposition::SaveToDisk => "SAVE_TO_DISK",
            Disposition::OffTheRecord => "OFF_THE_RECORD",
            Disposition::IgnoreAction => "IGNORE_ACTION",
        }
    }
}

/// Window features the page requested for a popup. Fields are `None` when
/// the page left them unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct PopupFeatures {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub is_popup: bool,
}

/// Reply payload of the theme-color protocol (content process -> host).
///
/// `source` is one of `"meta"`, `"html"`, `"body"` or `"fallback"`; `raw`
/// is the CSS value the probe picked; `ready_state` mirrors the document's
/// `readyState` at probe time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeColorReply {
    pub r: i32,
    pub g: i32,
    pub b: i32,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub raw: String,
    #[serde(default, rename = "readyState")]
    pub ready_state: String,
}

/// All engine callbacks, flattened into one dispatchable event per tab.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// The main frame started loading `url`.
    LoadStart { tab: TabId, url: String },
    /// The main frame finished loading.
    LoadEnd { tab: TabId },
    /// Loading state or history availability changed.
    LoadingStateChange {
        tab: TabId,
        loading: bool,
        can_go_back: bool,
        can_go_forward: bool,
    },
    /// The main frame's address changed (commit, redirect, fragment).
    AddressChange { tab: TabId, url: String },
    /// The document title changed.
    TitleChange { tab: TabId, title: String },
    /// The engine published status text (link hover etc.).
    StatusMessage { tab: TabId, text: String },
    /// The page advertised a favicon URL.
    FaviconUrlChange { tab: TabId, url: String },
    /// A favicon download finished with raw image bytes.
    ImageDownloaded { tab: TabId, data: Vec<u8> },
    /// The engine intends to navigate away from the current context.
    OpenUrl {
        tab: TabId,
        url: String,
        disposition: Disposition,
        user_gesture: bool,
    },
    /// The engine is about to open a popup window.
    BeforePopup {
        tab: TabId,
        url: String,
        disposition: Disposition,
        features: PopupFeatures,
        user_gesture: bool,
    },
    /// The content process answered a theme-color request.
    ThemeColorReply { tab: TabId, reply: ThemeColorReply },
    /// The tab's engine instance finished closing.
    InstanceClosed { tab: TabId },
    /// The tab's devtools instance finished closing.
    DevToolsClosed { tab: TabId },
}

/// Deferred callbacks. Each one re-validates its target tab against the
/// registry before touching any state, so destroying a tab implicitly
/// cancels its pending tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredTask {
    /// Creation-scheduler poll for an unbound tab.
    PollCreation(TabId),
    /// DevTools-session poll for a pending devtools surface.
    PollDevTools(TabId),
    /// Re-send a theme-color request after a retry delay.
    RequestThemeColor(TabId),
    /// Drain the engine's internal work queue. Process-wide, re-arms itself.
    PumpEngine,
}
