//! Navigation routing — decides, for every requested navigation, whether
//! it loads in place, opens a tab, spawns a new top-level process, or is
//! left to the engine's native handling.
//!
//! [`route`] is a pure function over its inputs so the same decision table
//! serves the asynchronous event dispatch and the synchronous popup
//! callbacks of the engine adapter.

use tracing::debug;

use crate::types::engine::{Disposition, PopupFeatures};

/// Largest window the engine may keep as a chrome-less popup. Anything
/// bigger is treated as a tab request.
pub const MAX_POPUP_WIDTH: i32 = 640;
pub const MAX_POPUP_HEIGHT: i32 = 480;

/// Which engine callback produced the navigation request. Empty URLs are
/// suppressed for popup-style calls but left to the default handling for
/// open-URL calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOrigin {
    OpenUrl,
    Popup,
}

/// Outcome of the routing decision table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Let the engine's native handling proceed (devtools URLs, genuine
    /// popups).
    DeferToEngine,
    /// Suppress the engine default; no navigation side effect.
    Handled,
    /// Load `url` in the selected tab, selecting and focusing it; when no
    /// tab is selected the caller opens a new selected tab instead.
    LoadInCurrent { url: String },
    /// Open a new tab with `url`.
    OpenTab { url: String, select: bool },
    /// Start a new top-level process with `url` as its start argument.
    SpawnWindow { url: String },
}

/// Decision table, evaluated in order. `user_gesture` is informational
/// only and never changes the outcome.
pub fn route(
    url: &str,
    disposition: Disposition,
    features: Option<&PopupFeatures>,
    user_gesture: bool,
    origin: NavigationOrigin,
) -> RouteDecision {
    debug!(
        url = %url,
        disposition = disposition.name(),
        user_gesture,
        ?origin,
        "routing navigation"
    );

    if url.is_empty() {
        return match origin {
            NavigationOrigin::Popup => RouteDecision::Handled,
            NavigationOrigin::OpenUrl => RouteDecision::DeferToEngine,
        };
    }

    if is_devtools_url(url) {
        debug!(url = %url, "devtools url allowed through");
        return RouteDecision::DeferToEngine;
    }

    let url = normalize_url(url);
    if url.is_empty() {
        return RouteDecision::Handled;
    }

    if let Some(features) = features {
        if is_genuine_popup(features) {
            debug!(url = %url, "deferring small popup to engine");
            return RouteDecision::DeferToEngine;
        }
    }

    match disposition {
        Disposition::CurrentTab | Disposition::SwitchToTab | Disposition::SingletonTab => {
            RouteDecision::LoadInCurrent { url }
        }
        Disposition::NewForegroundTab | Disposition::NewPopup => RouteDecision::OpenTab {
            url,
            select: true,
        },
        Disposition::NewBackgroundTab => RouteDecision::OpenTab {
            url,
            select: false,
        },
        Disposition::NewWindow | Disposition::OffTheRecord => {
            RouteDecision::SpawnWindow { url }
        }
        _ => RouteDecision::Handled,
    }
}

/// A popup stays a popup when the page says so explicitly, or when both
/// dimensions are set and small enough for chrome-less presentation.
fn is_genuine_popup(features: &PopupFeatures) -> bool {
    if features.is_popup {
        return true;
    }
    match (features.width, features.height) {
        (Some(w), Some(h)) => {
            w > 0 && w <= MAX_POPUP_WIDTH && h > 0 && h <= MAX_POPUP_HEIGHT
        }
        _ => false,
    }
}

/// Schemes considered complete as-is; no `https://` is prepended.
const COMPLETE_SCHEMES: &[&str] = &[
    "about",
    "chrome",
    "chrome-devtools",
    "devtools",
    "data",
    "file",
    "view-source",
    "javascript",
    "mailto",
];

/// Normalize user- or page-supplied input into a loadable URL.
///
/// Input without a scheme gets `https://` prepended. Inputs using one of
/// the allow-listed schemes, or carrying `://` after their scheme prefix,
/// pass through unmodified. Empty input normalizes to empty.
pub fn normalize_url(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }
    let mut has_scheme = false;
    if let Some(colon) = input.find(':') {
        if colon > 0 {
            let prefix = input[..colon].to_ascii_lowercase();
            if COMPLETE_SCHEMES.contains(&prefix.as_str()) {
                has_scheme = true;
            } else if input[colon..].starts_with("://") {
                has_scheme = true;
            }
        }
    }
    if has_scheme {
        input.to_string()
    } else {
        format!("https://{}", input)
    }
}

/// The engine's own inspection pages bypass routing entirely.
pub fn is_devtools_url(url: &str) -> bool {
    url.starts_with("chrome-devtools://") || url.starts_with("devtools://")
}

/// Classification of engine-supplied context-menu commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommandKind {
    InspectElement,
    OpenLinkNewTab,
    OpenLinkNewWindow,
}

/// Classify a localized context-menu label.
///
/// Fallback heuristic: the engine does not expose stable command ids for
/// its built-in items, so labels are matched by substring after stripping
/// accelerator markers and lowercasing. Brittle against localization and
/// engine upgrades; callers should prefer a stable capability id whenever
/// the engine offers one.
pub fn classify_menu_label(label: &str) -> Option<MenuCommandKind> {
    let simplified = simplify_label(label);
    if simplified.contains("inspect")
        || simplified.contains("developer tools")
        || simplified.contains("devtools")
    {
        return Some(MenuCommandKind::InspectElement);
    }
    if simplified.contains("open link in new tab") {
        return Some(MenuCommandKind::OpenLinkNewTab);
    }
    if simplified.contains("open link in new window") {
        return Some(MenuCommandKind::OpenLinkNewWindow);
    }
    None
}

/// Strip accelerator markers (e.g. "I&nspect") and lowercase.
fn simplify_label(label: &str) -> String {
    label
        .chars()
        .filter(|&c| c != '&')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
