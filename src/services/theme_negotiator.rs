//! Theme-color negotiation — a bounded-retry request/reply protocol with
//! the content process that estimates a page's representative background
//! color.
//!
//! A single round trip cannot reliably observe a page that is still
//! applying styles, so two independent retry loops run: one while the
//! document is not ready, one while the answer still looks like the
//! white fallback.

use tracing::debug;

use crate::types::engine::ThemeColorReply;
use crate::types::settings::ThemeSettings;
use crate::types::tab::{Tab, ThemeColor};

/// The hex value the content probe reports when nothing else resolved.
pub const FALLBACK_WHITE_HEX: &str = "#ffffff";

/// How the host reacted to a theme-color reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeOutcome {
    /// Document not ready; stored theme untouched. `retry` is false once
    /// the ready-retry limit is exhausted.
    NotReady { retry: bool },
    /// Color clamped and stored. `retry` is true when the value looked
    /// like a fallback and another request is worth sending.
    Stored { retry: bool },
}

/// Per-process negotiator; all per-tab state lives on the [`Tab`].
pub struct ThemeColorNegotiator {
    retry_limit: u32,
    ready_retry_limit: u32,
    retry_delay_ms: u64,
}

impl ThemeColorNegotiator {
    pub fn new(settings: &ThemeSettings) -> Self {
        Self {
            retry_limit: settings.retry_limit,
            ready_retry_limit: settings.ready_retry_limit,
            retry_delay_ms: settings.retry_delay_ms,
        }
    }

    /// Delay before a re-sent request.
    pub fn retry_delay_ms(&self) -> u64 {
        self.retry_delay_ms
    }

    /// Send `request_theme_color` to the tab's content process. Silent
    /// no-op on an unbound tab.
    pub fn request(&self, tab: &mut Tab) {
        if let Some(instance) = tab.instance.as_mut() {
            debug!(tab = %tab.id, "requesting theme color");
            instance.request_theme_color();
        }
    }

    /// Apply one `theme_color_result` reply to the tab's state.
    ///
    /// Ready gating runs first and never touches the stored color. A ready
    /// reply is stored unconditionally; fallback detection then decides
    /// whether one more round trip might observe the real color.
    pub fn handle_reply(&self, tab: &mut Tab, reply: &ThemeColorReply) -> ThemeOutcome {
        if reply.ready_state != "complete" && reply.ready_state != "interactive" {
            tab.theme_ready_retry_count += 1;
            let retry = tab.theme_ready_retry_count < self.ready_retry_limit;
            debug!(
                tab = %tab.id,
                ready_state = %reply.ready_state,
                attempt = tab.theme_ready_retry_count,
                retry,
                "theme color reply before document ready"
            );
            return ThemeOutcome::NotReady { retry };
        }

        tab.theme = ThemeColor::new(
            clamp_channel(reply.r),
            clamp_channel(reply.g),
            clamp_channel(reply.b),
        );
        tab.has_theme = true;
        tab.theme_ready_retry_count = 0;

        if is_fallback_reply(reply) {
            tab.theme_retry_count += 1;
            let retry = tab.theme_retry_count < self.retry_limit;
            debug!(
                tab = %tab.id,
                source = %reply.source,
                raw = %reply.raw,
                attempt = tab.theme_retry_count,
                retry,
                "fallback theme color stored"
            );
            ThemeOutcome::Stored { retry }
        } else {
            tab.theme_retry_count = 0;
            debug!(
                tab = %tab.id,
                r = tab.theme.r,
                g = tab.theme.g,
                b = tab.theme.b,
                source = %reply.source,
                "theme color stored"
            );
            ThemeOutcome::Stored { retry: false }
        }
    }
}

/// A reply that probably did not observe the page's real color: no source,
/// the explicit fallback source, or the plain white default.
fn is_fallback_reply(reply: &ThemeColorReply) -> bool {
    reply.source.is_empty()
        || reply.source == "fallback"
        || reply.raw.is_empty()
        || reply.raw.eq_ignore_ascii_case(FALLBACK_WHITE_HEX)
}

fn clamp_channel(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

/// Foreground that stays readable on `background`: black on light colors,
/// white on dark ones, split at luminance 160.
pub fn pick_contrast_color(background: ThemeColor) -> ThemeColor {
    let luminance = 0.299 * f64::from(background.r)
        + 0.587 * f64::from(background.g)
        + 0.114 * f64::from(background.b);
    if luminance > 160.0 {
        ThemeColor::new(0, 0, 0)
    } else {
        ThemeColor::new(255, 255, 255)
    }
}

/// Content-side probe, injected into the page's context. Inspects the
/// theme-color meta tag, then the root element's computed background,
/// then the body's, skipping fully-transparent candidates, and posts a
/// `theme_color_result` message tagged with the chosen source, the raw
/// value and the document's readyState.
pub const THEME_COLOR_SCRIPT: &str = r#"
(function() {
    function parseColor(value) {
        var m = value.match(/^#([0-9a-fA-F]{3})$/);
        if (m) {
            return [
                parseInt(m[1][0] + m[1][0], 16),
                parseInt(m[1][1] + m[1][1], 16),
                parseInt(m[1][2] + m[1][2], 16)
            ];
        }
        m = value.match(/^#([0-9a-fA-F]{6})/);
        if (m) {
            return [
                parseInt(m[1].slice(0, 2), 16),
                parseInt(m[1].slice(2, 4), 16),
                parseInt(m[1].slice(4, 6), 16)
            ];
        }
        m = value.match(/rgba?\((\d+)\s*,\s*(\d+)\s*,\s*(\d+)/);
        if (m) {
            return [parseInt(m[1]), parseInt(m[2]), parseInt(m[3])];
        }
        // Named or exotic colors: let the DOM normalize them.
        var probe = document.createElement('div');
        probe.style.color = value;
        (document.body || document.documentElement).appendChild(probe);
        var resolved = getComputedStyle(probe).color || '';
        probe.remove();
        m = resolved.match(/rgba?\((\d+)\s*,\s*(\d+)\s*,\s*(\d+)/);
        if (m) {
            return [parseInt(m[1]), parseInt(m[2]), parseInt(m[3])];
        }
        return null;
    }

    function visibleBackground(el) {
        if (!el) return '';
        var cs = getComputedStyle(el);
        var c = (cs && cs.backgroundColor) || '';
        if (!c || c === 'transparent' || c === 'rgba(0, 0, 0, 0)') return '';
        return c;
    }

    var raw = '';
    var source = '';
    var meta = document.querySelector('meta[name="theme-color"]');
    if (meta && meta.content) {
        raw = meta.content;
        source = 'meta';
    }
    if (!raw) {
        var c = visibleBackground(document.documentElement);
        if (c) { raw = c; source = 'html'; }
    }
    if (!raw) {
        var c2 = visibleBackground(document.body);
        if (c2) { raw = c2; source = 'body'; }
    }
    if (!raw) {
        raw = '#ffffff';
        source = 'fallback';
    }

    var rgb = parseColor(raw) || [255, 255, 255];
    window.ipc.postMessage(JSON.stringify({
        kind: 'theme_color_result',
        r: rgb[0],
        g: rgb[1],
        b: rgb[2],
        source: source,
        raw: raw,
        readyState: document.readyState
    }));
})();
"#;
