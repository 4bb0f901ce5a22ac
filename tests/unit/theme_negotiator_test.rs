use std::cell::RefCell;
use std::rc::Rc;

use deskbrowser::engine::{EngineInstance, HostSurface, ImageDownloadCallback};
use deskbrowser::services::theme_negotiator::{
    pick_contrast_color, ThemeColorNegotiator, ThemeOutcome,
};
use deskbrowser::types::engine::{NativeHandle, Point, Rect, ThemeColorReply};
use deskbrowser::types::errors::EngineError;
use deskbrowser::types::settings::ThemeSettings;
use deskbrowser::types::tab::{Tab, ThemeColor};

struct StubSurface;

impl HostSurface for StubSurface {
    fn is_realized(&self) -> bool {
        true
    }
    fn size(&self) -> (u32, u32) {
        (800, 600)
    }
    fn native_handle(&self) -> Option<NativeHandle> {
        Some(1)
    }
}

/// Counts theme-color requests sent to the content process.
#[derive(Clone, Default)]
struct ProbeInstance {
    requests: Rc<RefCell<u32>>,
}

impl EngineInstance for ProbeInstance {
    fn navigate(&mut self, _url: &str) {}
    fn reload(&mut self) {}
    fn stop(&mut self) {}
    fn go_back(&mut self) {}
    fn go_forward(&mut self) {}
    fn can_go_back(&self) -> bool {
        false
    }
    fn can_go_forward(&self) -> bool {
        false
    }
    fn set_zoom_level(&mut self, _level: f64) {}
    fn get_zoom_level(&self) -> f64 {
        0.0
    }
    fn set_focus(&mut self, _focused: bool) {}
    fn close(&mut self) {}
    fn window_handle(&self) -> Option<NativeHandle> {
        None
    }
    fn show_devtools(
        &mut self,
        _surface: NativeHandle,
        _rect: Rect,
        _inspect_at: Point,
    ) -> Result<Box<dyn EngineInstance>, EngineError> {
        Err(EngineError::DevToolsUnavailable("stub".to_string()))
    }
    fn close_devtools(&mut self) {}
    fn has_devtools(&self) -> bool {
        false
    }
    fn download_image(&mut self, _url: &str, _callback: ImageDownloadCallback) {}
    fn notify_resized(&mut self) {}
    fn request_theme_color(&mut self) {
        *self.requests.borrow_mut() += 1;
    }
}

fn tab() -> Tab {
    Tab::new(
        Rc::new(StubSurface),
        "https://example.com".to_string(),
        "New Tab",
        "New Tab (1)".to_string(),
    )
}

fn negotiator() -> ThemeColorNegotiator {
    ThemeColorNegotiator::new(&ThemeSettings::default())
}

fn not_ready_reply() -> ThemeColorReply {
    ThemeColorReply {
        r: 10,
        g: 20,
        b: 30,
        source: "html".to_string(),
        raw: "#0a141e".to_string(),
        ready_state: "loading".to_string(),
    }
}

fn fallback_reply() -> ThemeColorReply {
    ThemeColorReply {
        r: 255,
        g: 255,
        b: 255,
        source: "fallback".to_string(),
        raw: "#ffffff".to_string(),
        ready_state: "complete".to_string(),
    }
}

fn real_reply() -> ThemeColorReply {
    ThemeColorReply {
        r: 13,
        g: 17,
        b: 23,
        source: "meta".to_string(),
        raw: "#0d1117".to_string(),
        ready_state: "complete".to_string(),
    }
}

#[test]
fn test_not_ready_reply_never_touches_stored_theme() {
    let negotiator = negotiator();
    let mut tab = tab();

    let outcome = negotiator.handle_reply(&mut tab, &not_ready_reply());
    assert_eq!(outcome, ThemeOutcome::NotReady { retry: true });
    assert!(!tab.has_theme);
    assert_eq!(tab.theme, ThemeColor::default());
    assert_eq!(tab.theme_ready_retry_count, 1);
    assert_eq!(tab.theme_retry_count, 0);
}

#[test]
fn test_ready_retries_stop_at_limit() {
    let limits = ThemeSettings {
        ready_retry_limit: 3,
        ..Default::default()
    };
    let negotiator = ThemeColorNegotiator::new(&limits);
    let mut tab = tab();

    // Retries while under the limit.
    for attempt in 1..3 {
        let outcome = negotiator.handle_reply(&mut tab, &not_ready_reply());
        assert_eq!(outcome, ThemeOutcome::NotReady { retry: true });
        assert_eq!(tab.theme_ready_retry_count, attempt);
    }
    // At the limit the protocol stops without storing anything.
    let outcome = negotiator.handle_reply(&mut tab, &not_ready_reply());
    assert_eq!(outcome, ThemeOutcome::NotReady { retry: false });
    assert!(!tab.has_theme);
}

#[test]
fn test_interactive_counts_as_ready() {
    let negotiator = negotiator();
    let mut tab = tab();
    let reply = ThemeColorReply {
        ready_state: "interactive".to_string(),
        ..real_reply()
    };
    let outcome = negotiator.handle_reply(&mut tab, &reply);
    assert_eq!(outcome, ThemeOutcome::Stored { retry: false });
    assert!(tab.has_theme);
    assert_eq!(tab.theme, ThemeColor::new(13, 17, 23));
}

#[test]
fn test_consecutive_fallbacks_strictly_increase_retry_count() {
    let negotiator = negotiator();
    let mut tab = tab();

    let outcome = negotiator.handle_reply(&mut tab, &fallback_reply());
    assert_eq!(outcome, ThemeOutcome::Stored { retry: true });
    assert_eq!(tab.theme_retry_count, 1);

    let outcome = negotiator.handle_reply(&mut tab, &fallback_reply());
    assert_eq!(outcome, ThemeOutcome::Stored { retry: true });
    assert_eq!(tab.theme_retry_count, 2);

    // The fallback color is still stored; white is a legitimate answer.
    assert!(tab.has_theme);
    assert_eq!(tab.theme, ThemeColor::new(255, 255, 255));
}

#[test]
fn test_fallback_retries_stop_at_limit() {
    let limits = ThemeSettings {
        retry_limit: 2,
        ..Default::default()
    };
    let negotiator = ThemeColorNegotiator::new(&limits);
    let mut tab = tab();

    assert_eq!(
        negotiator.handle_reply(&mut tab, &fallback_reply()),
        ThemeOutcome::Stored { retry: true }
    );
    assert_eq!(
        negotiator.handle_reply(&mut tab, &fallback_reply()),
        ThemeOutcome::Stored { retry: false }
    );
}

#[test]
fn test_real_reply_resets_both_counters() {
    let negotiator = negotiator();
    let mut tab = tab();
    tab.theme_retry_count = 4;
    tab.theme_ready_retry_count = 2;

    let outcome = negotiator.handle_reply(&mut tab, &real_reply());
    assert_eq!(outcome, ThemeOutcome::Stored { retry: false });
    assert_eq!(tab.theme_retry_count, 0);
    assert_eq!(tab.theme_ready_retry_count, 0);
    assert_eq!(tab.theme, ThemeColor::new(13, 17, 23));
    assert!(tab.has_theme);
}

#[test]
fn test_channels_are_clamped() {
    let negotiator = negotiator();
    let mut tab = tab();
    let reply = ThemeColorReply {
        r: -20,
        g: 300,
        b: 128,
        ..real_reply()
    };
    negotiator.handle_reply(&mut tab, &reply);
    assert_eq!(tab.theme, ThemeColor::new(0, 255, 128));
}

#[test]
fn test_white_raw_counts_as_fallback_case_insensitively() {
    let negotiator = negotiator();
    let mut tab = tab();
    let reply = ThemeColorReply {
        source: "body".to_string(),
        raw: "#FFFFFF".to_string(),
        ..fallback_reply()
    };
    assert_eq!(
        negotiator.handle_reply(&mut tab, &reply),
        ThemeOutcome::Stored { retry: true }
    );
}

#[test]
fn test_empty_source_counts_as_fallback() {
    let negotiator = negotiator();
    let mut tab = tab();
    let reply = ThemeColorReply {
        source: String::new(),
        raw: "#123456".to_string(),
        r: 0x12,
        g: 0x34,
        b: 0x56,
        ready_state: "complete".to_string(),
    };
    assert_eq!(
        negotiator.handle_reply(&mut tab, &reply),
        ThemeOutcome::Stored { retry: true }
    );
}

#[test]
fn test_fallback_then_real_reply_recovers() {
    let negotiator = negotiator();
    let mut tab = tab();
    negotiator.handle_reply(&mut tab, &fallback_reply());
    assert_eq!(tab.theme_retry_count, 1);

    negotiator.handle_reply(&mut tab, &real_reply());
    assert_eq!(tab.theme_retry_count, 0);
    assert_eq!(tab.theme, ThemeColor::new(13, 17, 23));
}

#[test]
fn test_request_is_noop_on_unbound_tab() {
    let negotiator = negotiator();
    let mut tab = tab();
    // Must not panic or schedule anything.
    negotiator.request(&mut tab);
}

#[test]
fn test_request_reaches_bound_instance() {
    let negotiator = negotiator();
    let mut tab = tab();
    let probe = ProbeInstance::default();
    let requests = probe.requests.clone();
    tab.instance = Some(Box::new(probe));

    negotiator.request(&mut tab);
    negotiator.request(&mut tab);
    assert_eq!(*requests.borrow(), 2);
}

#[test]
fn test_reply_parses_from_protocol_json() {
    let json = r##"{"kind":"theme_color_result","r":18,"g":52,"b":86,"source":"meta","raw":"#123456","readyState":"complete"}"##;
    let reply: ThemeColorReply = serde_json::from_str(json).unwrap();
    assert_eq!(reply.r, 18);
    assert_eq!(reply.source, "meta");
    assert_eq!(reply.ready_state, "complete");
}

#[test]
fn test_contrast_color_split() {
    assert_eq!(
        pick_contrast_color(ThemeColor::new(250, 250, 250)),
        ThemeColor::new(0, 0, 0)
    );
    assert_eq!(
        pick_contrast_color(ThemeColor::new(20, 20, 20)),
        ThemeColor::new(255, 255, 255)
    );
}
