use std::cell::RefCell;
use std::rc::Rc;

use deskbrowser::app::{App, EventSink, HostContext, ProcessSpawner, UiBridge};
use deskbrowser::engine::{EngineInstance, HostSurface, ImageDownloadCallback, WebEngine};
use deskbrowser::managers::tab_registry::TabRegistryTrait;
use deskbrowser::services::scheduler::TaskQueue;
use deskbrowser::types::engine::{
    DeferredTask, Disposition, EngineEvent, NativeHandle, Point, PopupFeatures, Rect,
    ThemeColorReply,
};
use deskbrowser::types::errors::EngineError;
use deskbrowser::types::settings::BrowserSettings;
use deskbrowser::types::tab::{SecurityStatus, TabId, ThemeColor};
use rstest::rstest;

// ─── Fakes ───

/// Shared call record across instances, the engine, the bridge and the
/// spawner.
#[derive(Default)]
struct CallLog {
    creates: usize,
    navigated: Vec<String>,
    focus_changes: Vec<bool>,
    instance_closes: usize,
    theme_requests: usize,
    download_urls: Vec<String>,
    show_devtools: usize,
    tab_opens: Vec<bool>,
    presented: usize,
    theme_applied: Vec<(TabId, ThemeColor, ThemeColor)>,
    icons: Vec<(TabId, usize)>,
    titles: Vec<String>,
    status_texts: Vec<String>,
    spawned: Vec<String>,
}

type Log = Rc<RefCell<CallLog>>;

struct FakeSurface {
    handle: NativeHandle,
    realized: Rc<RefCell<bool>>,
}

impl HostSurface for FakeSurface {
    fn is_realized(&self) -> bool {
        *self.realized.borrow()
    }
    fn size(&self) -> (u32, u32) {
        (800, 600)
    }
    fn native_handle(&self) -> Option<NativeHandle> {
        Some(self.handle)
    }
}

struct FakeEngine {
    log: Log,
}

impl WebEngine for FakeEngine {
    fn create_instance(
        &mut self,
        _surface: NativeHandle,
        _rect: Rect,
        initial_url: &str,
    ) -> Result<Box<dyn EngineInstance>, EngineError> {
        let mut log = self.log.borrow_mut();
        log.creates += 1;
        log.navigated.push(initial_url.to_string());
        Ok(Box::new(FakeInstance {
            log: self.log.clone(),
            zoom: 0.0,
        }))
    }
    fn do_work(&mut self) {}
}

struct FakeInstance {
    log: Log,
    zoom: f64,
}

impl EngineInstance for FakeInstance {
    fn navigate(&mut self, url: &str) {
        self.log.borrow_mut().navigated.push(url.to_string());
    }
    fn reload(&mut self) {}
    fn stop(&mut self) {}
    fn go_back(&mut self) {}
    fn go_forward(&mut self) {}
    fn can_go_back(&self) -> bool {
        true
    }
    fn can_go_forward(&self) -> bool {
        false
    }
    fn set_zoom_level(&mut self, level: f64) {
        self.zoom = level;
    }
    fn get_zoom_level(&self) -> f64 {
        self.zoom
    }
    fn set_focus(&mut self, focused: bool) {
        self.log.borrow_mut().focus_changes.push(focused);
    }
    fn close(&mut self) {
        self.log.borrow_mut().instance_closes += 1;
    }
    fn window_handle(&self) -> Option<NativeHandle> {
        None
    }
    fn show_devtools(
        &mut self,
        _surface: NativeHandle,
        _rect: Rect,
        _inspect_at: Point,
    ) -> Result<Box<dyn EngineInstance>, EngineError> {
        self.log.borrow_mut().show_devtools += 1;
        Ok(Box::new(FakeInstance {
            log: self.log.clone(),
            zoom: 0.0,
        }))
    }
    fn close_devtools(&mut self) {}
    fn has_devtools(&self) -> bool {
        false
    }
    fn download_image(&mut self, url: &str, callback: ImageDownloadCallback) {
        self.log.borrow_mut().download_urls.push(url.to_string());
        // The "network" answers immediately with a canned icon.
        callback(vec![0x89, 0x50, 0x4e, 0x47]);
    }
    fn notify_resized(&mut self) {}
    fn request_theme_color(&mut self) {
        self.log.borrow_mut().theme_requests += 1;
    }
}

struct FakeUi {
    log: Log,
    next_handle: NativeHandle,
}

impl UiBridge for FakeUi {
    fn open_tab_surface(&mut self, select: bool) -> Option<Rc<dyn HostSurface>> {
        self.log.borrow_mut().tab_opens.push(select);
        let handle = self.next_handle;
        self.next_handle += 1;
        Some(Rc::new(FakeSurface {
            handle,
            realized: Rc::new(RefCell::new(true)),
        }))
    }
    fn open_devtools_surface(&mut self, _tab: TabId) -> Option<Rc<dyn HostSurface>> {
        let handle = self.next_handle;
        self.next_handle += 1;
        Some(Rc::new(FakeSurface {
            handle,
            realized: Rc::new(RefCell::new(true)),
        }))
    }
    fn present_devtools(&mut self, _tab: TabId) {
        self.log.borrow_mut().presented += 1;
    }
    fn apply_theme_visual(&mut self, tab: TabId, bg: ThemeColor, fg: ThemeColor) {
        self.log.borrow_mut().theme_applied.push((tab, bg, fg));
    }
    fn clear_theme_visual(&mut self, _tab: TabId) {}
    fn update_navigation_controls(&mut self, _tab: TabId, _b: bool, _f: bool) {}
    fn update_security_controls(&mut self, _tab: TabId, _s: SecurityStatus) {}
    fn update_reload_control(&mut self, _tab: TabId, _l: bool) {}
    fn update_zoom_control(&mut self, _tab: TabId, _z: f64) {}
    fn update_url_field(&mut self, _tab: TabId, _u: &str) {}
    fn update_status_text(&mut self, text: &str) {
        self.log.borrow_mut().status_texts.push(text.to_string());
    }
    fn set_tab_title(&mut self, _tab: TabId, title: &str) {
        self.log.borrow_mut().titles.push(title.to_string());
    }
    fn set_tab_icon(&mut self, tab: TabId, data: &[u8]) {
        self.log.borrow_mut().icons.push((tab, data.len()));
    }
    fn focus_surface(&mut self, _tab: TabId) {}
}

struct FakeSpawner {
    log: Log,
}

impl ProcessSpawner for FakeSpawner {
    fn spawn_new_top_level(&mut self, url: &str) {
        self.log.borrow_mut().spawned.push(url.to_string());
    }
}

struct Harness {
    app: App,
    engine: FakeEngine,
    ui: FakeUi,
    tasks: TaskQueue,
    spawner: FakeSpawner,
    events: EventSink,
    log: Log,
}

impl Harness {
    fn new() -> Self {
        let log: Log = Rc::new(RefCell::new(CallLog::default()));
        Self {
            app: App::new(BrowserSettings::default()),
            engine: FakeEngine { log: log.clone() },
            ui: FakeUi {
                log: log.clone(),
                next_handle: 1,
            },
            tasks: TaskQueue::new(),
            spawner: FakeSpawner { log: log.clone() },
            events: Rc::new(RefCell::new(Vec::new())),
            log,
        }
    }

    fn with_ctx<R>(&mut self, f: impl FnOnce(&mut App, &mut HostContext) -> R) -> R {
        let mut ctx = HostContext {
            engine: &mut self.engine,
            ui: &mut self.ui,
            tasks: &mut self.tasks,
            spawner: &mut self.spawner,
            events: self.events.clone(),
        };
        f(&mut self.app, &mut ctx)
    }

    /// Advance the queue clock and run everything that came due.
    fn run_due(&mut self, ms: u64) -> Vec<DeferredTask> {
        let due = self.tasks.advance(ms);
        for task in &due {
            let task = *task;
            self.with_ctx(|app, ctx| {
                app.run_task(task, ctx);
                app.process_events(ctx);
            });
        }
        due
    }

    /// Open a tab and drive the creation poll to a bound instance.
    fn open_bound_tab(&mut self, url: &str) -> TabId {
        let id = self
            .with_ctx(|app, ctx| app.open_tab(url, true, ctx))
            .expect("open_tab");
        self.run_due(20);
        assert!(self.app.registry.get(id).unwrap().is_bound());
        id
    }

    fn handle(&mut self, event: EngineEvent) {
        self.with_ctx(|app, ctx| {
            app.handle_event(event, ctx);
            app.process_events(ctx);
        });
    }
}

fn open_url_event(tab: TabId, url: &str, disposition: Disposition) -> EngineEvent {
    EngineEvent::OpenUrl {
        tab,
        url: url.to_string(),
        disposition,
        user_gesture: true,
    }
}

// ─── Routing side effects ───

#[test]
fn test_new_window_spawns_exactly_one_process_and_no_tab() {
    let mut h = Harness::new();
    let tab = h.open_bound_tab("https://origin.com");
    let opens_before = h.log.borrow().tab_opens.len();

    h.handle(open_url_event(tab, "https://popup.com", Disposition::NewWindow));

    let log = h.log.borrow();
    assert_eq!(log.spawned, vec!["https://popup.com".to_string()]);
    assert_eq!(log.tab_opens.len(), opens_before);
}

#[test]
fn test_new_background_tab_opens_unselected_and_keeps_selection() {
    let mut h = Harness::new();
    let tab = h.open_bound_tab("https://origin.com");
    assert_eq!(h.app.registry.current_tab(), Some(tab));

    h.handle(open_url_event(tab, "https://bg.com", Disposition::NewBackgroundTab));

    assert_eq!(h.app.registry.current_tab(), Some(tab));
    let log = h.log.borrow();
    assert_eq!(log.tab_opens.last(), Some(&false));
    drop(log);
    let new_tab = h.app.registry.find_by_url("https://bg.com").unwrap();
    assert_ne!(new_tab, tab);
}

#[rstest]
#[case(Disposition::CurrentTab)]
#[case(Disposition::NewForegroundTab)]
#[case(Disposition::NewBackgroundTab)]
#[case(Disposition::NewWindow)]
#[case(Disposition::OffTheRecord)]
fn test_popup_flag_suppresses_all_side_effects(#[case] disposition: Disposition) {
    let mut h = Harness::new();
    let tab = h.open_bound_tab("https://origin.com");
    let opens_before = h.log.borrow().tab_opens.len();

    h.handle(EngineEvent::BeforePopup {
        tab,
        url: "https://popup.com".to_string(),
        disposition,
        features: PopupFeatures {
            is_popup: true,
            ..Default::default()
        },
        user_gesture: true,
    });

    let log = h.log.borrow();
    assert!(log.spawned.is_empty());
    assert_eq!(log.tab_opens.len(), opens_before);
}

#[test]
fn test_current_disposition_navigates_selected_tab() {
    let mut h = Harness::new();
    let tab = h.open_bound_tab("https://origin.com");
    let opens_before = h.log.borrow().tab_opens.len();

    h.handle(open_url_event(tab, "next.com", Disposition::CurrentTab));

    let log = h.log.borrow();
    assert_eq!(log.navigated.last(), Some(&"https://next.com".to_string()));
    assert_eq!(log.tab_opens.len(), opens_before);
    // The routed load focuses the page.
    assert_eq!(log.focus_changes.last(), Some(&true));
    drop(log);
    assert_eq!(
        h.app.registry.get(tab).unwrap().pending_url,
        "https://next.com"
    );
}

#[test]
fn test_current_disposition_without_tabs_opens_selected_tab() {
    let mut h = Harness::new();
    // No tab exists; a synthetic id stands in for the reporting context.
    h.handle(open_url_event(TabId::new(), "https://solo.com", Disposition::CurrentTab));

    assert_eq!(h.log.borrow().tab_opens, vec![true]);
    let id = h.app.registry.find_by_url("https://solo.com").unwrap();
    assert_eq!(h.app.registry.current_tab(), Some(id));
}

// ─── Binding and lifetime ───

#[test]
fn test_at_most_one_instance_is_ever_bound() {
    let mut h = Harness::new();
    let tab = h.open_bound_tab("https://origin.com");
    assert_eq!(h.log.borrow().creates, 1);

    // Navigations, load events and extra polls never create another.
    h.with_ctx(|app, ctx| app.load_url(tab, "https://second.com", ctx));
    h.handle(EngineEvent::LoadEnd { tab });
    h.with_ctx(|app, ctx| app.run_task(DeferredTask::PollCreation(tab), ctx));
    h.run_due(100);
    assert_eq!(h.log.borrow().creates, 1);
}

#[test]
fn test_close_tab_closes_instance_and_reselects_neighbor() {
    let mut h = Harness::new();
    let first = h.open_bound_tab("https://a.com");
    let second = h.open_bound_tab("https://b.com");
    assert_eq!(h.app.registry.current_tab(), Some(second));

    h.with_ctx(|app, ctx| app.close_tab(second, ctx));

    assert_eq!(h.log.borrow().instance_closes, 1);
    assert!(!h.app.registry.contains(second));
    assert_eq!(h.app.registry.current_tab(), Some(first));

    // A poll still queued for the dead tab is a silent no-op.
    h.with_ctx(|app, ctx| app.run_task(DeferredTask::PollCreation(second), ctx));
    assert_eq!(h.log.borrow().creates, 2);
}

#[test]
fn test_load_url_before_binding_rides_the_pending_poll() {
    let mut h = Harness::new();
    let id = h
        .with_ctx(|app, ctx| app.open_tab("https://first.com", true, ctx))
        .unwrap();
    // Not yet bound; a second load only replaces the pending URL.
    h.with_ctx(|app, ctx| app.load_url(id, "https://second.com", ctx));
    h.run_due(20);

    let log = h.log.borrow();
    assert_eq!(log.creates, 1);
    assert_eq!(log.navigated, vec!["https://second.com".to_string()]);
}

// ─── Theme protocol through the dispatcher ───

#[test]
fn test_load_end_triggers_theme_request() {
    let mut h = Harness::new();
    let tab = h.open_bound_tab("https://origin.com");
    assert_eq!(h.log.borrow().theme_requests, 0);

    h.handle(EngineEvent::LoadEnd { tab });
    assert_eq!(h.log.borrow().theme_requests, 1);
}

#[test]
fn test_not_ready_reply_schedules_retry_after_delay() {
    let mut h = Harness::new();
    let tab = h.open_bound_tab("https://origin.com");

    h.handle(EngineEvent::ThemeColorReply {
        tab,
        reply: ThemeColorReply {
            r: 0,
            g: 0,
            b: 0,
            source: String::new(),
            raw: String::new(),
            ready_state: "loading".to_string(),
        },
    });
    assert_eq!(h.log.borrow().theme_applied.len(), 0);
    assert!(!h.app.registry.get(tab).unwrap().has_theme);

    // Nothing re-requests before the retry delay (the engine pump may
    // tick, but no theme task fires)...
    let early = h.run_due(249);
    assert!(!early.contains(&DeferredTask::RequestThemeColor(tab)));
    assert_eq!(h.log.borrow().theme_requests, 0);
    // ...then exactly one re-request goes out.
    let due = h.run_due(1);
    assert!(due.contains(&DeferredTask::RequestThemeColor(tab)));
    assert_eq!(h.log.borrow().theme_requests, 1);
}

#[test]
fn test_ready_reply_applies_visual_to_current_tab() {
    let mut h = Harness::new();
    let tab = h.open_bound_tab("https://origin.com");

    h.handle(EngineEvent::ThemeColorReply {
        tab,
        reply: ThemeColorReply {
            r: 13,
            g: 17,
            b: 23,
            source: "meta".to_string(),
            raw: "#0d1117".to_string(),
            ready_state: "complete".to_string(),
        },
    });

    let log = h.log.borrow();
    assert_eq!(log.theme_applied.len(), 1);
    let (applied_tab, bg, fg) = log.theme_applied[0];
    assert_eq!(applied_tab, tab);
    assert_eq!(bg, ThemeColor::new(13, 17, 23));
    // Dark page gets light foreground.
    assert_eq!(fg, ThemeColor::new(255, 255, 255));
    // No retry for a real color.
    drop(log);
    let later = h.run_due(1000);
    assert!(!later
        .iter()
        .any(|t| matches!(t, DeferredTask::RequestThemeColor(_))));
}

#[test]
fn test_background_tab_theme_is_stored_but_not_applied() {
    let mut h = Harness::new();
    let first = h.open_bound_tab("https://a.com");
    let second = h.open_bound_tab("https://b.com");
    assert_eq!(h.app.registry.current_tab(), Some(second));

    h.handle(EngineEvent::ThemeColorReply {
        tab: first,
        reply: ThemeColorReply {
            r: 200,
            g: 10,
            b: 10,
            source: "meta".to_string(),
            raw: "#c80a0a".to_string(),
            ready_state: "complete".to_string(),
        },
    });

    assert!(h.app.registry.get(first).unwrap().has_theme);
    assert!(h.log.borrow().theme_applied.is_empty());
}

#[test]
fn test_theme_reply_for_removed_tab_is_dropped() {
    let mut h = Harness::new();
    let tab = h.open_bound_tab("https://origin.com");
    h.with_ctx(|app, ctx| app.close_tab(tab, ctx));

    h.handle(EngineEvent::ThemeColorReply {
        tab,
        reply: ThemeColorReply {
            r: 1,
            g: 2,
            b: 3,
            source: "meta".to_string(),
            raw: "#010203".to_string(),
            ready_state: "complete".to_string(),
        },
    });
    assert!(h.log.borrow().theme_applied.is_empty());
    let later = h.run_due(1000);
    assert!(!later
        .iter()
        .any(|t| matches!(t, DeferredTask::RequestThemeColor(_))));
}

// ─── DevTools through the dispatcher ───

#[test]
fn test_inspect_binds_devtools_and_reshows() {
    let mut h = Harness::new();
    let tab = h.open_bound_tab("https://origin.com");

    h.with_ctx(|app, ctx| app.inspect_element(tab, Point { x: 10, y: 20 }, ctx));
    h.run_due(20);
    assert_eq!(h.log.borrow().show_devtools, 1);

    h.with_ctx(|app, ctx| app.inspect_element(tab, Point { x: 1, y: 1 }, ctx));
    let log = h.log.borrow();
    assert_eq!(log.show_devtools, 1);
    assert_eq!(log.presented, 1);
}

// ─── Indicators and supplements ───

#[test]
fn test_ready_status_message_is_cleared() {
    let mut h = Harness::new();
    let tab = h.open_bound_tab("https://origin.com");

    h.handle(EngineEvent::StatusMessage {
        tab,
        text: "Ready".to_string(),
    });
    assert_eq!(h.log.borrow().status_texts.last(), Some(&String::new()));

    h.handle(EngineEvent::StatusMessage {
        tab,
        text: "https://hover.example".to_string(),
    });
    assert_eq!(
        h.log.borrow().status_texts.last(),
        Some(&"https://hover.example".to_string())
    );
}

#[test]
fn test_favicon_change_downloads_and_sets_icon() {
    let mut h = Harness::new();
    let tab = h.open_bound_tab("https://origin.com");

    h.handle(EngineEvent::FaviconUrlChange {
        tab,
        url: "https://origin.com/favicon.ico".to_string(),
    });

    let log = h.log.borrow();
    assert_eq!(log.download_urls, vec!["https://origin.com/favicon.ico".to_string()]);
    assert_eq!(log.icons, vec![(tab, 4)]);
}

#[test]
fn test_duplicate_favicon_url_is_not_redownloaded() {
    let mut h = Harness::new();
    let tab = h.open_bound_tab("https://origin.com");

    for _ in 0..2 {
        h.handle(EngineEvent::FaviconUrlChange {
            tab,
            url: "https://origin.com/favicon.ico".to_string(),
        });
    }
    assert_eq!(h.log.borrow().download_urls.len(), 1);
}

#[test]
fn test_cross_host_load_clears_favicon() {
    let mut h = Harness::new();
    let tab = h.open_bound_tab("https://origin.com");
    h.handle(EngineEvent::FaviconUrlChange {
        tab,
        url: "https://origin.com/favicon.ico".to_string(),
    });
    assert!(!h.app.registry.get(tab).unwrap().favicon_url.is_empty());

    h.handle(EngineEvent::LoadStart {
        tab,
        url: "https://elsewhere.org/page".to_string(),
    });
    let tab_state = h.app.registry.get(tab).unwrap();
    assert!(tab_state.favicon_url.is_empty());
    assert_eq!(tab_state.current_host, "elsewhere.org");
}

#[test]
fn test_restore_tabs_recreates_session() {
    let mut h = Harness::new();
    let urls = vec![
        "https://a.com".to_string(),
        "https://b.com".to_string(),
        "https://c.com".to_string(),
    ];
    h.with_ctx(|app, ctx| app.restore_tabs(&urls, 1, ctx));
    h.run_due(20);

    assert_eq!(h.app.registry.tab_count(), 3);
    let active = h.app.registry.current_tab().unwrap();
    assert_eq!(
        h.app.registry.get(active).unwrap().pending_url,
        "https://b.com"
    );
    assert_eq!(h.log.borrow().creates, 3);
}

#[test]
fn test_title_change_reaches_bridge() {
    let mut h = Harness::new();
    let tab = h.open_bound_tab("https://origin.com");
    h.handle(EngineEvent::TitleChange {
        tab,
        title: "Example Domain".to_string(),
    });
    assert_eq!(h.log.borrow().titles.last(), Some(&"Example Domain".to_string()));
    assert_eq!(h.app.registry.get(tab).unwrap().title, "Example Domain");
}
