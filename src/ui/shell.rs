//! WebView-based browser shell using `wry` + `tao`.
//!
//! One top-level window hosts a child WebView per tab; the selected tab's
//! WebView is the visible one. The shell implements the engine capability
//! traits over `wry`, translates `wry` callbacks into [`EngineEvent`]
//! values delivered through an event-loop proxy, and drives the deferred
//! task queue off the loop clock.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tao::event::{Event, WindowEvent};
use tao::event_loop::{ControlFlow, EventLoop, EventLoopBuilder, EventLoopProxy};
use tao::window::{Window, WindowBuilder};
use tracing::{debug, warn};
use wry::WebView;

use crate::app::{App, EventSink, HostContext, OsProcessSpawner, UiBridge};
use crate::engine::{EngineInstance, HostSurface, ImageDownloadCallback, WebEngine};
use crate::services::navigation_router::{self, NavigationOrigin, RouteDecision};
use crate::services::scheduler::TaskQueue;
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::services::theme_negotiator::THEME_COLOR_SCRIPT;
use crate::types::engine::{
    Disposition, EngineEvent, NativeHandle, Point, PopupFeatures, Rect, ThemeColorReply,
};
use crate::types::errors::EngineError;
use crate::types::tab::{SecurityStatus, TabId, ThemeColor};

/// Start parameters parsed from the command line.
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    /// URL passed by a sibling process via `--open-url`.
    pub open_url: Option<String>,
    /// Engine cache suffix for this process.
    pub cache_suffix: String,
}

#[derive(Debug)]
enum UserEvent {
    Engine(EngineEvent),
}

/// Surface-handle to tab mapping shared between the UI bridge (which
/// learns the association when the core attaches a tab) and the engine
/// adapter (which needs it when the creation poll fires).
type SurfaceTabMap = Rc<RefCell<HashMap<NativeHandle, TabId>>>;

type WebViewMap = Rc<RefCell<HashMap<TabId, Rc<WebView>>>>;

// ─── Host surfaces ───

/// Mutable surface facts the window machinery updates as the window
/// system reports them.
struct SurfaceState {
    realized: bool,
    size: (u32, u32),
    handle: Option<NativeHandle>,
}

/// A logical sub-surface of the shell window, one per tab page.
pub struct ShellSurface {
    state: Rc<RefCell<SurfaceState>>,
}

impl HostSurface for ShellSurface {
    fn is_realized(&self) -> bool {
        self.state.borrow().realized
    }

    fn size(&self) -> (u32, u32) {
        self.state.borrow().size
    }

    fn native_handle(&self) -> Option<NativeHandle> {
        self.state.borrow().handle
    }
}

// ─── Engine adapter ───

/// `WebEngine` adapter over `wry`. Surface handles are synthetic ids the
/// shell allocates; the shared [`SurfaceTabMap`] resolves them back to
/// tabs when instances are created.
pub struct WryEngine {
    window: Rc<Window>,
    proxy: EventLoopProxy<UserEvent>,
    surface_tabs: SurfaceTabMap,
    webviews: WebViewMap,
}

impl WryEngine {
    fn new(
        window: Rc<Window>,
        proxy: EventLoopProxy<UserEvent>,
        surface_tabs: SurfaceTabMap,
        webviews: WebViewMap,
    ) -> Self {
        Self {
            window,
            proxy,
            surface_tabs,
            webviews,
        }
    }

    fn build_webview(
        &self,
        tab: TabId,
        rect: Rect,
        initial_url: &str,
    ) -> Result<WebView, EngineError> {
        let send = {
            let proxy = self.proxy.clone();
            move |event: EngineEvent| {
                let _ = proxy.send_event(UserEvent::Engine(event));
            }
        };

        let ipc = send.clone();
        let page_load = send.clone();
        let title = send.clone();
        let popup = send;

        let builder = wry::WebViewBuilder::new()
            .with_bounds(to_wry_rect(rect))
            .with_url(initial_url)
            .with_devtools(true)
            .with_focused(false)
            .with_ipc_handler(move |msg: wry::http::Request<String>| {
                handle_ipc_message(tab, msg.body(), &ipc);
            })
            .with_on_page_load_handler(move |event, url| match event {
                wry::PageLoadEvent::Started => {
                    page_load(EngineEvent::LoadStart {
                        tab,
                        url: url.clone(),
                    });
                    page_load(EngineEvent::LoadingStateChange {
                        tab,
                        loading: true,
                        can_go_back: false,
                        can_go_forward: false,
                    });
                }
                wry::PageLoadEvent::Finished => {
                    page_load(EngineEvent::AddressChange {
                        tab,
                        url: url.clone(),
                    });
                    page_load(EngineEvent::LoadingStateChange {
                        tab,
                        loading: false,
                        can_go_back: true,
                        can_go_forward: false,
                    });
                    page_load(EngineEvent::LoadEnd { tab });
                }
            })
            .with_document_title_changed_handler(move |text| {
                title(EngineEvent::TitleChange { tab, title: text });
            })
            .with_new_window_req_handler(move |url, _features| {
                // This callback needs a synchronous answer, so the same
                // pure router the event dispatch uses decides whether the
                // engine keeps native handling.
                let decision = navigation_router::route(
                    &url,
                    Disposition::NewForegroundTab,
                    Some(&PopupFeatures::default()),
                    true,
                    NavigationOrigin::Popup,
                );
                popup(EngineEvent::BeforePopup {
                    tab,
                    url: url.clone(),
                    disposition: Disposition::NewForegroundTab,
                    features: PopupFeatures::default(),
                    user_gesture: true,
                });
                if decision == RouteDecision::DeferToEngine {
                    wry::NewWindowResponse::Allow
                } else {
                    wry::NewWindowResponse::Deny
                }
            });

        #[cfg(target_os = "linux")]
        {
            use tao::platform::unix::WindowExtUnix;
            use wry::WebViewBuilderExtUnix;
            let vbox = self.window.default_vbox().ok_or_else(|| {
                EngineError::SurfaceUnavailable("no GTK vbox on shell window".to_string())
            })?;
            builder
                .build_gtk(vbox)
                .map_err(|e| EngineError::CreateFailed(e.to_string()))
        }
        #[cfg(not(target_os = "linux"))]
        {
            builder
                .build_as_child(self.window.as_ref())
                .map_err(|e| EngineError::CreateFailed(e.to_string()))
        }
    }
}

impl WebEngine for WryEngine {
    fn create_instance(
        &mut self,
        surface: NativeHandle,
        rect: Rect,
        initial_url: &str,
    ) -> Result<Box<dyn EngineInstance>, EngineError> {
        let tab = self
            .surface_tabs
            .borrow()
            .get(&surface)
            .copied()
            .ok_or_else(|| EngineError::SurfaceUnavailable(format!("handle {}", surface)))?;
        let webview = Rc::new(self.build_webview(tab, rect, initial_url)?);
        self.webviews.borrow_mut().insert(tab, webview.clone());
        debug!(%tab, url = %initial_url, "webview created");
        Ok(Box::new(WryInstance {
            tab,
            webview,
            proxy: self.proxy.clone(),
            navigations: 1,
            zoom_level: 0.0,
        }))
    }

    fn do_work(&mut self) {
        // wry drains its own platform queue inside the tao loop; the pump
        // slot exists for engines with an external message loop.
    }
}

/// `EngineInstance` adapter over one `wry::WebView`.
struct WryInstance {
    tab: TabId,
    webview: Rc<WebView>,
    proxy: EventLoopProxy<UserEvent>,
    navigations: u32,
    zoom_level: f64,
}

impl WryInstance {
    fn eval(&self, script: &str) {
        if let Err(e) = self.webview.evaluate_script(script) {
            warn!(tab = %self.tab, error = %e, "evaluate_script failed");
        }
    }
}

impl EngineInstance for WryInstance {
    fn navigate(&mut self, url: &str) {
        self.navigations += 1;
        if let Err(e) = self.webview.load_url(url) {
            warn!(tab = %self.tab, url = %url, error = %e, "load_url failed");
        }
    }

    fn reload(&mut self) {
        self.eval("location.reload();");
    }

    fn stop(&mut self) {
        self.eval("window.stop();");
    }

    fn go_back(&mut self) {
        self.eval("history.back();");
    }

    fn go_forward(&mut self) {
        self.eval("history.forward();");
    }

    fn can_go_back(&self) -> bool {
        // wry exposes no history introspection; assume yes once a second
        // navigation happened.
        self.navigations > 1
    }

    fn can_go_forward(&self) -> bool {
        false
    }

    fn set_zoom_level(&mut self, level: f64) {
        self.zoom_level = level;
        // Engine zoom levels are log-scale, 1.2 per step.
        let factor = 1.2f64.powf(level);
        if let Err(e) = self.webview.zoom(factor) {
            warn!(tab = %self.tab, error = %e, "zoom failed");
        }
    }

    fn get_zoom_level(&self) -> f64 {
        self.zoom_level
    }

    fn set_focus(&mut self, focused: bool) {
        let result = if focused {
            self.webview.focus()
        } else {
            self.webview.focus_parent()
        };
        if let Err(e) = result {
            debug!(tab = %self.tab, error = %e, "focus change failed");
        }
    }

    fn close(&mut self) {
        let _ = self.webview.set_visible(false);
        let _ = self
            .proxy
            .send_event(UserEvent::Engine(EngineEvent::InstanceClosed { tab: self.tab }));
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
        // WebKit/WebView2 bring their own inspector window; the surface
        // the core prepared stays a placeholder.
        self.webview.open_devtools();
        if !self.webview.is_devtools_open() {
            return Err(EngineError::DevToolsUnavailable(
                "inspector did not open".to_string(),
            ));
        }
        Ok(Box::new(WryDevToolsInstance {
            tab: self.tab,
            webview: self.webview.clone(),
            proxy: self.proxy.clone(),
        }))
    }

    fn close_devtools(&mut self) {
        self.webview.close_devtools();
    }

    fn has_devtools(&self) -> bool {
        self.webview.is_devtools_open()
    }

    fn download_image(&mut self, url: &str, _callback: ImageDownloadCallback) {
        // No image fetch path through wry; favicon bytes never arrive and
        // the core keeps the tab icon empty.
        debug!(tab = %self.tab, url = %url, "image download unsupported by adapter");
    }

    fn notify_resized(&mut self) {
        // Bounds are pushed by the shell on window resize.
    }

    fn request_theme_color(&mut self) {
        self.eval(THEME_COLOR_SCRIPT);
    }
}

/// The devtools side of a wry WebView. The inspector window belongs to
/// the platform webview, so closing is all that can be forwarded.
struct WryDevToolsInstance {
    tab: TabId,
    webview: Rc<WebView>,
    proxy: EventLoopProxy<UserEvent>,
}

impl EngineInstance for WryDevToolsInstance {
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

    fn close(&mut self) {
        self.webview.close_devtools();
        let _ = self
            .proxy
            .send_event(UserEvent::Engine(EngineEvent::DevToolsClosed { tab: self.tab }));
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
        Err(EngineError::DevToolsUnavailable(
            "already a devtools instance".to_string(),
        ))
    }

    fn close_devtools(&mut self) {}
    fn has_devtools(&self) -> bool {
        false
    }
    fn download_image(&mut self, _url: &str, _callback: ImageDownloadCallback) {}
    fn notify_resized(&mut self) {}
    fn request_theme_color(&mut self) {}
}

// ─── UI bridge ───

/// `UiBridge` over the single shell window: child WebView visibility for
/// tab switching and the window title for the active tab. Indicator
/// updates without a native widget land in the log.
struct WryUi {
    window: Rc<Window>,
    webviews: WebViewMap,
    surface_tabs: SurfaceTabMap,
    surfaces: Vec<Rc<RefCell<SurfaceState>>>,
    next_handle: NativeHandle,
    active_tab: Option<TabId>,
}

impl WryUi {
    fn new(window: Rc<Window>, webviews: WebViewMap, surface_tabs: SurfaceTabMap) -> Self {
        Self {
            window,
            webviews,
            surface_tabs,
            surfaces: Vec::new(),
            next_handle: 1,
            active_tab: None,
        }
    }

    fn content_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    /// Window resize: update every surface record so pending creation
    /// polls see real dimensions, and re-bound the live webviews.
    fn handle_resize(&mut self) {
        let size = self.content_size();
        for state in &self.surfaces {
            let mut state = state.borrow_mut();
            state.size = size;
            state.realized = size.0 > 1 && size.1 > 1;
        }
        for webview in self.webviews.borrow().values() {
            let rect = to_wry_rect(Rect::of_size(size.0, size.1));
            if let Err(e) = webview.set_bounds(rect) {
                warn!(error = %e, "set_bounds failed");
            }
        }
    }

    fn show_only(&self, tab: TabId) {
        for (id, webview) in self.webviews.borrow().iter() {
            let _ = webview.set_visible(*id == tab);
        }
    }

    fn alloc_surface(&mut self) -> Rc<ShellSurface> {
        let handle = self.next_handle;
        self.next_handle += 1;
        let size = self.content_size();
        let state = Rc::new(RefCell::new(SurfaceState {
            realized: size.0 > 1 && size.1 > 1,
            size,
            handle: Some(handle),
        }));
        self.surfaces.push(state.clone());
        Rc::new(ShellSurface { state })
    }
}

impl UiBridge for WryUi {
    fn open_tab_surface(&mut self, _select: bool) -> Option<Rc<dyn HostSurface>> {
        Some(self.alloc_surface())
    }

    fn attach_tab(&mut self, tab: TabId, surface: &Rc<dyn HostSurface>) {
        if let Some(handle) = surface.native_handle() {
            self.surface_tabs.borrow_mut().insert(handle, tab);
        }
    }

    fn open_devtools_surface(&mut self, _tab: TabId) -> Option<Rc<dyn HostSurface>> {
        // The platform inspector brings its own window; hand the core a
        // realized placeholder so the binding poll can proceed.
        Some(self.alloc_surface())
    }

    fn present_devtools(&mut self, tab: TabId) {
        if let Some(webview) = self.webviews.borrow().get(&tab) {
            webview.open_devtools();
        }
    }

    fn apply_theme_visual(&mut self, tab: TabId, background: ThemeColor, foreground: ThemeColor) {
        let bg = format!("#{:02x}{:02x}{:02x}", background.r, background.g, background.b);
        let fg = format!("#{:02x}{:02x}{:02x}", foreground.r, foreground.g, foreground.b);
        debug!(%tab, bg = %bg, fg = %fg, "theme visual applied");
    }

    fn clear_theme_visual(&mut self, tab: TabId) {
        debug!(%tab, "theme visual cleared");
    }

    fn update_navigation_controls(&mut self, tab: TabId, can_go_back: bool, can_go_forward: bool) {
        debug!(%tab, can_go_back, can_go_forward, "navigation controls");
    }

    fn update_security_controls(&mut self, tab: TabId, status: SecurityStatus) {
        debug!(%tab, ?status, "security indicator");
    }

    fn update_reload_control(&mut self, tab: TabId, loading: bool) {
        debug!(%tab, loading, "reload control");
    }

    fn update_zoom_control(&mut self, tab: TabId, level: f64) {
        debug!(%tab, level, "zoom control");
    }

    fn update_url_field(&mut self, _tab: TabId, url: &str) {
        debug!(url = %url, "url field");
    }

    fn update_status_text(&mut self, _text: &str) {}

    fn set_tab_title(&mut self, tab: TabId, title: &str) {
        if self.active_tab == Some(tab) && !title.is_empty() {
            self.window.set_title(&format!("{} - DeskBrowser", title));
        }
    }

    fn set_tab_icon(&mut self, _tab: TabId, _data: &[u8]) {}

    fn focus_surface(&mut self, tab: TabId) {
        self.active_tab = Some(tab);
        self.show_only(tab);
        self.window.set_focus();
    }
}

// ─── Wiring ───

fn to_wry_rect(rect: Rect) -> wry::Rect {
    wry::Rect {
        position: wry::dpi::LogicalPosition::new(rect.x as f64, rect.y as f64).into(),
        size: wry::dpi::LogicalSize::new(rect.width as f64, rect.height as f64).into(),
    }
}

/// Parse a content-process IPC message into engine events.
fn handle_ipc_message(tab: TabId, body: &str, send: &impl Fn(EngineEvent)) {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        warn!(%tab, len = body.len(), "IPC message rejected: invalid JSON");
        return;
    };
    match value.get("kind").and_then(|k| k.as_str()) {
        Some("theme_color_result") => {
            match serde_json::from_value::<ThemeColorReply>(value.clone()) {
                Ok(reply) => send(EngineEvent::ThemeColorReply { tab, reply }),
                Err(e) => warn!(%tab, error = %e, "malformed theme_color_result"),
            }
        }
        Some(kind) => debug!(%tab, kind, "unhandled IPC message"),
        None => warn!(%tab, "IPC message without kind"),
    }
}

/// Build the shell and run the event loop. Never returns.
pub fn run(options: StartOptions) -> ! {
    let mut settings_engine = SettingsEngine::new(None);
    if let Err(e) = settings_engine.load() {
        warn!(error = %e, "settings load failed, using defaults");
    }
    let settings = settings_engine.get_settings().clone();
    debug!(
        cache = %crate::platform::cache_dir_with_suffix(&options.cache_suffix).display(),
        "engine cache directory"
    );

    let event_loop: EventLoop<UserEvent> = EventLoopBuilder::with_user_event().build();
    let proxy = event_loop.create_proxy();

    let window = Rc::new(
        WindowBuilder::new()
            .with_title("DeskBrowser")
            .with_inner_size(tao::dpi::LogicalSize::new(1280.0, 800.0))
            .build(&event_loop)
            .expect("Failed to create window"),
    );

    let webviews: WebViewMap = Rc::new(RefCell::new(HashMap::new()));
    let surface_tabs: SurfaceTabMap = Rc::new(RefCell::new(HashMap::new()));
    let mut engine = WryEngine::new(
        window.clone(),
        proxy.clone(),
        surface_tabs.clone(),
        webviews.clone(),
    );
    let mut ui = WryUi::new(window, webviews, surface_tabs);
    let mut tasks = TaskQueue::new();
    let mut spawner = OsProcessSpawner;
    let events: EventSink = Rc::new(RefCell::new(Vec::new()));
    let mut app = App::new(settings);

    // First tab: the sibling-process URL wins over the configured default.
    {
        let mut ctx = HostContext {
            engine: &mut engine,
            ui: &mut ui,
            tasks: &mut tasks,
            spawner: &mut spawner,
            events: events.clone(),
        };
        let first = options
            .open_url
            .clone()
            .unwrap_or_else(|| app.settings.general.default_url.clone());
        app.open_tab(&first, true, &mut ctx);
    }

    let start = Instant::now();
    event_loop.run(move |event, _, control_flow| {
        match event {
            Event::WindowEvent {
                event: WindowEvent::CloseRequested,
                ..
            } => {
                *control_flow = ControlFlow::Exit;
                return;
            }
            Event::WindowEvent {
                event: WindowEvent::Resized(_),
                ..
            } => {
                ui.handle_resize();
            }
            Event::UserEvent(UserEvent::Engine(engine_event)) => {
                events.borrow_mut().push(engine_event);
            }
            _ => {}
        }

        // Collect the tasks that came due on the wall clock, then let the
        // app drain events and run them.
        let now_ms = start.elapsed().as_millis() as u64;
        let elapsed = now_ms.saturating_sub(tasks.now_ms());
        let due = tasks.advance(elapsed);
        {
            let mut ctx = HostContext {
                engine: &mut engine,
                ui: &mut ui,
                tasks: &mut tasks,
                spawner: &mut spawner,
                events: events.clone(),
            };
            app.process_events(&mut ctx);
            for task in due {
                app.run_task(task, &mut ctx);
                app.process_events(&mut ctx);
            }
        }

        *control_flow = match tasks.next_due_ms() {
            Some(next_due) => {
                let wait = next_due.saturating_sub(start.elapsed().as_millis() as u64);
                ControlFlow::WaitUntil(Instant::now() + Duration::from_millis(wait))
            }
            None => ControlFlow::Wait,
        };
    })
}
