//! DeskBrowser — a minimal desktop browser shell hosting an embedded
//! multi-process web engine.
//!
//! Entry point: parses the sibling-process arguments (`--open-url`,
//! `--cache-suffix`), initializes logging, and starts the GUI shell.
//! When built without the `gui` feature, runs a console demo that drives
//! the coordination core against a simulated engine.

use tracing_subscriber::EnvFilter;

/// Arguments a sibling process (or the user) passed on the command line.
#[derive(Debug, Default)]
struct CliArgs {
    open_url: Option<String>,
    cache_suffix: String,
}

fn parse_args<I: Iterator<Item = String>>(args: I) -> CliArgs {
    let mut parsed = CliArgs::default();
    let mut args = args;
    while let Some(arg) = args.next() {
        if let Some(value) = arg.strip_prefix("--open-url=") {
            parsed.open_url = Some(value.to_string());
        } else if arg == "--open-url" {
            if let Some(value) = args.next() {
                parsed.open_url = Some(value);
            }
        } else if let Some(value) = arg.strip_prefix("--cache-suffix=") {
            parsed.cache_suffix = deskbrowser::platform::sanitize_cache_suffix(value);
        } else if arg == "--cache-suffix" {
            if let Some(value) = args.next() {
                parsed.cache_suffix = deskbrowser::platform::sanitize_cache_suffix(&value);
            }
        }
    }
    parsed
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

#[cfg(feature = "gui")]
fn main() {
    init_logging();
    let args = parse_args(std::env::args().skip(1));
    deskbrowser::ui::shell::run(deskbrowser::ui::shell::StartOptions {
        open_url: args.open_url,
        cache_suffix: args.cache_suffix,
    });
}

#[cfg(not(feature = "gui"))]
fn main() {
    init_logging();
    let args = parse_args(std::env::args().skip(1));
    let _ = args;

    println!();
    println!("DeskBrowser v{} — engine-less demo mode", env!("CARGO_PKG_VERSION"));
    println!("Coordination core driven against a simulated engine.");
    println!();

    demo::demo_settings();
    demo::demo_url_normalization();
    demo::demo_tab_binding();
    demo::demo_navigation_routing();
    demo::demo_theme_negotiation();
    demo::demo_devtools();

    println!("All coordination components exercised.");
}

#[cfg(not(feature = "gui"))]
mod demo {
    use std::cell::RefCell;
    use std::rc::Rc;

    use deskbrowser::app::{App, EventSink, HostContext, ProcessSpawner, UiBridge};
    use deskbrowser::engine::{EngineInstance, HostSurface, ImageDownloadCallback, WebEngine};
    use deskbrowser::managers::tab_registry::TabRegistryTrait;
    use deskbrowser::services::navigation_router::{
        self, normalize_url, NavigationOrigin, RouteDecision,
    };
    use deskbrowser::services::scheduler::TaskQueue;
    use deskbrowser::types::engine::{
        DeferredTask, Disposition, EngineEvent, NativeHandle, Point, Rect, ThemeColorReply,
    };
    use deskbrowser::types::errors::EngineError;
    use deskbrowser::types::settings::BrowserSettings;
    use deskbrowser::types::tab::{SecurityStatus, TabId, ThemeColor};

    pub fn section(name: &str) {
        println!("--- {} ---", name);
    }

    // ─── Simulated engine ───

    #[derive(Default)]
    struct SurfaceState {
        realized: bool,
        size: (u32, u32),
        handle: Option<NativeHandle>,
    }

    #[derive(Clone, Default)]
    struct SimSurface {
        state: Rc<RefCell<SurfaceState>>,
    }

    impl SimSurface {
        fn realize(&self, width: u32, height: u32, handle: NativeHandle) {
            let mut state = self.state.borrow_mut();
            state.realized = true;
            state.size = (width, height);
            state.handle = Some(handle);
        }
    }

    impl HostSurface for SimSurface {
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

    #[derive(Default)]
    struct SimEngine {
        creates: usize,
    }

    impl WebEngine for SimEngine {
        fn create_instance(
            &mut self,
            _surface: NativeHandle,
            _rect: Rect,
            initial_url: &str,
        ) -> Result<Box<dyn EngineInstance>, EngineError> {
            self.creates += 1;
            let _ = initial_url;
            Ok(Box::new(SimInstance {
                zoom: 0.0,
                devtools_open: false,
            }))
        }
        fn do_work(&mut self) {}
    }

    struct SimInstance {
        zoom: f64,
        devtools_open: bool,
    }

    impl EngineInstance for SimInstance {
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
        fn set_zoom_level(&mut self, level: f64) {
            self.zoom = level;
        }
        fn get_zoom_level(&self) -> f64 {
            self.zoom
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
            self.devtools_open = true;
            Ok(Box::new(SimInstance {
                zoom: 0.0,
                devtools_open: false,
            }))
        }
        fn close_devtools(&mut self) {
            self.devtools_open = false;
        }
        fn has_devtools(&self) -> bool {
            self.devtools_open
        }
        fn download_image(&mut self, _url: &str, _callback: ImageDownloadCallback) {}
        fn notify_resized(&mut self) {}
        fn request_theme_color(&mut self) {}
    }

    #[derive(Default)]
    struct SimUi {
        surfaces: Vec<SimSurface>,
        presented: usize,
    }

    impl UiBridge for SimUi {
        fn open_tab_surface(&mut self, _select: bool) -> Option<Rc<dyn HostSurface>> {
            let surface = SimSurface::default();
            self.surfaces.push(surface.clone());
            Some(Rc::new(surface))
        }
        fn open_devtools_surface(&mut self, _tab: TabId) -> Option<Rc<dyn HostSurface>> {
            let surface = SimSurface::default();
            surface.realize(1100, 800, 9000 + self.surfaces.len() as u64);
            self.surfaces.push(surface.clone());
            Some(Rc::new(surface))
        }
        fn present_devtools(&mut self, _tab: TabId) {
            self.presented += 1;
        }
        fn apply_theme_visual(&mut self, _tab: TabId, bg: ThemeColor, fg: ThemeColor) {
            println!(
                "  theme visual: bg #{:02x}{:02x}{:02x} fg #{:02x}{:02x}{:02x}",
                bg.r, bg.g, bg.b, fg.r, fg.g, fg.b
            );
        }
        fn clear_theme_visual(&mut self, _tab: TabId) {}
        fn update_navigation_controls(&mut self, _tab: TabId, _b: bool, _f: bool) {}
        fn update_security_controls(&mut self, _tab: TabId, _s: SecurityStatus) {}
        fn update_reload_control(&mut self, _tab: TabId, _l: bool) {}
        fn update_zoom_control(&mut self, _tab: TabId, _z: f64) {}
        fn update_url_field(&mut self, _tab: TabId, _u: &str) {}
        fn update_status_text(&mut self, _t: &str) {}
        fn set_tab_title(&mut self, _tab: TabId, _t: &str) {}
        fn set_tab_icon(&mut self, _tab: TabId, _d: &[u8]) {}
        fn focus_surface(&mut self, _tab: TabId) {}
    }

    #[derive(Default)]
    struct SimSpawner;

    impl ProcessSpawner for SimSpawner {
        fn spawn_new_top_level(&mut self, url: &str) {
            println!("  would spawn top-level process for {}", url);
        }
    }

    struct Harness {
        app: App,
        engine: SimEngine,
        ui: SimUi,
        tasks: TaskQueue,
        spawner: SimSpawner,
        events: EventSink,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                app: App::new(BrowserSettings::default()),
                engine: SimEngine::default(),
                ui: SimUi::default(),
                tasks: TaskQueue::new(),
                spawner: SimSpawner::default(),
                events: Rc::new(RefCell::new(Vec::new())),
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

        fn advance(&mut self, ms: u64) -> Vec<DeferredTask> {
            self.tasks.advance(ms)
        }

        fn run_due(&mut self, ms: u64) {
            for task in self.advance(ms) {
                self.with_ctx(|app, ctx| {
                    app.run_task(task, ctx);
                    app.process_events(ctx);
                });
            }
        }
    }

    // ─── Sections ───

    pub fn demo_settings() {
        use deskbrowser::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
        section("Settings");
        let dir = std::env::temp_dir().join("deskbrowser-demo-settings.json");
        let mut engine = SettingsEngine::new(Some(dir.to_string_lossy().to_string()));
        let settings = engine.load().unwrap_or_default();
        println!("  creation poll: {}ms", settings.engine.creation_poll_interval_ms);
        println!("  engine pump:   {}ms", settings.engine.pump_interval_ms);
        println!("  theme retries: {} (ready: {})", settings.theme.retry_limit, settings.theme.ready_retry_limit);
        let _ = std::fs::remove_file(dir);
        println!();
    }

    pub fn demo_url_normalization() {
        section("URL normalization");
        for input in ["example.com", "about:blank", "javascript:alert(1)", "localhost:8080", ""] {
            println!("  {:24} -> {}", format!("{:?}", input), normalize_url(input));
        }
        println!();
    }

    pub fn demo_tab_binding() {
        section("Tab binding (creation scheduler)");
        let mut harness = Harness::new();
        let id = harness
            .with_ctx(|app, ctx| app.open_tab("example.com", true, ctx))
            .expect("tab");
        println!("  opened tab {}", id);

        // Surface not realized yet: polls keep re-arming.
        harness.run_due(20);
        harness.run_due(20);
        println!("  polls while unrealized: engine creates = {}", harness.engine.creates);

        let surface = harness.ui.surfaces[0].clone();
        surface.realize(800, 600, 42);
        harness.run_due(20);
        println!("  after realization: engine creates = {}", harness.engine.creates);
        let bound = harness.app.registry.get(id).map(|t| t.is_bound()).unwrap_or(false);
        println!("  tab bound: {} (work pump armed: {})", bound, !harness.tasks.is_empty());
        println!();
    }

    pub fn demo_navigation_routing() {
        section("Navigation routing");
        for disposition in [
            Disposition::CurrentTab,
            Disposition::NewForegroundTab,
            Disposition::NewBackgroundTab,
            Disposition::NewWindow,
            Disposition::SaveToDisk,
        ] {
            let decision = navigation_router::route(
                "https://example.com",
                disposition,
                None,
                true,
                NavigationOrigin::OpenUrl,
            );
            println!("  {:22} -> {:?}", disposition.name(), decision);
        }
        let popup = navigation_router::route(
            "https://example.com",
            Disposition::NewPopup,
            Some(&deskbrowser::types::engine::PopupFeatures {
                width: Some(400),
                height: Some(300),
                ..Default::default()
            }),
            true,
            NavigationOrigin::Popup,
        );
        assert_eq!(popup, RouteDecision::DeferToEngine);
        println!("  400x300 popup          -> {:?}", popup);
        println!();
    }

    pub fn demo_theme_negotiation() {
        section("Theme-color negotiation");
        let mut harness = Harness::new();
        let id = harness
            .with_ctx(|app, ctx| app.open_tab("https://example.com", true, ctx))
            .expect("tab");
        harness.ui.surfaces[0].realize(800, 600, 42);
        harness.run_due(20);

        let not_ready = ThemeColorReply {
            r: 0,
            g: 0,
            b: 0,
            source: String::new(),
            raw: String::new(),
            ready_state: "loading".to_string(),
        };
        harness.with_ctx(|app, ctx| {
            app.handle_event(EngineEvent::ThemeColorReply { tab: id, reply: not_ready }, ctx)
        });
        let tab = harness.app.registry.get(id).unwrap();
        println!("  loading reply: ready retries = {} (theme stored: {})", tab.theme_ready_retry_count, tab.has_theme);

        let real = ThemeColorReply {
            r: 13,
            g: 17,
            b: 23,
            source: "meta".to_string(),
            raw: "#0d1117".to_string(),
            ready_state: "complete".to_string(),
        };
        harness.with_ctx(|app, ctx| {
            app.handle_event(EngineEvent::ThemeColorReply { tab: id, reply: real }, ctx)
        });
        let tab = harness.app.registry.get(id).unwrap();
        println!(
            "  meta reply: theme #{:02x}{:02x}{:02x}, counters reset to {}/{}",
            tab.theme.r, tab.theme.g, tab.theme.b, tab.theme_retry_count, tab.theme_ready_retry_count
        );
        println!();
    }

    pub fn demo_devtools() {
        section("DevTools session");
        let mut harness = Harness::new();
        let id = harness
            .with_ctx(|app, ctx| app.open_tab("https://example.com", true, ctx))
            .expect("tab");
        harness.ui.surfaces[0].realize(800, 600, 42);
        harness.run_due(20);

        harness.with_ctx(|app, ctx| app.inspect_element(id, Point { x: 120, y: 80 }, ctx));
        harness.run_due(20);
        let bound = harness
            .app
            .registry
            .get(id)
            .and_then(|t| t.devtools.as_ref())
            .map(|p| p.instance.is_some())
            .unwrap_or(false);
        println!("  first inspect: devtools bound = {}", bound);

        harness.with_ctx(|app, ctx| app.inspect_element(id, Point { x: 10, y: 10 }, ctx));
        println!("  second inspect: re-shown {} time(s), no rebind", harness.ui.presented);
        println!();
    }
}
