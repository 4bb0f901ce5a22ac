//! App core — wires the registry, the creation scheduler, the navigation
//! router, the theme negotiator and the devtools manager together, and
//! dispatches engine events and deferred tasks to them.
//!
//! Everything here runs on the UI thread. The engine adapter converts its
//! callbacks into [`EngineEvent`] values pushed onto the shared
//! [`EventSink`]; deferred work arrives back as [`DeferredTask`] values.
//! Operations addressed to a tab without a bound engine instance are
//! silent no-ops throughout.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::engine::{HostSurface, WebEngine};
use crate::managers::devtools_manager::DevToolsManager;
use crate::managers::tab_registry::{TabRegistry, TabRegistryTrait};
use crate::platform;
use crate::services::creation_scheduler::{CreationScheduler, PollOutcome};
use crate::services::navigation_router::{
    self, normalize_url, MenuCommandKind, NavigationOrigin, RouteDecision,
};
use crate::services::scheduler::TaskScheduler;
use crate::services::theme_negotiator::{pick_contrast_color, ThemeColorNegotiator, ThemeOutcome};
use crate::types::engine::{DeferredTask, EngineEvent, Point};
use crate::types::settings::BrowserSettings;
use crate::types::tab::{extract_host, SecurityStatus, TabId, ThemeColor};

/// Visual-side collaborators, implemented by the UI layer. The core passes
/// every value the bridge needs so implementations never read tab state
/// back.
pub trait UiBridge {
    /// Create the host surface for a new tab page. `select` hints that the
    /// page should become visible immediately.
    fn open_tab_surface(&mut self, select: bool) -> Option<Rc<dyn HostSurface>>;
    /// Associate a freshly created tab with the surface it received from
    /// [`open_tab_surface`](Self::open_tab_surface), so the UI layer can
    /// resolve engine callbacks back to the tab. Optional.
    fn attach_tab(&mut self, tab: TabId, surface: &Rc<dyn HostSurface>) {
        let _ = (tab, surface);
    }
    /// Create a host surface for a devtools session of `tab`.
    fn open_devtools_surface(&mut self, tab: TabId) -> Option<Rc<dyn HostSurface>>;
    /// Raise an already-existing devtools window.
    fn present_devtools(&mut self, tab: TabId);
    fn apply_theme_visual(&mut self, tab: TabId, background: ThemeColor, foreground: ThemeColor);
    fn clear_theme_visual(&mut self, tab: TabId);
    fn update_navigation_controls(&mut self, tab: TabId, can_go_back: bool, can_go_forward: bool);
    fn update_security_controls(&mut self, tab: TabId, status: SecurityStatus);
    fn update_reload_control(&mut self, tab: TabId, loading: bool);
    fn update_zoom_control(&mut self, tab: TabId, level: f64);
    fn update_url_field(&mut self, tab: TabId, url: &str);
    fn update_status_text(&mut self, text: &str);
    fn set_tab_title(&mut self, tab: TabId, title: &str);
    fn set_tab_icon(&mut self, tab: TabId, data: &[u8]);
    /// Give keyboard focus to the tab's surface (used before an engine
    /// instance exists).
    fn focus_surface(&mut self, tab: TabId);
}

/// Starts a new top-level browser process. Fire-and-forget.
pub trait ProcessSpawner {
    fn spawn_new_top_level(&mut self, url: &str);
}

/// Default spawner backed by the OS process table.
pub struct OsProcessSpawner;

impl ProcessSpawner for OsProcessSpawner {
    fn spawn_new_top_level(&mut self, url: &str) {
        platform::spawn_new_top_level_or_warn(url);
    }
}

/// Single-threaded queue the engine adapter pushes events onto and the
/// shell drains once per loop turn.
pub type EventSink = Rc<RefCell<Vec<EngineEvent>>>;

/// The collaborators a coordination step may touch, bundled so every `App`
/// method has one extra parameter instead of four.
pub struct HostContext<'a> {
    pub engine: &'a mut dyn WebEngine,
    pub ui: &'a mut dyn UiBridge,
    pub tasks: &'a mut dyn TaskScheduler,
    pub spawner: &'a mut dyn ProcessSpawner,
    pub events: EventSink,
}

/// Central application struct holding the registry and all coordination
/// components.
pub struct App {
    pub registry: TabRegistry,
    pub settings: BrowserSettings,
    creation: CreationScheduler,
    negotiator: ThemeColorNegotiator,
    devtools: DevToolsManager,
}

impl App {
    pub fn new(settings: BrowserSettings) -> Self {
        let creation = CreationScheduler::new(&settings.engine, &settings.general);
        let negotiator = ThemeColorNegotiator::new(&settings.theme);
        let devtools = DevToolsManager::new(&settings.engine);
        Self {
            registry: TabRegistry::new(),
            settings,
            creation,
            negotiator,
            devtools,
        }
    }

    // ─── Tab operations ───

    /// Open a new tab for `url` and start its engine binding. Returns
    /// `None` when the URL normalizes to empty or no surface is available.
    pub fn open_tab(&mut self, url: &str, select: bool, ctx: &mut HostContext) -> Option<TabId> {
        let normalized = normalize_url(url);
        if normalized.is_empty() {
            return None;
        }
        let surface = ctx.ui.open_tab_surface(select)?;
        let id = self.registry.create_tab(surface, &normalized, "New Tab");
        if let Some(tab) = self.registry.get_mut(id) {
            ctx.ui.attach_tab(id, &tab.surface);
            self.creation.schedule(tab, ctx.tasks);
        }
        if select {
            self.select_tab(Some(id), ctx);
        }
        Some(id)
    }

    /// Switch the current tab, clearing the previous tab's theme visual
    /// and refreshing every indicator for the new one.
    pub fn select_tab(&mut self, id: Option<TabId>, ctx: &mut HostContext) {
        let previous = self.registry.current_tab();
        self.registry.select_tab(id);
        let current = self.registry.current_tab();
        if previous == current {
            return;
        }
        if let Some(prev) = previous {
            if self.registry.contains(prev) {
                ctx.ui.clear_theme_visual(prev);
            }
        }
        if let Some(id) = current {
            self.refresh_controls(id, ctx);
            self.apply_theme_visual(id, ctx);
            if let Some(tab) = self.registry.get_mut(id) {
                match tab.instance.as_mut() {
                    Some(instance) => instance.set_focus(true),
                    None => ctx.ui.focus_surface(id),
                }
            }
        }
    }

    /// Navigate `id` to `url`, scheduling engine creation if the tab was
    /// never bound.
    pub fn load_url(&mut self, id: TabId, url: &str, ctx: &mut HostContext) {
        let normalized = normalize_url(url);
        if normalized.is_empty() {
            return;
        }
        let Some(tab) = self.registry.get_mut(id) else {
            return;
        };
        let host = extract_host(&normalized);
        if host != tab.current_host {
            tab.current_host = host;
            tab.favicon_url.clear();
        }
        tab.pending_url = normalized.clone();
        match tab.instance {
            Some(ref mut instance) => instance.navigate(&normalized),
            None => self.creation.schedule(tab, ctx.tasks),
        }
        if self.registry.current_tab() == Some(id) {
            ctx.ui.update_url_field(id, &normalized);
        }
    }

    /// The tab's host surface was destroyed: tear down devtools, begin
    /// asynchronous engine close, remove from the registry, and move the
    /// selection to the nearest neighbor.
    pub fn close_tab(&mut self, id: TabId, ctx: &mut HostContext) {
        let position = self.registry.tab_ids().iter().position(|&t| t == id);
        if let Some(tab) = self.registry.get_mut(id) {
            self.devtools.on_surface_destroyed(tab);
            if let Some(mut instance) = tab.instance.take() {
                instance.close();
            }
        }
        let was_current = self.registry.current_tab() == Some(id);
        self.registry.remove_tab(id);
        if was_current {
            let remaining = self.registry.tab_ids();
            let next = position
                .map(|p| p.min(remaining.len().saturating_sub(1)))
                .and_then(|p| remaining.get(p).copied());
            self.select_tab(next, ctx);
        }
    }

    /// Recreate tabs from a captured session: one unselected tab per URL,
    /// then select the remembered active one.
    pub fn restore_tabs(&mut self, urls: &[String], active_index: usize, ctx: &mut HostContext) {
        let mut ids = Vec::new();
        for url in urls {
            let target = if url.is_empty() {
                self.settings.general.default_url.clone()
            } else {
                url.clone()
            };
            if let Some(id) = self.open_tab(&target, false, ctx) {
                ids.push(id);
            }
        }
        let active = ids.get(active_index).or(ids.last()).copied();
        if active.is_some() {
            self.select_tab(active, ctx);
        }
    }

    // ─── History / reload / zoom (silent no-ops when unbound) ───

    pub fn go_back(&mut self, id: TabId, ctx: &mut HostContext) {
        let _ = ctx;
        if let Some(tab) = self.registry.get_mut(id) {
            if let Some(instance) = tab.instance.as_mut() {
                instance.set_focus(false);
                if instance.can_go_back() {
                    instance.go_back();
                }
            }
        }
    }

    pub fn go_forward(&mut self, id: TabId, ctx: &mut HostContext) {
        let _ = ctx;
        if let Some(tab) = self.registry.get_mut(id) {
            if let Some(instance) = tab.instance.as_mut() {
                instance.set_focus(false);
                if instance.can_go_forward() {
                    instance.go_forward();
                }
            }
        }
    }

    /// Reload when idle, stop when loading.
    pub fn reload_or_stop(&mut self, id: TabId, ctx: &mut HostContext) {
        let mut stopped = false;
        if let Some(tab) = self.registry.get_mut(id) {
            if let Some(instance) = tab.instance.as_mut() {
                instance.set_focus(false);
                if tab.loading {
                    instance.stop();
                    tab.loading = false;
                    stopped = true;
                } else {
                    instance.reload();
                }
            }
        }
        if stopped && self.registry.current_tab() == Some(id) {
            ctx.ui.update_reload_control(id, false);
        }
    }

    pub fn zoom_in(&mut self, id: TabId, ctx: &mut HostContext) {
        let level = self.registry.get(id).map(|t| t.zoom_level).unwrap_or(0.0);
        self.set_zoom_level(id, level + 0.5, ctx);
    }

    pub fn zoom_out(&mut self, id: TabId, ctx: &mut HostContext) {
        let level = self.registry.get(id).map(|t| t.zoom_level).unwrap_or(0.0);
        self.set_zoom_level(id, level - 0.5, ctx);
    }

    pub fn zoom_reset(&mut self, id: TabId, ctx: &mut HostContext) {
        self.set_zoom_level(id, 0.0, ctx);
    }

    fn set_zoom_level(&mut self, id: TabId, level: f64, ctx: &mut HostContext) {
        let Some(tab) = self.registry.get_mut(id) else {
            return;
        };
        let Some(instance) = tab.instance.as_mut() else {
            return;
        };
        instance.set_zoom_level(level);
        tab.zoom_level = level;
        if self.registry.current_tab() == Some(id) {
            ctx.ui.update_zoom_control(id, level);
        }
    }

    /// Load the configured homepage (or the default URL) in the current
    /// tab.
    pub fn go_home(&mut self, ctx: &mut HostContext) {
        let Some(id) = self.registry.current_tab() else {
            return;
        };
        let url = if self.settings.general.homepage.is_empty() {
            self.settings.general.default_url.clone()
        } else {
            self.settings.general.homepage.clone()
        };
        self.load_url(id, &url, ctx);
    }

    // ─── DevTools ───

    /// Inspect request at `at` for `id`.
    pub fn inspect_element(&mut self, id: TabId, at: Point, ctx: &mut HostContext) {
        if let Some(tab) = self.registry.get_mut(id) {
            self.devtools.request_inspect(tab, at, ctx.ui, ctx.tasks);
        }
    }

    /// The devtools surface of `id` changed size.
    pub fn devtools_resized(&mut self, id: TabId) {
        if let Some(tab) = self.registry.get_mut(id) {
            self.devtools.notify_resized(tab);
        }
    }

    /// The devtools surface of `id` was closed by the user or the window
    /// manager.
    pub fn devtools_surface_destroyed(&mut self, id: TabId) {
        if let Some(tab) = self.registry.get_mut(id) {
            self.devtools.on_surface_destroyed(tab);
        }
    }

    /// A context-menu command classified by
    /// [`navigation_router::classify_menu_label`].
    pub fn context_menu_command(
        &mut self,
        id: TabId,
        kind: MenuCommandKind,
        link_url: &str,
        at: Point,
        ctx: &mut HostContext,
    ) {
        match kind {
            MenuCommandKind::InspectElement => self.inspect_element(id, at, ctx),
            MenuCommandKind::OpenLinkNewTab => {
                let url = normalize_url(link_url);
                if !url.is_empty() {
                    self.open_tab(&url, true, ctx);
                }
            }
            MenuCommandKind::OpenLinkNewWindow => {
                let url = normalize_url(link_url);
                if !url.is_empty() {
                    ctx.spawner.spawn_new_top_level(&url);
                }
            }
        }
    }

    // ─── Event and task dispatch ───

    /// Drain the event sink until it stays empty (handling an event may
    /// push follow-up events, e.g. finished favicon downloads).
    pub fn process_events(&mut self, ctx: &mut HostContext) {
        loop {
            let batch: Vec<EngineEvent> = ctx.events.borrow_mut().drain(..).collect();
            if batch.is_empty() {
                return;
            }
            for event in batch {
                self.handle_event(event, ctx);
            }
        }
    }

    /// Dispatch one tagged engine event.
    pub fn handle_event(&mut self, event: EngineEvent, ctx: &mut HostContext) {
        match event {
            EngineEvent::LoadStart { tab, url } => self.on_load_start(tab, url, ctx),
            EngineEvent::LoadEnd { tab } => {
                if let Some(t) = self.registry.get_mut(tab) {
                    self.negotiator.request(t);
                }
            }
            EngineEvent::LoadingStateChange {
                tab,
                loading,
                can_go_back,
                can_go_forward,
            } => self.on_loading_state(tab, loading, can_go_back, can_go_forward, ctx),
            EngineEvent::AddressChange { tab, url } => self.on_address_change(tab, url, ctx),
            EngineEvent::TitleChange { tab, title } => {
                if let Some(t) = self.registry.get_mut(tab) {
                    t.title = title.clone();
                    ctx.ui.set_tab_title(tab, &title);
                }
            }
            EngineEvent::StatusMessage { tab, text } => {
                let Some(t) = self.registry.get_mut(tab) else {
                    return;
                };
                // The engine's idle message is noise, not status.
                let text = if text == "Ready" { String::new() } else { text };
                t.status_message = text.clone();
                if self.registry.current_tab() == Some(tab) {
                    ctx.ui.update_status_text(&text);
                }
            }
            EngineEvent::FaviconUrlChange { tab, url } => self.on_favicon_url(tab, url, ctx),
            EngineEvent::ImageDownloaded { tab, data } => {
                if self.registry.contains(tab) && !data.is_empty() {
                    ctx.ui.set_tab_icon(tab, &data);
                }
            }
            EngineEvent::OpenUrl {
                tab,
                url,
                disposition,
                user_gesture,
            } => {
                debug!(tab = %tab, url = %url, disposition = disposition.name(), "open url from tab");
                let decision = navigation_router::route(
                    &url,
                    disposition,
                    None,
                    user_gesture,
                    NavigationOrigin::OpenUrl,
                );
                self.apply_route(decision, ctx);
            }
            EngineEvent::BeforePopup {
                tab,
                url,
                disposition,
                features,
                user_gesture,
            } => {
                debug!(tab = %tab, url = %url, disposition = disposition.name(), "before popup");
                let decision = navigation_router::route(
                    &url,
                    disposition,
                    Some(&features),
                    user_gesture,
                    NavigationOrigin::Popup,
                );
                self.apply_route(decision, ctx);
            }
            EngineEvent::ThemeColorReply { tab, reply } => {
                let Some(t) = self.registry.get_mut(tab) else {
                    return;
                };
                let outcome = self.negotiator.handle_reply(t, &reply);
                let retry = match outcome {
                    ThemeOutcome::Stored { retry } => {
                        self.apply_theme_visual(tab, ctx);
                        retry
                    }
                    ThemeOutcome::NotReady { retry } => retry,
                };
                if retry {
                    ctx.tasks.schedule(
                        self.negotiator.retry_delay_ms(),
                        DeferredTask::RequestThemeColor(tab),
                    );
                }
            }
            EngineEvent::InstanceClosed { tab } => {
                if let Some(t) = self.registry.get_mut(tab) {
                    t.instance = None;
                }
            }
            EngineEvent::DevToolsClosed { tab } => {
                if let Some(t) = self.registry.get_mut(tab) {
                    self.devtools.on_instance_closed(t);
                }
            }
        }
    }

    /// Run one deferred task. Tasks targeting removed tabs fall through as
    /// no-ops inside the components.
    pub fn run_task(&mut self, task: DeferredTask, ctx: &mut HostContext) {
        match task {
            DeferredTask::PollCreation(id) => {
                let outcome = self
                    .creation
                    .poll(&mut self.registry, id, ctx.engine, ctx.tasks);
                if outcome == PollOutcome::Bound && self.registry.current_tab() == Some(id) {
                    self.refresh_controls(id, ctx);
                }
            }
            DeferredTask::PollDevTools(id) => {
                self.devtools.poll(&mut self.registry, id, ctx.tasks);
            }
            DeferredTask::RequestThemeColor(id) => {
                if let Some(tab) = self.registry.get_mut(id) {
                    self.negotiator.request(tab);
                }
            }
            DeferredTask::PumpEngine => {
                self.creation
                    .pump(&mut self.registry, ctx.engine, ctx.ui, ctx.tasks);
            }
        }
    }

    // ─── Internals ───

    fn on_load_start(&mut self, id: TabId, url: String, ctx: &mut HostContext) {
        if url.is_empty() {
            return;
        }
        let Some(tab) = self.registry.get_mut(id) else {
            return;
        };
        let host = extract_host(&url);
        if host != tab.current_host {
            tab.current_host = host;
            tab.favicon_url.clear();
        }
        tab.pending_url = url.clone();
        tab.loading = true;
        if self.registry.current_tab() == Some(id) {
            ctx.ui.update_url_field(id, &url);
            ctx.ui.update_reload_control(id, true);
        }
    }

    fn on_loading_state(
        &mut self,
        id: TabId,
        loading: bool,
        can_go_back: bool,
        can_go_forward: bool,
        ctx: &mut HostContext,
    ) {
        let Some(tab) = self.registry.get_mut(id) else {
            return;
        };
        tab.can_go_back = can_go_back;
        tab.can_go_forward = can_go_forward;
        tab.loading = loading;
        let mut security = None;
        if !loading {
            tab.security = SecurityStatus::from_url(&tab.current_url);
            security = Some(tab.security);
        }
        if self.registry.current_tab() == Some(id) {
            ctx.ui
                .update_navigation_controls(id, can_go_back, can_go_forward);
            ctx.ui.update_reload_control(id, loading);
            if let Some(status) = security {
                ctx.ui.update_security_controls(id, status);
            }
        }
    }

    fn on_address_change(&mut self, id: TabId, url: String, ctx: &mut HostContext) {
        let Some(tab) = self.registry.get_mut(id) else {
            return;
        };
        tab.current_url = url.clone();
        tab.security = SecurityStatus::from_url(&url);
        let status = tab.security;
        if self.registry.current_tab() == Some(id) {
            ctx.ui.update_security_controls(id, status);
            ctx.ui.update_url_field(id, &url);
        }
    }

    fn on_favicon_url(&mut self, id: TabId, url: String, ctx: &mut HostContext) {
        let Some(tab) = self.registry.get_mut(id) else {
            return;
        };
        if tab.favicon_url == url || url.is_empty() {
            return;
        }
        tab.favicon_url = url.clone();
        if let Some(instance) = tab.instance.as_mut() {
            let sink = ctx.events.clone();
            instance.download_image(
                &url,
                Box::new(move |data| {
                    sink.borrow_mut()
                        .push(EngineEvent::ImageDownloaded { tab: id, data });
                }),
            );
        }
    }

    fn apply_route(&mut self, decision: RouteDecision, ctx: &mut HostContext) {
        match decision {
            RouteDecision::LoadInCurrent { url } => match self.registry.current_tab() {
                Some(id) => {
                    self.load_url(id, &url, ctx);
                    if let Some(tab) = self.registry.get_mut(id) {
                        match tab.instance.as_mut() {
                            Some(instance) => instance.set_focus(true),
                            None => ctx.ui.focus_surface(id),
                        }
                    }
                }
                None => {
                    self.open_tab(&url, true, ctx);
                }
            },
            RouteDecision::OpenTab { url, select } => {
                self.open_tab(&url, select, ctx);
            }
            RouteDecision::SpawnWindow { url } => ctx.spawner.spawn_new_top_level(&url),
            RouteDecision::DeferToEngine | RouteDecision::Handled => {}
        }
    }

    fn apply_theme_visual(&mut self, id: TabId, ctx: &mut HostContext) {
        if self.registry.current_tab() != Some(id) {
            return;
        }
        let Some(tab) = self.registry.get(id) else {
            return;
        };
        if !tab.has_theme {
            return;
        }
        let background = tab.theme;
        ctx.ui
            .apply_theme_visual(id, background, pick_contrast_color(background));
    }

    fn refresh_controls(&mut self, id: TabId, ctx: &mut HostContext) {
        let Some(tab) = self.registry.get(id) else {
            return;
        };
        let url = if tab.current_url.is_empty() {
            tab.pending_url.clone()
        } else {
            tab.current_url.clone()
        };
        let (can_back, can_forward) = (tab.can_go_back, tab.can_go_forward);
        let (loading, zoom, security) = (tab.loading, tab.zoom_level, tab.security);
        let status = tab.status_message.clone();
        ctx.ui.update_navigation_controls(id, can_back, can_forward);
        ctx.ui.update_reload_control(id, loading);
        ctx.ui.update_zoom_control(id, zoom);
        ctx.ui.update_security_controls(id, security);
        ctx.ui.update_url_field(id, &url);
        ctx.ui.update_status_text(&status);
    }
}
