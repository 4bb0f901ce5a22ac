//! DevTools sessions — a lazily-created secondary engine instance per tab
//! for page inspection.
//!
//! Binding reuses the creation-polling contract: the UI layer hands over a
//! fresh surface, and the session binds once that surface is realized and
//! non-trivially sized, passing the originating inspect point through to
//! the engine.

use tracing::{debug, warn};

use crate::app::UiBridge;
use crate::managers::tab_registry::{TabRegistry, TabRegistryTrait};
use crate::services::scheduler::TaskScheduler;
use crate::types::engine::{DeferredTask, Point, Rect};
use crate::types::settings::EngineSettings;
use crate::types::tab::{DevToolsPane, Tab, TabId};

/// What an inspect request or devtools poll did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevToolsOutcome {
    /// An existing session was re-shown.
    Presented,
    /// A new surface was created and the binding poll armed.
    Scheduled,
    /// The devtools instance was bound to its surface.
    Bound,
    /// The surface was not ready yet; the poll was re-armed.
    Rescheduled,
    /// No window handle or engine session; this attempt was abandoned.
    Unavailable,
    /// Nothing to do (unbound tab, torn-down pane, tab gone).
    Skipped,
}

/// Manages the devtools sub-session lifecycle for all tabs.
pub struct DevToolsManager {
    poll_interval_ms: u64,
}

impl DevToolsManager {
    pub fn new(engine: &EngineSettings) -> Self {
        Self {
            poll_interval_ms: engine.creation_poll_interval_ms,
        }
    }

    /// Handle an inspect request at `at` for `tab`.
    ///
    /// Re-shows a live session instead of recreating it. Otherwise asks
    /// the UI layer for a new surface and arms the binding poll.
    pub fn request_inspect(
        &self,
        tab: &mut Tab,
        at: Point,
        ui: &mut dyn UiBridge,
        tasks: &mut dyn TaskScheduler,
    ) -> DevToolsOutcome {
        if tab.instance.is_none() {
            return DevToolsOutcome::Skipped;
        }

        if let Some(pane) = tab.devtools.as_ref() {
            if pane.surface.is_realized() {
                debug!(tab = %tab.id, "re-showing existing devtools session");
                ui.present_devtools(tab.id);
                return DevToolsOutcome::Presented;
            }
            // Surface died without a teardown notification; start over.
            tab.devtools = None;
        }

        if let Some(instance) = tab.instance.as_mut() {
            if instance.has_devtools() {
                debug!(tab = %tab.id, "closing stale engine-side devtools first");
                instance.close_devtools();
            }
        }

        let Some(surface) = ui.open_devtools_surface(tab.id) else {
            warn!(tab = %tab.id, "no devtools surface available");
            return DevToolsOutcome::Unavailable;
        };

        let mut pane = DevToolsPane::new(surface, at);
        pane.show_scheduled = true;
        tab.devtools = Some(pane);
        debug!(tab = %tab.id, x = at.x, y = at.y, "devtools session scheduled");
        tasks.schedule(self.poll_interval_ms, DeferredTask::PollDevTools(tab.id));
        DevToolsOutcome::Scheduled
    }

    /// One devtools binding poll, following the same readiness contract as
    /// engine creation.
    pub fn poll(
        &self,
        registry: &mut TabRegistry,
        id: TabId,
        tasks: &mut dyn TaskScheduler,
    ) -> DevToolsOutcome {
        let Some(tab) = registry.get_mut(id) else {
            debug!(tab = %id, "devtools poll for removed tab dropped");
            return DevToolsOutcome::Skipped;
        };
        let Tab {
            instance, devtools, ..
        } = tab;
        let Some(pane) = devtools.as_mut() else {
            return DevToolsOutcome::Skipped;
        };
        if pane.instance.is_some() {
            pane.show_scheduled = false;
            return DevToolsOutcome::Skipped;
        }
        let Some(page) = instance.as_mut() else {
            // Page instance went away while we waited; abandon the pane.
            *devtools = None;
            return DevToolsOutcome::Skipped;
        };

        if !pane.surface.is_realized() {
            tasks.schedule(self.poll_interval_ms, DeferredTask::PollDevTools(id));
            return DevToolsOutcome::Rescheduled;
        }
        let (width, height) = pane.surface.size();
        if width <= 1 || height <= 1 {
            tasks.schedule(self.poll_interval_ms, DeferredTask::PollDevTools(id));
            return DevToolsOutcome::Rescheduled;
        }
        let Some(handle) = pane.surface.native_handle() else {
            tasks.schedule(self.poll_interval_ms, DeferredTask::PollDevTools(id));
            return DevToolsOutcome::Rescheduled;
        };

        match page.show_devtools(handle, Rect::of_size(width, height), pane.inspect_point) {
            Ok(mut session) => {
                // Sync the fresh session with the surface's real size.
                session.notify_resized();
                pane.instance = Some(session);
                pane.show_scheduled = false;
                debug!(tab = %id, width, height, "devtools instance bound");
                DevToolsOutcome::Bound
            }
            Err(e) => {
                warn!(tab = %id, error = %e, "devtools creation failed, abandoning attempt");
                *devtools = None;
                DevToolsOutcome::Unavailable
            }
        }
    }

    /// Propagate a surface resize to the bound devtools instance.
    pub fn notify_resized(&self, tab: &mut Tab) {
        if let Some(pane) = tab.devtools.as_mut() {
            if let Some(session) = pane.instance.as_mut() {
                session.notify_resized();
            }
        }
    }

    /// The devtools surface was torn down (explicit close or host destroy
    /// protocol). Clears both references so a later inspect starts fresh.
    pub fn on_surface_destroyed(&self, tab: &mut Tab) {
        let Some(mut pane) = tab.devtools.take() else {
            return;
        };
        debug!(tab = %tab.id, "devtools surface destroyed");
        if let Some(mut session) = pane.instance.take() {
            session.close();
        }
        if let Some(instance) = tab.instance.as_mut() {
            if instance.has_devtools() {
                instance.close_devtools();
            }
        }
    }

    /// The engine reports the devtools instance finished closing.
    pub fn on_instance_closed(&self, tab: &mut Tab) {
        if let Some(pane) = tab.devtools.as_mut() {
            pane.instance = None;
        }
        tab.devtools = None;
    }
}
