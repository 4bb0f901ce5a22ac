//! Creation scheduler — binds a tab to a freshly created engine instance
//! once its host surface is usable.
//!
//! The surface is realized by the window system some time after the
//! logical tab exists, so binding is deferred and retried instead of
//! assumed immediate: `Unbound -> Polling -> Bound`, terminal once bound.
//! A destroyed tab is simply removed; the next poll notices and stops.

use tracing::{debug, warn};

use crate::app::UiBridge;
use crate::engine::WebEngine;
use crate::managers::tab_registry::{TabRegistry, TabRegistryTrait};
use crate::services::scheduler::TaskScheduler;
use crate::types::engine::{DeferredTask, Rect};
use crate::types::settings::{EngineSettings, GeneralSettings};
use crate::types::tab::{Tab, TabId};

/// What a creation poll did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The engine instance was created and bound.
    Bound,
    /// The surface was not ready; the poll was re-armed.
    Rescheduled,
    /// The tab left the registry while the poll was pending.
    Stale,
    /// An instance was already bound; nothing to do.
    AlreadyBound,
}

/// Poll-until-ready engine binder. One per process; `pump_started` makes
/// the shared engine work pump a start-at-most-once affair.
pub struct CreationScheduler {
    poll_interval_ms: u64,
    pump_interval_ms: u64,
    zoom_poll_ticks: u32,
    default_url: String,
    pump_started: bool,
    pump_tick: u32,
}

impl CreationScheduler {
    pub fn new(engine: &EngineSettings, general: &GeneralSettings) -> Self {
        Self {
            poll_interval_ms: engine.creation_poll_interval_ms,
            pump_interval_ms: engine.pump_interval_ms,
            zoom_poll_ticks: engine.zoom_poll_ticks.max(1),
            default_url: general.default_url.clone(),
            pump_started: false,
            pump_tick: 0,
        }
    }

    /// Whether the process-wide engine pump has been started.
    pub fn pump_started(&self) -> bool {
        self.pump_started
    }

    /// Arrange a creation poll for `tab`. No-op when an instance is
    /// already bound, was ever bound (rebinding is illegal), or a poll is
    /// already pending.
    pub fn schedule(&self, tab: &mut Tab, tasks: &mut dyn TaskScheduler) {
        if tab.is_bound() || tab.bound_once || tab.creation_scheduled {
            return;
        }
        tab.creation_scheduled = true;
        debug!(tab = %tab.id, "engine creation scheduled");
        tasks.schedule(self.poll_interval_ms, DeferredTask::PollCreation(tab.id));
    }

    /// One creation poll. Validates the tab is still alive, checks the two
    /// surface readiness conditions, then synchronously creates and binds
    /// the instance.
    pub fn poll(
        &mut self,
        registry: &mut TabRegistry,
        id: TabId,
        engine: &mut dyn WebEngine,
        tasks: &mut dyn TaskScheduler,
    ) -> PollOutcome {
        let Some(tab) = registry.get_mut(id) else {
            debug!(tab = %id, "creation poll for removed tab dropped");
            return PollOutcome::Stale;
        };
        if tab.is_bound() {
            tab.creation_scheduled = false;
            return PollOutcome::AlreadyBound;
        }

        if !tab.surface.is_realized() {
            tasks.schedule(self.poll_interval_ms, DeferredTask::PollCreation(id));
            return PollOutcome::Rescheduled;
        }
        let (width, height) = tab.surface.size();
        if width <= 1 || height <= 1 {
            tasks.schedule(self.poll_interval_ms, DeferredTask::PollCreation(id));
            return PollOutcome::Rescheduled;
        }
        let Some(handle) = tab.surface.native_handle() else {
            tasks.schedule(self.poll_interval_ms, DeferredTask::PollCreation(id));
            return PollOutcome::Rescheduled;
        };

        let initial = if tab.pending_url.is_empty() {
            self.default_url.clone()
        } else {
            tab.pending_url.clone()
        };
        match engine.create_instance(handle, Rect::of_size(width, height), &initial) {
            Ok(instance) => {
                tab.instance = Some(instance);
                tab.bound_once = true;
                tab.current_url = initial;
                tab.creation_scheduled = false;
                debug!(tab = %id, width, height, "engine instance bound");
                if !self.pump_started {
                    self.pump_started = true;
                    tasks.schedule(self.pump_interval_ms, DeferredTask::PumpEngine);
                }
                PollOutcome::Bound
            }
            Err(e) => {
                warn!(tab = %id, error = %e, "engine instance creation failed, retrying");
                tasks.schedule(self.poll_interval_ms, DeferredTask::PollCreation(id));
                PollOutcome::Rescheduled
            }
        }
    }

    /// One tick of the process-wide pump: drain the engine's internal
    /// queue, occasionally re-read zoom levels, and re-arm.
    pub fn pump(
        &mut self,
        registry: &mut TabRegistry,
        engine: &mut dyn WebEngine,
        ui: &mut dyn UiBridge,
        tasks: &mut dyn TaskScheduler,
    ) {
        engine.do_work();

        self.pump_tick = self.pump_tick.wrapping_add(1);
        if self.pump_tick % self.zoom_poll_ticks == 0 {
            self.poll_zoom_levels(registry, ui);
        }

        tasks.schedule(self.pump_interval_ms, DeferredTask::PumpEngine);
    }

    /// Pick up zoom changes made by the engine itself (keyboard shortcuts
    /// handled in-page, per-site zoom memory).
    fn poll_zoom_levels(&self, registry: &mut TabRegistry, ui: &mut dyn UiBridge) {
        let current = registry.current_tab();
        for tab in registry.iter_mut() {
            let Some(instance) = tab.instance.as_ref() else {
                continue;
            };
            let level = instance.get_zoom_level();
            if (level - tab.zoom_level).abs() > 1e-6 {
                tab.zoom_level = level;
                if Some(tab.id) == current {
                    ui.update_zoom_control(tab.id, level);
                }
            }
        }
    }
}
