//! Tab registry — owns the set of live tabs and the single current-tab
//! reference.
//!
//! The registry is an explicit object injected into every component, never
//! ambient global state. All operations are total: unknown ids are ignored
//! rather than reported as errors, and every mutation happens on the UI
//! thread.

use std::rc::Rc;

use tracing::debug;

use crate::engine::HostSurface;
use crate::services::navigation_router::normalize_url;
use crate::types::tab::{extract_host, Tab, TabId};

/// Trait defining the tab registry interface.
pub trait TabRegistryTrait {
    /// Append a new tab whose `pending_url` is the normalized input.
    /// Current-tab selection is not changed.
    fn create_tab(
        &mut self,
        surface: Rc<dyn HostSurface>,
        initial_url: &str,
        base_title: &str,
    ) -> TabId;
    /// Set or clear the current-tab reference. Unknown ids clear it.
    fn select_tab(&mut self, id: Option<TabId>);
    /// Remove a tab, returning it. Clears the current-tab reference if it
    /// pointed at the removed tab; callers re-select.
    fn remove_tab(&mut self, id: TabId) -> Option<Tab>;
    /// Linear scan comparing the normalized input against each tab's
    /// confirmed and pending URLs.
    fn find_by_url(&self, url: &str) -> Option<TabId>;
    fn get(&self, id: TabId) -> Option<&Tab>;
    fn get_mut(&mut self, id: TabId) -> Option<&mut Tab>;
    fn contains(&self, id: TabId) -> bool;
    fn current_tab(&self) -> Option<TabId>;
    fn tab_count(&self) -> usize;
    /// How many tabs share `base_title`, for "Base (n)" numbering.
    fn count_base_title(&self, base_title: &str) -> usize;
}

/// In-memory tab registry.
pub struct TabRegistry {
    tabs: Vec<Tab>,
    current: Option<TabId>,
}

impl TabRegistry {
    pub fn new() -> Self {
        Self {
            tabs: Vec::new(),
            current: None,
        }
    }

    /// All tab ids in creation order.
    pub fn tab_ids(&self) -> Vec<TabId> {
        self.tabs.iter().map(|t| t.id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tab> {
        self.tabs.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Tab> {
        self.tabs.iter_mut()
    }

    fn find_index(&self, id: TabId) -> Option<usize> {
        self.tabs.iter().position(|t| t.id == id)
    }
}

impl Default for TabRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TabRegistryTrait for TabRegistry {
    fn create_tab(
        &mut self,
        surface: Rc<dyn HostSurface>,
        initial_url: &str,
        base_title: &str,
    ) -> TabId {
        let pending = normalize_url(initial_url);
        let ordinal = self.count_base_title(base_title) + 1;
        let title = format!("{} ({})", base_title, ordinal);
        let mut tab = Tab::new(surface, pending, base_title, title);
        tab.current_host = extract_host(&tab.pending_url);
        let id = tab.id;
        debug!(tab = %id, url = %tab.pending_url, "tab created");
        self.tabs.push(tab);
        id
    }

    fn select_tab(&mut self, id: Option<TabId>) {
        match id {
            None => self.current = None,
            Some(id) if self.contains(id) => self.current = Some(id),
            // Unknown ids are defensively ignored.
            Some(_) => {}
        }
    }

    fn remove_tab(&mut self, id: TabId) -> Option<Tab> {
        let index = self.find_index(id)?;
        let tab = self.tabs.remove(index);
        if self.current == Some(id) {
            self.current = None;
        }
        debug!(tab = %id, "tab removed");
        Some(tab)
    }

    fn find_by_url(&self, url: &str) -> Option<TabId> {
        let normalized = normalize_url(url);
        if normalized.is_empty() {
            return None;
        }
        self.tabs
            .iter()
            .find(|t| t.current_url == normalized || t.pending_url == normalized)
            .map(|t| t.id)
    }

    fn get(&self, id: TabId) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.id == id)
    }

    fn get_mut(&mut self, id: TabId) -> Option<&mut Tab> {
        self.tabs.iter_mut().find(|t| t.id == id)
    }

    fn contains(&self, id: TabId) -> bool {
        self.tabs.iter().any(|t| t.id == id)
    }

    fn current_tab(&self) -> Option<TabId> {
        self.current
    }

    fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    fn count_base_title(&self, base_title: &str) -> usize {
        self.tabs
            .iter()
            .filter(|t| t.base_title == base_title)
            .count()
    }
}
