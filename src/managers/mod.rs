// Shell state managers
// Managers handle stateful collections: the tab registry and per-tab
// devtools sessions.

pub mod devtools_manager;
pub mod tab_registry;
