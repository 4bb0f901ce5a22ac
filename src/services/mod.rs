// Shell services
// Services provide the coordination logic: navigation routing, engine
// creation scheduling, theme-color negotiation, settings, task scheduling.

pub mod creation_scheduler;
pub mod navigation_router;
pub mod scheduler;
pub mod settings_engine;
pub mod theme_negotiator;
