//! DeskBrowser — a minimal desktop browser shell hosting an embedded
//! multi-process web engine.
//!
//! The interesting part is not the widget layout but the coordination
//! layer: binding tabs to asynchronously-created engine instances,
//! routing navigations, negotiating page theme colors with the content
//! process, and managing devtools sub-sessions. This library crate
//! exposes all modules for use by the binary and integration tests.

pub mod app;
pub mod engine;
pub mod managers;
pub mod platform;
pub mod services;
pub mod types;

#[cfg(feature = "gui")]
pub mod ui;
