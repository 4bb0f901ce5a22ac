//! GUI layer.
//!
//! Uses `wry` for cross-platform WebView rendering and `tao` for the
//! host window and event loop:
//! - Windows: WebView2 (Chromium-based)
//! - Linux: WebKitGTK
//! - macOS: WKWebView
//!
//! The shell adapts the engine capability traits over `wry`, converts
//! engine callbacks into `EngineEvent` values, and drives the deferred
//! task queue from the event loop clock.

pub mod shell;
