//! Capability surface of the embedded web engine.
//!
//! The shell core consumes these traits and never implements rendering
//! itself. The `gui` build adapts them over `wry`; tests substitute fakes.
//! All calls are non-blocking: anything that takes time inside the engine
//! completes through an [`EngineEvent`](crate::types::engine::EngineEvent)
//! or a queued callback.

use crate::types::engine::{NativeHandle, Point, Rect};
use crate::types::errors::EngineError;

/// Completion callback for [`EngineInstance::download_image`], invoked with
/// the raw encoded image bytes.
pub type ImageDownloadCallback = Box<dyn FnOnce(Vec<u8>)>;

/// A native surface the UI layer owns and the core only references.
///
/// Window-system realization happens after logical construction, so a
/// surface may report unready for a while; the creation scheduler polls
/// until both conditions hold.
pub trait HostSurface {
    /// Whether the surface is realized/mapped by the window system.
    fn is_realized(&self) -> bool;
    /// Current size in pixels. Sizes of 1 or less mean "not laid out yet".
    fn size(&self) -> (u32, u32);
    /// The native handle an engine instance can be parented to, once one
    /// exists.
    fn native_handle(&self) -> Option<NativeHandle>;
}

/// One bound unit of the embedded engine, attached to a single surface.
///
/// Every operation on an instance is a plain command; none of them report
/// errors because failures inside the engine surface as events (or are
/// dropped). Addressing a tab without an instance is the caller's silent
/// no-op, never an error.
pub trait EngineInstance {
    fn navigate(&mut self, url: &str);
    fn reload(&mut self);
    fn stop(&mut self);
    fn go_back(&mut self);
    fn go_forward(&mut self);
    fn can_go_back(&self) -> bool;
    fn can_go_forward(&self) -> bool;
    fn set_zoom_level(&mut self, level: f64);
    fn get_zoom_level(&self) -> f64;
    fn set_focus(&mut self, focused: bool);
    /// Begin asynchronous teardown. The engine confirms with
    /// `EngineEvent::InstanceClosed`.
    fn close(&mut self);
    /// Native handle of the engine-created child window, if any.
    fn window_handle(&self) -> Option<NativeHandle>;
    /// Open a devtools session parented to `surface`, inspecting the node
    /// at `inspect_at`. Returns the devtools instance on success.
    fn show_devtools(
        &mut self,
        surface: NativeHandle,
        rect: Rect,
        inspect_at: Point,
    ) -> Result<Box<dyn EngineInstance>, EngineError>;
    fn close_devtools(&mut self);
    fn has_devtools(&self) -> bool;
    /// Fetch an image (favicon) through the engine's network stack.
    fn download_image(&mut self, url: &str, callback: ImageDownloadCallback);
    /// Tell the engine its surface changed size so rendering matches.
    fn notify_resized(&mut self);
    /// Send `request_theme_color` to the content process. The reply, if
    /// any, arrives as `EngineEvent::ThemeColorReply`.
    fn request_theme_color(&mut self);
}

/// The engine itself: an instance factory plus its internal work queue.
pub trait WebEngine {
    /// Synchronously create an instance bound to `surface`, sized to
    /// `rect`, navigating to `initial_url`.
    fn create_instance(
        &mut self,
        surface: NativeHandle,
        rect: Rect,
        initial_url: &str,
    ) -> Result<Box<dyn EngineInstance>, EngineError>;

    /// Drain the engine's internal event queue. Driven by the single
    /// process-wide pump task.
    fn do_work(&mut self);
}
