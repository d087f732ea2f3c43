//! The native windowing layer the window thread drives.
//!
//! A backend creates windows, pumps their events and applies geometry and
//! style changes. It delivers every event for a window through
//! [`registry::dispatch`](super::registry::dispatch) using the
//! [`WindowId`] it was handed at creation.

use std::num::NonZeroIsize;

use super::{
  message::Message,
  registry::{ClassRegistry, WindowId},
  settings::{Rect, Size, Style},
};
use crate::error::WindowResult;

pub mod headless;
#[cfg(windows)]
pub mod win32;

#[cfg(not(windows))]
pub type DefaultBackend = headless::HeadlessBackend;
#[cfg(windows)]
pub type DefaultBackend = win32::Win32Backend;

/// Native window handle. Never null.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RawHandle(NonZeroIsize);

impl RawHandle {
  pub fn new(raw: isize) -> Option<Self> {
    NonZeroIsize::new(raw).map(Self)
  }

  pub fn get(&self) -> isize {
    self.0.get()
  }

  pub fn as_non_zero(&self) -> NonZeroIsize {
    self.0
  }
}

/// Native module instance the window class is registered against.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ModuleInstance(pub isize);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShowCommand {
  Default,
  Normal,
  Maximized,
  Hidden,
}

/// Everything the window thread needs to create its window. Built by the
/// constructing thread, consumed once by the window thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationRequest {
  pub id: WindowId,
  pub class_name: String,
  pub title: String,
  pub style: Style,
  /// Outer size, decorations included.
  pub size: Size,
}

pub trait Backend: Send + Sync + 'static {
  /// Class registrations for this backend's process.
  fn class_registry(&self) -> &ClassRegistry;

  fn module_instance(&self) -> ModuleInstance;

  /// Registering an already registered class succeeds.
  fn register_class(&self, class_name: &str) -> WindowResult<()>;

  fn unregister_class(&self, class_name: &str) -> WindowResult<()>;

  /// Outer size needed for a client area of `client` under `style`.
  fn adjust_size(&self, client: Size, style: Style) -> Size;

  /// Creates the window on the calling thread. Events produced during
  /// creation are already dispatched to `request.id`.
  fn create_window(&self, request: &CreationRequest) -> WindowResult<RawHandle>;

  fn show_window(&self, handle: RawHandle, command: ShowCommand);

  /// Destroys the window, delivering [`Message::Destroyed`] before returning.
  fn destroy_window(&self, handle: RawHandle) -> WindowResult<()>;

  /// Makes the event loop of the calling window thread return once the
  /// current event has been handled.
  fn post_quit(&self, handle: RawHandle);

  /// Retrieves and dispatches events one at a time until [`post_quit`] is
  /// called. Must run on the thread that created the window.
  ///
  /// [`post_quit`]: Backend::post_quit
  fn run_event_loop(&self, handle: RawHandle) -> WindowResult<()>;

  /// Queues `message` for the window thread without waiting for it.
  fn post_message(&self, handle: RawHandle, message: Message) -> WindowResult<()>;

  fn set_title(&self, handle: RawHandle, title: &str) -> WindowResult<()>;

  fn window_rect(&self, handle: RawHandle) -> WindowResult<Rect>;

  fn set_window_rect(&self, handle: RawHandle, rect: Rect) -> WindowResult<()>;

  fn style(&self, handle: RawHandle) -> WindowResult<Style>;

  fn set_style(&self, handle: RawHandle, style: Style) -> WindowResult<()>;

  /// Bounds of the display the window is on.
  fn monitor_rect(&self, handle: RawHandle) -> WindowResult<Rect>;
}
