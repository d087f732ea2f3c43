//! An in-process backend with no display server behind it.
//!
//! Windows are plain records with a real per-window event queue. Events are
//! fed with [`HeadlessBackend::post_message`] or, synchronously,
//! [`HeadlessBackend::send_message`], and are dispatched on the thread that
//! created the window, exactly like a native message pump. Geometry changes
//! produce the same resize events a native window would receive.

use std::{
  collections::{HashMap, HashSet},
  sync::{
    atomic::{AtomicBool, AtomicIsize, AtomicUsize, Ordering},
    Mutex,
    MutexGuard,
    PoisonError,
  },
  thread::ThreadId,
  time::Duration,
};

use crossbeam::channel::{self, Receiver, Sender};
use tracing::*;

use super::{Backend, CreationRequest, ModuleInstance, RawHandle, ShowCommand};
use crate::{
  error::{WindowError, WindowResult},
  window::{
    message::{Message, Response, SizeMode},
    registry::{self, ClassRegistry, WindowId},
    settings::{Rect, Size, Style},
  },
  window_error,
};

/// Width of each resizable border.
pub const BORDER: u32 = 8;
pub const TITLE_BAR: u32 = 23;

/// Where new windows are placed.
const ORIGIN: (i32, i32) = (100, 100);

enum Envelope {
  Message(Message, Option<Sender<Response>>),
  Quit,
}

struct HeadlessWindow {
  id: WindowId,
  class_name: String,
  owner: ThreadId,
  title: String,
  rect: Rect,
  style: Style,
  show: Option<ShowCommand>,
  destroyed: bool,
  sender: Sender<Envelope>,
  receiver: Option<Receiver<Envelope>>,
}

pub struct HeadlessBackend {
  classes: ClassRegistry,
  registered: Mutex<HashSet<String>>,
  windows: Mutex<HashMap<RawHandle, HeadlessWindow>>,
  next_handle: AtomicIsize,
  fail_creation: AtomicBool,
  fail_registration: AtomicBool,
  creation_delay: Mutex<Option<Duration>>,
  attempts: Mutex<Vec<WindowId>>,
  event_loops: AtomicUsize,
  monitor: Rect,
}

impl Default for HeadlessBackend {
  fn default() -> Self {
    Self::new()
  }
}

impl HeadlessBackend {
  pub fn new() -> Self {
    Self::with_monitor(Rect::new(0, 0, 1920, 1080))
  }

  pub fn with_monitor(monitor: Rect) -> Self {
    Self {
      classes: ClassRegistry::new(),
      registered: Mutex::new(HashSet::new()),
      windows: Mutex::new(HashMap::new()),
      next_handle: AtomicIsize::new(0x100),
      fail_creation: AtomicBool::new(false),
      fail_registration: AtomicBool::new(false),
      creation_delay: Mutex::new(None),
      attempts: Mutex::new(Vec::new()),
      event_loops: AtomicUsize::new(0),
      monitor,
    }
  }

  /// Makes every following `create_window` call fail.
  pub fn fail_window_creation(&self, fail: bool) {
    self.fail_creation.store(fail, Ordering::SeqCst);
  }

  /// Makes every following `register_class` call fail.
  pub fn fail_class_registration(&self, fail: bool) {
    self.fail_registration.store(fail, Ordering::SeqCst);
  }

  /// Stalls every following `create_window` call for `delay`.
  pub fn delay_window_creation(&self, delay: Option<Duration>) {
    *self.creation_delay.lock().unwrap_or_else(PoisonError::into_inner) = delay;
  }

  /// Ids of every window `create_window` was asked for, in call order.
  pub fn creation_attempts(&self) -> Vec<WindowId> {
    self.attempts.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }

  /// Windows created and not yet destroyed.
  pub fn live_windows(&self) -> usize {
    self
      .windows_lock()
      .values()
      .filter(|window| !window.destroyed)
      .count()
  }

  /// Number of event loops ever entered on this backend.
  pub fn event_loops_entered(&self) -> usize {
    self.event_loops.load(Ordering::SeqCst)
  }

  pub fn is_class_registered(&self, class_name: &str) -> bool {
    self.registered_lock().contains(class_name)
  }

  pub fn title(&self, handle: RawHandle) -> Option<String> {
    self.windows_lock().get(&handle).map(|window| window.title.clone())
  }

  pub fn show_command(&self, handle: RawHandle) -> Option<ShowCommand> {
    self.windows_lock().get(&handle).and_then(|window| window.show)
  }

  pub fn is_destroyed(&self, handle: RawHandle) -> bool {
    self
      .windows_lock()
      .get(&handle)
      .map_or(true, |window| window.destroyed)
  }

  /// Delivers `message` and blocks until the window thread has handled it.
  /// Must not be called from the window thread itself.
  pub fn send_message(&self, handle: RawHandle, message: Message) -> WindowResult<Response> {
    let (reply_sender, reply_receiver) = channel::bounded(1);
    self.enqueue(handle, Envelope::Message(message, Some(reply_sender)))?;
    reply_receiver.recv().map_err(|_| WindowError::Disconnected)
  }

  fn registered_lock(&self) -> MutexGuard<'_, HashSet<String>> {
    self.registered.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn windows_lock(&self) -> MutexGuard<'_, HashMap<RawHandle, HeadlessWindow>> {
    self.windows.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn frame(style: Style) -> Size {
    let border = if style.intersects(Style::THICKFRAME | Style::BORDER) {
      BORDER
    } else {
      0
    };
    let title = if style.contains(Style::CAPTION) {
      TITLE_BAR
    } else {
      0
    };
    Size::new(2 * border, 2 * border + title)
  }

  fn client_size(rect: Rect, style: Style) -> Size {
    let frame = Self::frame(style);
    Size::new(
      rect.width().saturating_sub(frame.width),
      rect.height().saturating_sub(frame.height),
    )
  }

  fn enqueue(&self, handle: RawHandle, envelope: Envelope) -> WindowResult<()> {
    let sender = {
      let windows = self.windows_lock();
      let window = windows.get(&handle).ok_or_else(|| unknown_window(handle))?;
      if window.destroyed {
        return Err(window_error!("window {:#x} has been destroyed", handle.get()));
      }
      window.sender.clone()
    };

    sender
      .send(envelope)
      .map_err(|_| window_error!("event loop of window {:#x} has exited", handle.get()))
  }

  /// Runs the window procedure, then the default handling if it asked for it.
  fn deliver(&self, id: WindowId, handle: RawHandle, message: Message) -> Response {
    let response = registry::dispatch(id, handle, message.clone());
    if response == Response::Default {
      self.default_procedure(handle, &message);
    }
    response
  }

  fn default_procedure(&self, handle: RawHandle, message: &Message) {
    if let Message::CloseRequested = message {
      if let Err(error) = self.destroy_window(handle) {
        error!("{error}");
      }
    }
  }
}

fn unknown_window(handle: RawHandle) -> WindowError {
  window_error!("no window with handle {:#x}", handle.get())
}

impl Backend for HeadlessBackend {
  fn class_registry(&self) -> &ClassRegistry {
    &self.classes
  }

  fn module_instance(&self) -> ModuleInstance {
    ModuleInstance(0x0040_0000)
  }

  fn register_class(&self, class_name: &str) -> WindowResult<()> {
    if self.fail_registration.load(Ordering::SeqCst) {
      return Err(window_error!("headless backend refused to register `{class_name}`"));
    }
    self.registered_lock().insert(class_name.to_owned());
    Ok(())
  }

  fn unregister_class(&self, class_name: &str) -> WindowResult<()> {
    let still_in_use = self
      .windows_lock()
      .values()
      .any(|window| window.class_name == class_name && !window.destroyed);
    if still_in_use {
      return Err(window_error!("window class `{class_name}` still has live windows"));
    }

    if self.registered_lock().remove(class_name) {
      Ok(())
    } else {
      Err(window_error!("window class `{class_name}` is not registered"))
    }
  }

  fn adjust_size(&self, client: Size, style: Style) -> Size {
    let frame = Self::frame(style);
    Size::new(client.width + frame.width, client.height + frame.height)
  }

  fn create_window(&self, request: &CreationRequest) -> WindowResult<RawHandle> {
    self
      .attempts
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(request.id);

    let delay = *self.creation_delay.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(delay) = delay {
      std::thread::sleep(delay);
    }

    if self.fail_creation.load(Ordering::SeqCst) {
      return Err(WindowError::Creation(
        "headless backend refused to create the window".to_owned(),
      ));
    }
    if !self.is_class_registered(&request.class_name) {
      return Err(WindowError::Creation(format!(
        "window class `{}` is not registered",
        request.class_name
      )));
    }

    let handle = RawHandle::new(self.next_handle.fetch_add(1, Ordering::Relaxed))
      .ok_or_else(|| window_error!("out of window handles"))?;
    let (sender, receiver) = channel::unbounded();
    let rect = Rect::from_origin(ORIGIN.0, ORIGIN.1, request.size);

    self.windows_lock().insert(handle, HeadlessWindow {
      id: request.id,
      class_name: request.class_name.clone(),
      owner: std::thread::current().id(),
      title: request.title.clone(),
      rect,
      style: request.style,
      show: None,
      destroyed: false,
      sender,
      receiver: Some(receiver),
    });

    trace!("[{}]: created headless window {:#x}", request.id, handle.get());

    // the native call reports the initial client size before returning
    self.deliver(request.id, handle, Message::Resized {
      mode: SizeMode::Restored,
      size: Self::client_size(rect, request.style),
    });

    Ok(handle)
  }

  fn show_window(&self, handle: RawHandle, command: ShowCommand) {
    if let Some(window) = self.windows_lock().get_mut(&handle) {
      window.show = Some(command);
    }
  }

  fn destroy_window(&self, handle: RawHandle) -> WindowResult<()> {
    let id = {
      let mut windows = self.windows_lock();
      let window = windows.get_mut(&handle).ok_or_else(|| unknown_window(handle))?;
      if window.destroyed {
        return Err(window_error!("window {:#x} was already destroyed", handle.get()));
      }
      window.destroyed = true;
      window.id
    };

    self.deliver(id, handle, Message::Destroyed);
    Ok(())
  }

  fn post_quit(&self, handle: RawHandle) {
    let sender = self
      .windows_lock()
      .get(&handle)
      .map(|window| window.sender.clone());
    if let Some(sender) = sender {
      let _ = sender.send(Envelope::Quit);
    }
  }

  fn run_event_loop(&self, handle: RawHandle) -> WindowResult<()> {
    let (id, receiver) = {
      let mut windows = self.windows_lock();
      let window = windows.get_mut(&handle).ok_or_else(|| unknown_window(handle))?;
      if window.owner != std::thread::current().id() {
        return Err(window_error!(
          "event loop of window {:#x} must run on the thread that created it",
          handle.get()
        ));
      }
      let receiver = window
        .receiver
        .take()
        .ok_or_else(|| window_error!("event loop of window {:#x} already ran", handle.get()))?;
      (window.id, receiver)
    };

    self.event_loops.fetch_add(1, Ordering::SeqCst);

    for envelope in receiver.iter() {
      match envelope {
        Envelope::Quit => break,
        Envelope::Message(message, reply) => {
          let response = if self.is_destroyed(handle) {
            Response::Default
          } else {
            self.deliver(id, handle, message)
          };
          if let Some(reply) = reply {
            let _ = reply.send(response);
          }
        }
      }
    }

    Ok(())
  }

  fn post_message(&self, handle: RawHandle, message: Message) -> WindowResult<()> {
    self.enqueue(handle, Envelope::Message(message, None))
  }

  fn set_title(&self, handle: RawHandle, title: &str) -> WindowResult<()> {
    let mut windows = self.windows_lock();
    let window = windows.get_mut(&handle).ok_or_else(|| unknown_window(handle))?;
    window.title = title.to_owned();
    Ok(())
  }

  fn window_rect(&self, handle: RawHandle) -> WindowResult<Rect> {
    self
      .windows_lock()
      .get(&handle)
      .map(|window| window.rect)
      .ok_or_else(|| unknown_window(handle))
  }

  fn set_window_rect(&self, handle: RawHandle, rect: Rect) -> WindowResult<()> {
    let client = {
      let mut windows = self.windows_lock();
      let window = windows.get_mut(&handle).ok_or_else(|| unknown_window(handle))?;
      window.rect = rect;
      Self::client_size(rect, window.style)
    };

    // geometry changes reach the window procedure as a resize
    if let Err(error) = self.post_message(handle, Message::Resized {
      mode: SizeMode::Restored,
      size: client,
    }) {
      debug!("{error}");
    }
    Ok(())
  }

  fn style(&self, handle: RawHandle) -> WindowResult<Style> {
    self
      .windows_lock()
      .get(&handle)
      .map(|window| window.style)
      .ok_or_else(|| unknown_window(handle))
  }

  fn set_style(&self, handle: RawHandle, style: Style) -> WindowResult<()> {
    let mut windows = self.windows_lock();
    let window = windows.get_mut(&handle).ok_or_else(|| unknown_window(handle))?;
    window.style = style;
    Ok(())
  }

  fn monitor_rect(&self, _handle: RawHandle) -> WindowResult<Rect> {
    Ok(self.monitor)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn decorations_grow_the_outer_size() {
    let backend = HeadlessBackend::new();
    let style = Style::CAPTION | Style::SYSMENU;
    let outer = backend.adjust_size(Size::new(800, 600), style);
    assert_eq!(outer, Size::new(800 + 2 * BORDER, 600 + 2 * BORDER + TITLE_BAR));
    assert_eq!(
      HeadlessBackend::client_size(Rect::from_origin(0, 0, outer), style),
      Size::new(800, 600)
    );
    assert_eq!(backend.adjust_size(Size::new(10, 10), Style::POPUP), Size::new(10, 10));
  }

  #[test]
  fn creation_requires_a_registered_class() {
    let backend = HeadlessBackend::new();
    let request = CreationRequest {
      id: WindowId::next(),
      class_name: "missing".to_owned(),
      title: "t".to_owned(),
      style: Style::default(),
      size: Size::new(1, 1),
    };
    assert!(matches!(
      backend.create_window(&request),
      Err(WindowError::Creation(..))
    ));

    backend.register_class("missing").unwrap();
    backend.register_class("missing").unwrap();
    let handle = backend.create_window(&request).unwrap();
    assert_eq!(backend.title(handle).as_deref(), Some("t"));
    assert!(backend.unregister_class("missing").is_err());
  }

  #[test]
  fn event_loop_is_bound_to_the_creating_thread() {
    let backend = std::sync::Arc::new(HeadlessBackend::new());
    backend.register_class("affinity").unwrap();
    let handle = backend
      .create_window(&CreationRequest {
        id: WindowId::next(),
        class_name: "affinity".to_owned(),
        title: String::new(),
        style: Style::default(),
        size: Size::new(1, 1),
      })
      .unwrap();

    let other = backend.clone();
    let result = std::thread::spawn(move || other.run_event_loop(handle))
      .join()
      .unwrap();
    assert!(result.is_err());
    assert_eq!(backend.event_loops_entered(), 0);
  }
}
