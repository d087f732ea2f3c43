use std::{
  sync::{Arc, Mutex, PoisonError},
  thread::JoinHandle,
};

#[cfg(all(windows, feature = "rwh_06"))]
use rwh_06::{
  DisplayHandle,
  HandleError,
  HasDisplayHandle,
  HasWindowHandle,
  RawDisplayHandle,
  RawWindowHandle,
  Win32WindowHandle,
  WindowHandle,
  WindowsDisplayHandle,
};
use tracing::*;

use self::{
  backend::{Backend, CreationRequest, DefaultBackend, ModuleInstance, RawHandle, ShowCommand},
  message::Message,
  registry::WindowId,
  settings::{Rect, Size, WindowSettings},
  stage::Stage,
  state::Internal,
  sync::OneshotSender,
};
use crate::error::{panic_message, WindowError, WindowResult};

pub mod backend;
pub mod message;
mod procedure;
pub mod registry;
pub mod settings;
pub mod stage;
pub mod state;
mod sync;

/// A native window owned by a dedicated thread.
///
/// The window is created on its own thread, which then runs the window's
/// event loop until the window is destroyed. Construction blocks until that
/// thread reports either a live window or a creation failure. Dropping the
/// window blocks until the thread has exited.
pub struct Window<B: Backend = DefaultBackend> {
  internal: Arc<Internal<B>>,
  handle: RawHandle,
  module: ModuleInstance,
  thread: Mutex<Option<JoinHandle<WindowResult<()>>>>,
}

impl Window {
  /// Opens a `width` x `height` window titled `name` on the default backend.
  pub fn new(width: u32, height: u32, name: impl Into<String>) -> WindowResult<Self> {
    Self::with_settings(
      WindowSettings::default()
        .with_size((width, height))
        .with_title(name),
    )
  }

  pub fn with_settings(settings: WindowSettings) -> WindowResult<Self> {
    Self::with_backend(Arc::new(DefaultBackend::default()), settings)
  }
}

impl<B: Backend> Window<B> {
  pub fn with_backend(backend: Arc<B>, settings: WindowSettings) -> WindowResult<Self> {
    let id = WindowId::next();
    let request = CreationRequest {
      id,
      class_name: settings.class_name.clone(),
      title: settings.title.clone(),
      style: settings.style,
      size: backend.adjust_size(settings.size, settings.style),
    };

    let internal = Arc::new(Internal::new(
      id,
      backend.clone(),
      settings.size,
      settings.style,
      settings.title,
    ));
    internal.set_stage(Stage::Creating);
    registry::register(id, internal.clone());

    let (sender, receiver) = sync::oneshot();
    let spawned = {
      let internal = internal.clone();
      std::thread::Builder::new()
        .name(format!("window-{id}"))
        .spawn(move || Self::async_thread_func(internal, request, sender))
    };
    let thread = match spawned {
      Ok(thread) => thread,
      Err(error) => {
        registry::unregister(id);
        internal.set_stage(Stage::Failed);
        return Err(error.into());
      }
    };

    // transport failures and creation failures reported by the thread take
    // the same path
    match receiver
      .recv(settings.creation_timeout)
      .and_then(|result| result)
    {
      Ok(handle) => {
        debug!("[{id}]: window ready");
        Ok(Self {
          internal,
          handle,
          module: backend.module_instance(),
          thread: Mutex::new(Some(thread)),
        })
      }
      Err(error @ WindowError::Timeout(..)) => {
        // the thread cleans up after itself once it notices nobody waits
        warn!("[{id}]: {error}");
        Err(error)
      }
      Err(error) => {
        internal.set_stage(Stage::Failed);
        // a failed thread never enters its event loop, so this returns
        // promptly
        if let Err(payload) = thread.join() {
          error!("[{id}]: window thread panicked: {}", panic_message(payload.as_ref()));
        }
        Err(error)
      }
    }
  }

  /// Body of the window thread: creates the window, hands the result to the
  /// constructor, then pumps events until the window is destroyed.
  fn async_thread_func(
    internal: Arc<Internal<B>>,
    request: CreationRequest,
    sender: OneshotSender<WindowResult<RawHandle>>,
  ) -> WindowResult<()> {
    let id = request.id;
    let backend = internal.backend.clone();
    let classes = backend.class_registry();

    trace!("[{id}]: window thread started");

    if let Err(error) = classes.acquire(&request.class_name, || {
      backend.register_class(&request.class_name)
    }) {
      error!("[{id}]: failed to register window class: {error}");
      internal.set_stage(Stage::Failed);
      registry::unregister(id);
      sender.send(Err(WindowError::Creation(error.to_string())));
      return Ok(());
    }

    let result = Self::create_and_run(&internal, &request, sender);

    if let Err(error) = classes.release(&request.class_name, || {
      backend.unregister_class(&request.class_name)
    }) {
      warn!("[{id}]: failed to unregister window class: {error}");
    }
    registry::unregister(id);
    if internal.stage() != Stage::Failed {
      internal.set_stage(Stage::Destroyed);
    }

    trace!("[{id}]: window thread exiting");
    result
  }

  fn create_and_run(
    internal: &Internal<B>,
    request: &CreationRequest,
    sender: OneshotSender<WindowResult<RawHandle>>,
  ) -> WindowResult<()> {
    let id = request.id;
    let backend = internal.backend.as_ref();

    let handle = match backend.create_window(request) {
      Ok(handle) => handle,
      Err(error) => {
        error!("[{id}]: {error}");
        internal.set_stage(Stage::Failed);
        sender.send(Err(error));
        return Ok(());
      }
    };

    internal.set_stage(Stage::Ready);
    if sender.send(Ok(handle)) {
      backend.show_window(handle, ShowCommand::Default);
    } else {
      warn!("[{id}]: creator stopped waiting, destroying window");
      backend.destroy_window(handle)?;
    }

    backend.run_event_loop(handle)
  }

  /// Blocks until the window thread has exited. Returns what the thread
  /// returned; subsequent calls return `Ok(())`.
  pub fn wait_for_message_loop(&self) -> WindowResult<()> {
    let thread = self
      .thread
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .take();
    let Some(thread) = thread else {
      return Ok(());
    };

    trace!("[{}]: joining window thread", self.internal.id);
    let result = thread
      .join()
      .map_err(|payload| WindowError::ThreadPanicked(panic_message(payload.as_ref())))?;
    trace!("[{}]: joined window thread", self.internal.id);
    result
  }

  /// Asks the window to close, as if the user clicked its close button.
  pub fn close(&self) -> WindowResult<()> {
    self.backend().post_message(self.handle, Message::CloseRequested)
  }

  pub fn set_title(&self, title: impl AsRef<str>) -> WindowResult<()> {
    let title = title.as_ref();
    self.backend().set_title(self.handle, title)?;
    self.internal.set_title(title);
    Ok(())
  }

  /// Resizes the client area to `width` x `height`, keeping the window's
  /// position.
  pub fn set_resolution(&self, width: u32, height: u32) -> WindowResult<()> {
    let backend = self.backend();
    let outer = backend.adjust_size(Size::new(width, height), self.internal.style);
    let current = backend.window_rect(self.handle)?;
    backend.set_window_rect(self.handle, Rect::from_origin(current.left, current.top, outer))
  }

  /// Requests fullscreen or windowed mode. The window thread compares the
  /// request against its own state, so repeated requests are idempotent.
  pub fn set_fullscreen(&self, fullscreen: bool) -> WindowResult<()> {
    self
      .backend()
      .post_message(self.handle, Message::SetFullscreen(fullscreen))
  }

  pub fn is_minimized(&self) -> bool {
    self.internal.state.is_minimized()
  }

  pub fn is_fullscreen(&self) -> bool {
    self.internal.state.is_fullscreen()
  }

  /// Last client size reported to the window thread.
  pub fn size(&self) -> Size {
    self.internal.state.size()
  }

  pub fn aspect_ratio(&self) -> f32 {
    self.internal.state.aspect_ratio()
  }

  pub fn title(&self) -> String {
    self.internal.title()
  }

  pub fn stage(&self) -> Stage {
    self.internal.stage()
  }

  pub fn id(&self) -> WindowId {
    self.internal.id
  }

  pub fn native_handle(&self) -> RawHandle {
    self.handle
  }

  pub fn module_instance(&self) -> ModuleInstance {
    self.module
  }

  pub fn backend(&self) -> &B {
    &self.internal.backend
  }
}

/// Blocks until the window thread exits. Errors are logged, never raised.
impl<B: Backend> Drop for Window<B> {
  fn drop(&mut self) {
    if let Err(error) = self.wait_for_message_loop() {
      error!("[{}]: {error}", self.internal.id);
    }
  }
}

#[cfg(all(windows, feature = "rwh_06"))]
impl Window<backend::win32::Win32Backend> {
  pub fn raw_window_handle(&self) -> RawWindowHandle {
    let mut handle = Win32WindowHandle::new(self.handle.as_non_zero());
    handle.hinstance = std::num::NonZeroIsize::new(self.module.0);
    RawWindowHandle::from(handle)
  }

  pub fn raw_display_handle(&self) -> RawDisplayHandle {
    RawDisplayHandle::from(WindowsDisplayHandle::new())
  }
}

#[cfg(all(windows, feature = "rwh_06"))]
impl HasWindowHandle for Window<backend::win32::Win32Backend> {
  fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
    Ok(unsafe { WindowHandle::borrow_raw(self.raw_window_handle()) })
  }
}

#[cfg(all(windows, feature = "rwh_06"))]
impl HasDisplayHandle for Window<backend::win32::Win32Backend> {
  fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
    Ok(unsafe { DisplayHandle::borrow_raw(self.raw_display_handle()) })
  }
}
