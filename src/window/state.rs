use std::sync::{
  atomic::{AtomicBool, AtomicU64, Ordering},
  Arc,
  Mutex,
  MutexGuard,
  PoisonError,
};

use super::{
  backend::{Backend, RawHandle},
  message::{Message, Response},
  procedure,
  registry::{Dispatch, WindowId},
  settings::{Rect, Size, Style},
  stage::Stage,
};
use crate::utilities::{pack, unpack};

/// Geometry and style captured on entering fullscreen.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RestorePoint {
  pub rect: Rect,
  pub style: Style,
}

/// Observable window state.
///
/// Only the window thread writes these fields, while handling events. Other
/// threads read them without synchronising with that thread, so a read is a
/// snapshot that may already be stale. Width and height share one atomic word
/// and are always observed as a pair.
#[derive(Debug)]
pub struct WindowState {
  size: AtomicU64,
  minimized: AtomicBool,
  fullscreen: AtomicBool,
  restore: Mutex<Option<RestorePoint>>,
}

impl WindowState {
  pub fn new(size: Size) -> Self {
    Self {
      size: AtomicU64::new(pack(size.width, size.height)),
      minimized: AtomicBool::new(false),
      fullscreen: AtomicBool::new(false),
      restore: Mutex::new(None),
    }
  }

  pub fn size(&self) -> Size {
    let (width, height) = unpack(self.size.load(Ordering::Relaxed));
    Size::new(width, height)
  }

  pub(crate) fn set_size(&self, size: Size) {
    self
      .size
      .store(pack(size.width, size.height), Ordering::Relaxed);
  }

  pub fn aspect_ratio(&self) -> f32 {
    self.size().aspect_ratio()
  }

  pub fn is_minimized(&self) -> bool {
    self.minimized.load(Ordering::Relaxed)
  }

  pub(crate) fn set_minimized(&self, minimized: bool) {
    self.minimized.store(minimized, Ordering::Relaxed);
  }

  pub fn is_fullscreen(&self) -> bool {
    self.fullscreen.load(Ordering::Relaxed)
  }

  pub(crate) fn set_fullscreen(&self, fullscreen: bool) {
    self.fullscreen.store(fullscreen, Ordering::Relaxed);
  }

  fn restore_lock(&self) -> MutexGuard<'_, Option<RestorePoint>> {
    self.restore.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn restore_point(&self) -> Option<RestorePoint> {
    *self.restore_lock()
  }

  pub(crate) fn save_restore_point(&self, restore: RestorePoint) {
    *self.restore_lock() = Some(restore);
  }

  pub(crate) fn take_restore_point(&self) -> Option<RestorePoint> {
    self.restore_lock().take()
  }
}

/// Everything the window thread and the owning [`Window`](super::Window)
/// share. Registered with the window registry for the lifetime of the
/// window thread.
pub(crate) struct Internal<B: Backend> {
  pub id: WindowId,
  pub backend: Arc<B>,
  pub style: Style,
  pub state: WindowState,
  stage: Mutex<Stage>,
  title: Mutex<String>,
}

impl<B: Backend> Internal<B> {
  pub fn new(id: WindowId, backend: Arc<B>, size: Size, style: Style, title: String) -> Self {
    Self {
      id,
      backend,
      style,
      state: WindowState::new(size),
      stage: Mutex::new(Stage::Uninitialized),
      title: Mutex::new(title),
    }
  }

  pub fn stage(&self) -> Stage {
    *self.stage.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn set_stage(&self, stage: Stage) {
    let mut current = self.stage.lock().unwrap_or_else(PoisonError::into_inner);
    tracing::trace!("[{}]: {:?} -> {:?}", self.id, *current, stage);
    *current = stage;
  }

  pub fn title(&self) -> String {
    self.title.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }

  pub fn set_title(&self, title: &str) {
    *self.title.lock().unwrap_or_else(PoisonError::into_inner) = title.to_owned();
  }
}

impl<B: Backend> Dispatch for Internal<B> {
  fn dispatch(&self, handle: RawHandle, message: Message) -> Response {
    procedure::window_procedure(self, handle, message)
  }
}
