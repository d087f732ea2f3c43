//! Process-wide lookup tables used by the window thread.
//!
//! Backends never carry a pointer to the owning window. They carry a
//! [`WindowId`] and resolve it here on every event.

use std::{
  collections::{BTreeMap, HashMap},
  fmt,
  sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
    LazyLock,
    Mutex,
    PoisonError,
  },
};

use tracing::*;

use super::{
  backend::RawHandle,
  message::{Message, Response},
};
use crate::{error::WindowResult, handle::Handle};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(u64);

impl WindowId {
  pub(crate) fn next() -> Self {
    // zero is reserved so a cleared user-data slot never names a window
    static NEXT: AtomicU64 = AtomicU64::new(1);
    Self(NEXT.fetch_add(1, Ordering::Relaxed))
  }

  pub fn from_raw(raw: u64) -> Option<Self> {
    (raw != 0).then_some(Self(raw))
  }

  pub fn into_raw(self) -> u64 {
    self.0
  }
}

impl fmt::Display for WindowId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Receives events for one window.
pub(crate) trait Dispatch: Send + Sync {
  fn dispatch(&self, handle: RawHandle, message: Message) -> Response;
}

static WINDOWS: LazyLock<Handle<HashMap<WindowId, Arc<dyn Dispatch>>>> =
  LazyLock::new(Handle::default);

pub(crate) fn register(id: WindowId, target: Arc<dyn Dispatch>) {
  WINDOWS.get_mut().insert(id, target);
}

pub(crate) fn unregister(id: WindowId) {
  WINDOWS.get_mut().remove(&id);
}

pub fn is_registered(id: WindowId) -> bool {
  WINDOWS.get().contains_key(&id)
}

/// Routes `message` to the window registered under `id`. Unknown ids get
/// default handling.
pub fn dispatch(id: WindowId, handle: RawHandle, message: Message) -> Response {
  // the lock is released before dispatching: handlers may re-enter through
  // backend calls that synchronously deliver further messages
  let target = WINDOWS.get().get(&id).cloned();
  match target {
    Some(target) => target.dispatch(handle, message),
    None => {
      trace!("[{id}]: no window registered, using default handling");
      Response::Default
    }
  }
}

/// Reference-counted window-class registration keyed by class name. The
/// first window of a class registers it with the backend, the last one
/// unregisters it.
#[derive(Debug, Default)]
pub struct ClassRegistry {
  classes: Mutex<BTreeMap<String, usize>>,
}

impl ClassRegistry {
  pub const fn new() -> Self {
    Self {
      classes: Mutex::new(BTreeMap::new()),
    }
  }

  /// Takes a reference on `name`, calling `register` only for the first.
  /// A failed registration leaves the count untouched.
  pub fn acquire(
    &self,
    name: &str,
    register: impl FnOnce() -> WindowResult<()>,
  ) -> WindowResult<()> {
    let mut classes = self.classes.lock().unwrap_or_else(PoisonError::into_inner);
    match classes.get_mut(name) {
      Some(count) => *count += 1,
      None => {
        trace!("[`{name}`]: registering window class");
        register()?;
        classes.insert(name.to_owned(), 1);
      }
    }
    Ok(())
  }

  /// Drops a reference on `name`, calling `unregister` when it was the last.
  pub fn release(
    &self,
    name: &str,
    unregister: impl FnOnce() -> WindowResult<()>,
  ) -> WindowResult<()> {
    let mut classes = self.classes.lock().unwrap_or_else(PoisonError::into_inner);
    let Some(count) = classes.get_mut(name) else {
      warn!("[`{name}`]: released a window class that was never acquired");
      return Ok(());
    };

    *count -= 1;
    if *count == 0 {
      classes.remove(name);
      trace!("[`{name}`]: unregistering window class");
      unregister()?;
    }
    Ok(())
  }

  pub fn count(&self, name: &str) -> usize {
    self
      .classes
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .get(name)
      .copied()
      .unwrap_or_default()
  }
}
