use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Shared, lock-guarded value. A poisoned lock is recovered rather than
/// propagated; holders only perform single map operations under it.
pub struct Handle<T>(Arc<RwLock<T>>);

impl<T> Clone for Handle<T> {
  fn clone(&self) -> Self {
    Self(self.0.clone())
  }

  fn clone_from(&mut self, source: &Self) {
    *self = Self(source.0.clone());
  }
}

impl<T: Default> Default for Handle<T> {
  fn default() -> Self {
    Self::new(T::default())
  }
}

impl<T> Handle<T> {
  pub fn new(t: T) -> Self {
    Self(Arc::new(RwLock::new(t)))
  }

  pub fn get(&self) -> RwLockReadGuard<'_, T> {
    self.0.read().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn get_mut(&self) -> RwLockWriteGuard<'_, T> {
    self.0.write().unwrap_or_else(PoisonError::into_inner)
  }
}
