use std::{io, time::Duration};

use thiserror::Error;

pub type WindowResult<T> = Result<T, WindowError>;

#[derive(Error, Debug)]
pub enum WindowError {
  #[error("{0}")]
  Error(String),
  /// The backend refused to create the window.
  #[error("failed to create the window: {0}")]
  Creation(String),
  #[error("window creation did not complete within {0:?}")]
  Timeout(Duration),
  #[error("window thread exited without reporting a creation result")]
  Disconnected,
  #[error("window thread panicked: {0}")]
  ThreadPanicked(String),
  #[error("{0}")]
  IOError(#[from] io::Error),
  #[cfg(windows)]
  #[error("{0}")]
  Win32Error(#[from] windows::core::Error),
}

impl WindowError {
  pub fn is_creation_error(&self) -> bool {
    matches!(self, Self::Creation(..))
  }
}

#[derive(Error, Debug)]
pub enum PoolError {
  #[error("a worker pool needs at least one thread")]
  ZeroThreads,
  #[error("failed to spawn worker thread: {0}")]
  Spawn(#[from] io::Error),
}

#[macro_export]
macro_rules! window_error {
  () => {
    $crate::error::WindowError::Error("window error".to_string())
  };
  ($($arg:tt)*) => {{
    $crate::error::WindowError::Error(format!($($arg)*))
  }}
}

/// Renders the payload of a caught panic for logging.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
  if let Some(message) = payload.downcast_ref::<&str>() {
    message.to_string()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "unknown panic payload".to_string()
  }
}
