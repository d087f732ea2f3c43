pub use std::sync::Arc;

pub use crate::{
  error::{PoolError, WindowError, WindowResult},
  pool::{PoolSettings, TaskSender, WorkerPool},
  window::{
    backend::{headless::HeadlessBackend, Backend, DefaultBackend, ModuleInstance, RawHandle},
    message::{KeyState, Message, SizeMode, VirtualKey},
    settings::{Rect, Size, Style, WindowSettings},
    stage::Stage,
    Window,
  },
};
