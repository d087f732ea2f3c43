use tracing::*;

use super::{
  backend::{Backend, RawHandle, ShowCommand},
  message::{Message, Response, SizeMode},
  settings::Style,
  stage::Stage,
  state::{Internal, RestorePoint, WindowState},
};
use crate::error::WindowResult;

/// Handles one event on the window thread. Events arrive one at a time, in
/// delivery order.
pub(crate) fn window_procedure<B: Backend>(
  internal: &Internal<B>,
  handle: RawHandle,
  message: Message,
) -> Response {
  let backend = internal.backend.as_ref();

  match message {
    Message::CloseRequested => {
      trace!("[{}]: close requested", internal.id);
      if let Err(error) = backend.destroy_window(handle) {
        error!("[{}]: failed to destroy window: {error}", internal.id);
      }
      Response::Handled
    }
    Message::Destroyed => {
      trace!("[{}]: destroyed, leaving event loop", internal.id);
      internal.set_stage(Stage::Destroying);
      backend.post_quit(handle);
      Response::Handled
    }
    Message::Resized {
      mode: SizeMode::Minimized,
      ..
    } => {
      internal.state.set_minimized(true);
      Response::Default
    }
    Message::Resized { size, .. } => {
      internal.state.set_minimized(false);
      internal.state.set_size(size);
      Response::Default
    }
    Message::SetFullscreen(fullscreen) => {
      if fullscreen != internal.state.is_fullscreen() {
        if let Err(error) = toggle_fullscreen(backend, &internal.state, handle) {
          error!("[{}]: failed to set fullscreen: {error}", internal.id);
        }
      }
      Response::Handled
    }
    message if message.is_fullscreen_toggle() => {
      if let Err(error) = toggle_fullscreen(backend, &internal.state, handle) {
        error!("[{}]: failed to toggle fullscreen: {error}", internal.id);
      }
      Response::Handled
    }
    _ => Response::Default,
  }
}

pub(crate) fn toggle_fullscreen<B: Backend>(
  backend: &B,
  state: &WindowState,
  handle: RawHandle,
) -> WindowResult<()> {
  if state.is_fullscreen() {
    exit_fullscreen(backend, state, handle)
  } else {
    enter_fullscreen(backend, state, handle)
  }
}

fn enter_fullscreen<B: Backend>(
  backend: &B,
  state: &WindowState,
  handle: RawHandle,
) -> WindowResult<()> {
  let restore = RestorePoint {
    rect: backend.window_rect(handle)?,
    style: backend.style(handle)?,
  };
  let monitor = backend.monitor_rect(handle)?;

  state.save_restore_point(restore);
  backend.set_style(handle, restore.style.without(Style::DECORATIONS))?;
  backend.set_window_rect(handle, monitor)?;
  backend.show_window(handle, ShowCommand::Maximized);
  state.set_fullscreen(true);

  debug!("entered fullscreen, restore point {:?}", restore.rect);
  Ok(())
}

fn exit_fullscreen<B: Backend>(
  backend: &B,
  state: &WindowState,
  handle: RawHandle,
) -> WindowResult<()> {
  state.set_fullscreen(false);
  let Some(restore) = state.take_restore_point() else {
    warn!("left fullscreen without a restore point");
    return Ok(());
  };

  // un-maximize before restoring, or the fullscreen rect becomes the normal
  // placement
  backend.show_window(handle, ShowCommand::Normal);
  backend.set_style(handle, restore.style)?;
  backend.set_window_rect(handle, restore.rect)?;

  debug!("left fullscreen, restored {:?}", restore.rect);
  Ok(())
}
