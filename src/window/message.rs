use super::settings::Size;
use crate::utilities::{hi_word, is_flag_set, lo_word};

// Win32 message identifiers understood by `Message::decode`.
pub const WM_DESTROY: u32 = 0x0002;
pub const WM_SIZE: u32 = 0x0005;
pub const WM_CLOSE: u32 = 0x0010;
pub const WM_KEYDOWN: u32 = 0x0100;
pub const WM_KEYUP: u32 = 0x0101;
pub const WM_SYSKEYDOWN: u32 = 0x0104;
pub const WM_SYSKEYUP: u32 = 0x0105;
/// Private message carrying a fullscreen request; wParam is the target state.
pub const WM_SET_FULLSCREEN: u32 = 0x8000 + 1;

const SIZE_RESTORED: usize = 0;
const SIZE_MINIMIZED: usize = 1;
const SIZE_MAXIMIZED: usize = 2;

/// lParam bit 29 of a key message: ALT was held when the key was pressed.
const KF_ALTDOWN: u32 = 1 << 29;
/// lParam bit 30 of a key message: the key was already down (auto-repeat).
const KF_REPEAT: u32 = 1 << 30;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct VirtualKey(pub u16);

impl VirtualKey {
  pub const RETURN: Self = Self(0x0D);
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum KeyState {
  Pressed,
  Released,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SizeMode {
  Restored,
  Minimized,
  Maximized,
}

/// Events delivered to the window thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
  CloseRequested,
  Destroyed,
  Resized {
    mode: SizeMode,
    /// Client area as reported by the backend. Zero while minimized.
    size: Size,
  },
  Key {
    key: VirtualKey,
    state: KeyState,
    alt: bool,
    /// Auto-repeat of a key that is held down.
    repeat: bool,
  },
  /// Request to enter (`true`) or leave (`false`) fullscreen.
  SetFullscreen(bool),
  Other {
    message: u32,
    w_param: usize,
    l_param: isize,
  },
}

/// What the window procedure did with a message.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Response {
  Handled,
  /// The backend should apply its default handling.
  Default,
}

impl Message {
  pub fn decode(message: u32, w_param: usize, l_param: isize) -> Self {
    match message {
      WM_CLOSE => Message::CloseRequested,
      WM_DESTROY => Message::Destroyed,
      WM_SIZE => {
        let mode = match w_param {
          SIZE_MINIMIZED => SizeMode::Minimized,
          SIZE_MAXIMIZED => SizeMode::Maximized,
          _ => SizeMode::Restored,
        };
        let width = lo_word(l_param as u32) as u32;
        let height = hi_word(l_param as u32) as u32;

        Message::Resized {
          mode,
          size: Size::new(width, height),
        }
      }
      WM_KEYDOWN | WM_SYSKEYDOWN | WM_KEYUP | WM_SYSKEYUP => {
        let state = match message {
          WM_KEYDOWN | WM_SYSKEYDOWN => KeyState::Pressed,
          _ => KeyState::Released,
        };

        Message::Key {
          key: VirtualKey(w_param as u16),
          state,
          alt: is_flag_set(l_param as u32, KF_ALTDOWN),
          repeat: state == KeyState::Pressed && is_flag_set(l_param as u32, KF_REPEAT),
        }
      }
      WM_SET_FULLSCREEN => Message::SetFullscreen(w_param != 0),
      _ => Message::Other {
        message,
        w_param,
        l_param,
      },
    }
  }

  /// Raw `(message, wParam, lParam)` triple for posting through a native
  /// queue.
  pub fn encode(&self) -> (u32, usize, isize) {
    match *self {
      Message::CloseRequested => (WM_CLOSE, 0, 0),
      Message::Destroyed => (WM_DESTROY, 0, 0),
      Message::Resized { mode, size } => {
        let w_param = match mode {
          SizeMode::Restored => SIZE_RESTORED,
          SizeMode::Minimized => SIZE_MINIMIZED,
          SizeMode::Maximized => SIZE_MAXIMIZED,
        };
        let l_param = ((size.height & 0xFFFF) << 16) | (size.width & 0xFFFF);
        (WM_SIZE, w_param, l_param as isize)
      }
      Message::Key {
        key,
        state,
        alt,
        repeat,
      } => {
        let message = match (state, alt) {
          (KeyState::Pressed, true) => WM_SYSKEYDOWN,
          (KeyState::Pressed, false) => WM_KEYDOWN,
          (KeyState::Released, true) => WM_SYSKEYUP,
          (KeyState::Released, false) => WM_KEYUP,
        };
        let mut l_param = 0;
        if alt {
          l_param |= KF_ALTDOWN;
        }
        if repeat {
          l_param |= KF_REPEAT;
        }
        (message, key.0 as usize, l_param as isize)
      }
      Message::SetFullscreen(fullscreen) => (WM_SET_FULLSCREEN, fullscreen as usize, 0),
      Message::Other {
        message,
        w_param,
        l_param,
      } => (message, w_param, l_param),
    }
  }

  /// The message a user generates with Alt+Enter. Auto-repeats of a held
  /// Alt+Enter are not toggles.
  pub fn fullscreen_toggle() -> Self {
    Message::Key {
      key: VirtualKey::RETURN,
      state: KeyState::Pressed,
      alt: true,
      repeat: false,
    }
  }

  pub fn is_fullscreen_toggle(&self) -> bool {
    *self == Self::fullscreen_toggle()
  }
}
