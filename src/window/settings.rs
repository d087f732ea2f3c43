use std::{
  ops::{BitOr, BitOrAssign},
  time::Duration,
};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Size {
  pub width: u32,
  pub height: u32,
}

impl Size {
  pub const fn new(width: u32, height: u32) -> Self {
    Self { width, height }
  }

  /// `width / height`, or `0.0` for a zero-height area.
  pub fn aspect_ratio(&self) -> f32 {
    if self.height == 0 {
      return 0.0;
    }
    self.width as f32 / self.height as f32
  }
}

impl Default for Size {
  fn default() -> Self {
    Self {
      width: 800,
      height: 600,
    }
  }
}

impl From<(u32, u32)> for Size {
  fn from(value: (u32, u32)) -> Self {
    Self {
      width: value.0,
      height: value.1,
    }
  }
}

impl From<Size> for (u32, u32) {
  fn from(val: Size) -> Self {
    (val.width, val.height)
  }
}

/// Screen-space rectangle, right and bottom exclusive.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Rect {
  pub left: i32,
  pub top: i32,
  pub right: i32,
  pub bottom: i32,
}

impl Rect {
  pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
    Self {
      left,
      top,
      right,
      bottom,
    }
  }

  pub fn from_origin(left: i32, top: i32, size: Size) -> Self {
    Self {
      left,
      top,
      right: left + size.width as i32,
      bottom: top + size.height as i32,
    }
  }

  pub fn width(&self) -> u32 {
    (self.right - self.left).max(0) as u32
  }

  pub fn height(&self) -> u32 {
    (self.bottom - self.top).max(0) as u32
  }

  pub fn size(&self) -> Size {
    Size::new(self.width(), self.height())
  }
}

/// Window style bits. Values match the Win32 `WS_*` constants so the Win32
/// backend can pass them through untouched.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Style(pub u32);

impl Style {
  pub const BORDER: Self = Self(0x0080_0000);
  pub const CAPTION: Self = Self(0x00C0_0000);
  pub const MAXIMIZE_BOX: Self = Self(0x0001_0000);
  pub const MINIMIZE_BOX: Self = Self(0x0002_0000);
  pub const POPUP: Self = Self(0x8000_0000);
  pub const SYSMENU: Self = Self(0x0008_0000);
  pub const THICKFRAME: Self = Self(0x0004_0000);
  pub const VISIBLE: Self = Self(0x1000_0000);

  pub const DECORATIONS: Self = Self(
    Self::CAPTION.0
      | Self::THICKFRAME.0
      | Self::SYSMENU.0
      | Self::MINIMIZE_BOX.0
      | Self::MAXIMIZE_BOX.0,
  );

  pub const fn contains(self, other: Self) -> bool {
    self.0 & other.0 == other.0
  }

  pub const fn intersects(self, other: Self) -> bool {
    self.0 & other.0 != 0
  }

  pub const fn without(self, other: Self) -> Self {
    Self(self.0 & !other.0)
  }
}

impl BitOr for Style {
  type Output = Self;

  fn bitor(self, rhs: Self) -> Self::Output {
    Self(self.0 | rhs.0)
  }
}

impl BitOrAssign for Style {
  fn bitor_assign(&mut self, rhs: Self) {
    self.0 |= rhs.0;
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSettings {
  pub title: String,
  /// Requested client area; decorations are added on top of it.
  pub size: Size,
  pub style: Style,
  pub class_name: String,
  /// Upper bound on how long construction waits for the window thread.
  /// `None` waits indefinitely.
  pub creation_timeout: Option<Duration>,
}

impl Default for WindowSettings {
  fn default() -> Self {
    Self {
      title: "Window".to_owned(),
      size: Size::default(),
      style: Style::CAPTION | Style::MINIMIZE_BOX | Style::MAXIMIZE_BOX | Style::SYSMENU,
      class_name: "wintask_window".to_owned(),
      creation_timeout: None,
    }
  }
}

impl WindowSettings {
  pub fn with_title(mut self, title: impl Into<String>) -> Self {
    self.title = title.into();
    self
  }

  pub fn with_size(mut self, size: impl Into<Size>) -> Self {
    self.size = size.into();
    self
  }

  pub fn with_style(mut self, style: Style) -> Self {
    self.style = style;
    self
  }

  pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
    self.class_name = class_name.into();
    self
  }

  pub fn with_creation_timeout(mut self, timeout: Duration) -> Self {
    self.creation_timeout = Some(timeout);
    self
  }
}
