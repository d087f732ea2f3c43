/// Lifecycle of a window instance.
///
/// `Uninitialized -> Creating -> Ready -> Destroying -> Destroyed`, or
/// `Uninitialized -> Creating -> Failed` when the backend refuses the window.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
  #[default]
  Uninitialized,
  Creating,
  Ready,
  Destroying,
  Destroyed,
  Failed,
}

impl Stage {
  pub fn is_alive(&self) -> bool {
    matches!(self, Self::Ready)
  }

  pub fn is_terminal(&self) -> bool {
    matches!(self, Self::Destroyed | Self::Failed)
  }
}
