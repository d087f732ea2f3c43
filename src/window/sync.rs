//! One-shot hand-off from the window thread back to its creator.

use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};

use crate::error::{WindowError, WindowResult};

/// Zero-capacity, so a successful `send` means the receiver took the value.
pub(crate) fn oneshot<T>() -> (OneshotSender<T>, OneshotReceiver<T>) {
  let (sender, receiver) = channel::bounded(0);
  (OneshotSender(sender), OneshotReceiver(receiver))
}

/// Producer half. `send` consumes it, so at most one value is ever sent.
pub(crate) struct OneshotSender<T>(Sender<T>);

impl<T> OneshotSender<T> {
  /// Blocks until the receiver takes the value. Returns `false` if the
  /// receiver is gone before it does.
  pub(crate) fn send(self, value: T) -> bool {
    self.0.send(value).is_ok()
  }
}

/// Consumer half. `recv` consumes it, so the value is read at most once.
pub(crate) struct OneshotReceiver<T>(Receiver<T>);

impl<T> OneshotReceiver<T> {
  pub(crate) fn recv(self, timeout: Option<Duration>) -> WindowResult<T> {
    match timeout {
      None => self.0.recv().map_err(|_| WindowError::Disconnected),
      Some(timeout) => self.0.recv_timeout(timeout).map_err(|error| match error {
        RecvTimeoutError::Timeout => WindowError::Timeout(timeout),
        RecvTimeoutError::Disconnected => WindowError::Disconnected,
      }),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn value_crosses_threads() {
    let (sender, receiver) = oneshot();
    let thread = std::thread::spawn(move || assert!(sender.send(42)));
    assert_eq!(receiver.recv(None).unwrap(), 42);
    thread.join().unwrap();
  }

  #[test]
  fn dropped_sender_disconnects() {
    let (sender, receiver) = oneshot::<u32>();
    drop(sender);
    assert!(matches!(receiver.recv(None), Err(WindowError::Disconnected)));
  }

  #[test]
  fn silent_sender_times_out() {
    let (_sender, receiver) = oneshot::<u32>();
    let timeout = Duration::from_millis(20);
    assert!(matches!(
      receiver.recv(Some(timeout)),
      Err(WindowError::Timeout(t)) if t == timeout
    ));
  }

  #[test]
  fn value_left_untaken_is_not_delivered() {
    let (sender, receiver) = oneshot::<u32>();
    let holder = std::thread::spawn(move || {
      std::thread::sleep(Duration::from_millis(50));
      drop(receiver);
    });
    assert!(!sender.send(1));
    holder.join().unwrap();
  }

  #[test]
  fn send_after_receiver_dropped_reports_failure() {
    let (sender, receiver) = oneshot::<u32>();
    drop(receiver);
    assert!(!sender.send(1));
  }
}
