//! Window lifecycle against the headless backend.
//!
//! Window state is written by the window thread and read here without
//! locking. Every assertion on it follows `settle`, whose synchronous round
//! trip through the event queue orders the read after the writes; reads
//! without that handshake are snapshots that may lag behind.

use std::{
  collections::HashSet,
  ops::Deref,
  sync::Arc,
  time::{Duration, Instant},
};

use wintask::{
  prelude::*,
  window::{backend::ShowCommand, message::Response, registry},
};

fn init_tracing() {
  let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Closes the window before dropping it, so a failed assertion reports
/// instead of joining an event loop nobody ends.
struct Open(Option<Window<HeadlessBackend>>);

impl Deref for Open {
  type Target = Window<HeadlessBackend>;

  fn deref(&self) -> &Self::Target {
    self.0.as_ref().unwrap()
  }
}

impl Drop for Open {
  fn drop(&mut self) {
    if let Some(window) = self.0.take() {
      let _ = window.close();
    }
  }
}

fn open_with(backend: &Arc<HeadlessBackend>, settings: WindowSettings) -> Open {
  init_tracing();
  Open(Some(Window::with_backend(backend.clone(), settings).unwrap()))
}

fn open(backend: &Arc<HeadlessBackend>, width: u32, height: u32) -> Open {
  open_with(
    backend,
    WindowSettings::default()
      .with_size((width, height))
      .with_title("test"),
  )
}

fn wait_until(mut condition: impl FnMut() -> bool) {
  let deadline = Instant::now() + Duration::from_secs(5);
  while !condition() {
    assert!(Instant::now() < deadline, "condition not reached in time");
    std::thread::sleep(Duration::from_millis(5));
  }
}

/// Waits until the window thread has handled everything queued so far.
fn settle(window: &Window<HeadlessBackend>) {
  let null = Message::Other {
    message: 0,
    w_param: 0,
    l_param: 0,
  };
  let response = window
    .backend()
    .send_message(window.native_handle(), null)
    .unwrap();
  assert_eq!(response, Response::Default);
}

fn close(window: Open) {
  assert!(window.stage().is_alive());
  window.close().unwrap();
  window.wait_for_message_loop().unwrap();
  assert!(window.stage().is_terminal());
  assert_eq!(window.stage(), Stage::Destroyed);
}

#[test]
fn construction_yields_a_ready_window() {
  let backend = Arc::new(HeadlessBackend::new());
  let window = open(&backend, 800, 600);
  settle(&window);

  let handle = window.native_handle();
  assert_ne!(handle.get(), 0);
  assert_eq!(window.stage(), Stage::Ready);
  assert!((window.aspect_ratio() - 800.0 / 600.0).abs() < 1e-6);
  assert_eq!(window.size(), Size::new(800, 600));
  assert!(!window.is_minimized());
  assert_eq!(window.module_instance(), ModuleInstance(0x0040_0000));
  assert_eq!(backend.title(handle).as_deref(), Some("test"));
  assert_eq!(backend.show_command(handle), Some(ShowCommand::Default));
  assert!(registry::is_registered(window.id()));
  assert_eq!(backend.event_loops_entered(), 1);

  let id = window.id();
  close(window);
  assert!(backend.is_destroyed(handle));
  assert!(!registry::is_registered(id));
}

#[test]
fn window_size_includes_decorations() {
  let backend = Arc::new(HeadlessBackend::new());
  let window = open(&backend, 640, 360);

  let outer = backend.window_rect(window.native_handle()).unwrap().size();
  let style = WindowSettings::default().style;
  assert_eq!(outer, backend.adjust_size(Size::new(640, 360), style));
  assert!(outer.width > 640 && outer.height > 360);

  close(window);
}

#[test]
fn minimize_keeps_size_and_restore_updates_it() {
  let backend = Arc::new(HeadlessBackend::new());
  let window = open(&backend, 800, 600);
  let handle = window.native_handle();

  backend
    .send_message(handle, Message::Resized {
      mode: SizeMode::Minimized,
      size: Size::new(0, 0),
    })
    .unwrap();
  assert!(window.is_minimized());
  assert_eq!(window.size(), Size::new(800, 600));

  backend
    .send_message(handle, Message::Resized {
      mode: SizeMode::Restored,
      size: Size::new(1024, 768),
    })
    .unwrap();
  assert!(!window.is_minimized());
  assert_eq!(window.size(), Size::new(1024, 768));

  close(window);
}

#[test]
fn fullscreen_round_trip_restores_geometry() {
  let backend = Arc::new(HeadlessBackend::new());
  let window = open(&backend, 800, 600);
  let handle = window.native_handle();
  settle(&window);

  let rect = backend.window_rect(handle).unwrap();
  let style = backend.style(handle).unwrap();
  let monitor = backend.monitor_rect(handle).unwrap();

  for _ in 0..3 {
    let response = backend
      .send_message(handle, Message::fullscreen_toggle())
      .unwrap();
    assert_eq!(response, Response::Handled);
    settle(&window);

    assert!(window.is_fullscreen());
    assert_eq!(backend.window_rect(handle).unwrap(), monitor);
    assert!(!backend.style(handle).unwrap().intersects(Style::CAPTION));
    assert_eq!(backend.show_command(handle), Some(ShowCommand::Maximized));
    assert_eq!(window.size(), monitor.size());

    backend
      .send_message(handle, Message::fullscreen_toggle())
      .unwrap();
    settle(&window);

    assert!(!window.is_fullscreen());
    assert_eq!(backend.window_rect(handle).unwrap(), rect);
    assert_eq!(backend.style(handle).unwrap(), style);
    assert_eq!(backend.show_command(handle), Some(ShowCommand::Normal));
    assert_eq!(window.size(), Size::new(800, 600));
  }

  close(window);
}

#[test]
fn fullscreen_can_be_requested_from_the_owner() {
  let backend = Arc::new(HeadlessBackend::new());
  let window = open(&backend, 800, 600);
  let handle = window.native_handle();
  settle(&window);
  let rect = backend.window_rect(handle).unwrap();
  let monitor = backend.monitor_rect(handle).unwrap();

  // both requests are queued before the window thread sees either
  window.set_fullscreen(true).unwrap();
  window.set_fullscreen(true).unwrap();
  settle(&window);
  assert!(window.is_fullscreen());
  assert_eq!(backend.window_rect(handle).unwrap(), monitor);

  window.set_fullscreen(false).unwrap();
  window.set_fullscreen(false).unwrap();
  settle(&window);
  assert!(!window.is_fullscreen());
  assert_eq!(backend.window_rect(handle).unwrap(), rect);

  // a request matching the current state changes nothing
  window.set_fullscreen(false).unwrap();
  settle(&window);
  assert!(!window.is_fullscreen());
  assert_eq!(backend.window_rect(handle).unwrap(), rect);

  close(window);
}

#[test]
fn held_alt_enter_does_not_toggle_back() {
  let backend = Arc::new(HeadlessBackend::new());
  let window = open(&backend, 800, 600);
  let handle = window.native_handle();

  backend
    .send_message(handle, Message::fullscreen_toggle())
    .unwrap();
  let response = backend
    .send_message(handle, Message::Key {
      key: VirtualKey::RETURN,
      state: KeyState::Pressed,
      alt: true,
      repeat: true,
    })
    .unwrap();
  settle(&window);
  assert_eq!(response, Response::Default);
  assert!(window.is_fullscreen());

  close(window);
}

#[test]
fn plain_enter_is_not_a_toggle() {
  let backend = Arc::new(HeadlessBackend::new());
  let window = open(&backend, 800, 600);

  let response = backend
    .send_message(window.native_handle(), Message::Key {
      key: VirtualKey::RETURN,
      state: KeyState::Pressed,
      alt: false,
      repeat: false,
    })
    .unwrap();
  assert_eq!(response, Response::Default);
  assert!(!window.is_fullscreen());

  close(window);
}

#[test]
fn creation_failure_never_enters_the_event_loop() {
  init_tracing();
  let backend = Arc::new(HeadlessBackend::new());
  backend.fail_window_creation(true);

  let settings = WindowSettings::default().with_class_name("failing");
  let result = Window::with_backend(backend.clone(), settings);

  let error = result.err().unwrap();
  assert!(error.is_creation_error(), "{error}");
  assert_eq!(backend.event_loops_entered(), 0);
  // the window thread has been joined: its cleanup is already complete
  let attempts = backend.creation_attempts();
  assert_eq!(attempts.len(), 1);
  assert!(!registry::is_registered(attempts[0]));
  assert_eq!(backend.class_registry().count("failing"), 0);
  assert!(!backend.is_class_registered("failing"));
  assert_eq!(backend.live_windows(), 0);

  backend.fail_window_creation(false);
  let window = open_with(&backend, WindowSettings::default().with_class_name("failing"));
  close(window);
}

#[test]
fn class_registration_failure_is_a_creation_error() {
  init_tracing();
  let backend = Arc::new(HeadlessBackend::new());
  backend.fail_class_registration(true);

  let settings = WindowSettings::default().with_class_name("unregistrable");
  let error = Window::with_backend(backend.clone(), settings)
    .err()
    .unwrap();
  assert!(error.is_creation_error(), "{error}");
  assert!(backend.creation_attempts().is_empty());
  assert_eq!(backend.event_loops_entered(), 0);
  assert_eq!(backend.class_registry().count("unregistrable"), 0);
  assert!(!backend.is_class_registered("unregistrable"));

  backend.fail_class_registration(false);
  let window = open_with(
    &backend,
    WindowSettings::default().with_class_name("unregistrable"),
  );
  close(window);
}

#[test]
fn timed_out_creation_cleans_up_after_itself() {
  init_tracing();
  let backend = Arc::new(HeadlessBackend::new());
  backend.delay_window_creation(Some(Duration::from_millis(200)));

  let settings = WindowSettings::default()
    .with_class_name("slow")
    .with_creation_timeout(Duration::from_millis(20));
  let error = Window::with_backend(backend.clone(), settings)
    .err()
    .unwrap();
  assert!(matches!(error, WindowError::Timeout(..)), "{error}");

  // the detached thread finishes creating, notices nobody waits, and tears
  // the window down again
  wait_until(|| backend.creation_attempts().len() == 1);
  let id = backend.creation_attempts()[0];
  wait_until(|| !registry::is_registered(id));
  assert_eq!(backend.class_registry().count("slow"), 0);
  assert!(!backend.is_class_registered("slow"));
  assert_eq!(backend.live_windows(), 0);
  assert_eq!(backend.event_loops_entered(), 1);
}

#[test]
fn title_and_resolution_reach_the_backend() {
  let backend = Arc::new(HeadlessBackend::new());
  let window = open(&backend, 800, 600);
  let handle = window.native_handle();
  let origin = backend.window_rect(handle).unwrap();

  window.set_title("renamed").unwrap();
  assert_eq!(window.title(), "renamed");
  assert_eq!(backend.title(handle).as_deref(), Some("renamed"));

  window.set_resolution(640, 480).unwrap();
  settle(&window);
  assert_eq!(window.size(), Size::new(640, 480));
  let rect = backend.window_rect(handle).unwrap();
  assert_eq!((rect.left, rect.top), (origin.left, origin.top));
  assert!((window.aspect_ratio() - 640.0 / 480.0).abs() < 1e-6);

  close(window);
}

#[test]
fn class_is_shared_until_the_last_window_closes() {
  let backend = Arc::new(HeadlessBackend::new());
  let class_name = WindowSettings::default().class_name;
  let first = open(&backend, 320, 240);
  let second = open(&backend, 320, 240);
  assert_ne!(first.native_handle(), second.native_handle());
  assert_eq!(backend.class_registry().count(&class_name), 2);

  close(first);
  assert_eq!(backend.class_registry().count(&class_name), 1);
  assert!(backend.is_class_registered(&class_name));

  close(second);
  assert_eq!(backend.class_registry().count(&class_name), 0);
  assert!(!backend.is_class_registered(&class_name));
}

#[test]
fn closed_window_rejects_requests_and_drops_cleanly() {
  let backend = Arc::new(HeadlessBackend::new());
  let window = open(&backend, 800, 600);
  window.close().unwrap();
  window.wait_for_message_loop().unwrap();
  // a second wait has nothing left to join
  window.wait_for_message_loop().unwrap();

  assert!(window.close().is_err());
  assert!(window.set_fullscreen(true).is_err());
  drop(window);
}

#[test]
fn size_reads_never_mix_two_updates() {
  let backend = Arc::new(HeadlessBackend::new());
  let window = open(&backend, 800, 600);
  let handle = window.native_handle();
  let published: HashSet<Size> = [Size::new(800, 600), Size::new(1920, 1080)].into();

  std::thread::scope(|scope| {
    let reader = scope.spawn(|| {
      for _ in 0..10_000 {
        assert!(published.contains(&window.size()));
      }
    });

    for index in 0..200 {
      let size = if index % 2 == 0 {
        Size::new(1920, 1080)
      } else {
        Size::new(800, 600)
      };
      backend
        .post_message(handle, Message::Resized {
          mode: SizeMode::Restored,
          size,
        })
        .unwrap();
    }

    reader.join().unwrap();
  });

  close(window);
}

#[cfg(not(windows))]
#[test]
fn default_backend_opens_a_window() {
  init_tracing();
  let window = Window::new(1280, 720, "default").unwrap();
  assert!((window.aspect_ratio() - 1280.0 / 720.0).abs() < 1e-6);
  assert_eq!(window.title(), "default");
  window.close().unwrap();
  window.wait_for_message_loop().unwrap();
}
