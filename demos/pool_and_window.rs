use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::*;
use wintask::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt().init();

  let window = Window::new(800, 600, "wintask")?;
  info!("window {} ready, aspect ratio {}", window.id(), window.aspect_ratio());

  let done = Arc::new(AtomicUsize::new(0));
  {
    let pool = PoolSettings::default()
      .with_threads(4)
      .with_thread_name("demo")
      .build()?;

    for index in 0..16 {
      let done = done.clone();
      pool.submit(move || {
        let sum: u64 = (0..=index * 1_000).sum();
        debug!("task {index}: {sum}");
        done.fetch_add(1, Ordering::Relaxed);
      });
    }
  }
  info!("{} tasks finished", done.load(Ordering::Relaxed));

  // nothing closes a headless window but its owner
  #[cfg(not(windows))]
  window.close()?;

  window.wait_for_message_loop()?;
  Ok(())
}
