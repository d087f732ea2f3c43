//! A fixed-size pool of worker threads draining one shared FIFO queue.
//!
//! Every worker waits on a single condition variable that is signalled when a
//! task is queued or when the pool shuts down. Tasks run outside the queue
//! lock, so a task may submit more work through a [`TaskSender`].
//!
//! A panicking task is caught and logged; the worker that ran it keeps
//! servicing the queue.

use std::{
  collections::VecDeque,
  num::NonZeroUsize,
  panic::{self, AssertUnwindSafe},
  sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
  thread::JoinHandle,
};

use tracing::*;

use crate::error::{panic_message, PoolError};

pub type Task = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
  pub threads: usize,
  pub thread_name: String,
}

impl Default for PoolSettings {
  fn default() -> Self {
    let threads = std::thread::available_parallelism()
      .map(NonZeroUsize::get)
      .unwrap_or(1);

    Self {
      threads,
      thread_name: "worker".to_owned(),
    }
  }
}

impl PoolSettings {
  pub fn with_threads(mut self, threads: usize) -> Self {
    self.threads = threads;
    self
  }

  pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
    self.thread_name = name.into();
    self
  }

  pub fn build(self) -> Result<WorkerPool, PoolError> {
    WorkerPool::with_settings(self)
  }
}

struct Queue {
  tasks: VecDeque<Task>,
  shutdown: bool,
}

struct Shared {
  queue: Mutex<Queue>,
  available: Condvar,
}

impl Shared {
  fn lock(&self) -> MutexGuard<'_, Queue> {
    // tasks never run under this lock, so a poisoned guard still holds a
    // consistent queue
    self.queue.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn push(&self, task: Task) -> bool {
    let mut queue = self.lock();
    if queue.shutdown {
      return false;
    }
    queue.tasks.push_back(task);
    drop(queue);
    self.available.notify_one();
    true
  }

  /// Blocks until a task is available. Returns `None` once the pool is shut
  /// down and the queue has been drained.
  fn next_task(&self) -> Option<Task> {
    let mut queue = self
      .available
      .wait_while(self.lock(), |queue| queue.tasks.is_empty() && !queue.shutdown)
      .unwrap_or_else(PoisonError::into_inner);
    queue.tasks.pop_front()
  }
}

/// Cloneable submission handle, usable from inside running tasks.
#[derive(Clone)]
pub struct TaskSender {
  shared: Arc<Shared>,
}

impl TaskSender {
  /// Queues `task`. Returns `false` if the pool is shutting down, in which
  /// case the task is dropped without running.
  pub fn submit(&self, task: impl FnOnce() + Send + 'static) -> bool {
    let accepted = self.shared.push(Box::new(task));
    if !accepted {
      warn!("worker pool is shutting down, dropping task");
    }
    accepted
  }
}

pub struct WorkerPool {
  shared: Arc<Shared>,
  workers: Vec<JoinHandle<()>>,
  thread_count: usize,
}

impl WorkerPool {
  pub fn new(thread_count: usize) -> Result<Self, PoolError> {
    Self::with_settings(PoolSettings::default().with_threads(thread_count))
  }

  pub fn with_settings(settings: PoolSettings) -> Result<Self, PoolError> {
    if settings.threads == 0 {
      return Err(PoolError::ZeroThreads);
    }

    let shared = Arc::new(Shared {
      queue: Mutex::new(Queue {
        tasks: VecDeque::new(),
        shutdown: false,
      }),
      available: Condvar::new(),
    });

    let mut pool = Self {
      shared,
      workers: Vec::with_capacity(settings.threads),
      thread_count: settings.threads,
    };

    for index in 0..settings.threads {
      let shared = pool.shared.clone();
      let name = format!("{}-{index}", settings.thread_name);
      // on failure the partially built pool is dropped, which joins the
      // workers spawned so far
      let worker = std::thread::Builder::new()
        .name(name)
        .spawn(move || Self::work(&shared))?;
      pool.workers.push(worker);
    }

    debug!("started worker pool with {} threads", settings.threads);

    Ok(pool)
  }

  fn work(shared: &Shared) {
    while let Some(task) = shared.next_task() {
      if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
        error!("task panicked: {}", panic_message(payload.as_ref()));
      }
    }

    trace!(
      "[`{}`]: worker exiting",
      std::thread::current().name().unwrap_or_default()
    );
  }

  /// Queues `task` without blocking. Tasks submitted after shutdown has begun
  /// are dropped and never run.
  pub fn submit(&self, task: impl FnOnce() + Send + 'static) {
    self.sender().submit(task);
  }

  pub fn sender(&self) -> TaskSender {
    TaskSender {
      shared: self.shared.clone(),
    }
  }

  /// Number of tasks queued but not yet picked up by a worker.
  pub fn pending(&self) -> usize {
    self.shared.lock().tasks.len()
  }

  pub fn thread_count(&self) -> usize {
    self.thread_count
  }

  pub fn is_shut_down(&self) -> bool {
    self.shared.lock().shutdown
  }

  /// Stops accepting tasks, lets the workers drain everything already queued
  /// and joins them. Calling it again is a no-op.
  pub fn shutdown(&mut self) {
    self.shared.lock().shutdown = true;
    self.shared.available.notify_all();

    if self.workers.is_empty() {
      return;
    }

    trace!("joining {} worker threads", self.workers.len());
    for worker in self.workers.drain(..) {
      if let Err(payload) = worker.join() {
        error!("worker thread panicked: {}", panic_message(payload.as_ref()));
      }
    }
    debug!("worker pool shut down");
  }
}

impl Drop for WorkerPool {
  fn drop(&mut self) {
    self.shutdown();
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    mpsc,
  };

  use super::*;

  #[test]
  fn zero_threads_is_rejected() {
    assert!(matches!(WorkerPool::new(0), Err(PoolError::ZeroThreads)));
  }

  #[test]
  fn single_worker_runs_tasks_in_submission_order() {
    let pool = WorkerPool::new(1).unwrap();
    let order = Arc::new(Mutex::new(Vec::new()));

    for i in 0..32 {
      let order = order.clone();
      pool.submit(move || order.lock().unwrap().push(i));
    }
    drop(pool);

    assert_eq!(*order.lock().unwrap(), (0..32).collect::<Vec<_>>());
  }

  #[test]
  fn task_can_submit_more_work() {
    let pool = WorkerPool::new(2).unwrap();
    let sender = pool.sender();
    let (done_sender, done_receiver) = mpsc::channel();

    pool.submit(move || {
      sender.submit(move || done_sender.send(()).unwrap());
    });

    done_receiver.recv().unwrap();
  }

  #[test]
  fn panicking_task_does_not_stop_the_worker() {
    let pool = WorkerPool::new(1).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    pool.submit(|| panic!("boom"));
    for _ in 0..10 {
      let counter = counter.clone();
      pool.submit(move || {
        counter.fetch_add(1, Ordering::SeqCst);
      });
    }
    drop(pool);

    assert_eq!(counter.load(Ordering::SeqCst), 10);
  }

  #[test]
  fn shutdown_is_idempotent() {
    let mut pool = WorkerPool::new(3).unwrap();
    pool.shutdown();
    pool.shutdown();
    assert!(pool.is_shut_down());
    assert_eq!(pool.pending(), 0);
    assert_eq!(pool.thread_count(), 3);
  }
}
