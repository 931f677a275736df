use std::{fmt, future::Future, pin::Pin, thread};

use crate::error::SpawnError;

/// Name given to coordinator threads started by [`ThreadSpawner`].
pub const DEFAULT_THREAD_NAME: &str = "spillway-coordinator";

/// A trait for spawning the coordinator future onto an executor.
pub trait TaskSpawner: Send + Sync + 'static {
  /// Spawns a type-erased future. If this fails the future must be dropped,
  /// which closes both endpoints of the channel it would have served.
  fn spawn(&self, future: Pin<Box<dyn Future<Output = ()> + Send>>) -> Result<(), SpawnError>;
}

/// Runs every coordinator on its own OS thread, driven by a minimal
/// blocking executor. Needs no async runtime.
#[derive(Debug, Clone)]
pub struct ThreadSpawner {
  name: String,
  stack_size: Option<usize>,
}

impl ThreadSpawner {
  pub fn new() -> Self {
    Self {
      name: DEFAULT_THREAD_NAME.to_string(),
      stack_size: None,
    }
  }

  /// Sets the name of the threads this spawner starts.
  pub fn name(mut self, name: impl Into<String>) -> Self {
    self.name = name.into();
    self
  }

  /// Sets the stack size of the threads this spawner starts.
  pub fn stack_size(mut self, bytes: usize) -> Self {
    self.stack_size = Some(bytes);
    self
  }
}

impl Default for ThreadSpawner {
  fn default() -> Self {
    Self::new()
  }
}

impl TaskSpawner for ThreadSpawner {
  fn spawn(&self, future: Pin<Box<dyn Future<Output = ()> + Send>>) -> Result<(), SpawnError> {
    let mut builder = thread::Builder::new().name(self.name.clone());
    if let Some(bytes) = self.stack_size {
      builder = builder.stack_size(bytes);
    }
    builder.spawn(move || futures_executor::block_on(future))?;
    Ok(())
  }
}

/// Spawns coordinators as Tokio tasks.
#[cfg(feature = "tokio")]
#[derive(Clone)]
pub struct TokioSpawner(tokio::runtime::Handle);

#[cfg(feature = "tokio")]
impl TokioSpawner {
  /// Creates a spawner that uses the current Tokio runtime context.
  /// Panics if called outside of a Tokio runtime.
  pub fn new() -> Self {
    Self(tokio::runtime::Handle::current())
  }

  pub fn from_handle(handle: tokio::runtime::Handle) -> Self {
    Self(handle)
  }
}

#[cfg(feature = "tokio")]
impl fmt::Debug for TokioSpawner {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TokioSpawner").finish_non_exhaustive()
  }
}

#[cfg(feature = "tokio")]
impl TaskSpawner for TokioSpawner {
  fn spawn(&self, future: Pin<Box<dyn Future<Output = ()> + Send>>) -> Result<(), SpawnError> {
    self.0.spawn(future);
    Ok(())
  }
}

pub(crate) struct DebugSpawner<'a>(pub(crate) &'a Option<std::sync::Arc<dyn TaskSpawner>>);

impl fmt::Debug for DebugSpawner<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.0 {
      Some(_) => f.write_str("Custom"),
      None => f.write_str("Thread"),
    }
  }
}
