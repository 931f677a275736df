use core::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::cancel::CancelToken;
use crate::coordinator::Coordinator;
use crate::error::SpawnError;
use crate::handoff::Handoff;
use crate::runtime::{DebugSpawner, TaskSpawner, ThreadSpawner, DEFAULT_THREAD_NAME};
use crate::unbounded::{AsyncReceiver, AsyncSender, Receiver, Sender};
use crate::worker::{Completion, Worker};

/// What the coordinator does with its queue storage each time the queue
/// runs empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReleasePolicy {
  /// Free every block. Memory goes back to the allocator after each burst.
  #[default]
  Eager,
  /// Keep a single block allocated so steady traffic that hovers around
  /// empty does not allocate on every value. Anything beyond it is freed.
  KeepBlock,
}

/// A builder for unbounded channels with a visible [`Worker`].
///
/// ```no_run
/// use spillway::{Builder, CancelToken, ReleasePolicy};
///
/// let token = CancelToken::new();
/// let (tx, rx, worker) = Builder::new()
///   .cancel_token(&token)
///   .release_policy(ReleasePolicy::KeepBlock)
///   .thread_name("ingest-buffer")
///   .build::<String>()
///   .expect("spawn coordinator")
///   .into_parts();
/// # drop((tx, rx, worker));
/// ```
pub struct Builder {
  cancel: Option<CancelToken>,
  release: ReleasePolicy,
  thread_name: Option<String>,
  spawner: Option<Arc<dyn TaskSpawner>>,
}

impl fmt::Debug for Builder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Builder")
      .field("cancel", &self.cancel)
      .field("release", &self.release)
      .field("thread_name", &self.thread_name)
      .field("spawner", &DebugSpawner(&self.spawner))
      .finish()
  }
}

impl Default for Builder {
  fn default() -> Self {
    Self::new()
  }
}

impl Builder {
  pub fn new() -> Self {
    Builder {
      cancel: None,
      release: ReleasePolicy::default(),
      thread_name: None,
      spawner: None,
    }
  }

  /// Makes the coordinator observe `token`. Without one, the coordinator
  /// gets a private token reachable through [`Worker::cancel`].
  pub fn cancel_token(mut self, token: &CancelToken) -> Self {
    self.cancel = Some(token.clone());
    self
  }

  pub fn release_policy(mut self, policy: ReleasePolicy) -> Self {
    self.release = policy;
    self
  }

  /// Names the coordinator thread. Only used by the default thread spawner;
  /// ignored when a custom [`spawner`](Builder::spawner) is set.
  pub fn thread_name(mut self, name: impl Into<String>) -> Self {
    self.thread_name = Some(name.into());
    self
  }

  /// Runs the coordinator on `spawner` instead of a dedicated thread.
  pub fn spawner<S: TaskSpawner>(mut self, spawner: S) -> Self {
    self.spawner = Some(Arc::new(spawner));
    self
  }

  /// Builds a channel with blocking endpoints.
  pub fn build<T: Send + 'static>(self) -> Result<Spillway<Sender<T>, Receiver<T>>, SpawnError> {
    let (inbound, outbound, worker) = self.start()?;
    Ok(Spillway {
      sender: Sender::new(inbound),
      receiver: Receiver::new(outbound),
      worker,
    })
  }

  /// Builds a channel with async endpoints.
  pub fn build_async<T: Send + 'static>(self) -> Result<Spillway<AsyncSender<T>, AsyncReceiver<T>>, SpawnError> {
    let (inbound, outbound, worker) = self.start()?;
    Ok(Spillway {
      sender: AsyncSender::new(inbound),
      receiver: AsyncReceiver::new(outbound),
      worker,
    })
  }

  #[allow(clippy::type_complexity)]
  fn start<T: Send + 'static>(self) -> Result<(Arc<Handoff<T>>, Arc<Handoff<T>>, Worker), SpawnError> {
    let inbound = Arc::new(Handoff::new());
    let outbound = Arc::new(Handoff::new());
    let completion = Arc::new(Completion::new());
    let cancel = self.cancel.unwrap_or_default();

    let coordinator = Coordinator::new(inbound.clone(), outbound.clone(), self.release, completion.clone());
    let spawner = self.spawner.unwrap_or_else(|| {
      let name = self.thread_name.unwrap_or_else(|| DEFAULT_THREAD_NAME.to_string());
      Arc::new(ThreadSpawner::new().name(name))
    });

    // On failure the future has already been dropped, which closed both slots.
    if let Err(e) = spawner.spawn(Box::pin(coordinator.run(cancel.clone()))) {
      warn!(error = %e, "failed to spawn coordinator");
      return Err(e);
    }

    Ok((inbound, outbound, Worker::new(completion, cancel)))
  }
}

/// The parts of a freshly built channel.
#[derive(Debug)]
pub struct Spillway<S, R> {
  pub sender: S,
  pub receiver: R,
  pub worker: Worker,
}

impl<S, R> Spillway<S, R> {
  pub fn into_parts(self) -> (S, R, Worker) {
    (self.sender, self.receiver, self.worker)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::worker::ExitReason;
  use std::time::Duration;

  struct FailingSpawner;

  impl TaskSpawner for FailingSpawner {
    fn spawn(
      &self,
      _future: std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>,
    ) -> Result<(), SpawnError> {
      Err(SpawnError::Thread(std::io::Error::other("no threads left")))
    }
  }

  #[test]
  fn debug_output_hides_spawner_internals() {
    let builder = Builder::new().thread_name("x").spawner(ThreadSpawner::new());
    let rendered = format!("{:?}", builder);
    assert!(rendered.contains("thread_name: Some(\"x\")"));
    assert!(rendered.contains("spawner: Custom"));
  }

  #[test]
  fn shared_token_reaches_worker() {
    let token = CancelToken::new();
    let (_tx, _rx, worker) = Builder::new()
      .cancel_token(&token)
      .build::<u8>()
      .unwrap()
      .into_parts();
    token.cancel();
    assert_eq!(worker.join_timeout(Duration::from_secs(2)), Some(ExitReason::Cancelled));
  }

  #[test]
  fn spawn_failure_is_reported() {
    let result = Builder::new().spawner(FailingSpawner).build::<u8>();
    assert!(matches!(result, Err(SpawnError::Thread(_))));
  }
}
