//! Unbounded sync/async channels with a visible background coordinator.
//!
//! A producer hands values to a coordinator task that buffers them in a
//! growable queue, so sending never waits on a slow consumer. The consumer
//! receives in strict FIFO order and sees a clean end of stream once every
//! sender is closed and the buffer has drained. A [`CancelToken`] stops the
//! coordinator early, dropping whatever it still holds.
//!
//! ```no_run
//! let (tx, rx) = spillway::unbounded();
//! for i in 0..3 {
//!   tx.send(i).unwrap();
//! }
//! drop(tx);
//! assert_eq!(rx.iter().collect::<Vec<_>>(), vec![0, 1, 2]);
//! ```

pub mod builder;
pub mod cancel;
pub mod error;
pub mod runtime;
pub mod unbounded;
pub mod worker;

mod coordinator;
mod handoff;

// Internal utilities - not part of public API but exposed for crate use
mod internal;
mod sync_util;

pub use builder::{Builder, ReleasePolicy, Spillway};
pub use cancel::CancelToken;
pub use error::{
  CloseError, RecvError, RecvErrorTimeout, SendError, SendTimeoutError, SpawnError, TryRecvError, TrySendError,
};
#[cfg(feature = "tokio")]
pub use runtime::TokioSpawner;
pub use runtime::{TaskSpawner, ThreadSpawner};
pub use unbounded::{
  unbounded, unbounded_async, unbounded_async_with_cancel, unbounded_with_cancel, AsyncReceiver, AsyncSender, Receiver,
  Sender,
};
pub use worker::{ExitReason, Worker};
