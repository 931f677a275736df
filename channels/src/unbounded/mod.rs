//! Unbounded channels backed by a buffering coordinator.
//!
//! Senders never wait for the consumer: a value only has to be picked up by
//! the coordinator, which queues it. Receivers get values in the order they
//! were accepted and see [`RecvError::Disconnected`](crate::RecvError) once
//! every sender is closed and the queue has drained.

mod consumer;
mod producer;

pub use consumer::{AsyncReceiver, IntoIter, Iter, Receiver, RecvFuture};
pub use producer::{AsyncSender, SendFuture, Sender};

use crate::builder::{Builder, Spillway};
use crate::cancel::CancelToken;
use crate::error::SpawnError;

fn expect_spawned<S, R>(built: Result<Spillway<S, R>, SpawnError>) -> (S, R) {
  match built {
    Ok(spillway) => {
      let (tx, rx, _worker) = spillway.into_parts();
      (tx, rx)
    }
    Err(e) => panic!("failed to spawn spillway coordinator: {}", e),
  }
}

/// Creates an unbounded channel with blocking endpoints.
///
/// The coordinator runs on its own thread until the stream is drained or
/// every receiver is gone. Use [`Builder`] to keep a [`Worker`](crate::Worker)
/// handle.
///
/// # Panics
///
/// Panics if the coordinator thread cannot be spawned.
pub fn unbounded<T: Send + 'static>() -> (Sender<T>, Receiver<T>) {
  expect_spawned(Builder::new().build())
}

/// Creates an unbounded channel with async endpoints.
///
/// # Panics
///
/// Panics if the coordinator thread cannot be spawned.
pub fn unbounded_async<T: Send + 'static>() -> (AsyncSender<T>, AsyncReceiver<T>) {
  expect_spawned(Builder::new().build_async())
}

/// Like [`unbounded`], but the coordinator stops as soon as `token` fires,
/// dropping whatever it still buffers and closing the receivers.
///
/// # Panics
///
/// Panics if the coordinator thread cannot be spawned.
pub fn unbounded_with_cancel<T: Send + 'static>(token: &CancelToken) -> (Sender<T>, Receiver<T>) {
  expect_spawned(Builder::new().cancel_token(token).build())
}

/// Async counterpart of [`unbounded_with_cancel`].
///
/// # Panics
///
/// Panics if the coordinator thread cannot be spawned.
pub fn unbounded_async_with_cancel<T: Send + 'static>(token: &CancelToken) -> (AsyncSender<T>, AsyncReceiver<T>) {
  expect_spawned(Builder::new().cancel_token(token).build_async())
}
