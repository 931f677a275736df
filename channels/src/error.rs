// src/error.rs

use core::fmt;

use thiserror::Error;

// Value-carrying errors hand the rejected item back. Their Debug impls are
// written by hand so that `T` does not need to be `Debug`.
macro_rules! impl_value_error {
  ($name:ident < $param:ident >, $($variant:ident),+ $(,)?) => {
    impl<$param> $name<$param> {
      /// Consumes the error, returning the value that could not be sent.
      #[inline]
      pub fn into_inner(self) -> $param {
        match self {
          $( $name::$variant(v) => v, )+
        }
      }
    }

    impl<$param> fmt::Debug for $name<$param> {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
          $( $name::$variant(_) => f.write_str(concat!(stringify!($name), "::", stringify!($variant), "(..)")), )+
        }
      }
    }
  };
}

/// Error returned by `try_send` when the value could not be handed off
/// immediately. The value is returned.
#[derive(Error, PartialEq, Eq, Clone)]
pub enum TrySendError<T> {
  /// The inbound hand-off slot still holds a value the coordinator has not
  /// picked up yet. This is transient: the buffer itself never fills.
  #[error("hand-off slot occupied")]
  Full(T),
  /// The input was closed through this handle, or the coordinator has exited
  /// (cancellation or every receiver dropped).
  #[error("channel closed")]
  Closed(T),
}

impl_value_error!(TrySendError<T>, Full, Closed);

impl<T> TrySendError<T> {
  /// Returns `true` if the send failed only because the slot was occupied.
  pub fn is_full(&self) -> bool {
    matches!(self, TrySendError::Full(_))
  }

  /// Returns `true` if the channel will never accept this value.
  pub fn is_closed(&self) -> bool {
    matches!(self, TrySendError::Closed(_))
  }
}

/// Error returned by `send_timeout`. The value is returned.
#[derive(Error, PartialEq, Eq, Clone)]
pub enum SendTimeoutError<T> {
  /// The coordinator did not pick the value up before the deadline.
  #[error("send operation timed out")]
  Timeout(T),
  /// The channel is closed.
  #[error("channel closed")]
  Closed(T),
}

impl_value_error!(SendTimeoutError<T>, Timeout, Closed);

/// Error returned by blocking and async `send` operations.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum SendError {
  /// The input was closed through this handle, or the coordinator has exited.
  #[error("channel closed")]
  Closed,
}

/// Error returned by `try_recv`.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum TryRecvError {
  /// No value is ready yet, but the stream has not ended.
  #[error("channel empty")]
  Empty,
  /// End of stream: every buffered value has been delivered (or abandoned by
  /// cancellation) and no more will arrive.
  #[error("channel disconnected (drained and closed)")]
  Disconnected,
}

/// Error returned by `recv`. This is the end-of-stream signal.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum RecvError {
  /// End of stream.
  #[error("channel disconnected (drained and closed)")]
  Disconnected,
}

/// Error returned by `recv_timeout`.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum RecvErrorTimeout {
  /// End of stream.
  #[error("channel disconnected")]
  Disconnected,
  /// The timeout elapsed before a value became available.
  #[error("receive operation timed out")]
  Timeout,
}

/// Error returned when closing a handle that is already closed.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
#[error("channel handle is already closed")]
pub struct CloseError;

/// Error returned when the coordinator task could not be started.
#[derive(Error, Debug)]
pub enum SpawnError {
  /// The dedicated coordinator thread could not be created.
  #[error("failed to spawn coordinator thread: {0}")]
  Thread(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Opaque;

  #[test]
  fn value_errors_do_not_need_debug_payloads() {
    let err = TrySendError::Full(Opaque);
    assert_eq!(format!("{:?}", err), "TrySendError::Full(..)");
    assert!(err.is_full());
    assert!(!err.is_closed());

    let err = SendTimeoutError::Closed(Opaque);
    assert_eq!(format!("{:?}", err), "SendTimeoutError::Closed(..)");
  }

  #[test]
  fn into_inner_returns_the_rejected_value() {
    assert_eq!(TrySendError::Closed(7).into_inner(), 7);
    assert_eq!(SendTimeoutError::Timeout("late").into_inner(), "late");
  }

  #[test]
  fn display_messages() {
    assert_eq!(TrySendError::Closed(()).to_string(), "channel closed");
    assert_eq!(RecvErrorTimeout::Timeout.to_string(), "receive operation timed out");
    assert_eq!(CloseError.to_string(), "channel handle is already closed");
  }
}
