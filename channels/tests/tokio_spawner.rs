mod common;
use common::*;

use spillway::error::RecvError;
use spillway::{Builder, CancelToken, ExitReason, TokioSpawner};

#[tokio::test]
async fn coordinator_runs_as_a_tokio_task() {
  let (tx, rx, worker) = Builder::new()
    .spawner(TokioSpawner::new())
    .build_async::<u32>()
    .unwrap()
    .into_parts();

  for i in 0..ITEMS_MEDIUM as u32 {
    tx.send(i).await.unwrap();
  }
  drop(tx);

  for i in 0..ITEMS_MEDIUM as u32 {
    assert_eq!(rx.recv().await, Ok(i));
  }
  assert_eq!(rx.recv().await, Err(RecvError::Disconnected));

  let reason = tokio::time::timeout(LONG_TIMEOUT, worker.wait()).await.unwrap();
  assert_eq!(reason, ExitReason::Drained);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn blocking_endpoints_with_a_tokio_coordinator() {
  let token = CancelToken::new();
  let (tx, rx, worker) = Builder::new()
    .cancel_token(&token)
    .spawner(TokioSpawner::new())
    .build::<u32>()
    .unwrap()
    .into_parts();

  let received = tokio::task::spawn_blocking(move || {
    for i in 0..ITEMS_LOW as u32 {
      tx.send(i).unwrap();
    }
    let first = rx.recv();
    (first, rx)
  })
  .await
  .unwrap();
  assert_eq!(received.0, Ok(0));

  token.cancel();
  let reason = tokio::time::timeout(LONG_TIMEOUT, worker.wait()).await.unwrap();
  assert_eq!(reason, ExitReason::Cancelled);
}
