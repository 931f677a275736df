mod common;
use common::*;

use futures_util::StreamExt;
use spillway::error::{RecvError, SendError, TryRecvError};
use spillway::{unbounded_async, Builder, ExitReason};

#[tokio::test]
async fn async_smoke() {
  let (tx, rx) = unbounded_async();
  tx.send(10).await.unwrap();
  assert_eq!(rx.recv().await, Ok(10));
}

#[tokio::test]
async fn async_buffers_without_a_reader() {
  let (tx, rx) = unbounded_async();
  for i in 0..ITEMS_HIGH {
    tx.send(i).await.unwrap();
  }
  drop(tx);

  let received: Vec<_> = rx.collect().await;
  assert_eq!(received, (0..ITEMS_HIGH).collect::<Vec<_>>());
}

#[tokio::test]
async fn async_recv_waits_for_a_value() {
  let (tx, rx) = unbounded_async();
  let handle = tokio::spawn(async move {
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    tx.send("hello").await.unwrap();
  });
  let value = tokio::time::timeout(LONG_TIMEOUT, rx.recv())
    .await
    .expect("value never arrived");
  assert_eq!(value, Ok("hello"));
  handle.await.unwrap();
}

#[tokio::test]
async fn async_all_producers_drop_signals_disconnect() {
  let (tx, rx) = unbounded_async::<()>();
  let tx2 = tx.clone();
  drop(tx);
  drop(tx2);
  assert_eq!(rx.recv().await, Err(RecvError::Disconnected));
  assert_eq!(rx.recv().await, Err(RecvError::Disconnected));
}

#[tokio::test]
async fn async_try_recv_sees_delivered_values() {
  let (tx, rx) = unbounded_async::<i32>();
  assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
  tx.send(1).await.unwrap();

  let value = tokio::time::timeout(LONG_TIMEOUT, async {
    loop {
      match rx.try_recv() {
        Err(TryRecvError::Empty) => tokio::task::yield_now().await,
        other => return other,
      }
    }
  })
  .await
  .expect("value never reached the receiver");
  assert_eq!(value, Ok(1));
}

#[tokio::test]
async fn async_send_after_close_fails() {
  let (tx, rx) = unbounded_async::<u8>();
  tx.close().unwrap();
  assert!(tx.close().is_err());
  assert!(tx.is_closed());
  assert_eq!(tx.send(1).await, Err(SendError::Closed));
  assert_eq!(rx.recv().await, Err(RecvError::Disconnected));
}

#[tokio::test]
async fn async_many_producers_one_consumer() {
  const PRODUCERS: usize = 4;
  let (tx, rx) = unbounded_async();

  let mut handles = Vec::new();
  for p in 0..PRODUCERS {
    let tx = tx.clone();
    handles.push(tokio::spawn(async move {
      for i in 0..ITEMS_MEDIUM {
        tx.send((p, i)).await.unwrap();
      }
    }));
  }
  drop(tx);

  let mut next = [0usize; PRODUCERS];
  let mut stream = rx;
  while let Some((p, i)) = stream.next().await {
    assert_eq!(next[p], i);
    next[p] += 1;
  }
  assert!(next.iter().all(|&n| n == ITEMS_MEDIUM));

  for handle in handles {
    handle.await.unwrap();
  }
}

#[tokio::test]
async fn worker_wait_resolves_after_drain() {
  let (tx, rx, worker) = Builder::new().build_async::<u32>().unwrap().into_parts();
  tx.send(1).await.unwrap();
  drop(tx);
  assert_eq!(rx.recv().await, Ok(1));
  assert_eq!(rx.recv().await, Err(RecvError::Disconnected));

  let reason = tokio::time::timeout(LONG_TIMEOUT, worker.wait())
    .await
    .expect("coordinator never exited");
  assert_eq!(reason, ExitReason::Drained);
}
