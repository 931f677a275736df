// examples/pipeline.rs
use spillway::{Builder, CancelToken, ExitReason, ReleasePolicy};
use std::{thread, time::Duration};

fn main() {
  println!("--- Drain: producer finishes, consumer catches up ---");
  {
    let (tx, rx, worker) = Builder::new()
      .thread_name("pipeline-buffer")
      .build::<String>()
      .expect("spawn coordinator")
      .into_parts();

    let producer = thread::spawn(move || {
      for i in 0..5 {
        let msg = format!("job-{}", i);
        println!("[Producer] Sending: {}", msg);
        tx.send(msg).expect("coordinator exited early");
      }
      println!("[Producer] Done; dropping sender.");
    });

    // Slow consumer: the producer never waits for it.
    for msg in rx.iter() {
      println!("[Consumer] Received: {}", msg);
      thread::sleep(Duration::from_millis(20));
    }
    producer.join().unwrap();
    println!("[Main] Coordinator exited: {:?}", worker.join());
  }

  println!("\n--- Cancel: abandon whatever is still buffered ---");
  {
    let token = CancelToken::new();
    let (tx, rx, worker) = Builder::new()
      .cancel_token(&token)
      .release_policy(ReleasePolicy::KeepBlock)
      .build::<u32>()
      .expect("spawn coordinator")
      .into_parts();

    for i in 0..100 {
      tx.send(i).unwrap();
    }
    println!("[Consumer] First value: {:?}", rx.recv());

    token.cancel();
    let mut late = 0;
    while rx.recv().is_ok() {
      late += 1;
    }
    let reason = worker.join();
    assert_eq!(reason, ExitReason::Cancelled);
    println!("[Main] {} values arrived after cancel; exit: {:?}", late, reason);
    println!("[Main] Sender closed: {}", tx.is_closed());
  }
}
