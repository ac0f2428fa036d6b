// examples/worker_pool.rs
use conduit::{Channel, JobResult, Select, WorkerPool};
use std::convert::Infallible;
use std::time::Duration;

#[tokio::main]
async fn main() {
  println!("--- Rendezvous handoff ---");
  {
    let ping = Channel::rendezvous();
    let tx = ping.sender();
    conduit::spawn(async move {
      tx.send("ping").await.expect("channel is open");
    });
    println!("[Main] Received: {:?}", ping.recv().await);
  }

  println!("\n--- Select with timeout ---");
  {
    let fast = Channel::<&str>::new(1);
    let slow = Channel::<&str>::new(1);
    let fast_tx = fast.sender();
    conduit::spawn(async move {
      tokio::time::sleep(Duration::from_millis(20)).await;
      fast_tx.send("fast").await.expect("channel is open");
    });

    for _ in 0..2 {
      let message = Select::new()
        .recv(&fast, |m| format!("fast channel: {:?}", m))
        .recv(&slow, |m| format!("slow channel: {:?}", m))
        .timeout(Duration::from_millis(100), || "timed out".to_string())
        .run()
        .await;
      println!("[Main] {}", message);
    }
  }

  println!("\n--- Worker pool ---");
  {
    let jobs = Channel::new(16);
    let results = Channel::<JobResult<u64, Infallible>>::new(16);

    let pool = WorkerPool::builder()
      .workers(3)
      .name("doubler")
      .close_output_on_drain(true)
      .build(jobs.receiver(), Some(results.sender()), |n: u64| async move {
        tokio::time::sleep(Duration::from_millis(1)).await;
        Ok(n * 2)
      })
      .expect("valid pool configuration");

    let producer = jobs.sender();
    conduit::spawn(async move {
      for n in 1..=100 {
        producer.send(n).await.expect("input is open");
      }
      producer.close().expect("input closed once");
    });

    let mut sum = 0;
    let mut stream_count = 0;
    while let Some(result) = results.recv().await {
      sum += result.expect("handler is infallible");
      stream_count += 1;
    }
    pool.await_drained().await;
    println!("[Main] {} results, sum = {}", stream_count, sum);
  }
}
