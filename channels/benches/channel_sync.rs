use bench_matrix::{
  criterion_runner::sync_suite::SyncBenchmarkSuite, AbstractCombination, MatrixCellValue,
};
use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::thread;
use std::time::{Duration, Instant};

use conduit::Channel;

const ITEM_VALUE: u64 = 42;

// --- Config, State, Context ---
#[derive(Debug, Clone)]
struct ChannelBenchConfig {
  capacity: usize,
  num_producers: usize,
  num_consumers: usize,
  total_items: usize,
}

#[derive(Default, Debug)]
struct BenchContext {
  items_processed_total: usize,
}

struct ChannelSyncState;

fn extract_channel_config(combo: &AbstractCombination) -> Result<ChannelBenchConfig, String> {
  let capacity = combo.get_u64(0)? as usize;
  let num_producers = combo.get_u64(1)? as usize;
  let num_consumers = combo.get_u64(2)? as usize;
  let total_items = combo.get_u64(3)? as usize;

  if num_producers == 0 || num_consumers == 0 {
    return Err("Number of producers and consumers must be at least 1.".to_string());
  }

  Ok(ChannelBenchConfig {
    capacity,
    num_producers,
    num_consumers,
    total_items,
  })
}

fn setup_fn_channel_sync(_cfg: &ChannelBenchConfig) -> Result<(BenchContext, ChannelSyncState), String> {
  Ok((BenchContext::default(), ChannelSyncState))
}

fn benchmark_logic_channel_sync(
  mut ctx: BenchContext,
  state: ChannelSyncState,
  cfg: &ChannelBenchConfig,
) -> (BenchContext, ChannelSyncState, Duration) {
  // A fresh channel per iteration: close is one-shot.
  let channel = Channel::new(cfg.capacity);
  let start_time = Instant::now();

  let producers: Vec<_> = (0..cfg.num_producers)
    .map(|p_idx| {
      let tx = channel.sender();
      let base = cfg.total_items / cfg.num_producers;
      let items = base + usize::from(p_idx < cfg.total_items % cfg.num_producers);
      thread::spawn(move || {
        for _ in 0..items {
          tx.send_blocking(ITEM_VALUE).unwrap();
        }
      })
    })
    .collect();

  let consumers: Vec<_> = (0..cfg.num_consumers)
    .map(|_| {
      let rx = channel.receiver();
      thread::spawn(move || rx.iter().count())
    })
    .collect();

  for handle in producers {
    handle.join().expect("producer thread panicked");
  }
  channel.close().unwrap();
  let received: usize = consumers
    .into_iter()
    .map(|handle| handle.join().expect("consumer thread panicked"))
    .sum();

  let duration = start_time.elapsed();
  assert_eq!(received, cfg.total_items);
  ctx.items_processed_total += received;
  (ctx, state, duration)
}

fn teardown_channel_sync(_ctx: BenchContext, _state: ChannelSyncState, _cfg: &ChannelBenchConfig) {}

fn channel_sync_benches(c: &mut Criterion) {
  let parameter_axes = vec![
    vec![
      // Axis 0: Capacity
      MatrixCellValue::Unsigned(0), // Rendezvous
      MatrixCellValue::Unsigned(16),
      MatrixCellValue::Unsigned(1024),
    ],
    vec![
      // Axis 1: Num Senders
      MatrixCellValue::Unsigned(1),
      MatrixCellValue::Unsigned(4),
    ],
    vec![
      // Axis 2: Num Receivers
      MatrixCellValue::Unsigned(1),
      MatrixCellValue::Unsigned(4),
    ],
    vec![
      // Axis 3: Total Items
      MatrixCellValue::Unsigned(10_000),
      MatrixCellValue::Unsigned(100_000),
    ],
  ];
  let parameter_names = vec!["Cap", "Prod", "Cons", "Items"]
    .into_iter()
    .map(String::from)
    .collect();

  SyncBenchmarkSuite::new(
    c,
    "ChannelSync".to_string(),
    Some(parameter_names),
    parameter_axes,
    Box::new(extract_channel_config),
    setup_fn_channel_sync,
    benchmark_logic_channel_sync,
    teardown_channel_sync,
  )
  .throughput(|cfg: &ChannelBenchConfig| Throughput::Elements(cfg.total_items as u64))
  .run();
}

criterion_group!(benches, channel_sync_benches);
criterion_main!(benches);
