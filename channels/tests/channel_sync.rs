mod common;
use common::*;

use conduit::error::{RecvTimeoutError, SendTimeoutError, TryRecvError, TrySendError};
use conduit::{bounded, CloseError, Channel};
use serial_test::serial;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
#[serial]
fn rendezvous_send_blocks_until_received() {
  let channel = Channel::rendezvous();
  let tx = channel.sender();
  let start = Instant::now();
  let sender = thread::spawn(move || {
    tx.send_blocking(7).unwrap();
    Instant::now()
  });

  thread::sleep(BLOCK_CHECK);
  assert!(!sender.is_finished(), "rendezvous send completed without a receiver");

  assert_eq!(channel.recv_blocking(), Some(7));
  let completed_at = sender.join().unwrap();
  assert!(completed_at.duration_since(start) >= BLOCK_CHECK);
  assert_eq!(channel.len(), 0);
}

#[test]
fn rendezvous_recv_blocks_until_sent() {
  let channel = Channel::rendezvous();
  let rx = channel.receiver();
  let receiver = thread::spawn(move || rx.recv_blocking());

  thread::sleep(BLOCK_CHECK);
  assert!(!receiver.is_finished());

  channel.send_blocking("hello").unwrap();
  assert_eq!(receiver.join().unwrap(), Some("hello"));
}

#[test]
fn bounded_buffers_up_to_capacity() {
  let channel = Channel::new(3);
  for i in 0..3 {
    channel.send_blocking(i).unwrap();
  }
  assert!(channel.is_full());
  assert_eq!(channel.try_send(3), Err(TrySendError::Full(3)));

  let tx = channel.sender();
  let fourth = thread::spawn(move || tx.send_blocking(3));
  thread::sleep(BLOCK_CHECK);
  assert!(!fourth.is_finished(), "fourth send must wait for room");
  assert_eq!(channel.len(), 3);

  assert_eq!(channel.recv_blocking(), Some(0));
  fourth.join().unwrap().unwrap();
  assert_eq!(channel.len(), 3);
  for expected in 1..=3 {
    assert_eq!(channel.recv_blocking(), Some(expected));
  }
}

#[test]
fn fifo_order_across_receivers() {
  let (tx, rx) = bounded(ITEMS_LOW);
  for i in 0..ITEMS_LOW {
    tx.send_blocking(i).unwrap();
  }
  tx.close().unwrap();

  let rx2 = rx.clone();
  let mut received = Vec::new();
  loop {
    let next = if received.len() % 2 == 0 {
      rx.recv_blocking()
    } else {
      rx2.recv_blocking()
    };
    match next {
      Some(item) => received.push(item),
      None => break,
    }
  }
  assert_eq!(received, (0..ITEMS_LOW).collect::<Vec<_>>());
}

#[test]
fn drain_after_close() {
  let channel = Channel::new(4);
  channel.send_blocking('a').unwrap();
  channel.send_blocking('b').unwrap();
  channel.close().unwrap();

  assert!(channel.is_closed());
  assert_eq!(channel.recv_blocking(), Some('a'));
  assert_eq!(channel.recv_blocking(), Some('b'));
  assert_eq!(channel.recv_blocking(), None);
  assert_eq!(channel.recv_blocking(), None);
  assert_eq!(channel.try_recv(), Err(TryRecvError::Closed));
}

#[test]
fn send_after_close_returns_the_value() {
  let channel = Channel::new(1);
  channel.close().unwrap();
  let err = channel.send_blocking(String::from("late")).unwrap_err();
  assert_eq!(err.into_inner(), "late");
  assert_eq!(channel.try_send(1.to_string()), Err(TrySendError::Closed("1".to_string())));
}

#[test]
fn double_close_is_rejected() {
  let (tx, _rx) = bounded::<u8>(1);
  assert_eq!(tx.close(), Ok(()));
  assert_eq!(tx.clone().close(), Err(CloseError));
}

#[test]
fn close_wakes_blocked_receivers() {
  let channel = Channel::<u32>::new(2);
  let receivers: Vec<_> = (0..3)
    .map(|_| {
      let rx = channel.receiver();
      thread::spawn(move || rx.recv_blocking())
    })
    .collect();

  thread::sleep(BLOCK_CHECK);
  channel.close().unwrap();
  for receiver in receivers {
    assert_eq!(receiver.join().unwrap(), None);
  }
}

#[test]
fn dropping_handles_does_not_close() {
  let channel = Channel::new(1);
  let (tx, rx) = channel.clone().split();
  drop(tx);
  drop(rx);
  assert!(!channel.is_closed());
  channel.try_send(1).unwrap();
  assert_eq!(channel.try_recv(), Ok(1));
}

#[test]
#[serial]
fn recv_timeout_waits_the_full_duration() {
  let channel = Channel::<u8>::new(1);
  let start = Instant::now();
  assert_eq!(channel.recv_timeout(BLOCK_CHECK), Err(RecvTimeoutError::Timeout));
  assert!(start.elapsed() >= BLOCK_CHECK);

  channel.close().unwrap();
  assert_eq!(channel.recv_timeout(BLOCK_CHECK), Err(RecvTimeoutError::Closed));
}

#[test]
#[serial]
fn send_timeout_succeeds_when_room_appears() {
  let channel = Channel::new(1);
  channel.send_blocking(0).unwrap();

  let rx = channel.receiver();
  let drainer = thread::spawn(move || {
    thread::sleep(BLOCK_CHECK);
    rx.recv_blocking()
  });

  channel.send_timeout(1, LONG_TIMEOUT).unwrap();
  assert_eq!(drainer.join().unwrap(), Some(0));
  assert_eq!(channel.recv_blocking(), Some(1));

  match channel.send_timeout(2, Duration::from_millis(1)) {
    Ok(()) => {}
    Err(SendTimeoutError::Timeout(_)) => panic!("buffer had room"),
    Err(SendTimeoutError::Closed(_)) => panic!("channel is open"),
  }
}

#[test]
fn unrepresentable_timeouts_wait_without_a_deadline() {
  let channel = Channel::rendezvous();
  let rx = channel.receiver();
  let receiver = thread::spawn(move || rx.recv_timeout(Duration::MAX));

  thread::sleep(BLOCK_CHECK);
  channel.send_timeout(10u32, Duration::MAX).unwrap();
  assert_eq!(receiver.join().unwrap(), Ok(10));
}

#[test]
fn many_producers_many_consumers_deliver_each_item_once() {
  const PRODUCERS: usize = 4;
  const CONSUMERS: usize = 4;

  let channel = Channel::new(8);
  let sum = Arc::new(AtomicUsize::new(0));
  let count = Arc::new(AtomicUsize::new(0));

  let consumers: Vec<_> = (0..CONSUMERS)
    .map(|_| {
      let rx = channel.receiver();
      let sum = sum.clone();
      let count = count.clone();
      thread::spawn(move || {
        for item in rx.iter() {
          sum.fetch_add(item, Ordering::Relaxed);
          count.fetch_add(1, Ordering::Relaxed);
        }
      })
    })
    .collect();

  let producers: Vec<_> = (0..PRODUCERS)
    .map(|p| {
      let tx = channel.sender();
      thread::spawn(move || {
        for i in 0..ITEMS_HIGH {
          tx.send_blocking(p * ITEMS_HIGH + i).unwrap();
        }
      })
    })
    .collect();

  for producer in producers {
    producer.join().unwrap();
  }
  channel.close().unwrap();
  for consumer in consumers {
    consumer.join().unwrap();
  }

  let total = PRODUCERS * ITEMS_HIGH;
  assert_eq!(count.load(Ordering::Relaxed), total);
  assert_eq!(sum.load(Ordering::Relaxed), total * (total - 1) / 2);
}
