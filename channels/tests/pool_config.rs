mod common;
use common::*;

use conduit::{Channel, PoolBuilder, PoolConfig, PoolError};
use std::convert::Infallible;

#[test]
fn config_deserializes_with_defaults() {
  let config: PoolConfig = serde_json::from_str(r#"{ "workers": 3, "name": "thumbnails" }"#).unwrap();
  assert_eq!(config.workers, 3);
  assert_eq!(config.name, "thumbnails");
  assert!(!config.close_output_on_drain);

  let empty: PoolConfig = serde_json::from_str("{}").unwrap();
  assert_eq!(empty, PoolConfig::default());
}

#[test]
fn config_serializes_every_field() {
  let config = PoolConfig {
    workers: 2,
    name: "io".into(),
    close_output_on_drain: true,
  };
  let value = serde_json::to_value(&config).unwrap();
  assert_eq!(value["workers"], 2);
  assert_eq!(value["name"], "io");
  assert_eq!(value["close_output_on_drain"], true);
}

#[tokio::test]
async fn pool_builds_from_loaded_config() {
  let config: PoolConfig = serde_json::from_str(r#"{ "workers": 2 }"#).unwrap();
  let jobs = Channel::new(4);
  let pool = PoolBuilder::from_config(config)
    .build(jobs.receiver(), None, |n: u8| async move { Ok::<_, Infallible>(n) })
    .unwrap();
  assert_eq!(pool.worker_count(), 2);

  jobs.send(1).await.unwrap();
  jobs.close().unwrap();
  pool.await_drained_timeout(SHORT_TIMEOUT).await.unwrap();
}

#[test]
fn zero_workers_in_config_is_rejected() {
  let config: PoolConfig = serde_json::from_str(r#"{ "workers": 0 }"#).unwrap();
  let jobs = Channel::<u8>::new(1);
  let result = PoolBuilder::from_config(config).build(jobs.receiver(), None, |n: u8| async move {
    Ok::<_, Infallible>(n)
  });
  assert!(matches!(result, Err(PoolError::InvalidConfig(_))));
}
