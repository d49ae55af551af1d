//! Memory store tests

use kvstores::{MemoryOptions, MemoryStore, Scalar, Store, StoreError, Value, ValueMap};
use std::sync::Arc;
use std::time::Duration;

fn store() -> MemoryStore {
  MemoryStore::new(MemoryOptions::default())
}

fn map(pairs: &[(&str, Scalar)]) -> ValueMap {
  pairs
    .iter()
    .map(|(k, v)| (k.to_string(), v.clone()))
    .collect()
}

#[tokio::test]
async fn test_set_get() {
  let store = store();
  store.set("key1", Scalar::from("value1")).await.unwrap();
  store.set("key2", Scalar::Integer(42)).await.unwrap();

  assert_eq!(
    store.get("key1").await.unwrap(),
    Some(Value::Scalar(Scalar::from("value1")))
  );
  // Values are not stringified
  assert_eq!(
    store.get("key2").await.unwrap(),
    Some(Value::Scalar(Scalar::Integer(42)))
  );
  assert_eq!(store.get("nonexistent").await.unwrap(), None);
}

#[tokio::test]
async fn test_set_exists_delete() {
  let store = store();
  store.set("k", Scalar::from("v")).await.unwrap();
  assert!(store.exists("k").await.unwrap());

  store.delete("k").await.unwrap();
  assert!(!store.exists("k").await.unwrap());
  store.delete("k").await.unwrap();
}

#[tokio::test]
async fn test_flush() {
  let store = store();
  for i in 0..10 {
    store
      .set(&format!("key{}", i), Scalar::Integer(i))
      .await
      .unwrap();
  }
  store.flush().await.unwrap();

  for i in 0..10 {
    assert!(!store.exists(&format!("key{}", i)).await.unwrap());
  }
  assert!(store.cache().is_empty());
}

#[tokio::test]
async fn test_map_keeps_types() {
  let store = store();
  let value = map(&[("a", Scalar::Integer(1)), ("b", Scalar::Integer(2))]);
  store.set_map("m", value.clone()).await.unwrap();

  assert_eq!(store.get_map("m").await.unwrap(), Some(value.clone()));
  assert_eq!(store.get("m").await.unwrap(), Some(Value::Map(value)));
}

#[tokio::test]
async fn test_set_map_overwrites() {
  let store = store();
  store
    .set_map("m", map(&[("old", Scalar::Null)]))
    .await
    .unwrap();
  store
    .set_map("m", map(&[("new", Scalar::Bool(true))]))
    .await
    .unwrap();

  assert_eq!(
    store.get_map("m").await.unwrap(),
    Some(map(&[("new", Scalar::Bool(true))]))
  );
}

#[tokio::test]
async fn test_slice_keeps_order_and_duplicates() {
  let store = store();
  store
    .set_slice("s", vec![Scalar::from("x"), Scalar::from("y")])
    .await
    .unwrap();
  store
    .append_slice("s", vec![Scalar::from("z")])
    .await
    .unwrap();
  store
    .append_slice("s", vec![Scalar::from("z")])
    .await
    .unwrap();

  assert_eq!(
    store.get_slice("s").await.unwrap(),
    Some(vec![
      Scalar::from("x"),
      Scalar::from("y"),
      Scalar::from("z"),
      Scalar::from("z"),
    ])
  );
}

#[tokio::test]
async fn test_append_to_missing_key_fails() {
  let store = store();
  let err = store
    .append_slice("missing", vec![Scalar::from("a")])
    .await
    .unwrap_err();
  assert!(matches!(err, StoreError::KeyNotFound(ref key) if key == "missing"));
  assert!(!store.exists("missing").await.unwrap());
}

#[tokio::test]
async fn test_never_set_collections_are_none() {
  let store = store();
  assert_eq!(store.get_map("nope").await.unwrap(), None);
  assert_eq!(store.get_slice("nope").await.unwrap(), None);
}

#[tokio::test]
#[should_panic(expected = "not a map")]
async fn test_get_map_on_scalar_panics() {
  let store = store();
  store.set("scalar", Scalar::from("v")).await.unwrap();
  let _ = store.get_map("scalar").await;
}

#[tokio::test]
#[should_panic(expected = "not a list")]
async fn test_get_slice_on_map_panics() {
  let store = store();
  store
    .set_map("m", map(&[("f", Scalar::Integer(1))]))
    .await
    .unwrap();
  let _ = store.get_slice("m").await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_append_keeps_at_least_one() {
  let store = Arc::new(store());
  store
    .set_slice("s", vec![Scalar::from("base")])
    .await
    .unwrap();

  let handles: Vec<_> = ["b", "c"]
    .into_iter()
    .map(|v| {
      let store = Arc::clone(&store);
      tokio::spawn(async move { store.append_slice("s", vec![Scalar::from(v)]).await })
    })
    .collect();
  for handle in handles {
    handle.await.unwrap().unwrap();
  }

  let values = store.get_slice("s").await.unwrap().unwrap();
  assert_eq!(values[0], Scalar::from("base"));
  assert!(values.len() == 2 || values.len() == 3);
  assert!(values.contains(&Scalar::from("b")) || values.contains(&Scalar::from("c")));
}

#[tokio::test]
async fn test_entries_expire() {
  let store = MemoryStore::new(MemoryOptions {
    expiration: Duration::from_millis(50),
    cleanup_interval: Duration::ZERO,
  });
  store.set("k", Scalar::from("v")).await.unwrap();
  store
    .set_slice("s", vec![Scalar::from("v")])
    .await
    .unwrap();
  assert!(store.exists("k").await.unwrap());

  tokio::time::sleep(Duration::from_millis(100)).await;

  assert!(!store.exists("k").await.unwrap());
  assert_eq!(store.get("k").await.unwrap(), None);
  // An expired list cannot be appended to
  assert!(store
    .append_slice("s", vec![Scalar::from("w")])
    .await
    .unwrap_err()
    .is_key_not_found());
}

#[tokio::test]
async fn test_janitor_purges_expired_entries() {
  let store = MemoryStore::new(MemoryOptions {
    expiration: Duration::from_millis(20),
    cleanup_interval: Duration::from_millis(20),
  });
  store.set("k", Scalar::from("v")).await.unwrap();

  tokio::time::sleep(Duration::from_millis(120)).await;
  assert_eq!(store.cache().evict_expired(), 0);
  assert!(store.cache().is_empty());
}

#[test]
fn test_janitor_purges_without_runtime() {
  let store = MemoryStore::new(MemoryOptions {
    expiration: Duration::from_millis(5),
    cleanup_interval: Duration::from_millis(5),
  });
  for i in 0..1000i64 {
    store.cache().set(
      &format!("k{}", i),
      Value::from(Scalar::from(i)),
      store.expiration(),
    );
  }

  std::thread::sleep(Duration::from_millis(100));
  assert_eq!(store.cache().evict_expired(), 0);
}

#[tokio::test]
async fn test_close_is_noop() {
  let store = store();
  store.set("k", Scalar::from("v")).await.unwrap();
  store.close().await.unwrap();
  assert!(store.exists("k").await.unwrap());
  assert_eq!(store.name(), "memory");
}
