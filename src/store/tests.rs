//! Tests for the namespaced store.

use super::*;
use crate::backend::{BackendClient, MemoryBackend};
use crate::error::Error;
use futures::TryStreamExt;
use std::sync::Arc;
use std::time::Duration;

fn shared_memory() -> (Arc<MemoryBackend>, Arc<dyn BackendClient>) {
    let memory = Arc::new(MemoryBackend::new());
    let handle: Arc<dyn BackendClient> = memory.clone();
    (memory, handle)
}

fn sorted(mut keys: Vec<String>) -> Vec<String> {
    keys.sort();
    keys
}

#[tokio::test]
async fn test_set_and_get_exact_bytes() {
    let (_, backend) = shared_memory();
    let store = NamespacedStore::new(backend, "cache", None).unwrap();

    let binary = vec![0u8, 1, 2, 255, 128];
    store.set_many([("bin", binary.clone())]).await.unwrap();

    let values = store.get_many(&["bin"]).await.unwrap();
    assert_eq!(values, vec![Some(binary)]);
}

#[tokio::test]
async fn test_keys_are_prefixed_in_backend() {
    let (memory, backend) = shared_memory();
    let store = NamespacedStore::new(backend, "cache", None).unwrap();

    store.set_many([("job:1", "done")]).await.unwrap();

    let raw = memory
        .get_many(&["cache:job:1".to_string(), "job:1".to_string()])
        .await
        .unwrap();
    assert_eq!(raw, vec![Some(b"done".to_vec()), None]);
}

#[tokio::test]
async fn test_empty_value_is_not_absent() {
    let (_, backend) = shared_memory();
    let store = NamespacedStore::new(backend, "cache", None).unwrap();

    store.set_many([("empty", Vec::new())]).await.unwrap();

    let values = store.get_many(&["empty", "never-written"]).await.unwrap();
    assert_eq!(values, vec![Some(Vec::new()), None]);
}

#[tokio::test]
async fn test_delete_then_get_is_absent() {
    let (_, backend) = shared_memory();
    let store = NamespacedStore::new(backend, "cache", None).unwrap();

    store.set_many([("k", "v")]).await.unwrap();
    store.delete_many(&["k", "missing"]).await.unwrap();

    assert_eq!(store.get_many(&["k"]).await.unwrap(), vec![None]);
}

#[tokio::test]
async fn test_get_many_preserves_input_order() {
    let (_, backend) = shared_memory();
    let store = NamespacedStore::new(backend, "", None).unwrap();

    store
        .set_many([("c", "3"), ("a", "1"), ("b", "2")])
        .await
        .unwrap();

    let values = store.get_many(&["a", "b", "c"]).await.unwrap();
    assert_eq!(
        values,
        vec![Some(b"1".to_vec()), Some(b"2".to_vec()), Some(b"3".to_vec())]
    );

    let values = store.get_many(&["c", "x", "a"]).await.unwrap();
    assert_eq!(values, vec![Some(b"3".to_vec()), None, Some(b"1".to_vec())]);
}

#[tokio::test]
async fn test_scan_strips_namespace() {
    let (_, backend) = shared_memory();
    let store = NamespacedStore::builder()
        .backend(backend)
        .namespace("cache")
        .scan_page_size(2)
        .build()
        .await
        .unwrap();

    store
        .set_many([("x", ""), ("y", ""), ("z", "")])
        .await
        .unwrap();

    let keys = store.scan_keys(None).collect_keys().await.unwrap();
    assert_eq!(sorted(keys), vec!["x", "y", "z"]);
}

#[tokio::test]
async fn test_scan_with_prefix() {
    let (_, backend) = shared_memory();
    let store = NamespacedStore::new(backend, "cache", None).unwrap();

    store
        .set_many([("pre:a", ""), ("pre:b", ""), ("other", "")])
        .await
        .unwrap();

    let keys = store.scan_keys(Some("pre:")).collect_keys().await.unwrap();
    assert_eq!(sorted(keys), vec!["pre:a", "pre:b"]);
}

#[tokio::test]
async fn test_scan_prefix_with_glob_characters_is_literal() {
    let (_, backend) = shared_memory();
    let store = NamespacedStore::new(backend, "", None).unwrap();

    store
        .set_many([("a*1", ""), ("ab1", ""), ("a?", ""), ("[x]", "")])
        .await
        .unwrap();

    let keys = store.scan_keys(Some("a*")).collect_keys().await.unwrap();
    assert_eq!(keys, vec!["a*1"]);

    let keys = store.scan_keys(Some("[x")).collect_keys().await.unwrap();
    assert_eq!(keys, vec!["[x]"]);
}

#[tokio::test]
async fn test_scan_batches_and_stream_agree() {
    let (_, backend) = shared_memory();
    let store = NamespacedStore::builder()
        .backend(backend)
        .namespace("ns")
        .scan_page_size(3)
        .build()
        .await
        .unwrap();

    let entries: Vec<(String, Vec<u8>)> = (0..10).map(|i| (format!("k{i}"), Vec::new())).collect();
    store.set_many(entries).await.unwrap();

    let mut scan = store.scan_keys(None);
    assert!(!scan.is_finished());
    let mut pages = 0;
    let mut from_batches = Vec::new();
    while let Some(batch) = scan.next_batch().await.unwrap() {
        pages += 1;
        from_batches.extend(batch);
    }
    assert!(scan.is_finished());
    assert!(scan.cursor().is_terminal());
    assert_eq!(pages, 4);
    assert!(scan.next_batch().await.unwrap().is_none());

    let from_stream: Vec<String> = store.scan_keys(None).into_stream().try_collect().await.unwrap();
    assert_eq!(sorted(from_batches), sorted(from_stream));
}

#[tokio::test]
async fn test_each_scan_restarts_from_beginning() {
    let (_, backend) = shared_memory();
    let store = NamespacedStore::new(backend, "ns", None).unwrap();
    store.set_many([("a", ""), ("b", "")]).await.unwrap();

    let first = store.scan_keys(None).collect_keys().await.unwrap();
    let second = store.scan_keys(None).collect_keys().await.unwrap();
    assert_eq!(sorted(first), sorted(second));
}

#[tokio::test]
async fn test_namespaces_are_isolated() {
    let (_, backend) = shared_memory();
    let left = NamespacedStore::new(backend.clone(), "left", None).unwrap();
    let right = NamespacedStore::new(backend, "right", None).unwrap();

    left.set_many([("shared", "from-left")]).await.unwrap();
    right.set_many([("shared", "from-right"), ("only-right", "r")]).await.unwrap();

    assert_eq!(
        left.get_many(&["shared", "only-right"]).await.unwrap(),
        vec![Some(b"from-left".to_vec()), None]
    );
    assert_eq!(
        left.scan_keys(None).collect_keys().await.unwrap(),
        vec!["shared"]
    );
    assert_eq!(
        sorted(right.scan_keys(None).collect_keys().await.unwrap()),
        vec!["only-right", "shared"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_ttl_applies_to_every_write() {
    let (_, backend) = shared_memory();
    let store = NamespacedStore::new(backend, "cache", Some(1)).unwrap();
    assert_eq!(store.ttl(), Some(Duration::from_secs(1)));

    store.set_many([("a", "1"), ("b", "2")]).await.unwrap();
    assert_eq!(
        store.get_many(&["a", "b"]).await.unwrap(),
        vec![Some(b"1".to_vec()), Some(b"2".to_vec())]
    );

    tokio::time::advance(Duration::from_secs(1)).await;

    assert_eq!(store.get_many(&["a", "b"]).await.unwrap(), vec![None, None]);
    assert!(store.scan_keys(None).collect_keys().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_write_without_ttl_clears_previous_expiry() {
    let (_, backend) = shared_memory();
    let expiring = NamespacedStore::new(backend.clone(), "cache", Some(1)).unwrap();
    let durable = NamespacedStore::new(backend, "cache", None).unwrap();

    expiring.set_many([("k", "v1")]).await.unwrap();
    durable.set_many([("k", "v2")]).await.unwrap();

    tokio::time::advance(Duration::from_secs(10)).await;

    assert_eq!(durable.get_many(&["k"]).await.unwrap(), vec![Some(b"v2".to_vec())]);
}

#[tokio::test]
async fn test_build_requires_backend_or_url() {
    let err = NamespacedStore::builder()
        .namespace("cache")
        .build()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)), "{err}");
}

#[tokio::test]
async fn test_build_rejects_invalid_settings() {
    let (_, backend) = shared_memory();

    let zero_ttl = NamespacedStore::builder()
        .backend(backend.clone())
        .ttl_seconds(0)
        .build()
        .await;
    assert!(matches!(zero_ttl, Err(Error::Configuration(_))));

    let bad_namespace = NamespacedStore::builder()
        .backend(backend.clone())
        .namespace("a:b")
        .build()
        .await;
    assert!(matches!(bad_namespace, Err(Error::Configuration(_))));

    let zero_page = NamespacedStore::builder()
        .backend(backend)
        .scan_page_size(0)
        .build()
        .await;
    assert!(matches!(zero_page, Err(Error::Configuration(_))));

    let bad_url = NamespacedStore::builder().url("redis://localhost").build().await;
    assert!(matches!(bad_url, Err(Error::Configuration(_))));
}

#[tokio::test]
async fn test_close_leaves_borrowed_handle_open() {
    let (memory, backend) = shared_memory();
    let store = NamespacedStore::builder()
        .backend(backend)
        .url("memory://")
        .namespace("cache")
        .build()
        .await
        .unwrap();
    assert!(!store.owns_backend());

    store.close().await.unwrap();
    assert!(!memory.is_closed());
}

#[tokio::test]
async fn test_close_releases_owned_connection() {
    let store = NamespacedStore::builder()
        .url("memory://")
        .namespace("cache")
        .build()
        .await
        .unwrap();
    assert!(store.owns_backend());

    store.set_many([("k", "v")]).await.unwrap();
    store.close().await.unwrap();
}

#[tokio::test]
async fn test_backend_failure_surfaces_as_unavailable() {
    let (memory, backend) = shared_memory();
    let store = NamespacedStore::new(backend, "cache", None).unwrap();
    memory.close().await.unwrap();

    let err = store.get_many(&["k"]).await.unwrap_err();
    assert!(matches!(
        err,
        Error::BackendUnavailable {
            operation: "get_many",
            ..
        }
    ));

    let err = store.set_many([("k", "v")]).await.unwrap_err();
    assert!(err.is_backend());

    let err = store.scan_keys(None).collect_keys().await.unwrap_err();
    assert!(matches!(
        err,
        Error::BackendUnavailable {
            operation: "scan_keys",
            ..
        }
    ));

    // Empty batches never reach the closed backend.
    store.set_many(Vec::<(String, Vec<u8>)>::new()).await.unwrap();
    store.delete_many::<&str>(&[]).await.unwrap();
}
