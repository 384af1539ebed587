use std::{fmt, future::Future, sync::Arc};

use futures::{future::BoxFuture, FutureExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, span, warn, Instrument, Level};

use crate::{
    adapters::ObjectClient,
    model::storage::{KeyInfo, StorageError},
    util::key,
};

/// Durable key-value storage for certificate material.
///
/// Every operation takes a cancellation token; cancelling it aborts the
/// in-flight backend call and fails the operation with
/// [`StorageError::Cancelled`].
pub trait Storage: fmt::Display + Send + Sync {
    /// Writes `value` under `key`, replacing any existing value.
    fn store<'a>(
        &'a self,
        ctx: &'a CancellationToken,
        key: &'a str,
        value: &'a [u8],
    ) -> BoxFuture<'a, Result<(), StorageError>>;

    /// Reads the value under `key`. A missing key fails with
    /// [`StorageError::NotFound`].
    fn load<'a>(
        &'a self,
        ctx: &'a CancellationToken,
        key: &'a str,
    ) -> BoxFuture<'a, Result<Vec<u8>, StorageError>>;

    /// Removes `key`. Removing a missing key succeeds.
    fn delete<'a>(
        &'a self,
        ctx: &'a CancellationToken,
        key: &'a str,
    ) -> BoxFuture<'a, Result<(), StorageError>>;

    /// Reports whether `key` exists. Any failure to find out, transient
    /// backend errors included, reads as `false`.
    fn exists<'a>(&'a self, ctx: &'a CancellationToken, key: &'a str) -> BoxFuture<'a, bool>;

    /// Lists every key below `prefix`, or only its direct children when
    /// `recursive` is false. Every returned key names a stored object.
    fn list<'a>(
        &'a self,
        ctx: &'a CancellationToken,
        prefix: &'a str,
        recursive: bool,
    ) -> BoxFuture<'a, Result<Vec<String>, StorageError>>;

    /// Returns metadata for `key`, or the zero [`KeyInfo`] when it cannot be
    /// determined.
    fn stat<'a>(
        &'a self,
        ctx: &'a CancellationToken,
        key: &'a str,
    ) -> BoxFuture<'a, Result<KeyInfo, StorageError>>;

    fn lock<'a>(
        &'a self,
        ctx: &'a CancellationToken,
        key: &'a str,
    ) -> BoxFuture<'a, Result<(), StorageError>>;

    fn unlock<'a>(
        &'a self,
        ctx: &'a CancellationToken,
        key: &'a str,
    ) -> BoxFuture<'a, Result<(), StorageError>>;
}

/// [`Storage`] backed by a bucket in an object store.
///
/// Every logical key is mapped to `join(prefix, key)` before it reaches the
/// store. The adapter holds no mutable state, so a single instance can serve
/// concurrent calls; ordering between them is whatever the store provides.
pub struct ObjectStorage {
    client: Arc<dyn ObjectClient>,
    bucket: String,
    prefix: String,
}

impl ObjectStorage {
    pub fn new(client: Arc<dyn ObjectClient>, bucket: &str, prefix: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Physical key for a logical key.
    pub fn key_prefix(&self, key: &str) -> String {
        key::join(&self.prefix, key)
    }

    /// Like [`key_prefix`](Self::key_prefix), but refuses keys that resolve
    /// to the bare prefix, which would land outside the listed namespace.
    fn physical_key(&self, operation: &'static str, key: &str) -> Result<String, StorageError> {
        if !key::is_valid(key) {
            return Err(StorageError::InvalidKey {
                operation,
                key: key.to_string(),
            });
        }

        Ok(self.key_prefix(key))
    }
}

impl fmt::Display for ObjectStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Object Storage Bucket: {}, Prefix: {}",
            self.bucket, self.prefix
        )
    }
}

async fn cancellable<T, F>(
    ctx: &CancellationToken,
    operation: &'static str,
    key: &str,
    fut: F,
) -> Result<T, StorageError>
where
    F: Future<Output = Result<T, StorageError>>,
{
    tokio::select! {
        biased;
        _ = ctx.cancelled() => Err(StorageError::Cancelled {
            operation,
            key: key.to_string(),
        }),
        res = fut => res,
    }
}

fn log_failure(err: &StorageError, error_group: &str) {
    if err.is_cancelled() {
        warn!(error_message=%err, error_group=error_group, "cancelled");
    } else {
        error!(error_message=%err, error_group=error_group);
    }
}

impl Storage for ObjectStorage {
    fn store<'a>(
        &'a self,
        ctx: &'a CancellationToken,
        key: &'a str,
        value: &'a [u8],
    ) -> BoxFuture<'a, Result<(), StorageError>> {
        let span = span!(Level::INFO, "store", context = "store");

        async move {
            info!(key = key, bytes = value.len(), "called");

            let physical = match self.physical_key("store", key) {
                Ok(physical) => physical,
                Err(err) => {
                    log_failure(&err, "put_object");
                    return Err(err);
                }
            };
            let res = cancellable(ctx, "store", key, async {
                self.client
                    .put_object(&self.bucket, &physical, value.to_vec(), value.len() as u64)
                    .await
                    .map_err(|source| StorageError::backend("store", key, source))
            })
            .await;

            if let Err(err) = &res {
                log_failure(err, "put_object");
            }

            res
        }
        .instrument(span)
        .boxed()
    }

    fn load<'a>(
        &'a self,
        ctx: &'a CancellationToken,
        key: &'a str,
    ) -> BoxFuture<'a, Result<Vec<u8>, StorageError>> {
        let span = span!(Level::INFO, "load", context = "load");

        async move {
            info!(key = key, "called");

            let physical = match self.physical_key("load", key) {
                Ok(physical) => physical,
                Err(err) => {
                    log_failure(&err, "get_object");
                    return Err(err);
                }
            };
            let res = cancellable(ctx, "load", key, async {
                match self.client.get_object(&self.bucket, &physical).await {
                    Ok(bytes) => Ok(bytes),
                    Err(source) if source.is_not_found() => Err(StorageError::NotFound {
                        key: key.to_string(),
                        source,
                    }),
                    Err(source) => Err(StorageError::backend("load", key, source)),
                }
            })
            .await;

            match &res {
                Err(err) if err.is_not_found() => info!(key = key, "not found"),
                Err(err) => log_failure(err, "get_object"),
                Ok(bytes) => debug!(key = key, bytes = bytes.len(), "loaded"),
            }

            res
        }
        .instrument(span)
        .boxed()
    }

    fn delete<'a>(
        &'a self,
        ctx: &'a CancellationToken,
        key: &'a str,
    ) -> BoxFuture<'a, Result<(), StorageError>> {
        let span = span!(Level::INFO, "delete", context = "delete");

        async move {
            info!(key = key, "called");

            let physical = match self.physical_key("delete", key) {
                Ok(physical) => physical,
                Err(err) => {
                    log_failure(&err, "delete_object");
                    return Err(err);
                }
            };
            let res = cancellable(ctx, "delete", key, async {
                match self.client.delete_object(&self.bucket, &physical).await {
                    Err(source) if !source.is_not_found() => {
                        Err(StorageError::backend("delete", key, source))
                    }
                    _ => Ok(()),
                }
            })
            .await;

            if let Err(err) = &res {
                log_failure(err, "delete_object");
            }

            res
        }
        .instrument(span)
        .boxed()
    }

    fn exists<'a>(&'a self, ctx: &'a CancellationToken, key: &'a str) -> BoxFuture<'a, bool> {
        let span = span!(Level::INFO, "exists", context = "exists");

        async move {
            info!(key = key, "called");

            let physical = match self.physical_key("exists", key) {
                Ok(physical) => physical,
                Err(err) => {
                    warn!(error_message=%err, error_group="head_object", "treating as absent");
                    return false;
                }
            };
            let res = cancellable(ctx, "exists", key, async {
                self.client
                    .head_object(&self.bucket, &physical)
                    .await
                    .map_err(|source| StorageError::backend("exists", key, source))
            })
            .await;

            match res {
                Ok(meta) => meta.is_some(),
                Err(err) => {
                    warn!(error_message=%err, error_group="head_object", "treating as absent");
                    false
                }
            }
        }
        .instrument(span)
        .boxed()
    }

    fn list<'a>(
        &'a self,
        ctx: &'a CancellationToken,
        prefix: &'a str,
        recursive: bool,
    ) -> BoxFuture<'a, Result<Vec<String>, StorageError>> {
        let span = span!(Level::INFO, "list", context = "list");

        async move {
            info!(prefix = prefix, recursive = recursive, "called");

            let namespace = key::namespace(&self.prefix, prefix);
            let res = cancellable(ctx, "list", prefix, async {
                let mut keys = Vec::with_capacity(32);
                let mut continuation_token: Option<String> = None;

                loop {
                    let page = self
                        .client
                        .list_objects(&self.bucket, &namespace, continuation_token.take())
                        .await
                        .map_err(|source| StorageError::backend("list", prefix, source))?;

                    for object in &page.objects {
                        let included = if recursive {
                            object.key.starts_with(namespace.as_str())
                        } else {
                            key::is_direct_child(&namespace, &object.key)
                        };

                        if included {
                            keys.push(key::strip(&self.prefix, &object.key).to_string());
                        }
                    }

                    continuation_token = page.continuation_token;
                    if continuation_token.is_none() {
                        break;
                    }
                }

                Ok::<_, StorageError>(keys)
            })
            .await;

            match &res {
                Err(err) => log_failure(err, "list_objects"),
                Ok(keys) => debug!(prefix = prefix, count = keys.len(), "listed"),
            }

            res
        }
        .instrument(span)
        .boxed()
    }

    fn stat<'a>(
        &'a self,
        ctx: &'a CancellationToken,
        key: &'a str,
    ) -> BoxFuture<'a, Result<KeyInfo, StorageError>> {
        let span = span!(Level::INFO, "stat", context = "stat");

        async move {
            info!(key = key, "called");

            let physical = match self.physical_key("stat", key) {
                Ok(physical) => physical,
                Err(err) => {
                    warn!(
                        error_message=%err,
                        error_group="head_object",
                        "returning empty key info"
                    );
                    return Ok(KeyInfo::default());
                }
            };
            let res = cancellable(ctx, "stat", key, async {
                self.client
                    .head_object(&self.bucket, &physical)
                    .await
                    .map_err(|source| StorageError::backend("stat", key, source))
            })
            .await;

            match res {
                Ok(Some(meta)) => Ok(KeyInfo {
                    is_terminal: physical.ends_with(key::SEPARATOR),
                    key: physical,
                    modified: meta.modified_time,
                    size: meta.size,
                }),
                Ok(None) => Ok(KeyInfo::default()),
                Err(err) if err.is_cancelled() => {
                    log_failure(&err, "head_object");
                    Err(err)
                }
                Err(err) => {
                    warn!(
                        error_message=%err,
                        error_group="head_object",
                        "returning empty key info"
                    );
                    Ok(KeyInfo::default())
                }
            }
        }
        .instrument(span)
        .boxed()
    }

    /// Always succeeds without taking any lock: this backend does not
    /// serialize issuance across processes. A real implementation would
    /// create a lock object with a conditional write carrying an owner token
    /// and a lease expiry.
    fn lock<'a>(
        &'a self,
        _ctx: &'a CancellationToken,
        key: &'a str,
    ) -> BoxFuture<'a, Result<(), StorageError>> {
        let span = span!(Level::INFO, "lock", context = "lock");

        async move {
            debug!(key = key, "no-op, locking is not enforced by object storage");
            Ok(())
        }
        .instrument(span)
        .boxed()
    }

    /// Always succeeds, including for keys that were never locked.
    fn unlock<'a>(
        &'a self,
        _ctx: &'a CancellationToken,
        key: &'a str,
    ) -> BoxFuture<'a, Result<(), StorageError>> {
        let span = span!(Level::INFO, "unlock", context = "unlock");

        async move {
            debug!(key = key, "no-op, locking is not enforced by object storage");
            Ok(())
        }
        .instrument(span)
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeSet, time::Duration};

    use super::*;
    use crate::adapters::mock::{MockClient, NO_SUCH_KEY};

    const BUCKET: &str = "certs-bucket";

    fn storage(prefix: &str) -> (Arc<MockClient>, ObjectStorage) {
        let client = Arc::new(MockClient::new());
        let storage = ObjectStorage::new(client.clone(), BUCKET, prefix);
        (client, storage)
    }

    fn as_set(keys: Vec<String>) -> BTreeSet<String> {
        keys.into_iter().collect()
    }

    #[test]
    fn test_key_prefix() {
        let cases = vec![
            ("", "acme/example.com/cert.pem", "acme/example.com/cert.pem"),
            ("caddy", "acme/example.com/cert.pem", "caddy/acme/example.com/cert.pem"),
            ("caddy/", "/locks/example.com.lock", "caddy/locks/example.com.lock"),
        ];

        for (prefix, key, expected) in cases {
            let (_, storage) = storage(prefix);
            assert_eq!(storage.key_prefix(key), expected, "failed for case: {}", key);
        }
    }

    #[test]
    fn test_display() {
        let (_, storage) = storage("caddy");
        assert_eq!(
            storage.to_string(),
            "Object Storage Bucket: certs-bucket, Prefix: caddy"
        );
    }

    #[tokio::test]
    async fn test_store_load_round_trip() {
        let (_, storage) = storage("caddy");
        let ctx = CancellationToken::new();

        let large: Vec<u8> = (0..10 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
        let cases = vec![
            ("empty", Vec::new()),
            ("single", vec![0x2a]),
            ("large", large),
        ];

        for (key, value) in cases {
            storage.store(&ctx, key, &value).await.unwrap();
            let loaded = storage.load(&ctx, key).await.unwrap();
            assert_eq!(loaded, value, "failed for case: {}", key);
        }
    }

    #[tokio::test]
    async fn test_store_applies_prefix_once() {
        let (client, storage) = storage("caddy");
        let ctx = CancellationToken::new();

        storage
            .store(&ctx, "acme/example.com/cert.pem", b"cert")
            .await
            .unwrap();

        assert_eq!(
            client.object_keys(BUCKET),
            vec!["caddy/acme/example.com/cert.pem".to_string()]
        );
    }

    #[tokio::test]
    async fn test_store_overwrites() {
        let (_, storage) = storage("");
        let ctx = CancellationToken::new();

        storage.store(&ctx, "key", b"first").await.unwrap();
        storage.store(&ctx, "key", b"second").await.unwrap();

        assert_eq!(storage.load(&ctx, "key").await.unwrap(), b"second".to_vec());
    }

    #[tokio::test]
    async fn test_load_missing_is_not_found() {
        let (client, storage) = storage("caddy");
        let ctx = CancellationToken::new();

        let err = storage.load(&ctx, "never/stored").await.unwrap_err();
        assert!(err.is_not_found(), "unexpected error: {}", err);
        match &err {
            StorageError::NotFound { key, source } => {
                assert_eq!(key, "never/stored");
                assert_eq!(
                    source.to_string(),
                    format!("no object at: caddy/never/stored, {}", NO_SUCH_KEY)
                );
            }
            other => panic!("unexpected error: {}", other),
        }

        client.fail_with("service unavailable");
        let err = storage.load(&ctx, "never/stored").await.unwrap_err();
        assert!(!err.is_not_found(), "unexpected error: {}", err);
        assert!(matches!(err, StorageError::Backend { operation: "load", .. }));
    }

    #[tokio::test]
    async fn test_delete() {
        let (client, storage) = storage("caddy");
        let ctx = CancellationToken::new();

        storage.delete(&ctx, "never/stored").await.unwrap();

        storage.store(&ctx, "a", b"value").await.unwrap();
        storage.delete(&ctx, "a").await.unwrap();
        assert!(!storage.exists(&ctx, "a").await);
        assert!(client.object_keys(BUCKET).is_empty());

        client.fail_with("connection reset");
        let err = storage.delete(&ctx, "a").await.unwrap_err();
        assert!(matches!(err, StorageError::Backend { operation: "delete", .. }));
    }

    #[tokio::test]
    async fn test_exists() {
        let (client, storage) = storage("caddy");
        let ctx = CancellationToken::new();

        assert!(!storage.exists(&ctx, "acme/cert.pem").await);
        storage.store(&ctx, "acme/cert.pem", b"cert").await.unwrap();
        assert!(storage.exists(&ctx, "acme/cert.pem").await);

        client.fail_with("timeout");
        assert!(!storage.exists(&ctx, "acme/cert.pem").await);
    }

    #[tokio::test]
    async fn test_list() {
        let (_, storage) = storage("");
        let ctx = CancellationToken::new();

        for key in ["a/1", "a/2", "b/1"] {
            storage.store(&ctx, key, b"x").await.unwrap();
        }

        let cases = vec![
            ("", vec!["a/1", "a/2", "b/1"]),
            ("a/", vec!["a/1", "a/2"]),
            ("b/", vec!["b/1"]),
            ("c/", vec![]),
        ];

        for (prefix, expected) in cases {
            let keys = storage.list(&ctx, prefix, true).await.unwrap();
            let expected: BTreeSet<String> = expected.into_iter().map(String::from).collect();
            assert_eq!(as_set(keys), expected, "failed for case: {:?}", prefix);
        }
    }

    #[tokio::test]
    async fn test_list_with_prefix() {
        let (client, storage) = storage("caddy");
        let other = ObjectStorage::new(client.clone(), BUCKET, "caddy-old");
        let ctx = CancellationToken::new();

        for key in ["a/1", "a/2", "b/1"] {
            storage.store(&ctx, key, b"x").await.unwrap();
        }
        other.store(&ctx, "a/9", b"x").await.unwrap();

        let keys = storage.list(&ctx, "", true).await.unwrap();
        let expected: BTreeSet<String> =
            ["a/1", "a/2", "b/1"].into_iter().map(String::from).collect();
        assert_eq!(as_set(keys), expected);

        let keys = storage.list(&ctx, "a/", true).await.unwrap();
        for key in &keys {
            assert!(storage.exists(&ctx, key).await, "listed key missing: {}", key);
        }

        assert_eq!(other.list(&ctx, "", true).await.unwrap(), vec!["a/9".to_string()]);
    }

    #[tokio::test]
    async fn test_list_non_recursive() {
        let (_, storage) = storage("caddy");
        let ctx = CancellationToken::new();

        for key in [
            "acme/example.com/cert.pem",
            "acme/example.com/key.pem",
            "acme/other.org/",
            "acme/account.json",
            "locks/example.com.lock",
            "instance.uuid",
        ] {
            storage.store(&ctx, key, b"x").await.unwrap();
        }

        let cases = vec![
            ("", vec!["instance.uuid"]),
            ("acme/", vec!["acme/account.json", "acme/other.org/"]),
            (
                "acme/example.com",
                vec!["acme/example.com/cert.pem", "acme/example.com/key.pem"],
            ),
            ("missing/", vec![]),
        ];

        for (prefix, expected) in cases {
            let keys = storage.list(&ctx, prefix, false).await.unwrap();
            for key in &keys {
                assert!(
                    storage.exists(&ctx, key).await,
                    "listed key missing for case {:?}: {}",
                    prefix,
                    key
                );
            }

            let expected: BTreeSet<String> = expected.into_iter().map(String::from).collect();
            assert_eq!(as_set(keys), expected, "failed for case: {:?}", prefix);
        }
    }

    #[tokio::test]
    async fn test_list_pages() {
        let client = Arc::new(MockClient::with_page_size(100));
        let storage = ObjectStorage::new(client.clone(), BUCKET, "caddy");
        let ctx = CancellationToken::new();

        for i in 0..250 {
            storage
                .store(&ctx, &format!("certs/{:03}", i), b"x")
                .await
                .unwrap();
        }

        let keys = storage.list(&ctx, "certs/", true).await.unwrap();
        assert_eq!(keys.len(), 250);
        assert_eq!(as_set(keys).len(), 250);
        assert_eq!(client.list_calls(), 3);
    }

    #[tokio::test]
    async fn test_list_backend_error() {
        let (client, storage) = storage("caddy");
        let ctx = CancellationToken::new();

        client.fail_with("access denied");
        let err = storage.list(&ctx, "", true).await.unwrap_err();
        assert!(matches!(err, StorageError::Backend { operation: "list", .. }));
    }

    #[tokio::test]
    async fn test_stat() {
        let (_, storage) = storage("caddy");
        let ctx = CancellationToken::new();

        storage.store(&ctx, "acme/cert.pem", b"12345").await.unwrap();

        let info = storage.stat(&ctx, "acme/cert.pem").await.unwrap();
        assert_eq!(info.key, "caddy/acme/cert.pem");
        assert_eq!(info.size, 5);
        assert!(!info.is_terminal);
        assert!(info.modified > std::time::SystemTime::UNIX_EPOCH);

        storage.store(&ctx, "acme/", b"").await.unwrap();
        let info = storage.stat(&ctx, "acme/").await.unwrap();
        assert_eq!(info.key, "caddy/acme/");
        assert!(info.is_terminal);
    }

    #[tokio::test]
    async fn test_dot_only_keys_are_rejected() {
        let (client, storage) = storage("caddy");
        let ctx = CancellationToken::new();

        let cases = vec!["", ".", "..", "/", "acme/.."];

        for key in cases {
            let err = storage.store(&ctx, key, b"x").await.unwrap_err();
            assert!(
                matches!(err, StorageError::InvalidKey { operation: "store", .. }),
                "failed on store for case: {:?}",
                key
            );

            let err = storage.load(&ctx, key).await.unwrap_err();
            assert!(
                matches!(err, StorageError::InvalidKey { operation: "load", .. }),
                "failed on load for case: {:?}",
                key
            );

            let err = storage.delete(&ctx, key).await.unwrap_err();
            assert!(
                matches!(err, StorageError::InvalidKey { operation: "delete", .. }),
                "failed on delete for case: {:?}",
                key
            );

            assert!(!storage.exists(&ctx, key).await, "failed on exists for case: {:?}", key);
            assert!(
                storage.stat(&ctx, key).await.unwrap().is_zero(),
                "failed on stat for case: {:?}",
                key
            );
        }

        assert!(client.object_keys(BUCKET).is_empty());
    }

    #[tokio::test]
    async fn test_stat_missing_is_zero() {
        let (client, storage) = storage("caddy");
        let ctx = CancellationToken::new();

        let info = storage.stat(&ctx, "never/stored").await.unwrap();
        assert!(info.is_zero());

        storage.store(&ctx, "stored", b"x").await.unwrap();
        client.fail_with("timeout");
        let info = storage.stat(&ctx, "stored").await.unwrap();
        assert!(info.is_zero());
    }

    #[tokio::test]
    async fn test_lock_unlock() {
        let (_, storage) = storage("caddy");
        let ctx = CancellationToken::new();

        let cases = vec!["issue_cert_example.com", "", "a/b/c"];

        for key in cases {
            storage.unlock(&ctx, key).await.unwrap();
            storage.lock(&ctx, key).await.unwrap();
            storage.lock(&ctx, key).await.unwrap();
            storage.unlock(&ctx, key).await.unwrap();
            storage.unlock(&ctx, key).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_cancellation() {
        let (client, storage) = storage("caddy");
        client.stall(true);

        let ctx = CancellationToken::new();
        let token = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let err = storage.store(&ctx, "a", b"x").await.unwrap_err();
        assert!(err.is_cancelled(), "unexpected error: {}", err);

        let cases = vec!["load", "delete", "list", "stat"];
        for operation in cases {
            let err = match operation {
                "load" => storage.load(&ctx, "a").await.map(|_| ()),
                "delete" => storage.delete(&ctx, "a").await,
                "list" => storage.list(&ctx, "", true).await.map(|_| ()),
                _ => storage.stat(&ctx, "a").await.map(|_| ()),
            }
            .unwrap_err();

            assert!(err.is_cancelled(), "failed for case: {}", operation);
        }

        assert!(!storage.exists(&ctx, "a").await);
    }

    #[tokio::test]
    async fn test_shared_across_tasks() {
        let client = Arc::new(MockClient::new());
        let storage: Arc<dyn Storage> = Arc::new(ObjectStorage::new(client, BUCKET, "caddy"));

        let mut handles = Vec::new();
        for i in 0..16 {
            let storage = storage.clone();
            handles.push(tokio::spawn(async move {
                let ctx = CancellationToken::new();
                let key = format!("certs/{}", i);
                storage.store(&ctx, &key, key.as_bytes()).await.unwrap();
                storage.load(&ctx, &key).await.unwrap()
            }));
        }

        for (i, handle) in handles.into_iter().enumerate() {
            let loaded = handle.await.unwrap();
            assert_eq!(loaded, format!("certs/{}", i).into_bytes());
        }

        let ctx = CancellationToken::new();
        assert_eq!(storage.list(&ctx, "certs/", true).await.unwrap().len(), 16);
    }
}
