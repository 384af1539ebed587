//! In-memory object store used to exercise the storage adapter without a network.

use std::{
    collections::{BTreeMap, HashMap},
    ops::Bound,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
    time::SystemTime,
};

use futures::{future::BoxFuture, FutureExt};

use crate::{
    adapters,
    model::object::{ObjectError, ObjectMeta, ObjectPage},
};

pub const DEFAULT_PAGE_SIZE: usize = 1000;
pub const NO_SUCH_KEY: &str = "NoSuchKey: the specified key does not exist";

#[derive(Clone, Debug)]
struct MockObject {
    body: Vec<u8>,
    modified_time: SystemTime,
}

pub struct MockClient {
    buckets: Mutex<HashMap<String, BTreeMap<String, MockObject>>>,
    page_size: usize,
    failure: Mutex<Option<String>>,
    stalled: AtomicBool,
    list_calls: AtomicUsize,
}

impl Default for MockClient {
    fn default() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            page_size: page_size.max(1),
            failure: Mutex::new(None),
            stalled: AtomicBool::new(false),
            list_calls: AtomicUsize::new(0),
        }
    }

    /// Makes every subsequent call fail with a backend error carrying `message`.
    pub fn fail_with(&self, message: &str) {
        *self
            .failure
            .lock()
            .expect("failed to acquire `failure` guard") = Some(message.to_string());
    }

    pub fn recover(&self) {
        *self
            .failure
            .lock()
            .expect("failed to acquire `failure` guard") = None;
    }

    /// While stalled, every call stays pending until its future is dropped.
    pub fn stall(&self, stalled: bool) {
        self.stalled.store(stalled, Ordering::SeqCst);
    }

    /// Number of pages served so far.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Physical keys currently held in `bucket`, in order.
    pub fn object_keys(&self, bucket: &str) -> Vec<String> {
        self.buckets
            .lock()
            .expect("failed to acquire `buckets` guard")
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    async fn check(&self, operation: &'static str, key: &str) -> Result<(), ObjectError> {
        if self.stalled.load(Ordering::SeqCst) {
            futures::future::pending::<()>().await;
        }

        let failure = self
            .failure
            .lock()
            .expect("failed to acquire `failure` guard")
            .clone();

        match failure {
            Some(message) => Err(ObjectError::backend(operation, key, message)),
            None => Ok(()),
        }
    }
}

impl adapters::ObjectClient for MockClient {
    fn put_object<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
        body: Vec<u8>,
        content_length: u64,
    ) -> BoxFuture<'a, Result<(), ObjectError>> {
        async move {
            self.check("put_object", key).await?;

            if body.len() as u64 != content_length {
                return Err(ObjectError::backend(
                    "put_object",
                    key,
                    format!(
                        "content length {} does not match body of {} bytes",
                        content_length,
                        body.len()
                    ),
                ));
            }

            self.buckets
                .lock()
                .expect("failed to acquire `buckets` guard")
                .entry(bucket.to_string())
                .or_default()
                .insert(
                    key.to_string(),
                    MockObject {
                        body,
                        modified_time: SystemTime::now(),
                    },
                );

            Ok(())
        }
        .boxed()
    }

    fn get_object<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, Result<Vec<u8>, ObjectError>> {
        async move {
            self.check("get_object", key).await?;

            self.buckets
                .lock()
                .expect("failed to acquire `buckets` guard")
                .get(bucket)
                .and_then(|objects| objects.get(key))
                .map(|object| object.body.clone())
                .ok_or_else(|| ObjectError::not_found(key, NO_SUCH_KEY))
        }
        .boxed()
    }

    fn delete_object<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, Result<(), ObjectError>> {
        async move {
            self.check("delete_object", key).await?;

            if let Some(objects) = self
                .buckets
                .lock()
                .expect("failed to acquire `buckets` guard")
                .get_mut(bucket)
            {
                objects.remove(key);
            }

            Ok(())
        }
        .boxed()
    }

    fn head_object<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, Result<Option<ObjectMeta>, ObjectError>> {
        async move {
            self.check("head_object", key).await?;

            Ok(self
                .buckets
                .lock()
                .expect("failed to acquire `buckets` guard")
                .get(bucket)
                .and_then(|objects| objects.get(key))
                .map(|object| ObjectMeta {
                    key: key.to_string(),
                    size: object.body.len() as i64,
                    modified_time: object.modified_time,
                }))
        }
        .boxed()
    }

    fn list_objects<'a>(
        &'a self,
        bucket: &'a str,
        prefix: &'a str,
        continuation_token: Option<String>,
    ) -> BoxFuture<'a, Result<ObjectPage, ObjectError>> {
        async move {
            self.check("list_objects", prefix).await?;
            self.list_calls.fetch_add(1, Ordering::SeqCst);

            let buckets = self
                .buckets
                .lock()
                .expect("failed to acquire `buckets` guard");

            let Some(objects) = buckets.get(bucket) else {
                return Ok(ObjectPage::default());
            };

            let start = match continuation_token {
                Some(tok) => Bound::Excluded(tok),
                None => Bound::Unbounded,
            };

            let mut matching = objects
                .range((start, Bound::Unbounded))
                .filter(|(key, _)| key.starts_with(prefix));

            let page: Vec<ObjectMeta> = matching
                .by_ref()
                .take(self.page_size)
                .map(|(key, object)| ObjectMeta {
                    key: key.clone(),
                    size: object.body.len() as i64,
                    modified_time: object.modified_time,
                })
                .collect();

            let continuation_token = if matching.next().is_some() {
                page.last().map(|o| o.key.clone())
            } else {
                None
            };

            Ok(ObjectPage {
                objects: page,
                continuation_token,
            })
        }
        .boxed()
    }
}
