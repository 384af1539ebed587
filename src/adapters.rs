use futures::future::BoxFuture;

use crate::model::object::{ObjectError, ObjectMeta, ObjectPage};

pub mod gcs;
pub mod mock;
pub mod s3;

/// The object-store primitives the storage adapter is built on.
///
/// Implementations are shared across concurrent calls and must report a
/// missing object as [`ObjectError::NotFound`] where the backend makes that
/// distinguishable.
pub trait ObjectClient: Send + Sync {
    fn put_object<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
        body: Vec<u8>,
        content_length: u64,
    ) -> BoxFuture<'a, Result<(), ObjectError>>;

    fn get_object<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, Result<Vec<u8>, ObjectError>>;

    fn delete_object<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, Result<(), ObjectError>>;

    /// `Ok(None)` when the object does not exist.
    fn head_object<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, Result<Option<ObjectMeta>, ObjectError>>;

    /// Fetches a single page of keys starting with `prefix`.
    fn list_objects<'a>(
        &'a self,
        bucket: &'a str,
        prefix: &'a str,
        continuation_token: Option<String>,
    ) -> BoxFuture<'a, Result<ObjectPage, ObjectError>>;
}
