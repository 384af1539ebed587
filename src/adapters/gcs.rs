use std::time::SystemTime;

use futures::{future::BoxFuture, FutureExt};
use google_cloud_storage::http::{
    objects::{
        delete::DeleteObjectRequest,
        download::Range,
        get::GetObjectRequest,
        list::ListObjectsRequest,
        upload::{Media, UploadObjectRequest, UploadType},
    },
    Error,
};

use crate::{
    adapters,
    model::object::{ObjectError, ObjectMeta, ObjectPage},
};

const NOT_FOUND: u16 = 404;

impl adapters::ObjectClient for google_cloud_storage::client::Client {
    fn put_object<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
        body: Vec<u8>,
        content_length: u64,
    ) -> BoxFuture<'a, Result<(), ObjectError>> {
        async move {
            let req = UploadObjectRequest {
                bucket: bucket.to_string(),
                ..Default::default()
            };

            let mut media = Media::new(key.to_string());
            media.content_length = Some(content_length);

            self.upload_object(&req, body, &UploadType::Simple(media))
                .await
                .map_err(|err| ObjectError::backend("put_object", key, err))?;

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
            let req = GetObjectRequest {
                bucket: bucket.to_string(),
                object: key.to_string(),
                ..Default::default()
            };

            match self.download_object(&req, &Range::default()).await {
                Err(err) if is_not_found(&err) => Err(ObjectError::not_found(key, err)),
                Err(err) => Err(ObjectError::backend("get_object", key, err)),
                Ok(bytes) => Ok(bytes),
            }
        }
        .boxed()
    }

    fn delete_object<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, Result<(), ObjectError>> {
        async move {
            let req = DeleteObjectRequest {
                bucket: bucket.to_string(),
                object: key.to_string(),
                ..Default::default()
            };

            // unlike S3, GCS rejects deletes of missing objects
            match (**self).delete_object(&req).await {
                Err(err) if is_not_found(&err) => Ok(()),
                Err(err) => Err(ObjectError::backend("delete_object", key, err)),
                Ok(()) => Ok(()),
            }
        }
        .boxed()
    }

    fn head_object<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, Result<Option<ObjectMeta>, ObjectError>> {
        async move {
            let req = GetObjectRequest {
                bucket: bucket.to_string(),
                object: key.to_string(),
                ..Default::default()
            };

            let obj = match (**self).get_object(&req).await {
                Err(err) if is_not_found(&err) => return Ok(None),
                Err(err) => return Err(ObjectError::backend("head_object", key, err)),
                Ok(obj) => obj,
            };

            Ok(Some(ObjectMeta {
                key: obj.name,
                size: obj.size,
                modified_time: modified_time(obj.updated),
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
            let req = ListObjectsRequest {
                bucket: bucket.to_string(),
                prefix: Some(prefix.to_string()),
                page_token: continuation_token,
                ..Default::default()
            };

            let lo = (**self)
                .list_objects(&req)
                .await
                .map_err(|err| ObjectError::backend("list_objects", prefix, err))?;

            let objects = lo
                .items
                .unwrap_or_default()
                .into_iter()
                .map(|obj| ObjectMeta {
                    key: obj.name,
                    size: obj.size,
                    modified_time: modified_time(obj.updated),
                })
                .collect();

            Ok(ObjectPage {
                objects,
                continuation_token: lo.next_page_token,
            })
        }
        .boxed()
    }
}

fn is_not_found(err: &Error) -> bool {
    matches!(err, Error::Response(res) if res.code == NOT_FOUND)
}

fn modified_time(updated: Option<time::OffsetDateTime>) -> SystemTime {
    updated.map(SystemTime::from).unwrap_or(SystemTime::UNIX_EPOCH)
}
