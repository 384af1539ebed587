use std::time::{Duration, SystemTime};

use aws_sdk_s3::{
    error::DisplayErrorContext,
    primitives::{ByteStream, DateTime},
};
use futures::{future::BoxFuture, FutureExt};

use crate::{
    adapters,
    model::object::{ObjectError, ObjectMeta, ObjectPage},
};

const NOT_FOUND: u16 = 404;

impl adapters::ObjectClient for aws_sdk_s3::Client {
    fn put_object<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
        body: Vec<u8>,
        content_length: u64,
    ) -> BoxFuture<'a, Result<(), ObjectError>> {
        async move {
            let content_length = i64::try_from(content_length)
                .map_err(|err| ObjectError::backend("put_object", key, err))?;

            let req = self
                .put_object()
                .bucket(bucket)
                .key(key)
                .content_length(content_length)
                .body(ByteStream::from(body));

            req.send()
                .await
                .map_err(|err| ObjectError::backend("put_object", key, DisplayErrorContext(&err)))?;

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
            let req = self.get_object().bucket(bucket).key(key);

            let o = match req.send().await {
                Err(err) => {
                    let no_such_key = err
                        .as_service_error()
                        .map(|svc_err| svc_err.is_no_such_key())
                        .unwrap_or(false);

                    // some S3-compatible stores answer a bare 404 without a NoSuchKey code
                    let status = err.raw_response().map(|res| res.status().as_u16());

                    if no_such_key || status == Some(NOT_FOUND) {
                        return Err(ObjectError::not_found(key, DisplayErrorContext(&err)));
                    }

                    return Err(ObjectError::backend(
                        "get_object",
                        key,
                        DisplayErrorContext(&err),
                    ));
                }
                Ok(o) => o,
            };

            let bytes = o
                .body
                .collect()
                .await
                .map_err(|err| ObjectError::backend("collect_body", key, err))?;

            Ok(bytes.into_bytes().to_vec())
        }
        .boxed()
    }

    fn delete_object<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, Result<(), ObjectError>> {
        async move {
            let req = self.delete_object().bucket(bucket).key(key);

            req.send().await.map_err(|err| {
                ObjectError::backend("delete_object", key, DisplayErrorContext(&err))
            })?;

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
            let req = self.head_object().bucket(bucket).key(key);

            let ho = match req.send().await {
                Err(err) => {
                    if let Some(svc_err) = err.as_service_error() {
                        if svc_err.is_not_found() {
                            return Ok(None);
                        }
                    }

                    return Err(ObjectError::backend(
                        "head_object",
                        key,
                        DisplayErrorContext(&err),
                    ));
                }
                Ok(ho) => ho,
            };

            Ok(Some(ObjectMeta {
                key: key.to_string(),
                size: ho.content_length().unwrap_or(0),
                modified_time: modified_time(ho.last_modified()),
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
            let mut req = self.list_objects_v2().bucket(bucket).prefix(prefix);

            if let Some(tok) = continuation_token {
                req = req.continuation_token(tok);
            }

            let lo = req.send().await.map_err(|err| {
                ObjectError::backend("list_objects", prefix, DisplayErrorContext(&err))
            })?;

            let objects = lo
                .contents()
                .iter()
                .filter_map(|o| {
                    o.key().map(|key| ObjectMeta {
                        key: key.to_string(),
                        size: o.size().unwrap_or(0),
                        modified_time: modified_time(o.last_modified()),
                    })
                })
                .collect();

            Ok(ObjectPage {
                objects,
                continuation_token: lo.next_continuation_token().map(|tok| tok.to_string()),
            })
        }
        .boxed()
    }
}

fn modified_time(last_modified: Option<&DateTime>) -> SystemTime {
    match last_modified {
        Some(dt) => {
            let secs = u64::try_from(dt.secs()).unwrap_or(0);
            SystemTime::UNIX_EPOCH + Duration::new(secs, dt.subsec_nanos())
        }
        None => SystemTime::UNIX_EPOCH,
    }
}
