use crate::model::storage::StorageError;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Provider {
    AWS,
    GCS,
}

/// Picks the provider from the bucket's scheme. A bare bucket name is S3.
pub fn parse_provider_from_uri(bucket_uri: &str) -> Result<Provider, StorageError> {
    return if bucket_uri.starts_with("s3://") {
        Ok(Provider::AWS)
    } else if bucket_uri.starts_with("gs://") {
        Ok(Provider::GCS)
    } else if bucket_uri.contains("://") {
        Err(StorageError::Config(format!(
            "failed to parse provider of: {}",
            bucket_uri
        )))
    } else {
        Ok(Provider::AWS)
    };
}

pub fn parse_bucket_from_uri(bucket_uri: &str) -> &str {
    bucket_uri
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(bucket_uri)
        .trim_end_matches('/')
}
