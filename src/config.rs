use std::sync::Arc;

use tracing::info;

use crate::{
    adapters::ObjectClient,
    model::storage::StorageError,
    storage::ObjectStorage,
    util::object::{self, Provider},
};

/// Where certificate material is kept. Set once before first use.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StorageConfig {
    /// Bucket name, optionally with an `s3://` or `gs://` scheme.
    pub bucket: String,
    pub prefix: String,
    /// Use plain HTTP for a scheme-less `endpoint`.
    pub insecure: bool,
    pub endpoint: Option<String>,
    pub region: Option<String>,
}

impl StorageConfig {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            ..Default::default()
        }
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = Some(endpoint.to_string());
        self
    }

    pub fn with_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_string());
        self
    }

    /// Parses a directive block such as
    ///
    /// ```text
    /// storage s3 {
    ///     bucket my-certs
    ///     prefix caddy
    /// }
    /// ```
    pub fn from_directives(text: &str) -> Result<Self, StorageError> {
        let mut config = Self::default();
        config.apply_directives(text)?;
        Ok(config)
    }

    /// Applies `name value` directives on top of the current values.
    /// Names are case-insensitive and a directive without a value is skipped.
    pub fn apply_directives(&mut self, text: &str) -> Result<(), StorageError> {
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.ends_with('{') || line == "}" {
                continue;
            }

            let mut tokens = line.split_whitespace();
            let name = tokens.next().unwrap_or_default().to_lowercase();
            let Some(value) = tokens.next() else {
                continue;
            };

            match name.as_str() {
                "bucket" => self.bucket = value.to_string(),
                "prefix" => self.prefix = value.to_string(),
                "endpoint" => self.endpoint = Some(value.to_string()),
                "region" => self.region = Some(value.to_string()),
                "insecure" => {
                    self.insecure = value.parse().map_err(|_| {
                        StorageError::Config(format!(
                            "line {}: insecure expects true or false, got: {}",
                            lineno + 1,
                            value
                        ))
                    })?
                }
                _ => {
                    return Err(StorageError::Config(format!(
                        "line {}: unknown directive: {}",
                        lineno + 1,
                        name
                    )))
                }
            }
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<Provider, StorageError> {
        let provider = object::parse_provider_from_uri(&self.bucket)?;

        if object::parse_bucket_from_uri(&self.bucket).is_empty() {
            return Err(StorageError::Config("bucket is required".to_string()));
        }

        Ok(provider)
    }

    pub fn bucket_name(&self) -> &str {
        object::parse_bucket_from_uri(&self.bucket)
    }

    /// The endpoint with a scheme, picked by `insecure` when none was given.
    pub fn endpoint_url(&self) -> Option<String> {
        let endpoint = self.endpoint.as_deref()?.trim_end_matches('/');

        if endpoint.contains("://") {
            Some(endpoint.to_string())
        } else if self.insecure {
            Some(format!("http://{}", endpoint))
        } else {
            Some(format!("https://{}", endpoint))
        }
    }
}

/// Builds the object-store client for `config` and wraps it in an adapter.
pub async fn provision(config: &StorageConfig) -> Result<ObjectStorage, StorageError> {
    let provider = config.validate()?;
    let bucket = config.bucket_name();

    info!(
        bucket = bucket,
        prefix = %config.prefix,
        provider = ?provider,
        insecure = config.insecure,
        "provisioning storage"
    );

    let client: Arc<dyn ObjectClient> = match provider {
        Provider::AWS => Arc::new(s3_client(config).await),
        Provider::GCS => Arc::new(gcs_client(config).await?),
    };

    Ok(ObjectStorage::new(client, bucket, &config.prefix))
}

async fn s3_client(config: &StorageConfig) -> aws_sdk_s3::Client {
    let mut loader = aws_config::from_env();
    if let Some(region) = &config.region {
        loader = loader.region(aws_sdk_s3::config::Region::new(region.clone()));
    }

    let sdk_config = loader.load().await;
    let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
    if let Some(url) = config.endpoint_url() {
        builder = builder.endpoint_url(url).force_path_style(true);
    }

    aws_sdk_s3::Client::from_conf(builder.build())
}

async fn gcs_client(
    config: &StorageConfig,
) -> Result<google_cloud_storage::client::Client, StorageError> {
    let mut client_config = google_cloud_storage::client::ClientConfig::default()
        .with_auth()
        .await
        .map_err(|err| {
            StorageError::Config(format!("failed to resolve gcs credentials: {}", err))
        })?;

    if let Some(url) = config.endpoint_url() {
        client_config.storage_endpoint = url;
    }

    Ok(google_cloud_storage::client::Client::new(client_config))
}
