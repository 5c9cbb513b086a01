//! `ObjectStore` backed by an S3-compatible service (MinIO by default).

use super::{ObjectStore, ObjectStoreError, ObjectStoreResult};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, retry::RetryConfig};
use aws_sdk_s3::{
    Client,
    config::Credentials,
    error::{DisplayErrorContext, SdkError},
    operation::head_object::HeadObjectError,
    presigning::PresigningConfig,
    primitives::ByteStream,
};
use bytes::Bytes;
use std::{fmt, sync::Arc, time::Duration};
use tracing::{debug, error, info};

/// Connection settings for the S3 endpoint.
#[derive(Clone)]
pub struct S3Settings {
    pub endpoint: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
}

impl fmt::Debug for S3Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Settings")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct S3ObjectStore {
    client: Arc<Client>,
}

impl S3ObjectStore {
    /// Build a client from static credentials.
    ///
    /// Path-style addressing is forced so MinIO and localstack work without
    /// wildcard DNS. SDK retries are disabled: a failed call surfaces at once.
    pub async fn connect(settings: &S3Settings) -> Self {
        let credentials = Credentials::new(
            settings.access_key.clone(),
            settings.secret_key.clone(),
            None,
            None,
            "animal-images-static",
        );

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .endpoint_url(&settings.endpoint)
            .credentials_provider(credentials)
            .retry_config(RetryConfig::disabled())
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        info!("Initialized S3 client for endpoint {}", settings.endpoint);

        Self {
            client: Arc::new(Client::from_conf(s3_config)),
        }
    }
}

fn upstream<E>(err: SdkError<E>) -> ObjectStoreError
where
    E: std::error::Error + Send + Sync + 'static,
{
    ObjectStoreError::Upstream(DisplayErrorContext(&err).to_string())
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> ObjectStoreResult<()> {
        let size = body.len();
        debug!("PUT {}/{} ({} bytes)", bucket, key, size);

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_length(size as i64)
            .set_content_type(content_type.map(str::to_string))
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(upstream)?;

        Ok(())
    }

    async fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        expiry: Duration,
    ) -> ObjectStoreResult<String> {
        let presigning = PresigningConfig::expires_in(expiry)
            .map_err(|e| ObjectStoreError::Config(e.to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(upstream)?;

        debug!("Presigned GET {}/{} for {:?}", bucket, key, expiry);
        Ok(request.uri().to_string())
    }

    async fn delete(&self, bucket: &str, key: &str) -> ObjectStoreResult<()> {
        debug!("DELETE {}/{}", bucket, key);
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(upstream)?;
        Ok(())
    }

    async fn stat(&self, bucket: &str, key: &str) -> ObjectStoreResult<bool> {
        let result = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) => {
                if let SdkError::ServiceError(ref service_err) = e {
                    if matches!(service_err.err(), HeadObjectError::NotFound(_)) {
                        debug!("Object does not exist: {}/{}", bucket, key);
                        return Ok(false);
                    }
                }
                error!("Failed to stat {}/{}: {}", bucket, key, DisplayErrorContext(&e));
                Err(upstream(e))
            }
        }
    }

    async fn ping(&self, bucket: &str) -> ObjectStoreResult<()> {
        self.client
            .head_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(upstream)?;
        Ok(())
    }
}
