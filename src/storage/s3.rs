use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_credential_types::Credentials;
use aws_sdk_s3::{primitives::ByteStream, Client};
use aws_types::region::Region;
use bytes::Bytes;
use tracing::info;

use super::{Storage, StorageError};
use crate::config::Config;

// AWS S3 / MinIO storage backend
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    endpoint: Option<String>,
    region: String,
}

/// Builds the HTTP(S) URL under which a stored object can be fetched.
/// Custom endpoints (MinIO) serve objects path-style; plain AWS uses the
/// virtual-hosted bucket address.
fn object_url(endpoint: Option<&str>, region: &str, bucket: &str, key: &str) -> String {
    match endpoint {
        Some(endpoint) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), bucket, key),
        None => format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key),
    }
}

impl S3Storage {
    /// Initialize the S3 client and ensure the bucket exists
    pub async fn new(config: &Config) -> Self {
        let region_provider = RegionProviderChain::first_try(Region::new(config.s3_region.clone()))
            .or_default_provider()
            .or_else(Region::new("us-east-1"));

        let mut aws_config_builder = aws_config::from_env().region(region_provider);

        // Custom endpoint (e.g., for MinIO)
        if let Some(endpoint) = &config.s3_endpoint {
            aws_config_builder = aws_config_builder.endpoint_url(endpoint);

            let credentials = Credentials::new(
                config.s3_access_key.clone(),
                config.s3_secret_key.clone(),
                None,
                None,
                "custom",
            );

            aws_config_builder = aws_config_builder.credentials_provider(credentials);
        }

        let aws_config = aws_config_builder.load().await;

        let client = Client::from_conf(
            aws_sdk_s3::config::Builder::from(&aws_config)
                .force_path_style(true) // Required for MinIO
                .build(),
        );

        Self::ensure_bucket_exists(&client, &config.s3_bucket).await;

        Self {
            client,
            bucket: config.s3_bucket.clone(),
            endpoint: config.s3_endpoint.clone(),
            region: config.s3_region.clone(),
        }
    }

    /// Ensure the S3 bucket exists, or create it if possible
    async fn ensure_bucket_exists(client: &Client, bucket: &str) {
        match client.create_bucket().bucket(bucket).send().await {
            Ok(_) => {
                tracing::info!("Bucket {} created successfully", bucket);
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("BucketAlreadyOwnedByYou")
                    || err_msg.contains("BucketAlreadyExists")
                {
                    tracing::info!("Bucket {} already exists", bucket);
                } else {
                    // MinIO may answer with other errors; check directly
                    tracing::warn!("Could not create bucket {}: {}", bucket, err_msg);
                    match client.head_bucket().bucket(bucket).send().await {
                        Ok(_) => tracing::info!("Bucket {} exists (verified)", bucket),
                        Err(check_err) => tracing::error!(
                            "Bucket {} does not exist and cannot be created: {}",
                            bucket,
                            check_err
                        ),
                    }
                }
            }
        }
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn upload(&self, key: &str, content: Bytes) -> Result<String, StorageError> {
        let body = ByteStream::from(content);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| StorageError::UploadError(e.to_string()))?;

        Ok(object_url(
            self.endpoint.as_deref(),
            &self.region,
            &self.bucket,
            key,
        ))
    }

    async fn download(&self, key: &str) -> Result<Bytes, StorageError> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::NotFound(e.to_string()))?;

        let data = response.body.collect().await.map_err(|e| {
            StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                e.to_string(),
            ))
        })?;

        Ok(data.into_bytes())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::DeleteError(e.to_string()))?;

        info!("Object deleted from s3: {}", key);
        Ok(())
    }
}
