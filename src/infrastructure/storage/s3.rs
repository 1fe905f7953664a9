//! S3-compatible object store client (AWS S3, MinIO)

use std::fmt::Debug;

use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;
use bytes::Bytes;

use super::client::{ObjectStoreClient, ObjectStoreError};

const DEFAULT_REGION: &str = "us-east-1";

/// Connection settings for an S3-compatible endpoint
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Host and port (`localhost:9000`) or a full URL
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub use_ssl: bool,
}

impl S3Config {
    /// Endpoint URL with the scheme implied by the TLS flag
    pub fn endpoint_url(&self) -> String {
        if self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://") {
            return self.endpoint.clone();
        }

        let scheme = if self.use_ssl { "https" } else { "http" };
        format!("{}://{}", scheme, self.endpoint)
    }
}

/// Object store client backed by the AWS S3 SDK
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    region: String,
}

impl S3ObjectStore {
    /// Builds a client with static credentials and path-style addressing
    pub async fn connect(config: &S3Config) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(Credentials::new(
                config.access_key.clone(),
                config.secret_key.clone(),
                None,
                None,
                "static",
            ))
            .endpoint_url(config.endpoint_url())
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(s3_config),
            region: config.region.clone(),
        }
    }
}

fn transport_error<E, R>(err: &SdkError<E, R>) -> ObjectStoreError
where
    E: std::error::Error + 'static,
    R: Debug,
{
    ObjectStoreError::transport(DisplayErrorContext(err).to_string())
}

fn is_http_not_found<E>(err: &SdkError<E, HttpResponse>) -> bool {
    err.raw_response()
        .is_some_and(|response| response.status().as_u16() == 404)
}

#[async_trait]
impl ObjectStoreClient for S3ObjectStore {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, ObjectStoreError> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                let not_found = err
                    .as_service_error()
                    .is_some_and(|service_err| service_err.is_not_found());

                if not_found || is_http_not_found(&err) {
                    Ok(false)
                } else {
                    Err(transport_error(&err))
                }
            }
        }
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError> {
        let mut request = self.client.create_bucket().bucket(bucket);

        if self.region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|service_err| service_err.is_bucket_already_owned_by_you()) =>
            {
                Ok(())
            }
            Err(err) => Err(transport_error(&err)),
        }
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|err| transport_error(&err))?;

        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, ObjectStoreError> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                let no_such_key = err
                    .as_service_error()
                    .is_some_and(|service_err| service_err.is_no_such_key());

                if no_such_key {
                    ObjectStoreError::NoSuchKey
                } else {
                    transport_error(&err)
                }
            })?;

        let data = output.body.collect().await.map_err(|e| {
            ObjectStoreError::transport(format!("failed to read object body: {}", e))
        })?;

        Ok(data.into_bytes())
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> Result<(), ObjectStoreError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| transport_error(&err))?;

        Ok(())
    }

    async fn list_keys(&self, bucket: &str) -> Result<Vec<String>, ObjectStoreError> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .into_paginator()
            .send();

        let mut keys = Vec::new();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|err| transport_error(&err))?;

            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string)),
            );
        }

        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(endpoint: &str, use_ssl: bool) -> S3Config {
        S3Config {
            endpoint: endpoint.to_string(),
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
            region: DEFAULT_REGION.to_string(),
            use_ssl,
        }
    }

    #[test]
    fn test_endpoint_url_plain() {
        assert_eq!(config("localhost:9000", false).endpoint_url(), "http://localhost:9000");
    }

    #[test]
    fn test_endpoint_url_tls() {
        assert_eq!(config("minio.internal:443", true).endpoint_url(), "https://minio.internal:443");
    }

    #[test]
    fn test_endpoint_url_keeps_explicit_scheme() {
        assert_eq!(config("https://s3.example.com", false).endpoint_url(), "https://s3.example.com");
    }

    #[tokio::test]
    async fn test_connect_builds_client_without_network() {
        let store = S3ObjectStore::connect(&config("localhost:9000", false)).await;
        assert_eq!(store.region, DEFAULT_REGION);
    }
}
