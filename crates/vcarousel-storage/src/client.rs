//! Cloudflare R2 backend over the S3 API.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Builder;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::Object;
use aws_sdk_s3::Client;
use aws_types::region::Region;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::range::total_from_content_range;
use crate::store::{object_url, ObjectData, ObjectInfo, VideoStore};

/// Bucket credentials and addressing, read from `R2_*` variables.
#[derive(Debug, Clone)]
pub struct R2Config {
    /// S3-compatible endpoint, `https://<account>.r2.cloudflarestorage.com`
    pub endpoint_url: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    /// R2 ignores regions; the SDK still wants one
    pub region: String,
    /// Public bucket URL (`https://pub-<hash>.r2.dev` or a custom domain).
    /// Without it, object URLs point at the API's streaming route.
    pub public_base_url: Option<String>,
}

fn required_var(name: &str) -> StorageResult<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| StorageError::missing_var(name))
}

impl R2Config {
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            endpoint_url: required_var("R2_ENDPOINT_URL")?,
            access_key_id: required_var("R2_ACCESS_KEY_ID")?,
            secret_access_key: required_var("R2_SECRET_ACCESS_KEY")?,
            bucket_name: required_var("R2_BUCKET_NAME")?,
            region: required_var("R2_REGION").unwrap_or_else(|_| "auto".to_string()),
            public_base_url: required_var("R2_PUBLIC_URL").ok(),
        })
    }
}

/// Video bucket on R2.
#[derive(Clone)]
pub struct R2Client {
    s3: Client,
    bucket: String,
    public_base_url: Option<String>,
}

impl std::fmt::Debug for R2Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("R2Client")
            .field("bucket", &self.bucket)
            .field("public_base_url", &self.public_base_url)
            .finish_non_exhaustive()
    }
}

fn sdk_message<E, R>(err: &aws_sdk_s3::error::SdkError<E, R>) -> String
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    DisplayErrorContext(err).to_string()
}

fn to_info(obj: &Object) -> Option<ObjectInfo> {
    let key = obj.key()?;
    Some(ObjectInfo {
        key: key.to_string(),
        size: obj.size().unwrap_or_default().max(0) as u64,
        last_modified: obj
            .last_modified()
            .and_then(|t| t.to_millis().ok())
            .and_then(DateTime::<Utc>::from_timestamp_millis),
    })
}

impl R2Client {
    pub fn new(config: R2Config) -> Self {
        let credentials = Credentials::new(
            config.access_key_id,
            config.secret_access_key,
            None,
            None,
            "r2-static",
        );

        let s3_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        info!(bucket = %config.bucket_name, public = config.public_base_url.is_some(), "R2 bucket configured");

        Self {
            s3: Client::from_conf(s3_config),
            bucket: config.bucket_name,
            public_base_url: config.public_base_url,
        }
    }

    pub async fn from_env() -> StorageResult<Self> {
        Ok(Self::new(R2Config::from_env()?))
    }
}

#[async_trait]
impl VideoStore for R2Client {
    async fn put_object(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()> {
        debug!(key, bytes = data.len(), "put object");
        self.s3
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map(|_| ())
            .map_err(|e| StorageError::Write(sdk_message(&e)))
    }

    async fn get_object(&self, key: &str, range: Option<&str>) -> StorageResult<ObjectData> {
        let output = self
            .s3
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .set_range(range.map(str::to_string))
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    return StorageError::not_found(key);
                }
                let message = sdk_message(&e);
                if message.contains("InvalidRange") {
                    StorageError::RangeNotSatisfiable(key.to_string())
                } else {
                    StorageError::Read(message)
                }
            })?;

        let content_range = output.content_range().map(str::to_string);
        let total_size = content_range
            .as_deref()
            .map_or_else(
                || output.content_length().map(|len| len.max(0) as u64),
                total_from_content_range,
            );
        let content_type = output
            .content_type()
            .map_or_else(|| "application/octet-stream".to_string(), str::to_string);

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Read(e.to_string()))?
            .to_vec();

        Ok(ObjectData {
            bytes,
            content_type,
            content_range,
            total_size,
        })
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        debug!(key, "delete object");
        self.s3
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| StorageError::Delete(sdk_message(&e)))
    }

    async fn list_objects(&self, prefix: &str) -> StorageResult<Vec<ObjectInfo>> {
        let mut pages = self
            .s3
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        let mut objects = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| StorageError::List(sdk_message(&e)))?;
            objects.extend(page.contents().iter().filter_map(to_info));
        }

        debug!(prefix, count = objects.len(), "listed objects");
        Ok(objects)
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let head = self
            .s3
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match head {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(false),
            Err(e) => Err(StorageError::Read(sdk_message(&e))),
        }
    }

    async fn check_connectivity(&self) -> StorageResult<()> {
        self.s3
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| StorageError::Unavailable(sdk_message(&e)))
    }

    fn public_url(&self, key: &str) -> String {
        object_url(self.public_base_url.as_deref(), key)
    }
}
