use async_trait::async_trait;
use minio::s3::args::{BucketExistsArgs, MakeBucketArgs, PutObjectArgs, RemoveObjectArgs};
use minio::s3::client::{Client, ClientBuilder};
use minio::s3::creds::StaticProvider;
use minio::s3::http::BaseUrl;
use std::io::Cursor;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::config::MinioConfig;
use crate::dto::file_dto::UploadedFile;

#[derive(Debug, thiserror::Error)]
pub enum MinioError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Operation error: {0}")]
    OperationError(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Object not found: {0}")]
    ObjectNotFound(String),
}

/// Stores uploaded images and hands back the public URL they are served from.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, folder: &str, file: &UploadedFile) -> Result<String, MinioError>;
    /// Removes the object previously returned by `upload` as `url`.
    async fn remove(&self, url: &str) -> Result<(), MinioError>;
}

#[derive(Debug, Clone)]
pub struct MinioService {
    client: Client,
    pub config: MinioConfig,
}

impl MinioService {
    #[instrument(skip(config), fields(endpoint = %config.endpoint, bucket = %config.bucket_name))]
    pub async fn new(config: MinioConfig) -> Result<Self, MinioError> {
        config.validate().map_err(|e| {
            error!("MinIO configuration validation failed: {}", e);
            MinioError::ConfigError(e.to_string())
        })?;

        let base_url = config.get_endpoint_url().parse::<BaseUrl>().map_err(|e| {
            error!("Failed to parse MinIO endpoint URL: {}", e);
            MinioError::ConnectionError(format!("Invalid endpoint URL: {}", e))
        })?;

        let static_provider = StaticProvider::new(&config.access_key, &config.secret_key, None);

        let client = ClientBuilder::new(base_url)
            .provider(Some(Box::new(static_provider)))
            .build()
            .map_err(|e| {
                error!("Failed to create MinIO client: {}", e);
                MinioError::ConnectionError(format!("Client creation failed: {}", e))
            })?;

        let service = Self { client, config };
        service.ensure_bucket_exists().await?;

        info!("MinIO service initialized successfully");
        Ok(service)
    }

    #[instrument(skip(self))]
    async fn ensure_bucket_exists(&self) -> Result<(), MinioError> {
        let bucket_exists_args = BucketExistsArgs::new(&self.config.bucket_name)
            .map_err(|e| MinioError::InvalidArguments(e.to_string()))?;

        let exists = self.client.bucket_exists(&bucket_exists_args).await.map_err(|e| {
            error!("Failed to check if bucket exists: {}", e);
            MinioError::OperationError(format!("Bucket exists check failed: {}", e))
        })?;

        if exists {
            debug!("Bucket '{}' already exists", self.config.bucket_name);
            return Ok(());
        }

        warn!("Bucket '{}' does not exist, creating it", self.config.bucket_name);

        let make_bucket_args = MakeBucketArgs::new(&self.config.bucket_name)
            .map_err(|e| MinioError::InvalidArguments(e.to_string()))?;

        self.client.make_bucket(&make_bucket_args).await.map_err(|e| {
            error!("Failed to create bucket '{}': {}", self.config.bucket_name, e);
            MinioError::OperationError(format!("Bucket creation failed: {}", e))
        })?;

        info!("Created bucket '{}'", self.config.bucket_name);
        Ok(())
    }

    #[instrument(skip(self, data), fields(object_name = %object_name, size = data.len()))]
    pub async fn put_object(&self, object_name: &str, data: Vec<u8>, content_type: &str) -> Result<(), MinioError> {
        let bucket_name = self.config.bucket_name.clone();
        let object_name = object_name.to_string();
        let client = self.client.clone();
        let content_type = content_type.to_string();

        // PutObjectArgs borrows a blocking reader
        tokio::task::spawn_blocking(move || {
            let mut reader = Cursor::new(data);
            let data_len = reader.get_ref().len();

            let mut args = PutObjectArgs::new(&bucket_name, &object_name, &mut reader, Some(data_len), None)
                .map_err(|e| MinioError::InvalidArguments(e.to_string()))?;
            args.content_type = &content_type;

            futures::executor::block_on(client.put_object(&mut args))
                .map_err(|e| MinioError::OperationError(format!("Upload failed: {}", e)))?;

            debug!("Uploaded object '{}'", object_name);
            Ok(())
        })
        .await
        .map_err(|e| {
            error!("Failed to join blocking task for put_object: {}", e);
            MinioError::OperationError(format!("Join error: {}", e))
        })?
    }

    #[instrument(skip(self), fields(object_name = %object_name))]
    pub async fn remove_object(&self, object_name: &str) -> Result<(), MinioError> {
        let args = RemoveObjectArgs::new(&self.config.bucket_name, object_name)
            .map_err(|e| MinioError::InvalidArguments(e.to_string()))?;

        self.client.remove_object(&args).await.map_err(|e| {
            error!("Failed to delete object '{}': {}", object_name, e);
            MinioError::OperationError(format!("Delete failed: {}", e))
        })?;

        info!("Deleted object '{}'", object_name);
        Ok(())
    }

    pub fn public_url(&self, object_name: &str) -> String {
        public_url(&self.config.links_prefix, &self.config.bucket_name, object_name)
    }
}

#[async_trait]
impl ObjectStorage for MinioService {
    async fn upload(&self, folder: &str, file: &UploadedFile) -> Result<String, MinioError> {
        let object_name = object_name_for(folder, file);
        self.put_object(&object_name, file.content.to_vec(), &file.content_type)
            .await?;
        Ok(self.public_url(&object_name))
    }

    async fn remove(&self, url: &str) -> Result<(), MinioError> {
        let object_name = object_name_from_url(&self.config.links_prefix, &self.config.bucket_name, url)
            .ok_or_else(|| MinioError::ObjectNotFound(format!("Not a link into this bucket: {}", url)))?;
        self.remove_object(&object_name).await
    }
}

/// `<folder>/<uuid>.<ext>`, the extension taken from the original filename when it is sane.
pub fn object_name_for(folder: &str, file: &UploadedFile) -> String {
    let extension = file
        .filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    match extension {
        Some(ext) => format!("{}/{}.{}", folder, Uuid::new_v4(), ext),
        None => format!("{}/{}", folder, Uuid::new_v4()),
    }
}

pub fn public_url(links_prefix: &str, bucket: &str, object_name: &str) -> String {
    format!("{}/{}/{}", links_prefix.trim_end_matches('/'), bucket, object_name)
}

pub fn object_name_from_url(links_prefix: &str, bucket: &str, url: &str) -> Option<String> {
    let prefix = format!("{}/{}/", links_prefix.trim_end_matches('/'), bucket);
    url.strip_prefix(&prefix)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}
