use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::candidates::models::UploadedResume;

#[derive(Debug, Error)]
#[error("resume storage failed: {0}")]
pub struct StorageError(pub String);

/// Keeps resume bytes when a storage location is configured.
#[async_trait]
pub trait ResumeStore: Send + Sync {
    /// Returns the storage path to record on the candidate.
    async fn put(&self, resume: &UploadedResume) -> Result<String, StorageError>;

    /// Deletes an object previously returned by [`ResumeStore::put`].
    async fn remove(&self, path: &str) -> Result<(), StorageError>;
}

pub struct S3ResumeStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ResumeStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl ResumeStore for S3ResumeStore {
    async fn put(&self, resume: &UploadedResume) -> Result<String, StorageError> {
        let key = storage_key(Uuid::new_v4(), &resume.filename);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(resume.bytes.clone()))
            .content_type(&resume.content_type)
            .send()
            .await
            .map_err(|e| StorageError(format!("S3 upload failed: {e}")))?;

        info!("Uploaded resume to s3://{}/{}", self.bucket, key);
        Ok(format!("s3://{}/{}", self.bucket, key))
    }

    async fn remove(&self, path: &str) -> Result<(), StorageError> {
        let key = object_key(&self.bucket, path)
            .ok_or_else(|| StorageError(format!("'{path}' is not in bucket {}", self.bucket)))?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError(format!("S3 delete failed: {e}")))?;
        Ok(())
    }
}

/// Key part of an `s3://bucket/key` path in `bucket`.
fn object_key<'a>(bucket: &str, path: &'a str) -> Option<&'a str> {
    path.strip_prefix("s3://")?
        .strip_prefix(bucket)?
        .strip_prefix('/')
        .filter(|key| !key.is_empty())
}

fn storage_key(id: Uuid, filename: &str) -> String {
    format!("resumes/{id}/{}", sanitize_filename(filename))
}

/// Keeps only the final path component and a conservative character set.
fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "resume".to_string()
    } else {
        cleaned.to_string()
    }
}
