use std::path::Path;

use async_trait::async_trait;

use super::error::Result;

/// Abstraction over the bucket operations the deploy flow needs.
///
/// The real implementation is [`S3Client`](super::S3Client); tests mock
/// this trait to drive the uploader and cleaner without network access.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload a file as a single PUT request.
    async fn put_object(&self, key: &str, local: &Path) -> Result<()>;

    /// Upload a file via multipart upload, split into `part_count` parts.
    async fn put_object_multipart(&self, key: &str, local: &Path, part_count: usize)
    -> Result<()>;

    /// List every object key in the bucket.
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Batch-delete the given keys, returning the number deleted.
    async fn delete_keys(&self, keys: Vec<String>) -> Result<usize>;
}
