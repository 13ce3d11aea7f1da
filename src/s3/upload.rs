use aws_sdk_s3::{Client, error::DisplayErrorContext, primitives::ByteStream, types::ObjectCannedAcl};
use indicatif::ProgressBar;
use std::path::Path;

use super::error::{DeployError, Result};

/// Upload a file to S3 as a single PUT request.
pub async fn upload_file(
    client: &Client,
    bucket: &str,
    key: &str,
    acl: ObjectCannedAcl,
    content_type: &str,
    local_path: &Path,
    pb: &ProgressBar,
) -> Result<()> {
    let metadata = tokio::fs::metadata(local_path)
        .await
        .map_err(|e| DeployError::from_io_error(e, &local_path.display().to_string()))?;
    let file_size = metadata.len();

    pb.set_length(file_size);
    pb.set_message(format!("Uploading {}", local_path.display()));

    let body = ByteStream::from_path(local_path)
        .await
        .map_err(|e| DeployError::Io(std::io::Error::other(e)))?;

    client
        .put_object()
        .bucket(bucket)
        .key(key)
        .acl(acl)
        .content_type(content_type)
        .content_length(file_size as i64)
        .body(body)
        .send()
        .await
        .map_err(|e| DeployError::from_aws_error(bucket, DisplayErrorContext(&e)))?;

    pb.set_position(file_size);

    Ok(())
}
