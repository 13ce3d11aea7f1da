use aws_sdk_s3::{
    Client,
    error::DisplayErrorContext,
    primitives::ByteStream,
    types::{CompletedMultipartUpload, CompletedPart, ObjectCannedAcl},
};
use futures::stream::{self, StreamExt, TryStreamExt};
use indicatif::ProgressBar;
use std::path::Path;
use tracing::{debug, info, warn};

use super::error::{DeployError, Result};

/// Upload a large file using S3 multipart upload.
///
/// The file is split into `part_size` chunks uploaded as separate requests,
/// with up to `queue_size` parts in flight at once. Parts are assembled
/// server-side once all of them land.
#[allow(clippy::too_many_arguments)]
pub async fn upload_multipart(
    client: &Client,
    bucket: &str,
    key: &str,
    acl: ObjectCannedAcl,
    content_type: &str,
    local_path: &Path,
    part_size: usize,
    queue_size: usize,
    pb: &ProgressBar,
) -> Result<()> {
    let buffer = tokio::fs::read(local_path)
        .await
        .map_err(|e| DeployError::from_io_error(e, &local_path.display().to_string()))?;
    let file_size = buffer.len() as u64;

    info!(
        "Starting multipart upload for {} ({} bytes, {} byte parts, queue size {})",
        local_path.display(),
        file_size,
        part_size,
        queue_size
    );

    let multipart = client
        .create_multipart_upload()
        .bucket(bucket)
        .key(key)
        .acl(acl)
        .content_type(content_type)
        .send()
        .await
        .map_err(|e| DeployError::from_aws_error(bucket, DisplayErrorContext(&e)))?;

    let upload_id = multipart
        .upload_id()
        .ok_or_else(|| DeployError::AwsSdk("No upload ID returned from S3".to_string()))?;

    debug!("Multipart upload initiated with ID: {}", upload_id);

    pb.set_length(file_size);
    pb.set_position(0);
    pb.set_message(format!("Multipart upload {}", local_path.display()));

    let chunks: Vec<(i32, Vec<u8>)> = buffer
        .chunks(part_size)
        .enumerate()
        .map(|(idx, chunk)| (idx as i32 + 1, chunk.to_vec()))
        .collect();

    let part_results = stream::iter(chunks.into_iter().map(|(part_number, body)| {
        let pb = pb.clone();
        async move {
            let part_len = body.len() as u64;
            debug!("Uploading part {} ({} bytes)", part_number, part_len);

            let part = client
                .upload_part()
                .bucket(bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(body))
                .send()
                .await
                .map_err(|e| DeployError::from_aws_error(bucket, DisplayErrorContext(&e)))?;

            pb.inc(part_len);

            Ok::<_, DeployError>(
                CompletedPart::builder()
                    .part_number(part_number)
                    .e_tag(part.e_tag().unwrap_or(""))
                    .build(),
            )
        }
    }))
    .buffer_unordered(queue_size.max(1))
    .try_collect::<Vec<_>>()
    .await;

    let mut parts = match part_results {
        Ok(parts) => parts,
        Err(e) => {
            // Clean up the partial upload so S3 doesn't keep billing for it
            if let Err(abort_err) = abort_multipart_upload(client, bucket, key, upload_id).await {
                warn!("Failed to abort multipart upload {}: {}", upload_id, abort_err);
            }
            return Err(e);
        }
    };

    // Parts complete out of order; S3 requires them sorted by part number
    parts.sort_by_key(|p| p.part_number().unwrap_or(0));

    debug!("All {} parts uploaded, completing multipart upload", parts.len());

    let completed = CompletedMultipartUpload::builder()
        .set_parts(Some(parts))
        .build();

    client
        .complete_multipart_upload()
        .bucket(bucket)
        .key(key)
        .upload_id(upload_id)
        .multipart_upload(completed)
        .send()
        .await
        .map_err(|e| DeployError::from_aws_error(bucket, DisplayErrorContext(&e)))?;

    info!(
        "Completed multipart upload: {} -> s3://{}/{}",
        local_path.display(),
        bucket,
        key
    );

    Ok(())
}

/// Abort a multipart upload, discarding any parts already on S3.
async fn abort_multipart_upload(
    client: &Client,
    bucket: &str,
    key: &str,
    upload_id: &str,
) -> Result<()> {
    client
        .abort_multipart_upload()
        .bucket(bucket)
        .key(key)
        .upload_id(upload_id)
        .send()
        .await
        .map_err(|e| DeployError::from_aws_error(bucket, DisplayErrorContext(&e)))?;

    debug!("Aborted multipart upload {}", upload_id);

    Ok(())
}
