use anyhow::Result;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, timeout::TimeoutConfig};
use aws_sdk_s3::{
    Client,
    config::Credentials,
    error::DisplayErrorContext,
    types::{Delete, ObjectIdentifier},
};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

use crate::config::{CredentialsFile, RunConfig};

use super::content_type::resolve_content_type;
use super::deploy::MB;
use super::error::DeployError;
use super::multipart::upload_multipart;
use super::store::ObjectStore;
use super::upload::upload_file;

/// Per-request timeout applied to every S3 operation (5 minutes).
const OPERATION_TIMEOUT: Duration = Duration::from_secs(300);

pub struct S3Client {
    client: Client,
    pub config: RunConfig,
    progress: MultiProgress,
}

impl S3Client {
    /// Build an S3 client from the run configuration, reading the access
    /// key pair from the credentials file.
    pub async fn new(config: RunConfig) -> Result<Self> {
        let creds = CredentialsFile::load(&config.credentials_path)?;

        let region = creds
            .region
            .clone()
            .or_else(|| std::env::var("AWS_REGION").ok())
            .unwrap_or_else(|| "us-east-1".to_string());

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region))
            .credentials_provider(Credentials::new(
                creds.access_key_id,
                creds.secret_access_key,
                None,
                None,
                "s3deploy-config-file",
            ))
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(OPERATION_TIMEOUT)
                    .build(),
            )
            .load()
            .await;

        let client = Client::new(&sdk_config);

        Ok(Self {
            client,
            config,
            progress: MultiProgress::new(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    fn progress_bar(&self) -> ProgressBar {
        let pb = self.progress.add(ProgressBar::new(0));
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );
        pb
    }

    fn content_type_for(&self, local: &Path) -> &'static str {
        let name = local
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        resolve_content_type(&name, self.config.content_types)
    }
}

/// Continuation token for the next listing page, `None` when done.
///
/// A truncated response that carries no token is an error; following it
/// blindly would re-list the first page forever.
fn next_continuation(
    is_truncated: Option<bool>,
    token: Option<&str>,
) -> Result<Option<String>, DeployError> {
    match (is_truncated.unwrap_or(false), token) {
        (false, _) => Ok(None),
        (true, Some(token)) => Ok(Some(token.to_string())),
        (true, None) => Err(DeployError::AwsSdk(
            "Listing truncated but no continuation token returned".to_string(),
        )),
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn put_object(&self, key: &str, local: &Path) -> Result<(), DeployError> {
        let pb = self.progress_bar();
        let result = upload_file(
            &self.client,
            self.bucket(),
            key,
            self.config.acl.as_canned(),
            self.content_type_for(local),
            local,
            &pb,
        )
        .await;
        pb.finish_and_clear();
        result
    }

    async fn put_object_multipart(
        &self,
        key: &str,
        local: &Path,
        part_count: usize,
    ) -> Result<(), DeployError> {
        let pb = self.progress_bar();
        let result = upload_multipart(
            &self.client,
            self.bucket(),
            key,
            self.config.acl.as_canned(),
            self.content_type_for(local),
            local,
            (self.config.threshold_mb * MB) as usize,
            part_count,
            &pb,
        )
        .await;
        pb.finish_and_clear();
        result
    }

    async fn list_keys(&self) -> Result<Vec<String>, DeployError> {
        let mut keys = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let mut request = self.client.list_objects_v2().bucket(self.bucket());
            if let Some(t) = &token {
                request = request.continuation_token(t);
            }

            let response = request
                .send()
                .await
                .map_err(|e| DeployError::from_aws_error(self.bucket(), DisplayErrorContext(&e)))?;

            for object in response.contents() {
                if let Some(key) = object.key() {
                    keys.push(key.to_string());
                }
            }

            match next_continuation(response.is_truncated(), response.next_continuation_token())? {
                Some(t) => token = Some(t),
                None => break,
            }
        }

        Ok(keys)
    }

    async fn delete_keys(&self, keys: Vec<String>) -> Result<usize, DeployError> {
        let count = keys.len();

        let objects = keys
            .into_iter()
            .map(|key| ObjectIdentifier::builder().key(key).build())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DeployError::AwsSdk(e.to_string()))?;

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .build()
            .map_err(|e| DeployError::AwsSdk(e.to_string()))?;

        let response = self
            .client
            .delete_objects()
            .bucket(self.bucket())
            .delete(delete)
            .send()
            .await
            .map_err(|e| DeployError::from_aws_error(self.bucket(), DisplayErrorContext(&e)))?;

        if let Some(first) = response.errors().first() {
            return Err(DeployError::AwsSdk(format!(
                "Failed to delete '{}': {}",
                first.key().unwrap_or("<unknown>"),
                first.message().unwrap_or("<no detail>")
            )));
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_continuation_stops_on_final_page() {
        assert_eq!(next_continuation(Some(false), None).unwrap(), None);
        // A leftover token on an untruncated response is ignored
        assert_eq!(next_continuation(None, Some("tok")).unwrap(), None);
    }

    #[test]
    fn test_next_continuation_follows_token() {
        let next = next_continuation(Some(true), Some("tok")).unwrap();
        assert_eq!(next.as_deref(), Some("tok"));
    }

    #[test]
    fn test_next_continuation_truncated_without_token_is_error() {
        assert!(next_continuation(Some(true), None).is_err());
    }
}
