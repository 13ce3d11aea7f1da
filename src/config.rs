use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::ValueEnum;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::s3::content_type::DEFAULT_CONTENT_TYPES;

/// Canned ACL applied uniformly to every uploaded object.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acl {
    Private,
    PublicRead,
    PublicReadWrite,
    AuthenticatedRead,
    AwsExecRead,
    BucketOwnerRead,
    BucketOwnerFullControl,
}

impl Acl {
    pub fn as_canned(self) -> aws_sdk_s3::types::ObjectCannedAcl {
        use aws_sdk_s3::types::ObjectCannedAcl;
        match self {
            Self::Private => ObjectCannedAcl::Private,
            Self::PublicRead => ObjectCannedAcl::PublicRead,
            Self::PublicReadWrite => ObjectCannedAcl::PublicReadWrite,
            Self::AuthenticatedRead => ObjectCannedAcl::AuthenticatedRead,
            Self::AwsExecRead => ObjectCannedAcl::AwsExecRead,
            Self::BucketOwnerRead => ObjectCannedAcl::BucketOwnerRead,
            Self::BucketOwnerFullControl => ObjectCannedAcl::BucketOwnerFullControl,
        }
    }
}

/// Credentials file format (`AwsConfig.json`), as produced for the AWS SDK:
/// an access key pair plus an optional region.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsFile {
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default)]
    pub region: Option<String>,
}

impl CredentialsFile {
    /// Load and parse the credentials file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read AWS config file: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse AWS config file: {}", path.display()))
    }
}

/// Resolved configuration for a single deploy run. Immutable after startup.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub bucket: String,
    pub dist_path: PathBuf,
    /// Destination key prefix, already datestamped when enabled.
    pub prefix: String,
    pub acl: Acl,
    pub credentials_path: PathBuf,
    pub empty_first: bool,
    /// Files of at least this many whole MB go through multipart upload;
    /// also the multipart part size.
    pub threshold_mb: u64,
    /// Ordered extension-to-MIME rules used for every upload.
    pub content_types: &'static [(&'static str, &'static str)],
}

impl RunConfig {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bucket: String,
        dist_path: PathBuf,
        prefix: String,
        acl: Acl,
        credentials_path: PathBuf,
        empty_first: bool,
        threshold_mb: u64,
    ) -> Result<Self> {
        validate_bucket_name(&bucket)?;
        if threshold_mb == 0 {
            anyhow::bail!("part size must be at least 1 MB");
        }

        Ok(Self {
            bucket,
            dist_path,
            prefix,
            acl,
            credentials_path,
            empty_first,
            threshold_mb,
            content_types: DEFAULT_CONTENT_TYPES,
        })
    }

    /// Construct the destination key for a relative path.
    pub fn build_key(&self, relative_path: &str) -> String {
        let path = relative_path.trim_start_matches("./");
        if self.prefix.is_empty() {
            path.to_string()
        } else {
            format!("{}/{}", self.prefix.trim_end_matches('/'), path)
        }
    }
}

/// Datestamp suffix for a destination prefix, format `.yyyyMMdd`.
pub fn datestamp(date: NaiveDate) -> String {
    date.format(".%Y%m%d").to_string()
}

/// Append the datestamp to a non-empty prefix; an empty prefix stays empty.
pub fn stamped_prefix(prefix: &str, date: NaiveDate) -> String {
    if prefix.is_empty() {
        String::new()
    } else {
        format!("{}{}", prefix, datestamp(date))
    }
}

/// Validate S3 bucket name according to AWS rules
pub fn validate_bucket_name(bucket: &str) -> Result<()> {
    if bucket.is_empty() {
        anyhow::bail!("bucket name cannot be empty");
    }

    if bucket.len() < 3 || bucket.len() > 63 {
        anyhow::bail!(
            "bucket name '{}' must be between 3 and 63 characters (got {})",
            bucket,
            bucket.len()
        );
    }

    let first = bucket.chars().next().unwrap();
    if !first.is_ascii_lowercase() && !first.is_ascii_digit() {
        anyhow::bail!(
            "bucket name '{}' must start with a lowercase letter or number",
            bucket
        );
    }

    let last = bucket.chars().last().unwrap();
    if !last.is_ascii_lowercase() && !last.is_ascii_digit() {
        anyhow::bail!(
            "bucket name '{}' must end with a lowercase letter or number",
            bucket
        );
    }

    for c in bucket.chars() {
        if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' && c != '.' {
            anyhow::bail!(
                "bucket name '{}' contains invalid character '{}'. Only lowercase letters, numbers, hyphens, and periods are allowed",
                bucket,
                c
            );
        }
    }

    if bucket.contains("..") {
        anyhow::bail!("bucket name '{}' cannot contain consecutive periods", bucket);
    }

    // IP address format is not allowed
    if bucket
        .split('.')
        .all(|part| part.parse::<u8>().is_ok() && !part.is_empty())
    {
        anyhow::bail!("bucket name '{}' cannot be formatted as an IP address", bucket);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_prefix(prefix: &str) -> RunConfig {
        RunConfig::new(
            "test-bucket".to_string(),
            PathBuf::from("./dist"),
            prefix.to_string(),
            Acl::Private,
            PathBuf::from("./AwsConfig.json"),
            false,
            5,
        )
        .unwrap()
    }

    #[test]
    fn test_datestamp_format() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(datestamp(date), ".20240305");
    }

    #[test]
    fn test_datestamp_is_idempotent() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert_eq!(datestamp(date), datestamp(date));
        assert_eq!(datestamp(date), ".20241231");
    }

    #[test]
    fn test_stamped_prefix() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(stamped_prefix("releases", date), "releases.20240305");
        // Empty prefix never gets stamped
        assert_eq!(stamped_prefix("", date), "");
    }

    #[test]
    fn test_key_construction() {
        let config = config_with_prefix("uploads");
        assert_eq!(config.build_key("index.html"), "uploads/index.html");
        assert_eq!(config.build_key("./index.html"), "uploads/index.html");
        assert_eq!(config.build_key("js/app.js"), "uploads/js/app.js");

        let config = config_with_prefix("");
        assert_eq!(config.build_key("index.html"), "index.html");
        assert_eq!(config.build_key("js/app.js"), "js/app.js");
    }

    #[test]
    fn test_bucket_name_validation() {
        // Valid bucket names
        assert!(validate_bucket_name("my-bucket").is_ok());
        assert!(validate_bucket_name("my.bucket.123").is_ok());
        assert!(validate_bucket_name("abc").is_ok());

        // Invalid bucket names
        assert!(validate_bucket_name("ab").is_err()); // Too short
        assert!(validate_bucket_name(&"a".repeat(64)).is_err()); // Too long
        assert!(validate_bucket_name("MY-BUCKET").is_err()); // Uppercase
        assert!(validate_bucket_name("my_bucket").is_err()); // Underscore
        assert!(validate_bucket_name("-mybucket").is_err()); // Starts with dash
        assert!(validate_bucket_name("mybucket-").is_err()); // Ends with dash
        assert!(validate_bucket_name("my..bucket").is_err()); // Consecutive periods
        assert!(validate_bucket_name("192.168.1.1").is_err()); // IP address format
        assert!(validate_bucket_name("").is_err()); // Empty
    }

    #[test]
    fn test_zero_part_size_rejected() {
        let result = RunConfig::new(
            "test-bucket".to_string(),
            PathBuf::from("./dist"),
            String::new(),
            Acl::Private,
            PathBuf::from("./AwsConfig.json"),
            false,
            0,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_credentials_file_parsing() {
        let raw = r#"{"accessKeyId": "AKIA123", "secretAccessKey": "shh", "region": "us-west-2"}"#;
        let creds: CredentialsFile = serde_json::from_str(raw).unwrap();
        assert_eq!(creds.access_key_id, "AKIA123");
        assert_eq!(creds.secret_access_key, "shh");
        assert_eq!(creds.region.as_deref(), Some("us-west-2"));

        // Region is optional
        let raw = r#"{"accessKeyId": "AKIA123", "secretAccessKey": "shh"}"#;
        let creds: CredentialsFile = serde_json::from_str(raw).unwrap();
        assert!(creds.region.is_none());
    }
}
