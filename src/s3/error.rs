use thiserror::Error;

/// Errors produced by the S3 operations behind [`ObjectStore`](super::ObjectStore).
#[derive(Error, Debug)]
pub enum DeployError {
    /// File not found on local filesystem
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// Permission denied accessing local file
    #[error("Permission denied: {path}")]
    PermissionDenied { path: String },

    /// S3 access denied
    #[error("S3 access denied for bucket '{bucket}': {message}")]
    AccessDenied { bucket: String, message: String },

    /// IO error wrapper
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// AWS SDK error wrapper
    #[error("AWS error: {0}")]
    AwsSdk(String),
}

impl DeployError {
    /// Create an error from an AWS SDK error, classifying access denials
    pub fn from_aws_error<E: std::fmt::Display>(bucket: &str, error: E) -> Self {
        let error_str = error.to_string();
        if error_str.to_lowercase().contains("access denied")
            || error_str.to_lowercase().contains("forbidden")
        {
            Self::AccessDenied {
                bucket: bucket.to_string(),
                message: error_str,
            }
        } else {
            Self::AwsSdk(error_str)
        }
    }

    /// Create an error from an IO error with the offending path
    pub fn from_io_error(error: std::io::Error, path: &str) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::FileNotFound {
                path: path.to_string(),
            },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                path: path.to_string(),
            },
            _ => Self::Io(error),
        }
    }
}

/// Result type for S3 deploy operations
pub type Result<T> = std::result::Result<T, DeployError>;
