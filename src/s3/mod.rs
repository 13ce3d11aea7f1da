pub mod clean;
pub mod client;
pub mod content_type;
pub mod deploy;
pub mod error;
pub mod multipart;
pub mod store;
pub mod upload;

pub use clean::empty_prefix;
pub use client::S3Client;
pub use deploy::{FileEntry, Stats, UploadOutcome, upload_all};
pub use error::DeployError;
pub use store::ObjectStore;
