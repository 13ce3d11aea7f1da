use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use super::error::DeployError;
use super::store::ObjectStore;

pub const MB: u64 = 1024 * 1024;

/// A local file slated for upload.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Path relative to the source root, as shown in logs and results
    pub relative: String,
    /// Absolute (or cwd-relative) local path to read from
    pub local: PathBuf,
    /// Destination key in the bucket, prefix included
    pub key: String,
}

/// Counters for a single deploy run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Files discovered by enumeration
    pub total: usize,
    /// Files uploaded successfully
    pub uploaded: usize,
    /// Files attempted, success or failure
    pub processed: usize,
}

impl Stats {
    pub fn failed(&self) -> usize {
        self.total - self.uploaded
    }

    pub fn all_uploaded(&self) -> bool {
        self.uploaded == self.total
    }

    /// The run is complete exactly when every discovered file was attempted.
    pub fn is_complete(&self) -> bool {
        self.processed == self.total
    }
}

/// Per-file result, collected once all upload tasks join.
#[derive(Debug, Clone)]
pub enum UploadOutcome {
    Uploaded { relative: String },
    Failed { relative: String, error: String },
}

impl UploadOutcome {
    pub fn relative(&self) -> &str {
        match self {
            Self::Uploaded { relative } | Self::Failed { relative, .. } => relative,
        }
    }
}

/// File size in whole megabytes, rounded up.
pub fn size_in_mb(bytes: u64) -> u64 {
    bytes.div_ceil(MB)
}

/// Whether a file of `bytes` goes through multipart upload.
pub fn is_multipart(bytes: u64, threshold_mb: u64) -> bool {
    size_in_mb(bytes) >= threshold_mb
}

/// Number of multipart parts for a file of `size_mb` megabytes.
pub fn part_count(size_mb: u64, threshold_mb: u64) -> usize {
    size_mb.div_ceil(threshold_mb) as usize
}

/// Upload every entry, one spawned task per file, and join them all.
///
/// Individual failures are logged and counted but never abort sibling
/// uploads. Returns the final counters plus the per-file outcomes.
pub async fn upload_all<S>(
    store: Arc<S>,
    entries: Vec<FileEntry>,
    threshold_mb: u64,
) -> (Stats, Vec<UploadOutcome>)
where
    S: ObjectStore + 'static,
{
    let total = entries.len();
    info!("Uploading {} files", total);

    let mut tasks = Vec::with_capacity(total);
    for entry in entries {
        let store = Arc::clone(&store);
        let relative = entry.relative.clone();
        let handle = tokio::spawn(async move { upload_one(&*store, entry, threshold_mb).await });
        tasks.push((relative, handle));
    }

    let mut stats = Stats {
        total,
        ..Stats::default()
    };
    let mut outcomes = Vec::with_capacity(total);

    for (relative, task) in tasks {
        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Upload task for {} panicked: {}", relative, e);
                UploadOutcome::Failed {
                    relative,
                    error: e.to_string(),
                }
            }
        };

        stats.processed += 1;
        if matches!(outcome, UploadOutcome::Uploaded { .. }) {
            stats.uploaded += 1;
        }
        outcomes.push(outcome);
    }

    debug_assert!(stats.is_complete());

    (stats, outcomes)
}

async fn upload_one<S: ObjectStore + ?Sized>(
    store: &S,
    entry: FileEntry,
    threshold_mb: u64,
) -> UploadOutcome {
    let result = async {
        let metadata = tokio::fs::metadata(&entry.local)
            .await
            .map_err(|e| DeployError::from_io_error(e, &entry.local.display().to_string()))?;

        let size_mb = size_in_mb(metadata.len());
        if is_multipart(metadata.len(), threshold_mb) {
            info!(
                "Using multipart upload for {} ({} MB)",
                entry.relative, size_mb
            );
            store
                .put_object_multipart(&entry.key, &entry.local, part_count(size_mb, threshold_mb))
                .await
        } else {
            store.put_object(&entry.key, &entry.local).await
        }
    }
    .await;

    match result {
        Ok(()) => UploadOutcome::Uploaded {
            relative: entry.relative,
        },
        Err(e) => {
            error!("Failed to upload {}: {}", entry.relative, e);
            UploadOutcome::Failed {
                relative: entry.relative,
                error: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::s3::store::MockObjectStore;
    use std::fs;

    #[test]
    fn test_size_in_mb_rounds_up() {
        assert_eq!(size_in_mb(0), 0);
        assert_eq!(size_in_mb(1), 1);
        assert_eq!(size_in_mb(MB), 1);
        assert_eq!(size_in_mb(MB + 1), 2);
        assert_eq!(size_in_mb(5 * MB), 5);
        assert_eq!(size_in_mb(5 * MB - 1), 5);
    }

    #[test]
    fn test_multipart_threshold_boundary() {
        // Exactly the threshold (in whole MB) goes multipart
        assert!(is_multipart(5 * MB, 5));
        // One full MB below does not
        assert!(!is_multipart(4 * MB, 5));
        // 4 MB + 1 byte rounds up to 5 MB, so it does
        assert!(is_multipart(4 * MB + 1, 5));
    }

    #[test]
    fn test_part_count() {
        assert_eq!(part_count(5, 5), 1);
        assert_eq!(part_count(10, 5), 2);
        assert_eq!(part_count(11, 5), 3);
    }

    fn entry(dir: &std::path::Path, name: &str, bytes: usize) -> FileEntry {
        let local = dir.join(name);
        fs::write(&local, vec![0u8; bytes]).unwrap();
        FileEntry {
            relative: name.to_string(),
            local,
            key: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![
            entry(dir.path(), "a.html", 10),
            entry(dir.path(), "b.css", 10),
            entry(dir.path(), "c.js", 10),
        ];

        let mut store = MockObjectStore::new();
        store
            .expect_put_object()
            .withf(|key, _| key == "b.css")
            .returning(|_, _| Err(DeployError::AwsSdk("simulated failure".to_string())));
        store
            .expect_put_object()
            .withf(|key, _| key != "b.css")
            .returning(|_, _| Ok(()));

        let (stats, outcomes) = upload_all(Arc::new(store), entries, 5).await;

        assert_eq!(stats.total, 3);
        assert_eq!(stats.uploaded, 2);
        assert_eq!(stats.processed, 3);
        assert_eq!(stats.failed(), 1);
        assert!(stats.is_complete());
        assert!(!stats.all_uploaded());

        let failed: Vec<_> = outcomes
            .iter()
            .filter(|o| matches!(o, UploadOutcome::Failed { .. }))
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].relative(), "b.css");
    }

    #[tokio::test]
    async fn test_large_file_goes_multipart() {
        let dir = tempfile::tempdir().unwrap();
        // 2 MB file with a 1 MB threshold: 2 parts
        let entries = vec![entry(dir.path(), "bundle.bin", 2 * MB as usize)];

        let mut store = MockObjectStore::new();
        store
            .expect_put_object_multipart()
            .withf(|key, _, parts| key == "bundle.bin" && *parts == 2)
            .returning(|_, _, _| Ok(()));

        let (stats, _) = upload_all(Arc::new(store), entries, 1).await;
        assert_eq!(stats.uploaded, 1);
    }

    #[tokio::test]
    async fn test_panicked_task_reports_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![entry(dir.path(), "a.html", 10)];

        let mut store = MockObjectStore::new();
        store
            .expect_put_object()
            .returning(|_, _| panic!("connection pool poisoned"));

        let (stats, outcomes) = upload_all(Arc::new(store), entries, 5).await;

        assert_eq!(stats.processed, 1);
        assert_eq!(stats.uploaded, 0);
        match &outcomes[0] {
            UploadOutcome::Failed { relative, .. } => assert_eq!(relative, "a.html"),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_local_file_counts_as_failure() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![FileEntry {
            relative: "ghost.txt".to_string(),
            local: dir.path().join("ghost.txt"),
            key: "ghost.txt".to_string(),
        }];

        let store = MockObjectStore::new();
        let (stats, outcomes) = upload_all(Arc::new(store), entries, 5).await;

        assert_eq!(stats.total, 1);
        assert_eq!(stats.uploaded, 0);
        assert_eq!(stats.processed, 1);
        assert!(matches!(&outcomes[0], UploadOutcome::Failed { .. }));
    }
}
