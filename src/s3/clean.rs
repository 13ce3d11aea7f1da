use tracing::{debug, info};

use super::error::Result;
use super::store::ObjectStore;

/// S3 caps a single DeleteObjects request at 1000 keys.
const DELETE_BATCH: usize = 1000;

/// Delete every object whose key matches the destination prefix, returning
/// the number of objects removed. An empty prefix empties the whole bucket.
///
/// Matching is by substring, not by leading path segment: a prefix of
/// `assets` also matches a key like `img/assets-logo.png`.
pub async fn empty_prefix<S: ObjectStore + ?Sized>(store: &S, prefix: &str) -> Result<usize> {
    info!("Emptying destination prefix '{}'", prefix);

    let keys = store.list_keys().await?;

    let matched: Vec<String> = if prefix.is_empty() {
        keys
    } else {
        keys.into_iter().filter(|key| key.contains(prefix)).collect()
    };

    if matched.is_empty() {
        debug!("No objects matched prefix '{}', nothing to delete", prefix);
        return Ok(0);
    }

    let mut deleted = 0;
    for batch in matched.chunks(DELETE_BATCH) {
        deleted += store.delete_keys(batch.to_vec()).await?;
    }

    info!("Deleted {} objects", deleted);

    Ok(deleted)
}
