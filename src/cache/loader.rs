use futures_util::future::BoxFuture;

use super::IndexCacheKey;
use crate::{error::LoadError, index::IndexMetadata};

/// Fetches the indexes stored for a cache key.
///
/// Implementations own the storage client and the on-disk layout. They are
/// called from the cache's background pool, never from a planning thread,
/// and may take as long as the storage needs (bounded by the configured load
/// timeout).
///
/// # Example
///
/// ```rust,ignore
/// use futures_util::{FutureExt, future::BoxFuture};
/// use split_prune::{IndexCacheKey, IndexLoader, IndexMetadata, LoadError};
///
/// struct HdfsIndexLoader {
///     client: HdfsClient,
/// }
///
/// impl IndexLoader for HdfsIndexLoader {
///     fn load(&self, key: &IndexCacheKey) -> BoxFuture<'_, Result<Vec<IndexMetadata>, LoadError>> {
///         let path = key.path().to_string();
///         async move {
///             let entries = self.client.list(&path).await?;
///             entries.into_iter().map(|entry| entry.read_index()).collect()
///         }
///         .boxed()
///     }
/// }
/// ```
pub trait IndexLoader: Send + Sync + 'static {
    /// Load every index stored for `key`.
    ///
    /// An empty vector means the file has no index; it is cached like any
    /// other result.
    fn load(&self, key: &IndexCacheKey) -> BoxFuture<'_, Result<Vec<IndexMetadata>, LoadError>>;
}
