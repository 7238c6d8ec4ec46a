//! Cached metadata provider implementation
//!
//! This module provides a caching wrapper for metadata providers that
//! stores resolved shows in a local cache. Watch information is never cached
//! since stream URLs are signed and expire quickly.

use super::{MetadataProvider, MetadataRetrievalError, Show, ShowIdentifier, WatchInfo};
use crate::cache::CacheStorage;
use crate::stream_selection::StreamHandle;

/// A caching wrapper for metadata providers
///
/// This provider wraps another metadata provider and caches resolved shows
/// to avoid redundant network requests across runs.
pub(crate) struct CachedMetadataProvider<P>
where
    P: MetadataProvider,
{
    /// The underlying metadata provider
    provider: P,
    /// Cache storage for show data
    cache: CacheStorage<Show>,
}

impl<P> CachedMetadataProvider<P>
where
    P: MetadataProvider,
{
    /// Creates a new cached metadata provider wrapping the given provider
    pub fn new(provider: P, cache: CacheStorage<Show>) -> Self {
        Self { provider, cache }
    }
}

impl<P> MetadataProvider for CachedMetadataProvider<P>
where
    P: MetadataProvider,
{
    fn fetch_show(&self, id: &ShowIdentifier) -> Result<Show, MetadataRetrievalError> {
        match self.cache.load(id.as_str()) {
            Ok(Some(show)) => {
                tracing::debug!(show = %id, "metadata cache hit");
                return Ok(show);
            }
            Ok(None) => {}
            Err(e) => {
                // A broken cache entry must not prevent metadata retrieval
                tracing::warn!(show = %id, error = %e, "ignoring unreadable cache entry");
            }
        }

        let show = self.provider.fetch_show(id)?;

        // Shows without episodes are not worth remembering
        if !show.episodes.is_empty() {
            if let Err(e) = self.cache.store(id.as_str(), &show) {
                tracing::warn!(show = %id, error = %e, "failed to cache show metadata");
            }
        }

        Ok(show)
    }

    fn fetch_watch_info(&self, handle: &StreamHandle) -> Result<WatchInfo, MetadataRetrievalError> {
        self.provider.fetch_watch_info(handle)
    }
}
