/// Read-through caching for an optional [`Cache`](crate::db::Cache).
///
/// Returns the cached value when present. Otherwise awaits `$block`, queues
/// the result for a background write and returns it. A failed cache read is
/// logged and treated as a miss, so Redis being down never fails a request.
/// With no cache configured the block is simply awaited.
///
/// # Example
/// ```rust,ignore
/// let catalog: CatalogSnapshot = cached!(self.cache, CacheKey::Catalog, ttl, async {
///     store.load_catalog().await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        match &$cache {
            Some(cache) => {
                let key = $key;
                let hit = match cache.get_from_cache(&key).await {
                    Ok(hit) => hit,
                    Err(e) => {
                        tracing::warn!(error = %e, key = %key, "Cache read failed, falling through");
                        None
                    }
                };

                match hit {
                    Some(cached) => {
                        tracing::debug!(key = %key, "Cache hit");
                        Ok(cached)
                    }
                    None => match $block.await {
                        Ok(value) => {
                            cache.set_in_background(&key, &value, $ttl);
                            Ok(value)
                        }
                        Err(e) => Err(e),
                    },
                }
            }
            None => $block.await,
        }
    }};
}
