//! Catalog cache port
//!
//! Schemas are cached by the collaborator that fetches catalogs, through an
//! injected [`CatalogCache`]. Nothing in the resolver or ledger consults it.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};

use crate::domain::variants::{CatalogInput, SchemaError, VariantSchema};

pub trait CatalogCache: Send + Sync {
    fn get(&self, key: &str) -> Option<Arc<VariantSchema>>;
    fn put(&self, key: &str, schema: Arc<VariantSchema>, ttl: Duration);
    fn invalidate(&self, key: &str);
}

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// In-process cache with a per-entry TTL. Expired entries are dropped on read.
pub struct TtlCatalogCache {
    entries: RwLock<HashMap<String, (Arc<VariantSchema>, DateTime<Utc>)>>,
    clock: Clock,
}

impl TtlCatalogCache {
    pub fn new() -> Self { Self::with_clock(Box::new(Utc::now)) }

    pub fn with_clock(clock: Clock) -> Self { Self { entries: RwLock::new(HashMap::new()), clock } }

    pub fn len(&self) -> usize { self.entries.read().unwrap_or_else(PoisonError::into_inner).len() }
    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl Default for TtlCatalogCache {
    fn default() -> Self { Self::new() }
}

impl CatalogCache for TtlCatalogCache {
    fn get(&self, key: &str) -> Option<Arc<VariantSchema>> {
        let now = (self.clock)();
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(key) {
                None => return None,
                Some((schema, expires_at)) if *expires_at > now => return Some(Arc::clone(schema)),
                Some(_) => {}
            }
        }
        self.entries.write().unwrap_or_else(PoisonError::into_inner).remove(key);
        None
    }

    fn put(&self, key: &str, schema: Arc<VariantSchema>, ttl: Duration) {
        let expires_at = (self.clock)() + ttl;
        self.entries.write().unwrap_or_else(PoisonError::into_inner).insert(key.to_string(), (schema, expires_at));
    }

    fn invalidate(&self, key: &str) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).remove(key);
    }
}

/// Returns the cached schema for `key`, or builds one from `loader` and caches it.
pub fn load_schema<E>(
    cache: &dyn CatalogCache,
    key: &str,
    ttl: Duration,
    loader: impl FnOnce() -> Result<CatalogInput, E>,
) -> Result<Arc<VariantSchema>, E>
where
    E: From<SchemaError>,
{
    if let Some(schema) = cache.get(key) {
        return Ok(schema);
    }
    let schema = Arc::new(VariantSchema::from_catalog(loader()?)?);
    cache.put(key, Arc::clone(&schema), ttl);
    tracing::debug!(key, skus = schema.skus().len(), "catalog schema cached");
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::variants::schema::fixtures::{dimension, sku};
    use std::sync::atomic::{AtomicI64, Ordering};

    fn catalog() -> CatalogInput {
        CatalogInput { dimensions: vec![dimension("Color", 0, &["Red"])], skus: vec![sku("1", &[("Color", "Red")])] }
    }

    #[test]
    fn test_load_caches_until_expiry() {
        let offset = Arc::new(AtomicI64::new(0));
        let clock_offset = Arc::clone(&offset);
        let start = Utc::now();
        let cache = TtlCatalogCache::with_clock(Box::new(move || start + Duration::seconds(clock_offset.load(Ordering::SeqCst))));

        let mut loads = 0;
        let mut load = || {
            loads += 1;
            Ok::<_, SchemaError>(catalog())
        };
        let first = load_schema(&cache, "artist-42", Duration::seconds(60), &mut load).unwrap();
        let second = load_schema(&cache, "artist-42", Duration::seconds(60), &mut load).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        offset.store(61, Ordering::SeqCst);
        load_schema(&cache, "artist-42", Duration::seconds(60), &mut load).unwrap();
        assert_eq!(loads, 2);
    }

    #[test]
    fn test_invalid_catalog_is_not_cached() {
        let cache = TtlCatalogCache::new();
        let broken = CatalogInput { dimensions: vec![dimension("Color", 0, &["Red"])], skus: vec![sku("1", &[])] };
        let err = load_schema(&cache, "k", Duration::seconds(60), || Ok::<_, SchemaError>(broken)).unwrap_err();
        assert!(matches!(err, SchemaError::MissingDimension { .. }));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate() {
        let cache = TtlCatalogCache::new();
        load_schema(&cache, "k", Duration::seconds(60), || Ok::<_, SchemaError>(catalog())).unwrap();
        assert_eq!(cache.len(), 1);
        cache.invalidate("k");
        assert!(cache.get("k").is_none());
    }
}
