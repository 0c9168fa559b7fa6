//! Cache of built datasets keyed by accession identifier
//!
//! Entries never expire on their own; callers invalidate them explicitly.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use super::LoadedDataset;
use crate::error::Result;

/// Get-or-compute store for loaded datasets
pub trait DatasetCache {
    /// Return the cached dataset for `key`, or run `load` and keep its result
    ///
    /// Failed loads are not cached.
    fn get_or_load(
        &mut self,
        key: &str,
        load: &mut dyn FnMut() -> Result<LoadedDataset>,
    ) -> Result<Arc<LoadedDataset>>;

    /// Drop one entry; returns whether it was present
    fn invalidate(&mut self, key: &str) -> bool;

    /// Drop every entry
    fn clear(&mut self);

    /// Number of cached entries
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-process cache with an optional capacity
///
/// When full, the entry inserted first is evicted.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: HashMap<String, Arc<LoadedDataset>>,
    order: VecDeque<String>,
    capacity: Option<usize>,
}

impl MemoryCache {
    /// Unbounded cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache holding at most `capacity` datasets (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
            ..Self::default()
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn evict_to_fit(&mut self) {
        let Some(capacity) = self.capacity else {
            return;
        };
        while self.entries.len() >= capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    log::debug!("Evicting {} from dataset cache", oldest);
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }
}

impl DatasetCache for MemoryCache {
    fn get_or_load(
        &mut self,
        key: &str,
        load: &mut dyn FnMut() -> Result<LoadedDataset>,
    ) -> Result<Arc<LoadedDataset>> {
        if let Some(hit) = self.entries.get(key) {
            log::info!("{} served from cache", key);
            return Ok(Arc::clone(hit));
        }

        let dataset = Arc::new(load()?);
        self.evict_to_fit();
        self.entries.insert(key.to_string(), Arc::clone(&dataset));
        self.order.push_back(key.to_string());
        Ok(dataset)
    }

    fn invalidate(&mut self, key: &str) -> bool {
        self.order.retain(|k| k != key);
        self.entries.remove(key).is_some()
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Cache that keeps nothing; every request loads
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl DatasetCache for NoCache {
    fn get_or_load(
        &mut self,
        _key: &str,
        load: &mut dyn FnMut() -> Result<LoadedDataset>,
    ) -> Result<Arc<LoadedDataset>> {
        Ok(Arc::new(load()?))
    }

    fn invalidate(&mut self, _key: &str) -> bool {
        false
    }

    fn clear(&mut self) {}

    fn len(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{
        BuildParams, MetadataFields, RawDataset, SampleAnnotation, SampleExpression,
    };
    use crate::error::ExplorerError;

    fn dataset(accession: &str) -> Result<LoadedDataset> {
        let mut fields = MetadataFields::new();
        fields.push("characteristics_ch1", "group: a");
        let raw = RawDataset {
            accession: accession.to_string(),
            series: MetadataFields::new(),
            expression: vec![SampleExpression::new("s1", vec![("g1".to_string(), 1.0)])],
            annotations: vec![SampleAnnotation::new("s1", fields)],
        };
        LoadedDataset::from_raw(raw, &BuildParams::default())
    }

    #[test]
    fn test_memory_cache_hit() {
        let mut cache = MemoryCache::new();
        let mut calls = 0;
        for _ in 0..3 {
            let ds = cache
                .get_or_load("GSE1", &mut || {
                    calls += 1;
                    dataset("GSE1")
                })
                .unwrap();
            assert_eq!(ds.accession, "GSE1");
        }
        assert_eq!(calls, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failures_not_cached() {
        let mut cache = MemoryCache::new();
        let result = cache.get_or_load("GSE2", &mut || {
            Err(ExplorerError::Fetch {
                accession: "GSE2".to_string(),
                reason: "offline".to_string(),
            })
        });
        assert!(result.is_err());
        assert!(cache.is_empty());

        let mut calls = 0;
        cache
            .get_or_load("GSE2", &mut || {
                calls += 1;
                dataset("GSE2")
            })
            .unwrap();
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut cache = MemoryCache::with_capacity(2);
        for key in ["GSE1", "GSE2", "GSE3"] {
            cache.get_or_load(key, &mut || dataset(key)).unwrap();
        }
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains("GSE1"));
        assert!(cache.contains("GSE2"));
        assert!(cache.contains("GSE3"));
    }

    #[test]
    fn test_invalidate_and_clear() {
        let mut cache = MemoryCache::new();
        cache.get_or_load("GSE1", &mut || dataset("GSE1")).unwrap();
        cache.get_or_load("GSE2", &mut || dataset("GSE2")).unwrap();
        assert!(cache.invalidate("GSE1"));
        assert!(!cache.invalidate("GSE1"));
        assert_eq!(cache.len(), 1);

        let mut calls = 0;
        cache
            .get_or_load("GSE1", &mut || {
                calls += 1;
                dataset("GSE1")
            })
            .unwrap();
        assert_eq!(calls, 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_no_cache_always_loads() {
        let mut cache = NoCache;
        let mut calls = 0;
        for _ in 0..2 {
            cache
                .get_or_load("GSE1", &mut || {
                    calls += 1;
                    dataset("GSE1")
                })
                .unwrap();
        }
        assert_eq!(calls, 2);
        assert!(cache.is_empty());
    }
}
