//! Ratio/solution cache (C9): memoizes ICPMP's minimal-employee-count and
//! offset-distribution result for a requirement shape, content-addressed so
//! identical shapes across different jobs share the computation (spec §4.9).
//!
//! Process-local only — never persisted, flushed wholesale on admin reset
//! (spec §4.8.3, §9 "module-level caches... flushed on admin reset").

use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;

use crate::icpmp::IcpmpResult;

/// Fingerprint of everything ICPMP's result depends on, excluding the
/// employee pool itself (selection still runs against the live pool; only
/// the headcount/offset-distribution shape is cacheable).
#[derive(Debug, Clone)]
pub struct RatioCacheKey {
    pub pattern_tokens: Vec<String>,
    pub headcount_per_day: usize,
    pub coverage_day_count: usize,
    pub horizon_length_days: i64,
    pub scheme_mix: Vec<String>,
}

impl RatioCacheKey {
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for token in &self.pattern_tokens {
            hasher.update(token.as_bytes());
            hasher.update(b"|");
        }
        hasher.update(self.headcount_per_day.to_le_bytes());
        hasher.update(self.coverage_day_count.to_le_bytes());
        hasher.update(self.horizon_length_days.to_le_bytes());
        let mut schemes = self.scheme_mix.clone();
        schemes.sort();
        for scheme in &schemes {
            hasher.update(scheme.as_bytes());
            hasher.update(b"|");
        }
        format!("{:x}", hasher.finalize())
    }
}

#[derive(Debug, Clone)]
pub struct CachedRatio {
    pub optimal_employees: usize,
    pub offset_distribution: std::collections::BTreeMap<usize, usize>,
    pub u_slots_total: usize,
    pub is_optimal: bool,
    pub coverage_rate: f64,
}

impl From<&IcpmpResult> for CachedRatio {
    fn from(r: &IcpmpResult) -> Self {
        Self {
            optimal_employees: r.optimal_employees,
            offset_distribution: r.offset_distribution.clone(),
            u_slots_total: r.u_slots_total,
            is_optimal: r.is_optimal,
            coverage_rate: r.coverage_rate,
        }
    }
}

/// Bounded LRU keyed by `RatioCacheKey::fingerprint()`. Interior mutability
/// behind a `parking_lot::Mutex` so the worker pool can share one instance
/// across threads without locking out solving itself (only the cache
/// lookup/insert is serialized).
pub struct RatioCache {
    inner: Mutex<LruCache<String, CachedRatio>>,
}

impl RatioCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, key: &RatioCacheKey) -> Option<CachedRatio> {
        self.inner.lock().get(&key.fingerprint()).cloned()
    }

    pub fn insert(&self, key: &RatioCacheKey, value: CachedRatio) {
        self.inner.lock().put(key.fingerprint(), value);
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RatioCache {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(pattern_len: usize) -> RatioCacheKey {
        RatioCacheKey {
            pattern_tokens: (0..pattern_len).map(|i| format!("t{i}")).collect(),
            headcount_per_day: 2,
            coverage_day_count: 30,
            horizon_length_days: 30,
            scheme_mix: vec!["A".into()],
        }
    }

    #[test]
    fn identical_shapes_share_fingerprint() {
        assert_eq!(key(3).fingerprint(), key(3).fingerprint());
        assert_ne!(key(3).fingerprint(), key(4).fingerprint());
    }

    #[test]
    fn insert_then_get_round_trips() {
        let cache = RatioCache::new(4);
        let k = key(3);
        cache.insert(
            &k,
            CachedRatio {
                optimal_employees: 5,
                offset_distribution: Default::default(),
                u_slots_total: 0,
                is_optimal: true,
                coverage_rate: 1.0,
            },
        );
        assert_eq!(cache.get(&k).unwrap().optimal_employees, 5);
    }

    #[test]
    fn eviction_drops_least_recently_used() {
        let cache = RatioCache::new(1);
        let a = key(1);
        let b = key(2);
        cache.insert(
            &a,
            CachedRatio {
                optimal_employees: 1,
                offset_distribution: Default::default(),
                u_slots_total: 0,
                is_optimal: true,
                coverage_rate: 1.0,
            },
        );
        cache.insert(
            &b,
            CachedRatio {
                optimal_employees: 2,
                offset_distribution: Default::default(),
                u_slots_total: 0,
                is_optimal: true,
                coverage_rate: 1.0,
            },
        );
        assert!(cache.get(&a).is_none());
        assert!(cache.get(&b).is_some());
    }

    #[test]
    fn clear_empties_cache() {
        let cache = RatioCache::new(4);
        cache.insert(
            &key(1),
            CachedRatio {
                optimal_employees: 1,
                offset_distribution: Default::default(),
                u_slots_total: 0,
                is_optimal: true,
                coverage_rate: 1.0,
            },
        );
        cache.clear();
        assert!(cache.is_empty());
    }
}
