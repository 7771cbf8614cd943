//! Per-call trajectory cache.
//!
//! The cache is an explicit object owned by the caller and passed to the
//! analyzer, so concurrent batches never share state unless the caller
//! hands them the same cache. Entries are keyed by hole identifier plus a
//! fingerprint of everything the trajectory depends on; changing the survey
//! of a hole therefore misses and recomputes.

use std::sync::Arc;

use moka::sync::Cache;
use xxhash_rust::xxh3::Xxh3;

use crate::error::HoleError;
use crate::models::{Hole, HoleId};
use crate::survey::{DesurveyMethod, DipConvention, Trajectory};

pub const DEFAULT_CACHE_CAPACITY: u64 = 4096;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    hole_id: HoleId,
    fingerprint: u64,
}

pub struct TrajectoryCache {
    inner: Cache<CacheKey, Arc<Trajectory>>,
}

impl TrajectoryCache {
    pub fn new(capacity: u64) -> Self {
        TrajectoryCache {
            inner: Cache::new(capacity),
        }
    }

    /// Return the cached trajectory for `hole`, resolving and storing it on a
    /// miss. Resolution errors are not cached.
    pub fn get_or_resolve(
        &self,
        hole: &Hole,
        method: DesurveyMethod,
        convention: DipConvention,
    ) -> Result<Arc<Trajectory>, HoleError> {
        let key = CacheKey {
            hole_id: hole.id.clone(),
            fingerprint: fingerprint(hole, method, convention),
        };
        if let Some(trajectory) = self.inner.get(&key) {
            tracing::debug!(hole_id = %hole.id, "trajectory cache hit");
            return Ok(trajectory);
        }

        let trajectory = Arc::new(Trajectory::resolve(hole, method, convention)?);
        self.inner.insert(key, Arc::clone(&trajectory));
        Ok(trajectory)
    }

    /// Number of cached trajectories.
    pub fn len(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.inner.invalidate_all();
    }
}

impl Default for TrajectoryCache {
    fn default() -> Self {
        TrajectoryCache::new(DEFAULT_CACHE_CAPACITY)
    }
}

fn fingerprint(hole: &Hole, method: DesurveyMethod, convention: DipConvention) -> u64 {
    let mut hasher = Xxh3::new();
    hasher.update(method.label().as_bytes());
    hasher.update(&[convention as u8]);
    for coord in [hole.collar.x, hole.collar.y, hole.collar.z] {
        hasher.update(&coord.to_le_bytes());
    }
    for station in &hole.stations {
        hasher.update(&station.depth.to_le_bytes());
        hasher.update(&station.azimuth.to_le_bytes());
        hasher.update(&station.dip.to_le_bytes());
    }
    match hole.total_depth {
        Some(depth) => hasher.update(&depth.to_le_bytes()),
        None => hasher.update(b"open"),
    }
    hasher.digest()
}
