//! Constructed-entity cache
//!
//! Keyed by (authority, code, requested type) and protected by a mutex so
//! concurrent resolutions against one registry context can share it. A
//! single construction never re-enters its own population: values are
//! inserted only after construction completes, and the lock is held only
//! for a get or an insert, never across a build.

use graticule_core::{CoordinateOperation, Crs};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Requested-type tag of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CachedKind {
    Crs,
    Operation,
}

type Key = (String, String, CachedKind);

#[derive(Default)]
struct Slots {
    crs: HashMap<Key, Arc<Crs>>,
    operations: HashMap<Key, Arc<CoordinateOperation>>,
}

/// Shared cache of constructed entities.
#[derive(Default)]
pub struct EntityCache {
    slots: Mutex<Slots>,
    capacity: usize,
}

impl EntityCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Mutex::default(),
            capacity,
        }
    }

    pub fn get_crs(&self, authority: &str, code: &str) -> Option<Arc<Crs>> {
        let slots = self.slots.lock();
        let hit = slots
            .crs
            .get(&(authority.to_string(), code.to_string(), CachedKind::Crs))
            .cloned();
        if hit.is_some() {
            trace!(authority, code, "CRS cache hit");
        }
        hit
    }

    pub fn put_crs(&self, authority: &str, code: &str, crs: Arc<Crs>) {
        let mut slots = self.slots.lock();
        if self.capacity > 0 && slots.crs.len() >= self.capacity {
            slots.crs.clear();
        }
        slots.crs.insert(
            (authority.to_string(), code.to_string(), CachedKind::Crs),
            crs,
        );
    }

    pub fn get_operation(
        &self,
        authority: &str,
        code: &str,
    ) -> Option<Arc<CoordinateOperation>> {
        let slots = self.slots.lock();
        let hit = slots
            .operations
            .get(&(
                authority.to_string(),
                code.to_string(),
                CachedKind::Operation,
            ))
            .cloned();
        if hit.is_some() {
            trace!(authority, code, "operation cache hit");
        }
        hit
    }

    pub fn put_operation(
        &self,
        authority: &str,
        code: &str,
        operation: Arc<CoordinateOperation>,
    ) {
        let mut slots = self.slots.lock();
        if self.capacity > 0 && slots.operations.len() >= self.capacity {
            slots.operations.clear();
        }
        slots.operations.insert(
            (
                authority.to_string(),
                code.to_string(),
                CachedKind::Operation,
            ),
            operation,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graticule_core::{CoordinateSystem, Crs, CrsCommon, ObjectIdentity};
    use graticule_core::{Datum, DatumCommon, DatumOrEnsemble, GeodeticDatum};
    use graticule_core::{Ellipsoid, EllipsoidFigure, PrimeMeridian};

    fn sample_crs() -> Arc<Crs> {
        Arc::new(
            Crs::geographic(
                CrsCommon::new(ObjectIdentity::new("EPSG", "4326", "WGS 84")),
                DatumOrEnsemble::Datum(Datum::Geodetic(GeodeticDatum {
                    common: DatumCommon::new(ObjectIdentity::new(
                        "EPSG",
                        "6326",
                        "World Geodetic System 1984",
                    )),
                    ellipsoid: Ellipsoid::new(
                        ObjectIdentity::new("EPSG", "7030", "WGS 84"),
                        6378137.0,
                        EllipsoidFigure::InverseFlattening(298.257223563),
                        "Earth",
                    )
                    .unwrap(),
                    prime_meridian: PrimeMeridian::greenwich(),
                })),
                CoordinateSystem::ellipsoidal_2d_lat_lon(),
            )
            .unwrap(),
        )
    }

    #[test]
    fn put_then_get() {
        let cache = EntityCache::new(4);
        assert!(cache.get_crs("EPSG", "4326").is_none());
        cache.put_crs("EPSG", "4326", sample_crs());
        assert!(cache.get_crs("EPSG", "4326").is_some());
        // Different authority, same code: distinct entry.
        assert!(cache.get_crs("OTHER", "4326").is_none());
    }

    #[test]
    fn eviction_clears_when_full() {
        let cache = EntityCache::new(1);
        cache.put_crs("EPSG", "4326", sample_crs());
        cache.put_crs("EPSG", "4979", sample_crs());
        // First entry was evicted by the clear-on-full policy.
        assert!(cache.get_crs("EPSG", "4326").is_none());
        assert!(cache.get_crs("EPSG", "4979").is_some());
    }
}
