//! Authority-scoped entity construction from the reference dataset
//!
//! `RegistryContext` owns the store connection, the constructed-entity
//! cache and the insertion-session state; it has an explicit open/dispose
//! lifecycle and is never a process-wide singleton. `AuthorityRegistry` is
//! a cheap authority-scoped view over a shared context; an empty authority
//! string means "any authority".

use crate::cache::EntityCache;
use crate::connection::{RegistryConfig, RegistryPool};
use crate::error::{FactoryError, FactoryResult};
use crate::session::InsertSessions;
use graticule_core::{
    Axis, AxisDirection, CoordinateOperation, CoordinateSystem, Crs, CrsCommon, CsKind,
    Datum, DatumCommon, DatumEnsemble, DatumOrEnsemble, Ellipsoid, EllipsoidFigure,
    EngineeringCrs, EngineeringDatum, Extent, GeodeticDatum, Measure,
    ObjectIdentity, PrimeMeridian, UnitOfMeasure, UnitType, Usage, VerticalCrs,
    VerticalDatum,
};
use graticule_core::traits::CrsDefinitionParser;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Logical object types, with their containment hierarchy flattened into
/// the SQL each one selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    UnitOfMeasure,
    Extent,
    PrimeMeridian,
    Ellipsoid,
    Datum,
    GeodeticDatum,
    VerticalDatum,
    EngineeringDatum,
    DatumEnsemble,
    Crs,
    GeodeticCrs,
    GeographicCrs,
    Geographic2dCrs,
    Geographic3dCrs,
    GeocentricCrs,
    VerticalCrs,
    ProjectedCrs,
    CompoundCrs,
    EngineeringCrs,
    CoordinateOperation,
    Conversion,
    Transformation,
    PointMotionOperation,
    ConcatenatedOperation,
}

/// Result of the untyped `create_object` lookup.
#[derive(Debug, Clone)]
pub enum AuthorityObject {
    Unit(UnitOfMeasure),
    Extent(Extent),
    PrimeMeridian(PrimeMeridian),
    Ellipsoid(Ellipsoid),
    Datum(Datum),
    DatumEnsemble(DatumEnsemble),
    Crs(Arc<Crs>),
    Operation(Arc<CoordinateOperation>),
}

/// Per-construction visited set: bounds dependency recursion and rejects
/// cyclic definitions instead of recursing unboundedly.
#[derive(Default)]
pub(crate) struct ConstructionGuard {
    visiting: Vec<(String, String)>,
}

impl ConstructionGuard {
    pub(crate) fn enter(&mut self, authority: &str, code: &str) -> FactoryResult<()> {
        let key = (authority.to_string(), code.to_string());
        if self.visiting.contains(&key) {
            return Err(FactoryError::RecursiveDefinition {
                authority: authority.to_string(),
                code: code.to_string(),
            });
        }
        self.visiting.push(key);
        Ok(())
    }

    pub(crate) fn leave(&mut self, authority: &str, code: &str) {
        let key = (authority.to_string(), code.to_string());
        if let Some(pos) = self.visiting.iter().rposition(|k| *k == key) {
            self.visiting.remove(pos);
        }
    }
}

/// Owns one reference-dataset connection plus per-context state.
pub struct RegistryContext {
    pool: RegistryPool,
    cache: EntityCache,
    sessions: InsertSessions,
    parser: Option<Arc<dyn CrsDefinitionParser>>,
}

impl RegistryContext {
    pub fn open(config: RegistryConfig) -> FactoryResult<Arc<Self>> {
        let cache_size = config.cache_size;
        Ok(Arc::new(Self {
            pool: RegistryPool::new(config)?,
            cache: EntityCache::new(cache_size),
            sessions: InsertSessions::default(),
            parser: None,
        }))
    }

    /// In-memory context for tests and staging.
    pub fn in_memory() -> FactoryResult<Arc<Self>> {
        Self::open(RegistryConfig::memory())
    }

    /// Open with an injected text-definition parser (external collaborator
    /// for WKT/PROJ-string fragments stored in registry records).
    pub fn open_with_parser(
        config: RegistryConfig,
        parser: Arc<dyn CrsDefinitionParser>,
    ) -> FactoryResult<Arc<Self>> {
        let cache_size = config.cache_size;
        Ok(Arc::new(Self {
            pool: RegistryPool::new(config)?,
            cache: EntityCache::new(cache_size),
            sessions: InsertSessions::default(),
            parser: Some(parser),
        }))
    }

    pub fn pool(&self) -> &RegistryPool {
        &self.pool
    }

    pub(crate) fn cache(&self) -> &EntityCache {
        &self.cache
    }

    /// Insertion-session management for this context.
    pub fn sessions(&self) -> &InsertSessions {
        &self.sessions
    }

    /// View of this context scoped to one authority.
    pub fn authority(self: &Arc<Self>, authority: impl Into<String>) -> AuthorityRegistry {
        AuthorityRegistry {
            ctx: Arc::clone(self),
            authority: authority.into(),
        }
    }

    /// Any-authority view.
    pub fn any_authority(self: &Arc<Self>) -> AuthorityRegistry {
        self.authority("")
    }
}

/// Authority-scoped lookup over a shared registry context.
#[derive(Clone)]
pub struct AuthorityRegistry {
    pub(crate) ctx: Arc<RegistryContext>,
    pub(crate) authority: String,
}

impl AuthorityRegistry {
    pub fn authority_name(&self) -> &str {
        &self.authority
    }

    pub fn context(&self) -> &Arc<RegistryContext> {
        &self.ctx
    }

    fn pool(&self) -> &RegistryPool {
        &self.ctx.pool
    }

    /// Resolve `code` to a concrete (authority, code) pair within this
    /// registry's scope.
    fn scoped(&self, table: &str, code: &str) -> FactoryResult<(String, String)> {
        if !self.authority.is_empty() {
            return Ok((self.authority.clone(), code.to_string()));
        }
        let sql = format!(
            "SELECT auth_name FROM {table} WHERE code = ?1 ORDER BY rowid LIMIT 1"
        );
        let found: Option<String> = self.pool().with_connection(|conn| {
            Ok(conn
                .query_row(&sql, [code], |row| row.get(0))
                .optional()?)
        })?;
        match found {
            Some(auth) => Ok((auth, code.to_string())),
            None => Err(FactoryError::no_such_code(self.authority.clone(), code)),
        }
    }

    // ---- units, extents, meridians, ellipsoids ---------------------------

    pub fn create_unit_of_measure(&self, code: &str) -> FactoryResult<UnitOfMeasure> {
        let (auth, code) = self.scoped("unit_of_measure", code)?;
        self.unit_by(&auth, &code)
    }

    pub(crate) fn unit_by(&self, auth: &str, code: &str) -> FactoryResult<UnitOfMeasure> {
        self.pool().with_connection(|conn| {
            let row = conn
                .query_row(
                    "SELECT name, type, conv_factor, deprecated
                     FROM unit_of_measure WHERE auth_name = ?1 AND code = ?2",
                    params![auth, code],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, Option<f64>>(2)?,
                            row.get::<_, bool>(3)?,
                        ))
                    },
                )
                .optional()?;
            let (name, type_str, factor, deprecated) =
                row.ok_or_else(|| FactoryError::no_such_code(auth, code))?;
            let unit_type = UnitType::parse(&type_str).ok_or_else(|| {
                FactoryError::CorruptRecord {
                    authority: auth.to_string(),
                    code: code.to_string(),
                    detail: format!("unknown unit type '{type_str}'"),
                }
            })?;
            Ok(UnitOfMeasure::new(
                ObjectIdentity::new(auth, code, name).deprecated(deprecated),
                unit_type,
                factor,
            ))
        })
    }

    pub fn create_extent(&self, code: &str) -> FactoryResult<Extent> {
        let (auth, code) = self.scoped("extent", code)?;
        self.extent_by(&auth, &code)
    }

    pub(crate) fn extent_by(&self, auth: &str, code: &str) -> FactoryResult<Extent> {
        self.pool().with_connection(|conn| {
            let row = conn
                .query_row(
                    "SELECT name, west, south, east, north
                     FROM extent WHERE auth_name = ?1 AND code = ?2",
                    params![auth, code],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, Option<f64>>(1)?,
                            row.get::<_, Option<f64>>(2)?,
                            row.get::<_, Option<f64>>(3)?,
                            row.get::<_, Option<f64>>(4)?,
                        ))
                    },
                )
                .optional()?;
            let (name, west, south, east, north) =
                row.ok_or_else(|| FactoryError::no_such_code(auth, code))?;
            let extent = match (west, south, east, north) {
                (Some(w), Some(s), Some(e), Some(n)) => {
                    Extent::new_bbox(w, s, e, n).with_description(name)
                }
                _ => Extent {
                    description: Some(name),
                    bbox: None,
                },
            };
            Ok(extent)
        })
    }

    pub fn create_prime_meridian(&self, code: &str) -> FactoryResult<PrimeMeridian> {
        let (auth, code) = self.scoped("prime_meridian", code)?;
        self.prime_meridian_by(&auth, &code)
    }

    pub(crate) fn prime_meridian_by(
        &self,
        auth: &str,
        code: &str,
    ) -> FactoryResult<PrimeMeridian> {
        let row = self.pool().with_connection(|conn| {
            Ok(conn
                .query_row(
                    "SELECT name, longitude, uom_auth, uom_code, deprecated
                     FROM prime_meridian WHERE auth_name = ?1 AND code = ?2",
                    params![auth, code],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, f64>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, bool>(4)?,
                        ))
                    },
                )
                .optional()?)
        })?;
        let (name, longitude, uom_auth, uom_code, deprecated) =
            row.ok_or_else(|| FactoryError::no_such_code(auth, code))?;
        let unit = self.unit_by(&uom_auth, &uom_code)?;
        Ok(PrimeMeridian::new(
            ObjectIdentity::new(auth, code, name).deprecated(deprecated),
            Measure::new(longitude, unit),
        ))
    }

    pub fn create_ellipsoid(&self, code: &str) -> FactoryResult<Ellipsoid> {
        let (auth, code) = self.scoped("ellipsoid", code)?;
        self.ellipsoid_by(&auth, &code)
    }

    pub(crate) fn ellipsoid_by(&self, auth: &str, code: &str) -> FactoryResult<Ellipsoid> {
        let row = self.pool().with_connection(|conn| {
            Ok(conn
                .query_row(
                    "SELECT name, body_auth, body_code, semi_major_axis,
                            uom_auth, uom_code, inv_flattening, semi_minor_axis, deprecated
                     FROM ellipsoid WHERE auth_name = ?1 AND code = ?2",
                    params![auth, code],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, Option<String>>(1)?,
                            row.get::<_, Option<String>>(2)?,
                            row.get::<_, f64>(3)?,
                            row.get::<_, String>(4)?,
                            row.get::<_, String>(5)?,
                            row.get::<_, Option<f64>>(6)?,
                            row.get::<_, Option<f64>>(7)?,
                            row.get::<_, bool>(8)?,
                        ))
                    },
                )
                .optional()?)
        })?;
        let (name, body_auth, body_code, a, uom_auth, uom_code, rf, b, deprecated) =
            row.ok_or_else(|| FactoryError::no_such_code(auth, code))?;
        let unit = self.unit_by(&uom_auth, &uom_code)?;
        let to_metres = unit.to_si.ok_or_else(|| FactoryError::CorruptRecord {
            authority: auth.to_string(),
            code: code.to_string(),
            detail: "ellipsoid axis unit has no linear factor".to_string(),
        })?;
        let figure = match (rf, b) {
            (Some(rf), _) => EllipsoidFigure::InverseFlattening(rf),
            (None, Some(b)) => EllipsoidFigure::SemiMinorAxis(b * to_metres),
            (None, None) => EllipsoidFigure::Sphere,
        };
        let body = match (body_auth, body_code) {
            (Some(ba), Some(bc)) => self.pool().with_connection(|conn| {
                Ok(conn
                    .query_row(
                        "SELECT name FROM celestial_body WHERE auth_name = ?1 AND code = ?2",
                        params![ba, bc],
                        |row| row.get::<_, String>(0),
                    )
                    .optional()?
                    .unwrap_or_else(|| "Earth".to_string()))
            })?,
            _ => "Earth".to_string(),
        };
        Ok(Ellipsoid::new(
            ObjectIdentity::new(auth, code, name).deprecated(deprecated),
            a * to_metres,
            figure,
            body,
        )?)
    }

    // ---- datums and ensembles ---------------------------------------------

    pub fn create_geodetic_datum(&self, code: &str) -> FactoryResult<Datum> {
        let (auth, code) = self.scoped("geodetic_datum", code)?;
        self.geodetic_datum_by(&auth, &code)
    }

    pub(crate) fn geodetic_datum_by(&self, auth: &str, code: &str) -> FactoryResult<Datum> {
        let row = self.pool().with_connection(|conn| {
            Ok(conn
                .query_row(
                    "SELECT name, anchor, anchor_epoch, publication_date,
                            frame_reference_epoch, ellipsoid_auth, ellipsoid_code,
                            prime_meridian_auth, prime_meridian_code, deprecated
                     FROM geodetic_datum WHERE auth_name = ?1 AND code = ?2",
                    params![auth, code],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, Option<String>>(1)?,
                            row.get::<_, Option<f64>>(2)?,
                            row.get::<_, Option<String>>(3)?,
                            row.get::<_, Option<f64>>(4)?,
                            row.get::<_, String>(5)?,
                            row.get::<_, String>(6)?,
                            row.get::<_, String>(7)?,
                            row.get::<_, String>(8)?,
                            row.get::<_, bool>(9)?,
                        ))
                    },
                )
                .optional()?)
        })?;
        let (name, anchor, anchor_epoch, publication_date, frame_epoch, ea, ec, pa, pc, dep) =
            row.ok_or_else(|| FactoryError::no_such_code(auth, code))?;
        let ellipsoid = self.ellipsoid_by(&ea, &ec)?;
        let prime_meridian = self.prime_meridian_by(&pa, &pc)?;
        Ok(Datum::Geodetic(GeodeticDatum {
            common: DatumCommon {
                identity: ObjectIdentity::new(auth, code, name).deprecated(dep),
                anchor,
                anchor_epoch,
                publication_date,
                frame_reference_epoch: frame_epoch,
            },
            ellipsoid,
            prime_meridian,
        }))
    }

    pub fn create_vertical_datum(&self, code: &str) -> FactoryResult<Datum> {
        let (auth, code) = self.scoped("vertical_datum", code)?;
        self.vertical_datum_by(&auth, &code)
    }

    pub(crate) fn vertical_datum_by(&self, auth: &str, code: &str) -> FactoryResult<Datum> {
        let row = self.pool().with_connection(|conn| {
            Ok(conn
                .query_row(
                    "SELECT name, anchor, anchor_epoch, publication_date,
                            frame_reference_epoch, deprecated
                     FROM vertical_datum WHERE auth_name = ?1 AND code = ?2",
                    params![auth, code],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, Option<String>>(1)?,
                            row.get::<_, Option<f64>>(2)?,
                            row.get::<_, Option<String>>(3)?,
                            row.get::<_, Option<f64>>(4)?,
                            row.get::<_, bool>(5)?,
                        ))
                    },
                )
                .optional()?)
        })?;
        let (name, anchor, anchor_epoch, publication_date, frame_epoch, dep) =
            row.ok_or_else(|| FactoryError::no_such_code(auth, code))?;
        Ok(Datum::Vertical(VerticalDatum {
            common: DatumCommon {
                identity: ObjectIdentity::new(auth, code, name).deprecated(dep),
                anchor,
                anchor_epoch,
                publication_date,
                frame_reference_epoch: frame_epoch,
            },
        }))
    }

    pub(crate) fn engineering_datum_by(
        &self,
        auth: &str,
        code: &str,
    ) -> FactoryResult<Datum> {
        let row = self.pool().with_connection(|conn| {
            Ok(conn
                .query_row(
                    "SELECT name, anchor, deprecated
                     FROM engineering_datum WHERE auth_name = ?1 AND code = ?2",
                    params![auth, code],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, Option<String>>(1)?,
                            row.get::<_, bool>(2)?,
                        ))
                    },
                )
                .optional()?)
        })?;
        let (name, anchor, dep) =
            row.ok_or_else(|| FactoryError::no_such_code(auth, code))?;
        Ok(Datum::Engineering(EngineeringDatum {
            common: DatumCommon {
                identity: ObjectIdentity::new(auth, code, name).deprecated(dep),
                anchor,
                ..Default::default()
            },
        }))
    }

    /// Datum of any family by code.
    pub fn create_datum(&self, code: &str) -> FactoryResult<Datum> {
        for create in [
            Self::create_geodetic_datum,
            Self::create_vertical_datum,
        ] {
            match create(self, code) {
                Ok(datum) => return Ok(datum),
                Err(e) if e.is_no_such_code() => continue,
                Err(e) => return Err(e),
            }
        }
        let (auth, code) = self.scoped("engineering_datum", code)?;
        self.engineering_datum_by(&auth, &code)
    }

    pub fn create_datum_ensemble(&self, code: &str) -> FactoryResult<DatumEnsemble> {
        let (auth, code) = self.scoped("datum_ensemble", code)?;
        self.datum_ensemble_by(&auth, &code)
    }

    pub(crate) fn datum_ensemble_by(
        &self,
        auth: &str,
        code: &str,
    ) -> FactoryResult<DatumEnsemble> {
        let row = self.pool().with_connection(|conn| {
            Ok(conn
                .query_row(
                    "SELECT name, family, accuracy, deprecated
                     FROM datum_ensemble WHERE auth_name = ?1 AND code = ?2",
                    params![auth, code],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, f64>(2)?,
                            row.get::<_, bool>(3)?,
                        ))
                    },
                )
                .optional()?)
        })?;
        let (name, family, accuracy, dep) =
            row.ok_or_else(|| FactoryError::no_such_code(auth, code))?;

        let member_keys: Vec<(String, String)> = self.pool().with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT member_auth, member_code FROM datum_ensemble_member
                 WHERE ensemble_auth = ?1 AND ensemble_code = ?2 ORDER BY sequence",
            )?;
            let rows = stmt
                .query_map(params![auth, code], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        let mut members = Vec::with_capacity(member_keys.len());
        for (ma, mc) in member_keys {
            let member = match family.as_str() {
                "geodetic" => self.geodetic_datum_by(&ma, &mc)?,
                "vertical" => self.vertical_datum_by(&ma, &mc)?,
                other => {
                    return Err(FactoryError::CorruptRecord {
                        authority: auth.to_string(),
                        code: code.to_string(),
                        detail: format!("unknown ensemble family '{other}'"),
                    });
                }
            };
            members.push(member);
        }

        let extent = self
            .usages_for("datum_ensemble", &auth, &code)?
            .into_iter()
            .map(|u| u.extent)
            .next()
            .unwrap_or_else(Extent::world);

        Ok(DatumEnsemble::new(
            ObjectIdentity::new(auth, code, name).deprecated(dep),
            members,
            accuracy,
            extent,
        )?)
    }

    // ---- coordinate systems -----------------------------------------------

    pub fn create_coordinate_system(&self, code: &str) -> FactoryResult<CoordinateSystem> {
        let (auth, code) = self.scoped("coordinate_system", code)?;
        self.coordinate_system_by(&auth, &code)
    }

    pub(crate) fn coordinate_system_by(
        &self,
        auth: &str,
        code: &str,
    ) -> FactoryResult<CoordinateSystem> {
        let row = self.pool().with_connection(|conn| {
            Ok(conn
                .query_row(
                    "SELECT type, dimension FROM coordinate_system
                     WHERE auth_name = ?1 AND code = ?2",
                    params![auth, code],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
                )
                .optional()?)
        })?;
        let (type_str, dimension) =
            row.ok_or_else(|| FactoryError::no_such_code(auth, code))?;
        let kind = CsKind::parse(&type_str).ok_or_else(|| FactoryError::CorruptRecord {
            authority: auth.to_string(),
            code: code.to_string(),
            detail: format!("unknown coordinate system type '{type_str}'"),
        })?;

        let axis_rows: Vec<(String, String, String, String, String)> =
            self.pool().with_connection(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name, abbrev, orientation, uom_auth, uom_code
                     FROM axis WHERE cs_auth = ?1 AND cs_code = ?2
                     ORDER BY coordinate_order",
                )?;
                let rows = stmt
                    .query_map(params![auth, code], |row| {
                        Ok((
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })?;

        if axis_rows.len() != dimension as usize {
            return Err(FactoryError::CorruptRecord {
                authority: auth.to_string(),
                code: code.to_string(),
                detail: format!(
                    "coordinate system declares {dimension} axes but has {}",
                    axis_rows.len()
                ),
            });
        }

        let mut axes = Vec::with_capacity(axis_rows.len());
        for (name, abbrev, orientation, ua, uc) in axis_rows {
            let unit = self.unit_by(&ua, &uc)?;
            axes.push(Axis::new(
                name,
                abbrev,
                AxisDirection::parse(&orientation),
                unit,
            ));
        }

        Ok(CoordinateSystem::new(
            ObjectIdentity::new(auth, code, format!("CS {code}")),
            kind,
            axes,
        )?)
    }

    // ---- usages ------------------------------------------------------------

    /// Scope/extent usages attached to one object.
    pub(crate) fn usages_for(
        &self,
        object_table: &str,
        auth: &str,
        code: &str,
    ) -> FactoryResult<Vec<Usage>> {
        let rows: Vec<(String, Option<f64>, Option<f64>, Option<f64>, Option<f64>, Option<String>)> =
            self.pool().with_connection(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT e.name, e.west, e.south, e.east, e.north, s.text
                     FROM usage u
                     JOIN extent e ON e.auth_name = u.extent_auth AND e.code = u.extent_code
                     LEFT JOIN scope s ON s.auth_name = u.scope_auth AND s.code = u.scope_code
                     WHERE u.object_table = ?1 AND u.object_auth = ?2 AND u.object_code = ?3
                     ORDER BY u.rowid",
                )?;
                let rows = stmt
                    .query_map(params![object_table, auth, code], |row| {
                        Ok((
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                            row.get(5)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })?;

        Ok(rows
            .into_iter()
            .map(|(name, west, south, east, north, scope)| {
                let extent = match (west, south, east, north) {
                    (Some(w), Some(s), Some(e), Some(n)) => {
                        Extent::new_bbox(w, s, e, n).with_description(name)
                    }
                    _ => Extent {
                        description: Some(name),
                        bbox: None,
                    },
                };
                Usage::new(scope, extent)
            })
            .collect())
    }

    // ---- CRS ----------------------------------------------------------------

    pub fn create_geodetic_crs(&self, code: &str) -> FactoryResult<Arc<Crs>> {
        let (auth, code) = self.scoped("geodetic_crs", code)?;
        let mut guard = ConstructionGuard::default();
        self.geodetic_crs_by(&auth, &code, &mut guard)
    }

    pub(crate) fn geodetic_crs_by(
        &self,
        auth: &str,
        code: &str,
        guard: &mut ConstructionGuard,
    ) -> FactoryResult<Arc<Crs>> {
        if let Some(hit) = self.ctx.cache.get_crs(auth, code) {
            if matches!(*hit, Crs::Geographic(_) | Crs::Geocentric(_)) {
                return Ok(hit);
            }
        }
        guard.enter(auth, code)?;
        let result = self.build_geodetic_crs(auth, code, guard);
        guard.leave(auth, code);
        let crs = Arc::new(result?);
        self.ctx.cache.put_crs(auth, code, Arc::clone(&crs));
        Ok(crs)
    }

    fn build_geodetic_crs(
        &self,
        auth: &str,
        code: &str,
        _guard: &mut ConstructionGuard,
    ) -> FactoryResult<Crs> {
        let row = self.pool().with_connection(|conn| {
            Ok(conn
                .query_row(
                    "SELECT name, type, cs_auth, cs_code, datum_auth, datum_code,
                            ensemble_auth, ensemble_code, text_definition, deprecated
                     FROM geodetic_crs WHERE auth_name = ?1 AND code = ?2",
                    params![auth, code],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, Option<String>>(2)?,
                            row.get::<_, Option<String>>(3)?,
                            row.get::<_, Option<String>>(4)?,
                            row.get::<_, Option<String>>(5)?,
                            row.get::<_, Option<String>>(6)?,
                            row.get::<_, Option<String>>(7)?,
                            row.get::<_, Option<String>>(8)?,
                            row.get::<_, bool>(9)?,
                        ))
                    },
                )
                .optional()?)
        })?;
        let (name, type_str, cs_auth, cs_code, da, dc, ea, ec, text, dep) =
            row.ok_or_else(|| FactoryError::no_such_code(auth, code))?;

        if let Some(text) = text {
            // User-defined CRS stored as a WKT/PROJ-string fragment.
            let parser = self.ctx.parser.as_ref().ok_or_else(|| {
                FactoryError::TextDefinition(format!(
                    "{auth}:{code} has a text definition but no parser is injected"
                ))
            })?;
            debug!(auth, code, "Realizing CRS from text definition");
            return parser
                .parse_crs(&text)
                .map_err(|e| FactoryError::TextDefinition(e.to_string()));
        }

        let (cs_auth, cs_code) = match (cs_auth, cs_code) {
            (Some(a), Some(c)) => (a, c),
            _ => {
                return Err(FactoryError::CorruptRecord {
                    authority: auth.to_string(),
                    code: code.to_string(),
                    detail: "geodetic CRS lacks both coordinate system and text definition"
                        .to_string(),
                });
            }
        };
        let cs = self.coordinate_system_by(&cs_auth, &cs_code)?;
        let datum = self.datum_or_ensemble(auth, code, da, dc, ea, ec, "geodetic")?;
        let usages = self.usages_for("geodetic_crs", auth, code)?;
        let common = CrsCommon::new(ObjectIdentity::new(auth, code, name).deprecated(dep))
            .with_usages(usages);

        let crs = match type_str.as_str() {
            "geocentric" => Crs::geocentric(common, datum, cs)?,
            "geographic 2D" | "geographic 3D" => Crs::geographic(common, datum, cs)?,
            other => {
                return Err(FactoryError::CorruptRecord {
                    authority: auth.to_string(),
                    code: code.to_string(),
                    detail: format!("unknown geodetic CRS type '{other}'"),
                });
            }
        };
        Ok(crs)
    }

    fn datum_or_ensemble(
        &self,
        auth: &str,
        code: &str,
        datum_auth: Option<String>,
        datum_code: Option<String>,
        ensemble_auth: Option<String>,
        ensemble_code: Option<String>,
        family: &str,
    ) -> FactoryResult<DatumOrEnsemble> {
        match (datum_auth, datum_code, ensemble_auth, ensemble_code) {
            (Some(da), Some(dc), None, None) => {
                let datum = match family {
                    "geodetic" => self.geodetic_datum_by(&da, &dc)?,
                    "vertical" => self.vertical_datum_by(&da, &dc)?,
                    _ => self.engineering_datum_by(&da, &dc)?,
                };
                Ok(DatumOrEnsemble::Datum(datum))
            }
            (None, None, Some(ea), Some(ec)) => Ok(DatumOrEnsemble::Ensemble(
                self.datum_ensemble_by(&ea, &ec)?,
            )),
            _ => Err(FactoryError::CorruptRecord {
                authority: auth.to_string(),
                code: code.to_string(),
                detail: "CRS must reference exactly one of datum / datum ensemble"
                    .to_string(),
            }),
        }
    }

    pub fn create_vertical_crs(&self, code: &str) -> FactoryResult<Arc<Crs>> {
        let (auth, code) = self.scoped("vertical_crs", code)?;
        self.vertical_crs_by(&auth, &code)
    }

    pub(crate) fn vertical_crs_by(&self, auth: &str, code: &str) -> FactoryResult<Arc<Crs>> {
        if let Some(hit) = self.ctx.cache.get_crs(auth, code) {
            if matches!(*hit, Crs::Vertical(_)) {
                return Ok(hit);
            }
        }
        let row = self.pool().with_connection(|conn| {
            Ok(conn
                .query_row(
                    "SELECT name, cs_auth, cs_code, datum_auth, datum_code,
                            ensemble_auth, ensemble_code, deprecated
                     FROM vertical_crs WHERE auth_name = ?1 AND code = ?2",
                    params![auth, code],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, Option<String>>(3)?,
                            row.get::<_, Option<String>>(4)?,
                            row.get::<_, Option<String>>(5)?,
                            row.get::<_, Option<String>>(6)?,
                            row.get::<_, bool>(7)?,
                        ))
                    },
                )
                .optional()?)
        })?;
        let (name, cs_auth, cs_code, da, dc, ea, ec, dep) =
            row.ok_or_else(|| FactoryError::no_such_code(auth, code))?;
        let cs = self.coordinate_system_by(&cs_auth, &cs_code)?;
        let datum = self.datum_or_ensemble(auth, code, da, dc, ea, ec, "vertical")?;
        let usages = self.usages_for("vertical_crs", auth, code)?;
        let crs = Arc::new(Crs::Vertical(VerticalCrs {
            common: CrsCommon::new(ObjectIdentity::new(auth, code, name).deprecated(dep))
                .with_usages(usages),
            datum,
            coordinate_system: cs,
        }));
        self.ctx.cache.put_crs(auth, code, Arc::clone(&crs));
        Ok(crs)
    }

    pub(crate) fn engineering_crs_by(
        &self,
        auth: &str,
        code: &str,
    ) -> FactoryResult<Arc<Crs>> {
        let row = self.pool().with_connection(|conn| {
            Ok(conn
                .query_row(
                    "SELECT name, cs_auth, cs_code, datum_auth, datum_code, deprecated
                     FROM engineering_crs WHERE auth_name = ?1 AND code = ?2",
                    params![auth, code],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, String>(4)?,
                            row.get::<_, bool>(5)?,
                        ))
                    },
                )
                .optional()?)
        })?;
        let (name, cs_auth, cs_code, da, dc, dep) =
            row.ok_or_else(|| FactoryError::no_such_code(auth, code))?;
        let cs = self.coordinate_system_by(&cs_auth, &cs_code)?;
        let datum = self.engineering_datum_by(&da, &dc)?;
        let usages = self.usages_for("engineering_crs", auth, code)?;
        Ok(Arc::new(Crs::Engineering(EngineeringCrs {
            common: CrsCommon::new(ObjectIdentity::new(auth, code, name).deprecated(dep))
                .with_usages(usages),
            datum: DatumOrEnsemble::Datum(datum),
            coordinate_system: cs,
        })))
    }

    pub fn create_projected_crs(&self, code: &str) -> FactoryResult<Arc<Crs>> {
        let (auth, code) = self.scoped("projected_crs", code)?;
        let mut guard = ConstructionGuard::default();
        self.projected_crs_by(&auth, &code, &mut guard)
    }

    pub(crate) fn projected_crs_by(
        &self,
        auth: &str,
        code: &str,
        guard: &mut ConstructionGuard,
    ) -> FactoryResult<Arc<Crs>> {
        if let Some(hit) = self.ctx.cache.get_crs(auth, code) {
            if matches!(*hit, Crs::Projected(_)) {
                return Ok(hit);
            }
        }
        guard.enter(auth, code)?;
        let result = self.build_projected_crs(auth, code, guard);
        guard.leave(auth, code);
        let crs = Arc::new(result?);
        self.ctx.cache.put_crs(auth, code, Arc::clone(&crs));
        Ok(crs)
    }

    fn build_projected_crs(
        &self,
        auth: &str,
        code: &str,
        guard: &mut ConstructionGuard,
    ) -> FactoryResult<Crs> {
        let row = self.pool().with_connection(|conn| {
            Ok(conn
                .query_row(
                    "SELECT name, cs_auth, cs_code, base_crs_auth, base_crs_code,
                            conversion_auth, conversion_code, text_definition, deprecated
                     FROM projected_crs WHERE auth_name = ?1 AND code = ?2",
                    params![auth, code],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, String>(4)?,
                            row.get::<_, String>(5)?,
                            row.get::<_, String>(6)?,
                            row.get::<_, Option<String>>(7)?,
                            row.get::<_, bool>(8)?,
                        ))
                    },
                )
                .optional()?)
        })?;
        let (name, cs_auth, cs_code, ba, bc, ca, cc, text, dep) =
            row.ok_or_else(|| FactoryError::no_such_code(auth, code))?;

        if let Some(text) = text {
            let parser = self.ctx.parser.as_ref().ok_or_else(|| {
                FactoryError::TextDefinition(format!(
                    "{auth}:{code} has a text definition but no parser is injected"
                ))
            })?;
            return parser
                .parse_crs(&text)
                .map_err(|e| FactoryError::TextDefinition(e.to_string()));
        }

        let base = self.geodetic_crs_by(&ba, &bc, guard)?;
        let cs = self.coordinate_system_by(&cs_auth, &cs_code)?;
        let conversion = self.single_operation_by(&ca, &cc)?;
        let usages = self.usages_for("projected_crs", auth, code)?;

        // The deriving conversion keeps its source as the base CRS and no
        // target: embedding the projected CRS itself would create a cyclic
        // owning reference.
        let mut conversion = conversion;
        conversion.source_crs = Some(Box::new((*base).clone()));
        conversion.target_crs = None;

        Ok(Crs::Projected(graticule_core::ProjectedCrs {
            common: CrsCommon::new(ObjectIdentity::new(auth, code, name).deprecated(dep))
                .with_usages(usages),
            base: Box::new((*base).clone()),
            conversion,
            coordinate_system: cs,
        }))
    }

    pub fn create_compound_crs(&self, code: &str) -> FactoryResult<Arc<Crs>> {
        let (auth, code) = self.scoped("compound_crs", code)?;
        let mut guard = ConstructionGuard::default();
        self.compound_crs_by(&auth, &code, &mut guard)
    }

    pub(crate) fn compound_crs_by(
        &self,
        auth: &str,
        code: &str,
        guard: &mut ConstructionGuard,
    ) -> FactoryResult<Arc<Crs>> {
        if let Some(hit) = self.ctx.cache.get_crs(auth, code) {
            if matches!(*hit, Crs::Compound(_)) {
                return Ok(hit);
            }
        }
        guard.enter(auth, code)?;
        let result = self.build_compound_crs(auth, code, guard);
        guard.leave(auth, code);
        let crs = Arc::new(result?);
        self.ctx.cache.put_crs(auth, code, Arc::clone(&crs));
        Ok(crs)
    }

    fn build_compound_crs(
        &self,
        auth: &str,
        code: &str,
        guard: &mut ConstructionGuard,
    ) -> FactoryResult<Crs> {
        let row = self.pool().with_connection(|conn| {
            Ok(conn
                .query_row(
                    "SELECT name, horiz_crs_auth, horiz_crs_code,
                            vertical_crs_auth, vertical_crs_code, deprecated
                     FROM compound_crs WHERE auth_name = ?1 AND code = ?2",
                    params![auth, code],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, String>(4)?,
                            row.get::<_, bool>(5)?,
                        ))
                    },
                )
                .optional()?)
        })?;
        let (name, ha, hc, va, vc, dep) =
            row.ok_or_else(|| FactoryError::no_such_code(auth, code))?;
        let horizontal = self.crs_by(&ha, &hc, guard)?;
        let vertical = self.crs_by(&va, &vc, guard)?;
        let usages = self.usages_for("compound_crs", auth, code)?;
        Ok(Crs::compound(
            CrsCommon::new(ObjectIdentity::new(auth, code, name).deprecated(dep))
                .with_usages(usages),
            vec![(*horizontal).clone(), (*vertical).clone()],
        )?)
    }

    /// CRS of any kind by code.
    pub fn create_crs(&self, code: &str) -> FactoryResult<Arc<Crs>> {
        let mut guard = ConstructionGuard::default();
        if self.authority.is_empty() {
            for table in [
                "geodetic_crs",
                "vertical_crs",
                "projected_crs",
                "compound_crs",
                "engineering_crs",
            ] {
                match self.scoped(table, code) {
                    Ok((auth, code)) => return self.crs_by_table(table, &auth, &code, &mut guard),
                    Err(e) if e.is_no_such_code() => continue,
                    Err(e) => return Err(e),
                }
            }
            return Err(FactoryError::no_such_code("", code));
        }
        self.crs_by(&self.authority.clone(), code, &mut guard)
    }

    pub(crate) fn crs_by(
        &self,
        auth: &str,
        code: &str,
        guard: &mut ConstructionGuard,
    ) -> FactoryResult<Arc<Crs>> {
        for table in [
            "geodetic_crs",
            "vertical_crs",
            "projected_crs",
            "compound_crs",
            "engineering_crs",
        ] {
            if self.row_exists(table, auth, code)? {
                return self.crs_by_table(table, auth, code, guard);
            }
        }
        Err(FactoryError::no_such_code(auth, code))
    }

    fn crs_by_table(
        &self,
        table: &str,
        auth: &str,
        code: &str,
        guard: &mut ConstructionGuard,
    ) -> FactoryResult<Arc<Crs>> {
        match table {
            "geodetic_crs" => self.geodetic_crs_by(auth, code, guard),
            "vertical_crs" => self.vertical_crs_by(auth, code),
            "projected_crs" => self.projected_crs_by(auth, code, guard),
            "compound_crs" => self.compound_crs_by(auth, code, guard),
            "engineering_crs" => self.engineering_crs_by(auth, code),
            _ => Err(FactoryError::no_such_code(auth, code)),
        }
    }

    pub(crate) fn row_exists(
        &self,
        table: &str,
        auth: &str,
        code: &str,
    ) -> FactoryResult<bool> {
        let sql =
            format!("SELECT 1 FROM {table} WHERE auth_name = ?1 AND code = ?2 LIMIT 1");
        self.pool().with_connection(|conn| {
            Ok(conn
                .query_row(&sql, params![auth, code], |_| Ok(()))
                .optional()?
                .is_some())
        })
    }

    // ---- untyped lookup and code enumeration --------------------------------

    /// Try every known table until one matches.
    pub fn create_object(&self, code: &str) -> FactoryResult<AuthorityObject> {
        if let Ok(u) = self.create_unit_of_measure(code) {
            return Ok(AuthorityObject::Unit(u));
        }
        if let Ok(e) = self.create_extent(code) {
            return Ok(AuthorityObject::Extent(e));
        }
        if let Ok(p) = self.create_prime_meridian(code) {
            return Ok(AuthorityObject::PrimeMeridian(p));
        }
        if let Ok(e) = self.create_ellipsoid(code) {
            return Ok(AuthorityObject::Ellipsoid(e));
        }
        if let Ok(d) = self.create_datum(code) {
            return Ok(AuthorityObject::Datum(d));
        }
        if let Ok(e) = self.create_datum_ensemble(code) {
            return Ok(AuthorityObject::DatumEnsemble(e));
        }
        if let Ok(c) = self.create_crs(code) {
            return Ok(AuthorityObject::Crs(c));
        }
        if let Ok(op) = self.create_coordinate_operation(code, true) {
            return Ok(AuthorityObject::Operation(op));
        }
        Err(FactoryError::no_such_code(self.authority.clone(), code))
    }

    /// Code set for one logical type, honoring the type hierarchy.
    pub fn get_authority_codes(
        &self,
        object_type: ObjectType,
        include_deprecated: bool,
    ) -> FactoryResult<BTreeSet<String>> {
        let selects: Vec<String> = match object_type {
            ObjectType::UnitOfMeasure => vec![table_select("unit_of_measure", None)],
            ObjectType::Extent => vec![table_select("extent", None)],
            ObjectType::PrimeMeridian => vec![table_select("prime_meridian", None)],
            ObjectType::Ellipsoid => vec![table_select("ellipsoid", None)],
            ObjectType::GeodeticDatum => vec![table_select("geodetic_datum", None)],
            ObjectType::VerticalDatum => vec![table_select("vertical_datum", None)],
            ObjectType::EngineeringDatum => vec![table_select("engineering_datum", None)],
            ObjectType::DatumEnsemble => vec![table_select("datum_ensemble", None)],
            ObjectType::Datum => vec![
                table_select("geodetic_datum", None),
                table_select("vertical_datum", None),
                table_select("engineering_datum", None),
                table_select("datum_ensemble", None),
            ],
            ObjectType::Geographic2dCrs => {
                vec![table_select("geodetic_crs", Some("type = 'geographic 2D'"))]
            }
            ObjectType::Geographic3dCrs => {
                vec![table_select("geodetic_crs", Some("type = 'geographic 3D'"))]
            }
            ObjectType::GeographicCrs => {
                vec![table_select("geodetic_crs", Some("type LIKE 'geographic%'"))]
            }
            ObjectType::GeocentricCrs => {
                vec![table_select("geodetic_crs", Some("type = 'geocentric'"))]
            }
            ObjectType::GeodeticCrs => vec![table_select("geodetic_crs", None)],
            ObjectType::VerticalCrs => vec![table_select("vertical_crs", None)],
            ObjectType::ProjectedCrs => vec![table_select("projected_crs", None)],
            ObjectType::CompoundCrs => vec![table_select("compound_crs", None)],
            ObjectType::EngineeringCrs => vec![table_select("engineering_crs", None)],
            ObjectType::Crs => vec![
                table_select("geodetic_crs", None),
                table_select("vertical_crs", None),
                table_select("projected_crs", None),
                table_select("compound_crs", None),
                table_select("engineering_crs", None),
            ],
            ObjectType::Conversion => {
                vec![table_select("coordinate_operation", Some("type = 'conversion'"))]
            }
            ObjectType::Transformation => vec![table_select(
                "coordinate_operation",
                Some("type = 'transformation'"),
            )],
            ObjectType::PointMotionOperation => vec![table_select(
                "coordinate_operation",
                Some("type = 'point_motion_operation'"),
            )],
            ObjectType::ConcatenatedOperation => vec![table_select(
                "coordinate_operation",
                Some("type = 'concatenated_operation'"),
            )],
            ObjectType::CoordinateOperation => {
                vec![table_select("coordinate_operation", None)]
            }
        };

        let mut codes = BTreeSet::new();
        self.pool().with_connection(|conn| {
            for select in &selects {
                self.collect_codes(conn, select, include_deprecated, &mut codes)?;
            }
            Ok(())
        })?;
        Ok(codes)
    }

    fn collect_codes(
        &self,
        conn: &Connection,
        base_select: &str,
        include_deprecated: bool,
        out: &mut BTreeSet<String>,
    ) -> FactoryResult<()> {
        let mut sql = base_select.to_string();
        if !include_deprecated {
            sql.push_str(" AND deprecated = 0");
        }
        if !self.authority.is_empty() {
            sql.push_str(" AND auth_name = :auth");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(
                rusqlite::named_params! { ":auth": self.authority },
                |row| row.get::<_, String>(0),
            )?;
            for code in rows {
                out.insert(code?);
            }
        } else {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            for code in rows {
                out.insert(code?);
            }
        }
        Ok(())
    }
}

fn table_select(table: &str, filter: Option<&str>) -> String {
    match filter {
        Some(f) => format!("SELECT code FROM {table} WHERE {f}"),
        None => format!("SELECT code FROM {table} WHERE 1=1"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::populate_fake_registry;
    use graticule_core::ComparisonCriterion;

    fn epsg() -> AuthorityRegistry {
        let ctx = RegistryContext::in_memory().expect("in-memory context");
        populate_fake_registry(ctx.pool()).expect("fixture");
        ctx.authority("EPSG")
    }

    #[test]
    fn unknown_code_is_the_distinguished_miss() {
        let registry = epsg();
        let err = registry.create_crs("999999").unwrap_err();
        assert!(err.is_no_such_code());
        let err = registry.create_unit_of_measure("999999").unwrap_err();
        assert!(err.is_no_such_code());
    }

    #[test]
    fn unit_lookup() {
        let registry = epsg();
        let metre = registry.create_unit_of_measure("9001").unwrap();
        assert_eq!(metre.unit_type, UnitType::Linear);
        assert_eq!(metre.to_si, Some(1.0));
        // The sexagesimal pseudo-unit has no plain ratio.
        let dms = registry.create_unit_of_measure("9110").unwrap();
        assert!(dms.to_si.is_none());
    }

    #[test]
    fn ellipsoid_and_prime_meridian() {
        let registry = epsg();
        let wgs84 = registry.create_ellipsoid("7030").unwrap();
        assert_eq!(wgs84.semi_major_axis, 6378137.0);
        assert!((wgs84.inverse_flattening().unwrap() - 298.257223563).abs() < 1e-9);

        let ferro = registry.create_prime_meridian("8909").unwrap();
        // -17.40 sexagesimal DMS is -17°40'
        assert!((ferro.longitude.to_degrees() + 17.6666666666667).abs() < 1e-10);
    }

    #[test]
    fn datum_ensemble_members_in_sequence() {
        let registry = epsg();
        let ensemble = registry.create_datum_ensemble("6326").unwrap();
        assert_eq!(ensemble.members.len(), 2);
        assert_eq!(ensemble.accuracy, 2.0);
        assert_eq!(ensemble.members[0].identity().code, "1155");
        // Representative is the newest non-deprecated member.
        assert_eq!(ensemble.as_datum(None).identity().code, "1166");
    }

    #[test]
    fn geographic_crs_with_usages() {
        let registry = epsg();
        let wgs84 = registry.create_geodetic_crs("4326").unwrap();
        assert!(wgs84.is_geographic());
        assert_eq!(wgs84.name(), "WGS 84");
        assert_eq!(wgs84.dimension(), 2);
        assert!(wgs84.extent().is_world());

        // Second lookup is served by the cache (same Arc).
        let again = registry.create_geodetic_crs("4326").unwrap();
        assert!(Arc::ptr_eq(&wgs84, &again));
    }

    #[test]
    fn projected_crs_embeds_base_and_conversion() {
        let registry = epsg();
        let utm = registry.create_projected_crs("32631").unwrap();
        let Crs::Projected(p) = &*utm else {
            panic!("expected projected CRS");
        };
        assert_eq!(p.base.identity().code, "4326");
        assert_eq!(p.conversion.method.code(), "9807");
        assert_eq!(p.conversion.parameters.len(), 5);
        // The deriving conversion knows its base but not the projected CRS.
        assert!(p.conversion.source_crs.is_some());
        assert!(p.conversion.target_crs.is_none());
        // 6-degree strip, not world.
        assert_eq!(utm.extent().surface_area_deg2(), Some(6.0 * 84.0));
    }

    #[test]
    fn vertical_engineering_and_compound() {
        let registry = epsg();
        let nzvd = registry.create_vertical_crs("7839").unwrap();
        assert_eq!(nzvd.kind_name(), "vertical");
        assert_eq!(nzvd.dimension(), 1);

        let compound = registry.create_compound_crs("9518").unwrap();
        assert_eq!(compound.dimension(), 3);

        let crs = registry.create_crs("9316").unwrap();
        assert_eq!(crs.kind_name(), "engineering");
    }

    #[test]
    fn untyped_lookup_dispatches_on_table() {
        let registry = epsg();
        assert!(matches!(
            registry.create_object("9001").unwrap(),
            AuthorityObject::Unit(_)
        ));
        assert!(matches!(
            registry.create_object("7030").unwrap(),
            AuthorityObject::Ellipsoid(_)
        ));
        assert!(matches!(
            registry.create_object("4326").unwrap(),
            AuthorityObject::Crs(_)
        ));
        assert!(matches!(
            registry.create_object("1884").unwrap(),
            AuthorityObject::Operation(_)
        ));
    }

    #[test]
    fn code_enumeration_honours_hierarchy_and_deprecation() {
        let registry = epsg();
        let geographic = registry
            .get_authority_codes(ObjectType::GeographicCrs, true)
            .unwrap();
        assert!(geographic.contains("4326"));
        assert!(!geographic.contains("4978"));

        let geodetic = registry
            .get_authority_codes(ObjectType::GeodeticCrs, true)
            .unwrap();
        assert!(geodetic.contains("4978"));

        let all_crs = registry.get_authority_codes(ObjectType::Crs, true).unwrap();
        assert!(all_crs.contains("32631"));
        assert!(all_crs.contains("7839"));
        assert!(all_crs.contains("9518"));

        let live_ops = registry
            .get_authority_codes(ObjectType::CoordinateOperation, false)
            .unwrap();
        assert!(live_ops.contains("15994"));
        assert!(!live_ops.contains("1644"));
        let with_deprecated = registry
            .get_authority_codes(ObjectType::CoordinateOperation, true)
            .unwrap();
        assert!(with_deprecated.contains("1644"));
    }

    #[test]
    fn any_authority_resolves_across_namespaces() {
        let ctx = RegistryContext::in_memory().unwrap();
        populate_fake_registry(ctx.pool()).unwrap();
        let any = ctx.any_authority();
        let wgs84 = any.create_crs("4326").unwrap();
        assert_eq!(wgs84.identity().authority, "EPSG");
    }

    #[test]
    fn equivalent_crs_from_two_builds() {
        let registry = epsg();
        let a = registry.create_geodetic_crs("4326").unwrap();
        // A context of its own, so nothing is shared through the cache.
        let other = epsg();
        let b = other.create_geodetic_crs("4326").unwrap();
        assert!(a.is_equivalent_to(&b, ComparisonCriterion::Equivalent));
    }
}
