//! Operation construction and CRS-pair queries
//!
//! Two layers: code-addressed construction of single and concatenated
//! operations, and the pair-addressed lookups the resolver builds on:
//! registered operations between two CRS codes (both directions, plus
//! conversions derived from projected CRS records) and pivot search via
//! explicit or discovered intermediate CRS.

use crate::error::{FactoryError, FactoryResult};
use crate::factory::{AuthorityRegistry, ConstructionGuard};
use graticule_core::{
    candidate_order, link_concatenation, CoordinateOperation, Crs, ObjectIdentity,
    OperationMethod, OperationParameter, SingleKind, SingleOperation,
};
use graticule_core::units::Measure;
use rusqlite::{params, OptionalExtension};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// A pair-query hit, keeping the registry row key so supersession and
/// deprecation filtering survive direction correction (an inverted
/// operation carries an anonymous identity).
struct Candidate {
    key: Option<(String, String)>,
    deprecated: bool,
    operation: CoordinateOperation,
}

impl AuthorityRegistry {
    // ---- code-addressed construction ---------------------------------------

    /// A conversion by code (projection definitions, unit changes).
    pub fn create_conversion(&self, code: &str) -> FactoryResult<SingleOperation> {
        let (auth, code) = self.scoped_operation(code)?;
        let op = self.single_operation_by(&auth, &code)?;
        if op.kind != SingleKind::Conversion {
            return Err(FactoryError::CorruptRecord {
                authority: auth,
                code,
                detail: "operation is not a conversion".to_string(),
            });
        }
        Ok(op)
    }

    /// Any operation by code. With `allow_concatenated` false the lookup is
    /// restricted to single operations and a concatenation record misses.
    pub fn create_coordinate_operation(
        &self,
        code: &str,
        allow_concatenated: bool,
    ) -> FactoryResult<Arc<CoordinateOperation>> {
        let (auth, code) = self.scoped_operation(code)?;
        let mut guard = ConstructionGuard::default();
        self.operation_by(&auth, &code, allow_concatenated, &mut guard)
    }

    fn scoped_operation(&self, code: &str) -> FactoryResult<(String, String)> {
        if !self.authority.is_empty() {
            return Ok((self.authority.clone(), code.to_string()));
        }
        let found: Option<String> = self.context().pool().with_connection(|conn| {
            Ok(conn
                .query_row(
                    "SELECT auth_name FROM coordinate_operation
                     WHERE code = ?1 ORDER BY rowid LIMIT 1",
                    [code],
                    |row| row.get(0),
                )
                .optional()?)
        })?;
        match found {
            Some(auth) => Ok((auth, code.to_string())),
            None => Err(FactoryError::no_such_code("", code)),
        }
    }

    pub(crate) fn operation_by(
        &self,
        auth: &str,
        code: &str,
        allow_concatenated: bool,
        guard: &mut ConstructionGuard,
    ) -> FactoryResult<Arc<CoordinateOperation>> {
        if let Some(hit) = self.context().cache().get_operation(auth, code) {
            if allow_concatenated || hit.as_concatenated().is_none() {
                return Ok(hit);
            }
        }
        guard.enter(auth, code)?;
        let result = self.build_operation(auth, code, allow_concatenated, guard);
        guard.leave(auth, code);
        let op = Arc::new(result?);
        self.context().cache().put_operation(auth, code, Arc::clone(&op));
        Ok(op)
    }

    fn build_operation(
        &self,
        auth: &str,
        code: &str,
        allow_concatenated: bool,
        guard: &mut ConstructionGuard,
    ) -> FactoryResult<CoordinateOperation> {
        let type_str: String = self
            .context()
            .pool()
            .with_connection(|conn| {
                Ok(conn
                    .query_row(
                        "SELECT type FROM coordinate_operation
                         WHERE auth_name = ?1 AND code = ?2",
                        params![auth, code],
                        |row| row.get(0),
                    )
                    .optional()?)
            })?
            .ok_or_else(|| FactoryError::no_such_code(auth, code))?;

        if type_str == "concatenated_operation" {
            if !allow_concatenated {
                return Err(FactoryError::no_such_code(auth, code));
            }
            return self.build_concatenated(auth, code, guard);
        }
        let single = self.single_operation_with_guard(auth, code, guard)?;
        Ok(CoordinateOperation::from_single(single))
    }

    pub(crate) fn single_operation_by(
        &self,
        auth: &str,
        code: &str,
    ) -> FactoryResult<SingleOperation> {
        let mut guard = ConstructionGuard::default();
        self.single_operation_with_guard(auth, code, &mut guard)
    }

    fn single_operation_with_guard(
        &self,
        auth: &str,
        code: &str,
        guard: &mut ConstructionGuard,
    ) -> FactoryResult<SingleOperation> {
        type Row = (
            String,
            String,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<f64>,
            Option<String>,
            bool,
        );
        let row: Row = self
            .context()
            .pool()
            .with_connection(|conn| {
                Ok(conn
                    .query_row(
                        "SELECT name, type, method_auth, method_code, method_name,
                                source_crs_auth, source_crs_code,
                                target_crs_auth, target_crs_code,
                                accuracy, operation_version, deprecated
                         FROM coordinate_operation
                         WHERE auth_name = ?1 AND code = ?2",
                        params![auth, code],
                        |row| {
                            Ok((
                                row.get(0)?,
                                row.get(1)?,
                                row.get(2)?,
                                row.get(3)?,
                                row.get(4)?,
                                row.get(5)?,
                                row.get(6)?,
                                row.get(7)?,
                                row.get(8)?,
                                row.get(9)?,
                                row.get(10)?,
                                row.get(11)?,
                            ))
                        },
                    )
                    .optional()?)
            })?
            .ok_or_else(|| FactoryError::no_such_code(auth, code))?;
        let (name, type_str, ma, mc, mn, sa, sc, ta, tc, accuracy, version, deprecated) = row;

        let kind = match type_str.as_str() {
            "conversion" => SingleKind::Conversion,
            "transformation" => SingleKind::Transformation,
            "point_motion_operation" => SingleKind::PointMotion,
            other => {
                return Err(FactoryError::CorruptRecord {
                    authority: auth.to_string(),
                    code: code.to_string(),
                    detail: format!("expected a single operation, got '{other}'"),
                });
            }
        };

        let method = match (ma, mc) {
            (Some(ma), Some(mc)) => OperationMethod::new(
                ObjectIdentity::new(ma, mc, mn.unwrap_or_default()),
            ),
            _ => {
                return Err(FactoryError::CorruptRecord {
                    authority: auth.to_string(),
                    code: code.to_string(),
                    detail: "single operation lacks a method".to_string(),
                });
            }
        };

        let source_crs = match (sa, sc) {
            (Some(a), Some(c)) => Some(Box::new((*self.crs_by(&a, &c, guard)?).clone())),
            _ => None,
        };
        let target_crs = match (ta, tc) {
            (Some(a), Some(c)) => Some(Box::new((*self.crs_by(&a, &c, guard)?).clone())),
            _ => None,
        };

        Ok(SingleOperation {
            identity: ObjectIdentity::new(auth, code, name).deprecated(deprecated),
            kind,
            source_crs,
            target_crs,
            method,
            parameters: self.parameters_for(auth, code)?,
            accuracy,
            usages: self.usages_for("coordinate_operation", auth, code)?,
            operation_version: version,
        })
    }

    fn parameters_for(
        &self,
        auth: &str,
        code: &str,
    ) -> FactoryResult<Vec<OperationParameter>> {
        type Row = (String, String, Option<f64>, Option<String>, Option<String>, Option<String>);
        let rows: Vec<Row> = self.context().pool().with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT name, code, value, uom_auth, uom_code, file_ref
                 FROM operation_parameter
                 WHERE operation_auth = ?1 AND operation_code = ?2
                 ORDER BY sequence",
            )?;
            let rows = stmt
                .query_map(params![auth, code], |row| {
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

        let mut parameters = Vec::with_capacity(rows.len());
        for (name, pcode, value, ua, uc, file_ref) in rows {
            let parameter = match (value, ua, uc, file_ref) {
                (_, _, _, Some(file)) => OperationParameter::file(name, pcode, file),
                (Some(v), Some(ua), Some(uc), None) => {
                    let unit = self.unit_by(&ua, &uc)?;
                    OperationParameter::measure(name, pcode, Measure::new(v, unit))
                }
                _ => {
                    return Err(FactoryError::CorruptRecord {
                        authority: auth.to_string(),
                        code: code.to_string(),
                        detail: format!("parameter {pcode} has neither value nor file"),
                    });
                }
            };
            parameters.push(parameter);
        }
        Ok(parameters)
    }

    fn build_concatenated(
        &self,
        auth: &str,
        code: &str,
        guard: &mut ConstructionGuard,
    ) -> FactoryResult<CoordinateOperation> {
        type Row = (
            String,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<f64>,
            Option<String>,
            bool,
        );
        let row: Row = self
            .context()
            .pool()
            .with_connection(|conn| {
                Ok(conn
                    .query_row(
                        "SELECT name, source_crs_auth, source_crs_code,
                                target_crs_auth, target_crs_code,
                                accuracy, operation_version, deprecated
                         FROM coordinate_operation
                         WHERE auth_name = ?1 AND code = ?2",
                        params![auth, code],
                        |row| {
                            Ok((
                                row.get(0)?,
                                row.get(1)?,
                                row.get(2)?,
                                row.get(3)?,
                                row.get(4)?,
                                row.get(5)?,
                                row.get(6)?,
                                row.get(7)?,
                            ))
                        },
                    )
                    .optional()?)
            })?
            .ok_or_else(|| FactoryError::no_such_code(auth, code))?;
        let (name, sa, sc, ta, tc, accuracy, version, deprecated) = row;

        let step_keys: Vec<(String, String)> = self.context().pool().with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT step_auth, step_code FROM concatenated_operation_step
                 WHERE operation_auth = ?1 AND operation_code = ?2
                 ORDER BY step_number",
            )?;
            let rows = stmt
                .query_map(params![auth, code], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;
        if step_keys.len() < 2 {
            return Err(FactoryError::CorruptRecord {
                authority: auth.to_string(),
                code: code.to_string(),
                detail: format!(
                    "concatenated operation declares {} steps",
                    step_keys.len()
                ),
            });
        }

        let mut members = Vec::with_capacity(step_keys.len());
        for (step_auth, step_code) in &step_keys {
            let member = self.operation_by(step_auth, step_code, true, guard)?;
            members.push((*member).clone());
        }

        let source_crs = match (sa, sc) {
            (Some(a), Some(c)) => Some(self.crs_by(&a, &c, guard)?),
            _ => None,
        };
        let target_crs = match (ta, tc) {
            (Some(a), Some(c)) => Some(self.crs_by(&a, &c, guard)?),
            _ => None,
        };

        debug!(auth, code, steps = step_keys.len(), "Linking concatenated operation");
        let mut conc = link_concatenation(
            ObjectIdentity::new(auth, code, name).deprecated(deprecated),
            members,
            source_crs.as_deref(),
            target_crs.as_deref(),
        )?;
        // The registry's declared accuracy wins over the step-sum estimate.
        if accuracy.is_some() {
            conc.accuracy = accuracy;
        }
        conc.usages = self.usages_for("coordinate_operation", auth, code)?;
        conc.operation_version = version;
        Ok(CoordinateOperation::Concatenated(conc))
    }

    // ---- pair-addressed lookups ---------------------------------------------

    /// Registered operations connecting two CRS codes, both directions,
    /// including conversions derived from projected CRS records. Reverse
    /// hits are direction-corrected. Sorted by rank; empty when nothing
    /// connects the pair.
    pub fn create_from_crs_codes(
        &self,
        source: (&str, &str),
        target: (&str, &str),
        discard_superseded: bool,
    ) -> FactoryResult<Vec<CoordinateOperation>> {
        let mut candidates = Vec::new();

        for (auth, code) in self.operation_rows_between(source, target)? {
            match self.create_coordinate_operation_by(&auth, &code) {
                Ok(op) => candidates.push(Candidate {
                    deprecated: op.is_deprecated(),
                    operation: (*op).clone(),
                    key: Some((auth, code)),
                }),
                Err(e) => warn!(auth, code, error = %e, "Skipping unbuildable operation"),
            }
        }
        for (auth, code) in self.operation_rows_between(target, source)? {
            match self.create_coordinate_operation_by(&auth, &code) {
                Ok(op) => candidates.push(Candidate {
                    deprecated: op.is_deprecated(),
                    operation: op.inverse(),
                    key: Some((auth, code)),
                }),
                Err(e) => warn!(auth, code, error = %e, "Skipping unbuildable operation"),
            }
        }

        // A projected CRS record implies the deriving conversion between its
        // base and itself.
        if let Some(conversion) = self.derived_conversion(source, target)? {
            candidates.push(Candidate {
                key: None,
                deprecated: false,
                operation: conversion,
            });
        }
        if let Some(conversion) = self.derived_conversion(target, source)? {
            candidates.push(Candidate {
                key: None,
                deprecated: false,
                operation: conversion.inverse(),
            });
        }

        if discard_superseded {
            let mut kept = Vec::with_capacity(candidates.len());
            for c in candidates {
                let superseded = match &c.key {
                    Some((a, k)) => c.deprecated && self.is_superseded(a, k)?,
                    None => false,
                };
                if superseded {
                    debug!(key = ?c.key, "Dropping superseded operation");
                } else {
                    kept.push(c);
                }
            }
            candidates = kept;
        }

        candidates.sort_by(|a, b| {
            a.deprecated
                .cmp(&b.deprecated)
                .then_with(|| candidate_order(&a.operation, &b.operation))
        });
        Ok(candidates.into_iter().map(|c| c.operation).collect())
    }

    fn create_coordinate_operation_by(
        &self,
        auth: &str,
        code: &str,
    ) -> FactoryResult<Arc<CoordinateOperation>> {
        let mut guard = ConstructionGuard::default();
        self.operation_by(auth, code, true, &mut guard)
    }

    /// (auth, code) of registered operations from `source` to `target`, in
    /// registry insertion order. Scoped registries only see their own rows.
    fn operation_rows_between(
        &self,
        source: (&str, &str),
        target: (&str, &str),
    ) -> FactoryResult<Vec<(String, String)>> {
        let mut sql = "SELECT auth_name, code FROM coordinate_operation
             WHERE source_crs_auth = ?1 AND source_crs_code = ?2
               AND target_crs_auth = ?3 AND target_crs_code = ?4"
            .to_string();
        if !self.authority.is_empty() {
            sql.push_str(" AND auth_name = ?5");
        }
        sql.push_str(" ORDER BY rowid");
        self.context().pool().with_connection(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mapper = |row: &rusqlite::Row<'_>| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            };
            let rows = if self.authority.is_empty() {
                stmt.query_map(
                    params![source.0, source.1, target.0, target.1],
                    mapper,
                )?
                .collect::<Result<Vec<_>, _>>()?
            } else {
                stmt.query_map(
                    params![source.0, source.1, target.0, target.1, self.authority],
                    mapper,
                )?
                .collect::<Result<Vec<_>, _>>()?
            };
            Ok(rows)
        })
    }

    /// The deriving conversion of `projected`, source/target filled in,
    /// when `projected` is a projected CRS whose base is `base`.
    fn derived_conversion(
        &self,
        base: (&str, &str),
        projected: (&str, &str),
    ) -> FactoryResult<Option<CoordinateOperation>> {
        let base_key: Option<(String, String)> =
            self.context().pool().with_connection(|conn| {
                Ok(conn
                    .query_row(
                        "SELECT base_crs_auth, base_crs_code FROM projected_crs
                         WHERE auth_name = ?1 AND code = ?2",
                        params![projected.0, projected.1],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?)
            })?;
        match base_key {
            Some((ba, bc)) if (ba.as_str(), bc.as_str()) == base => {}
            _ => return Ok(None),
        }

        let mut guard = ConstructionGuard::default();
        let crs = self.projected_crs_by(projected.0, projected.1, &mut guard)?;
        let Crs::Projected(p) = &*crs else {
            return Ok(None);
        };
        let mut conversion = p.conversion.clone();
        conversion.source_crs = Some(p.base.clone());
        conversion.target_crs = Some(Box::new((*crs).clone()));
        Ok(Some(CoordinateOperation::Conversion(conversion)))
    }

    /// Two-leg paths through intermediate CRS. With an empty `pivots` list
    /// the pivot set is discovered: every CRS with registered operations to
    /// both endpoints. A pivot whose legs cannot be chained is skipped, not
    /// an error.
    pub fn create_from_crs_codes_with_intermediates(
        &self,
        source: (&str, &str),
        target: (&str, &str),
        pivots: &[(String, String)],
        discard_superseded: bool,
    ) -> FactoryResult<Vec<CoordinateOperation>> {
        let pivot_keys: Vec<(String, String)> = if pivots.is_empty() {
            let from_source = self.crs_connected_to(source)?;
            let from_target = self.crs_connected_to(target)?;
            from_source
                .intersection(&from_target)
                .filter(|(a, c)| {
                    (a.as_str(), c.as_str()) != source && (a.as_str(), c.as_str()) != target
                })
                .cloned()
                .collect()
        } else {
            pivots.to_vec()
        };

        let mut guard = ConstructionGuard::default();
        let source_crs = self.crs_by(source.0, source.1, &mut guard)?;
        let target_crs = self.crs_by(target.0, target.1, &mut guard)?;

        let mut results = Vec::new();
        for (pa, pc) in &pivot_keys {
            if (pa.as_str(), pc.as_str()) == source || (pa.as_str(), pc.as_str()) == target
            {
                continue;
            }
            let inbound =
                self.create_from_crs_codes(source, (pa, pc), discard_superseded)?;
            if inbound.is_empty() {
                continue;
            }
            let outbound =
                self.create_from_crs_codes((pa, pc), target, discard_superseded)?;
            if outbound.is_empty() {
                continue;
            }
            debug!(
                pivot = %format!("{pa}:{pc}"),
                inbound = inbound.len(),
                outbound = outbound.len(),
                "Composing pivot paths"
            );
            for leg_in in &inbound {
                for leg_out in &outbound {
                    let name = format!(
                        "{} + {}",
                        leg_in.identity().name,
                        leg_out.identity().name
                    );
                    match link_concatenation(
                        ObjectIdentity::anonymous(name),
                        vec![leg_in.clone(), leg_out.clone()],
                        Some(&source_crs),
                        Some(&target_crs),
                    ) {
                        Ok(conc) => results.push(CoordinateOperation::Concatenated(conc)),
                        Err(e) => {
                            // One bad pairing must not abort the pivot search.
                            warn!(pivot = %format!("{pa}:{pc}"), error = %e, "Skipping unchainable pivot pair");
                        }
                    }
                }
            }
        }

        results.sort_by(candidate_order);
        Ok(results)
    }

    /// CRS keys reachable from `crs` by a registered operation in either
    /// direction.
    fn crs_connected_to(
        &self,
        crs: (&str, &str),
    ) -> FactoryResult<BTreeSet<(String, String)>> {
        let scope = if self.authority.is_empty() {
            String::new()
        } else {
            " AND auth_name = ?3".to_string()
        };
        let sql = format!(
            "SELECT target_crs_auth, target_crs_code FROM coordinate_operation
             WHERE source_crs_auth = ?1 AND source_crs_code = ?2
               AND target_crs_auth IS NOT NULL{scope}
             UNION
             SELECT source_crs_auth, source_crs_code FROM coordinate_operation
             WHERE target_crs_auth = ?1 AND target_crs_code = ?2
               AND source_crs_auth IS NOT NULL{scope}"
        );
        self.context().pool().with_connection(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mapper = |row: &rusqlite::Row<'_>| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            };
            let rows = if self.authority.is_empty() {
                stmt.query_map(params![crs.0, crs.1], mapper)?
                    .collect::<Result<BTreeSet<_>, _>>()?
            } else {
                stmt.query_map(params![crs.0, crs.1, self.authority], mapper)?
                    .collect::<Result<BTreeSet<_>, _>>()?
            };
            Ok(rows)
        })
    }

    // ---- supersession ---------------------------------------------------------

    /// Replacement keys registered for one operation.
    pub fn superseded_by(
        &self,
        auth: &str,
        code: &str,
    ) -> FactoryResult<Vec<(String, String)>> {
        self.context().pool().with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT replacement_auth, replacement_code FROM supersession
                 WHERE object_table = 'coordinate_operation'
                   AND superseded_auth = ?1 AND superseded_code = ?2
                   AND same_source_target_crs = 1",
            )?;
            let rows = stmt
                .query_map(params![auth, code], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// True when a non-deprecated replacement connecting the same CRS pair
    /// is registered.
    fn is_superseded(&self, auth: &str, code: &str) -> FactoryResult<bool> {
        for (ra, rc) in self.superseded_by(auth, code)? {
            let live: bool = self.context().pool().with_connection(|conn| {
                Ok(conn
                    .query_row(
                        "SELECT 1 FROM coordinate_operation
                         WHERE auth_name = ?1 AND code = ?2 AND deprecated = 0",
                        params![ra, rc],
                        |_| Ok(()),
                    )
                    .optional()?
                    .is_some())
            })?;
            if live {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use crate::factory::RegistryContext;
    use crate::factory::AuthorityRegistry;
    use crate::test_support::{populate_fake_registry, populate_pivot_fixture};
    use graticule_core::{ComparisonCriterion, CoordinateOperation, SingleKind};
    use graticule_core::operation::parameter;

    fn epsg() -> AuthorityRegistry {
        let ctx = RegistryContext::in_memory().expect("in-memory context");
        populate_fake_registry(ctx.pool()).expect("fixture");
        ctx.authority("EPSG")
    }

    #[test]
    fn conversion_by_code() {
        let registry = epsg();
        let utm31 = registry.create_conversion("16031").unwrap();
        assert_eq!(utm31.kind, SingleKind::Conversion);
        assert_eq!(utm31.method.code(), "9807");
        assert_eq!(utm31.parameters.len(), 5);
        let lon0 = utm31
            .parameter(parameter::LONGITUDE_OF_NATURAL_ORIGIN)
            .and_then(|p| p.as_measure())
            .unwrap();
        assert_eq!(lon0.to_degrees(), 3.0);
        // A transformation code is not a conversion.
        assert!(registry.create_conversion("1884").is_err());
    }

    #[test]
    fn longitude_rotation_with_sexagesimal_offset() {
        let registry = epsg();
        let op = registry.create_coordinate_operation("1884", true).unwrap();
        assert_eq!(op.accuracy(), Some(0.0));
        let single = op.as_single().unwrap();
        assert_eq!(single.method.code(), "9601");
        assert_eq!(single.operation_version.as_deref(), Some("EPSG-Cze"));
        let offset = single
            .parameter(parameter::LONGITUDE_OFFSET)
            .and_then(|p| p.as_measure())
            .unwrap();
        assert!((offset.to_degrees() + 17.6666666666667).abs() < 1e-10);
        assert_eq!(op.source_crs().unwrap().identity().code, "4820");
        assert_eq!(op.target_crs().unwrap().identity().code, "4156");
    }

    #[test]
    fn concatenated_operation_links_declared_steps() {
        let registry = epsg();
        let op = registry.create_coordinate_operation("7987", true).unwrap();
        let conc = op.as_concatenated().expect("concatenated record");
        assert_eq!(conc.steps.len(), 3);
        assert!(conc.steps.iter().all(|s| !s.inverted));
        assert_eq!(op.source_crs().unwrap().identity().code, "7839");
        assert_eq!(op.target_crs().unwrap().identity().code, "7841");
        // Offset step 0.02 m plus two errorless conversions.
        assert_eq!(op.accuracy(), Some(0.02));

        // Restricting to single operations makes the record miss.
        let err = registry
            .create_coordinate_operation("7987", false)
            .unwrap_err();
        assert!(err.is_no_such_code());
    }

    #[test]
    fn projected_crs_record_implies_its_conversion() {
        let registry = epsg();
        let ops = registry
            .create_from_crs_codes(("EPSG", "4326"), ("EPSG", "32631"), false)
            .unwrap();
        assert_eq!(ops.len(), 1);
        let candidate = ops[0].as_single().unwrap();
        assert_eq!(candidate.method.code(), "9807");
        assert_eq!(
            candidate.source_crs.as_ref().unwrap().identity().code,
            "4326"
        );
        assert_eq!(
            candidate.target_crs.as_ref().unwrap().identity().code,
            "32631"
        );
        let registered = registry.create_conversion("16031").unwrap();
        assert!(candidate.is_equivalent_to(&registered, ComparisonCriterion::Equivalent));

        // Projected -> base comes back as an invert marker around the same
        // conversion (a map projection has no parametric inverse).
        let back = registry
            .create_from_crs_codes(("EPSG", "32631"), ("EPSG", "4326"), false)
            .unwrap();
        assert_eq!(back.len(), 1);
        let marker = back[0].as_concatenated().expect("invert marker");
        assert_eq!(marker.steps.len(), 1);
        assert!(marker.steps[0].inverted);
    }

    #[test]
    fn pair_query_is_direction_symmetric() {
        let registry = epsg();
        let forward = registry
            .create_from_crs_codes(("EPSG", "4179"), ("EPSG", "4258"), false)
            .unwrap();
        let reverse = registry
            .create_from_crs_codes(("EPSG", "4258"), ("EPSG", "4179"), false)
            .unwrap();
        assert_eq!(forward.len(), reverse.len());
        for (f, r) in forward.iter().zip(&reverse) {
            assert!(f.is_equivalent_up_to_direction(r));
        }
    }

    #[test]
    fn ranking_prefers_specific_area_and_sinks_deprecated() {
        let registry = epsg();
        let ops = registry
            .create_from_crs_codes(("EPSG", "4179"), ("EPSG", "4258"), false)
            .unwrap();
        assert_eq!(ops.len(), 3);
        // Country extent beats world despite worse accuracy; the deprecated
        // duplicate sorts last.
        assert_eq!(ops[0].identity().code, "15994");
        assert_eq!(ops[1].identity().code, "15993");
        assert_eq!(ops[2].identity().code, "1644");
    }

    #[test]
    fn supersession_filter_drops_deprecated_duplicates() {
        let registry = epsg();
        let ops = registry
            .create_from_crs_codes(("EPSG", "4179"), ("EPSG", "4258"), true)
            .unwrap();
        assert_eq!(ops.len(), 2);
        assert!(ops.iter().all(|op| op.identity().code != "1644"));

        let replacements = registry.superseded_by("EPSG", "1644").unwrap();
        assert_eq!(replacements, vec![("EPSG".to_string(), "15994".to_string())]);
    }

    #[test]
    fn empty_result_is_not_an_error() {
        let registry = epsg();
        let ops = registry
            .create_from_crs_codes(("EPSG", "4326"), ("EPSG", "4156"), false)
            .unwrap();
        assert!(ops.is_empty());
    }

    #[test]
    fn pivot_search_orients_all_four_leg_arrangements() {
        for source_to_pivot in [true, false] {
            for pivot_to_target in [true, false] {
                let ctx = RegistryContext::in_memory().unwrap();
                populate_pivot_fixture(ctx.pool(), source_to_pivot, pivot_to_target)
                    .unwrap();
                let registry = ctx.authority("OTHER");
                let ops = registry
                    .create_from_crs_codes_with_intermediates(
                        ("NS", "SOURCE"),
                        ("NS", "TARGET"),
                        &[],
                        false,
                    )
                    .unwrap();
                assert_eq!(
                    ops.len(),
                    1,
                    "arrangement ({source_to_pivot}, {pivot_to_target})"
                );
                let conc = ops[0].as_concatenated().expect("two-leg path");
                assert_eq!(conc.steps.len(), 2);
                assert_eq!(
                    ops[0].source_crs().unwrap().identity().code,
                    "SOURCE"
                );
                assert_eq!(ops[0].target_crs().unwrap().identity().code, "TARGET");
                // Legs accumulate accuracy.
                assert_eq!(ops[0].accuracy(), Some(3.0));
            }
        }
    }

    #[test]
    fn explicit_pivot_list_restricts_the_search() {
        let ctx = RegistryContext::in_memory().unwrap();
        populate_pivot_fixture(ctx.pool(), true, true).unwrap();
        let registry = ctx.authority("OTHER");
        let via_pivot = registry
            .create_from_crs_codes_with_intermediates(
                ("NS", "SOURCE"),
                ("NS", "TARGET"),
                &[("NS".to_string(), "PIVOT".to_string())],
                false,
            )
            .unwrap();
        assert_eq!(via_pivot.len(), 1);

        let via_unrelated = registry
            .create_from_crs_codes_with_intermediates(
                ("NS", "SOURCE"),
                ("NS", "TARGET"),
                &[("EPSG".to_string(), "4326".to_string())],
                false,
            )
            .unwrap();
        assert!(via_unrelated.is_empty());
    }

    #[test]
    fn inverse_of_concatenation_reverses_steps() {
        let registry = epsg();
        let op = registry.create_coordinate_operation("7987", true).unwrap();
        let inv = op.inverse();
        let conc = inv.as_concatenated().unwrap();
        assert_eq!(conc.steps.len(), 3);
        assert!(conc.steps.iter().all(|s| s.inverted));
        assert_eq!(inv.source_crs().unwrap().identity().code, "7841");
        assert_eq!(inv.target_crs().unwrap().identity().code, "7839");
        // Round trip restores the original shape.
        assert!(matches!(inv.inverse(), CoordinateOperation::Concatenated(_)));
    }

    #[test]
    fn staged_inserts_become_resolvable_after_apply() {
        let ctx = RegistryContext::in_memory().unwrap();
        populate_fake_registry(ctx.pool()).unwrap();
        ctx.sessions().start().unwrap();
        ctx.sessions()
            .add_geographic_crs("MINE", "1", "my CRS", ("EPSG", "6422"), ("EPSG", "6326"))
            .unwrap();
        ctx.sessions()
            .add_transformation(
                "MINE",
                "2",
                "my CRS to WGS 84",
                ("EPSG", "9619", "Geographic2D offsets"),
                ("MINE", "1"),
                ("EPSG", "4326"),
                Some(5.0),
            )
            .unwrap();

        let mine = ctx.authority("MINE");
        // Not applied yet: nothing resolvable.
        assert!(mine.create_crs("1").is_err());

        ctx.sessions().apply(ctx.pool()).unwrap();
        ctx.sessions().close().unwrap();

        let crs = mine.create_crs("1").unwrap();
        assert_eq!(crs.name(), "my CRS");
        let ops = ctx
            .any_authority()
            .create_from_crs_codes(("MINE", "1"), ("EPSG", "4326"), false)
            .unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].accuracy(), Some(5.0));
    }
}
