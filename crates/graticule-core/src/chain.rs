//! Concatenation chaining fix-up and candidate ranking
//!
//! Whenever a path has two or more steps (registry-declared concatenation
//! records or pivot-synthesized pairs) consecutive steps must chain on a
//! literal CRS, not merely a compatible one. This module orients each
//! member (algebraic inversion where the method allows it, an explicit
//! invert marker where it does not), synthesizes implicit
//! geographic<->geocentric conversion steps, and handles endpoint-specific
//! inversion without ever flipping the whole chain.

use crate::compare::ComparisonCriterion;
use crate::crs::Crs;
use crate::error::{GeodeticError, GeodeticResult};
use crate::extent::Extent;
use crate::identifier::ObjectIdentity;
use crate::operation::{
    method, ConcatenatedOperation, CoordinateOperation, OperationMethod, OperationStep,
    SingleKind, SingleOperation,
};
use std::cmp::Ordering;
use tracing::debug;

const EQ: ComparisonCriterion = ComparisonCriterion::Equivalent;

/// Orient `members` into a chain from `overall_source` to `overall_target`
/// and build the concatenated operation.
///
/// Members whose registered direction is reversed relative to the chain are
/// algebraically inverted when their method supports it; concatenations and
/// map-projection conversions are wrapped with an invert marker instead.
/// A geographic<->geocentric hole between adjacent members is filled with a
/// synthesized conversion so that every adjacent pair shares a literal CRS.
pub fn link_concatenation(
    identity: ObjectIdentity,
    members: Vec<CoordinateOperation>,
    overall_source: Option<&Crs>,
    overall_target: Option<&Crs>,
) -> GeodeticResult<ConcatenatedOperation> {
    if members.len() < 2 {
        return Err(GeodeticError::InvalidConcatenation(format!(
            "concatenation needs at least 2 members, got {}",
            members.len()
        )));
    }

    let mut steps: Vec<OperationStep> = Vec::with_capacity(members.len());
    let mut cursor: Option<Crs> = overall_source.cloned();

    let total = members.len();
    for (i, member) in members.into_iter().enumerate() {
        let member_name = member.identity().name.clone();
        let (src, tgt) = match (member.source_crs(), member.target_crs()) {
            (Some(s), Some(t)) => (s.clone(), t.clone()),
            _ => {
                return Err(GeodeticError::InvalidConcatenation(format!(
                    "member '{}' lacks source/target CRS",
                    member.identity().name
                )));
            }
        };

        let want = match &cursor {
            Some(c) => c.clone(),
            // No overall source requested: take the first member as-is.
            None => src.clone(),
        };

        let step = if src.is_equivalent_to(&want, EQ) {
            OperationStep::forward(member)
        } else if tgt.is_equivalent_to(&want, EQ) {
            debug!(member = %member_name, "Orienting member against its registered direction");
            orient_inverted(member)
        } else if i + 1 == total
            && overall_target
                .map(|t| src.is_equivalent_to(t, EQ))
                .unwrap_or(false)
        {
            // Last member reversed relative to the requested overall
            // direction; invert that member specifically.
            debug!(member = %member_name, "Inverting final member to match requested direction");
            let step = orient_inverted(member);
            bridge_if_needed(&mut steps, &want, &step)?;
            step
        } else {
            // Neither end matches directly; a geographic<->geocentric hole
            // may separate this member from the chain cursor.
            let step = if crosses_geog_geocentric(&want, &src) {
                OperationStep::forward(member)
            } else if crosses_geog_geocentric(&want, &tgt) {
                orient_inverted(member)
            } else {
                return Err(GeodeticError::InvalidConcatenation(format!(
                    "member '{}' does not chain at '{}'",
                    member_name,
                    want.name()
                )));
            };
            bridge_if_needed(&mut steps, &want, &step)?;
            step
        };

        cursor = step.effective_target().cloned();
        steps.push(step);
    }

    if let (Some(end), Some(want)) = (&cursor, overall_target) {
        if !end.is_equivalent_to(want, EQ) {
            if crosses_geog_geocentric(end, want) {
                debug!(
                    from = end.name(),
                    to = want.name(),
                    "Appending geographic/geocentric conversion to close the chain"
                );
                steps.push(OperationStep::forward(geographic_geocentric_conversion(
                    end, want,
                )));
            } else {
                return Err(GeodeticError::InvalidConcatenation(format!(
                    "chain ends at '{}' instead of '{}'",
                    end.name(),
                    want.name()
                )));
            }
        }
    }

    ConcatenatedOperation::new(identity, steps)
}

/// Invert one member for chaining: algebraic inverse where the method
/// allows it, an explicit marker for concatenations, map projections and
/// grid-based methods.
fn orient_inverted(member: CoordinateOperation) -> OperationStep {
    let algebraic = member
        .as_single()
        .filter(|s| !s.method.is_map_projection())
        .and_then(SingleOperation::algebraic_inverse);
    match algebraic {
        Some(inv) => OperationStep::forward(CoordinateOperation::from_single(inv)),
        None => OperationStep::inverted(member),
    }
}

/// True when the two CRS are a geographic/geocentric pair over an
/// equivalent datum: the gap an implicit conversion can close.
fn crosses_geog_geocentric(a: &Crs, b: &Crs) -> bool {
    let pair = (a.is_geographic() && b.is_geocentric())
        || (a.is_geocentric() && b.is_geographic());
    if !pair {
        return false;
    }
    match (a.datum_or_ensemble(), b.datum_or_ensemble()) {
        (Some(da), Some(db)) => da.is_equivalent_to(db, EQ),
        _ => false,
    }
}

/// Insert a synthesized geographic<->geocentric conversion when the next
/// step does not start at the chain cursor.
fn bridge_if_needed(
    steps: &mut Vec<OperationStep>,
    cursor: &Crs,
    next: &OperationStep,
) -> GeodeticResult<()> {
    let next_source = next.effective_source().ok_or_else(|| {
        GeodeticError::InvalidConcatenation("step lacks a source CRS".to_string())
    })?;
    if cursor.is_equivalent_to(next_source, EQ) {
        return Ok(());
    }
    if !crosses_geog_geocentric(cursor, next_source) {
        return Err(GeodeticError::InvalidConcatenation(format!(
            "no implicit conversion from '{}' to '{}'",
            cursor.name(),
            next_source.name()
        )));
    }
    debug!(
        from = cursor.name(),
        to = next_source.name(),
        "Synthesizing geographic/geocentric bridge step"
    );
    steps.push(OperationStep::forward(geographic_geocentric_conversion(
        cursor,
        next_source,
    )));
    Ok(())
}

/// The implicit conversion between a geographic CRS and the geocentric CRS
/// sharing its datum.
pub fn geographic_geocentric_conversion(from: &Crs, to: &Crs) -> CoordinateOperation {
    let name = format!(
        "Conversion from {} ({}) to {} ({})",
        from.name(),
        if from.is_geocentric() {
            "geocentric"
        } else {
            "geog2D"
        },
        to.name(),
        if to.is_geocentric() {
            "geocentric"
        } else {
            "geog2D"
        },
    );
    CoordinateOperation::Conversion(SingleOperation {
        identity: ObjectIdentity::anonymous(name),
        kind: SingleKind::Conversion,
        source_crs: Some(Box::new(from.clone())),
        target_crs: Some(Box::new(to.clone())),
        method: OperationMethod::epsg(
            method::GEOGRAPHIC_GEOCENTRIC,
            "Geographic/geocentric conversions",
        ),
        parameters: Vec::new(),
        accuracy: Some(0.0),
        usages: Vec::new(),
        operation_version: None,
    })
}

/// Ranking key: (a) non-deprecated first, (b) smaller area of use first
/// with world extents last, (c) better accuracy first with unknown/zero
/// accuracy worst. Callers use a stable sort so registry insertion order
/// remains the final tie-break.
pub fn candidate_order(a: &CoordinateOperation, b: &CoordinateOperation) -> Ordering {
    fn area_rank(e: &Extent) -> f64 {
        e.surface_area_deg2().unwrap_or(f64::INFINITY)
    }
    a.is_deprecated()
        .cmp(&b.is_deprecated())
        .then_with(|| {
            area_rank(&a.extent())
                .partial_cmp(&area_rank(&b.extent()))
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| {
            a.ranking_accuracy()
                .partial_cmp(&b.ranking_accuracy())
                .unwrap_or(Ordering::Equal)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate_system::CoordinateSystem;
    use crate::crs::CrsCommon;
    use crate::datum::{Datum, DatumCommon, DatumOrEnsemble, GeodeticDatum};
    use crate::ellipsoid::{Ellipsoid, EllipsoidFigure};
    use crate::extent::Usage;
    use crate::operation::parameter;
    use crate::prime_meridian::PrimeMeridian;
    use crate::units::{Measure, UnitOfMeasure};

    fn datum(code: &str, name: &str) -> DatumOrEnsemble {
        DatumOrEnsemble::Datum(Datum::Geodetic(GeodeticDatum {
            common: DatumCommon::new(ObjectIdentity::new("TEST", code, name)),
            ellipsoid: Ellipsoid::new(
                ObjectIdentity::new("EPSG", "7030", "WGS 84"),
                6378137.0,
                EllipsoidFigure::InverseFlattening(298.257223563),
                "Earth",
            )
            .unwrap(),
            prime_meridian: PrimeMeridian::greenwich(),
        }))
    }

    fn geographic(code: &str, name: &str) -> Crs {
        Crs::geographic(
            CrsCommon::new(ObjectIdentity::new("TEST", code, name)),
            datum(code, name),
            CoordinateSystem::ellipsoidal_2d_lat_lon(),
        )
        .unwrap()
    }

    fn geocentric_sibling(of: &Crs) -> Crs {
        Crs::geocentric(
            CrsCommon::new(ObjectIdentity::anonymous(format!(
                "{} (geocentric)",
                of.name()
            ))),
            of.datum_or_ensemble().unwrap().clone(),
            CoordinateSystem::cartesian_3d_geocentric(),
        )
        .unwrap()
    }

    fn offset_transformation(code: &str, from: &Crs, to: &Crs, dlon: f64) -> CoordinateOperation {
        CoordinateOperation::Transformation(SingleOperation {
            identity: ObjectIdentity::new("TEST", code, format!("{code} shift")),
            kind: SingleKind::Transformation,
            source_crs: Some(Box::new(from.clone())),
            target_crs: Some(Box::new(to.clone())),
            method: OperationMethod::epsg(method::LONGITUDE_ROTATION, "Longitude rotation"),
            parameters: vec![crate::operation::OperationParameter::measure(
                "Longitude offset",
                parameter::LONGITUDE_OFFSET,
                Measure::new(dlon, UnitOfMeasure::degree()),
            )],
            accuracy: Some(1.0),
            usages: Vec::new(),
            operation_version: None,
        })
    }

    #[test]
    fn chains_forward_members() {
        let a = geographic("A", "A");
        let p = geographic("P", "P");
        let b = geographic("B", "B");
        let conc = link_concatenation(
            ObjectIdentity::anonymous("A to B"),
            vec![
                offset_transformation("1", &a, &p, 1.0),
                offset_transformation("2", &p, &b, 2.0),
            ],
            Some(&a),
            Some(&b),
        )
        .unwrap();
        assert_eq!(conc.steps.len(), 2);
        assert!(conc.steps.iter().all(|s| !s.inverted));
    }

    #[test]
    fn inverts_reversed_internal_member_algebraically() {
        let a = geographic("A", "A");
        let p = geographic("P", "P");
        let b = geographic("B", "B");
        // Second leg registered as B -> P, needs inversion.
        let conc = link_concatenation(
            ObjectIdentity::anonymous("A to B"),
            vec![
                offset_transformation("1", &a, &p, 1.0),
                offset_transformation("2", &b, &p, 2.0),
            ],
            Some(&a),
            Some(&b),
        )
        .unwrap();
        assert_eq!(conc.steps.len(), 2);
        // Offset family inverts algebraically, no opaque marker.
        assert!(!conc.steps[1].inverted);
        let inv = conc.steps[1].operation.as_single().unwrap();
        let m = inv
            .parameter(parameter::LONGITUDE_OFFSET)
            .and_then(|p| p.as_measure())
            .unwrap();
        assert_eq!(m.value, -2.0);
    }

    #[test]
    fn synthesizes_geographic_geocentric_bridge() {
        let a = geographic("A", "A");
        let a_geocentric = geocentric_sibling(&a);
        let b = geographic("B", "B");
        let b_geoc = geocentric_sibling(&b);

        // Member 2 operates in geocentric space over the same datum as A.
        let leg1 = offset_transformation("1", &a, &a, 0.5);
        let mut cart = offset_transformation("2", &a_geocentric, &b_geoc, 1.0);
        if let CoordinateOperation::Transformation(s) = &mut cart {
            s.source_crs = Some(Box::new(a_geocentric.clone()));
        }
        let leg3 = offset_transformation("3", &b, &b, 0.25);

        let conc = link_concatenation(
            ObjectIdentity::anonymous("A to B via geocentric"),
            vec![leg1, cart, leg3],
            Some(&a),
            Some(&b),
        )
        .unwrap();
        // Two synthesized conversions inserted around the geocentric leg.
        assert_eq!(conc.steps.len(), 5);
        let method_codes: Vec<&str> = conc
            .steps
            .iter()
            .filter_map(|s| s.operation.as_single())
            .map(|s| s.method.code())
            .collect();
        assert_eq!(
            method_codes
                .iter()
                .filter(|c| **c == method::GEOGRAPHIC_GEOCENTRIC)
                .count(),
            2
        );
    }

    #[test]
    fn ranking_prefers_specific_area_then_accuracy() {
        let a = geographic("A", "A");
        let b = geographic("B", "B");
        let mut world = offset_transformation("W", &a, &b, 1.0);
        let mut strip = offset_transformation("S", &a, &b, 1.0);
        let mut strip_bad_acc = offset_transformation("S2", &a, &b, 1.0);
        let world_usage = Usage::new(None, Extent::world());
        let strip_usage = Usage::new(None, Extent::new_bbox(0.0, 0.0, 6.0, 84.0));
        if let CoordinateOperation::Transformation(s) = &mut world {
            s.usages = vec![world_usage];
            s.accuracy = Some(0.1);
        }
        if let CoordinateOperation::Transformation(s) = &mut strip {
            s.usages = vec![strip_usage.clone()];
            s.accuracy = Some(1.0);
        }
        if let CoordinateOperation::Transformation(s) = &mut strip_bad_acc {
            s.usages = vec![strip_usage];
            s.accuracy = None;
        }

        let mut candidates = vec![world.clone(), strip_bad_acc.clone(), strip.clone()];
        candidates.sort_by(candidate_order);
        // Strip beats world regardless of accuracy; unknown accuracy last
        // within the same area rank.
        assert_eq!(candidates[0].identity().code, "S");
        assert_eq!(candidates[1].identity().code, "S2");
        assert_eq!(candidates[2].identity().code, "W");
    }

    #[test]
    fn deprecated_sorts_after_live() {
        let a = geographic("A", "A");
        let b = geographic("B", "B");
        let live = offset_transformation("L", &a, &b, 1.0);
        let mut dead = offset_transformation("D", &a, &b, 1.0);
        if let CoordinateOperation::Transformation(s) = &mut dead {
            s.identity.deprecated = true;
            s.accuracy = Some(0.001);
        }
        let mut candidates = vec![dead, live];
        candidates.sort_by(candidate_order);
        assert_eq!(candidates[0].identity().code, "L");
    }
}
