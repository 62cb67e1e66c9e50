//! Operation resolution between two CRS
//!
//! Three pure phases over the registry's pair queries: direct lookup,
//! pivot search, then filtering and ranking. The resolver never touches
//! SQL itself; everything it knows about registered operations comes
//! through [`AuthorityRegistry`]. An empty candidate list is a result,
//! not an error.

use crate::context::{PivotUse, SearchContext, SpatialCriterion};
use crate::error::{ResolveError, ResolveResult};
use graticule_core::operation::method;
use graticule_core::{
    candidate_order, ComparisonCriterion, CoordinateOperation, Crs, ObjectIdentity,
    OperationMethod, SingleKind, SingleOperation,
};
use graticule_registry::AuthorityRegistry;
use tracing::{debug, info};

/// Resolves coordinate operations between CRS pairs.
pub struct OperationResolver {
    registry: AuthorityRegistry,
}

impl OperationResolver {
    pub fn new(registry: AuthorityRegistry) -> Self {
        Self { registry }
    }

    /// All viable operations from `source` to `target`, best first.
    ///
    /// Both CRS must carry a registry identity; the registry is the only
    /// source of transformation knowledge, so an anonymous CRS can at most
    /// get the identity short-circuit or the ballpark fallback.
    pub fn resolve(
        &self,
        source: &Crs,
        target: &Crs,
        context: &SearchContext,
    ) -> ResolveResult<Vec<CoordinateOperation>> {
        if context.allow_identity
            && source.is_equivalent_to(target, ComparisonCriterion::Equivalent)
        {
            debug!(crs = source.name(), "Equivalent CRS, identity short-circuit");
            return Ok(vec![identity_operation(source, target)]);
        }

        let mut candidates = Vec::new();
        if source.identity().is_registered() && target.identity().is_registered() {
            let src = source.identity().key();
            let tgt = target.identity().key();

            candidates = self
                .registry
                .create_from_crs_codes(src, tgt, context.discard_superseded)?;
            debug!(count = candidates.len(), "Direct phase");

            if self.pivot_phase_applies(context, &candidates) {
                let via = self.registry.create_from_crs_codes_with_intermediates(
                    src,
                    tgt,
                    &context.pivot_crs,
                    context.discard_superseded,
                )?;
                debug!(count = via.len(), "Pivot phase");
                candidates.extend(via);
            }
        }

        let mut candidates = dedup_up_to_direction(candidates);
        candidates.retain(|op| self.passes_filters(op, context));
        candidates.sort_by(candidate_order);

        if candidates.is_empty() && context.allow_ballpark {
            if let Some(ballpark) = ballpark_operation(source, target) {
                info!(
                    source = source.name(),
                    target = target.name(),
                    "No registered path, falling back to ballpark"
                );
                candidates.push(ballpark);
            }
        }

        info!(
            source = source.name(),
            target = target.name(),
            count = candidates.len(),
            "Resolution complete"
        );
        Ok(candidates)
    }

    /// The single best operation, or an error when nothing applies.
    pub fn resolve_best(
        &self,
        source: &Crs,
        target: &Crs,
        context: &SearchContext,
    ) -> ResolveResult<CoordinateOperation> {
        self.resolve(source, target, context)?
            .into_iter()
            .next()
            .ok_or_else(|| ResolveError::NoOperationFound {
                source_crs: source.name().to_string(),
                target: target.name().to_string(),
            })
    }

    fn pivot_phase_applies(
        &self,
        context: &SearchContext,
        direct: &[CoordinateOperation],
    ) -> bool {
        match context.pivot_use {
            PivotUse::Always => true,
            PivotUse::Never => false,
            PivotUse::IfNoDirectTransformation => !direct
                .iter()
                .any(|op| !matches!(op, CoordinateOperation::Conversion(_))),
        }
    }

    fn passes_filters(&self, op: &CoordinateOperation, context: &SearchContext) -> bool {
        if let Some(aoi) = &context.area_of_interest {
            let extent = op.extent();
            let ok = match context.spatial_criterion {
                SpatialCriterion::StrictContainment => extent.contains(aoi),
                SpatialCriterion::PartialIntersection => extent.intersects(aoi),
            };
            if !ok {
                return false;
            }
        }
        if let Some(limit) = context.desired_accuracy {
            // Unknown accuracy is kept; only a known-worse bound disqualifies.
            if let Some(a) = op.accuracy() {
                if a > limit {
                    return false;
                }
            }
        }
        true
    }
}

/// Keep the first of every direction-insensitive equivalence class,
/// preserving order (a forward hit and its inversion-marked twin count as
/// one).
fn dedup_up_to_direction(candidates: Vec<CoordinateOperation>) -> Vec<CoordinateOperation> {
    let mut kept: Vec<CoordinateOperation> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if kept
            .iter()
            .any(|k| k.is_equivalent_up_to_direction(&candidate))
        {
            continue;
        }
        kept.push(candidate);
    }
    kept
}

fn identity_operation(source: &Crs, target: &Crs) -> CoordinateOperation {
    CoordinateOperation::Conversion(SingleOperation {
        identity: ObjectIdentity::anonymous(format!(
            "Identity transformation from {} to {}",
            source.name(),
            target.name()
        )),
        kind: SingleKind::Conversion,
        source_crs: Some(Box::new(source.clone())),
        target_crs: Some(Box::new(target.clone())),
        method: OperationMethod::new(ObjectIdentity::anonymous(method::IDENTITY)),
        parameters: Vec::new(),
        accuracy: Some(0.0),
        usages: Vec::new(),
        operation_version: None,
    })
}

/// A datum-shift-less stand-in between two geographic CRS. Unknown
/// accuracy by construction; only ever used when the registry offers
/// nothing.
fn ballpark_operation(source: &Crs, target: &Crs) -> Option<CoordinateOperation> {
    if !(source.is_geographic() && target.is_geographic()) {
        return None;
    }
    Some(CoordinateOperation::Transformation(SingleOperation {
        identity: ObjectIdentity::anonymous(format!(
            "Ballpark geographic offset transformation from {} to {}",
            source.name(),
            target.name()
        )),
        kind: SingleKind::Transformation,
        source_crs: Some(Box::new(source.clone())),
        target_crs: Some(Box::new(target.clone())),
        method: OperationMethod::epsg(
            method::GEOGRAPHIC2D_OFFSETS,
            "Geographic2D offsets",
        ),
        parameters: Vec::new(),
        accuracy: None,
        usages: Vec::new(),
        operation_version: None,
    }))
}
