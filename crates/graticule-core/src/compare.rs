//! Structural equivalence criteria
//!
//! Every entity exposes `is_equivalent_to(other, criterion)`. Comparison is
//! recursive and never panics; it is the only supported notion of "same
//! object" across differently-sourced entities (two authorities, registry
//! vs parsed text).

use serde::{Deserialize, Serialize};

/// How strictly two objects must match to count as equivalent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonCriterion {
    /// All identifiers and metadata must match.
    Strict,
    /// Same geodetic meaning, irrespective of names, identifiers or the
    /// unit a quantity happens to be expressed in.
    Equivalent,
    /// Like `Equivalent`, but coordinate system axis order is ignored.
    EquivalentExceptAxisOrder,
}

impl ComparisonCriterion {
    /// Criterion to apply to sub-objects of a compared pair. Axis-order
    /// leniency applies to the coordinate system of the compared CRS only,
    /// not to nested base CRS.
    pub fn for_nested(self) -> Self {
        match self {
            ComparisonCriterion::EquivalentExceptAxisOrder => {
                ComparisonCriterion::Equivalent
            }
            other => other,
        }
    }

    pub fn ignores_axis_order(self) -> bool {
        self == ComparisonCriterion::EquivalentExceptAxisOrder
    }

    pub fn is_strict(self) -> bool {
        self == ComparisonCriterion::Strict
    }
}

/// Relative tolerance for numeric fields (ellipsoid axes, angles).
pub const REL_TOLERANCE: f64 = 1e-10;

/// Compare two floats within relative tolerance.
pub fn float_eq(a: f64, b: f64) -> bool {
    float_eq_tol(a, b, REL_TOLERANCE)
}

/// Compare two floats within a caller-chosen relative tolerance.
pub fn float_eq_tol(a: f64, b: f64, rel_tol: f64) -> bool {
    if a == b {
        return true;
    }
    if a.is_nan() || b.is_nan() {
        return false;
    }
    let scale = a.abs().max(b.abs());
    (a - b).abs() <= rel_tol * scale.max(1.0)
}

/// Absent optional fields are equal only if both absent.
pub fn option_eq<T, F: Fn(&T, &T) -> bool>(a: &Option<T>, b: &Option<T>, eq: F) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => eq(a, b),
        (None, None) => true,
        _ => false,
    }
}
