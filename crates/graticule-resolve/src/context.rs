//! Search context: the caller's constraints on a resolution

use graticule_core::Extent;
use serde::{Deserialize, Serialize};

/// How a candidate's domain of validity must relate to the area of
/// interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpatialCriterion {
    /// The candidate's extent must contain the whole area of interest.
    StrictContainment,
    /// Sharing any area with the area of interest is enough.
    PartialIntersection,
}

/// When the pivot phase runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PivotUse {
    Always,
    Never,
    /// Only when the direct phase found no transformation (derived
    /// conversions alone do not suppress the pivot search).
    IfNoDirectTransformation,
}

/// Constraints on one resolution. The defaults match interactive use:
/// pivots when nothing direct exists, superseded operations dropped,
/// ballpark fallback allowed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchContext {
    /// Worst acceptable accuracy in metres; `None` accepts anything.
    pub desired_accuracy: Option<f64>,
    pub spatial_criterion: SpatialCriterion,
    /// Area the coordinates to transform live in; `None` skips spatial
    /// filtering.
    pub area_of_interest: Option<Extent>,
    pub pivot_use: PivotUse,
    /// Explicit intermediate CRS keys; empty means "discover".
    pub pivot_crs: Vec<(String, String)>,
    pub discard_superseded: bool,
    /// Allow a datum-shift-less fallback when nothing is registered.
    pub allow_ballpark: bool,
    /// Allow the identity short-circuit between equivalent CRS.
    pub allow_identity: bool,
}

impl Default for SearchContext {
    fn default() -> Self {
        Self {
            desired_accuracy: None,
            spatial_criterion: SpatialCriterion::StrictContainment,
            area_of_interest: None,
            pivot_use: PivotUse::IfNoDirectTransformation,
            pivot_crs: Vec::new(),
            discard_superseded: true,
            allow_ballpark: true,
            allow_identity: true,
        }
    }
}

impl SearchContext {
    pub fn with_area_of_interest(mut self, extent: Extent) -> Self {
        self.area_of_interest = Some(extent);
        self
    }

    pub fn with_desired_accuracy(mut self, metres: f64) -> Self {
        self.desired_accuracy = Some(metres);
        self
    }

    pub fn with_pivot_use(mut self, pivot_use: PivotUse) -> Self {
        self.pivot_use = pivot_use;
        self
    }

    pub fn with_pivots(mut self, pivots: Vec<(String, String)>) -> Self {
        self.pivot_crs = pivots;
        self
    }
}
