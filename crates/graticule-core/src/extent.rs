//! Domains of validity (extents) and scope/extent usages

use crate::compare::{float_eq, ComparisonCriterion};
use serde::{Deserialize, Serialize};

/// Geographic bounding box in degrees, or a purely textual description.
///
/// A "world" extent carries no bbox restriction. Longitudes may wrap across
/// the antimeridian (west > east), in which case the box is split in two for
/// containment and intersection tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub description: Option<String>,
    /// (west, south, east, north) in degrees; `None` for world/unbounded.
    pub bbox: Option<(f64, f64, f64, f64)>,
}

impl Extent {
    /// The unbounded world extent.
    pub fn world() -> Self {
        Self {
            description: Some("World.".to_string()),
            bbox: None,
        }
    }

    pub fn new_bbox(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            description: None,
            bbox: Some((west, south, east, north)),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_world(&self) -> bool {
        self.bbox.is_none()
    }

    /// Approximate surface in square degrees; `None` for world extents.
    ///
    /// Ranking metric for "more specific area first" ordering: a plain
    /// width x height product, no spherical correction.
    pub fn surface_area_deg2(&self) -> Option<f64> {
        let (west, south, east, north) = self.bbox?;
        let width = if east >= west {
            east - west
        } else {
            360.0 - west + east
        };
        Some(width * (north - south))
    }

    /// True when `other` lies entirely inside this extent.
    pub fn contains(&self, other: &Extent) -> bool {
        match (self.bbox, other.bbox) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some((w1, s1, e1, n1)), Some((w2, s2, e2, n2))) => {
                if e1 < w1 || e2 < w2 {
                    // Antimeridian-crossing boxes: compare unwrapped spans.
                    let span =
                        |w: f64, e: f64| if e >= w { (w, e) } else { (w, e + 360.0) };
                    let (aw, ae) = span(w1, e1);
                    let (bw, be) = span(w2, e2);
                    return s1 <= s2 && n1 >= n2 && aw <= bw && ae >= be;
                }
                w1 <= w2 && s1 <= s2 && e1 >= e2 && n1 >= n2
            }
        }
    }

    /// True when the two extents share any area.
    pub fn intersects(&self, other: &Extent) -> bool {
        match (self.bbox, other.bbox) {
            (None, _) | (_, None) => true,
            (Some((w1, s1, e1, n1)), Some((w2, s2, e2, n2))) => {
                if s1 >= n2 || s2 >= n1 {
                    return false;
                }
                if e1 >= w1 && e2 >= w2 {
                    return w1 < e2 && w2 < e1;
                }
                // At least one box wraps; test both unwrapped halves.
                let halves = |w: f64, e: f64| {
                    if e >= w {
                        vec![(w, e)]
                    } else {
                        vec![(w, 180.0), (-180.0, e)]
                    }
                };
                for (aw, ae) in halves(w1, e1) {
                    for (bw, be) in halves(w2, e2) {
                        if aw < be && bw < ae {
                            return true;
                        }
                    }
                }
                false
            }
        }
    }

    pub fn is_equivalent_to(
        &self,
        other: &Self,
        criterion: ComparisonCriterion,
    ) -> bool {
        if criterion.is_strict() && self.description != other.description {
            return false;
        }
        match (self.bbox, other.bbox) {
            (None, None) => true,
            (Some((w1, s1, e1, n1)), Some((w2, s2, e2, n2))) => {
                float_eq(w1, w2) && float_eq(s1, s2) && float_eq(e1, e2) && float_eq(n1, n2)
            }
            _ => false,
        }
    }
}

/// One scope/extent pair attached to a CRS or operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub scope: Option<String>,
    pub extent: Extent,
}

impl Usage {
    pub fn new(scope: Option<String>, extent: Extent) -> Self {
        Self { scope, extent }
    }
}

/// The most specific declared extent of an object, given its usages.
///
/// Objects with no usage at all are treated as valid world-wide.
pub fn effective_extent(usages: &[Usage]) -> Extent {
    usages
        .iter()
        .map(|u| &u.extent)
        .min_by(|a, b| {
            let ka = a.surface_area_deg2().unwrap_or(f64::INFINITY);
            let kb = b.surface_area_deg2().unwrap_or(f64::INFINITY);
            ka.partial_cmp(&kb).unwrap_or(std::cmp::Ordering::Equal)
        })
        .cloned()
        .unwrap_or_else(Extent::world)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_contains_everything() {
        let world = Extent::world();
        let strip = Extent::new_bbox(0.0, 0.0, 6.0, 84.0);
        assert!(world.contains(&strip));
        assert!(!strip.contains(&world));
        assert!(world.intersects(&strip));
        assert_eq!(world.surface_area_deg2(), None);
    }

    #[test]
    fn strip_area() {
        let strip = Extent::new_bbox(0.0, 0.0, 6.0, 84.0);
        assert_eq!(strip.surface_area_deg2(), Some(6.0 * 84.0));
    }

    #[test]
    fn disjoint_boxes_do_not_intersect() {
        let a = Extent::new_bbox(0.0, 0.0, 6.0, 84.0);
        let b = Extent::new_bbox(10.0, 0.0, 20.0, 84.0);
        assert!(!a.intersects(&b));
        assert!(!a.contains(&b));
    }

    #[test]
    fn antimeridian_wrap() {
        // Fiji-style box crossing 180°
        let fiji = Extent::new_bbox(176.0, -21.0, -178.0, -12.0);
        let east_half = Extent::new_bbox(179.0, -20.0, 180.0, -15.0);
        let west_half = Extent::new_bbox(-180.0, -20.0, -179.0, -15.0);
        assert!(fiji.intersects(&east_half));
        assert!(fiji.intersects(&west_half));
        assert_eq!(fiji.surface_area_deg2(), Some(6.0 * 9.0));
    }

    #[test]
    fn effective_extent_picks_most_specific() {
        let usages = vec![
            Usage::new(None, Extent::world()),
            Usage::new(None, Extent::new_bbox(0.0, 0.0, 6.0, 84.0)),
        ];
        assert!(!effective_extent(&usages).is_world());
        assert!(effective_extent(&[]).is_world());
    }
}
