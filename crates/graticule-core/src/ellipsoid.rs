//! Reference ellipsoids

use crate::compare::{float_eq, float_eq_tol, ComparisonCriterion};
use crate::error::{GeodeticError, GeodeticResult};
use crate::identifier::ObjectIdentity;
use serde::{Deserialize, Serialize};

/// Which figure parameter defines the ellipsoid's flattening.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EllipsoidFigure {
    InverseFlattening(f64),
    SemiMinorAxis(f64),
    Sphere,
}

/// An ellipsoid of revolution (or sphere) approximating a celestial body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ellipsoid {
    pub identity: ObjectIdentity,
    /// Semi-major axis in metres.
    pub semi_major_axis: f64,
    pub figure: EllipsoidFigure,
    pub celestial_body: String,
}

impl Ellipsoid {
    pub fn new(
        identity: ObjectIdentity,
        semi_major_axis: f64,
        figure: EllipsoidFigure,
        celestial_body: impl Into<String>,
    ) -> GeodeticResult<Self> {
        if !(semi_major_axis > 0.0) {
            return Err(GeodeticError::InconsistentEllipsoid(format!(
                "semi-major axis must be positive, got {semi_major_axis}"
            )));
        }
        match figure {
            EllipsoidFigure::InverseFlattening(rf) if !(rf > 1.0) => {
                return Err(GeodeticError::InconsistentEllipsoid(format!(
                    "inverse flattening must exceed 1, got {rf}"
                )));
            }
            EllipsoidFigure::SemiMinorAxis(b) if !(b > 0.0) || b > semi_major_axis => {
                return Err(GeodeticError::InconsistentEllipsoid(format!(
                    "semi-minor axis {b} incompatible with semi-major axis {semi_major_axis}"
                )));
            }
            _ => {}
        }
        Ok(Self {
            identity,
            semi_major_axis,
            figure,
            celestial_body: celestial_body.into(),
        })
    }

    /// Semi-minor axis in metres, derived when not the defining parameter.
    pub fn semi_minor_axis(&self) -> f64 {
        match self.figure {
            EllipsoidFigure::SemiMinorAxis(b) => b,
            EllipsoidFigure::InverseFlattening(rf) => {
                self.semi_major_axis * (1.0 - 1.0 / rf)
            }
            EllipsoidFigure::Sphere => self.semi_major_axis,
        }
    }

    /// Inverse flattening; `None` for a sphere.
    pub fn inverse_flattening(&self) -> Option<f64> {
        match self.figure {
            EllipsoidFigure::InverseFlattening(rf) => Some(rf),
            EllipsoidFigure::SemiMinorAxis(b) => {
                let f = (self.semi_major_axis - b) / self.semi_major_axis;
                if f == 0.0 {
                    None
                } else {
                    Some(1.0 / f)
                }
            }
            EllipsoidFigure::Sphere => None,
        }
    }

    pub fn is_sphere(&self) -> bool {
        match self.figure {
            EllipsoidFigure::Sphere => true,
            EllipsoidFigure::SemiMinorAxis(b) => b == self.semi_major_axis,
            EllipsoidFigure::InverseFlattening(_) => false,
        }
    }

    /// Squared first eccentricity.
    pub fn eccentricity_squared(&self) -> f64 {
        let b = self.semi_minor_axis();
        let a = self.semi_major_axis;
        1.0 - (b * b) / (a * a)
    }

    pub fn is_equivalent_to(
        &self,
        other: &Self,
        criterion: ComparisonCriterion,
    ) -> bool {
        if criterion.is_strict() && self.identity != other.identity {
            return false;
        }
        // Derived figures carry rounding from the defining parameter, so the
        // cross-figure comparison uses a looser tolerance than axis lengths.
        self.celestial_body == other.celestial_body
            && float_eq(self.semi_major_axis, other.semi_major_axis)
            && float_eq_tol(self.semi_minor_axis(), other.semi_minor_axis(), 1e-8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wgs84() -> Ellipsoid {
        Ellipsoid::new(
            ObjectIdentity::new("EPSG", "7030", "WGS 84"),
            6378137.0,
            EllipsoidFigure::InverseFlattening(298.257223563),
            "Earth",
        )
        .unwrap()
    }

    #[test]
    fn derived_semi_minor_axis() {
        let e = wgs84();
        assert!((e.semi_minor_axis() - 6356752.3142).abs() < 1e-3);
        assert!(!e.is_sphere());
    }

    #[test]
    fn figure_definitions_are_equivalent() {
        let from_rf = wgs84();
        let from_b = Ellipsoid::new(
            ObjectIdentity::anonymous("WGS 84 (b)"),
            6378137.0,
            EllipsoidFigure::SemiMinorAxis(6356752.314245179),
            "Earth",
        )
        .unwrap();
        assert!(from_rf.is_equivalent_to(&from_b, ComparisonCriterion::Equivalent));
        assert!(!from_rf.is_equivalent_to(&from_b, ComparisonCriterion::Strict));
        assert!((from_b.inverse_flattening().unwrap() - 298.257223563).abs() < 1e-6);
    }

    #[test]
    fn same_figure_different_body_is_not_equivalent() {
        let earth = wgs84();
        let elsewhere = Ellipsoid::new(
            ObjectIdentity::anonymous("WGS 84 figure, wrong body"),
            6378137.0,
            EllipsoidFigure::InverseFlattening(298.257223563),
            "Mars",
        )
        .unwrap();
        assert!(!earth.is_equivalent_to(&elsewhere, ComparisonCriterion::Equivalent));
    }

    #[test]
    fn sphere() {
        let s = Ellipsoid::new(
            ObjectIdentity::anonymous("sphere"),
            6371000.0,
            EllipsoidFigure::Sphere,
            "Earth",
        )
        .unwrap();
        assert!(s.is_sphere());
        assert_eq!(s.inverse_flattening(), None);
        assert_eq!(s.semi_minor_axis(), 6371000.0);
    }

    #[test]
    fn rejects_inconsistent_figure() {
        assert!(Ellipsoid::new(
            ObjectIdentity::anonymous("bad"),
            6378137.0,
            EllipsoidFigure::SemiMinorAxis(7000000.0),
            "Earth",
        )
        .is_err());
        assert!(Ellipsoid::new(
            ObjectIdentity::anonymous("bad"),
            -1.0,
            EllipsoidFigure::Sphere,
            "Earth",
        )
        .is_err());
    }
}
