//! Datums, reference frames and datum ensembles

use crate::compare::{float_eq, option_eq, ComparisonCriterion};
use crate::ellipsoid::Ellipsoid;
use crate::error::{GeodeticError, GeodeticResult};
use crate::extent::Extent;
use crate::identifier::ObjectIdentity;
use crate::prime_meridian::PrimeMeridian;
use serde::{Deserialize, Serialize};

/// Metadata shared by every datum kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatumCommon {
    pub identity: ObjectIdentity,
    pub anchor: Option<String>,
    /// Decimal year of the anchor definition, e.g. 2010.0.
    pub anchor_epoch: Option<f64>,
    pub publication_date: Option<String>,
    /// Set for dynamic reference frames only.
    pub frame_reference_epoch: Option<f64>,
}

impl DatumCommon {
    pub fn new(identity: ObjectIdentity) -> Self {
        Self {
            identity,
            ..Default::default()
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.frame_reference_epoch.is_some()
    }

    fn is_equivalent_to(&self, other: &Self, criterion: ComparisonCriterion) -> bool {
        if criterion.is_strict()
            && (self.identity != other.identity
                || self.anchor != other.anchor
                || self.publication_date != other.publication_date)
        {
            return false;
        }
        option_eq(&self.anchor_epoch, &other.anchor_epoch, |a, b| {
            float_eq(*a, *b)
        }) && option_eq(
            &self.frame_reference_epoch,
            &other.frame_reference_epoch,
            |a, b| float_eq(*a, *b),
        )
    }
}

/// A geodetic datum: ellipsoid + prime meridian anchored to the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeodeticDatum {
    pub common: DatumCommon,
    pub ellipsoid: Ellipsoid,
    pub prime_meridian: PrimeMeridian,
}

/// A vertical datum (height/depth reference surface).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerticalDatum {
    pub common: DatumCommon,
}

/// An engineering datum for local, non-georeferenced systems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineeringDatum {
    pub common: DatumCommon,
}

/// Closed sum over the datum kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Datum {
    Geodetic(GeodeticDatum),
    Vertical(VerticalDatum),
    Engineering(EngineeringDatum),
}

impl Datum {
    pub fn common(&self) -> &DatumCommon {
        match self {
            Datum::Geodetic(d) => &d.common,
            Datum::Vertical(d) => &d.common,
            Datum::Engineering(d) => &d.common,
        }
    }

    pub fn identity(&self) -> &ObjectIdentity {
        &self.common().identity
    }

    pub fn ellipsoid(&self) -> Option<&Ellipsoid> {
        match self {
            Datum::Geodetic(d) => Some(&d.ellipsoid),
            _ => None,
        }
    }

    pub fn prime_meridian(&self) -> Option<&PrimeMeridian> {
        match self {
            Datum::Geodetic(d) => Some(&d.prime_meridian),
            _ => None,
        }
    }

    pub fn is_equivalent_to(
        &self,
        other: &Self,
        criterion: ComparisonCriterion,
    ) -> bool {
        match (self, other) {
            (Datum::Geodetic(a), Datum::Geodetic(b)) => {
                a.common.is_equivalent_to(&b.common, criterion)
                    && a.ellipsoid.is_equivalent_to(&b.ellipsoid, criterion)
                    && a.prime_meridian
                        .is_equivalent_to(&b.prime_meridian, criterion)
            }
            (Datum::Vertical(a), Datum::Vertical(b)) => {
                a.common.is_equivalent_to(&b.common, criterion)
            }
            (Datum::Engineering(a), Datum::Engineering(b)) => {
                a.common.is_equivalent_to(&b.common, criterion)
            }
            _ => false,
        }
    }
}

/// An ordered family of realizations treated as one datum up to a stated
/// positional accuracy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatumEnsemble {
    pub identity: ObjectIdentity,
    /// At least two members, all of the same datum family.
    pub members: Vec<Datum>,
    /// Positional accuracy bound across members, in metres.
    pub accuracy: f64,
    pub valid_extent: Extent,
}

impl DatumEnsemble {
    pub fn new(
        identity: ObjectIdentity,
        members: Vec<Datum>,
        accuracy: f64,
        valid_extent: Extent,
    ) -> GeodeticResult<Self> {
        if members.len() < 2 {
            return Err(GeodeticError::InvalidDatumEnsemble(format!(
                "ensemble needs at least 2 members, got {}",
                members.len()
            )));
        }
        let all_same_family = members.windows(2).all(|w| {
            std::mem::discriminant(&w[0]) == std::mem::discriminant(&w[1])
        });
        if !all_same_family {
            return Err(GeodeticError::InvalidDatumEnsemble(
                "ensemble members must share one coordinate system family".to_string(),
            ));
        }
        Ok(Self {
            identity,
            members,
            accuracy,
            valid_extent,
        })
    }

    /// Collapse the ensemble to a single representative datum.
    ///
    /// `pick` lets a registry-backed caller choose the best-attested member
    /// (e.g. newest non-deprecated realization); without it the last
    /// non-deprecated member wins, falling back to the last member.
    pub fn as_datum(&self, pick: Option<&dyn Fn(&[Datum]) -> Option<usize>>) -> &Datum {
        if let Some(pick) = pick {
            if let Some(i) = pick(&self.members) {
                if let Some(d) = self.members.get(i) {
                    return d;
                }
            }
        }
        self.members
            .iter()
            .rev()
            .find(|d| !d.identity().deprecated)
            .unwrap_or_else(|| self.members.last().expect("ensemble has >= 2 members"))
    }

    pub fn is_equivalent_to(
        &self,
        other: &Self,
        criterion: ComparisonCriterion,
    ) -> bool {
        if criterion.is_strict() && self.identity != other.identity {
            return false;
        }
        self.members.len() == other.members.len()
            && float_eq(self.accuracy, other.accuracy)
            && self
                .members
                .iter()
                .zip(&other.members)
                .all(|(a, b)| a.is_equivalent_to(b, criterion.for_nested()))
    }
}

/// A CRS owns exactly one of these, never both, never neither.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DatumOrEnsemble {
    Datum(Datum),
    Ensemble(DatumEnsemble),
}

impl DatumOrEnsemble {
    pub fn identity(&self) -> &ObjectIdentity {
        match self {
            DatumOrEnsemble::Datum(d) => d.identity(),
            DatumOrEnsemble::Ensemble(e) => &e.identity,
        }
    }

    /// Ellipsoid of the (representative) geodetic datum, if any.
    pub fn ellipsoid(&self) -> Option<&Ellipsoid> {
        match self {
            DatumOrEnsemble::Datum(d) => d.ellipsoid(),
            DatumOrEnsemble::Ensemble(e) => e.as_datum(None).ellipsoid(),
        }
    }

    pub fn prime_meridian(&self) -> Option<&PrimeMeridian> {
        match self {
            DatumOrEnsemble::Datum(d) => d.prime_meridian(),
            DatumOrEnsemble::Ensemble(e) => e.as_datum(None).prime_meridian(),
        }
    }

    pub fn is_equivalent_to(
        &self,
        other: &Self,
        criterion: ComparisonCriterion,
    ) -> bool {
        match (self, other) {
            (DatumOrEnsemble::Datum(a), DatumOrEnsemble::Datum(b)) => {
                a.is_equivalent_to(b, criterion)
            }
            (DatumOrEnsemble::Ensemble(a), DatumOrEnsemble::Ensemble(b)) => {
                a.is_equivalent_to(b, criterion)
            }
            // A datum-ensemble CRS defers realization; under loose criteria
            // an ensemble equals a datum that matches its representative.
            (DatumOrEnsemble::Ensemble(e), DatumOrEnsemble::Datum(d))
            | (DatumOrEnsemble::Datum(d), DatumOrEnsemble::Ensemble(e))
                if !criterion.is_strict() =>
            {
                e.as_datum(None).is_equivalent_to(d, criterion)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ellipsoid::EllipsoidFigure;
    use crate::units::{Measure, UnitOfMeasure};

    fn wgs84_datum(code: &str, name: &str) -> Datum {
        Datum::Geodetic(GeodeticDatum {
            common: DatumCommon::new(ObjectIdentity::new("EPSG", code, name)),
            ellipsoid: Ellipsoid::new(
                ObjectIdentity::new("EPSG", "7030", "WGS 84"),
                6378137.0,
                EllipsoidFigure::InverseFlattening(298.257223563),
                "Earth",
            )
            .unwrap(),
            prime_meridian: PrimeMeridian::greenwich(),
        })
    }

    #[test]
    fn ensemble_needs_two_members() {
        let err = DatumEnsemble::new(
            ObjectIdentity::anonymous("lonely"),
            vec![wgs84_datum("1166", "WGS 84 (G1150)")],
            2.0,
            Extent::world(),
        );
        assert!(err.is_err());
    }

    #[test]
    fn ensemble_representative_skips_deprecated() {
        let mut old = wgs84_datum("1154", "WGS 84 (G873)");
        if let Datum::Geodetic(d) = &mut old {
            d.common.identity.deprecated = true;
        }
        let ensemble = DatumEnsemble::new(
            ObjectIdentity::new("EPSG", "6326", "WGS 84 ensemble"),
            vec![wgs84_datum("1166", "WGS 84 (G1150)"), old],
            2.0,
            Extent::world(),
        )
        .unwrap();
        assert_eq!(ensemble.as_datum(None).identity().code, "1166");

        // A registry-backed picker overrides the default choice.
        let pick = |_: &[Datum]| Some(1usize);
        assert_eq!(ensemble.as_datum(Some(&pick)).identity().code, "1154");
    }

    #[test]
    fn dynamic_datum_epoch_compared() {
        let mut a = wgs84_datum("1166", "WGS 84 (G1150)");
        let mut b = a.clone();
        if let Datum::Geodetic(d) = &mut a {
            d.common.frame_reference_epoch = Some(2005.0);
        }
        assert!(!a.is_equivalent_to(&b, ComparisonCriterion::Equivalent));
        if let Datum::Geodetic(d) = &mut b {
            d.common.frame_reference_epoch = Some(2005.0);
        }
        assert!(a.is_equivalent_to(&b, ComparisonCriterion::Equivalent));
        assert!(a.common().is_dynamic());
    }

    #[test]
    fn ferro_and_greenwich_datums_differ() {
        let greenwich = wgs84_datum("6326", "WGS 84");
        let ferro = Datum::Geodetic(GeodeticDatum {
            common: DatumCommon::new(ObjectIdentity::anonymous("on Ferro")),
            ellipsoid: greenwich.ellipsoid().unwrap().clone(),
            prime_meridian: PrimeMeridian::new(
                ObjectIdentity::new("EPSG", "8909", "Ferro"),
                Measure::new(-17.666666666666668, UnitOfMeasure::degree()),
            ),
        });
        assert!(!greenwich.is_equivalent_to(&ferro, ComparisonCriterion::Equivalent));
    }
}
