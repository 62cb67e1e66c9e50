//! Coordinate reference systems
//!
//! `Crs` is a closed sum over the CRS kinds the registry knows about. Every
//! variant owns exactly one of datum / datum-ensemble (a datum-ensemble CRS
//! defers realization), a coordinate system, and zero or more
//! scope/extent usages.

use crate::compare::ComparisonCriterion;
use crate::coordinate_system::{CoordinateSystem, CsKind};
use crate::datum::DatumOrEnsemble;
use crate::error::{GeodeticError, GeodeticResult};
use crate::extent::{effective_extent, Extent, Usage};
use crate::identifier::ObjectIdentity;
use crate::operation::SingleOperation;
use serde::{Deserialize, Serialize};

/// Metadata shared by every CRS kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrsCommon {
    pub identity: ObjectIdentity,
    pub usages: Vec<Usage>,
}

impl CrsCommon {
    pub fn new(identity: ObjectIdentity) -> Self {
        Self {
            identity,
            usages: Vec::new(),
        }
    }

    pub fn with_usages(mut self, usages: Vec<Usage>) -> Self {
        self.usages = usages;
        self
    }
}

/// A geographic or geocentric CRS (one geodetic datum, one CS).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeodeticCrs {
    pub common: CrsCommon,
    pub datum: DatumOrEnsemble,
    pub coordinate_system: CoordinateSystem,
}

/// A vertical CRS over a vertical datum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerticalCrs {
    pub common: CrsCommon,
    pub datum: DatumOrEnsemble,
    pub coordinate_system: CoordinateSystem,
}

/// An engineering CRS over an engineering datum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineeringCrs {
    pub common: CrsCommon,
    pub datum: DatumOrEnsemble,
    pub coordinate_system: CoordinateSystem,
}

/// A projected CRS: base geodetic CRS + deriving map-projection conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedCrs {
    pub common: CrsCommon,
    pub base: Box<Crs>,
    /// The deriving conversion; may lack source/target CRS when used as a
    /// template awaiting a base CRS.
    pub conversion: SingleOperation,
    pub coordinate_system: CoordinateSystem,
}

/// An ordered composition of >= 2 component CRS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundCrs {
    pub common: CrsCommon,
    pub components: Vec<Crs>,
}

/// Closed sum over CRS kinds; the kind set is stable and exhaustively
/// handled by the resolver and the pipeline composer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Crs {
    Geographic(GeodeticCrs),
    Geocentric(GeodeticCrs),
    Vertical(VerticalCrs),
    Projected(ProjectedCrs),
    Engineering(EngineeringCrs),
    Compound(CompoundCrs),
}

impl Crs {
    pub fn geographic(
        common: CrsCommon,
        datum: DatumOrEnsemble,
        coordinate_system: CoordinateSystem,
    ) -> GeodeticResult<Self> {
        if coordinate_system.kind != CsKind::Ellipsoidal {
            return Err(GeodeticError::InvalidCrs(format!(
                "geographic CRS requires an ellipsoidal CS, got {}",
                coordinate_system.kind.as_str()
            )));
        }
        Ok(Crs::Geographic(GeodeticCrs {
            common,
            datum,
            coordinate_system,
        }))
    }

    pub fn geocentric(
        common: CrsCommon,
        datum: DatumOrEnsemble,
        coordinate_system: CoordinateSystem,
    ) -> GeodeticResult<Self> {
        if coordinate_system.kind != CsKind::Cartesian
            || coordinate_system.dimension() != 3
        {
            return Err(GeodeticError::InvalidCrs(
                "geocentric CRS requires a 3D Cartesian CS".to_string(),
            ));
        }
        Ok(Crs::Geocentric(GeodeticCrs {
            common,
            datum,
            coordinate_system,
        }))
    }

    pub fn compound(common: CrsCommon, components: Vec<Crs>) -> GeodeticResult<Self> {
        if components.len() < 2 {
            return Err(GeodeticError::InvalidCrs(format!(
                "compound CRS needs at least 2 components, got {}",
                components.len()
            )));
        }
        Ok(Crs::Compound(CompoundCrs { common, components }))
    }

    pub fn common(&self) -> &CrsCommon {
        match self {
            Crs::Geographic(c) | Crs::Geocentric(c) => &c.common,
            Crs::Vertical(c) => &c.common,
            Crs::Projected(c) => &c.common,
            Crs::Engineering(c) => &c.common,
            Crs::Compound(c) => &c.common,
        }
    }

    pub fn identity(&self) -> &ObjectIdentity {
        &self.common().identity
    }

    pub fn name(&self) -> &str {
        &self.common().identity.name
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Crs::Geographic(c) => {
                if c.coordinate_system.dimension() == 3 {
                    "geographic 3D"
                } else {
                    "geographic 2D"
                }
            }
            Crs::Geocentric(_) => "geocentric",
            Crs::Vertical(_) => "vertical",
            Crs::Projected(_) => "projected",
            Crs::Engineering(_) => "engineering",
            Crs::Compound(_) => "compound",
        }
    }

    /// The datum or ensemble this CRS (or its base / first component) rests on.
    pub fn datum_or_ensemble(&self) -> Option<&DatumOrEnsemble> {
        match self {
            Crs::Geographic(c) | Crs::Geocentric(c) => Some(&c.datum),
            Crs::Vertical(c) => Some(&c.datum),
            Crs::Engineering(c) => Some(&c.datum),
            Crs::Projected(c) => c.base.datum_or_ensemble(),
            Crs::Compound(c) => c.components.first().and_then(|c| c.datum_or_ensemble()),
        }
    }

    pub fn coordinate_system(&self) -> Option<&CoordinateSystem> {
        match self {
            Crs::Geographic(c) | Crs::Geocentric(c) => Some(&c.coordinate_system),
            Crs::Vertical(c) => Some(&c.coordinate_system),
            Crs::Engineering(c) => Some(&c.coordinate_system),
            Crs::Projected(c) => Some(&c.coordinate_system),
            Crs::Compound(_) => None,
        }
    }

    /// Coordinate tuple dimension.
    pub fn dimension(&self) -> usize {
        match self {
            Crs::Compound(c) => c.components.iter().map(Crs::dimension).sum(),
            other => other
                .coordinate_system()
                .map(CoordinateSystem::dimension)
                .unwrap_or(0),
        }
    }

    /// Most specific declared domain of validity.
    pub fn extent(&self) -> Extent {
        effective_extent(&self.common().usages)
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self, Crs::Geographic(_))
    }

    pub fn is_geocentric(&self) -> bool {
        matches!(self, Crs::Geocentric(_))
    }

    pub fn is_equivalent_to(
        &self,
        other: &Self,
        criterion: ComparisonCriterion,
    ) -> bool {
        if criterion.is_strict() && self.identity() != other.identity() {
            return false;
        }
        match (self, other) {
            (Crs::Geographic(a), Crs::Geographic(b))
            | (Crs::Geocentric(a), Crs::Geocentric(b)) => {
                a.datum.is_equivalent_to(&b.datum, criterion.for_nested())
                    && a.coordinate_system
                        .is_equivalent_to(&b.coordinate_system, criterion)
            }
            (Crs::Vertical(a), Crs::Vertical(b)) => {
                a.datum.is_equivalent_to(&b.datum, criterion.for_nested())
                    && a.coordinate_system
                        .is_equivalent_to(&b.coordinate_system, criterion)
            }
            (Crs::Engineering(a), Crs::Engineering(b)) => {
                a.datum.is_equivalent_to(&b.datum, criterion.for_nested())
                    && a.coordinate_system
                        .is_equivalent_to(&b.coordinate_system, criterion)
            }
            (Crs::Projected(a), Crs::Projected(b)) => {
                a.base.is_equivalent_to(&b.base, criterion.for_nested())
                    && a.conversion
                        .is_equivalent_to(&b.conversion, criterion.for_nested())
                    && a.coordinate_system
                        .is_equivalent_to(&b.coordinate_system, criterion)
            }
            (Crs::Compound(a), Crs::Compound(b)) => {
                a.components.len() == b.components.len()
                    && a.components
                        .iter()
                        .zip(&b.components)
                        .all(|(x, y)| x.is_equivalent_to(y, criterion))
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datum::{Datum, DatumCommon, GeodeticDatum};
    use crate::ellipsoid::{Ellipsoid, EllipsoidFigure};
    use crate::prime_meridian::PrimeMeridian;

    fn wgs84_datum() -> DatumOrEnsemble {
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
        }))
    }

    fn wgs84() -> Crs {
        Crs::geographic(
            CrsCommon::new(ObjectIdentity::new("EPSG", "4326", "WGS 84")),
            wgs84_datum(),
            CoordinateSystem::ellipsoidal_2d_lat_lon(),
        )
        .unwrap()
    }

    #[test]
    fn geographic_requires_ellipsoidal_cs() {
        let err = Crs::geographic(
            CrsCommon::new(ObjectIdentity::anonymous("bad")),
            wgs84_datum(),
            CoordinateSystem::cartesian_2d_easting_northing(),
        );
        assert!(err.is_err());
    }

    #[test]
    fn rebuilt_crs_is_equivalent_not_strict_equal() {
        let registered = wgs84();
        let rebuilt = Crs::geographic(
            CrsCommon::new(ObjectIdentity::anonymous("WGS84 from text")),
            wgs84_datum(),
            CoordinateSystem::ellipsoidal_2d_lat_lon(),
        )
        .unwrap();
        assert!(registered.is_equivalent_to(&rebuilt, ComparisonCriterion::Equivalent));
        assert!(!registered.is_equivalent_to(&rebuilt, ComparisonCriterion::Strict));
    }

    #[test]
    fn axis_order_leniency_does_not_reach_nested_base() {
        let a = wgs84();
        let mut swapped = wgs84();
        if let Crs::Geographic(g) = &mut swapped {
            g.coordinate_system.axes.reverse();
        }
        assert!(!a.is_equivalent_to(&swapped, ComparisonCriterion::Equivalent));
        assert!(a.is_equivalent_to(
            &swapped,
            ComparisonCriterion::EquivalentExceptAxisOrder
        ));
    }

    #[test]
    fn compound_needs_two_components() {
        let only_one = Crs::compound(
            CrsCommon::new(ObjectIdentity::anonymous("half")),
            vec![wgs84()],
        );
        assert!(only_one.is_err());
    }

    #[test]
    fn dimension() {
        assert_eq!(wgs84().dimension(), 2);
        assert_eq!(wgs84().kind_name(), "geographic 2D");
    }

    #[test]
    fn survives_json_serialization() {
        let original = wgs84();
        let text = serde_json::to_string(&original).unwrap();
        let restored: Crs = serde_json::from_str(&text).unwrap();
        assert!(original.is_equivalent_to(&restored, ComparisonCriterion::Strict));
    }
}
