//! Coordinate systems and axes

use crate::compare::ComparisonCriterion;
use crate::error::{GeodeticError, GeodeticResult};
use crate::identifier::ObjectIdentity;
use crate::units::UnitOfMeasure;
use serde::{Deserialize, Serialize};

/// Direction an axis points, as named in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisDirection {
    North,
    South,
    East,
    West,
    Up,
    Down,
    GeocentricX,
    GeocentricY,
    GeocentricZ,
    Future,
    Past,
    Unspecified,
}

impl AxisDirection {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "north" => AxisDirection::North,
            "south" => AxisDirection::South,
            "east" => AxisDirection::East,
            "west" => AxisDirection::West,
            "up" => AxisDirection::Up,
            "down" => AxisDirection::Down,
            "geocentricx" | "geocentric x" => AxisDirection::GeocentricX,
            "geocentricy" | "geocentric y" => AxisDirection::GeocentricY,
            "geocentricz" | "geocentric z" => AxisDirection::GeocentricZ,
            "future" => AxisDirection::Future,
            "past" => AxisDirection::Past,
            _ => AxisDirection::Unspecified,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AxisDirection::North => "north",
            AxisDirection::South => "south",
            AxisDirection::East => "east",
            AxisDirection::West => "west",
            AxisDirection::Up => "up",
            AxisDirection::Down => "down",
            AxisDirection::GeocentricX => "geocentricX",
            AxisDirection::GeocentricY => "geocentricY",
            AxisDirection::GeocentricZ => "geocentricZ",
            AxisDirection::Future => "future",
            AxisDirection::Past => "past",
            AxisDirection::Unspecified => "unspecified",
        }
    }

    /// The opposite direction, used to detect height/depth reversals.
    pub fn reversed(&self) -> Self {
        match self {
            AxisDirection::North => AxisDirection::South,
            AxisDirection::South => AxisDirection::North,
            AxisDirection::East => AxisDirection::West,
            AxisDirection::West => AxisDirection::East,
            AxisDirection::Up => AxisDirection::Down,
            AxisDirection::Down => AxisDirection::Up,
            AxisDirection::Future => AxisDirection::Past,
            AxisDirection::Past => AxisDirection::Future,
            other => *other,
        }
    }
}

/// One axis of a coordinate system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub name: String,
    pub abbreviation: String,
    pub direction: AxisDirection,
    pub unit: UnitOfMeasure,
}

impl Axis {
    pub fn new(
        name: impl Into<String>,
        abbreviation: impl Into<String>,
        direction: AxisDirection,
        unit: UnitOfMeasure,
    ) -> Self {
        Self {
            name: name.into(),
            abbreviation: abbreviation.into(),
            direction,
            unit,
        }
    }

    pub fn is_equivalent_to(
        &self,
        other: &Self,
        criterion: ComparisonCriterion,
    ) -> bool {
        if criterion.is_strict()
            && (self.name != other.name || self.abbreviation != other.abbreviation)
        {
            return false;
        }
        self.direction == other.direction
            && self.unit.is_equivalent_to(&other.unit, criterion)
    }
}

/// Subtype constraining axis count and semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CsKind {
    Ellipsoidal,
    Cartesian,
    Vertical,
    Spherical,
}

impl CsKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CsKind::Ellipsoidal => "ellipsoidal",
            CsKind::Cartesian => "Cartesian",
            CsKind::Vertical => "vertical",
            CsKind::Spherical => "spherical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ellipsoidal" => Some(CsKind::Ellipsoidal),
            "cartesian" => Some(CsKind::Cartesian),
            "vertical" => Some(CsKind::Vertical),
            "spherical" => Some(CsKind::Spherical),
            _ => None,
        }
    }

    fn valid_axis_counts(&self) -> &'static [usize] {
        match self {
            CsKind::Ellipsoidal => &[2, 3],
            CsKind::Cartesian => &[2, 3],
            CsKind::Vertical => &[1],
            CsKind::Spherical => &[2, 3],
        }
    }
}

/// An ordered list of axes of one kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateSystem {
    pub identity: ObjectIdentity,
    pub kind: CsKind,
    pub axes: Vec<Axis>,
}

impl CoordinateSystem {
    pub fn new(
        identity: ObjectIdentity,
        kind: CsKind,
        axes: Vec<Axis>,
    ) -> GeodeticResult<Self> {
        if !kind.valid_axis_counts().contains(&axes.len()) {
            return Err(GeodeticError::InvalidCoordinateSystem(format!(
                "{} coordinate system cannot have {} axes",
                kind.as_str(),
                axes.len()
            )));
        }
        Ok(Self {
            identity,
            kind,
            axes,
        })
    }

    /// EPSG:6422 latitude/longitude in degrees.
    pub fn ellipsoidal_2d_lat_lon() -> Self {
        Self::new(
            ObjectIdentity::new("EPSG", "6422", "Ellipsoidal 2D CS"),
            CsKind::Ellipsoidal,
            vec![
                Axis::new(
                    "Geodetic latitude",
                    "Lat",
                    AxisDirection::North,
                    UnitOfMeasure::degree_9122(),
                ),
                Axis::new(
                    "Geodetic longitude",
                    "Lon",
                    AxisDirection::East,
                    UnitOfMeasure::degree_9122(),
                ),
            ],
        )
        .expect("static definition is valid")
    }

    /// EPSG:4400 easting/northing in metres.
    pub fn cartesian_2d_easting_northing() -> Self {
        Self::new(
            ObjectIdentity::new("EPSG", "4400", "Cartesian 2D CS"),
            CsKind::Cartesian,
            vec![
                Axis::new("Easting", "E", AxisDirection::East, UnitOfMeasure::metre()),
                Axis::new("Northing", "N", AxisDirection::North, UnitOfMeasure::metre()),
            ],
        )
        .expect("static definition is valid")
    }

    /// EPSG:6500 geocentric X/Y/Z in metres.
    pub fn cartesian_3d_geocentric() -> Self {
        Self::new(
            ObjectIdentity::new("EPSG", "6500", "Cartesian 3D CS (geocentric)"),
            CsKind::Cartesian,
            vec![
                Axis::new(
                    "Geocentric X",
                    "X",
                    AxisDirection::GeocentricX,
                    UnitOfMeasure::metre(),
                ),
                Axis::new(
                    "Geocentric Y",
                    "Y",
                    AxisDirection::GeocentricY,
                    UnitOfMeasure::metre(),
                ),
                Axis::new(
                    "Geocentric Z",
                    "Z",
                    AxisDirection::GeocentricZ,
                    UnitOfMeasure::metre(),
                ),
            ],
        )
        .expect("static definition is valid")
    }

    pub fn dimension(&self) -> usize {
        self.axes.len()
    }

    pub fn is_equivalent_to(
        &self,
        other: &Self,
        criterion: ComparisonCriterion,
    ) -> bool {
        if criterion.is_strict() && self.identity != other.identity {
            return false;
        }
        if self.kind != other.kind || self.axes.len() != other.axes.len() {
            return false;
        }
        let axes_match_in_order = |a: &[Axis], b: &[Axis]| {
            a.iter()
                .zip(b)
                .all(|(x, y)| x.is_equivalent_to(y, criterion))
        };
        if axes_match_in_order(&self.axes, &other.axes) {
            return true;
        }
        if criterion.ignores_axis_order() {
            // Accept any permutation that pairs every axis.
            let mut used = vec![false; other.axes.len()];
            return self.axes.iter().all(|a| {
                other.axes.iter().enumerate().any(|(i, b)| {
                    if !used[i] && a.is_equivalent_to(b, criterion) {
                        used[i] = true;
                        true
                    } else {
                        false
                    }
                })
            });
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertical_cs_is_one_dimensional() {
        let err = CoordinateSystem::new(
            ObjectIdentity::anonymous("bad"),
            CsKind::Vertical,
            vec![
                Axis::new("H", "H", AxisDirection::Up, UnitOfMeasure::metre()),
                Axis::new("H2", "H2", AxisDirection::Up, UnitOfMeasure::metre()),
            ],
        );
        assert!(err.is_err());
    }

    #[test]
    fn axis_order_criterion() {
        let lat_lon = CoordinateSystem::ellipsoidal_2d_lat_lon();
        let mut lon_lat = lat_lon.clone();
        lon_lat.axes.reverse();

        assert!(!lat_lon.is_equivalent_to(&lon_lat, ComparisonCriterion::Equivalent));
        assert!(lat_lon.is_equivalent_to(
            &lon_lat,
            ComparisonCriterion::EquivalentExceptAxisOrder
        ));
    }

    #[test]
    fn direction_reversal() {
        assert_eq!(AxisDirection::Up.reversed(), AxisDirection::Down);
        assert_eq!(AxisDirection::parse("north"), AxisDirection::North);
        assert_eq!(AxisDirection::parse("sideways"), AxisDirection::Unspecified);
    }
}
