//! Geodetic object model
//!
//! Immutable value entities (ellipsoids, prime meridians, datums and
//! ensembles, coordinate systems, CRS variants, operation methods and
//! coordinate operations) plus the structural-equivalence comparator used
//! everywhere two differently-sourced entities must be recognized as the
//! same geodetic concept.
//!
//! Entities are constructed once (by the registry, or programmatically for
//! user-defined CRS) and are read-only thereafter. There is no identity
//! notion beyond [`compare::ComparisonCriterion`]-driven equivalence.

pub mod chain;
pub mod compare;
pub mod coordinate_system;
pub mod crs;
pub mod datum;
pub mod ellipsoid;
pub mod error;
pub mod extent;
pub mod identifier;
pub mod operation;
pub mod prime_meridian;
pub mod traits;
pub mod units;

pub use chain::{candidate_order, geographic_geocentric_conversion, link_concatenation};
pub use compare::ComparisonCriterion;
pub use coordinate_system::{Axis, AxisDirection, CoordinateSystem, CsKind};
pub use crs::{CompoundCrs, Crs, CrsCommon, EngineeringCrs, GeodeticCrs, ProjectedCrs, VerticalCrs};
pub use datum::{
    Datum, DatumCommon, DatumEnsemble, DatumOrEnsemble, EngineeringDatum, GeodeticDatum,
    VerticalDatum,
};
pub use ellipsoid::{Ellipsoid, EllipsoidFigure};
pub use error::{GeodeticError, GeodeticResult};
pub use extent::{Extent, Usage};
pub use identifier::ObjectIdentity;
pub use operation::{
    ConcatenatedOperation, CoordinateOperation, OperationMethod, OperationParameter,
    OperationStep, ParameterValue, SingleKind, SingleOperation,
};
pub use prime_meridian::PrimeMeridian;
pub use traits::{CrsDefinitionParser, DefinitionParseError};
pub use units::{Measure, UnitOfMeasure, UnitType};
