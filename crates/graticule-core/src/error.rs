//! Error types for object-model construction

use thiserror::Error;

/// Error raised when a geodetic value object cannot be constructed.
#[derive(Error, Debug)]
pub enum GeodeticError {
    /// Ellipsoid figure parameters contradict each other
    #[error("Inconsistent ellipsoid definition: {0}")]
    InconsistentEllipsoid(String),

    /// Coordinate system axis count does not match its kind
    #[error("Invalid coordinate system: {0}")]
    InvalidCoordinateSystem(String),

    /// Datum ensemble with fewer than two members, or mixed families
    #[error("Invalid datum ensemble: {0}")]
    InvalidDatumEnsemble(String),

    /// Compound CRS with fewer than two components
    #[error("Invalid CRS composition: {0}")]
    InvalidCrs(String),

    /// Concatenated operation whose steps do not chain
    #[error("Invalid concatenated operation: {0}")]
    InvalidConcatenation(String),

    /// Parameter value outside its declared domain
    #[error("Parameter out of domain: {0}")]
    ParameterOutOfDomain(String),
}

/// Result type for object-model construction
pub type GeodeticResult<T> = Result<T, GeodeticError>;
