//! Resolution errors

use graticule_core::GeodeticError;
use graticule_registry::FactoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("registry lookup failed: {0}")]
    Registry(#[from] FactoryError),

    #[error("geodetic model error: {0}")]
    Geodetic(#[from] GeodeticError),

    /// Only `resolve_best` raises this; `resolve` returns an empty list.
    #[error("no coordinate operation found from '{source_crs}' to '{target}'")]
    NoOperationFound { source_crs: String, target: String },
}

pub type ResolveResult<T> = Result<T, ResolveError>;
