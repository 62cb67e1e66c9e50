//! Composition errors
//!
//! Everything here is raised at composition time; a pipeline that composes
//! successfully has passed every statically checkable domain test.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no pipeline kernel registered for method '{name}' ({code})")]
    UnknownMethod { code: String, name: String },

    #[error("operation '{operation}' lacks required parameter {code}")]
    MissingParameter { operation: String, code: String },

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// A statically known parameter lies outside its declared domain.
    #[error("parameter {name} = {value} outside domain {domain}")]
    OutsideDomain {
        name: String,
        value: f64,
        domain: String,
    },

    #[error("unit '{0}' has no pipeline spelling")]
    UnsupportedUnit(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
