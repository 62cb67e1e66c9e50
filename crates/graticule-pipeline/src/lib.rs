//! Operation pipeline composition and PROJ-string export
//!
//! Turns one resolved [`CoordinateOperation`](graticule_core::CoordinateOperation)
//! (possibly concatenated, possibly inversion-marked) into a flat,
//! directionally correct sequence of primitive steps, then renders that
//! sequence as a `+proj=pipeline` token stream. Every failure mode is
//! raised at composition time; the step sequence itself never fails.

pub mod compose;
pub mod error;
pub mod export;
pub mod simplify;
pub mod step;

pub use compose::compose;
pub use error::{PipelineError, PipelineResult};
pub use step::{HelmertRates, Pipeline, PipelineStep, RotationConvention};
