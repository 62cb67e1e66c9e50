//! Coordinate operation resolution between CRS pairs
//!
//! Given two CRS and a [`SearchContext`], [`OperationResolver`] asks the
//! authority registry for every registered path (direct operations, derived
//! projection conversions, pivot chains), deduplicates direction-mirrored
//! hits, applies the caller's spatial and accuracy constraints, and ranks
//! what remains. When the registry has nothing it can fall back to a
//! zero-parameter ballpark operation between geographic CRS.

pub mod context;
pub mod error;
pub mod resolver;

pub use context::{PivotUse, SearchContext, SpatialCriterion};
pub use error::{ResolveError, ResolveResult};
pub use resolver::OperationResolver;
