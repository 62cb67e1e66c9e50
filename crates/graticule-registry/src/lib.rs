//! Authority registry over the SQLite reference dataset
//!
//! Turns registry records into [`graticule_core`] entities: code-addressed
//! creators for every object kind, pair-addressed operation lookups (both
//! directions, derived projection conversions, pivot search), supersession
//! filtering and insertion sessions for user-defined records.
//!
//! A [`RegistryContext`] owns one store connection, a constructed-entity
//! cache and the session state; [`AuthorityRegistry`] is a cheap view of a
//! context scoped to one authority (or to all of them).

pub mod cache;
pub mod connection;
pub mod error;
pub mod factory;
mod operations;
pub mod schema;
pub mod session;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod test_support;

pub use cache::EntityCache;
pub use connection::{RegistryConfig, RegistryPool};
pub use error::{FactoryError, FactoryResult};
pub use factory::{AuthorityObject, AuthorityRegistry, ObjectType, RegistryContext};
pub use session::InsertSessions;
