//! Error taxonomy for registry lookups and construction

use thiserror::Error;

/// Any registry lookup, parsing or construction failure.
///
/// `NoSuchCode` is the distinguished lookup-miss subtype so callers can
/// tell "unknown code" from "broken record".
#[derive(Error, Debug)]
pub enum FactoryError {
    /// The (authority, code) pair is absent from the dataset
    #[error("No object with code {code} in authority {authority}")]
    NoSuchCode { authority: String, code: String },

    /// A record exists but cannot be turned into a valid entity
    #[error("Corrupt registry record for {authority}:{code}: {detail}")]
    CorruptRecord {
        authority: String,
        code: String,
        detail: String,
    },

    /// A CRS defined via another CRS's text definition refers to itself
    #[error("Recursive definition detected while constructing {authority}:{code}")]
    RecursiveDefinition { authority: String, code: String },

    /// Textual definition present but no parser injected, or parse failed
    #[error("Cannot realize text definition: {0}")]
    TextDefinition(String),

    /// Operation method with no construction support
    #[error("Unsupported operation method: {0}")]
    UnsupportedMethod(String),

    /// Insertion-session misuse (none open, or one already open)
    #[error("Insertion session error: {0}")]
    Session(String),

    /// Constructed entity violates an object-model invariant
    #[error(transparent)]
    Geodetic(#[from] graticule_core::GeodeticError),

    /// Underlying SQLite error
    #[error("Registry store error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl FactoryError {
    pub fn no_such_code(authority: impl Into<String>, code: impl Into<String>) -> Self {
        FactoryError::NoSuchCode {
            authority: authority.into(),
            code: code.into(),
        }
    }

    /// True for the distinguished lookup-miss subtype.
    pub fn is_no_such_code(&self) -> bool {
        matches!(self, FactoryError::NoSuchCode { .. })
    }
}

/// Result type for registry operations
pub type FactoryResult<T> = Result<T, FactoryError>;
