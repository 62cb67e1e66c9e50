//! Object identification shared by every registry entity

use serde::{Deserialize, Serialize};

/// Identity of a geodetic object: who registered it and under which code.
///
/// User-defined (anonymous) objects use an empty authority string. Two
/// objects with the same non-empty (authority, code) pair denote the same
/// registered concept, but equivalence comparison is always structural
/// (see [`crate::compare`]), never identity-based.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectIdentity {
    pub authority: String,
    pub code: String,
    pub name: String,
    pub deprecated: bool,
    pub remarks: Option<String>,
}

impl ObjectIdentity {
    pub fn new(
        authority: impl Into<String>,
        code: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            authority: authority.into(),
            code: code.into(),
            name: name.into(),
            deprecated: false,
            remarks: None,
        }
    }

    /// Identity for a user-defined object that has no registry code.
    pub fn anonymous(name: impl Into<String>) -> Self {
        Self::new("", "", name)
    }

    pub fn deprecated(mut self, deprecated: bool) -> Self {
        self.deprecated = deprecated;
        self
    }

    /// True when this object carries a registry code.
    pub fn is_registered(&self) -> bool {
        !self.authority.is_empty() && !self.code.is_empty()
    }

    /// (authority, code) pair, e.g. `("EPSG", "4326")`.
    pub fn key(&self) -> (&str, &str) {
        (&self.authority, &self.code)
    }
}

impl std::fmt::Display for ObjectIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_registered() {
            write!(f, "{} [{}:{}]", self.name, self.authority, self.code)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_identity_display() {
        let id = ObjectIdentity::new("EPSG", "4326", "WGS 84");
        assert!(id.is_registered());
        assert_eq!(id.to_string(), "WGS 84 [EPSG:4326]");
        assert_eq!(id.key(), ("EPSG", "4326"));
    }

    #[test]
    fn anonymous_identity() {
        let id = ObjectIdentity::anonymous("my local CRS");
        assert!(!id.is_registered());
        assert_eq!(id.to_string(), "my local CRS");
    }
}
