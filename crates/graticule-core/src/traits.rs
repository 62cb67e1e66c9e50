//! Seams for external collaborators
//!
//! The WKT and PROJ-string grammars live outside this workspace. The core
//! defines the trait; the registry accepts an implementation by injection,
//! so registry records holding a textual CRS definition can be realized
//! without this crate ever parsing text itself.

use crate::crs::Crs;
use crate::operation::CoordinateOperation;

/// Error reported by an external text-definition parser.
#[derive(Debug, thiserror::Error)]
#[error("Definition parse error: {0}")]
pub struct DefinitionParseError(pub String);

/// Parser for textual CRS/operation definitions (WKT or PROJ string).
///
/// Implementations are external collaborators; entities they produce are
/// consumed identically to registry-sourced entities.
pub trait CrsDefinitionParser: Send + Sync {
    /// Parse a CRS definition fragment.
    fn parse_crs(&self, text: &str) -> Result<Crs, DefinitionParseError>;

    /// Parse an operation definition fragment.
    fn parse_operation(
        &self,
        text: &str,
    ) -> Result<CoordinateOperation, DefinitionParseError> {
        let _ = text;
        Err(DefinitionParseError(
            "operation definitions not supported by this parser".to_string(),
        ))
    }
}
