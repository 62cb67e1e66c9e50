//! Prime meridians

use crate::compare::{float_eq, ComparisonCriterion};
use crate::identifier::ObjectIdentity;
use crate::units::{Measure, UnitOfMeasure};
use serde::{Deserialize, Serialize};

/// The meridian from which longitudes are reckoned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimeMeridian {
    pub identity: ObjectIdentity,
    pub longitude: Measure,
}

impl PrimeMeridian {
    pub fn new(identity: ObjectIdentity, longitude: Measure) -> Self {
        Self {
            identity,
            longitude,
        }
    }

    /// EPSG:8901 Greenwich.
    pub fn greenwich() -> Self {
        Self::new(
            ObjectIdentity::new("EPSG", "8901", "Greenwich"),
            Measure::new(0.0, UnitOfMeasure::degree()),
        )
    }

    pub fn is_greenwich(&self) -> bool {
        float_eq(self.longitude.to_degrees(), 0.0)
    }

    pub fn is_equivalent_to(
        &self,
        other: &Self,
        criterion: ComparisonCriterion,
    ) -> bool {
        if criterion.is_strict() && self.identity != other.identity {
            return false;
        }
        float_eq(self.longitude.to_degrees(), other.longitude.to_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greenwich() {
        assert!(PrimeMeridian::greenwich().is_greenwich());
    }

    #[test]
    fn cross_unit_equivalence() {
        let ferro_deg = PrimeMeridian::new(
            ObjectIdentity::new("EPSG", "8909", "Ferro"),
            Measure::new(-17.666666666666668, UnitOfMeasure::degree()),
        );
        let ferro_dms = PrimeMeridian::new(
            ObjectIdentity::anonymous("Ferro"),
            Measure::new(-17.40, UnitOfMeasure::sexagesimal_dms()),
        );
        assert!(ferro_deg.is_equivalent_to(&ferro_dms, ComparisonCriterion::Equivalent));
        assert!(!ferro_deg.is_equivalent_to(
            &PrimeMeridian::greenwich(),
            ComparisonCriterion::Equivalent
        ));
    }
}
