//! Units of measure and unit-bearing values
//!
//! Every angular, linear, scale or time quantity in the model carries its
//! unit explicitly. Conversion to SI (metre, radian, unity, year) happens
//! through a single multiplicative factor, except sexagesimal DMS which
//! needs a digit-field decode and is handled in [`Measure::to_si`].

use crate::compare::{float_eq, ComparisonCriterion};
use crate::identifier::ObjectIdentity;
use serde::{Deserialize, Serialize};

/// Kind of quantity a unit measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitType {
    Linear,
    Angular,
    Scale,
    Time,
}

impl UnitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitType::Linear => "length",
            UnitType::Angular => "angle",
            UnitType::Scale => "scale",
            UnitType::Time => "time",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "length" => Some(UnitType::Linear),
            "angle" => Some(UnitType::Angular),
            "scale" => Some(UnitType::Scale),
            "time" => Some(UnitType::Time),
            _ => None,
        }
    }
}

/// A unit of measure from the registry (or one of the built-in constants).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitOfMeasure {
    pub identity: ObjectIdentity,
    pub unit_type: UnitType,
    /// Factor to the SI base of `unit_type`. `None` for units that are not
    /// a plain ratio (sexagesimal DMS, EPSG:9110).
    pub to_si: Option<f64>,
}

impl UnitOfMeasure {
    pub fn new(
        identity: ObjectIdentity,
        unit_type: UnitType,
        to_si: Option<f64>,
    ) -> Self {
        Self {
            identity,
            unit_type,
            to_si,
        }
    }

    fn wellknown(code: &str, name: &str, unit_type: UnitType, to_si: f64) -> Self {
        Self::new(
            ObjectIdentity::new("EPSG", code, name),
            unit_type,
            Some(to_si),
        )
    }

    /// EPSG:9001 metre
    pub fn metre() -> Self {
        Self::wellknown("9001", "metre", UnitType::Linear, 1.0)
    }

    /// EPSG:9002 foot
    pub fn foot() -> Self {
        Self::wellknown("9002", "foot", UnitType::Linear, 0.3048)
    }

    /// EPSG:9101 radian
    pub fn radian() -> Self {
        Self::wellknown("9101", "radian", UnitType::Angular, 1.0)
    }

    /// EPSG:9102 degree
    pub fn degree() -> Self {
        Self::wellknown("9102", "degree", UnitType::Angular, 0.017453292519943295)
    }

    /// EPSG:9122 degree (supplier to define representation)
    pub fn degree_9122() -> Self {
        Self::wellknown("9122", "degree", UnitType::Angular, 0.017453292519943295)
    }

    /// EPSG:9104 arc-second
    pub fn arc_second() -> Self {
        Self::wellknown("9104", "arc-second", UnitType::Angular, 4.84813681109536e-6)
    }

    /// EPSG:9110 sexagesimal DMS (DDD.MMSSsss); has no linear SI factor
    pub fn sexagesimal_dms() -> Self {
        Self::new(
            ObjectIdentity::new("EPSG", "9110", "sexagesimal DMS"),
            UnitType::Angular,
            None,
        )
    }

    /// EPSG:9201 unity
    pub fn unity() -> Self {
        Self::wellknown("9201", "unity", UnitType::Scale, 1.0)
    }

    /// EPSG:9202 parts per million
    pub fn parts_per_million() -> Self {
        Self::wellknown("9202", "parts per million", UnitType::Scale, 1e-6)
    }

    /// EPSG:1029 year
    pub fn year() -> Self {
        Self::wellknown("1029", "year", UnitType::Time, 1.0)
    }

    /// True when this is the sexagesimal DDD.MMSSsss pseudo-unit.
    pub fn is_sexagesimal(&self) -> bool {
        self.to_si.is_none() && self.unit_type == UnitType::Angular
    }

    pub fn is_equivalent_to(
        &self,
        other: &Self,
        criterion: ComparisonCriterion,
    ) -> bool {
        if self.unit_type != other.unit_type {
            return false;
        }
        if criterion == ComparisonCriterion::Strict && self.identity != other.identity
        {
            return false;
        }
        match (self.to_si, other.to_si) {
            (Some(a), Some(b)) => float_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

/// A value bound to its unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    pub value: f64,
    pub unit: UnitOfMeasure,
}

impl Measure {
    pub fn new(value: f64, unit: UnitOfMeasure) -> Self {
        Self { value, unit }
    }

    /// Value in the SI base unit of this measure's type.
    ///
    /// Sexagesimal DMS values are decoded digit-field by digit-field:
    /// DDD.MMSSsss means DDD degrees, MM minutes, SS.sss seconds.
    pub fn to_si(&self) -> f64 {
        match self.unit.to_si {
            Some(factor) => self.value * factor,
            None => decode_sexagesimal(self.value) * UnitOfMeasure::degree().to_si.unwrap_or(1.0),
        }
    }

    /// Value converted to degrees; only meaningful for angular measures.
    pub fn to_degrees(&self) -> f64 {
        if self.unit.is_sexagesimal() {
            return decode_sexagesimal(self.value);
        }
        let deg = UnitOfMeasure::degree();
        match (self.unit.to_si, deg.to_si) {
            (Some(f), Some(d)) => self.value * f / d,
            _ => self.value,
        }
    }

    pub fn is_equivalent_to(
        &self,
        other: &Self,
        criterion: ComparisonCriterion,
    ) -> bool {
        if criterion == ComparisonCriterion::Strict {
            return float_eq(self.value, other.value)
                && self.unit.is_equivalent_to(&other.unit, criterion);
        }
        // Same physical quantity regardless of the unit it is expressed in.
        self.unit.unit_type == other.unit.unit_type && float_eq(self.to_si(), other.to_si())
    }
}

/// Decode DDD.MMSSsss into decimal degrees, preserving sign.
fn decode_sexagesimal(value: f64) -> f64 {
    let sign = if value < 0.0 { -1.0 } else { 1.0 };
    let v = value.abs();
    let degrees = v.trunc();
    let frac = v - degrees;
    let minutes = (frac * 100.0).trunc();
    let seconds = (frac * 100.0 - minutes) * 100.0;
    sign * (degrees + minutes / 60.0 + seconds / 3600.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degree_to_si() {
        let m = Measure::new(180.0, UnitOfMeasure::degree());
        assert!((m.to_si() - std::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn sexagesimal_decode() {
        // 53°00'19.444..." expressed as 53.0019444444
        let m = Measure::new(53.0019444444, UnitOfMeasure::sexagesimal_dms());
        assert!((m.to_degrees() - 53.00540123456).abs() < 1e-6);

        let neg = Measure::new(-17.40, UnitOfMeasure::sexagesimal_dms());
        assert!((neg.to_degrees() + 17.6666666667).abs() < 1e-6);
    }

    #[test]
    fn cross_unit_equivalence() {
        let deg = Measure::new(1.0, UnitOfMeasure::degree());
        let sec = Measure::new(3600.0, UnitOfMeasure::arc_second());
        assert!(deg.is_equivalent_to(&sec, ComparisonCriterion::Equivalent));
        assert!(!deg.is_equivalent_to(&sec, ComparisonCriterion::Strict));
    }

    #[test]
    fn unit_type_roundtrip() {
        for t in [
            UnitType::Linear,
            UnitType::Angular,
            UnitType::Scale,
            UnitType::Time,
        ] {
            assert_eq!(UnitType::parse(t.as_str()), Some(t));
        }
        assert_eq!(UnitType::parse("volume"), None);
    }
}
