//! Coordinate operations: conversions, transformations, point motion
//! operations and concatenations
//!
//! The kind set is stable, so operations are a closed sum type rather than
//! a trait hierarchy; the resolver's ranking, the pipeline flattener and
//! the exporter all match on it exhaustively.

use crate::compare::{float_eq, option_eq, ComparisonCriterion};
use crate::crs::Crs;
use crate::error::{GeodeticError, GeodeticResult};
use crate::extent::{effective_extent, Extent, Usage};
use crate::identifier::ObjectIdentity;
use crate::units::Measure;
use serde::{Deserialize, Serialize};

/// EPSG method codes for the operation kernels the composer understands.
pub mod method {
    /// Transverse Mercator
    pub const TRANSVERSE_MERCATOR: &str = "9807";
    /// Geographic/geocentric conversions
    pub const GEOGRAPHIC_GEOCENTRIC: &str = "9602";
    /// Geocentric translations (geog2D domain)
    pub const GEOCENTRIC_TRANSLATIONS: &str = "9603";
    /// Position Vector transformation (geog2D domain)
    pub const POSITION_VECTOR: &str = "9606";
    /// Coordinate Frame rotation (geog2D domain)
    pub const COORDINATE_FRAME: &str = "9607";
    /// Time-dependent Position Vector transformation
    pub const TIME_DEPENDENT_POSITION_VECTOR: &str = "1053";
    /// Time-dependent Coordinate Frame rotation
    pub const TIME_DEPENDENT_COORDINATE_FRAME: &str = "1056";
    /// NTv2 grid shift
    pub const NTV2: &str = "9615";
    /// Longitude rotation
    pub const LONGITUDE_ROTATION: &str = "9601";
    /// Geographic2D offsets
    pub const GEOGRAPHIC2D_OFFSETS: &str = "9619";
    /// Vertical offset
    pub const VERTICAL_OFFSET: &str = "9616";
    /// Height depth reversal
    pub const HEIGHT_DEPTH_REVERSAL: &str = "1068";
    /// Change of vertical unit
    pub const CHANGE_OF_VERTICAL_UNIT: &str = "1069";
    /// Affine parametric transformation
    pub const AFFINE_PARAMETRIC: &str = "9624";
    /// Synthetic identity between equivalent CRS; not a registry code.
    pub const IDENTITY: &str = "identity";
}

/// EPSG parameter codes used by the kernels above.
pub mod parameter {
    pub const LATITUDE_OF_NATURAL_ORIGIN: &str = "8801";
    pub const LONGITUDE_OF_NATURAL_ORIGIN: &str = "8802";
    pub const SCALE_FACTOR_AT_NATURAL_ORIGIN: &str = "8805";
    pub const FALSE_EASTING: &str = "8806";
    pub const FALSE_NORTHING: &str = "8807";
    pub const X_AXIS_TRANSLATION: &str = "8605";
    pub const Y_AXIS_TRANSLATION: &str = "8606";
    pub const Z_AXIS_TRANSLATION: &str = "8607";
    pub const X_AXIS_ROTATION: &str = "8608";
    pub const Y_AXIS_ROTATION: &str = "8609";
    pub const Z_AXIS_ROTATION: &str = "8610";
    pub const SCALE_DIFFERENCE: &str = "8611";
    pub const RATE_X_TRANSLATION: &str = "1040";
    pub const RATE_Y_TRANSLATION: &str = "1041";
    pub const RATE_Z_TRANSLATION: &str = "1042";
    pub const RATE_X_ROTATION: &str = "1043";
    pub const RATE_Y_ROTATION: &str = "1044";
    pub const RATE_Z_ROTATION: &str = "1045";
    pub const RATE_SCALE_DIFFERENCE: &str = "1046";
    pub const REFERENCE_EPOCH: &str = "1047";
    pub const LATITUDE_OFFSET: &str = "8601";
    pub const LONGITUDE_OFFSET: &str = "8602";
    pub const VERTICAL_OFFSET: &str = "8603";
    pub const LAT_LON_DIFFERENCE_FILE: &str = "8656";
    pub const UNIT_CONVERSION_SCALAR: &str = "1051";
    pub const AFFINE_A0: &str = "8623";
    pub const AFFINE_A1: &str = "8624";
    pub const AFFINE_A2: &str = "8625";
    pub const AFFINE_B0: &str = "8639";
    pub const AFFINE_B1: &str = "8640";
    pub const AFFINE_B2: &str = "8641";
}

/// A formula family identified by its registry method code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationMethod {
    pub identity: ObjectIdentity,
}

impl OperationMethod {
    pub fn new(identity: ObjectIdentity) -> Self {
        Self { identity }
    }

    pub fn epsg(code: &str, name: &str) -> Self {
        Self::new(ObjectIdentity::new("EPSG", code, name))
    }

    pub fn code(&self) -> &str {
        &self.identity.code
    }

    /// Helmert family: translations, optional rotations/scale, optional
    /// time-dependent rate terms.
    pub fn is_helmert_family(&self) -> bool {
        matches!(
            self.code(),
            method::GEOCENTRIC_TRANSLATIONS
                | method::POSITION_VECTOR
                | method::COORDINATE_FRAME
                | method::TIME_DEPENDENT_POSITION_VECTOR
                | method::TIME_DEPENDENT_COORDINATE_FRAME
        )
    }

    /// Offset family: inverse is obtained by negating every offset.
    pub fn is_offset_family(&self) -> bool {
        matches!(
            self.code(),
            method::LONGITUDE_ROTATION
                | method::GEOGRAPHIC2D_OFFSETS
                | method::VERTICAL_OFFSET
        )
    }

    pub fn is_grid_based(&self) -> bool {
        matches!(self.code(), method::NTV2)
    }

    /// Map projection methods; their inverse is a formula mode switch, not
    /// a parameter negation, so they get an invert marker instead.
    pub fn is_map_projection(&self) -> bool {
        matches!(self.code(), method::TRANSVERSE_MERCATOR)
    }
}

/// A parameter value: a unit-bearing measure or a grid-file reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterValue {
    Measure(Measure),
    File(String),
}

/// One named, coded parameter of an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationParameter {
    pub name: String,
    pub code: String,
    pub value: ParameterValue,
}

impl OperationParameter {
    pub fn measure(name: impl Into<String>, code: impl Into<String>, m: Measure) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            value: ParameterValue::Measure(m),
        }
    }

    pub fn file(name: impl Into<String>, code: impl Into<String>, f: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            value: ParameterValue::File(f.into()),
        }
    }

    pub fn as_measure(&self) -> Option<&Measure> {
        match &self.value {
            ParameterValue::Measure(m) => Some(m),
            ParameterValue::File(_) => None,
        }
    }

    fn is_equivalent_to(&self, other: &Self, criterion: ComparisonCriterion) -> bool {
        if self.code != other.code {
            return false;
        }
        match (&self.value, &other.value) {
            (ParameterValue::Measure(a), ParameterValue::Measure(b)) => {
                a.is_equivalent_to(b, criterion)
            }
            (ParameterValue::File(a), ParameterValue::File(b)) => a == b,
            _ => false,
        }
    }
}

/// Kind discriminant for single (non-concatenated) operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SingleKind {
    /// Zero error by definition (e.g. a map projection).
    Conversion,
    /// Datum-changing operation carrying an accuracy estimate.
    Transformation,
    /// Coordinate change over time within one CRS.
    PointMotion,
}

/// A single coordinate operation: one method, ordered parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleOperation {
    pub identity: ObjectIdentity,
    pub kind: SingleKind,
    /// Conversions may lack CRS when used as a template (a projection
    /// method awaiting a base CRS).
    pub source_crs: Option<Box<Crs>>,
    pub target_crs: Option<Box<Crs>>,
    pub method: OperationMethod,
    pub parameters: Vec<OperationParameter>,
    /// Declared accuracy in metres; `None` when unknown.
    pub accuracy: Option<f64>,
    pub usages: Vec<Usage>,
    pub operation_version: Option<String>,
}

impl SingleOperation {
    pub fn parameter(&self, code: &str) -> Option<&OperationParameter> {
        self.parameters.iter().find(|p| p.code == code)
    }

    /// The method's algebraic inverse, when one exists.
    ///
    /// Helmert-family methods negate translations, rotations, scale
    /// difference and the rate terms; offset methods negate every offset.
    /// Grid-based methods and map projections have no parametric inverse
    /// and return `None` (callers wrap those with an invert marker).
    pub fn algebraic_inverse(&self) -> Option<SingleOperation> {
        if !(self.method.is_helmert_family() || self.method.is_offset_family()) {
            return None;
        }
        let parameters = self
            .parameters
            .iter()
            .map(|p| {
                let value = match &p.value {
                    // The reference epoch is a point in time, not a delta.
                    ParameterValue::Measure(m) if p.code != parameter::REFERENCE_EPOCH => {
                        ParameterValue::Measure(Measure::new(-m.value, m.unit.clone()))
                    }
                    other => other.clone(),
                };
                OperationParameter {
                    name: p.name.clone(),
                    code: p.code.clone(),
                    value,
                }
            })
            .collect();
        Some(SingleOperation {
            identity: ObjectIdentity::anonymous(format!(
                "Inverse of {}",
                self.identity.name
            )),
            kind: self.kind,
            source_crs: self.target_crs.clone(),
            target_crs: self.source_crs.clone(),
            method: self.method.clone(),
            parameters,
            accuracy: self.accuracy,
            usages: self.usages.clone(),
            operation_version: self.operation_version.clone(),
        })
    }

    pub fn is_equivalent_to(
        &self,
        other: &Self,
        criterion: ComparisonCriterion,
    ) -> bool {
        if criterion.is_strict() && self.identity != other.identity {
            return false;
        }
        if self.kind != other.kind
            || self.method.code() != other.method.code()
            || self.parameters.len() != other.parameters.len()
        {
            return false;
        }
        let params_match = self.parameters.iter().all(|p| {
            other
                .parameters
                .iter()
                .any(|q| p.is_equivalent_to(q, criterion))
        });
        if !params_match {
            return false;
        }
        // A template conversion (no CRS yet) matches its instantiation with
        // source/target filled in, except under strict comparison.
        let crs_eq = |a: &Option<Box<Crs>>, b: &Option<Box<Crs>>| match (a, b) {
            (Some(x), Some(y)) => x.is_equivalent_to(y, criterion.for_nested()),
            (None, None) => true,
            _ => !criterion.is_strict(),
        };
        crs_eq(&self.source_crs, &other.source_crs)
            && crs_eq(&self.target_crs, &other.target_crs)
    }
}

/// One member of a concatenation, with its explicit inversion marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationStep {
    pub operation: CoordinateOperation,
    pub inverted: bool,
}

impl OperationStep {
    pub fn forward(operation: CoordinateOperation) -> Self {
        Self {
            operation,
            inverted: false,
        }
    }

    pub fn inverted(operation: CoordinateOperation) -> Self {
        Self {
            operation,
            inverted: true,
        }
    }

    /// CRS this step consumes, honouring the inversion marker.
    pub fn effective_source(&self) -> Option<&Crs> {
        if self.inverted {
            self.operation.target_crs()
        } else {
            self.operation.source_crs()
        }
    }

    /// CRS this step produces, honouring the inversion marker.
    pub fn effective_target(&self) -> Option<&Crs> {
        if self.inverted {
            self.operation.source_crs()
        } else {
            self.operation.target_crs()
        }
    }
}

/// An ordered chain of >= 1 operations applied in sequence.
///
/// Registry-declared concatenations always have >= 2 members; a single
/// inverted step is how a non-parametrically-invertible operation (grid
/// shift, map projection, nested concatenation) is flipped without
/// pretending an algebraic inverse exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcatenatedOperation {
    pub identity: ObjectIdentity,
    pub steps: Vec<OperationStep>,
    pub source_crs: Option<Box<Crs>>,
    pub target_crs: Option<Box<Crs>>,
    pub accuracy: Option<f64>,
    pub usages: Vec<Usage>,
    pub operation_version: Option<String>,
}

impl ConcatenatedOperation {
    /// Build a concatenation, verifying that consecutive steps chain
    /// literally (each member's effective target equals the next member's
    /// effective source, after per-member inversion).
    pub fn new(
        identity: ObjectIdentity,
        steps: Vec<OperationStep>,
    ) -> GeodeticResult<Self> {
        if steps.len() < 2 {
            return Err(GeodeticError::InvalidConcatenation(format!(
                "concatenation needs at least 2 steps, got {}",
                steps.len()
            )));
        }
        for pair in steps.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            match (prev.effective_target(), next.effective_source()) {
                (Some(t), Some(s))
                    if t.is_equivalent_to(s, ComparisonCriterion::Equivalent) => {}
                (None, _) | (_, None) => {
                    return Err(GeodeticError::InvalidConcatenation(format!(
                        "step '{}' lacks a CRS to chain on",
                        prev.operation.identity().name
                    )));
                }
                (Some(t), Some(s)) => {
                    return Err(GeodeticError::InvalidConcatenation(format!(
                        "step '{}' ends at '{}' but next step starts at '{}'",
                        prev.operation.identity().name,
                        t.name(),
                        s.name()
                    )));
                }
            }
        }
        let source_crs = steps
            .first()
            .and_then(|s| s.effective_source())
            .cloned()
            .map(Box::new);
        let target_crs = steps
            .last()
            .and_then(|s| s.effective_target())
            .cloned()
            .map(Box::new);
        // Accuracies accumulate; unknown anywhere makes the sum unknown.
        let accuracy = steps
            .iter()
            .map(|s| s.operation.accuracy())
            .try_fold(0.0, |acc, a| a.map(|a| acc + a));
        Ok(Self {
            identity,
            steps,
            source_crs,
            target_crs,
            accuracy,
            usages: Vec::new(),
            operation_version: None,
        })
    }

    /// Wrap one non-invertible operation with an invert marker.
    pub fn inverse_marker(operation: CoordinateOperation) -> Self {
        let name = format!("Inverse of {}", operation.identity().name);
        let accuracy = operation.accuracy();
        let usages = operation.usages().to_vec();
        let source_crs = operation.target_crs().cloned().map(Box::new);
        let target_crs = operation.source_crs().cloned().map(Box::new);
        Self {
            identity: ObjectIdentity::anonymous(name),
            steps: vec![OperationStep::inverted(operation)],
            source_crs,
            target_crs,
            accuracy,
            usages,
            operation_version: None,
        }
    }
}

/// Closed sum over the operation kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CoordinateOperation {
    Conversion(SingleOperation),
    Transformation(SingleOperation),
    PointMotion(SingleOperation),
    Concatenated(ConcatenatedOperation),
}

impl CoordinateOperation {
    /// Wrap a single operation in the variant matching its kind tag.
    pub fn from_single(op: SingleOperation) -> Self {
        match op.kind {
            SingleKind::Conversion => CoordinateOperation::Conversion(op),
            SingleKind::Transformation => CoordinateOperation::Transformation(op),
            SingleKind::PointMotion => CoordinateOperation::PointMotion(op),
        }
    }

    pub fn as_single(&self) -> Option<&SingleOperation> {
        match self {
            CoordinateOperation::Conversion(s)
            | CoordinateOperation::Transformation(s)
            | CoordinateOperation::PointMotion(s) => Some(s),
            CoordinateOperation::Concatenated(_) => None,
        }
    }

    pub fn as_concatenated(&self) -> Option<&ConcatenatedOperation> {
        match self {
            CoordinateOperation::Concatenated(c) => Some(c),
            _ => None,
        }
    }

    pub fn identity(&self) -> &ObjectIdentity {
        match self {
            CoordinateOperation::Conversion(s)
            | CoordinateOperation::Transformation(s)
            | CoordinateOperation::PointMotion(s) => &s.identity,
            CoordinateOperation::Concatenated(c) => &c.identity,
        }
    }

    pub fn source_crs(&self) -> Option<&Crs> {
        match self {
            CoordinateOperation::Conversion(s)
            | CoordinateOperation::Transformation(s)
            | CoordinateOperation::PointMotion(s) => s.source_crs.as_deref(),
            CoordinateOperation::Concatenated(c) => c.source_crs.as_deref(),
        }
    }

    pub fn target_crs(&self) -> Option<&Crs> {
        match self {
            CoordinateOperation::Conversion(s)
            | CoordinateOperation::Transformation(s)
            | CoordinateOperation::PointMotion(s) => s.target_crs.as_deref(),
            CoordinateOperation::Concatenated(c) => c.target_crs.as_deref(),
        }
    }

    pub fn accuracy(&self) -> Option<f64> {
        match self {
            // A conversion is errorless by definition.
            CoordinateOperation::Conversion(_) => Some(0.0),
            CoordinateOperation::Transformation(s)
            | CoordinateOperation::PointMotion(s) => s.accuracy,
            CoordinateOperation::Concatenated(c) => c.accuracy,
        }
    }

    pub fn usages(&self) -> &[Usage] {
        match self {
            CoordinateOperation::Conversion(s)
            | CoordinateOperation::Transformation(s)
            | CoordinateOperation::PointMotion(s) => &s.usages,
            CoordinateOperation::Concatenated(c) => &c.usages,
        }
    }

    pub fn extent(&self) -> Extent {
        effective_extent(self.usages())
    }

    pub fn is_deprecated(&self) -> bool {
        self.identity().deprecated
    }

    /// Direction-corrected view of this operation.
    ///
    /// Parametrically invertible single operations get their algebraic
    /// inverse; anything else (grid shifts, map projections, nested
    /// concatenations) is wrapped with an explicit invert marker. A
    /// concatenation is inverted by reversing its steps and toggling each
    /// member's marker, never by flipping members' parameters blindly.
    pub fn inverse(&self) -> CoordinateOperation {
        match self {
            CoordinateOperation::Concatenated(c) => {
                let steps = c
                    .steps
                    .iter()
                    .rev()
                    .map(|s| OperationStep {
                        operation: s.operation.clone(),
                        inverted: !s.inverted,
                    })
                    .collect();
                CoordinateOperation::Concatenated(ConcatenatedOperation {
                    identity: ObjectIdentity::anonymous(format!(
                        "Inverse of {}",
                        c.identity.name
                    )),
                    steps,
                    source_crs: c.target_crs.clone(),
                    target_crs: c.source_crs.clone(),
                    accuracy: c.accuracy,
                    usages: c.usages.clone(),
                    operation_version: c.operation_version.clone(),
                })
            }
            CoordinateOperation::Conversion(s)
            | CoordinateOperation::Transformation(s)
            | CoordinateOperation::PointMotion(s) => match s.algebraic_inverse() {
                Some(inv) => CoordinateOperation::from_single(inv),
                None => CoordinateOperation::Concatenated(
                    ConcatenatedOperation::inverse_marker(self.clone()),
                ),
            },
        }
    }

    pub fn is_equivalent_to(
        &self,
        other: &Self,
        criterion: ComparisonCriterion,
    ) -> bool {
        match (self, other) {
            (CoordinateOperation::Concatenated(a), CoordinateOperation::Concatenated(b)) => {
                if criterion.is_strict() && a.identity != b.identity {
                    return false;
                }
                a.steps.len() == b.steps.len()
                    && a.steps.iter().zip(&b.steps).all(|(x, y)| {
                        x.inverted == y.inverted
                            && x.operation.is_equivalent_to(&y.operation, criterion)
                    })
            }
            // An invert marker around X is equivalent to the inverse of X.
            (CoordinateOperation::Concatenated(a), b) if a.steps.len() == 1 => {
                let step = &a.steps[0];
                if step.inverted {
                    step.operation.is_equivalent_to(&b.inverse(), criterion)
                } else {
                    step.operation.is_equivalent_to(b, criterion)
                }
            }
            (a, CoordinateOperation::Concatenated(_)) => other.is_equivalent_to(a, criterion),
            _ => match (self.as_single(), other.as_single()) {
                (Some(a), Some(b)) => a.is_equivalent_to(b, criterion),
                _ => false,
            },
        }
    }

    /// Equivalence up to direction, used by the resolver to deduplicate
    /// forward hits against inversion-marked reverse hits.
    pub fn is_equivalent_up_to_direction(&self, other: &Self) -> bool {
        self.is_equivalent_to(other, ComparisonCriterion::Equivalent)
            || self
                .inverse()
                .is_equivalent_to(other, ComparisonCriterion::Equivalent)
    }

    /// Accuracy with the resolver's ranking convention: unknown or zero
    /// accuracy sorts worst among transformations.
    pub fn ranking_accuracy(&self) -> f64 {
        match self.accuracy() {
            Some(a) if a > 0.0 => a,
            _ => f64::INFINITY,
        }
    }
}

/// True when both accuracies are known and equal within tolerance.
pub fn accuracy_eq(a: Option<f64>, b: Option<f64>) -> bool {
    option_eq(&a, &b, |x, y| float_eq(*x, *y))
}
