//! Flattening a resolved operation into primitive steps
//!
//! One kernel table keyed by registry method code. Concatenations are
//! flattened member by member, honouring each member's inversion marker;
//! the result is simplified (cancelling adjacent steps elided) before it is
//! returned.

use crate::error::{PipelineError, PipelineResult};
use crate::simplify::simplify;
use crate::step::{HelmertRates, Pipeline, PipelineStep, RotationConvention};
use graticule_core::operation::{method, parameter};
use graticule_core::{
    CoordinateOperation, Crs, Ellipsoid, Measure, SingleOperation, UnitOfMeasure,
};
use tracing::debug;

/// Flatten `operation` into an executable pipeline.
pub fn compose(operation: &CoordinateOperation) -> PipelineResult<Pipeline> {
    let mut steps = Vec::new();
    flatten(operation, false, &mut steps)?;
    let pipeline = simplify(Pipeline::new(steps));
    debug!(
        operation = %operation.identity(),
        steps = pipeline.len(),
        "Composed pipeline"
    );
    Ok(pipeline)
}

fn flatten(
    operation: &CoordinateOperation,
    inverted: bool,
    out: &mut Vec<PipelineStep>,
) -> PipelineResult<()> {
    match operation {
        CoordinateOperation::Concatenated(c) => {
            if inverted {
                for member in c.steps.iter().rev() {
                    flatten(&member.operation, !member.inverted, out)?;
                }
            } else {
                for member in &c.steps {
                    flatten(&member.operation, member.inverted, out)?;
                }
            }
            Ok(())
        }
        CoordinateOperation::Conversion(s)
        | CoordinateOperation::Transformation(s)
        | CoordinateOperation::PointMotion(s) => {
            let kernel = kernel_steps(s)?;
            if inverted {
                out.extend(kernel.iter().rev().map(PipelineStep::inverse));
            } else {
                out.extend(kernel);
            }
            Ok(())
        }
    }
}

/// The primitive steps of one single operation, forward direction.
fn kernel_steps(op: &SingleOperation) -> PipelineResult<Vec<PipelineStep>> {
    match op.method.code() {
        method::IDENTITY => Ok(vec![PipelineStep::NoOp]),

        method::TRANSVERSE_MERCATOR => {
            let lat_0 = required_degrees(op, parameter::LATITUDE_OF_NATURAL_ORIGIN)?;
            let lon_0 = required_degrees(op, parameter::LONGITUDE_OF_NATURAL_ORIGIN)?;
            check_latitude("lat_0", lat_0)?;
            let k = required_si(op, parameter::SCALE_FACTOR_AT_NATURAL_ORIGIN)?;
            let x_0 = required_si(op, parameter::FALSE_EASTING)?;
            let y_0 = required_si(op, parameter::FALSE_NORTHING)?;
            Ok(vec![PipelineStep::Projection {
                method_code: op.method.code().to_string(),
                params: vec![
                    ("lat_0".to_string(), lat_0),
                    ("lon_0".to_string(), lon_0),
                    ("k".to_string(), k),
                    ("x_0".to_string(), x_0),
                    ("y_0".to_string(), y_0),
                ],
                frame: op
                    .source_crs
                    .as_deref()
                    .and_then(Crs::datum_or_ensemble)
                    .cloned(),
            }])
        }

        method::GEOGRAPHIC_GEOCENTRIC => {
            let (src, tgt) = endpoints(op)?;
            let ellipsoid = ellipsoid_of(src)
                .or_else(|| ellipsoid_of(tgt))
                .ok_or_else(|| {
                    PipelineError::InvalidOperation(format!(
                        "'{}' has no ellipsoid to parametrize the cartesian conversion",
                        op.identity.name
                    ))
                })?
                .clone();
            let cart = PipelineStep::GeographicGeocentric { ellipsoid };
            if src.is_geocentric() {
                Ok(vec![PipelineStep::Invert(Box::new(cart))])
            } else {
                Ok(vec![cart])
            }
        }

        code if op.method.is_helmert_family() => {
            let helmert = PipelineStep::Helmert {
                x: required_si(op, parameter::X_AXIS_TRANSLATION)?,
                y: required_si(op, parameter::Y_AXIS_TRANSLATION)?,
                z: required_si(op, parameter::Z_AXIS_TRANSLATION)?,
                rx: optional_arcsec(op, parameter::X_AXIS_ROTATION),
                ry: optional_arcsec(op, parameter::Y_AXIS_ROTATION),
                rz: optional_arcsec(op, parameter::Z_AXIS_ROTATION),
                s: optional_ppm(op, parameter::SCALE_DIFFERENCE),
                rates: helmert_rates(op, code)?,
                epoch: helmert_epoch(op, code)?,
                convention: match code {
                    method::COORDINATE_FRAME | method::TIME_DEPENDENT_COORDINATE_FRAME => {
                        RotationConvention::CoordinateFrame
                    }
                    _ => RotationConvention::PositionVector,
                },
                exact: false,
            };
            sandwich_in_geocentric(op, helmert)
        }

        method::NTV2 => {
            let file = op
                .parameter(parameter::LAT_LON_DIFFERENCE_FILE)
                .and_then(|p| match &p.value {
                    graticule_core::ParameterValue::File(f) => Some(f.clone()),
                    graticule_core::ParameterValue::Measure(_) => None,
                })
                .ok_or_else(|| missing(op, parameter::LAT_LON_DIFFERENCE_FILE))?;
            Ok(vec![PipelineStep::GridShift { file }])
        }

        method::LONGITUDE_ROTATION => Ok(vec![offset_step(
            0.0,
            required_arcsec(op, parameter::LONGITUDE_OFFSET)?,
            0.0,
        )]),

        method::GEOGRAPHIC2D_OFFSETS => Ok(vec![offset_step(
            optional_arcsec(op, parameter::LATITUDE_OFFSET),
            optional_arcsec(op, parameter::LONGITUDE_OFFSET),
            0.0,
        )]),

        method::VERTICAL_OFFSET => Ok(vec![offset_step(
            0.0,
            0.0,
            required_si(op, parameter::VERTICAL_OFFSET)?,
        )]),

        method::HEIGHT_DEPTH_REVERSAL => Ok(vec![PipelineStep::AxisSwap {
            order: vec![1, 2, -3],
        }]),

        method::CHANGE_OF_VERTICAL_UNIT => {
            let z = vertical_units(op)?;
            Ok(vec![PipelineStep::UnitConvert { xy: None, z: Some(z) }])
        }

        method::AFFINE_PARAMETRIC => Ok(vec![PipelineStep::Affine {
            xoff: required_si(op, parameter::AFFINE_A0)?,
            s11: required_si(op, parameter::AFFINE_A1)?,
            s12: required_si(op, parameter::AFFINE_A2)?,
            yoff: required_si(op, parameter::AFFINE_B0)?,
            s21: required_si(op, parameter::AFFINE_B1)?,
            s22: required_si(op, parameter::AFFINE_B2)?,
        }]),

        other => Err(PipelineError::UnknownMethod {
            code: other.to_string(),
            name: op.method.identity.name.clone(),
        }),
    }
}

/// All-zero offsets collapse to a no-op (the ballpark fallback case).
fn offset_step(dlat: f64, dlon: f64, dh: f64) -> PipelineStep {
    if dlat == 0.0 && dlon == 0.0 && dh == 0.0 {
        PipelineStep::NoOp
    } else {
        PipelineStep::GeographicOffset { dlat, dlon, dh }
    }
}

/// Wrap a geocentric kernel for its declared CRS domain: geographic
/// endpoints get the push / cart / kernel / inverse-cart / pop sandwich,
/// geocentric endpoints run the kernel bare.
fn sandwich_in_geocentric(
    op: &SingleOperation,
    kernel: PipelineStep,
) -> PipelineResult<Vec<PipelineStep>> {
    let (src, tgt) = endpoints(op)?;
    if src.is_geocentric() && tgt.is_geocentric() {
        return Ok(vec![kernel]);
    }
    if !(src.is_geographic() && tgt.is_geographic()) {
        return Err(PipelineError::InvalidOperation(format!(
            "'{}' mixes geographic and geocentric endpoints",
            op.identity.name
        )));
    }
    let src_ellipsoid = ellipsoid_of(src)
        .ok_or_else(|| {
            PipelineError::InvalidOperation(format!(
                "'{}' source CRS lacks an ellipsoid",
                op.identity.name
            ))
        })?
        .clone();
    let tgt_ellipsoid = ellipsoid_of(tgt)
        .ok_or_else(|| {
            PipelineError::InvalidOperation(format!(
                "'{}' target CRS lacks an ellipsoid",
                op.identity.name
            ))
        })?
        .clone();
    Ok(vec![
        PipelineStep::Push { dims: vec![3] },
        PipelineStep::GeographicGeocentric {
            ellipsoid: src_ellipsoid,
        },
        kernel,
        PipelineStep::Invert(Box::new(PipelineStep::GeographicGeocentric {
            ellipsoid: tgt_ellipsoid,
        })),
        PipelineStep::Pop { dims: vec![3] },
    ])
}

fn helmert_rates(op: &SingleOperation, code: &str) -> PipelineResult<Option<HelmertRates>> {
    if !matches!(
        code,
        method::TIME_DEPENDENT_POSITION_VECTOR | method::TIME_DEPENDENT_COORDINATE_FRAME
    ) {
        return Ok(None);
    }
    Ok(Some(HelmertRates {
        dx: required_si(op, parameter::RATE_X_TRANSLATION)?,
        dy: required_si(op, parameter::RATE_Y_TRANSLATION)?,
        dz: required_si(op, parameter::RATE_Z_TRANSLATION)?,
        drx: optional_arcsec(op, parameter::RATE_X_ROTATION),
        dry: optional_arcsec(op, parameter::RATE_Y_ROTATION),
        drz: optional_arcsec(op, parameter::RATE_Z_ROTATION),
        ds: optional_ppm(op, parameter::RATE_SCALE_DIFFERENCE),
    }))
}

fn helmert_epoch(op: &SingleOperation, code: &str) -> PipelineResult<Option<f64>> {
    if !matches!(
        code,
        method::TIME_DEPENDENT_POSITION_VECTOR | method::TIME_DEPENDENT_COORDINATE_FRAME
    ) {
        return Ok(None);
    }
    Ok(Some(required_si(op, parameter::REFERENCE_EPOCH)?))
}

/// z-axis units of the change-of-vertical-unit kernel: the endpoint CRS
/// axes when both are present, the declared scalar against the metre
/// otherwise.
fn vertical_units(
    op: &SingleOperation,
) -> PipelineResult<(UnitOfMeasure, UnitOfMeasure)> {
    let axis_unit = |crs: &Crs| {
        crs.coordinate_system()
            .and_then(|cs| cs.axes.first())
            .map(|a| a.unit.clone())
    };
    if let (Some(src), Some(tgt)) = (op.source_crs.as_deref(), op.target_crs.as_deref()) {
        if let (Some(from), Some(to)) = (axis_unit(src), axis_unit(tgt)) {
            return Ok((from, to));
        }
    }
    let scalar = required_si(op, parameter::UNIT_CONVERSION_SCALAR)?;
    Ok((
        UnitOfMeasure::metre(),
        UnitOfMeasure::new(
            graticule_core::ObjectIdentity::anonymous("derived vertical unit"),
            graticule_core::UnitType::Linear,
            Some(scalar),
        ),
    ))
}

fn endpoints(op: &SingleOperation) -> PipelineResult<(&Crs, &Crs)> {
    match (op.source_crs.as_deref(), op.target_crs.as_deref()) {
        (Some(s), Some(t)) => Ok((s, t)),
        _ => Err(PipelineError::InvalidOperation(format!(
            "'{}' lacks source/target CRS",
            op.identity.name
        ))),
    }
}

fn ellipsoid_of(crs: &Crs) -> Option<&Ellipsoid> {
    crs.datum_or_ensemble().and_then(|d| d.ellipsoid())
}

fn check_latitude(name: &str, value: f64) -> PipelineResult<()> {
    if value.abs() > 90.0 {
        return Err(PipelineError::OutsideDomain {
            name: name.to_string(),
            value,
            domain: "[-90, 90]".to_string(),
        });
    }
    Ok(())
}

fn missing(op: &SingleOperation, code: &str) -> PipelineError {
    PipelineError::MissingParameter {
        operation: op.identity.name.clone(),
        code: code.to_string(),
    }
}

fn required_measure<'a>(op: &'a SingleOperation, code: &str) -> PipelineResult<&'a Measure> {
    op.parameter(code)
        .and_then(|p| p.as_measure())
        .ok_or_else(|| missing(op, code))
}

fn required_si(op: &SingleOperation, code: &str) -> PipelineResult<f64> {
    Ok(required_measure(op, code)?.to_si())
}

fn required_degrees(op: &SingleOperation, code: &str) -> PipelineResult<f64> {
    Ok(required_measure(op, code)?.to_degrees())
}

fn required_arcsec(op: &SingleOperation, code: &str) -> PipelineResult<f64> {
    Ok(required_measure(op, code)?.to_degrees() * 3600.0)
}

fn optional_arcsec(op: &SingleOperation, code: &str) -> f64 {
    op.parameter(code)
        .and_then(|p| p.as_measure())
        .map(|m| m.to_degrees() * 3600.0)
        .unwrap_or(0.0)
}

fn optional_ppm(op: &SingleOperation, code: &str) -> f64 {
    op.parameter(code)
        .and_then(|p| p.as_measure())
        .map(|m| m.to_si() * 1e6)
        .unwrap_or(0.0)
}
