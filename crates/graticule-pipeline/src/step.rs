//! Primitive pipeline steps and the flat pipeline
//!
//! A step is the smallest unit of coordinate processing the exporter can
//! spell. The set is closed; the composer maps registry method codes onto
//! it and anything it cannot express fails at composition time, never
//! during execution.

use graticule_core::{DatumOrEnsemble, Ellipsoid, UnitOfMeasure};
use serde::{Deserialize, Serialize};

/// Rotation sign convention of a Helmert kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationConvention {
    PositionVector,
    CoordinateFrame,
}

impl RotationConvention {
    pub fn proj_tag(&self) -> &'static str {
        match self {
            RotationConvention::PositionVector => "position_vector",
            RotationConvention::CoordinateFrame => "coordinate_frame",
        }
    }
}

/// Time-dependent Helmert rate terms, evaluated against a reference epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelmertRates {
    /// Translation rates in metres per year.
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
    /// Rotation rates in arc-seconds per year.
    pub drx: f64,
    pub dry: f64,
    pub drz: f64,
    /// Scale-difference rate in ppm per year.
    pub ds: f64,
}

impl HelmertRates {
    fn negated(&self) -> Self {
        Self {
            dx: -self.dx,
            dy: -self.dy,
            dz: -self.dz,
            drx: -self.drx,
            dry: -self.dry,
            drz: -self.drz,
            ds: -self.ds,
        }
    }
}

/// One primitive step, applied left to right on a coordinate tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PipelineStep {
    /// Signed 1-based axis permutation, e.g. `[1, 2, -3]` flips the third
    /// axis in place (height/depth reversal).
    AxisSwap { order: Vec<i32> },
    /// Unit change on the horizontal pair and/or the vertical axis.
    UnitConvert {
        xy: Option<(UnitOfMeasure, UnitOfMeasure)>,
        z: Option<(UnitOfMeasure, UnitOfMeasure)>,
    },
    /// Save coordinate dimensions on the auxiliary stack (1-based).
    Push { dims: Vec<u8> },
    /// Restore coordinate dimensions from the auxiliary stack.
    Pop { dims: Vec<u8> },
    /// Geographic -> geocentric cartesian conversion over one ellipsoid.
    GeographicGeocentric { ellipsoid: Ellipsoid },
    /// Seven/fourteen-parameter similarity transformation in geocentric
    /// space. Translations in metres, rotations in arc-seconds, scale
    /// difference in ppm. `exact` selects the closed-form rotation formula
    /// over the small-angle approximation; it is always an explicit flag.
    Helmert {
        x: f64,
        y: f64,
        z: f64,
        rx: f64,
        ry: f64,
        rz: f64,
        s: f64,
        rates: Option<HelmertRates>,
        /// Reference epoch (decimal year) the rate terms count from.
        epoch: Option<f64>,
        convention: RotationConvention,
        exact: bool,
    },
    /// Grid-interpolated horizontal shift.
    GridShift { file: String },
    /// Constant offsets: dlat/dlon in arc-seconds, dh in metres.
    GeographicOffset { dlat: f64, dlon: f64, dh: f64 },
    /// First-order affine transformation of the horizontal pair.
    Affine {
        xoff: f64,
        yoff: f64,
        s11: f64,
        s12: f64,
        s21: f64,
        s22: f64,
    },
    /// An opaque map-projection kernel: method code plus its flags in
    /// canonical order (angles in degrees, lengths in metres). `frame`
    /// carries the base CRS datum for `+datum`/`+ellps` export.
    Projection {
        method_code: String,
        params: Vec<(String, f64)>,
        frame: Option<DatumOrEnsemble>,
    },
    NoOp,
    /// Run the wrapped step backward. Only steps without a parametric
    /// inverse are wrapped; everything else inverts in place.
    Invert(Box<PipelineStep>),
}

impl PipelineStep {
    /// The step running in the opposite direction.
    pub fn inverse(&self) -> PipelineStep {
        match self {
            PipelineStep::AxisSwap { order } => PipelineStep::AxisSwap {
                order: inverse_order(order),
            },
            PipelineStep::UnitConvert { xy, z } => PipelineStep::UnitConvert {
                xy: xy.clone().map(|(a, b)| (b, a)),
                z: z.clone().map(|(a, b)| (b, a)),
            },
            PipelineStep::Push { dims } => PipelineStep::Pop { dims: dims.clone() },
            PipelineStep::Pop { dims } => PipelineStep::Push { dims: dims.clone() },
            PipelineStep::Helmert {
                x,
                y,
                z,
                rx,
                ry,
                rz,
                s,
                rates,
                epoch,
                convention,
                exact,
            } => PipelineStep::Helmert {
                x: -x,
                y: -y,
                z: -z,
                rx: -rx,
                ry: -ry,
                rz: -rz,
                s: -s,
                rates: rates.as_ref().map(HelmertRates::negated),
                epoch: *epoch,
                convention: *convention,
                exact: *exact,
            },
            PipelineStep::GeographicOffset { dlat, dlon, dh } => {
                PipelineStep::GeographicOffset {
                    dlat: -dlat,
                    dlon: -dlon,
                    dh: -dh,
                }
            }
            PipelineStep::NoOp => PipelineStep::NoOp,
            PipelineStep::Invert(inner) => (**inner).clone(),
            // No parametric inverse: cart, grid interpolation, affine and
            // projection kernels run in inverse formula mode.
            other => PipelineStep::Invert(Box::new(other.clone())),
        }
    }
}

/// Inverse of a signed 1-based permutation.
fn inverse_order(order: &[i32]) -> Vec<i32> {
    let mut inv = vec![0; order.len()];
    for (i, &o) in order.iter().enumerate() {
        let slot = (o.unsigned_abs() as usize).saturating_sub(1).min(inv.len() - 1);
        let entry = (i + 1) as i32;
        inv[slot] = if o < 0 { -entry } else { entry };
    }
    inv
}

/// A flat, directionally correct step sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub steps: Vec<PipelineStep>,
}

impl Pipeline {
    pub fn new(steps: Vec<PipelineStep>) -> Self {
        Self { steps }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// The whole pipeline running backward: steps reversed, each inverted.
    pub fn inverse(&self) -> Pipeline {
        Pipeline {
            steps: self.steps.iter().rev().map(PipelineStep::inverse).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn height_depth_reversal_is_self_inverse() {
        let swap = PipelineStep::AxisSwap {
            order: vec![1, 2, -3],
        };
        assert_eq!(swap.inverse(), swap);
    }

    #[test]
    fn mixed_permutation_inverts() {
        let swap = PipelineStep::AxisSwap {
            order: vec![2, -1, 3],
        };
        let inv = swap.inverse();
        assert_eq!(
            inv,
            PipelineStep::AxisSwap {
                order: vec![-2, 1, 3]
            }
        );
        assert_eq!(inv.inverse(), swap);
    }

    #[test]
    fn push_pop_mirror() {
        let push = PipelineStep::Push { dims: vec![3] };
        assert_eq!(push.inverse(), PipelineStep::Pop { dims: vec![3] });
        assert_eq!(push.inverse().inverse(), push);
    }

    #[test]
    fn invert_wrapper_unwraps() {
        let grid = PipelineStep::GridShift {
            file: "nzgd2kgrid0005.gsb".to_string(),
        };
        let wrapped = grid.inverse();
        assert!(matches!(wrapped, PipelineStep::Invert(_)));
        assert_eq!(wrapped.inverse(), grid);
    }

    #[test]
    fn double_pipeline_inverse_is_identity() {
        let pipeline = Pipeline::new(vec![
            PipelineStep::GeographicOffset {
                dlat: 0.0,
                dlon: -63600.0,
                dh: 0.0,
            },
            PipelineStep::AxisSwap {
                order: vec![1, 2, -3],
            },
        ]);
        assert_eq!(pipeline.inverse().inverse(), pipeline);
    }
}
