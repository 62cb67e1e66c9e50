//! PROJ-string rendering of a pipeline
//!
//! One token group per step, flags in a fixed, documented order per method
//! so that equal pipelines always render to equal strings:
//! - helmert: x, y, z, then rx, ry, rz, s, then dx..ds, then t_epoch, then
//!   convention (the rotation block only appears when a rotation, scale or
//!   rate term is present), then exact;
//! - unitconvert: xy_in, xy_out, z_in, z_out;
//! - geogoffset: dlat, dlon, dh, zero-valued flags omitted;
//! - tmerc: lat_0, lon_0, k, x_0, y_0, with the UTM contraction applied
//!   when the parameters match a northern-hemisphere zone exactly.
//!
//! A single-step pipeline renders bare; multi-step (or inverted single
//! step) pipelines get the `+proj=pipeline` wrapper.

use crate::error::{PipelineError, PipelineResult};
use crate::step::{Pipeline, PipelineStep};
use graticule_core::compare::float_eq;
use graticule_core::{DatumOrEnsemble, Ellipsoid, EllipsoidFigure, UnitOfMeasure, UnitType};
use std::fmt::Write as _;

impl Pipeline {
    /// Render as a `+proj=` token stream.
    pub fn to_proj_string(&self) -> PipelineResult<String> {
        match self.steps.as_slice() {
            [] => Ok("+proj=noop".to_string()),
            [single] if !matches!(single, PipelineStep::Invert(_)) => step_tokens(single),
            steps => {
                let mut out = String::from("+proj=pipeline");
                for step in steps {
                    out.push_str(" +step ");
                    match step {
                        PipelineStep::Invert(inner) => {
                            out.push_str("+inv ");
                            out.push_str(&step_tokens(inner)?);
                        }
                        other => out.push_str(&step_tokens(other)?),
                    }
                }
                Ok(out)
            }
        }
    }
}

fn step_tokens(step: &PipelineStep) -> PipelineResult<String> {
    let mut s = String::new();
    match step {
        PipelineStep::NoOp => s.push_str("+proj=noop"),

        PipelineStep::AxisSwap { order } => {
            s.push_str("+proj=axisswap +order=");
            for (i, o) in order.iter().enumerate() {
                if i > 0 {
                    s.push(',');
                }
                let _ = write!(s, "{o}");
            }
        }

        PipelineStep::UnitConvert { xy, z } => {
            s.push_str("+proj=unitconvert");
            if let Some((from, to)) = xy {
                let _ = write!(
                    s,
                    " +xy_in={} +xy_out={}",
                    proj_unit_name(from)?,
                    proj_unit_name(to)?
                );
            }
            if let Some((from, to)) = z {
                let _ = write!(
                    s,
                    " +z_in={} +z_out={}",
                    proj_unit_name(from)?,
                    proj_unit_name(to)?
                );
            }
        }

        PipelineStep::Push { dims } => {
            s.push_str("+proj=push");
            for d in dims {
                let _ = write!(s, " +v_{d}");
            }
        }
        PipelineStep::Pop { dims } => {
            s.push_str("+proj=pop");
            for d in dims {
                let _ = write!(s, " +v_{d}");
            }
        }

        PipelineStep::GeographicGeocentric { ellipsoid } => {
            s.push_str("+proj=cart");
            s.push_str(&ellipsoid_tokens(ellipsoid));
        }

        PipelineStep::Helmert {
            x,
            y,
            z,
            rx,
            ry,
            rz,
            s: scale,
            rates,
            epoch,
            convention,
            exact,
        } => {
            let _ = write!(s, "+proj=helmert +x={x} +y={y} +z={z}");
            let rotational =
                *rx != 0.0 || *ry != 0.0 || *rz != 0.0 || *scale != 0.0 || rates.is_some();
            if rotational {
                let _ = write!(s, " +rx={rx} +ry={ry} +rz={rz} +s={scale}");
            }
            if let Some(r) = rates {
                let _ = write!(
                    s,
                    " +dx={} +dy={} +dz={} +drx={} +dry={} +drz={} +ds={}",
                    r.dx, r.dy, r.dz, r.drx, r.dry, r.drz, r.ds
                );
            }
            if let Some(e) = epoch {
                let _ = write!(s, " +t_epoch={e}");
            }
            if rotational {
                let _ = write!(s, " +convention={}", convention.proj_tag());
            }
            if *exact {
                s.push_str(" +exact");
            }
        }

        PipelineStep::GridShift { file } => {
            let _ = write!(s, "+proj=hgridshift +grids={file}");
        }

        PipelineStep::GeographicOffset { dlat, dlon, dh } => {
            s.push_str("+proj=geogoffset");
            if *dlat != 0.0 {
                let _ = write!(s, " +dlat={dlat}");
            }
            if *dlon != 0.0 {
                let _ = write!(s, " +dlon={dlon}");
            }
            if *dh != 0.0 {
                let _ = write!(s, " +dh={dh}");
            }
        }

        PipelineStep::Affine {
            xoff,
            yoff,
            s11,
            s12,
            s21,
            s22,
        } => {
            let _ = write!(
                s,
                "+proj=affine +xoff={xoff} +s11={s11} +s12={s12} +yoff={yoff} +s21={s21} +s22={s22}"
            );
        }

        PipelineStep::Projection {
            method_code,
            params,
            frame,
        } => {
            if method_code == graticule_core::operation::method::TRANSVERSE_MERCATOR {
                match utm_zone(params) {
                    Some(zone) => {
                        let _ = write!(s, "+proj=utm +zone={zone}");
                    }
                    None => {
                        s.push_str("+proj=tmerc");
                        for (name, value) in params {
                            let _ = write!(s, " +{name}={value}");
                        }
                    }
                }
            } else {
                return Err(PipelineError::UnknownMethod {
                    code: method_code.clone(),
                    name: "projection kernel".to_string(),
                });
            }
            s.push_str(&frame_tokens(frame.as_ref()));
        }

        PipelineStep::Invert(inner) => {
            // Bare inverted step outside a pipeline wrapper.
            s.push_str("+inv ");
            s.push_str(&step_tokens(inner)?);
        }
    }
    Ok(s)
}

/// UTM contraction: lat_0=0, k=0.9996, x_0=500000, y_0=0 and a central
/// meridian on a 6-degree zone boundary.
fn utm_zone(params: &[(String, f64)]) -> Option<u8> {
    let get = |name: &str| {
        params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    };
    if !(float_eq(get("lat_0")?, 0.0)
        && float_eq(get("k")?, 0.9996)
        && float_eq(get("x_0")?, 500_000.0)
        && float_eq(get("y_0")?, 0.0))
    {
        return None;
    }
    let lon_0 = get("lon_0")?;
    let zone = (lon_0 + 183.0) / 6.0;
    if float_eq(zone, zone.round()) && (1.0..=60.0).contains(&zone.round()) {
        Some(zone.round() as u8)
    } else {
        None
    }
}

fn frame_tokens(frame: Option<&DatumOrEnsemble>) -> String {
    let Some(frame) = frame else {
        return String::new();
    };
    let greenwich = frame
        .prime_meridian()
        .map(|pm| pm.is_greenwich())
        .unwrap_or(false);
    if frame.identity().key() == ("EPSG", "6326") && greenwich {
        return " +datum=WGS84".to_string();
    }
    frame
        .ellipsoid()
        .map(ellipsoid_tokens)
        .unwrap_or_default()
}

fn ellipsoid_tokens(e: &Ellipsoid) -> String {
    match e.identity.key() {
        ("EPSG", "7030") => " +ellps=WGS84".to_string(),
        ("EPSG", "7019") => " +ellps=GRS80".to_string(),
        ("EPSG", "7004") => " +ellps=bessel".to_string(),
        ("EPSG", "7024") => " +ellps=krass".to_string(),
        _ => match e.figure {
            EllipsoidFigure::InverseFlattening(rf) => {
                format!(" +a={} +rf={}", e.semi_major_axis, rf)
            }
            EllipsoidFigure::SemiMinorAxis(b) => {
                format!(" +a={} +b={}", e.semi_major_axis, b)
            }
            EllipsoidFigure::Sphere => {
                format!(" +a={} +b={}", e.semi_major_axis, e.semi_major_axis)
            }
        },
    }
}

/// PROJ spelling of a unit, matched on its SI factor.
fn proj_unit_name(unit: &UnitOfMeasure) -> PipelineResult<&'static str> {
    let unsupported = || PipelineError::UnsupportedUnit(unit.identity.name.clone());
    let factor = unit.to_si.ok_or_else(unsupported)?;
    match unit.unit_type {
        UnitType::Linear => {
            if float_eq(factor, 1.0) {
                Ok("m")
            } else if float_eq(factor, 0.3048) {
                Ok("ft")
            } else if float_eq(factor, 1200.0 / 3937.0) {
                Ok("us-ft")
            } else {
                Err(unsupported())
            }
        }
        UnitType::Angular => {
            if float_eq(factor, 1.0) {
                Ok("rad")
            } else if float_eq(factor, std::f64::consts::PI / 180.0) {
                Ok("deg")
            } else if float_eq(factor, std::f64::consts::PI / 200.0) {
                Ok("grad")
            } else {
                Err(unsupported())
            }
        }
        UnitType::Scale | UnitType::Time => Err(unsupported()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_swap_tokens() {
        let step = PipelineStep::AxisSwap {
            order: vec![1, 2, -3],
        };
        assert_eq!(step_tokens(&step).unwrap(), "+proj=axisswap +order=1,2,-3");
    }

    #[test]
    fn unit_convert_tokens() {
        let step = PipelineStep::UnitConvert {
            xy: None,
            z: Some((UnitOfMeasure::metre(), UnitOfMeasure::foot())),
        };
        assert_eq!(
            step_tokens(&step).unwrap(),
            "+proj=unitconvert +z_in=m +z_out=ft"
        );
    }

    #[test]
    fn helmert_without_rotation_stays_translation_only() {
        let step = PipelineStep::Helmert {
            x: 26.0,
            y: -121.0,
            z: -78.0,
            rx: 0.0,
            ry: 0.0,
            rz: 0.0,
            s: 0.0,
            rates: None,
            epoch: None,
            convention: crate::step::RotationConvention::PositionVector,
            exact: false,
        };
        assert_eq!(
            step_tokens(&step).unwrap(),
            "+proj=helmert +x=26 +y=-121 +z=-78"
        );
    }

    #[test]
    fn helmert_with_rotation_orders_flags() {
        let step = PipelineStep::Helmert {
            x: 1.0,
            y: 2.0,
            z: 3.0,
            rx: 0.1,
            ry: 0.2,
            rz: 0.3,
            s: 7.5,
            rates: None,
            epoch: None,
            convention: crate::step::RotationConvention::CoordinateFrame,
            exact: true,
        };
        assert_eq!(
            step_tokens(&step).unwrap(),
            "+proj=helmert +x=1 +y=2 +z=3 +rx=0.1 +ry=0.2 +rz=0.3 +s=7.5 \
             +convention=coordinate_frame +exact"
        );
    }

    #[test]
    fn utm_contraction_requires_exact_match() {
        let utm = vec![
            ("lat_0".to_string(), 0.0),
            ("lon_0".to_string(), 3.0),
            ("k".to_string(), 0.9996),
            ("x_0".to_string(), 500000.0),
            ("y_0".to_string(), 0.0),
        ];
        assert_eq!(utm_zone(&utm), Some(31));

        let mut off_zone = utm.clone();
        off_zone[1].1 = 4.0;
        assert_eq!(utm_zone(&off_zone), None);

        let mut off_scale = utm;
        off_scale[2].1 = 1.0;
        assert_eq!(utm_zone(&off_scale), None);
    }

    #[test]
    fn empty_pipeline_is_a_noop() {
        assert_eq!(Pipeline::default().to_proj_string().unwrap(), "+proj=noop");
    }

    #[test]
    fn single_step_renders_bare() {
        let p = Pipeline::new(vec![PipelineStep::GridShift {
            file: "nzgd2kgrid0005.gsb".to_string(),
        }]);
        assert_eq!(
            p.to_proj_string().unwrap(),
            "+proj=hgridshift +grids=nzgd2kgrid0005.gsb"
        );
        // Its inverse needs the wrapper to carry the +inv flag.
        assert_eq!(
            p.inverse().to_proj_string().unwrap(),
            "+proj=pipeline +step +inv +proj=hgridshift +grids=nzgd2kgrid0005.gsb"
        );
    }
}
