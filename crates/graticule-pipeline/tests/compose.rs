//! Composition and export of registry-built operations.

use graticule_core::{CoordinateOperation, ObjectIdentity, OperationStep};
use graticule_pipeline::{compose, PipelineError, PipelineStep};
use graticule_registry::test_support::populate_fake_registry;
use graticule_registry::{AuthorityRegistry, RegistryContext};
use graticule_resolve::{OperationResolver, SearchContext};

fn epsg_registry() -> anyhow::Result<AuthorityRegistry> {
    let ctx = RegistryContext::in_memory()?;
    populate_fake_registry(ctx.pool())?;
    Ok(ctx.authority("EPSG"))
}

#[test]
fn resolved_utm_conversion_exports_the_contracted_form() -> anyhow::Result<()> {
    let registry = epsg_registry()?;
    let source = registry.create_crs("4326")?;
    let target = registry.create_crs("32631")?;
    let resolver = OperationResolver::new(registry);

    let best = resolver.resolve_best(&source, &target, &SearchContext::default())?;
    let pipeline = compose(&best)?;
    assert_eq!(pipeline.len(), 1);
    assert_eq!(pipeline.to_proj_string()?, "+proj=utm +zone=31 +datum=WGS84");
    Ok(())
}

#[test]
fn standalone_conversion_without_base_crs_omits_the_datum() -> anyhow::Result<()> {
    let registry = epsg_registry()?;
    let conversion = registry.create_conversion("16031")?;
    let pipeline = compose(&CoordinateOperation::Conversion(conversion))?;
    assert_eq!(pipeline.to_proj_string()?, "+proj=utm +zone=31");
    Ok(())
}

#[test]
fn vertical_concatenation_flattens_to_three_steps() -> anyhow::Result<()> {
    let registry = epsg_registry()?;
    let chain = registry.create_coordinate_operation("7987", true)?;
    let pipeline = compose(&chain)?;

    assert_eq!(pipeline.len(), 3);
    assert_eq!(
        pipeline.to_proj_string()?,
        "+proj=pipeline \
         +step +proj=geogoffset +dh=-4.74 \
         +step +proj=axisswap +order=1,2,-3 \
         +step +proj=unitconvert +z_in=m +z_out=ft"
    );

    let inverse = pipeline.inverse();
    assert_eq!(
        inverse.to_proj_string()?,
        "+proj=pipeline \
         +step +proj=unitconvert +z_in=ft +z_out=m \
         +step +proj=axisswap +order=1,2,-3 \
         +step +proj=geogoffset +dh=4.74"
    );
    Ok(())
}

#[test]
fn composing_the_inverse_equals_inverting_the_composition() -> anyhow::Result<()> {
    let registry = epsg_registry()?;
    let chain = registry.create_coordinate_operation("7987", true)?;
    let forward = compose(&chain)?;
    let declared_inverse = compose(&chain.inverse())?;
    assert_eq!(declared_inverse, forward.inverse());
    assert_eq!(forward.inverse().inverse(), forward);
    Ok(())
}

#[test]
fn geocentric_translation_gets_the_cartesian_sandwich() -> anyhow::Result<()> {
    let registry = epsg_registry()?;
    let op = registry.create_coordinate_operation("15993", true)?;
    let pipeline = compose(&op)?;

    assert_eq!(pipeline.len(), 5);
    assert!(matches!(pipeline.steps[0], PipelineStep::Push { .. }));
    assert!(matches!(
        pipeline.steps[1],
        PipelineStep::GeographicGeocentric { .. }
    ));
    assert!(matches!(pipeline.steps[2], PipelineStep::Helmert { .. }));
    assert!(matches!(pipeline.steps[3], PipelineStep::Invert(_)));
    assert!(matches!(pipeline.steps[4], PipelineStep::Pop { .. }));

    let text = pipeline.to_proj_string()?;
    assert!(text.contains("+step +proj=cart +ellps=krass"));
    assert!(text.contains("+step +proj=helmert +x=26 +y=-121 +z=-78"));
    assert!(text.contains("+step +inv +proj=cart +ellps=GRS80"));
    Ok(())
}

#[test]
fn longitude_rotation_becomes_an_arcsecond_offset() -> anyhow::Result<()> {
    let registry = epsg_registry()?;
    let op = registry.create_coordinate_operation("1884", true)?;
    let pipeline = compose(&op)?;

    assert_eq!(pipeline.len(), 1);
    let PipelineStep::GeographicOffset { dlat, dlon, dh } = &pipeline.steps[0] else {
        panic!("expected a geographic offset, got {:?}", pipeline.steps[0]);
    };
    assert_eq!(*dlat, 0.0);
    assert_eq!(*dh, 0.0);
    // -17.6666666666667 degrees expressed in arc-seconds.
    assert!((dlon + 63600.0).abs() < 1e-6);
    assert!(pipeline
        .to_proj_string()?
        .starts_with("+proj=geogoffset +dlon=-63600"));
    Ok(())
}

#[test]
fn identity_and_ballpark_collapse_to_noop() -> anyhow::Result<()> {
    let registry = epsg_registry()?;
    let crs = registry.create_crs("4326")?;
    let resolver = OperationResolver::new(registry.clone());

    let identity = resolver.resolve_best(&crs, &crs, &SearchContext::default())?;
    assert_eq!(compose(&identity)?.to_proj_string()?, "+proj=noop");

    let source = registry.create_crs("4156")?;
    let target = registry.create_crs("4258")?;
    let ballpark = resolver.resolve_best(&source, &target, &SearchContext::default())?;
    assert_eq!(compose(&ballpark)?.to_proj_string()?, "+proj=noop");
    Ok(())
}

#[test]
fn mirrored_members_cancel_during_flattening() -> anyhow::Result<()> {
    let registry = epsg_registry()?;
    let reversal = registry.create_coordinate_operation("7812", true)?;

    let there_and_back = CoordinateOperation::Concatenated(
        graticule_core::ConcatenatedOperation::new(
            ObjectIdentity::anonymous("height to depth and back"),
            vec![
                OperationStep::forward((*reversal).clone()),
                OperationStep::inverted((*reversal).clone()),
            ],
        )?,
    );
    let pipeline = compose(&there_and_back)?;
    assert!(pipeline.is_empty());
    assert_eq!(pipeline.to_proj_string()?, "+proj=noop");
    Ok(())
}

#[test]
fn unknown_method_fails_at_composition_time() -> anyhow::Result<()> {
    let registry = epsg_registry()?;
    let mut conversion = registry.create_conversion("16031")?;
    conversion.method.identity.code = "9999".to_string();

    let err = compose(&CoordinateOperation::Conversion(conversion)).unwrap_err();
    assert!(matches!(err, PipelineError::UnknownMethod { ref code, .. } if code == "9999"));
    Ok(())
}

#[test]
fn latitude_outside_its_domain_is_rejected() -> anyhow::Result<()> {
    let registry = epsg_registry()?;
    let mut conversion = registry.create_conversion("16031")?;
    for p in &mut conversion.parameters {
        if p.code == graticule_core::operation::parameter::LATITUDE_OF_NATURAL_ORIGIN {
            if let graticule_core::ParameterValue::Measure(m) = &mut p.value {
                m.value = 100.0;
            }
        }
    }

    let err = compose(&CoordinateOperation::Conversion(conversion)).unwrap_err();
    assert!(matches!(err, PipelineError::OutsideDomain { ref name, .. } if name == "lat_0"));
    Ok(())
}

#[test]
fn missing_required_parameter_is_reported_with_its_code() -> anyhow::Result<()> {
    let registry = epsg_registry()?;
    let mut conversion = registry.create_conversion("16031")?;
    conversion
        .parameters
        .retain(|p| p.code != graticule_core::operation::parameter::FALSE_EASTING);

    let err = compose(&CoordinateOperation::Conversion(conversion)).unwrap_err();
    assert!(matches!(err, PipelineError::MissingParameter { ref code, .. } if code == "8806"));
    Ok(())
}
