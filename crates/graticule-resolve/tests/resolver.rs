//! End-to-end resolution over the fake reference dataset.

use graticule_core::{ComparisonCriterion, CoordinateOperation, Extent};
use graticule_registry::test_support::{populate_fake_registry, populate_pivot_fixture};
use graticule_registry::{AuthorityRegistry, RegistryContext};
use graticule_resolve::{OperationResolver, PivotUse, SearchContext};

fn epsg_registry() -> anyhow::Result<AuthorityRegistry> {
    // Surfaces the search-phase traces when a test is run with --nocapture.
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let ctx = RegistryContext::in_memory()?;
    populate_fake_registry(ctx.pool())?;
    Ok(ctx.authority("EPSG"))
}

#[test]
fn direct_phase_finds_the_deriving_conversion() -> anyhow::Result<()> {
    let registry = epsg_registry()?;
    let geographic = registry.create_crs("4326")?;
    let projected = registry.create_crs("32631")?;
    let resolver = OperationResolver::new(registry.clone());

    let ops = resolver.resolve(&geographic, &projected, &SearchContext::default())?;
    assert_eq!(ops.len(), 1);
    assert!(matches!(ops[0], CoordinateOperation::Conversion(_)));

    // The candidate is the projected CRS's own deriving conversion.
    let standalone = CoordinateOperation::Conversion(registry.create_conversion("16031")?);
    assert!(ops[0].is_equivalent_to(&standalone, ComparisonCriterion::Equivalent));
    assert_eq!(ops[0].accuracy(), Some(0.0));
    Ok(())
}

#[test]
fn equivalent_crs_short_circuit_to_identity() -> anyhow::Result<()> {
    let registry = epsg_registry()?;
    let crs = registry.create_crs("4326")?;
    let resolver = OperationResolver::new(registry);

    let ops = resolver.resolve(&crs, &crs, &SearchContext::default())?;
    assert_eq!(ops.len(), 1);
    let single = ops[0].as_single().expect("identity is a single conversion");
    assert_eq!(single.method.code(), "identity");
    assert_eq!(ops[0].accuracy(), Some(0.0));

    // With the short-circuit disabled nothing is registered between a CRS
    // and itself, so the ballpark fallback answers instead.
    let ctx = SearchContext {
        allow_identity: false,
        ..SearchContext::default()
    };
    let ops = resolver.resolve(&crs, &crs, &ctx)?;
    assert_eq!(ops.len(), 1);
    assert!(ops[0].identity().name.starts_with("Ballpark"));
    Ok(())
}

#[test]
fn ranking_keeps_specific_area_first_and_drops_superseded() -> anyhow::Result<()> {
    let registry = epsg_registry()?;
    let source = registry.create_crs("4179")?;
    let target = registry.create_crs("4258")?;
    let resolver = OperationResolver::new(registry);

    let ops = resolver.resolve(&source, &target, &SearchContext::default())?;
    // 15994 (country extent) ahead of 15993 (world); the deprecated
    // superseded duplicate is gone entirely.
    assert_eq!(ops.len(), 2);
    assert_eq!(ops[0].identity().code, "15994");
    assert_eq!(ops[1].identity().code, "15993");
    Ok(())
}

#[test]
fn desired_accuracy_disqualifies_known_worse_candidates() -> anyhow::Result<()> {
    let registry = epsg_registry()?;
    let source = registry.create_crs("4179")?;
    let target = registry.create_crs("4258")?;
    let resolver = OperationResolver::new(registry);

    let ctx = SearchContext::default().with_desired_accuracy(5.0);
    let ops = resolver.resolve(&source, &target, &ctx)?;
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].identity().code, "15993");
    assert_eq!(ops[0].accuracy(), Some(1.0));
    Ok(())
}

#[test]
fn spatial_criterion_controls_the_extent_filter() -> anyhow::Result<()> {
    let registry = epsg_registry()?;
    let source = registry.create_crs("4179")?;
    let target = registry.create_crs("4258")?;
    let resolver = OperationResolver::new(registry);

    // Straddles the eastern edge of the Czechoslovakia extent.
    let aoi = Extent::new_bbox(20.0, 48.0, 30.0, 50.0);

    let strict = SearchContext::default().with_area_of_interest(aoi.clone());
    let ops = resolver.resolve(&source, &target, &strict)?;
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].identity().code, "15993");

    let lenient = graticule_resolve::SearchContext {
        spatial_criterion: graticule_resolve::SpatialCriterion::PartialIntersection,
        ..SearchContext::default().with_area_of_interest(aoi)
    };
    let ops = resolver.resolve(&source, &target, &lenient)?;
    assert_eq!(ops.len(), 2);
    assert_eq!(ops[0].identity().code, "15994");
    Ok(())
}

#[test]
fn ballpark_only_when_the_registry_offers_nothing() -> anyhow::Result<()> {
    let registry = epsg_registry()?;
    // No registered path and no shared pivot between these two.
    let source = registry.create_crs("4156")?;
    let target = registry.create_crs("4258")?;
    let resolver = OperationResolver::new(registry);

    let ops = resolver.resolve(&source, &target, &SearchContext::default())?;
    assert_eq!(ops.len(), 1);
    assert!(matches!(ops[0], CoordinateOperation::Transformation(_)));
    assert_eq!(
        ops[0].identity().name,
        "Ballpark geographic offset transformation from S-JTSK to ETRS89"
    );
    assert_eq!(ops[0].accuracy(), None);

    let ctx = SearchContext {
        allow_ballpark: false,
        ..SearchContext::default()
    };
    assert!(resolver.resolve(&source, &target, &ctx)?.is_empty());
    assert!(matches!(
        resolver.resolve_best(&source, &target, &ctx),
        Err(graticule_resolve::ResolveError::NoOperationFound { .. })
    ));
    Ok(())
}

#[test]
fn pivot_phase_runs_when_no_direct_transformation_exists() -> anyhow::Result<()> {
    let ctx = RegistryContext::in_memory()?;
    populate_pivot_fixture(ctx.pool(), true, false)?;
    let registry = ctx.any_authority();
    let source = registry.create_crs("SOURCE")?;
    let target = registry.create_crs("TARGET")?;
    let resolver = OperationResolver::new(registry);

    let ops = resolver.resolve(&source, &target, &SearchContext::default())?;
    assert_eq!(ops.len(), 1);
    let chain = ops[0].as_concatenated().expect("pivot result is a chain");
    assert_eq!(chain.steps.len(), 2);
    assert_eq!(ops[0].source_crs().map(|c| c.name()), Some("Source CRS"));
    assert_eq!(ops[0].target_crs().map(|c| c.name()), Some("Target CRS"));
    assert_eq!(ops[0].accuracy(), Some(3.0));

    let never = SearchContext {
        pivot_use: PivotUse::Never,
        allow_ballpark: false,
        ..SearchContext::default()
    };
    assert!(resolver.resolve(&source, &target, &never)?.is_empty());
    Ok(())
}

#[test]
fn explicit_pivot_list_is_honoured() -> anyhow::Result<()> {
    let ctx = RegistryContext::in_memory()?;
    populate_pivot_fixture(ctx.pool(), false, true)?;
    let registry = ctx.any_authority();
    let source = registry.create_crs("SOURCE")?;
    let target = registry.create_crs("TARGET")?;
    let resolver = OperationResolver::new(registry);

    let through_pivot = SearchContext::default()
        .with_pivots(vec![("NS".to_string(), "PIVOT".to_string())]);
    assert_eq!(resolver.resolve(&source, &target, &through_pivot)?.len(), 1);

    // A pivot nothing connects to yields no chains.
    let through_stranger = SearchContext {
        allow_ballpark: false,
        ..SearchContext::default()
            .with_pivots(vec![("NS".to_string(), "ELSEWHERE".to_string())])
    };
    assert!(resolver
        .resolve(&source, &target, &through_stranger)?
        .is_empty());
    Ok(())
}

#[test]
fn direction_mirrored_duplicates_collapse_to_one() -> anyhow::Result<()> {
    let ctx = RegistryContext::in_memory()?;
    populate_fake_registry(ctx.pool())?;
    // Register the exact inverse of 15993 in the opposite direction; the
    // reverse-row hit must fold into the forward one.
    ctx.pool().with_connection(|conn| {
        conn.execute_batch(
            r#"
INSERT INTO coordinate_operation VALUES('MINE','REV','ETRS89 to Pulkovo 1942(83)','transformation','EPSG','9603','Geocentric translations (geog2D domain)','EPSG','4258','EPSG','4179',1.0,NULL,0);
INSERT INTO operation_parameter VALUES('MINE','REV',1,'X-axis translation','8605',-26.0,'EPSG','9001',NULL);
INSERT INTO operation_parameter VALUES('MINE','REV',2,'Y-axis translation','8606',121.0,'EPSG','9001',NULL);
INSERT INTO operation_parameter VALUES('MINE','REV',3,'Z-axis translation','8607',78.0,'EPSG','9001',NULL);
INSERT INTO usage VALUES('MINE','uREV','coordinate_operation','MINE','REV','EPSG','1262','EPSG','1024');
"#,
        )?;
        Ok(())
    })?;
    let registry = ctx.any_authority();
    let source = registry.create_crs("4179")?;
    let target = registry.create_crs("4258")?;
    let resolver = OperationResolver::new(registry);

    let ops = resolver.resolve(&source, &target, &SearchContext::default())?;
    assert_eq!(ops.len(), 2);
    for (i, a) in ops.iter().enumerate() {
        for b in &ops[i + 1..] {
            assert!(!a.is_equivalent_up_to_direction(b));
        }
    }
    Ok(())
}

#[test]
fn unregistered_crs_skip_the_registry_phases() -> anyhow::Result<()> {
    let registry = epsg_registry()?;
    let registered = registry.create_crs("4326")?;
    let resolver = OperationResolver::new(registry);

    let mut anonymous = (*registered).clone();
    if let graticule_core::Crs::Geographic(g) = &mut anonymous {
        g.common.identity = graticule_core::ObjectIdentity::anonymous("local WGS84 copy");
    }
    let ctx = SearchContext {
        allow_identity: false,
        allow_ballpark: true,
        ..SearchContext::default()
    };
    let ops = resolver.resolve(&anonymous, &registered, &ctx)?;
    assert_eq!(ops.len(), 1);
    assert!(ops[0].identity().name.starts_with("Ballpark"));
    Ok(())
}
