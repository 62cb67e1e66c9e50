//! A small fake reference dataset for tests
//!
//! Covers one instance of every record shape: units (including the
//! sexagesimal pseudo-unit), extents, coordinate systems with axes, plain
//! datums and a datum ensemble, every CRS kind, a projection conversion, a
//! longitude-rotation transformation, a three-step vertical concatenation,
//! and a supersession pair. Pivot-search tests get their own fixture with
//! configurable operation directions.

use crate::connection::RegistryPool;
use crate::error::FactoryResult;

/// Units, extents, scopes, coordinate systems, ellipsoids, prime meridians
/// and datums every other record builds on.
const BASE_SQL: &str = r#"
INSERT INTO unit_of_measure VALUES('EPSG','9001','metre','length',1.0,0);
INSERT INTO unit_of_measure VALUES('EPSG','9002','foot','length',0.3048,0);
INSERT INTO unit_of_measure VALUES('EPSG','9102','degree','angle',0.017453292519943295,0);
INSERT INTO unit_of_measure VALUES('EPSG','9122','degree (supplier to define representation)','angle',0.017453292519943295,0);
INSERT INTO unit_of_measure VALUES('EPSG','9104','arc-second','angle',0.00000484813681109536,0);
INSERT INTO unit_of_measure VALUES('EPSG','9110','sexagesimal DMS','angle',NULL,0);
INSERT INTO unit_of_measure VALUES('EPSG','9201','unity','scale',1.0,0);

INSERT INTO extent VALUES('EPSG','1262','World',-180.0,-90.0,180.0,90.0,0);
INSERT INTO extent VALUES('EPSG','1933','World - N hemisphere - 0°E to 6°E',0.0,0.0,6.0,84.0,0);
INSERT INTO extent VALUES('EPSG','2060','Czechoslovakia',12.09,47.73,22.56,51.06,0);
INSERT INTO extent VALUES('EPSG','1175','New Zealand - onshore',166.37,-47.33,178.63,-34.1,0);

INSERT INTO scope VALUES('EPSG','1024','Not known.',0);
INSERT INTO scope VALUES('EPSG','1027','Spatial referencing.',0);

INSERT INTO coordinate_system VALUES('EPSG','6422','ellipsoidal',2);
INSERT INTO axis VALUES('EPSG','106','Geodetic latitude','Lat','north','EPSG','6422',1,'EPSG','9122');
INSERT INTO axis VALUES('EPSG','107','Geodetic longitude','Lon','east','EPSG','6422',2,'EPSG','9122');

INSERT INTO coordinate_system VALUES('EPSG','4400','Cartesian',2);
INSERT INTO axis VALUES('EPSG','1','Easting','E','east','EPSG','4400',1,'EPSG','9001');
INSERT INTO axis VALUES('EPSG','2','Northing','N','north','EPSG','4400',2,'EPSG','9001');

INSERT INTO coordinate_system VALUES('EPSG','6500','Cartesian',3);
INSERT INTO axis VALUES('EPSG','116','Geocentric X','X','geocentricX','EPSG','6500',1,'EPSG','9001');
INSERT INTO axis VALUES('EPSG','117','Geocentric Y','Y','geocentricY','EPSG','6500',2,'EPSG','9001');
INSERT INTO axis VALUES('EPSG','118','Geocentric Z','Z','geocentricZ','EPSG','6500',3,'EPSG','9001');

INSERT INTO coordinate_system VALUES('EPSG','6499','vertical',1);
INSERT INTO axis VALUES('EPSG','114','Gravity-related height','H','up','EPSG','6499',1,'EPSG','9001');
INSERT INTO coordinate_system VALUES('EPSG','6498','vertical',1);
INSERT INTO axis VALUES('EPSG','113','Depth','D','down','EPSG','6498',1,'EPSG','9001');
INSERT INTO coordinate_system VALUES('EPSG','6495','vertical',1);
INSERT INTO axis VALUES('EPSG','115','Depth','D','down','EPSG','6495',1,'EPSG','9002');

INSERT INTO ellipsoid VALUES('EPSG','7030','WGS 84',NULL,NULL,6378137.0,'EPSG','9001',298.257223563,NULL,0);
INSERT INTO ellipsoid VALUES('EPSG','7004','Bessel 1841',NULL,NULL,6377397.155,'EPSG','9001',299.1528128,NULL,0);
INSERT INTO ellipsoid VALUES('EPSG','7019','GRS 1980',NULL,NULL,6378137.0,'EPSG','9001',298.257222101,NULL,0);
INSERT INTO ellipsoid VALUES('EPSG','7024','Krassowsky 1940',NULL,NULL,6378245.0,'EPSG','9001',298.3,NULL,0);

INSERT INTO prime_meridian VALUES('EPSG','8901','Greenwich',0.0,'EPSG','9102',0);
INSERT INTO prime_meridian VALUES('EPSG','8909','Ferro',-17.4,'EPSG','9110',0);

INSERT INTO geodetic_datum VALUES('EPSG','6326','World Geodetic System 1984',NULL,NULL,'1984-01-01',NULL,'EPSG','7030','EPSG','8901',0);
INSERT INTO geodetic_datum VALUES('EPSG','1166','World Geodetic System 1984 (G1150)',NULL,NULL,'2002-01-20',2001.0,'EPSG','7030','EPSG','8901',0);
INSERT INTO geodetic_datum VALUES('EPSG','1155','World Geodetic System 1984 (G873)',NULL,NULL,'1997-01-29',1997.0,'EPSG','7030','EPSG','8901',0);
INSERT INTO geodetic_datum VALUES('EPSG','6156','System of the Unified Trigonometrical Cadastral Network',NULL,NULL,NULL,NULL,'EPSG','7004','EPSG','8901',0);
INSERT INTO geodetic_datum VALUES('EPSG','6818','System of the Unified Trigonometrical Cadastral Network (Ferro)',NULL,NULL,NULL,NULL,'EPSG','7004','EPSG','8909',0);
INSERT INTO geodetic_datum VALUES('EPSG','6179','Pulkovo 1942(83)',NULL,NULL,NULL,NULL,'EPSG','7024','EPSG','8901',0);
INSERT INTO geodetic_datum VALUES('EPSG','6258','European Terrestrial Reference System 1989 ensemble',NULL,NULL,NULL,NULL,'EPSG','7019','EPSG','8901',0);

INSERT INTO datum_ensemble VALUES('EPSG','6326','World Geodetic System 1984 ensemble','geodetic',2.0,0);
INSERT INTO datum_ensemble_member VALUES('EPSG','6326',1,'EPSG','1155');
INSERT INTO datum_ensemble_member VALUES('EPSG','6326',2,'EPSG','1166');
INSERT INTO usage VALUES('EPSG','u6326e','datum_ensemble','EPSG','6326','EPSG','1262','EPSG','1027');

INSERT INTO vertical_datum VALUES('EPSG','1169','New Zealand Vertical Datum 2016',NULL,NULL,'2016-06-27',NULL,0);
INSERT INTO engineering_datum VALUES('EPSG','9315','Seismic bin grid datum',NULL,0);
"#;

/// CRS records of every kind plus their usages.
const CRS_SQL: &str = r#"
INSERT INTO geodetic_crs VALUES('EPSG','4326','WGS 84','geographic 2D','EPSG','6422','EPSG','6326',NULL,NULL,NULL,0);
INSERT INTO usage VALUES('EPSG','u4326','geodetic_crs','EPSG','4326','EPSG','1262','EPSG','1027');

INSERT INTO geodetic_crs VALUES('EPSG','4978','WGS 84','geocentric','EPSG','6500','EPSG','6326',NULL,NULL,NULL,0);
INSERT INTO usage VALUES('EPSG','u4978','geodetic_crs','EPSG','4978','EPSG','1262','EPSG','1027');

INSERT INTO geodetic_crs VALUES('EPSG','4156','S-JTSK','geographic 2D','EPSG','6422','EPSG','6156',NULL,NULL,NULL,0);
INSERT INTO usage VALUES('EPSG','u4156','geodetic_crs','EPSG','4156','EPSG','2060','EPSG','1027');

INSERT INTO geodetic_crs VALUES('EPSG','4820','S-JTSK (Ferro)','geographic 2D','EPSG','6422','EPSG','6818',NULL,NULL,NULL,0);
INSERT INTO usage VALUES('EPSG','u4820','geodetic_crs','EPSG','4820','EPSG','2060','EPSG','1027');

INSERT INTO geodetic_crs VALUES('EPSG','4179','Pulkovo 1942(83)','geographic 2D','EPSG','6422','EPSG','6179',NULL,NULL,NULL,0);
INSERT INTO usage VALUES('EPSG','u4179','geodetic_crs','EPSG','4179','EPSG','1262','EPSG','1027');

INSERT INTO geodetic_crs VALUES('EPSG','4258','ETRS89','geographic 2D','EPSG','6422','EPSG','6258',NULL,NULL,NULL,0);
INSERT INTO usage VALUES('EPSG','u4258','geodetic_crs','EPSG','4258','EPSG','1262','EPSG','1027');

INSERT INTO projected_crs VALUES('EPSG','32631','WGS 84 / UTM zone 31N','EPSG','4400','EPSG','4326','EPSG','16031',NULL,0);
INSERT INTO usage VALUES('EPSG','u32631','projected_crs','EPSG','32631','EPSG','1933','EPSG','1027');

INSERT INTO vertical_crs VALUES('EPSG','7839','NZVD2016 height','EPSG','6499','EPSG','1169',NULL,NULL,0);
INSERT INTO usage VALUES('EPSG','u7839','vertical_crs','EPSG','7839','EPSG','1175','EPSG','1027');
INSERT INTO vertical_crs VALUES('EPSG','5759','Auckland 1946 height','EPSG','6499','EPSG','1169',NULL,NULL,0);
INSERT INTO usage VALUES('EPSG','u5759','vertical_crs','EPSG','5759','EPSG','1175','EPSG','1027');
INSERT INTO vertical_crs VALUES('EPSG','7840','Auckland 1946 depth','EPSG','6498','EPSG','1169',NULL,NULL,0);
INSERT INTO vertical_crs VALUES('EPSG','7841','Auckland 1946 depth (ft)','EPSG','6495','EPSG','1169',NULL,NULL,0);

INSERT INTO engineering_crs VALUES('EPSG','9316','Seismic bin grid','EPSG','4400','EPSG','9315',0);
INSERT INTO compound_crs VALUES('EPSG','9518','WGS 84 + NZVD2016 height','EPSG','4326','EPSG','7839',0);
"#;

/// Operations: the UTM deriving conversion, the Ferro longitude rotation,
/// the three-step vertical chain, and the ranking/supersession trio.
const OPERATION_SQL: &str = r#"
INSERT INTO coordinate_operation VALUES('EPSG','16031','UTM zone 31N','conversion','EPSG','9807','Transverse Mercator',NULL,NULL,NULL,NULL,NULL,NULL,0);
INSERT INTO operation_parameter VALUES('EPSG','16031',1,'Latitude of natural origin','8801',0.0,'EPSG','9102',NULL);
INSERT INTO operation_parameter VALUES('EPSG','16031',2,'Longitude of natural origin','8802',3.0,'EPSG','9102',NULL);
INSERT INTO operation_parameter VALUES('EPSG','16031',3,'Scale factor at natural origin','8805',0.9996,'EPSG','9201',NULL);
INSERT INTO operation_parameter VALUES('EPSG','16031',4,'False easting','8806',500000.0,'EPSG','9001',NULL);
INSERT INTO operation_parameter VALUES('EPSG','16031',5,'False northing','8807',0.0,'EPSG','9001',NULL);

INSERT INTO coordinate_operation VALUES('EPSG','1884','S-JTSK (Ferro) to S-JTSK (1)','transformation','EPSG','9601','Longitude rotation','EPSG','4820','EPSG','4156',0.0,'EPSG-Cze',0);
INSERT INTO operation_parameter VALUES('EPSG','1884',1,'Longitude offset','8602',-17.4,'EPSG','9110',NULL);
INSERT INTO usage VALUES('EPSG','u1884','coordinate_operation','EPSG','1884','EPSG','2060','EPSG','1024');

INSERT INTO coordinate_operation VALUES('EPSG','7980','NZVD2016 height to Auckland 1946 height','transformation','EPSG','9616','Vertical Offset','EPSG','7839','EPSG','5759',0.02,NULL,0);
INSERT INTO operation_parameter VALUES('EPSG','7980',1,'Vertical Offset','8603',-4.74,'EPSG','9001',NULL);
INSERT INTO usage VALUES('EPSG','u7980','coordinate_operation','EPSG','7980','EPSG','1175','EPSG','1024');

INSERT INTO coordinate_operation VALUES('EPSG','7812','Auckland 1946 height to Auckland 1946 depth','conversion','EPSG','1068','Height Depth Reversal','EPSG','5759','EPSG','7840',NULL,NULL,0);
INSERT INTO coordinate_operation VALUES('EPSG','7813','Auckland 1946 depth to Auckland 1946 depth (ft)','conversion','EPSG','1069','Change of Vertical Unit','EPSG','7840','EPSG','7841',NULL,NULL,0);
INSERT INTO operation_parameter VALUES('EPSG','7813',1,'Unit conversion scalar','1051',0.3048,'EPSG','9201',NULL);

INSERT INTO coordinate_operation VALUES('EPSG','7987','NZVD2016 height to Auckland 1946 depth (ft)','concatenated_operation',NULL,NULL,NULL,'EPSG','7839','EPSG','7841',NULL,NULL,0);
INSERT INTO concatenated_operation_step VALUES('EPSG','7987',1,'EPSG','7980');
INSERT INTO concatenated_operation_step VALUES('EPSG','7987',2,'EPSG','7812');
INSERT INTO concatenated_operation_step VALUES('EPSG','7987',3,'EPSG','7813');
INSERT INTO usage VALUES('EPSG','u7987','coordinate_operation','EPSG','7987','EPSG','1175','EPSG','1024');

-- Pulkovo 1942(83) to ETRS89: country-specific op, world-wide op, and a
-- deprecated duplicate superseded by the first.
INSERT INTO coordinate_operation VALUES('EPSG','15994','Pulkovo 1942(83) to ETRS89 (2)','transformation','EPSG','9603','Geocentric translations (geog2D domain)','EPSG','4179','EPSG','4258',10.0,NULL,0);
INSERT INTO operation_parameter VALUES('EPSG','15994',1,'X-axis translation','8605',24.0,'EPSG','9001',NULL);
INSERT INTO operation_parameter VALUES('EPSG','15994',2,'Y-axis translation','8606',-123.0,'EPSG','9001',NULL);
INSERT INTO operation_parameter VALUES('EPSG','15994',3,'Z-axis translation','8607',-94.0,'EPSG','9001',NULL);
INSERT INTO usage VALUES('EPSG','u15994','coordinate_operation','EPSG','15994','EPSG','2060','EPSG','1024');

INSERT INTO coordinate_operation VALUES('EPSG','15993','Pulkovo 1942(83) to ETRS89 (1)','transformation','EPSG','9603','Geocentric translations (geog2D domain)','EPSG','4179','EPSG','4258',1.0,NULL,0);
INSERT INTO operation_parameter VALUES('EPSG','15993',1,'X-axis translation','8605',26.0,'EPSG','9001',NULL);
INSERT INTO operation_parameter VALUES('EPSG','15993',2,'Y-axis translation','8606',-121.0,'EPSG','9001',NULL);
INSERT INTO operation_parameter VALUES('EPSG','15993',3,'Z-axis translation','8607',-78.0,'EPSG','9001',NULL);
INSERT INTO usage VALUES('EPSG','u15993','coordinate_operation','EPSG','15993','EPSG','1262','EPSG','1024');

INSERT INTO coordinate_operation VALUES('EPSG','1644','Pulkovo 1942(83) to ETRS89 (old)','transformation','EPSG','9603','Geocentric translations (geog2D domain)','EPSG','4179','EPSG','4258',10.0,NULL,1);
INSERT INTO operation_parameter VALUES('EPSG','1644',1,'X-axis translation','8605',24.0,'EPSG','9001',NULL);
INSERT INTO operation_parameter VALUES('EPSG','1644',2,'Y-axis translation','8606',-123.0,'EPSG','9001',NULL);
INSERT INTO operation_parameter VALUES('EPSG','1644',3,'Z-axis translation','8607',-94.0,'EPSG','9001',NULL);
INSERT INTO usage VALUES('EPSG','u1644','coordinate_operation','EPSG','1644','EPSG','2060','EPSG','1024');

INSERT INTO supersession VALUES('coordinate_operation','EPSG','1644','EPSG','15994',1);
"#;

/// Populate the main fake dataset.
pub fn populate_fake_registry(pool: &RegistryPool) -> FactoryResult<()> {
    pool.with_connection(|conn| {
        conn.execute_batch(BASE_SQL)?;
        conn.execute_batch(CRS_SQL)?;
        conn.execute_batch(OPERATION_SQL)?;
        Ok(())
    })
}

/// Pivot-search fixture: CRS SOURCE, TARGET and PIVOT under authority `NS`,
/// legs registered under authority `OTHER`. The two booleans pick the
/// registered direction of each leg, covering all four arrangements a pivot
/// search must orient.
pub fn populate_pivot_fixture(
    pool: &RegistryPool,
    source_to_pivot: bool,
    pivot_to_target: bool,
) -> FactoryResult<()> {
    let (leg1_src, leg1_tgt) = if source_to_pivot {
        ("SOURCE", "PIVOT")
    } else {
        ("PIVOT", "SOURCE")
    };
    let (leg2_src, leg2_tgt) = if pivot_to_target {
        ("PIVOT", "TARGET")
    } else {
        ("TARGET", "PIVOT")
    };
    let sql = format!(
        r#"
INSERT INTO geodetic_crs VALUES('NS','SOURCE','Source CRS','geographic 2D','EPSG','6422','NS','D_SOURCE',NULL,NULL,NULL,0);
INSERT INTO geodetic_crs VALUES('NS','TARGET','Target CRS','geographic 2D','EPSG','6422','NS','D_TARGET',NULL,NULL,NULL,0);
INSERT INTO geodetic_crs VALUES('NS','PIVOT','Pivot CRS','geographic 2D','EPSG','6422','NS','D_PIVOT',NULL,NULL,NULL,0);
INSERT INTO geodetic_datum VALUES('NS','D_SOURCE','Source datum',NULL,NULL,NULL,NULL,'EPSG','7030','EPSG','8901',0);
INSERT INTO geodetic_datum VALUES('NS','D_TARGET','Target datum',NULL,NULL,NULL,NULL,'EPSG','7030','EPSG','8901',0);
INSERT INTO geodetic_datum VALUES('NS','D_PIVOT','Pivot datum',NULL,NULL,NULL,NULL,'EPSG','7030','EPSG','8901',0);

INSERT INTO coordinate_operation VALUES('OTHER','LEG1','Leg 1','transformation','EPSG','9619','Geographic2D offsets','NS','{leg1_src}','NS','{leg1_tgt}',1.0,NULL,0);
INSERT INTO operation_parameter VALUES('OTHER','LEG1',1,'Latitude offset','8601',0.5,'EPSG','9102',NULL);
INSERT INTO operation_parameter VALUES('OTHER','LEG1',2,'Longitude offset','8602',-0.5,'EPSG','9102',NULL);
INSERT INTO usage VALUES('OTHER','uLEG1','coordinate_operation','OTHER','LEG1','EPSG','1262','EPSG','1024');

INSERT INTO coordinate_operation VALUES('OTHER','LEG2','Leg 2','transformation','EPSG','9619','Geographic2D offsets','NS','{leg2_src}','NS','{leg2_tgt}',2.0,NULL,0);
INSERT INTO operation_parameter VALUES('OTHER','LEG2',1,'Latitude offset','8601',0.25,'EPSG','9102',NULL);
INSERT INTO usage VALUES('OTHER','uLEG2','coordinate_operation','OTHER','LEG2','EPSG','1262','EPSG','1024');
"#
    );
    pool.with_connection(|conn| {
        conn.execute_batch(BASE_SQL)?;
        conn.execute_batch(&sql)?;
        Ok(())
    })
}
