//! Reference dataset schema and migrations

use crate::error::{FactoryError, FactoryResult};
use rusqlite::Connection;
use tracing::{debug, info};

/// Schema version - increment when making schema changes
const SCHEMA_VERSION: i32 = 1;

/// Apply all pending migrations
pub fn apply_migrations(conn: &Connection) -> FactoryResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current_version = get_current_version(conn)?;
    debug!(current_version, target_version = SCHEMA_VERSION, "Checking migrations");

    if current_version < SCHEMA_VERSION {
        info!(from = current_version, to = SCHEMA_VERSION, "Applying schema migrations");
        apply_migration_v1(conn)?;
    }

    Ok(())
}

fn get_current_version(conn: &Connection) -> FactoryResult<i32> {
    let version: Option<i32> = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        })
        .unwrap_or(None);
    Ok(version.unwrap_or(0))
}

fn record_migration(conn: &Connection, version: i32) -> FactoryResult<()> {
    conn.execute(
        "INSERT INTO schema_migrations (version) VALUES (?)",
        [version],
    )?;
    Ok(())
}

fn apply_migration_v1(conn: &Connection) -> FactoryResult<()> {
    debug!("Applying migration v1: reference dataset schema");

    conn.execute_batch(SCHEMA_V1).map_err(|e| {
        FactoryError::CorruptRecord {
            authority: String::new(),
            code: String::new(),
            detail: format!("Failed to apply v1 schema: {}", e),
        }
    })?;

    record_migration(conn, 1)?;
    info!("Migration v1 applied");
    Ok(())
}

/// Reference dataset schema.
///
/// Every entity table is keyed by (auth_name, code). Operations of all four
/// kinds share one table plus a normalized parameter table; concatenation
/// membership and supersession are relations of their own.
const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS unit_of_measure (
    auth_name TEXT NOT NULL,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    type TEXT NOT NULL CHECK (type IN ('length', 'angle', 'scale', 'time')),
    conv_factor REAL,  -- NULL for non-ratio units (sexagesimal DMS)
    deprecated INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (auth_name, code)
);

CREATE TABLE IF NOT EXISTS celestial_body (
    auth_name TEXT NOT NULL,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    semi_major_axis REAL NOT NULL,
    PRIMARY KEY (auth_name, code)
);

CREATE TABLE IF NOT EXISTS ellipsoid (
    auth_name TEXT NOT NULL,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    body_auth TEXT,
    body_code TEXT,
    semi_major_axis REAL NOT NULL,
    uom_auth TEXT NOT NULL,
    uom_code TEXT NOT NULL,
    inv_flattening REAL,
    semi_minor_axis REAL,
    deprecated INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (auth_name, code)
);

CREATE TABLE IF NOT EXISTS prime_meridian (
    auth_name TEXT NOT NULL,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    longitude REAL NOT NULL,
    uom_auth TEXT NOT NULL,
    uom_code TEXT NOT NULL,
    deprecated INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (auth_name, code)
);

CREATE TABLE IF NOT EXISTS geodetic_datum (
    auth_name TEXT NOT NULL,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    anchor TEXT,
    anchor_epoch REAL,
    publication_date TEXT,
    frame_reference_epoch REAL,  -- set for dynamic reference frames
    ellipsoid_auth TEXT NOT NULL,
    ellipsoid_code TEXT NOT NULL,
    prime_meridian_auth TEXT NOT NULL,
    prime_meridian_code TEXT NOT NULL,
    deprecated INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (auth_name, code)
);

CREATE TABLE IF NOT EXISTS vertical_datum (
    auth_name TEXT NOT NULL,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    anchor TEXT,
    anchor_epoch REAL,
    publication_date TEXT,
    frame_reference_epoch REAL,
    deprecated INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (auth_name, code)
);

CREATE TABLE IF NOT EXISTS engineering_datum (
    auth_name TEXT NOT NULL,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    anchor TEXT,
    deprecated INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (auth_name, code)
);

CREATE TABLE IF NOT EXISTS datum_ensemble (
    auth_name TEXT NOT NULL,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    family TEXT NOT NULL CHECK (family IN ('geodetic', 'vertical')),
    accuracy REAL NOT NULL,
    deprecated INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (auth_name, code)
);

CREATE TABLE IF NOT EXISTS datum_ensemble_member (
    ensemble_auth TEXT NOT NULL,
    ensemble_code TEXT NOT NULL,
    sequence INTEGER NOT NULL,
    member_auth TEXT NOT NULL,
    member_code TEXT NOT NULL,
    PRIMARY KEY (ensemble_auth, ensemble_code, sequence)
);

CREATE TABLE IF NOT EXISTS extent (
    auth_name TEXT NOT NULL,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    -- all NULL means a world extent with no bbox restriction
    west REAL,
    south REAL,
    east REAL,
    north REAL,
    deprecated INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (auth_name, code)
);

CREATE TABLE IF NOT EXISTS scope (
    auth_name TEXT NOT NULL,
    code TEXT NOT NULL,
    text TEXT NOT NULL,
    deprecated INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (auth_name, code)
);

CREATE TABLE IF NOT EXISTS usage (
    auth_name TEXT NOT NULL,
    code TEXT NOT NULL,
    object_table TEXT NOT NULL,
    object_auth TEXT NOT NULL,
    object_code TEXT NOT NULL,
    extent_auth TEXT NOT NULL,
    extent_code TEXT NOT NULL,
    scope_auth TEXT,
    scope_code TEXT,
    PRIMARY KEY (auth_name, code)
);

CREATE INDEX IF NOT EXISTS idx_usage_object ON usage(object_table, object_auth, object_code);

CREATE TABLE IF NOT EXISTS coordinate_system (
    auth_name TEXT NOT NULL,
    code TEXT NOT NULL,
    type TEXT NOT NULL CHECK (type IN ('ellipsoidal', 'Cartesian', 'vertical', 'spherical')),
    dimension INTEGER NOT NULL,
    PRIMARY KEY (auth_name, code)
);

CREATE TABLE IF NOT EXISTS axis (
    auth_name TEXT NOT NULL,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    abbrev TEXT NOT NULL,
    orientation TEXT NOT NULL,
    cs_auth TEXT NOT NULL,
    cs_code TEXT NOT NULL,
    coordinate_order INTEGER NOT NULL,
    uom_auth TEXT NOT NULL,
    uom_code TEXT NOT NULL,
    PRIMARY KEY (auth_name, code)
);

CREATE INDEX IF NOT EXISTS idx_axis_cs ON axis(cs_auth, cs_code, coordinate_order);

CREATE TABLE IF NOT EXISTS geodetic_crs (
    auth_name TEXT NOT NULL,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    type TEXT NOT NULL CHECK (type IN ('geographic 2D', 'geographic 3D', 'geocentric')),
    cs_auth TEXT,
    cs_code TEXT,
    datum_auth TEXT,
    datum_code TEXT,
    ensemble_auth TEXT,
    ensemble_code TEXT,
    text_definition TEXT,  -- WKT or PROJ string, in lieu of structured fields
    deprecated INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (auth_name, code)
);

CREATE TABLE IF NOT EXISTS vertical_crs (
    auth_name TEXT NOT NULL,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    cs_auth TEXT NOT NULL,
    cs_code TEXT NOT NULL,
    datum_auth TEXT,
    datum_code TEXT,
    ensemble_auth TEXT,
    ensemble_code TEXT,
    deprecated INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (auth_name, code)
);

CREATE TABLE IF NOT EXISTS engineering_crs (
    auth_name TEXT NOT NULL,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    cs_auth TEXT NOT NULL,
    cs_code TEXT NOT NULL,
    datum_auth TEXT NOT NULL,
    datum_code TEXT NOT NULL,
    deprecated INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (auth_name, code)
);

CREATE TABLE IF NOT EXISTS projected_crs (
    auth_name TEXT NOT NULL,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    cs_auth TEXT NOT NULL,
    cs_code TEXT NOT NULL,
    base_crs_auth TEXT NOT NULL,
    base_crs_code TEXT NOT NULL,
    conversion_auth TEXT NOT NULL,
    conversion_code TEXT NOT NULL,
    text_definition TEXT,
    deprecated INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (auth_name, code)
);

CREATE TABLE IF NOT EXISTS compound_crs (
    auth_name TEXT NOT NULL,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    horiz_crs_auth TEXT NOT NULL,
    horiz_crs_code TEXT NOT NULL,
    vertical_crs_auth TEXT NOT NULL,
    vertical_crs_code TEXT NOT NULL,
    deprecated INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (auth_name, code)
);

CREATE TABLE IF NOT EXISTS coordinate_operation (
    auth_name TEXT NOT NULL,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    type TEXT NOT NULL CHECK (type IN
        ('conversion', 'transformation', 'point_motion_operation', 'concatenated_operation')),
    method_auth TEXT,
    method_code TEXT,
    method_name TEXT,
    source_crs_auth TEXT,
    source_crs_code TEXT,
    target_crs_auth TEXT,
    target_crs_code TEXT,
    accuracy REAL,
    operation_version TEXT,
    deprecated INTEGER NOT NULL DEFAULT 0,
    -- rowid preserved as registry insertion order, the ranking tie-break
    PRIMARY KEY (auth_name, code)
);

CREATE INDEX IF NOT EXISTS idx_operation_source
    ON coordinate_operation(source_crs_auth, source_crs_code);
CREATE INDEX IF NOT EXISTS idx_operation_target
    ON coordinate_operation(target_crs_auth, target_crs_code);

CREATE TABLE IF NOT EXISTS operation_parameter (
    operation_auth TEXT NOT NULL,
    operation_code TEXT NOT NULL,
    sequence INTEGER NOT NULL,
    name TEXT NOT NULL,
    code TEXT NOT NULL,
    value REAL,
    uom_auth TEXT,
    uom_code TEXT,
    file_ref TEXT,  -- grid-file parameters carry a file name instead
    PRIMARY KEY (operation_auth, operation_code, sequence)
);

CREATE TABLE IF NOT EXISTS concatenated_operation_step (
    operation_auth TEXT NOT NULL,
    operation_code TEXT NOT NULL,
    step_number INTEGER NOT NULL,
    step_auth TEXT NOT NULL,
    step_code TEXT NOT NULL,
    PRIMARY KEY (operation_auth, operation_code, step_number)
);

CREATE TABLE IF NOT EXISTS supersession (
    object_table TEXT NOT NULL,
    superseded_auth TEXT NOT NULL,
    superseded_code TEXT NOT NULL,
    replacement_auth TEXT NOT NULL,
    replacement_code TEXT NOT NULL,
    same_source_target_crs INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_supersession
    ON supersession(object_table, superseded_auth, superseded_code);
"#;
