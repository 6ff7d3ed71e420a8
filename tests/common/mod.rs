#![allow(dead_code)]

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};
use tempfile::TempDir;

macro_rules! assert_near {
    ($left:expr, $right:expr) => {
        assert_near!($left, $right, 1e-9)
    };
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let (left, right): (f64, f64) = ($left, $right);
        assert!(
            (left - right).abs() <= $epsilon,
            "{left} is not within {} of {right}",
            $epsilon
        );
    }};
}

pub const NAD83_WKT: &str = r#"GEOGCS["NAD83",DATUM["North_American_Datum_1983",SPHEROID["GRS 1980",6378137,298.257222101,AUTHORITY["EPSG","7019"]],AUTHORITY["EPSG","6269"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4269"]]"#;

/// Rings of the three HUC-12 polygons in the standard fixture.
pub const HUC12_RINGS: [[(f64, f64); 5]; 3] = [
    [(-105.5, 39.5), (-105.0, 39.5), (-105.0, 40.0), (-105.5, 40.0), (-105.5, 39.5)],
    [(-105.0, 39.5), (-104.25, 39.5), (-104.5, 40.25), (-105.0, 40.0), (-105.0, 39.5)],
    [(-106.0, 39.0), (-105.5, 39.0), (-105.5, 39.5), (-106.0, 39.5), (-106.0, 39.0)],
];
pub const HUC12_IDS: [i64; 3] = [101900040101, 101900040102, 101900040103];
pub const HUC12_NAMES: [&str; 3] = ["Upper Clear Creek", "Lost Creek", "Bear Creek"];

/// A GeoPackage written into a temporary directory, removed on drop.
pub struct TempGpkg {
    _temp_dir: TempDir,
    path: PathBuf,
}

impl TempGpkg {
    /// An empty GeoPackage holding only the metadata tables.
    pub fn new(name: &str) -> (TempGpkg, Connection) {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(name);
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "PRAGMA application_id = 1196444487;
             PRAGMA user_version = 10200;
             CREATE TABLE gpkg_spatial_ref_sys (
                 srs_name TEXT NOT NULL,
                 srs_id INTEGER PRIMARY KEY,
                 organization TEXT NOT NULL,
                 organization_coordsys_id INTEGER NOT NULL,
                 definition TEXT NOT NULL,
                 description TEXT
             );
             CREATE TABLE gpkg_contents (
                 table_name TEXT NOT NULL PRIMARY KEY,
                 data_type TEXT NOT NULL,
                 identifier TEXT UNIQUE,
                 description TEXT DEFAULT '',
                 last_change DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
                 min_x DOUBLE, min_y DOUBLE, max_x DOUBLE, max_y DOUBLE,
                 srs_id INTEGER
             );
             CREATE TABLE gpkg_geometry_columns (
                 table_name TEXT NOT NULL,
                 column_name TEXT NOT NULL,
                 geometry_type_name TEXT NOT NULL,
                 srs_id INTEGER NOT NULL,
                 z TINYINT NOT NULL,
                 m TINYINT NOT NULL,
                 CONSTRAINT pk_geom_cols PRIMARY KEY (table_name, column_name)
             );",
        )
        .unwrap();
        conn.execute(
            "INSERT INTO gpkg_spatial_ref_sys VALUES
                 ('Undefined cartesian SRS', -1, 'NONE', -1, 'undefined', NULL),
                 ('Undefined geographic SRS', 0, 'NONE', 0, 'undefined', NULL),
                 ('NAD83', 4269, 'EPSG', 4269, ?1, NULL)",
            [NAD83_WKT],
        )
        .unwrap();
        (
            TempGpkg {
                _temp_dir: temp_dir,
                path,
            },
            conn,
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn path_str(&self) -> &str {
        self.path.to_str().unwrap()
    }
}

/// Creates a feature table with `id` and `name` attributes and registers it.
pub fn add_layer(
    conn: &Connection,
    name: &str,
    geometry_type: &str,
    features: &[(Option<Vec<u8>>, i64, &str)],
) {
    conn.execute_batch(&format!(
        "CREATE TABLE \"{name}\" (
             fid INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
             shape {geometry_type},
             id INTEGER,
             name TEXT
         );"
    ))
    .unwrap();
    register_layer(conn, name, geometry_type, 4269);
    let sql = format!("INSERT INTO \"{name}\" (shape, id, name) VALUES (?1, ?2, ?3)");
    for (geometry, id, label) in features {
        conn.execute(&sql, params![geometry, id, label]).unwrap();
    }
}

/// Registers `name` as a feature table whose geometry column is `shape`.
pub fn register_layer(conn: &Connection, name: &str, geometry_type: &str, srs_id: i32) {
    conn.execute(
        "INSERT INTO gpkg_contents (table_name, data_type, identifier, srs_id)
         VALUES (?1, 'features', ?1, ?2)",
        params![name, srs_id],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO gpkg_geometry_columns VALUES (?1, 'shape', ?2, ?3, 0, 0)",
        params![name, geometry_type, srs_id],
    )
    .unwrap();
}

/// Little-endian WKB point.
pub fn wkb_point(x: f64, y: f64) -> Vec<u8> {
    let mut wkb = vec![1u8];
    wkb.extend_from_slice(&1u32.to_le_bytes());
    wkb.extend_from_slice(&x.to_le_bytes());
    wkb.extend_from_slice(&y.to_le_bytes());
    wkb
}

/// Little-endian WKB line string.
pub fn wkb_line_string(coords: &[(f64, f64)]) -> Vec<u8> {
    let mut wkb = vec![1u8];
    wkb.extend_from_slice(&2u32.to_le_bytes());
    wkb.extend_from_slice(&(coords.len() as u32).to_le_bytes());
    for (x, y) in coords {
        wkb.extend_from_slice(&x.to_le_bytes());
        wkb.extend_from_slice(&y.to_le_bytes());
    }
    wkb
}

/// Little-endian WKB polygon.
pub fn wkb_polygon(rings: &[&[(f64, f64)]]) -> Vec<u8> {
    let mut wkb = vec![1u8];
    wkb.extend_from_slice(&3u32.to_le_bytes());
    wkb.extend_from_slice(&(rings.len() as u32).to_le_bytes());
    for ring in rings {
        wkb.extend_from_slice(&(ring.len() as u32).to_le_bytes());
        for (x, y) in ring.iter() {
            wkb.extend_from_slice(&x.to_le_bytes());
            wkb.extend_from_slice(&y.to_le_bytes());
        }
    }
    wkb
}

/// GeoPackage binary geometry for a single-ring polygon: header with an XY
/// envelope, then `wkb`.
pub fn gpkg_blob(srs_id: i32, wkb: &[u8]) -> Vec<u8> {
    // Geometry type, number of rings, number of points of the first ring.
    let skip = 1 + 4 + 4 + 4;
    let coords: Vec<(f64, f64)> = wkb[skip..]
        .chunks_exact(16)
        .map(|c| {
            (
                f64::from_le_bytes(c[..8].try_into().unwrap()),
                f64::from_le_bytes(c[8..].try_into().unwrap()),
            )
        })
        .collect();
    let envelope = coords.iter().fold(
        [f64::MAX, f64::MIN, f64::MAX, f64::MIN],
        |[min_x, max_x, min_y, max_y], (x, y)| {
            [min_x.min(*x), max_x.max(*x), min_y.min(*y), max_y.max(*y)]
        },
    );

    let mut blob = b"GP".to_vec();
    blob.push(0);
    // Little endian, envelope [minx, maxx, miny, maxy].
    blob.push(0b0000_0011);
    blob.extend_from_slice(&srs_id.to_le_bytes());
    for value in envelope {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob.extend_from_slice(wkb);
    blob
}

/// GeoPackage blob without an envelope.
pub fn gpkg_blob_no_envelope(srs_id: i32, wkb: &[u8]) -> Vec<u8> {
    let mut blob = b"GP".to_vec();
    blob.push(0);
    blob.push(0b0000_0001);
    blob.extend_from_slice(&srs_id.to_le_bytes());
    blob.extend_from_slice(wkb);
    blob
}

/// `WBD.gpkg` with layers `WBDHU12` (three polygons), `WBDHU8` (a polygon
/// with a hole and a feature without geometry) and an attribute table.
pub fn wbd_fixture() -> TempGpkg {
    let (gpkg, conn) = TempGpkg::new("WBD.gpkg");

    let huc12: Vec<(Option<Vec<u8>>, i64, &str)> = HUC12_RINGS
        .iter()
        .zip(HUC12_IDS)
        .zip(HUC12_NAMES)
        .map(|((ring, id), name)| (Some(gpkg_blob(4269, &wkb_polygon(&[&ring[..]]))), id, name))
        .collect();
    add_layer(&conn, "WBDHU12", "POLYGON", &huc12);

    let outer = [(-106.0, 39.0), (-104.0, 39.0), (-104.0, 41.0), (-106.0, 41.0), (-106.0, 39.0)];
    let hole = [(-105.5, 39.5), (-104.5, 39.5), (-104.5, 40.5), (-105.5, 40.5), (-105.5, 39.5)];
    let huc8 = vec![
        (
            Some(gpkg_blob_no_envelope(4269, &wkb_polygon(&[&outer[..], &hole[..]]))),
            10190004,
            "Clear",
        ),
        (None, 10190005, "Unmapped"),
    ];
    add_layer(&conn, "WBDHU8", "POLYGON", &huc8);

    conn.execute_batch(
        "CREATE TABLE huc_names (id INTEGER PRIMARY KEY, label TEXT);
         INSERT INTO gpkg_contents (table_name, data_type, identifier) VALUES ('huc_names', 'attributes', 'huc_names');",
    )
    .unwrap();

    gpkg
}

/// Sites and positions of the `gauges` layer in [`gauges_fixture`].
pub const GAUGE_SITES: [&str; 2] = ["Clear Creek at Golden", "Bear Creek at Morrison"];
pub const GAUGE_COORDS: [(f64, f64); 2] = [(-105.235, 39.753), (-105.195, 39.653)];
pub const FLOWLINE: [(f64, f64); 3] = [(-105.5, 39.75), (-105.3, 39.74), (-105.2, 39.76)];

/// `gauges.gpkg` with a `gauges` point layer in the undefined geographic SRS
/// (0) holding boolean, date, datetime and real columns, and a `flowlines`
/// line layer in the undefined cartesian SRS (-1).
pub fn gauges_fixture() -> TempGpkg {
    let (gpkg, conn) = TempGpkg::new("gauges.gpkg");

    conn.execute_batch(
        "CREATE TABLE gauges (
             fid INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
             shape POINT,
             site TEXT,
             active BOOLEAN,
             installed DATE,
             observed DATETIME,
             flow REAL
         );",
    )
    .unwrap();
    register_layer(&conn, "gauges", "POINT", 0);
    let rows = [
        (1, "1908-10-01", "2024-05-01T18:15:00.000Z", 412.5),
        (0, "1974-06-15", "2024-05-01T18:30:00.000Z", 37.25),
    ];
    for (idx, (active, installed, observed, flow)) in rows.into_iter().enumerate() {
        let (x, y) = GAUGE_COORDS[idx];
        conn.execute(
            "INSERT INTO gauges (shape, site, active, installed, observed, flow)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                gpkg_blob_no_envelope(0, &wkb_point(x, y)),
                GAUGE_SITES[idx],
                active,
                installed,
                observed,
                flow
            ],
        )
        .unwrap();
    }

    conn.execute_batch(
        "CREATE TABLE flowlines (
             fid INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
             shape LINESTRING,
             name TEXT
         );",
    )
    .unwrap();
    register_layer(&conn, "flowlines", "LINESTRING", -1);
    conn.execute(
        "INSERT INTO flowlines (shape, name) VALUES (?1, ?2)",
        params![gpkg_blob_no_envelope(-1, &wkb_line_string(&FLOWLINE)), "Clear Creek"],
    )
    .unwrap();

    gpkg
}
