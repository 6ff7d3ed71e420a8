use std::convert::Infallible;
use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row};
use tracing::debug;

use crate::errors::*;
use crate::utils::ensure_readable;
use crate::vector::wkb::read_gpkg_geometry;
use crate::vector::{
    Crs, Defn, Feature, FeatureCollection, Field, FieldType, FieldValue, GeomFieldDefn,
    GeometryType,
};

const METADATA_TABLES: [&str; 3] = [
    "gpkg_contents",
    "gpkg_geometry_columns",
    "gpkg_spatial_ref_sys",
];

/// A GeoPackage opened read-only through SQLite.
///
/// ```no_run
/// use std::path::Path;
/// use gpkg_plot::vector::GeoPackage;
///
/// let gpkg = GeoPackage::open(Path::new("WBD_National_GPKG.gpkg"))?;
/// println!("layers: {:?}", gpkg.layer_names()?);
/// let layer = gpkg.layer("WBDHU12")?;
/// println!("{} features", layer.feature_count()?);
/// # Ok::<(), gpkg_plot::GpkgError>(())
/// ```
#[derive(Debug)]
pub struct GeoPackage {
    conn: Connection,
    path: PathBuf,
}

impl GeoPackage {
    /// Opens the GeoPackage at `path` without write access.
    ///
    /// Fails with [`GpkgError::FileNotFound`] before touching SQLite when the
    /// file is missing, and with [`GpkgError::InvalidContainer`] when the file
    /// is not an SQLite database holding the GeoPackage metadata tables.
    pub fn open(path: &Path) -> Result<GeoPackage> {
        ensure_readable(path)?;
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags).map_err(|e| GpkgError::InvalidContainer {
            path: path.to_path_buf(),
            msg: e.to_string(),
        })?;
        let gpkg = GeoPackage {
            conn,
            path: path.to_path_buf(),
        };
        gpkg.check_metadata()?;
        debug!(path = %path.display(), "opened GeoPackage");
        Ok(gpkg)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn invalid(&self, msg: impl Into<String>) -> GpkgError {
        GpkgError::InvalidContainer {
            path: self.path.clone(),
            msg: msg.into(),
        }
    }

    // SQLite reads the file header lazily, so a non-database file only fails here.
    fn check_metadata(&self) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type IN ('table', 'view')")
            .map_err(|e| self.invalid(e.to_string()))?;
        let tables = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<String>>>())
            .map_err(|e| self.invalid(e.to_string()))?;
        let missing: Vec<&str> = METADATA_TABLES
            .iter()
            .copied()
            .filter(|name| !tables.iter().any(|table| table == name))
            .collect();
        if !missing.is_empty() {
            return Err(self.invalid(format!("missing tables {missing:?}")));
        }
        Ok(())
    }

    /// Names of the feature layers, sorted.
    pub fn layer_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT table_name FROM gpkg_contents WHERE data_type = 'features' ORDER BY table_name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    /// Looks up a feature layer by its exact, case-sensitive name.
    pub fn layer(&self, name: &str) -> Result<Layer<'_>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.table_name, g.column_name, g.geometry_type_name, g.srs_id \
             FROM gpkg_contents c JOIN gpkg_geometry_columns g ON g.table_name = c.table_name \
             WHERE c.data_type = 'features'",
        )?;
        let geometry = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i32>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
            .into_iter()
            .find(|(table, ..)| table == name);

        let Some((table, column, geometry_type, srs_id)) = geometry else {
            return Err(GpkgError::LayerNotFound {
                layer: name.to_string(),
                available: self.layer_names()?,
            });
        };

        let (fid_column, fields) = self.table_columns(&table, &column)?;
        let crs = self.crs(srs_id)?;
        let geometry_type: GeometryType = geometry_type
            .parse()
            .unwrap_or_else(|never: Infallible| match never {});

        Ok(Layer {
            gpkg: self,
            name: table,
            fid_column,
            defn: Defn {
                geometry: GeomFieldDefn {
                    name: column,
                    geometry_type,
                    srs_id,
                },
                fields,
            },
            crs,
        })
    }

    // Splits the table's columns into the integer primary key and the attributes.
    fn table_columns(&self, table: &str, geometry_column: &str) -> Result<(Option<String>, Vec<Field>)> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, type, pk FROM pragma_table_info(?1) ORDER BY cid")?;
        let columns = stmt
            .query_map([table], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut fid_column = None;
        let mut fields = Vec::with_capacity(columns.len());
        for (name, declared, pk) in columns {
            if name == geometry_column {
                continue;
            }
            if pk == 1 && fid_column.is_none() && declared.eq_ignore_ascii_case("INTEGER") {
                fid_column = Some(name);
                continue;
            }
            fields.push(Field {
                field_type: FieldType::from_declared(&declared),
                name,
            });
        }
        Ok((fid_column, fields))
    }

    fn crs(&self, srs_id: i32) -> Result<Option<Crs>> {
        let crs = self
            .conn
            .query_row(
                "SELECT srs_id, organization, organization_coordsys_id, definition \
                 FROM gpkg_spatial_ref_sys WHERE srs_id = ?1",
                [srs_id],
                |row| {
                    Ok(Crs {
                        srs_id: row.get(0)?,
                        organization: row.get(1)?,
                        organization_coordsys_id: row.get(2)?,
                        definition: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(crs)
    }
}

/// A feature layer of a [`GeoPackage`].
#[derive(Debug)]
pub struct Layer<'a> {
    gpkg: &'a GeoPackage,
    name: String,
    fid_column: Option<String>,
    defn: Defn,
    crs: Option<Crs>,
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

impl<'a> Layer<'a> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn defn(&self) -> &Defn {
        &self.defn
    }

    pub fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }

    pub fn feature_count(&self) -> Result<u64> {
        let sql = format!("SELECT count(*) FROM {}", quote_ident(&self.name));
        let count: i64 = self.gpkg.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn select_sql(&self) -> String {
        let fid = self
            .fid_column
            .as_deref()
            .map(quote_ident)
            .unwrap_or_else(|| "rowid".to_string());
        let mut columns = vec![fid.clone(), quote_ident(&self.defn.geometry.name)];
        columns.extend(self.defn.fields.iter().map(|field| quote_ident(&field.name)));
        format!(
            "SELECT {} FROM {} ORDER BY {}",
            columns.join(", "),
            quote_ident(&self.name),
            fid
        )
    }

    fn read_feature(&self, row: &Row<'_>) -> Result<Feature> {
        let fid: Option<i64> = row.get(0)?;
        let geometry = match row.get_ref(1)? {
            ValueRef::Null => None,
            ValueRef::Blob(blob) => Some(read_gpkg_geometry(blob).map_err(|e| match e {
                GpkgError::InvalidGeometry(msg) => {
                    GpkgError::InvalidGeometry(format!("feature {fid:?}: {msg}"))
                }
                other => other,
            })?),
            other => {
                return Err(GpkgError::InvalidGeometry(format!(
                    "feature {fid:?}: geometry column holds {:?}, not a blob",
                    other.data_type()
                )))
            }
        };
        let fields = self
            .defn
            .fields
            .iter()
            .enumerate()
            .map(|(idx, field)| -> Result<FieldValue> {
                Ok(field_value(row.get_ref(idx + 2)?, field.field_type))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Feature {
            fid,
            geometry,
            fields,
        })
    }

    /// Reads every feature, ordered by feature id.
    pub fn features(&self) -> Result<Vec<Feature>> {
        let mut stmt = self.gpkg.conn.prepare(&self.select_sql())?;
        let mut rows = stmt.query([])?;
        let mut features = Vec::new();
        while let Some(row) = rows.next()? {
            features.push(self.read_feature(row)?);
        }
        debug!(layer = %self.name, count = features.len(), "read features");
        Ok(features)
    }

    /// Reads the whole layer into a [`FeatureCollection`].
    pub fn read(&self) -> Result<FeatureCollection> {
        Ok(FeatureCollection {
            name: self.name.clone(),
            defn: self.defn.clone(),
            crs: self.crs.clone(),
            features: self.features()?,
        })
    }
}

fn field_value(value: ValueRef<'_>, field_type: FieldType) -> FieldValue {
    match value {
        ValueRef::Null => FieldValue::Null,
        ValueRef::Integer(i) => FieldValue::from_integer(field_type, i),
        ValueRef::Real(f) => FieldValue::Real(f),
        ValueRef::Text(text) => FieldValue::from_text(field_type, &String::from_utf8_lossy(text)),
        ValueRef::Blob(blob) => FieldValue::Binary(blob.to_vec()),
    }
}
