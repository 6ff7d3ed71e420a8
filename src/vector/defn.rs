use std::fmt;
use std::str::FromStr;

/// Attribute type of a layer column, following the GeoPackage column types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldType {
    Integer,
    Real,
    String,
    Boolean,
    Date,
    DateTime,
    Binary,
}

impl FieldType {
    /// Maps a declared SQLite column type (`INTEGER`, `TEXT(12)`, `DATETIME`, ...)
    /// to a field type. Unknown declarations read as strings.
    pub fn from_declared(declared: &str) -> FieldType {
        let upper = declared.trim().to_ascii_uppercase();
        let base = upper.split('(').next().unwrap_or_default().trim();
        match base {
            "BOOLEAN" => FieldType::Boolean,
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "INTEGER" | "BIGINT" => {
                FieldType::Integer
            }
            "FLOAT" | "DOUBLE" | "REAL" | "NUMERIC" => FieldType::Real,
            "DATE" => FieldType::Date,
            "DATETIME" | "TIMESTAMP" => FieldType::DateTime,
            "BLOB" => FieldType::Binary,
            _ => FieldType::String,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Integer => "integer",
            FieldType::Real => "real",
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::DateTime => "datetime",
            FieldType::Binary => "binary",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An attribute column of a layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
}

/// Geometry type declared for a layer's geometry column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GeometryType {
    Geometry,
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
    /// Any other declared type (curves, surfaces) kept verbatim.
    Other(String),
}

impl FromStr for GeometryType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_uppercase().as_str() {
            "GEOMETRY" | "UNKNOWN" => GeometryType::Geometry,
            "POINT" => GeometryType::Point,
            "LINESTRING" => GeometryType::LineString,
            "POLYGON" => GeometryType::Polygon,
            "MULTIPOINT" => GeometryType::MultiPoint,
            "MULTILINESTRING" => GeometryType::MultiLineString,
            "MULTIPOLYGON" => GeometryType::MultiPolygon,
            "GEOMETRYCOLLECTION" => GeometryType::GeometryCollection,
            other => GeometryType::Other(other.to_string()),
        })
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GeometryType::Geometry => "GEOMETRY",
            GeometryType::Point => "POINT",
            GeometryType::LineString => "LINESTRING",
            GeometryType::Polygon => "POLYGON",
            GeometryType::MultiPoint => "MULTIPOINT",
            GeometryType::MultiLineString => "MULTILINESTRING",
            GeometryType::MultiPolygon => "MULTIPOLYGON",
            GeometryType::GeometryCollection => "GEOMETRYCOLLECTION",
            GeometryType::Other(name) => name,
        };
        f.write_str(name)
    }
}

/// The geometry column of a layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeomFieldDefn {
    pub name: String,
    pub geometry_type: GeometryType,
    pub srs_id: i32,
}

/// Layer schema: the geometry column plus the attribute columns in table order.
///
/// The feature id column is not an attribute; it is exposed as [`crate::vector::Feature::fid`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Defn {
    pub geometry: GeomFieldDefn,
    pub fields: Vec<Field>,
}

impl Defn {
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }
}

/// Spatial reference of a layer, as recorded in `gpkg_spatial_ref_sys`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Crs {
    pub srs_id: i32,
    pub organization: String,
    pub organization_coordsys_id: i32,
    /// WKT definition, or `"undefined"`.
    pub definition: String,
}

impl Crs {
    /// Whether coordinates are longitude/latitude degrees.
    ///
    /// `srs_id` 0 is the GeoPackage "undefined geographic" system.
    pub fn is_geographic(&self) -> bool {
        if self.srs_id == 0 {
            return true;
        }
        let definition = self.definition.trim_start().to_ascii_uppercase();
        definition.starts_with("GEOGCS") || definition.starts_with("GEOGCRS")
    }

    /// `AUTHORITY:CODE`, e.g. `EPSG:4269`.
    pub fn authority_code(&self) -> String {
        format!("{}:{}", self.organization, self.organization_coordsys_id)
    }
}
