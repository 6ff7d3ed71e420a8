use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use geo_types::Geometry;

use crate::vector::FieldType;

/// A single attribute value of a feature.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Real(f64),
    String(String),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
    Binary(Vec<u8>),
}

impl FieldValue {
    /// Interprets text stored for a column of type `field_type`.
    ///
    /// Date and datetime text that does not parse is kept as a string.
    pub fn from_text(field_type: FieldType, text: &str) -> FieldValue {
        match field_type {
            FieldType::Date => NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map(FieldValue::Date)
                .unwrap_or_else(|_| FieldValue::String(text.to_string())),
            FieldType::DateTime => parse_datetime(text)
                .map(FieldValue::DateTime)
                .unwrap_or_else(|| FieldValue::String(text.to_string())),
            _ => FieldValue::String(text.to_string()),
        }
    }

    /// Interprets an integer stored for a column of type `field_type`.
    pub fn from_integer(field_type: FieldType, value: i64) -> FieldValue {
        match field_type {
            FieldType::Boolean => FieldValue::Boolean(value != 0),
            FieldType::Real => FieldValue::Real(value as f64),
            _ => FieldValue::Integer(value),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(rv) => Some(rv),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(rv) => Some(*rv),
            _ => None,
        }
    }

    /// Returns the value as `f64`, widening integers.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            FieldValue::Real(rv) => Some(*rv),
            FieldValue::Integer(rv) => Some(*rv as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(rv) => Some(*rv),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(rv) => Some(*rv),
            FieldValue::DateTime(rv) => Some(rv.date_naive()),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            FieldValue::DateTime(rv) => Some(*rv),
            _ => None,
        }
    }

    /// Short name of the value's type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Integer(_) => "integer",
            FieldValue::Real(_) => "real",
            FieldValue::String(_) => "string",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Date(_) => "date",
            FieldValue::DateTime(_) => "datetime",
            FieldValue::Binary(_) => "binary",
        }
    }
}

// GeoPackage datetimes are ISO-8601 in UTC (`2023-04-01T12:30:00.000Z`), but
// files written by other tools sometimes drop the zone designator.
fn parse_datetime(text: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt);
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc().fixed_offset())
}

/// One record of a layer: feature id, geometry and attribute values.
///
/// `fields` holds one value per [`crate::vector::Defn::fields`] entry, in the same order.
#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
    pub fid: Option<i64>,
    pub geometry: Option<Geometry<f64>>,
    pub fields: Vec<FieldValue>,
}

impl Feature {
    pub fn geometry(&self) -> Option<&Geometry<f64>> {
        self.geometry.as_ref()
    }

    pub fn field_by_index(&self, idx: usize) -> Option<&FieldValue> {
        self.fields.get(idx)
    }
}
