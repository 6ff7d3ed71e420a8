//! GDAL/OGR engine
//!
//! Reads a GeoPackage layer through the OGR C API. Geometries are exported as
//! ISO WKB and decoded by [`crate::vector::wkb`], so both engines build the same
//! `geo_types` values.

use std::ffi::{c_int, c_uint, CString};
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::Once;

use chrono::{FixedOffset, NaiveDate, TimeZone};
use gdal_sys::{
    self, GDALDatasetH, OGRErr, OGRFeatureDefnH, OGRFeatureH, OGRFieldSubType, OGRFieldType,
    OGRLayerH, OGRwkbByteOrder, OGRwkbGeometryType,
};
use tracing::debug;

use crate::errors::*;
use crate::utils::{_last_null_pointer_err, _path_to_c_string, _string, ensure_readable};
use crate::vector::wkb::read_wkb;
use crate::vector::{
    Defn, Feature, FeatureCollection, Field, FieldType, FieldValue, GeoPackage, GeomFieldDefn,
    GeometryType,
};

static START: Once = Once::new();

// GDALOpenEx flags, see gdal.h.
const GDAL_OF_READONLY: c_uint = 0x00;
const GDAL_OF_VECTOR: c_uint = 0x04;

const OGR_NULL_FID: i64 = -1;

fn _register_drivers() {
    START.call_once(|| unsafe { gdal_sys::GDALAllRegister() });
}

struct Dataset {
    c_dataset: GDALDatasetH,
    path: PathBuf,
}

impl Dataset {
    fn open(path: &Path) -> Result<Dataset> {
        _register_drivers();
        let c_filename = _path_to_c_string(path)?;
        let c_driver = CString::new("GPKG")?;
        let c_drivers = [c_driver.as_ptr(), ptr::null()];
        let c_dataset = unsafe {
            gdal_sys::GDALOpenEx(
                c_filename.as_ptr(),
                GDAL_OF_READONLY | GDAL_OF_VECTOR,
                c_drivers.as_ptr(),
                ptr::null(),
                ptr::null(),
            )
        };
        if c_dataset.is_null() {
            return Err(GpkgError::InvalidContainer {
                path: path.to_path_buf(),
                msg: _last_null_pointer_err("GDALOpenEx").to_string(),
            });
        }
        Ok(Dataset {
            c_dataset,
            path: path.to_path_buf(),
        })
    }

    // Feature layers only; OGR also exposes attribute tables as layers.
    fn layers(&self) -> impl Iterator<Item = OGRLayerH> + '_ {
        let count = unsafe { gdal_sys::GDALDatasetGetLayerCount(self.c_dataset) };
        (0..count)
            .map(move |idx| unsafe { gdal_sys::GDALDatasetGetLayer(self.c_dataset, idx) })
            .filter(|c_layer| !c_layer.is_null())
            .filter(|&c_layer| unsafe {
                gdal_sys::OGR_L_GetGeomType(c_layer) != OGRwkbGeometryType::wkbNone
            })
    }

    fn layer_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .layers()
            .filter_map(|c_layer| _string(unsafe { gdal_sys::OGR_L_GetName(c_layer) }))
            .collect();
        names.sort();
        names
    }

    // GDALDatasetGetLayerByName falls back to a case-insensitive match, so
    // compare names here instead.
    fn layer_by_name(&self, name: &str) -> Result<OGRLayerH> {
        self.layers()
            .find(|&c_layer| {
                _string(unsafe { gdal_sys::OGR_L_GetName(c_layer) }).as_deref() == Some(name)
            })
            .ok_or_else(|| GpkgError::LayerNotFound {
                layer: name.to_string(),
                available: self.layer_names(),
            })
    }
}

impl Drop for Dataset {
    fn drop(&mut self) {
        unsafe {
            gdal_sys::GDALClose(self.c_dataset);
        }
    }
}

struct OwnedFeature(OGRFeatureH);

impl Drop for OwnedFeature {
    fn drop(&mut self) {
        unsafe { gdal_sys::OGR_F_Destroy(self.0) };
    }
}

fn geometry_type(c_layer: OGRLayerH) -> GeometryType {
    let flat = unsafe { gdal_sys::OGR_GT_Flatten(gdal_sys::OGR_L_GetGeomType(c_layer)) };
    match flat {
        OGRwkbGeometryType::wkbUnknown => GeometryType::Geometry,
        OGRwkbGeometryType::wkbPoint => GeometryType::Point,
        OGRwkbGeometryType::wkbLineString => GeometryType::LineString,
        OGRwkbGeometryType::wkbPolygon => GeometryType::Polygon,
        OGRwkbGeometryType::wkbMultiPoint => GeometryType::MultiPoint,
        OGRwkbGeometryType::wkbMultiLineString => GeometryType::MultiLineString,
        OGRwkbGeometryType::wkbMultiPolygon => GeometryType::MultiPolygon,
        OGRwkbGeometryType::wkbGeometryCollection => GeometryType::GeometryCollection,
        other => {
            let name = _string(unsafe { gdal_sys::OGRGeometryTypeToName(other) })
                .unwrap_or_else(|| other.to_string());
            GeometryType::Other(name.replace(' ', "").to_ascii_uppercase())
        }
    }
}

fn field_type(c_field_type: OGRFieldType::Type, c_sub_type: OGRFieldSubType::Type) -> FieldType {
    match c_field_type {
        OGRFieldType::OFTInteger if c_sub_type == OGRFieldSubType::OFSTBoolean => {
            FieldType::Boolean
        }
        OGRFieldType::OFTInteger | OGRFieldType::OFTInteger64 => FieldType::Integer,
        OGRFieldType::OFTReal => FieldType::Real,
        OGRFieldType::OFTDate => FieldType::Date,
        OGRFieldType::OFTDateTime => FieldType::DateTime,
        OGRFieldType::OFTBinary => FieldType::Binary,
        _ => FieldType::String,
    }
}

fn fields(c_defn: OGRFeatureDefnH) -> Vec<Field> {
    let count = unsafe { gdal_sys::OGR_FD_GetFieldCount(c_defn) };
    (0..count)
        .map(|idx| {
            let c_field_defn = unsafe { gdal_sys::OGR_FD_GetFieldDefn(c_defn, idx) };
            let name = _string(unsafe { gdal_sys::OGR_Fld_GetNameRef(c_field_defn) })
                .unwrap_or_default();
            let (c_type, c_sub_type) = unsafe {
                (
                    gdal_sys::OGR_Fld_GetType(c_field_defn),
                    gdal_sys::OGR_Fld_GetSubType(c_field_defn),
                )
            };
            Field {
                name,
                field_type: field_type(c_type, c_sub_type),
            }
        })
        .collect()
}

fn date_value(c_feature: OGRFeatureH, idx: c_int, field_type: FieldType) -> FieldValue {
    let (mut year, mut month, mut day, mut hour, mut minute, mut tz) = (0, 0, 0, 0, 0, 0);
    let mut second: f32 = 0.0;
    let ok = unsafe {
        gdal_sys::OGR_F_GetFieldAsDateTimeEx(
            c_feature,
            idx,
            &mut year,
            &mut month,
            &mut day,
            &mut hour,
            &mut minute,
            &mut second,
            &mut tz,
        )
    };
    if ok == 0 {
        return FieldValue::Null;
    }
    let Some(date) = NaiveDate::from_ymd_opt(year, month as u32, day as u32) else {
        return FieldValue::Null;
    };
    if field_type == FieldType::Date {
        return FieldValue::Date(date);
    }
    // tz flag: 100 is UTC, each unit above or below is a 15 minute offset.
    let offset_secs = if tz >= 100 { (tz - 100) * 15 * 60 } else { 0 };
    let whole = second.trunc() as u32;
    let millis = ((second - second.trunc()) * 1000.0).round() as u32;
    let datetime = date
        .and_hms_milli_opt(hour as u32, minute as u32, whole, millis)
        .zip(FixedOffset::east_opt(offset_secs))
        .and_then(|(naive, offset)| offset.from_local_datetime(&naive).single());
    datetime.map(FieldValue::DateTime).unwrap_or(FieldValue::Null)
}

fn field_value(c_feature: OGRFeatureH, idx: c_int, field: &Field) -> FieldValue {
    if unsafe { gdal_sys::OGR_F_IsFieldSetAndNotNull(c_feature, idx) } == 0 {
        return FieldValue::Null;
    }
    match field.field_type {
        FieldType::Integer => {
            FieldValue::Integer(unsafe { gdal_sys::OGR_F_GetFieldAsInteger64(c_feature, idx) })
        }
        FieldType::Boolean => {
            FieldValue::Boolean(unsafe { gdal_sys::OGR_F_GetFieldAsInteger(c_feature, idx) } != 0)
        }
        FieldType::Real => {
            FieldValue::Real(unsafe { gdal_sys::OGR_F_GetFieldAsDouble(c_feature, idx) })
        }
        FieldType::Date | FieldType::DateTime => date_value(c_feature, idx, field.field_type),
        FieldType::Binary => {
            let mut len: c_int = 0;
            let c_bytes = unsafe { gdal_sys::OGR_F_GetFieldAsBinary(c_feature, idx, &mut len) };
            if c_bytes.is_null() || len <= 0 {
                FieldValue::Binary(Vec::new())
            } else {
                let bytes = unsafe { std::slice::from_raw_parts(c_bytes, len as usize) };
                FieldValue::Binary(bytes.to_vec())
            }
        }
        FieldType::String => FieldValue::String(
            _string(unsafe { gdal_sys::OGR_F_GetFieldAsString(c_feature, idx) })
                .unwrap_or_default(),
        ),
    }
}

fn geometry(c_feature: OGRFeatureH) -> Result<Option<geo_types::Geometry<f64>>> {
    let c_geom = unsafe { gdal_sys::OGR_F_GetGeometryRef(c_feature) };
    if c_geom.is_null() {
        return Ok(None);
    }
    let size = unsafe { gdal_sys::OGR_G_WkbSize(c_geom) };
    let mut wkb = vec![0u8; size.max(0) as usize];
    let rv = unsafe {
        gdal_sys::OGR_G_ExportToIsoWkb(c_geom, OGRwkbByteOrder::wkbNDR, wkb.as_mut_ptr())
    };
    if rv != OGRErr::OGRERR_NONE {
        return Err(GpkgError::OgrError {
            err: rv,
            method_name: "OGR_G_ExportToIsoWkb",
        });
    }
    read_wkb(&wkb).map(Some)
}

pub(crate) fn layer_names(path: &Path) -> Result<Vec<String>> {
    ensure_readable(path)?;
    Ok(Dataset::open(path)?.layer_names())
}

pub(crate) fn read_layer(path: &Path, name: &str) -> Result<FeatureCollection> {
    // The declared gpkg_spatial_ref_sys row, not GDAL's re-derived spatial
    // reference, which drops the undefined ids 0 and -1.
    let gpkg = GeoPackage::open(path)?;
    let (srs_id, crs) = {
        let layer = gpkg.layer(name)?;
        (layer.defn().geometry.srs_id, layer.crs().cloned())
    };

    let dataset = Dataset::open(path)?;
    let c_layer = dataset.layer_by_name(name)?;
    debug!(path = %dataset.path.display(), layer = name, "opened OGR layer");

    let c_defn = unsafe { gdal_sys::OGR_L_GetLayerDefn(c_layer) };
    let fields = fields(c_defn);
    let geometry_name = _string(unsafe { gdal_sys::OGR_L_GetGeometryColumn(c_layer) })
        .unwrap_or_default();
    let defn = Defn {
        geometry: GeomFieldDefn {
            name: geometry_name,
            geometry_type: geometry_type(c_layer),
            srs_id,
        },
        fields,
    };

    let mut features = Vec::new();
    unsafe { gdal_sys::OGR_L_ResetReading(c_layer) };
    loop {
        let c_feature = unsafe { gdal_sys::OGR_L_GetNextFeature(c_layer) };
        if c_feature.is_null() {
            break;
        }
        let feature = OwnedFeature(c_feature);
        let fid = unsafe { gdal_sys::OGR_F_GetFID(feature.0) };
        let values = defn
            .fields
            .iter()
            .enumerate()
            .map(|(idx, field)| field_value(feature.0, idx as c_int, field))
            .collect();
        features.push(Feature {
            fid: (fid != OGR_NULL_FID).then_some(fid),
            geometry: geometry(feature.0)?,
            fields: values,
        });
    }
    debug!(layer = name, count = features.len(), "read features");

    Ok(FeatureCollection {
        name: name.to_string(),
        defn,
        crs,
        features,
    })
}
