use std::path::PathBuf;

use thiserror::Error;

#[cfg(feature = "ogr")]
use std::ffi::NulError;

pub type Result<T> = std::result::Result<T, GpkgError>;

#[derive(Debug, Error)]
pub enum GpkgError {
    #[error("File not found or unreadable: '{}'", path.display())]
    FileNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Cannot expand '{path}': no home directory")]
    NoHomeDirectory { path: String },
    #[error("Layer '{layer}' not found, available layers: {available:?}")]
    LayerNotFound {
        layer: String,
        available: Vec<String>,
    },
    #[error("'{}' is not a GeoPackage: {msg}", path.display())]
    InvalidContainer { path: PathBuf, msg: String },
    #[error("Invalid geometry blob: {0}")]
    InvalidGeometry(String),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Unknown I/O engine '{0}', expected one of: sqlite, ogr")]
    UnknownEngine(String),
    #[error("Engine '{0}' is not compiled in, enable the '{0}' feature")]
    EngineUnavailable(&'static str),
    #[error("Column '{column}' not found in layer '{layer}'")]
    MissingColumn { layer: String, column: String },
    #[error("Column '{column}' does not hold geometries (found {found})")]
    UnsupportedGeometry { column: String, found: String },
    #[error("No display available: {0}")]
    NoDisplay(String),
    #[error("Display error: {0}")]
    Display(String),

    #[cfg(feature = "ogr")]
    #[error("FfiNulError")]
    FfiNulError(#[from] NulError),
    #[cfg(feature = "ogr")]
    #[error("GDAL method '{method_name}' returned a NULL pointer. Error msg: '{msg}'")]
    NullPointer {
        method_name: &'static str,
        msg: String,
    },
    #[cfg(feature = "ogr")]
    #[error("OGR method '{method_name}' returned error: '{err:?}'")]
    OgrError {
        err: gdal_sys::OGRErr::Type,
        method_name: &'static str,
    },
}
