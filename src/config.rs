//! Read configuration
//!
//! The decoding backend is chosen per call through [`ReadOptions`] instead of a
//! process-wide setting, so every read states which engine it uses.
//!
//! ```
//! use gpkg_plot::config::{Engine, ReadOptions};
//!
//! let options = ReadOptions {
//!     engine: "sqlite".parse().unwrap(),
//! };
//! assert_eq!(options.engine, Engine::Sqlite);
//! ```

use std::fmt;
use std::str::FromStr;

use crate::errors::{GpkgError, Result};

/// Backend used to decode a GeoPackage.
///
/// Both engines return the same records; they differ only in the native code
/// involved and in the formats they could be extended to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Engine {
    /// SQLite through `rusqlite`, geometries decoded by [`crate::vector::wkb`].
    #[default]
    Sqlite,
    /// GDAL/OGR through `gdal-sys`. Requires the `ogr` feature.
    Ogr,
}

impl Engine {
    pub fn name(&self) -> &'static str {
        match self {
            Engine::Sqlite => "sqlite",
            Engine::Ogr => "ogr",
        }
    }

    /// Whether this engine was compiled into the crate.
    pub fn is_available(&self) -> bool {
        match self {
            Engine::Sqlite => true,
            Engine::Ogr => cfg!(feature = "ogr"),
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Engine {
    type Err = GpkgError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "native" => Ok(Engine::Sqlite),
            "ogr" | "gdal" => Ok(Engine::Ogr),
            _ => Err(GpkgError::UnknownEngine(s.to_string())),
        }
    }
}

/// Options for [`crate::read_file`] and [`crate::list_layers`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadOptions {
    pub engine: Engine,
}

impl ReadOptions {
    pub fn with_engine(engine: Engine) -> Self {
        ReadOptions { engine }
    }
}
