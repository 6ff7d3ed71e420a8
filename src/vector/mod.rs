//! GeoPackage vector data
//!
//! ## Reading
//!
//! ```no_run
//! use gpkg_plot::config::ReadOptions;
//! use gpkg_plot::vector::read_file;
//!
//! let huc12 = read_file("~/Documents/WBD/WBD_National_GPKG.gpkg", "WBDHU12", &ReadOptions::default())?;
//! for feature in &huc12 {
//!     let name = huc12.field(feature, "name")?;
//!     println!("{:?} {:?}", name.as_str(), feature.geometry());
//! }
//! # Ok::<(), gpkg_plot::GpkgError>(())
//! ```

pub use crate::vector::collection::FeatureCollection;
pub use crate::vector::dataset::{GeoPackage, Layer};
pub use crate::vector::defn::{Crs, Defn, Field, FieldType, GeomFieldDefn, GeometryType};
pub use crate::vector::feature::{Feature, FieldValue};
pub use crate::vector::read::{list_layers, read_file};

pub(crate) use crate::vector::collection::union_bounds;

mod collection;
mod dataset;
mod defn;
mod feature;
#[cfg(feature = "ogr")]
mod ogr;
mod read;
pub mod wkb;
