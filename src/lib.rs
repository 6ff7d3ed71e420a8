//! Read a named layer of a [GeoPackage](https://www.geopackage.org/) into
//! [`geo_types`] features and plot it.
//!
//! Reading goes through one of two engines, chosen with [`ReadOptions`]: a
//! native SQLite reader (the default) or GDAL/OGR with the `ogr` feature.
//! Both return the same [`FeatureCollection`].
//!
//! ## Use
//!
//! ```no_run
//! use gpkg_plot::{plot, read_file, Engine, ReadOptions};
//!
//! let options = ReadOptions::with_engine(Engine::Sqlite);
//! let huc12 = read_file("~/Documents/WBD/WBD_National_GPKG.gpkg", "WBDHU12", &options)?;
//! println!("{} watersheds within {:?}", huc12.len(), huc12.total_bounds());
//!
//! let figure = plot(&huc12, huc12.geometry_column())?;
//! # #[cfg(feature = "viewer")]
//! figure.show()?;
//! # Ok::<(), gpkg_plot::GpkgError>(())
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod errors;
pub mod plot;
pub mod utils;
pub mod vector;

pub use crate::config::{Engine, ReadOptions};
pub use crate::errors::{GpkgError, Result};
pub use crate::plot::{plot, Plot, Style};
#[cfg(feature = "viewer")]
pub use crate::plot::ViewerOptions;
pub use crate::vector::{list_layers, read_file, FeatureCollection};
