use std::path::Path;

use tracing::debug;

use crate::config::{Engine, ReadOptions};
use crate::errors::*;
use crate::utils::expand_home;
use crate::vector::{FeatureCollection, GeoPackage};

/// Reads every feature of `layer` from the GeoPackage at `path`.
///
/// A leading `~` in `path` is expanded to the home directory. The layer name
/// is matched case-sensitively. Nothing is returned unless the whole layer
/// decodes.
pub fn read_file(path: &str, layer: &str, options: &ReadOptions) -> Result<FeatureCollection> {
    let path = expand_home(path)?;
    debug!(path = %path.display(), layer, engine = %options.engine, "reading layer");

    let collection = match options.engine {
        Engine::Sqlite => GeoPackage::open(&path)?.layer(layer)?.read()?,
        Engine::Ogr => read_ogr(&path, layer)?,
    };
    debug!(
        layer,
        features = collection.len(),
        fields = collection.defn.fields.len(),
        "layer loaded"
    );
    Ok(collection)
}

/// Names of the feature layers in the GeoPackage at `path`, sorted.
pub fn list_layers(path: &str, options: &ReadOptions) -> Result<Vec<String>> {
    let path = expand_home(path)?;
    match options.engine {
        Engine::Sqlite => GeoPackage::open(&path)?.layer_names(),
        Engine::Ogr => list_ogr(&path),
    }
}

#[cfg(feature = "ogr")]
fn read_ogr(path: &Path, layer: &str) -> Result<FeatureCollection> {
    crate::vector::ogr::read_layer(path, layer)
}

#[cfg(not(feature = "ogr"))]
fn read_ogr(_path: &Path, _layer: &str) -> Result<FeatureCollection> {
    Err(GpkgError::EngineUnavailable(Engine::Ogr.name()))
}

#[cfg(feature = "ogr")]
fn list_ogr(path: &Path) -> Result<Vec<String>> {
    crate::vector::ogr::layer_names(path)
}

#[cfg(not(feature = "ogr"))]
fn list_ogr(_path: &Path) -> Result<Vec<String>> {
    Err(GpkgError::EngineUnavailable(Engine::Ogr.name()))
}
