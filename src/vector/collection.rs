use geo::BoundingRect;
use geo_types::{Geometry, Rect};

use crate::errors::*;
use crate::vector::{Crs, Defn, Feature, FieldValue};

/// All features of one layer, held in memory in source order.
///
/// ```no_run
/// use gpkg_plot::{read_file, ReadOptions};
///
/// let watersheds = read_file("~/Documents/WBD/WBD_National_GPKG.gpkg", "WBDHU12", &ReadOptions::default())?;
/// for feature in watersheds.iter() {
///     let name = watersheds.field(feature, "name")?;
///     println!("{:?} {:?}", feature.fid, name.as_str());
/// }
/// # Ok::<(), gpkg_plot::GpkgError>(())
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureCollection {
    pub name: String,
    pub defn: Defn,
    pub crs: Option<Crs>,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    pub fn get(&self, idx: usize) -> Option<&Feature> {
        self.features.get(idx)
    }

    /// Name of the geometry column.
    pub fn geometry_column(&self) -> &str {
        &self.defn.geometry.name
    }

    /// The value of attribute `name` for `feature`.
    pub fn field<'a>(&self, feature: &'a Feature, name: &str) -> Result<&'a FieldValue> {
        let idx = self.field_index(name)?;
        feature
            .field_by_index(idx)
            .ok_or_else(|| self.missing_column(name))
    }

    /// All values of attribute `name`, one per feature.
    pub fn column(&self, name: &str) -> Result<Vec<&FieldValue>> {
        let idx = self.field_index(name)?;
        self.features
            .iter()
            .map(|feature| {
                feature
                    .field_by_index(idx)
                    .ok_or_else(|| self.missing_column(name))
            })
            .collect()
    }

    /// Geometries in feature order; `None` for null geometries.
    pub fn geometries(&self) -> impl Iterator<Item = Option<&Geometry<f64>>> {
        self.features.iter().map(Feature::geometry)
    }

    /// Bounding rectangle of all non-empty geometries.
    pub fn total_bounds(&self) -> Option<Rect<f64>> {
        union_bounds(self.geometries().flatten())
    }

    fn field_index(&self, name: &str) -> Result<usize> {
        self.defn
            .field_index(name)
            .ok_or_else(|| self.missing_column(name))
    }

    fn missing_column(&self, name: &str) -> GpkgError {
        GpkgError::MissingColumn {
            layer: self.name.clone(),
            column: name.to_string(),
        }
    }
}

impl<'a> IntoIterator for &'a FeatureCollection {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}

pub(crate) fn union_bounds<'a, I>(geometries: I) -> Option<Rect<f64>>
where
    I: IntoIterator<Item = &'a Geometry<f64>>,
{
    geometries
        .into_iter()
        .filter_map(|geometry| geometry.bounding_rect())
        .reduce(|acc, rect| {
            Rect::new(
                (acc.min().x.min(rect.min().x), acc.min().y.min(rect.min().y)),
                (acc.max().x.max(rect.max().x), acc.max().y.max(rect.max().y)),
            )
        })
}

#[cfg(test)]
mod tests {
    use geo_types::{polygon, Point};

    use super::*;
    use crate::vector::{Field, FieldType, GeomFieldDefn, GeometryType};

    fn collection() -> FeatureCollection {
        let defn = Defn {
            geometry: GeomFieldDefn {
                name: "shape".to_string(),
                geometry_type: GeometryType::Geometry,
                srs_id: 4326,
            },
            fields: vec![
                Field {
                    name: "huc12".to_string(),
                    field_type: FieldType::String,
                },
                Field {
                    name: "areasqkm".to_string(),
                    field_type: FieldType::Real,
                },
            ],
        };
        let features = vec![
            Feature {
                fid: Some(1),
                geometry: Some(Geometry::Polygon(polygon![
                    (x: 0.0, y: 0.0),
                    (x: 2.0, y: 0.0),
                    (x: 2.0, y: 1.0)
                ])),
                fields: vec![
                    FieldValue::String("101900050101".to_string()),
                    FieldValue::Real(88.5),
                ],
            },
            Feature {
                fid: Some(2),
                geometry: None,
                fields: vec![FieldValue::Null, FieldValue::Null],
            },
            Feature {
                fid: Some(3),
                geometry: Some(Geometry::Point(Point::new(-3.0, 4.0))),
                fields: vec![
                    FieldValue::String("101900050102".to_string()),
                    FieldValue::Real(12.0),
                ],
            },
        ];
        FeatureCollection {
            name: "WBDHU12".to_string(),
            defn,
            crs: None,
            features,
        }
    }

    #[test]
    fn test_field_and_column() {
        let fc = collection();
        assert_eq!(fc.len(), 3);
        assert_eq!(fc.geometry_column(), "shape");
        let first = fc.get(0).unwrap();
        assert_eq!(
            fc.field(first, "huc12").unwrap().as_str(),
            Some("101900050101")
        );
        let areas: Vec<Option<f64>> = fc
            .column("areasqkm")
            .unwrap()
            .into_iter()
            .map(FieldValue::as_real)
            .collect();
        assert_eq!(areas, vec![Some(88.5), None, Some(12.0)]);
    }

    #[test]
    fn test_missing_column() {
        let fc = collection();
        let err = fc.column("HUC12").unwrap_err();
        assert!(matches!(
            err,
            GpkgError::MissingColumn { ref column, .. } if column == "HUC12"
        ));
    }

    #[test]
    fn test_total_bounds_skips_null_geometries() {
        let fc = collection();
        assert_eq!(
            fc.total_bounds(),
            Some(Rect::new((-3.0, 0.0), (2.0, 4.0)))
        );
        assert_eq!(fc.geometries().filter(Option::is_none).count(), 1);
    }

    #[test]
    fn test_total_bounds_empty() {
        let mut fc = collection();
        fc.features.clear();
        assert!(fc.is_empty());
        assert_eq!(fc.total_bounds(), None);
    }
}
