//! Plotting a feature collection
//!
//! [`plot`] turns the geometries of a [`FeatureCollection`] into a [`Plot`]:
//! one [`DrawnShape`] per feature, in data coordinates, with polygons already
//! triangulated for filling. With the `viewer` feature, [`Plot::show`] opens a
//! window and blocks until it is closed.
//!
//! ```no_run
//! use gpkg_plot::{plot, read_file, ReadOptions};
//!
//! let huc12 = read_file("~/Documents/WBD/WBD_National_GPKG.gpkg", "WBDHU12", &ReadOptions::default())?;
//! let figure = plot(&huc12, huc12.geometry_column())?;
//! println!("{} shapes within {:?}", figure.shape_count(), figure.extent);
//! # Ok::<(), gpkg_plot::GpkgError>(())
//! ```

use geo::{BoundingRect, TriangulateEarcut};
use geo_types::{Coord, Geometry, LineString, Polygon, Rect, Triangle};
use tracing::warn;

use crate::errors::*;
use crate::vector::{union_bounds, Crs, FeatureCollection};

mod viewport;
#[cfg(feature = "viewer")]
mod viewer;

pub use self::viewport::{nice_ticks, ScreenRect, Viewport};
#[cfg(feature = "viewer")]
pub use self::viewer::ViewerOptions;

/// An 8-bit RGBA color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgba(pub u8, pub u8, pub u8, pub u8);

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Rgba {
        Rgba(r, g, b, 255)
    }
}

/// Colors and sizes used to draw every shape.
#[derive(Clone, Debug, PartialEq)]
pub struct Style {
    pub fill: Rgba,
    pub edge: Rgba,
    pub edge_width: f32,
    pub line: Rgba,
    pub line_width: f32,
    pub point: Rgba,
    pub point_radius: f32,
}

impl Default for Style {
    /// matplotlib's first cycle color (`C0`) for everything.
    fn default() -> Self {
        let c0 = Rgba::rgb(0x1f, 0x77, 0xb4);
        Style {
            fill: c0,
            edge: Rgba::rgb(0x17, 0x59, 0x87),
            edge_width: 0.5,
            line: c0,
            line_width: 1.5,
            point: c0,
            point_radius: 3.0,
        }
    }
}

/// A polyline in data coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    pub coords: Vec<Coord<f64>>,
    /// Polygon ring (drawn with the edge style) rather than a line.
    pub closed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeKind {
    Point,
    Line,
    Polygon,
    /// A geometry collection mixing the kinds above.
    Mixed,
    /// An empty geometry; nothing is drawn.
    Empty,
}

/// Everything drawn for one feature.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawnShape {
    /// Index of the feature in the collection.
    pub feature_index: usize,
    pub kind: ShapeKind,
    pub fill: Vec<Triangle<f64>>,
    pub paths: Vec<Path>,
    pub points: Vec<Coord<f64>>,
    pub bounds: Option<Rect<f64>>,
}

impl DrawnShape {
    fn from_geometry(feature_index: usize, geometry: &Geometry<f64>) -> DrawnShape {
        let mut shape = DrawnShape {
            feature_index,
            kind: ShapeKind::Empty,
            fill: Vec::new(),
            paths: Vec::new(),
            points: Vec::new(),
            bounds: geometry.bounding_rect(),
        };
        shape.add(geometry);
        shape
    }

    fn mark(&mut self, kind: ShapeKind) {
        self.kind = match self.kind {
            ShapeKind::Empty => kind,
            current if current == kind => current,
            _ => ShapeKind::Mixed,
        };
    }

    fn add_line(&mut self, line: &LineString<f64>) {
        if line.0.is_empty() {
            return;
        }
        self.mark(ShapeKind::Line);
        self.paths.push(Path {
            coords: line.0.clone(),
            closed: false,
        });
    }

    fn add_polygon(&mut self, polygon: &Polygon<f64>) {
        if polygon.exterior().0.is_empty() {
            return;
        }
        self.mark(ShapeKind::Polygon);
        self.fill.extend(polygon.earcut_triangles());
        for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
            self.paths.push(Path {
                coords: ring.0.clone(),
                closed: true,
            });
        }
    }

    fn add(&mut self, geometry: &Geometry<f64>) {
        match geometry {
            Geometry::Point(p) => {
                self.mark(ShapeKind::Point);
                self.points.push(p.0);
            }
            Geometry::MultiPoint(mp) => {
                for p in &mp.0 {
                    self.mark(ShapeKind::Point);
                    self.points.push(p.0);
                }
            }
            Geometry::Line(line) => self.add_line(&LineString(vec![line.start, line.end])),
            Geometry::LineString(ls) => self.add_line(ls),
            Geometry::MultiLineString(mls) => mls.0.iter().for_each(|ls| self.add_line(ls)),
            Geometry::Polygon(polygon) => self.add_polygon(polygon),
            Geometry::MultiPolygon(mp) => mp.0.iter().for_each(|p| self.add_polygon(p)),
            Geometry::Rect(rect) => self.add_polygon(&rect.to_polygon()),
            Geometry::Triangle(triangle) => self.add_polygon(&triangle.to_polygon()),
            Geometry::GeometryCollection(gc) => gc.0.iter().for_each(|g| self.add(g)),
        }
    }
}

/// A figure ready to be displayed.
#[derive(Clone, Debug, PartialEq)]
pub struct Plot {
    pub title: String,
    pub shapes: Vec<DrawnShape>,
    /// Union of the bounding rectangles of all drawn geometries.
    pub extent: Option<Rect<f64>>,
    /// Screen length of one y unit relative to one x unit.
    pub aspect: f64,
    pub style: Style,
}

impl Plot {
    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    pub fn with_style(mut self, style: Style) -> Plot {
        self.style = style;
        self
    }

    /// Opens a window showing the plot and blocks until it is closed.
    #[cfg(feature = "viewer")]
    pub fn show(self) -> Result<()> {
        self.show_with(&ViewerOptions::default())
    }

    #[cfg(feature = "viewer")]
    pub fn show_with(self, options: &ViewerOptions) -> Result<()> {
        viewer::show(self, options)
    }
}

/// Aspect ratio for a plot of `extent` in `crs`.
///
/// Geographic coordinates are stretched by `1 / cos(mid latitude)` so shapes
/// keep their proportions near the middle of the extent; anything else is
/// drawn with equal axes.
pub fn aspect_for(crs: Option<&Crs>, extent: Option<Rect<f64>>) -> f64 {
    let (Some(crs), Some(extent)) = (crs, extent) else {
        return 1.0;
    };
    if !crs.is_geographic() {
        return 1.0;
    }
    let mid_lat = (extent.min().y + extent.max().y) / 2.0;
    let aspect = 1.0 / mid_lat.to_radians().cos();
    if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        1.0
    }
}

/// Draws the geometries in `column` of `collection`.
///
/// `column` must name the geometry column. Features with a null geometry are
/// not drawn.
pub fn plot(collection: &FeatureCollection, column: &str) -> Result<Plot> {
    if column != collection.geometry_column() {
        return Err(match collection.defn.field(column) {
            Some(field) => GpkgError::UnsupportedGeometry {
                column: column.to_string(),
                found: format!("{} values", field.field_type),
            },
            None => GpkgError::MissingColumn {
                layer: collection.name.clone(),
                column: column.to_string(),
            },
        });
    }

    let shapes: Vec<DrawnShape> = collection
        .iter()
        .enumerate()
        .filter_map(|(idx, feature)| {
            feature
                .geometry()
                .map(|geometry| DrawnShape::from_geometry(idx, geometry))
        })
        .collect();
    let skipped = collection.len() - shapes.len();
    if skipped > 0 {
        warn!(layer = %collection.name, skipped, "features without geometry are not drawn");
    }

    let extent = union_bounds(collection.geometries().flatten());
    Ok(Plot {
        title: collection.name.clone(),
        shapes,
        extent,
        aspect: aspect_for(collection.crs.as_ref(), extent),
        style: Style::default(),
    })
}

/// Fails with [`GpkgError::NoDisplay`] when neither an X11 nor a Wayland
/// display is configured.
#[cfg_attr(not(feature = "viewer"), allow(dead_code))]
pub(crate) fn check_display_env<F>(lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<std::ffi::OsString>,
{
    let configured = ["DISPLAY", "WAYLAND_DISPLAY"]
        .iter()
        .any(|key| lookup(key).is_some_and(|value| !value.is_empty()));
    if configured {
        Ok(())
    } else {
        Err(GpkgError::NoDisplay(
            "neither DISPLAY nor WAYLAND_DISPLAY is set".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use geo_types::{line_string, point, polygon, GeometryCollection, MultiPolygon};

    use super::*;
    use crate::vector::{Defn, Feature, Field, FieldType, FieldValue, GeomFieldDefn, GeometryType};

    fn collection(geometries: Vec<Option<Geometry<f64>>>) -> FeatureCollection {
        FeatureCollection {
            name: "WBDHU12".to_string(),
            defn: Defn {
                geometry: GeomFieldDefn {
                    name: "shape".to_string(),
                    geometry_type: GeometryType::Geometry,
                    srs_id: 4269,
                },
                fields: vec![Field {
                    name: "name".to_string(),
                    field_type: FieldType::String,
                }],
            },
            crs: None,
            features: geometries
                .into_iter()
                .enumerate()
                .map(|(idx, geometry)| Feature {
                    fid: Some(idx as i64 + 1),
                    geometry,
                    fields: vec![FieldValue::String(format!("basin {idx}"))],
                })
                .collect(),
        }
    }

    fn nad83() -> Crs {
        Crs {
            srs_id: 4269,
            organization: "EPSG".to_string(),
            organization_coordsys_id: 4269,
            definition: r#"GEOGCS["NAD83"]"#.to_string(),
        }
    }

    #[test]
    fn test_one_shape_per_feature() {
        let square = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)];
        let multi = MultiPolygon(vec![square.clone(), square.clone()]);
        let fc = collection(vec![
            Some(Geometry::Polygon(square.clone())),
            Some(Geometry::MultiPolygon(multi)),
            Some(Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 3.0, y: 2.0)])),
            Some(Geometry::Point(point!(x: -1.0, y: 5.0))),
        ]);

        let plot = plot(&fc, "shape").unwrap();
        assert_eq!(plot.shape_count(), 4);
        assert_eq!(plot.shapes[0].kind, ShapeKind::Polygon);
        assert_eq!(plot.shapes[0].fill.len(), 2);
        assert_eq!(plot.shapes[0].paths.len(), 1);
        assert!(plot.shapes[0].paths[0].closed);
        assert_eq!(plot.shapes[1].paths.len(), 2);
        assert_eq!(plot.shapes[2].kind, ShapeKind::Line);
        assert_eq!(plot.shapes[3].kind, ShapeKind::Point);
        assert_eq!(
            plot.extent,
            Some(Rect::new((-1.0, 0.0), (3.0, 5.0)))
        );
        assert_eq!(plot.aspect, 1.0);
        assert_eq!(plot.title, "WBDHU12");
    }

    #[test]
    fn test_polygon_with_hole_fill() {
        let donut = polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0), (x: 0.0, y: 4.0)],
            interiors: [[(x: 1.0, y: 1.0), (x: 3.0, y: 1.0), (x: 3.0, y: 3.0), (x: 1.0, y: 3.0)]]
        );
        let fc = collection(vec![Some(Geometry::Polygon(donut))]);
        let plot = plot(&fc, "shape").unwrap();
        let shape = &plot.shapes[0];
        assert_eq!(shape.paths.len(), 2);
        // Filled area excludes the hole: 16 - 4.
        let area: f64 = shape
            .fill
            .iter()
            .map(|t| {
                ((t.1.x - t.0.x) * (t.2.y - t.0.y) - (t.2.x - t.0.x) * (t.1.y - t.0.y)).abs() / 2.0
            })
            .sum();
        assert!((area - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_null_geometries_are_skipped() {
        let fc = collection(vec![
            None,
            Some(Geometry::Point(point!(x: 2.0, y: 2.0))),
            None,
        ]);
        let plot = plot(&fc, "shape").unwrap();
        assert_eq!(plot.shape_count(), 1);
        assert_eq!(plot.shapes[0].feature_index, 1);
    }

    #[test]
    fn test_mixed_and_empty_shapes() {
        let gc = GeometryCollection(vec![
            Geometry::Point(point!(x: 0.0, y: 0.0)),
            Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)]),
        ]);
        let fc = collection(vec![
            Some(Geometry::GeometryCollection(gc)),
            Some(Geometry::MultiPoint(Vec::<geo_types::Point<f64>>::new().into())),
        ]);
        let plot = plot(&fc, "shape").unwrap();
        assert_eq!(plot.shapes[0].kind, ShapeKind::Mixed);
        assert_eq!(plot.shapes[1].kind, ShapeKind::Empty);
        assert_eq!(plot.shapes[1].bounds, None);
        assert_eq!(plot.extent, Some(Rect::new((0.0, 0.0), (1.0, 1.0))));
    }

    #[test]
    fn test_attribute_column_is_not_geometry() {
        let fc = collection(vec![Some(Geometry::Point(point!(x: 0.0, y: 0.0)))]);
        let err = plot(&fc, "name").unwrap_err();
        assert!(matches!(
            err,
            GpkgError::UnsupportedGeometry { ref column, .. } if column == "name"
        ));
        let err = plot(&fc, "geometry").unwrap_err();
        assert!(matches!(err, GpkgError::MissingColumn { .. }));
    }

    #[test]
    fn test_geographic_aspect() {
        let extent = Rect::new((-106.0, 39.0), (-104.0, 41.0));
        let aspect = aspect_for(Some(&nad83()), Some(extent));
        assert!((aspect - 1.0 / 40f64.to_radians().cos()).abs() < 1e-12);

        let mut projected = nad83();
        projected.definition = r#"PROJCS["NAD83 / Conus Albers"]"#.to_string();
        assert_eq!(aspect_for(Some(&projected), Some(extent)), 1.0);
        assert_eq!(aspect_for(None, Some(extent)), 1.0);
        assert_eq!(aspect_for(Some(&nad83()), None), 1.0);
    }

    #[test]
    fn test_check_display_env() {
        let none = |_: &str| None;
        assert!(matches!(
            check_display_env(none),
            Err(GpkgError::NoDisplay(_))
        ));

        let empty = |_: &str| Some(OsString::new());
        assert!(check_display_env(empty).is_err());

        let wayland = |key: &str| (key == "WAYLAND_DISPLAY").then(|| OsString::from("wayland-0"));
        assert!(check_display_env(wayland).is_ok());
    }
}
