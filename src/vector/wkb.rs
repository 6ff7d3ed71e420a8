//! GeoPackage binary geometry decoding
//!
//! A GeoPackage geometry blob is a small header (magic `GP`, version, flags,
//! `srs_id`, optional envelope) followed by a standard ISO WKB geometry
//! (`1003`, `3006`, ...). The header is parsed here; the payload is checked for
//! supported types and nesting depth, then decoded with [`wkb::reader`] and
//! converted through [`geo_traits`]. Z and M ordinates are dropped since the
//! geometries are planar `geo_types`.

use bitflags::bitflags;
use geo_traits::{
    CoordTrait, GeometryCollectionTrait, GeometryTrait, GeometryType, LineStringTrait,
    MultiLineStringTrait, MultiPointTrait, MultiPolygonTrait, PointTrait, PolygonTrait,
};
use geo_types::{
    coord, Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint,
    MultiPolygon, Point, Polygon, Rect,
};

use crate::errors::*;

const MAGIC: &[u8; 2] = b"GP";

bitflags! {
    /// Flags byte of the GeoPackage binary header.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct HeaderFlags: u8 {
        /// Header integers and doubles are little endian.
        const LITTLE_ENDIAN = 0b0000_0001;
        /// Three bit envelope contents indicator.
        const ENVELOPE = 0b0000_1110;
        /// The geometry is empty.
        const EMPTY = 0b0001_0000;
        /// Extended GeoPackage geometry, not a standard WKB payload.
        const EXTENDED = 0b0010_0000;
    }
}

impl HeaderFlags {
    /// Envelope contents indicator, 0 (none) to 4 (xyzm).
    pub fn envelope_indicator(&self) -> u8 {
        (self.bits() & HeaderFlags::ENVELOPE.bits()) >> 1
    }
}

/// Parsed GeoPackage binary header.
#[derive(Clone, Debug, PartialEq)]
pub struct GpkgHeader {
    pub version: u8,
    pub flags: HeaderFlags,
    pub srs_id: i32,
    /// The x/y part of the stored envelope, if any.
    pub envelope: Option<Rect<f64>>,
    /// Offset of the WKB payload in the blob.
    pub wkb_offset: usize,
}

impl GpkgHeader {
    pub fn is_empty(&self) -> bool {
        self.flags.contains(HeaderFlags::EMPTY)
    }
}

/// Deepest nesting of multi geometries and collections accepted.
pub const MAX_NESTING: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ByteOrder {
    Big,
    Little,
}

impl ByteOrder {
    fn from_flag(little_endian: bool) -> ByteOrder {
        if little_endian {
            ByteOrder::Little
        } else {
            ByteOrder::Big
        }
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    fn end_of_data(&self, need: usize) -> GpkgError {
        GpkgError::InvalidGeometry(format!(
            "unexpected end of data at byte {} (need {} more)",
            self.pos, need
        ))
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        let bytes = self
            .buf
            .get(self.pos..self.pos + N)
            .ok_or_else(|| self.end_of_data(N))?;
        out.copy_from_slice(bytes);
        self.pos += N;
        Ok(out)
    }

    fn skip(&mut self, count: u32, item_len: usize) -> Result<()> {
        let len = (count as usize)
            .checked_mul(item_len)
            .filter(|len| *len <= self.buf.len() - self.pos)
            .ok_or_else(|| self.end_of_data((count as usize).saturating_mul(item_len)))?;
        self.pos += len;
        Ok(())
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take::<1>()?[0])
    }

    fn read_u32(&mut self, order: ByteOrder) -> Result<u32> {
        let bytes = self.take::<4>()?;
        Ok(match order {
            ByteOrder::Big => u32::from_be_bytes(bytes),
            ByteOrder::Little => u32::from_le_bytes(bytes),
        })
    }

    fn read_i32(&mut self, order: ByteOrder) -> Result<i32> {
        let bytes = self.take::<4>()?;
        Ok(match order {
            ByteOrder::Big => i32::from_be_bytes(bytes),
            ByteOrder::Little => i32::from_le_bytes(bytes),
        })
    }

    fn read_f64(&mut self, order: ByteOrder) -> Result<f64> {
        let bytes = self.take::<8>()?;
        Ok(match order {
            ByteOrder::Big => f64::from_be_bytes(bytes),
            ByteOrder::Little => f64::from_le_bytes(bytes),
        })
    }

    fn read_byte_order(&mut self) -> Result<ByteOrder> {
        match self.read_u8()? {
            0 => Ok(ByteOrder::Big),
            1 => Ok(ByteOrder::Little),
            other => Err(GpkgError::InvalidGeometry(format!(
                "invalid WKB byte order marker {other}"
            ))),
        }
    }

    /// Returns the base type (1 to 17) and the number of ordinates.
    fn read_type(&mut self, order: ByteOrder) -> Result<(u32, usize)> {
        let code = self.read_u32(order)?;
        let ordinates = match code / 1000 {
            0 => 2,
            1 | 2 => 3,
            3 => 4,
            _ => {
                return Err(GpkgError::InvalidGeometry(format!(
                    "invalid WKB geometry type code {code}"
                )))
            }
        };
        Ok((code % 1000, ordinates))
    }
}

fn wkb_type_name(base: u32) -> &'static str {
    match base {
        0 => "Geometry",
        1 => "Point",
        2 => "LineString",
        3 => "Polygon",
        4 => "MultiPoint",
        5 => "MultiLineString",
        6 => "MultiPolygon",
        7 => "GeometryCollection",
        8 => "CircularString",
        9 => "CompoundCurve",
        10 => "CurvePolygon",
        11 => "MultiCurve",
        12 => "MultiSurface",
        13 => "Curve",
        14 => "Surface",
        15 => "PolyhedralSurface",
        16 => "TIN",
        17 => "Triangle",
        _ => "unknown",
    }
}

/// Walks the WKB structure without recursing and without decoding
/// coordinates. Rejects curve and surface types, multi geometries holding the
/// wrong part type, truncated data, and containers nested deeper than
/// [`MAX_NESTING`].
fn check_structure(wkb: &[u8]) -> Result<()> {
    let mut reader = Reader::new(wkb);
    // (container type, parts left to read)
    let mut open: Vec<(u32, u32)> = Vec::new();
    loop {
        let container = open.last_mut().map(|(base, left)| {
            *left -= 1;
            *base
        });
        let order = reader.read_byte_order()?;
        let (base, ordinates) = reader.read_type(order)?;
        if let Some(container @ 4..=6) = container {
            if base != container - 3 {
                return Err(GpkgError::InvalidGeometry(format!(
                    "{} contains a {}",
                    wkb_type_name(container),
                    wkb_type_name(base)
                )));
            }
        }

        let coord_len = 8 * ordinates;
        match base {
            1 => reader.skip(1, coord_len)?,
            2 => {
                let count = reader.read_u32(order)?;
                reader.skip(count, coord_len)?;
            }
            3 => {
                for _ in 0..reader.read_u32(order)? {
                    let count = reader.read_u32(order)?;
                    reader.skip(count, coord_len)?;
                }
            }
            4..=7 => {
                let parts = reader.read_u32(order)?;
                open.push((base, parts));
                if open.len() > MAX_NESTING {
                    return Err(GpkgError::InvalidGeometry(format!(
                        "nesting too deep (more than {MAX_NESTING} levels)"
                    )));
                }
            }
            other => {
                return Err(GpkgError::InvalidGeometry(format!(
                    "unsupported WKB geometry type {other} ({})",
                    wkb_type_name(other)
                )))
            }
        }

        while open.last().is_some_and(|(_, left)| *left == 0) {
            open.pop();
        }
        if open.is_empty() {
            return Ok(());
        }
    }
}

fn to_coord(c: impl CoordTrait<T = f64>) -> Coord<f64> {
    coord! { x: c.x(), y: c.y() }
}

// An empty WKB point is stored as NaN, NaN.
fn point_coord(point: &impl PointTrait<T = f64>) -> Option<Coord<f64>> {
    point
        .coord()
        .map(to_coord)
        .filter(|c| !(c.x.is_nan() && c.y.is_nan()))
}

fn to_line_string(line: &impl LineStringTrait<T = f64>) -> LineString<f64> {
    line.coords().map(to_coord).collect()
}

fn to_polygon(polygon: &impl PolygonTrait<T = f64>) -> Polygon<f64> {
    let exterior = polygon
        .exterior()
        .map(|ring| to_line_string(&ring))
        .unwrap_or_else(|| LineString(Vec::new()));
    let interiors = polygon
        .interiors()
        .map(|ring| to_line_string(&ring))
        .collect();
    Polygon::new(exterior, interiors)
}

fn to_geometry(geometry: &impl GeometryTrait<T = f64>) -> Result<Geometry<f64>> {
    Ok(match geometry.as_type() {
        GeometryType::Point(point) => match point_coord(point) {
            Some(c) => Geometry::Point(Point(c)),
            None => Geometry::MultiPoint(MultiPoint(Vec::new())),
        },
        GeometryType::LineString(line) => Geometry::LineString(to_line_string(line)),
        GeometryType::Polygon(polygon) => Geometry::Polygon(to_polygon(polygon)),
        GeometryType::MultiPoint(points) => Geometry::MultiPoint(MultiPoint(
            points
                .points()
                .filter_map(|point| point_coord(&point))
                .map(Point)
                .collect(),
        )),
        GeometryType::MultiLineString(lines) => Geometry::MultiLineString(MultiLineString(
            lines
                .line_strings()
                .map(|line| to_line_string(&line))
                .collect(),
        )),
        GeometryType::MultiPolygon(polygons) => Geometry::MultiPolygon(MultiPolygon(
            polygons
                .polygons()
                .map(|polygon| to_polygon(&polygon))
                .collect(),
        )),
        GeometryType::GeometryCollection(collection) => {
            Geometry::GeometryCollection(GeometryCollection(
                collection
                    .geometries()
                    .map(|part| to_geometry(&part))
                    .collect::<Result<_>>()?,
            ))
        }
        _ => {
            return Err(GpkgError::InvalidGeometry(
                "unsupported WKB geometry kind".to_string(),
            ))
        }
    })
}

/// Reads the GeoPackage binary header at the start of `blob`.
pub fn read_header(blob: &[u8]) -> Result<GpkgHeader> {
    let mut reader = Reader::new(blob);
    let magic = reader.take::<2>()?;
    if &magic != MAGIC {
        return Err(GpkgError::InvalidGeometry(format!(
            "bad magic {magic:02x?}, expected 'GP'"
        )));
    }
    let version = reader.read_u8()?;
    let flags = HeaderFlags::from_bits_retain(reader.read_u8()?);
    let order = ByteOrder::from_flag(flags.contains(HeaderFlags::LITTLE_ENDIAN));
    let srs_id = reader.read_i32(order)?;

    let envelope_len = match flags.envelope_indicator() {
        0 => 0,
        1 => 4,
        2 | 3 => 6,
        4 => 8,
        other => {
            return Err(GpkgError::InvalidGeometry(format!(
                "invalid envelope indicator {other}"
            )))
        }
    };
    let mut values = [0f64; 8];
    for value in values.iter_mut().take(envelope_len) {
        *value = reader.read_f64(order)?;
    }
    // The envelope is stored as minx, maxx, miny, maxy[, ...].
    let envelope = (envelope_len > 0).then(|| {
        Rect::new(
            coord! { x: values[0], y: values[2] },
            coord! { x: values[1], y: values[3] },
        )
    });

    Ok(GpkgHeader {
        version,
        flags,
        srs_id,
        envelope,
        wkb_offset: reader.pos,
    })
}

/// Decodes a standard WKB geometry.
pub fn read_wkb(wkb: &[u8]) -> Result<Geometry<f64>> {
    check_structure(wkb)?;
    let geometry = wkb::reader::read_wkb(wkb)
        .map_err(|err| GpkgError::InvalidGeometry(err.to_string()))?;
    to_geometry(&geometry)
}

/// Decodes a GeoPackage binary geometry blob.
pub fn read_gpkg_geometry(blob: &[u8]) -> Result<Geometry<f64>> {
    let header = read_header(blob)?;
    if header.flags.contains(HeaderFlags::EXTENDED) {
        return Err(GpkgError::InvalidGeometry(
            "extended GeoPackage geometries are not supported".to_string(),
        ));
    }
    read_wkb(&blob[header.wkb_offset..])
}
