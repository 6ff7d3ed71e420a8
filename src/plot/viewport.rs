//! Mapping between data coordinates and screen pixels.

use geo_types::{Coord, Rect};

/// Fraction of the extent added on every side when fitting the view.
const MARGIN: f64 = 0.05;

/// A screen-space rectangle, y growing downwards.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenRect {
    pub min_x: f32,
    pub min_y: f32,
    pub width: f32,
    pub height: f32,
}

impl ScreenRect {
    pub fn new(min_x: f32, min_y: f32, width: f32, height: f32) -> ScreenRect {
        ScreenRect {
            min_x,
            min_y,
            width,
            height,
        }
    }

    fn center(&self) -> (f64, f64) {
        (
            self.min_x as f64 + self.width as f64 / 2.0,
            self.min_y as f64 + self.height as f64 / 2.0,
        )
    }
}

/// Current view of the plot: the data point at the screen center and the
/// number of pixels per x unit. One y unit spans `aspect` times as many
/// pixels as one x unit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    center: Coord<f64>,
    scale: f64,
    aspect: f64,
    screen: ScreenRect,
}

impl Viewport {
    /// A view showing all of `extent` plus a small margin, centered in `screen`.
    pub fn fit(extent: Rect<f64>, aspect: f64, screen: ScreenRect) -> Viewport {
        let (width, height) = padded_size(extent);
        let sx = screen.width.max(1.0) as f64 / width;
        let sy = screen.height.max(1.0) as f64 / (height * aspect);
        Viewport {
            center: extent.center(),
            scale: sx.min(sy),
            aspect,
            screen,
        }
    }

    pub fn center(&self) -> Coord<f64> {
        self.center
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn screen(&self) -> ScreenRect {
        self.screen
    }

    /// Moves the view to a resized screen area, keeping center and scale.
    pub fn set_screen(&mut self, screen: ScreenRect) {
        self.screen = screen;
    }

    pub fn to_screen(&self, coord: Coord<f64>) -> (f32, f32) {
        let (cx, cy) = self.screen.center();
        let x = cx + (coord.x - self.center.x) * self.scale;
        let y = cy - (coord.y - self.center.y) * self.scale * self.aspect;
        (x as f32, y as f32)
    }

    pub fn to_data(&self, x: f32, y: f32) -> Coord<f64> {
        let (cx, cy) = self.screen.center();
        Coord {
            x: self.center.x + (x as f64 - cx) / self.scale,
            y: self.center.y - (y as f64 - cy) / (self.scale * self.aspect),
        }
    }

    /// Data rectangle currently covered by the screen.
    pub fn visible(&self) -> Rect<f64> {
        let s = self.screen;
        Rect::new(
            self.to_data(s.min_x, s.min_y + s.height),
            self.to_data(s.min_x + s.width, s.min_y),
        )
    }

    /// Shifts the view by a drag of `dx`, `dy` pixels.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.center.x -= dx as f64 / self.scale;
        self.center.y += dy as f64 / (self.scale * self.aspect);
    }

    /// Multiplies the scale by `factor`, keeping the data point under
    /// `anchor` in place.
    pub fn zoom(&mut self, factor: f64, anchor: (f32, f32)) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let before = self.to_data(anchor.0, anchor.1);
        self.scale *= factor;
        let after = self.to_data(anchor.0, anchor.1);
        self.center.x += before.x - after.x;
        self.center.y += before.y - after.y;
    }
}

/// Width and height of `extent` with margins; zero spans are widened so a
/// single point or a straight line still gets a usable view.
fn padded_size(extent: Rect<f64>) -> (f64, f64) {
    let (w, h) = (extent.width(), extent.height());
    let fallback = w.max(h).max(1.0);
    let w = if w > 0.0 { w } else { fallback };
    let h = if h > 0.0 { h } else { fallback };
    (w * (1.0 + 2.0 * MARGIN), h * (1.0 + 2.0 * MARGIN))
}

/// Round tick positions between `min` and `max`, roughly `target` of them.
///
/// Steps are 1, 2 or 5 times a power of ten.
pub fn nice_ticks(min: f64, max: f64, target: usize) -> Vec<f64> {
    if !(min.is_finite() && max.is_finite()) || max <= min || target == 0 {
        return Vec::new();
    }
    let raw = (max - min) / target as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let step = [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|step| *step >= raw)
        .unwrap_or(10.0 * magnitude);

    let first = (min / step).ceil() as i64;
    let last = (max / step).floor() as i64;
    (first..=last).map(|i| i as f64 * step).collect()
}
