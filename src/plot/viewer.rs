//! Interactive window for a [`Plot`].

use eframe::egui::{
    self, Align2, Color32, FontId, Mesh, Painter, Pos2, Rect, Sense, Shape, Stroke,
};
use geo_types::Coord;
use tracing::{debug, info};

use super::{check_display_env, nice_ticks, Plot, Rgba, ScreenRect, Viewport};
use crate::errors::*;

const TICK_TARGET: usize = 6;

/// Window settings.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewerOptions {
    /// Window title; the plot title when unset.
    pub title: Option<String>,
    pub width: f32,
    pub height: f32,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        ViewerOptions {
            title: None,
            width: 960.0,
            height: 720.0,
        }
    }
}

pub(super) fn show(plot: Plot, options: &ViewerOptions) -> Result<()> {
    if cfg!(all(unix, not(target_os = "macos"))) {
        check_display_env(|key| std::env::var_os(key))?;
    }

    let title = options.title.clone().unwrap_or_else(|| plot.title.clone());
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(title.clone())
            .with_inner_size([options.width, options.height]),
        ..Default::default()
    };

    info!(shapes = plot.shape_count(), title = %title, "opening plot window");
    eframe::run_native(
        &title,
        native_options,
        Box::new(move |_cc| Ok(Box::new(PlotApp::new(plot)))),
    )
    .map_err(|err| GpkgError::Display(err.to_string()))?;
    debug!("plot window closed");
    Ok(())
}

struct PlotApp {
    plot: Plot,
    view: Option<Viewport>,
    cursor: Option<Coord<f64>>,
}

impl PlotApp {
    fn new(plot: Plot) -> PlotApp {
        PlotApp {
            plot,
            view: None,
            cursor: None,
        }
    }
}

impl eframe::App for PlotApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(format!("{} shapes", self.plot.shape_count()));
                if let Some(c) = self.cursor {
                    ui.separator();
                    ui.monospace(format!("x={:.5}  y={:.5}", c.x, c.y));
                }
            });
        });

        egui::CentralPanel::default()
            .frame(egui::Frame::new().fill(Color32::WHITE))
            .show(ctx, |ui| {
                let (response, painter) =
                    ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
                let rect = response.rect;

                let Some(extent) = self.plot.extent else {
                    painter.text(
                        rect.center(),
                        Align2::CENTER_CENTER,
                        "nothing to draw",
                        FontId::proportional(14.0),
                        Color32::GRAY,
                    );
                    return;
                };

                let screen = ScreenRect::new(rect.min.x, rect.min.y, rect.width(), rect.height());
                if response.double_clicked() {
                    self.view = None;
                }
                let aspect = self.plot.aspect;
                let view = self
                    .view
                    .get_or_insert_with(|| Viewport::fit(extent, aspect, screen));
                view.set_screen(screen);

                if response.dragged() {
                    let delta = response.drag_delta();
                    view.pan(delta.x, delta.y);
                }
                if response.hovered() {
                    let scroll = ui.input(|i| i.raw_scroll_delta.y);
                    if scroll != 0.0 {
                        if let Some(pos) = response.hover_pos() {
                            view.zoom((scroll as f64 / 200.0).exp(), (pos.x, pos.y));
                        }
                    }
                }
                self.cursor = response.hover_pos().map(|pos| view.to_data(pos.x, pos.y));

                draw_shapes(&painter, &self.plot, view);
                draw_axes(&painter, rect, view);
            });
    }
}

fn color(c: Rgba) -> Color32 {
    Color32::from_rgba_unmultiplied(c.0, c.1, c.2, c.3)
}

fn pos(view: &Viewport, coord: Coord<f64>) -> Pos2 {
    let (x, y) = view.to_screen(coord);
    Pos2::new(x, y)
}

fn intersects(a: geo_types::Rect<f64>, b: geo_types::Rect<f64>) -> bool {
    a.min().x <= b.max().x && b.min().x <= a.max().x && a.min().y <= b.max().y && b.min().y <= a.max().y
}

fn draw_shapes(painter: &Painter, plot: &Plot, view: &Viewport) {
    let style = &plot.style;
    let fill = color(style.fill);
    let edge = Stroke::new(style.edge_width, color(style.edge));
    let line = Stroke::new(style.line_width, color(style.line));
    let visible = view.visible();

    for shape in &plot.shapes {
        match shape.bounds {
            Some(bounds) if intersects(bounds, visible) => {}
            _ => continue,
        }

        if !shape.fill.is_empty() {
            let mut mesh = Mesh::default();
            for triangle in &shape.fill {
                let base = mesh.vertices.len() as u32;
                for c in [triangle.0, triangle.1, triangle.2] {
                    mesh.colored_vertex(pos(view, c), fill);
                }
                mesh.add_triangle(base, base + 1, base + 2);
            }
            painter.add(Shape::mesh(mesh));
        }

        for path in &shape.paths {
            let points: Vec<Pos2> = path.coords.iter().map(|c| pos(view, *c)).collect();
            if path.closed {
                painter.add(Shape::closed_line(points, edge));
            } else {
                painter.add(Shape::line(points, line));
            }
        }

        for point in &shape.points {
            painter.circle_filled(pos(view, *point), style.point_radius, color(style.point));
        }
    }
}

fn tick_label(value: f64) -> String {
    let text = format!("{value:.6}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

fn draw_axes(painter: &Painter, rect: Rect, view: &Viewport) {
    let ink = Color32::from_gray(60);
    let font = FontId::proportional(11.0);
    let visible = view.visible();
    painter.rect_stroke(rect.shrink(1.0), 0.0, Stroke::new(1.0, ink), egui::StrokeKind::Inside);

    for x in nice_ticks(visible.min().x, visible.max().x, TICK_TARGET) {
        let p = pos(view, Coord { x, y: visible.min().y });
        let bottom = Pos2::new(p.x, rect.max.y);
        painter.line_segment([bottom, bottom - egui::vec2(0.0, 5.0)], Stroke::new(1.0, ink));
        painter.text(
            bottom - egui::vec2(0.0, 7.0),
            Align2::CENTER_BOTTOM,
            tick_label(x),
            font.clone(),
            ink,
        );
    }
    for y in nice_ticks(visible.min().y, visible.max().y, TICK_TARGET) {
        let p = pos(view, Coord { x: visible.min().x, y });
        let left = Pos2::new(rect.min.x, p.y);
        painter.line_segment([left, left + egui::vec2(5.0, 0.0)], Stroke::new(1.0, ink));
        painter.text(
            left + egui::vec2(7.0, 0.0),
            Align2::LEFT_CENTER,
            tick_label(y),
            font.clone(),
            ink,
        );
    }
}
