// ============================================================================
// RASTERIZATION
// ============================================================================
//
// Replays a `Scene` into an RGBA frame buffer (the `pixels` frame). All
// primitives are anti-aliased by pixel-centre distance, the same way the
// gauge needles and dials are drawn.

use std::fs;
use std::path::{Path, PathBuf};

use rusttype::{point, Font, PositionedGlyph, Scale};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::scene::{Align, DrawCommand, Point, Scene};
use crate::Color;

/// Labels are sized in points; the frame is assumed to be 96 dpi.
const POINTS_TO_PIXELS: f32 = 96.0 / 72.0;

/// Tried in order when no font path is configured.
const FALLBACK_FONTS: [&str; 5] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

pub struct Canvas<'a> {
    frame: &'a mut [u8],
    width: usize,
    height: usize,
}

impl<'a> Canvas<'a> {
    pub fn new(frame: &'a mut [u8], width: usize, height: usize) -> Self {
        Self {
            frame,
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn clear(&mut self, color: Color) {
        for chunk in self.frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&[color.r, color.g, color.b, 0xff]);
        }
    }

    /// RGBA at `(x, y)`, if inside the frame.
    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y * self.width + x) * 4;
        let mut out = [0; 4];
        out.copy_from_slice(self.frame.get(idx..idx + 4)?);
        Some(out)
    }

    fn blend(&mut self, x: i64, y: i64, color: Color, alpha: f32) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let idx = (y as usize * self.width + x as usize) * 4;
        let Some(dst) = self.frame.get_mut(idx..idx + 4) else {
            return;
        };
        let a = (alpha * color.a as f32 / 255.0).clamp(0.0, 1.0);
        let src = [color.r, color.g, color.b];
        for (d, s) in dst.iter_mut().zip(src) {
            *d = (s as f32 * a + *d as f32 * (1.0 - a)).round() as u8;
        }
        dst[3] = 0xff;
    }

    /// Integer pixel window covering `[min, max]`, clipped to the frame.
    fn span(&self, min: Point, max: Point) -> Option<(i64, i64, i64, i64)> {
        let x0 = (min.x.floor() as i64).max(0);
        let y0 = (min.y.floor() as i64).max(0);
        let x1 = (max.x.ceil() as i64).min(self.width as i64 - 1);
        let y1 = (max.y.ceil() as i64).min(self.height as i64 - 1);
        (x0 <= x1 && y0 <= y1).then_some((x0, y0, x1, y1))
    }
}

/// Loads the label font: the configured file, or the first system fallback
/// that parses. A configured file that cannot be used is an error; having no
/// font at all is not, labels are just skipped.
pub fn load_font(path: Option<&Path>) -> Result<Option<Font<'static>>> {
    if let Some(path) = path {
        let bytes = fs::read(path)?;
        let font = Font::try_from_vec(bytes).ok_or_else(|| Error::Font(path.to_path_buf()))?;
        info!(path = %path.display(), "loaded font");
        return Ok(Some(font));
    }

    for candidate in FALLBACK_FONTS.iter().map(PathBuf::from) {
        if let Some(font) = fs::read(&candidate).ok().and_then(Font::try_from_vec) {
            info!(path = %candidate.display(), "loaded fallback font");
            return Ok(Some(font));
        }
    }

    warn!("no usable font found, labels will not be drawn");
    Ok(None)
}

#[derive(Default)]
pub struct Rasterizer {
    font: Option<Font<'static>>,
}

impl Rasterizer {
    pub fn new(font: Option<Font<'static>>) -> Self {
        Self { font }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Paints `scene` with its origin placed at `origin` on the canvas.
    pub fn render(&self, canvas: &mut Canvas, scene: &Scene, origin: Point) {
        let at = |p: &Point| Point::new(p.x + origin.x, p.y + origin.y);

        for command in scene.commands() {
            match command {
                DrawCommand::Clear(color) => canvas.clear(*color),
                DrawCommand::Chord {
                    center,
                    radius,
                    start_deg,
                    span_deg,
                    fill,
                    stroke,
                } => {
                    let center = at(center);
                    if let Some(color) = fill {
                        fill_chord(canvas, center, *radius, *start_deg, *span_deg, *color);
                    }
                    if let Some(stroke) = stroke {
                        stroke_arc(canvas, center, *radius, *start_deg, *span_deg, stroke.width, stroke.color);
                        let (from, to) = chord_ends(center, *radius, *start_deg, *span_deg);
                        draw_thick_line_aa(canvas, from, to, stroke.width, stroke.color);
                    }
                }
                DrawCommand::Circle {
                    center,
                    radius,
                    fill,
                    stroke,
                } => {
                    let center = at(center);
                    if let Some(color) = fill {
                        fill_circle(canvas, center, *radius, *color);
                    }
                    if let Some(stroke) = stroke {
                        stroke_arc(canvas, center, *radius, 0.0, 360.0, stroke.width, stroke.color);
                    }
                }
                DrawCommand::Line { from, to, stroke } => {
                    draw_thick_line_aa(canvas, at(from), at(to), stroke.width, stroke.color);
                }
                DrawCommand::Polygon {
                    points,
                    fill,
                    stroke,
                } => {
                    let points: Vec<Point> = points.iter().map(at).collect();
                    if let Some(color) = fill {
                        fill_polygon(canvas, &points, *color);
                    }
                    if let Some(stroke) = stroke {
                        for (i, from) in points.iter().enumerate() {
                            let to = points[(i + 1) % points.len()];
                            draw_thick_line_aa(canvas, *from, to, stroke.width, stroke.color);
                        }
                    }
                }
                DrawCommand::Text {
                    anchor,
                    align,
                    rotation_deg,
                    text,
                    font_size,
                    color,
                } => {
                    if let Some(font) = &self.font {
                        draw_text(canvas, font, at(anchor), *align, *rotation_deg, text, *font_size, *color);
                    }
                }
            }
        }
    }
}

// ============================================================================
// DRAWING PRIMITIVES
// ============================================================================

fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance(Point::new(a.x + t * dx, a.y + t * dy))
}

fn draw_thick_line_aa(canvas: &mut Canvas, from: Point, to: Point, thickness: f32, color: Color) {
    let half = thickness as f64 / 2.0;
    let pad = half + 1.0;
    let min = Point::new(from.x.min(to.x) - pad, from.y.min(to.y) - pad);
    let max = Point::new(from.x.max(to.x) + pad, from.y.max(to.y) + pad);
    let Some((x0, y0, x1, y1)) = canvas.span(min, max) else {
        return;
    };

    for y in y0..=y1 {
        for x in x0..=x1 {
            let p = Point::new(x as f64 + 0.5, y as f64 + 0.5);
            let dist = distance_to_segment(p, from, to);
            let aa = (half - dist + 0.5).clamp(0.0, 1.0);
            if aa > 0.01 {
                canvas.blend(x, y, color, aa as f32);
            }
        }
    }
}

fn fill_circle(canvas: &mut Canvas, center: Point, radius: f64, color: Color) {
    let pad = radius + 1.0;
    let min = Point::new(center.x - pad, center.y - pad);
    let max = Point::new(center.x + pad, center.y + pad);
    let Some((x0, y0, x1, y1)) = canvas.span(min, max) else {
        return;
    };

    for y in y0..=y1 {
        for x in x0..=x1 {
            let dist = Point::new(x as f64 + 0.5, y as f64 + 0.5).distance(center);
            let aa = (radius - dist + 0.5).clamp(0.0, 1.0);
            if aa > 0.01 {
                canvas.blend(x, y, color, aa as f32);
            }
        }
    }
}

/// Whether `angle` lies on the sweep from `start` through `span` degrees.
fn in_sweep(angle: f64, start: f64, span: f64) -> bool {
    if span.abs() >= 360.0 {
        return true;
    }
    if span >= 0.0 {
        (angle - start).rem_euclid(360.0) <= span
    } else {
        (start - angle).rem_euclid(360.0) <= -span
    }
}

/// Screen angle of `p` around `center`, counter-clockwise from three o'clock.
fn screen_angle(center: Point, p: Point) -> f64 {
    (center.y - p.y).atan2(p.x - center.x).to_degrees()
}

fn on_circle(center: Point, radius: f64, degrees: f64) -> Point {
    let (sin, cos) = degrees.to_radians().sin_cos();
    Point::new(center.x + radius * cos, center.y - radius * sin)
}

fn chord_ends(center: Point, radius: f64, start: f64, span: f64) -> (Point, Point) {
    (on_circle(center, radius, start), on_circle(center, radius, start + span))
}

fn stroke_arc(
    canvas: &mut Canvas,
    center: Point,
    radius: f64,
    start: f64,
    span: f64,
    thickness: f32,
    color: Color,
) {
    let half = thickness as f64 / 2.0;
    let pad = radius + half + 1.0;
    let min = Point::new(center.x - pad, center.y - pad);
    let max = Point::new(center.x + pad, center.y + pad);
    let Some((x0, y0, x1, y1)) = canvas.span(min, max) else {
        return;
    };

    for y in y0..=y1 {
        for x in x0..=x1 {
            let p = Point::new(x as f64 + 0.5, y as f64 + 0.5);
            let aa = (half - (p.distance(center) - radius).abs() + 0.5).clamp(0.0, 1.0);
            if aa > 0.01 && in_sweep(screen_angle(center, p), start, span) {
                canvas.blend(x, y, color, aa as f32);
            }
        }
    }
}

/// Circular segment: the disc cut by the chord, keeping the side the arc is on.
fn fill_chord(canvas: &mut Canvas, center: Point, radius: f64, start: f64, span: f64, color: Color) {
    if span.abs() >= 360.0 {
        fill_circle(canvas, center, radius, color);
        return;
    }

    let (p0, p1) = chord_ends(center, radius, start, span);
    let (dx, dy) = (p1.x - p0.x, p1.y - p0.y);
    let len = (dx * dx + dy * dy).sqrt();
    if len < 1e-9 {
        if span.abs() > 180.0 {
            fill_circle(canvas, center, radius, color);
        }
        return;
    }
    let normal = (-dy / len, dx / len);
    let mid = on_circle(center, radius, start + span / 2.0);
    let side = ((mid.x - p0.x) * normal.0 + (mid.y - p0.y) * normal.1).signum();

    let pad = radius + 1.0;
    let min = Point::new(center.x - pad, center.y - pad);
    let max = Point::new(center.x + pad, center.y + pad);
    let Some((x0, y0, x1, y1)) = canvas.span(min, max) else {
        return;
    };

    for y in y0..=y1 {
        for x in x0..=x1 {
            let p = Point::new(x as f64 + 0.5, y as f64 + 0.5);
            let disc = (radius - p.distance(center) + 0.5).clamp(0.0, 1.0);
            let offset = side * ((p.x - p0.x) * normal.0 + (p.y - p0.y) * normal.1);
            let half_plane = (offset + 0.5).clamp(0.0, 1.0);
            let aa = disc.min(half_plane);
            if aa > 0.01 {
                canvas.blend(x, y, color, aa as f32);
            }
        }
    }
}

fn point_in_polygon(p: Point, points: &[Point]) -> bool {
    let mut inside = false;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        let (a, b) = (points[i], points[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn fill_polygon(canvas: &mut Canvas, points: &[Point], color: Color) {
    if points.len() < 3 {
        return;
    }
    let min = points.iter().fold(Point::new(f64::MAX, f64::MAX), |m, p| {
        Point::new(m.x.min(p.x), m.y.min(p.y))
    });
    let max = points.iter().fold(Point::new(f64::MIN, f64::MIN), |m, p| {
        Point::new(m.x.max(p.x), m.y.max(p.y))
    });
    let Some((x0, y0, x1, y1)) = canvas.span(min, max) else {
        return;
    };

    for y in y0..=y1 {
        for x in x0..=x1 {
            let p = Point::new(x as f64 + 0.5, y as f64 + 0.5);
            let edge = (0..points.len())
                .map(|i| distance_to_segment(p, points[i], points[(i + 1) % points.len()]))
                .fold(f64::MAX, f64::min);
            let aa = if point_in_polygon(p, points) {
                (0.5 + edge).min(1.0)
            } else {
                (0.5 - edge).max(0.0)
            };
            if aa > 0.01 {
                canvas.blend(x, y, color, aa as f32);
            }
        }
    }
}

fn draw_antialiased_pixel(canvas: &mut Canvas, x: f64, y: f64, color: Color, alpha: f32) {
    let x_floor = x.floor();
    let y_floor = y.floor();
    let x_frac = x - x_floor;
    let y_frac = y - y_floor;
    let (xi, yi) = (x_floor as i64, y_floor as i64);

    // Bilinear split over the four nearest pixels
    let samples = [
        (xi, yi, (1.0 - x_frac) * (1.0 - y_frac)),
        (xi + 1, yi, x_frac * (1.0 - y_frac)),
        (xi, yi + 1, (1.0 - x_frac) * y_frac),
        (xi + 1, yi + 1, x_frac * y_frac),
    ];
    for (px, py, weight) in samples {
        let final_alpha = alpha * weight as f32;
        if final_alpha > 0.001 {
            canvas.blend(px, py, color, final_alpha);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_text(
    canvas: &mut Canvas,
    font: &Font<'static>,
    anchor: Point,
    align: Align,
    rotation_deg: f64,
    text: &str,
    font_size: f32,
    color: Color,
) {
    let scale = Scale::uniform(font_size * POINTS_TO_PIXELS);
    let v_metrics = font.v_metrics(scale);
    let glyphs: Vec<PositionedGlyph> = font
        .layout(text, scale, point(0.0, v_metrics.ascent))
        .collect();

    let Some(last) = glyphs.last() else {
        return;
    };
    let width = (last.position().x + last.unpositioned().h_metrics().advance_width) as f64;
    let height = (v_metrics.ascent - v_metrics.descent) as f64;

    let left = match align {
        Align::Left => 0.0,
        Align::Center => -width / 2.0,
        Align::Right => -width,
    };
    let top = -height / 2.0;
    let (sin, cos) = rotation_deg.to_radians().sin_cos();

    for glyph in &glyphs {
        let Some(bb) = glyph.pixel_bounding_box() else {
            continue;
        };
        glyph.draw(|gx, gy, v| {
            if v > 0.001 {
                let lx = left + (bb.min.x + gx as i32) as f64;
                let ly = top + (bb.min.y + gy as i32) as f64;
                let x = anchor.x + lx * cos - ly * sin;
                let y = anchor.y + lx * sin + ly * cos;
                draw_antialiased_pixel(canvas, x, y, color, v);
            }
        });
    }
}
