// ============================================================================
// RETAINED MODE DRAWING
// ============================================================================
//
// Instruments never touch pixels. They drive a `Painter`, which records
// device-space `DrawCommand`s into a `Scene`; the rasterizer (or any other
// 2D backend) replays the scene later.

use crate::Color;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }
}

/// Outline pen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width: f32,
}

impl Stroke {
    pub const fn new(color: Color, width: f32) -> Self {
        Self { color, width }
    }
}

/// Horizontal text alignment inside a layout rectangle. Text is always
/// vertically centred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// A single primitive, already mapped into device space.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Color),
    /// Circular segment: the arc from `start_deg` sweeping `span_deg`
    /// (counter-clockwise, 0 at three o'clock) closed by its chord.
    Chord {
        center: Point,
        radius: f64,
        start_deg: f64,
        span_deg: f64,
        fill: Option<Color>,
        stroke: Option<Stroke>,
    },
    Circle {
        center: Point,
        radius: f64,
        fill: Option<Color>,
        stroke: Option<Stroke>,
    },
    Line {
        from: Point,
        to: Point,
        stroke: Stroke,
    },
    Polygon {
        points: Vec<Point>,
        fill: Option<Color>,
        stroke: Option<Stroke>,
    },
    Text {
        anchor: Point,
        align: Align,
        rotation_deg: f64,
        text: String,
        font_size: f32,
        color: Color,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    commands: Vec<DrawCommand>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_command(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Every text string, in draw order.
    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn lines(&self) -> Vec<(Point, Point, Stroke)> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                DrawCommand::Line { from, to, stroke } => Some((*from, *to, *stroke)),
                _ => None,
            })
            .collect()
    }

    pub fn polygons(&self) -> Vec<&[Point]> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                DrawCommand::Polygon { points, .. } => Some(points.as_slice()),
                _ => None,
            })
            .collect()
    }

    /// `(start_deg, span_deg)` of every chord.
    pub fn chords(&self) -> Vec<(f64, f64)> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                DrawCommand::Chord {
                    start_deg, span_deg, ..
                } => Some((*start_deg, *span_deg)),
                _ => None,
            })
            .collect()
    }
}

/// Translation followed by a rotation. Positive angles turn clockwise on a
/// y-down screen.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Transform {
    origin: Point,
    angle_deg: f64,
}

impl Transform {
    fn rotate_vector(&self, x: f64, y: f64) -> (f64, f64) {
        let (sin, cos) = self.angle_deg.to_radians().sin_cos();
        (x * cos - y * sin, x * sin + y * cos)
    }

    fn map(&self, p: Point) -> Point {
        let (x, y) = self.rotate_vector(p.x, p.y);
        Point::new(self.origin.x + x, self.origin.y + y)
    }
}

#[derive(Debug, Clone, Copy)]
struct PainterState {
    transform: Transform,
    pen: Option<Stroke>,
    brush: Option<Color>,
    font_size: f32,
}

const CORNER_SEGMENTS: usize = 6;

/// Records drawing calls into a [`Scene`]. Keeps a current
/// transform, pen, brush and font size, with `save`/`restore`.
///
/// Chords and circles assume square bounding rectangles.
pub struct Painter<'s> {
    scene: &'s mut Scene,
    state: PainterState,
    stack: Vec<PainterState>,
}

impl<'s> Painter<'s> {
    pub fn new(scene: &'s mut Scene) -> Self {
        Self {
            scene,
            state: PainterState {
                transform: Transform::default(),
                pen: Some(Stroke::new(Color::BLACK, 1.0)),
                brush: None,
                font_size: 8.0,
            },
            stack: Vec::new(),
        }
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        let (x, y) = self.state.transform.rotate_vector(dx, dy);
        self.state.transform.origin.x += x;
        self.state.transform.origin.y += y;
    }

    pub fn rotate(&mut self, degrees: f64) {
        self.state.transform.angle_deg += degrees;
    }

    pub fn rotation(&self) -> f64 {
        self.state.transform.angle_deg
    }

    pub fn save(&mut self) {
        self.stack.push(self.state);
    }

    pub fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    pub fn set_pen(&mut self, pen: Option<Stroke>) {
        self.state.pen = pen;
    }

    pub fn set_brush(&mut self, brush: Option<Color>) {
        self.state.brush = brush;
    }

    pub fn set_font_size(&mut self, size: f32) {
        self.state.font_size = size;
    }

    pub fn map(&self, p: Point) -> Point {
        self.state.transform.map(p)
    }

    pub fn clear(&mut self, color: Color) {
        self.scene.add_command(DrawCommand::Clear(color));
    }

    pub fn draw_line(&mut self, from: Point, to: Point) {
        if let Some(stroke) = self.state.pen {
            self.scene.add_command(DrawCommand::Line {
                from: self.map(from),
                to: self.map(to),
                stroke,
            });
        }
    }

    pub fn draw_polygon(&mut self, points: &[Point]) {
        let points = points.iter().map(|p| self.map(*p)).collect();
        self.scene.add_command(DrawCommand::Polygon {
            points,
            fill: self.state.brush,
            stroke: self.state.pen,
        });
    }

    /// Angles are in 1/16 degree, counter-clockwise from three o'clock.
    pub fn draw_chord(&mut self, rect: Rect, start_angle: i32, span_angle: i32) {
        let start_deg = start_angle as f64 / 16.0 - self.state.transform.angle_deg;
        self.scene.add_command(DrawCommand::Chord {
            center: self.map(rect.center()),
            radius: rect.w / 2.0,
            start_deg,
            span_deg: span_angle as f64 / 16.0,
            fill: self.state.brush,
            stroke: self.state.pen,
        });
    }

    pub fn draw_circle(&mut self, center: Point, radius: f64) {
        self.scene.add_command(DrawCommand::Circle {
            center: self.map(center),
            radius,
            fill: self.state.brush,
            stroke: self.state.pen,
        });
    }

    pub fn draw_rounded_rect(&mut self, rect: Rect, radius: f64) {
        let radius = radius.min(rect.w / 2.0).min(rect.h / 2.0);
        let corners = [
            (rect.x + rect.w - radius, rect.y + radius, -90.0),
            (rect.x + rect.w - radius, rect.y + rect.h - radius, 0.0),
            (rect.x + radius, rect.y + rect.h - radius, 90.0),
            (rect.x + radius, rect.y + radius, 180.0),
        ];
        let mut points = Vec::with_capacity(4 * (CORNER_SEGMENTS + 1));
        for (cx, cy, from_deg) in corners {
            for step in 0..=CORNER_SEGMENTS {
                let angle = (from_deg + 90.0 * step as f64 / CORNER_SEGMENTS as f64).to_radians();
                points.push(Point::new(cx + radius * angle.cos(), cy + radius * angle.sin()));
            }
        }
        self.draw_polygon(&points);
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let points = [
            Point::new(rect.x, rect.y),
            Point::new(rect.x + rect.w, rect.y),
            Point::new(rect.x + rect.w, rect.y + rect.h),
            Point::new(rect.x, rect.y + rect.h),
        ];
        let points = points.iter().map(|p| self.map(*p)).collect();
        self.scene.add_command(DrawCommand::Polygon {
            points,
            fill: Some(color),
            stroke: None,
        });
    }

    /// Lays `text` out inside `rect` using the pen colour. The text inherits
    /// the current rotation.
    pub fn draw_text(&mut self, rect: Rect, align: Align, text: impl Into<String>) {
        let mid_y = rect.y + rect.h / 2.0;
        let local = match align {
            Align::Left => Point::new(rect.x, mid_y),
            Align::Center => Point::new(rect.x + rect.w / 2.0, mid_y),
            Align::Right => Point::new(rect.x + rect.w, mid_y),
        };
        let color = self.state.pen.map_or(Color::BLACK, |pen| pen.color);
        self.scene.add_command(DrawCommand::Text {
            anchor: self.map(local),
            align,
            rotation_deg: self.state.transform.angle_deg,
            text: text.into(),
            font_size: self.state.font_size,
            color,
        });
    }
}
