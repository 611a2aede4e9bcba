use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::config::InstrumentGeometry;
use crate::scene::{Align, Painter, Point, Rect, Stroke};
use crate::signal::RedrawSignal;
use crate::viewport::Viewport;
use crate::{approx_eq, Color, Instrument, CHANGE_TOLERANCE};

const BACKGROUND: Color = Color::new(48, 172, 220);
const YAW_MARKER: Color = Color::RED.with_alpha(0xe0);

const HEADING_TICKS: usize = 36;
const LABEL_FONT_SIZE: f32 = 8.0;
const CARDINAL_FONT_SIZE: f32 = 10.0;
const READOUT_FONT_SIZE: f32 = 13.0;
const READOUT_WIDTH: i32 = 130;

/// What the heading ring shows at a given tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingMark {
    Cardinal(char, Color),
    Numeric(i32),
    Minor,
}

/// Compass rose with heading marker and an altitude/height readout.
///
/// NaN and infinite inputs are ignored by every setter.
#[derive(Debug)]
pub struct CompassAltimeter {
    viewport: Viewport,
    yaw: f64,
    altitude: f64,
    height: f64,
    redraw: RedrawSignal,
}

impl CompassAltimeter {
    pub fn new(geometry: Arc<InstrumentGeometry>) -> Self {
        Self {
            viewport: Viewport::new(geometry),
            yaw: 0.0,
            altitude: 0.0,
            height: 0.0,
            redraw: RedrawSignal::new(),
        }
    }

    pub fn yaw(&self) -> f64 {
        self.yaw
    }

    pub fn altitude(&self) -> f64 {
        self.altitude
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Sets the heading, wrapping by a single turn into `[0, 360)`.
    ///
    /// # Preconditions
    ///
    /// `value` must lie within one turn of the valid range, i.e. in
    /// `[-360, 720)`. Values further out are stored as wrapped once and still
    /// lie outside `[0, 360)`; that case is logged, not corrected.
    pub fn set_yaw(&mut self, value: f64) {
        if self.update_yaw(value) {
            self.redraw.emit();
        }
    }

    /// Altitude in metres; no range limit.
    pub fn set_altitude(&mut self, value: f64) {
        if self.update_altitude(value) {
            self.redraw.emit();
        }
    }

    /// Height above ground in metres; no range limit.
    pub fn set_height(&mut self, value: f64) {
        if self.update_height(value) {
            self.redraw.emit();
        }
    }

    /// Sets all three fields, redrawing at most once.
    pub fn set_data(&mut self, altitude: f64, height: f64, yaw: f64) {
        let altitude_changed = self.update_altitude(altitude);
        let height_changed = self.update_height(height);
        let yaw_changed = self.update_yaw(yaw);
        if altitude_changed || height_changed || yaw_changed {
            self.redraw.emit();
        }
    }

    fn update_yaw(&mut self, value: f64) -> bool {
        if !value.is_finite() {
            warn!(value, "ignoring non-finite yaw");
            return false;
        }
        let yaw = wrap_yaw(value);
        if !(0.0..360.0).contains(&yaw) {
            warn!(value, yaw, "yaw more than one turn out of range");
        }
        if approx_eq(yaw, self.yaw, CHANGE_TOLERANCE) {
            trace!(yaw, current = self.yaw, "yaw within tolerance");
            return false;
        }
        debug!(from = self.yaw, to = yaw, "yaw changed");
        self.yaw = yaw;
        true
    }

    fn update_altitude(&mut self, value: f64) -> bool {
        if !value.is_finite() {
            warn!(value, "ignoring non-finite altitude");
            return false;
        }
        if approx_eq(value, self.altitude, CHANGE_TOLERANCE) {
            trace!(altitude = value, "altitude within tolerance");
            return false;
        }
        debug!(from = self.altitude, to = value, "altitude changed");
        self.altitude = value;
        true
    }

    fn update_height(&mut self, value: f64) -> bool {
        if !value.is_finite() {
            warn!(value, "ignoring non-finite height");
            return false;
        }
        if approx_eq(value, self.height, CHANGE_TOLERANCE) {
            trace!(height = value, "height within tolerance");
            return false;
        }
        debug!(from = self.height, to = value, "height changed");
        self.height = value;
        true
    }

    fn rim(&self, size: i32) -> f64 {
        -(size as f64) / 2.0 + self.viewport.edge_offset() as f64
    }

    fn paint_background(&self, painter: &mut Painter<'_>, size: i32) {
        let half = (size / 2) as f64;
        let disc = Rect::new(-half, -half, size as f64, size as f64);

        painter.set_pen(Some(Stroke::new(Color::BLACK, 2.0)));
        painter.set_brush(Some(BACKGROUND));
        painter.draw_circle(disc.center(), size as f64 / 2.0);
    }

    fn paint_heading_ring(&self, painter: &mut Painter<'_>, size: i32) {
        let step = 360.0 / HEADING_TICKS as f64;
        let tick = (size / 25) as f64;
        let top = self.rim(size);
        let font = LABEL_FONT_SIZE as f64;

        for i in 0..HEADING_TICKS {
            let (label, pen, font_size) = match heading_mark(i) {
                HeadingMark::Cardinal(letter, color) => {
                    let width = if color == Color::BLACK { 1.0 } else { 2.0 };
                    (Some(letter.to_string()), Stroke::new(color, width), CARDINAL_FONT_SIZE)
                }
                HeadingMark::Numeric(degrees) => (
                    Some(degrees.to_string()),
                    Stroke::new(Color::BLACK, 1.0),
                    LABEL_FONT_SIZE,
                ),
                HeadingMark::Minor => (None, Stroke::new(Color::BLACK, 1.0), LABEL_FONT_SIZE),
            };
            painter.set_pen(Some(pen));
            painter.set_font_size(font_size);

            match label {
                Some(label) => {
                    painter.draw_line(Point::new(0.0, top), Point::new(0.0, top + tick));
                    painter.draw_text(
                        Rect::new(-50.0, top + tick + 4.0, 100.0, font + 2.0),
                        Align::Center,
                        label,
                    );
                }
                None => {
                    painter.draw_line(Point::new(0.0, top), Point::new(0.0, top + tick / 2.0));
                }
            }

            painter.rotate(-step);
        }
    }

    /// Fixed north (up) and south (down) arrows.
    fn paint_north_south_arrows(&self, painter: &mut Painter<'_>, size: i32) {
        let s = size as f64;
        let half_width = (size / 5) as f64 / 2.0;
        let tip = s / 2.0 - self.viewport.edge_offset() as f64 - s / 25.0 - 15.0;

        painter.set_pen(None);
        for (direction, color) in [(-1.0, Color::BLUE), (1.0, Color::RED)] {
            painter.set_brush(Some(color));
            painter.draw_polygon(&[
                Point::new(0.0, direction * tip),
                Point::new(-half_width, 0.0),
                Point::new(half_width, 0.0),
            ]);
        }
    }

    /// The rotation is undone afterwards so later elements stay upright.
    fn paint_yaw_marker(&self, painter: &mut Painter<'_>, size: i32) {
        let marker = (size / 12) as f64;
        let top = self.rim(size);

        painter.rotate(-self.yaw);
        painter.set_brush(Some(YAW_MARKER));
        painter.draw_polygon(&[
            Point::new(0.0, top),
            Point::new(-marker / 2.0, top + marker),
            Point::new(marker / 2.0, top + marker),
        ]);
        painter.rotate(self.yaw);
    }

    fn paint_readout(&self, painter: &mut Painter<'_>) {
        let w = READOUT_WIDTH;
        let h = 2 * (READOUT_FONT_SIZE as i32 + 8);
        let (x, y) = (-w / 2, -h / 2);
        let (x, y, w, h) = (x as f64, y as f64, w as f64, h as f64);

        painter.set_pen(Some(Stroke::new(Color::BLACK, 2.0)));
        painter.set_brush(Some(Color::WHITE));
        painter.set_font_size(READOUT_FONT_SIZE);
        painter.draw_rounded_rect(Rect::new(x, y, w, h), 6.0);

        painter.set_pen(Some(Stroke::new(Color::BLUE, 2.0)));
        painter.draw_text(
            Rect::new(x, y + 2.0, w, h / 2.0),
            Align::Center,
            altitude_text(self.altitude),
        );
        painter.draw_text(
            Rect::new(x, y + h / 2.0, w, h / 2.0),
            Align::Center,
            height_text(self.height),
        );
    }
}

impl Instrument for CompassAltimeter {
    fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    fn redraw_signal(&self) -> &RedrawSignal {
        &self.redraw
    }

    fn paint(&self, painter: &mut Painter<'_>) {
        let size = self.viewport.current_size();

        self.paint_background(painter, size);
        self.paint_heading_ring(painter, size);
        self.paint_north_south_arrows(painter, size);
        self.paint_yaw_marker(painter, size);
        self.paint_readout(painter);
    }
}

/// Single-step wrap: one turn is added or removed, never more.
pub fn wrap_yaw(value: f64) -> f64 {
    let mut yaw = value;
    if yaw < 0.0 {
        yaw += 360.0;
    }
    if yaw >= 360.0 {
        yaw -= 360.0;
    }
    yaw
}

/// Ticks run counter-clockwise from north in 10 degree steps.
pub fn heading_mark(i: usize) -> HeadingMark {
    match i {
        0 => HeadingMark::Cardinal('N', Color::BLUE),
        9 => HeadingMark::Cardinal('W', Color::BLACK),
        18 => HeadingMark::Cardinal('S', Color::RED),
        27 => HeadingMark::Cardinal('E', Color::BLACK),
        i if i % 3 == 0 => HeadingMark::Numeric((i * (360 / HEADING_TICKS)) as i32),
        _ => HeadingMark::Minor,
    }
}

pub fn altitude_text(altitude: f64) -> String {
    format!("ALT: {altitude:6.1} m")
}

pub fn height_text(height: f64) -> String {
    format!("H: {height:6.1} m")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::DrawCommand;
    use pretty_assertions::assert_eq;

    fn compass() -> CompassAltimeter {
        CompassAltimeter::new(Arc::new(InstrumentGeometry::default()))
    }

    fn text_anchor(compass: &CompassAltimeter, wanted: &str) -> Point {
        compass
            .scene()
            .commands()
            .iter()
            .find_map(|c| match c {
                DrawCommand::Text { text, anchor, .. } if text == wanted => Some(*anchor),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn negative_yaw_wraps_up() {
        let mut compass = compass();
        compass.set_yaw(-10.0);
        assert_eq!(compass.yaw(), 350.0);
    }

    #[test]
    fn yaw_past_a_turn_wraps_down() {
        let mut compass = compass();
        compass.set_yaw(370.0);
        assert_eq!(compass.yaw(), 10.0);
        compass.set_yaw(360.0);
        assert_eq!(compass.yaw(), 0.0);
    }

    #[test]
    fn wrap_is_a_single_step() {
        assert_eq!(wrap_yaw(-400.0), -40.0);
        assert_eq!(wrap_yaw(800.0), 440.0);
        assert_eq!(wrap_yaw(359.5), 359.5);
    }

    #[test]
    fn non_finite_input_is_ignored() {
        let mut compass = compass();
        compass.set_data(100.0, 5.0, 90.0);
        compass.set_altitude(f64::NAN);
        compass.set_altitude(f64::NAN);
        compass.set_height(f64::INFINITY);
        compass.set_yaw(f64::NEG_INFINITY);
        assert_eq!(
            (compass.altitude(), compass.height(), compass.yaw()),
            (100.0, 5.0, 90.0)
        );
        assert_eq!(compass.redraw_signal().emit_count(), 1);
    }

    #[test]
    fn altitude_and_height_are_unbounded() {
        let mut compass = compass();
        compass.set_altitude(-12_000.0);
        compass.set_height(1.0e6);
        assert_eq!(compass.altitude(), -12_000.0);
        assert_eq!(compass.height(), 1.0e6);
        assert_eq!(compass.redraw_signal().emit_count(), 2);
    }

    #[test]
    fn tolerance_applies_to_every_field() {
        let mut compass = compass();
        compass.set_altitude(0.04);
        compass.set_height(-0.05);
        compass.set_yaw(0.01);
        assert_eq!(compass.redraw_signal().emit_count(), 0);
        compass.set_yaw(0.06);
        assert_eq!(compass.redraw_signal().emit_count(), 1);
    }

    #[test]
    fn set_data_redraws_at_most_once() {
        let mut compass = compass();
        compass.set_data(100.0, 20.0, -90.0);
        assert_eq!(compass.redraw_signal().emit_count(), 1);
        assert_eq!(
            (compass.altitude(), compass.height(), compass.yaw()),
            (100.0, 20.0, 270.0)
        );
        compass.set_data(100.0, 20.0, 270.0);
        assert_eq!(compass.redraw_signal().emit_count(), 1);
    }

    #[test]
    fn ring_labels_and_readout() {
        let mut compass = compass();
        compass.set_data(1234.56, 7.0, 0.0);
        assert_eq!(
            compass.scene().texts(),
            vec![
                "N", "30", "60", "W", "120", "150", "S", "210", "240", "E", "300", "330",
                "ALT: 1234.6 m", "H:    7.0 m",
            ]
        );
    }

    #[test]
    fn cardinals_are_coloured() {
        let compass = compass();
        let colors: Vec<(String, Color)> = compass
            .scene()
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, color, .. } if text.len() == 1 => {
                    Some((text.clone(), *color))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            colors,
            vec![
                ("N".to_string(), Color::BLUE),
                ("W".to_string(), Color::BLACK),
                ("S".to_string(), Color::RED),
                ("E".to_string(), Color::BLACK),
            ]
        );
    }

    #[test]
    fn west_is_left_and_east_is_right() {
        let compass = compass();
        let (cx, _) = compass.viewport().center();
        assert!(text_anchor(&compass, "W").x < cx);
        assert!(text_anchor(&compass, "E").x > cx);
        assert!(text_anchor(&compass, "S").y > text_anchor(&compass, "N").y);
    }

    #[test]
    fn every_tick_is_drawn() {
        let compass = compass();
        let scene = compass.scene();
        let lines = scene.lines();
        assert_eq!(lines.len(), 36);
        let long = lines
            .iter()
            .filter(|(from, to, _)| (from.distance(*to) - 7.0).abs() < 1e-9)
            .count();
        assert_eq!(long, 12);
    }

    #[test]
    fn yaw_marker_points_at_heading() {
        let mut compass = compass();
        compass.set_yaw(90.0);
        let scene = compass.scene();
        let apex = scene.polygons()[2][0];
        assert!(apex.distance(Point::new(4.0, 100.0)) < 1e-9);
    }

    #[test]
    fn yaw_marker_leaves_transform_untouched() {
        let mut compass = compass();
        let level = compass.scene().polygons()[3].to_vec();
        compass.set_yaw(123.0);
        let turned = compass.scene().polygons()[3].to_vec();
        for (a, b) in level.iter().zip(turned.iter()) {
            assert!(a.distance(*b) < 1e-9);
        }
    }

    #[test]
    fn arrows_are_fixed() {
        let mut compass = compass();
        compass.set_yaw(45.0);
        let scene = compass.scene();
        let north = scene.polygons()[0][0];
        let south = scene.polygons()[1][0];
        assert!((north.y - (100.0 - (98.0 - 2.0 - 196.0 / 25.0 - 15.0))).abs() < 1e-9);
        assert!((south.y - (100.0 + (98.0 - 2.0 - 196.0 / 25.0 - 15.0))).abs() < 1e-9);
        assert!((north.x - 100.0).abs() < 1e-9);
    }

    #[test]
    fn readout_uses_one_decimal() {
        assert_eq!(altitude_text(12.34), "ALT:   12.3 m");
        assert_eq!(height_text(-3.0), "H:   -3.0 m");
    }
}
