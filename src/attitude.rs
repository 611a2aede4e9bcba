use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::config::InstrumentGeometry;
use crate::scene::{Align, Painter, Point, Rect, Stroke};
use crate::signal::RedrawSignal;
use crate::viewport::Viewport;
use crate::{approx_eq, Color, Instrument, CHANGE_TOLERANCE};

const SKY: Color = Color::new(48, 172, 220);
const GROUND: Color = Color::new(247, 168, 21);

pub const PITCH_RANGE: (f64, f64) = (-90.0, 90.0);
pub const ROLL_RANGE: (f64, f64) = (-180.0, 180.0);

/// Pitch that puts a ladder rung on the rim of the disc.
const PITCH_SCALE_DEG: f64 = 45.0;
/// The horizon never moves further than this from centre.
const HORIZON_LIMIT_DEG: f64 = 40.0;

const LABEL_FONT_SIZE: f32 = 8.0;
const ROLL_TICKS: usize = 36;

/// Artificial horizon: sky/ground disc, pitch ladder and roll ring.
///
/// NaN and infinite inputs are ignored by every setter.
#[derive(Debug)]
pub struct AttitudeIndicator {
    viewport: Viewport,
    roll: f64,
    pitch: f64,
    redraw: RedrawSignal,
}

impl AttitudeIndicator {
    pub fn new(geometry: Arc<InstrumentGeometry>) -> Self {
        Self {
            viewport: Viewport::new(geometry),
            roll: 0.0,
            pitch: 0.0,
            redraw: RedrawSignal::new(),
        }
    }

    pub fn roll(&self) -> f64 {
        self.roll
    }

    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    /// Clamps to [-90, 90] and redraws when the value actually moved.
    pub fn set_pitch(&mut self, value: f64) {
        if self.update_pitch(value) {
            self.redraw.emit();
        }
    }

    /// Clamps to [-180, 180] and redraws when the value actually moved.
    pub fn set_roll(&mut self, value: f64) {
        if self.update_roll(value) {
            self.redraw.emit();
        }
    }

    /// Sets both angles, redrawing at most once.
    pub fn set_data(&mut self, pitch: f64, roll: f64) {
        let pitch_changed = self.update_pitch(pitch);
        let roll_changed = self.update_roll(roll);
        if pitch_changed || roll_changed {
            self.redraw.emit();
        }
    }

    fn update_pitch(&mut self, value: f64) -> bool {
        if !value.is_finite() {
            warn!(value, "ignoring non-finite pitch");
            return false;
        }
        let pitch = value.clamp(PITCH_RANGE.0, PITCH_RANGE.1);
        if approx_eq(pitch, self.pitch, CHANGE_TOLERANCE) {
            trace!(pitch, current = self.pitch, "pitch within tolerance");
            return false;
        }
        debug!(from = self.pitch, to = pitch, "pitch changed");
        self.pitch = pitch;
        true
    }

    fn update_roll(&mut self, value: f64) -> bool {
        if !value.is_finite() {
            warn!(value, "ignoring non-finite roll");
            return false;
        }
        let roll = value.clamp(ROLL_RANGE.0, ROLL_RANGE.1);
        if approx_eq(roll, self.roll, CHANGE_TOLERANCE) {
            trace!(roll, current = self.roll, "roll within tolerance");
            return false;
        }
        debug!(from = self.roll, to = roll, "roll changed");
        self.roll = roll;
        true
    }

    fn paint_background(&self, painter: &mut Painter<'_>, size: i32) {
        let s = size as f64;
        let y = horizon_offset(s, self.pitch);
        let gr = horizon_half_angle(s, y);
        let half = (size / 2) as f64;
        let disc = Rect::new(-half, -half, s, s);

        painter.set_pen(Some(Stroke::new(Color::BLACK, 2.0)));
        painter.set_brush(Some(SKY));
        painter.draw_chord(disc, (gr * 16.0) as i32, ((180.0 - 2.0 * gr) * 16.0) as i32);

        painter.set_brush(Some(GROUND));
        painter.draw_chord(disc, (gr * 16.0) as i32, (-(180.0 + 2.0 * gr) * 16.0) as i32);
    }

    fn paint_pitch_ladder(&self, painter: &mut Painter<'_>, size: i32) {
        let s = size as f64;
        let rung = s / 8.0;
        let text_width = 100.0;

        painter.set_font_size(LABEL_FONT_SIZE);

        for i in -9..=9 {
            let p = (i * 10) as f64;
            let mut l = if i % 3 == 0 { rung } else { rung / 2.0 };

            if i == 0 {
                painter.set_pen(Some(Stroke::new(Color::GREEN, 3.0)));
                l *= 1.8;
            } else {
                painter.set_pen(Some(Stroke::new(Color::WHITE, 2.0)));
            }

            let y = ladder_offset(s, p, self.pitch);
            if (l * l + y * y).sqrt() > s / 2.0 {
                continue;
            }

            painter.draw_line(Point::new(-l, y), Point::new(l, y));

            if i % 3 == 0 && i != 0 {
                let font = LABEL_FONT_SIZE as f64;
                painter.set_pen(Some(Stroke::new(Color::WHITE, 1.0)));
                painter.draw_text(
                    Rect::new(-l - 2.0 - text_width, y - font / 2.0 - 1.0, text_width, font + 2.0),
                    Align::Right,
                    format!("{}", -p),
                );
            }
        }
    }

    fn paint_roll_ring(&self, painter: &mut Painter<'_>, size: i32) {
        let step = 360.0 / ROLL_TICKS as f64;
        let tick = size / 25;
        let top = (-size / 2 + self.viewport.edge_offset()) as f64;
        let font = LABEL_FONT_SIZE as f64;

        painter.set_pen(Some(Stroke::new(Color::BLACK, 1.0)));
        painter.set_font_size(LABEL_FONT_SIZE);

        for i in 0..ROLL_TICKS {
            if i % 3 == 0 {
                painter.draw_line(Point::new(0.0, top), Point::new(0.0, top + tick as f64));
                painter.draw_text(
                    Rect::new(-50.0, top + tick as f64 + 2.0, 100.0, font + 2.0),
                    Align::Center,
                    roll_tick_label(i).to_string(),
                );
            } else {
                painter.draw_line(Point::new(0.0, top), Point::new(0.0, top + (tick / 2) as f64));
            }
            painter.rotate(step);
        }
    }

    /// Aircraft symbol, fixed to the screen.
    fn paint_aircraft_marker(&self, painter: &mut Painter<'_>, size: i32) {
        let m = (size / 20) as f64;

        painter.set_brush(Some(Color::RED));
        painter.set_pen(None);

        for side in [1.0, -1.0] {
            painter.draw_polygon(&[
                Point::new(side * m, 0.0),
                Point::new(side * 2.0 * m, -m / 2.0),
                Point::new(side * 2.0 * m, m / 2.0),
            ]);
        }
    }

    /// Roll pointer at twelve o'clock, fixed to the screen.
    fn paint_roll_pointer(&self, painter: &mut Painter<'_>, size: i32) {
        let marker = (size / 25) as f64;
        let top = -(size as f64) / 2.0 + self.viewport.edge_offset() as f64;

        painter.set_pen(Some(Stroke::new(Color::BLACK, 1.0)));
        painter.set_brush(Some(Color::BLACK));
        painter.draw_polygon(&[
            Point::new(0.0, top),
            Point::new(-marker / 2.0, top + marker),
            Point::new(marker / 2.0, top + marker),
        ]);
    }
}

impl Instrument for AttitudeIndicator {
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

        painter.save();
        painter.rotate(self.roll);
        self.paint_background(painter, size);
        self.paint_pitch_ladder(painter, size);
        self.paint_roll_ring(painter, size);
        painter.restore();

        self.paint_aircraft_marker(painter, size);
        self.paint_roll_pointer(painter, size);
    }
}

/// Height of the horizon chord above the centre of a disc of diameter
/// `size`, measured upward. Nose-up pitch gives a negative value: the
/// horizon drops below centre.
pub fn horizon_offset(size: f64, pitch: f64) -> f64 {
    let limit = size / 2.0 * HORIZON_LIMIT_DEG / PITCH_SCALE_DEG;
    (size / 2.0 * -pitch / PITCH_SCALE_DEG).clamp(-limit, limit)
}

/// Angle, in degrees, between the horizontal and the ends of a chord lying
/// `y` from the centre of a disc of diameter `size`.
pub fn horizon_half_angle(size: f64, y: f64) -> f64 {
    let x = (size * size / 4.0 - y * y).sqrt();
    (y / x).atan().to_degrees()
}

/// Screen offset of the ladder rung for `rung_pitch` at the current pitch.
pub fn ladder_offset(size: f64, rung_pitch: f64, pitch: f64) -> f64 {
    size / 2.0 * rung_pitch / PITCH_SCALE_DEG + size / 2.0 * pitch / PITCH_SCALE_DEG
}

/// Label of the `i`th roll tick: -0..-170 on the first half turn, then
/// 180 down to 10.
pub fn roll_tick_label(i: usize) -> i32 {
    let degrees = (i * (360 / ROLL_TICKS)) as i32;
    if i < ROLL_TICKS / 2 {
        -degrees
    } else {
        360 - degrees
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{DrawCommand, Scene};
    use pretty_assertions::assert_eq;

    fn indicator() -> AttitudeIndicator {
        AttitudeIndicator::new(Arc::new(InstrumentGeometry::default()))
    }

    #[test]
    fn setters_clamp_to_range() {
        let mut adi = indicator();
        for value in [-1000.0, -91.0, -90.0, 0.5, 45.0, 90.0, 120.0, 1e9] {
            adi.set_pitch(value);
            adi.set_roll(value * 2.0);
            assert!((-90.0..=90.0).contains(&adi.pitch()));
            assert!((-180.0..=180.0).contains(&adi.roll()));
        }
        adi.set_pitch(500.0);
        assert_eq!(adi.pitch(), 90.0);
        adi.set_roll(-500.0);
        assert_eq!(adi.roll(), -180.0);
    }

    #[test]
    fn non_finite_input_is_ignored() {
        let mut adi = indicator();
        adi.set_data(10.0, -20.0);
        adi.set_pitch(f64::NAN);
        adi.set_roll(f64::INFINITY);
        adi.set_data(f64::NEG_INFINITY, f64::NAN);
        assert_eq!((adi.pitch(), adi.roll()), (10.0, -20.0));
        assert_eq!(adi.redraw_signal().emit_count(), 1);

        adi.set_data(f64::NAN, 5.0);
        assert_eq!((adi.pitch(), adi.roll()), (10.0, 5.0));
        assert_eq!(adi.redraw_signal().emit_count(), 2);
    }

    #[test]
    fn repeated_value_redraws_once() {
        let mut adi = indicator();
        adi.set_pitch(12.0);
        adi.set_pitch(12.0);
        assert_eq!(adi.redraw_signal().emit_count(), 1);
    }

    #[test]
    fn small_roll_changes_are_ignored() {
        let mut adi = indicator();
        adi.set_roll(10.0);
        let before = adi.redraw_signal().emit_count();

        adi.set_roll(10.04);
        assert_eq!(adi.redraw_signal().emit_count(), before);
        assert_eq!(adi.roll(), 10.0);

        adi.set_roll(10.06);
        assert_eq!(adi.redraw_signal().emit_count(), before + 1);
        assert_eq!(adi.roll(), 10.06);
    }

    #[test]
    fn clamped_value_at_limit_does_not_redraw_again() {
        let mut adi = indicator();
        adi.set_pitch(95.0);
        adi.set_pitch(150.0);
        assert_eq!(adi.redraw_signal().emit_count(), 1);
    }

    #[test]
    fn set_data_redraws_at_most_once() {
        let mut adi = indicator();
        adi.set_data(5.0, -7.0);
        assert_eq!(adi.redraw_signal().emit_count(), 1);
        assert_eq!((adi.pitch(), adi.roll()), (5.0, -7.0));

        adi.set_data(5.01, -7.01);
        assert_eq!(adi.redraw_signal().emit_count(), 1);

        adi.set_data(5.0, 30.0);
        assert_eq!(adi.redraw_signal().emit_count(), 2);
    }

    #[test]
    fn horizon_is_held_inside_the_disc() {
        let size = 196.0;
        let limit = size / 2.0 * 40.0 / 45.0;
        assert_eq!(horizon_offset(size, 90.0), -limit);
        assert_eq!(horizon_offset(size, -90.0), limit);
        assert_eq!(horizon_offset(size, 0.0), 0.0);
        assert!(horizon_half_angle(size, limit).is_finite());
    }

    #[test]
    fn chord_distance_matches_offset() {
        let size = 300.0;
        let y = horizon_offset(size, 20.0);
        let gr = horizon_half_angle(size, y).to_radians();
        assert!((size / 2.0 * gr.sin() - y).abs() < 1e-9);
    }

    #[test]
    fn level_flight_splits_the_disc_in_half() {
        let adi = indicator();
        assert_eq!(adi.scene().chords(), vec![(0.0, 180.0), (0.0, -180.0)]);
    }

    #[test]
    fn nose_up_enlarges_the_sky() {
        let mut adi = indicator();
        adi.set_pitch(10.0);
        let chords = adi.scene().chords();
        assert!(chords[0].1 > 180.0);
        assert!(chords[1].1 > -180.0);
    }

    #[test]
    fn roll_rotates_the_horizon() {
        let mut adi = indicator();
        adi.set_roll(30.0);
        let chords = adi.scene().chords();
        assert_eq!(chords[0].0, -30.0);
    }

    #[test]
    fn ladder_skips_rungs_off_the_disc() {
        let adi = indicator();
        let scene = adi.scene();
        // 9 visible rungs (-40..=40) plus 36 roll ticks
        assert_eq!(scene.lines().len(), 9 + 36);
        assert_eq!(&scene.texts()[..2], &["30", "-30"]);
    }

    #[test]
    fn zero_rung_tracks_pitch() {
        let mut adi = indicator();
        adi.set_pitch(10.0);
        let scene = adi.scene();
        let (from, to, stroke) = scene
            .lines()
            .into_iter()
            .find(|(_, _, stroke)| stroke.color == Color::GREEN)
            .unwrap();
        let (_, cy) = adi.viewport().center();
        let expected = cy + 98.0 * 10.0 / 45.0;
        assert!((from.y - expected).abs() < 1e-9);
        assert!((to.x - from.x - 2.0 * 196.0 / 8.0 * 1.8).abs() < 1e-9);
        assert_eq!(stroke.width, 3.0);
    }

    #[test]
    fn roll_ring_labels() {
        let labels: Vec<i32> = (0..36).step_by(3).map(roll_tick_label).collect();
        assert_eq!(
            labels,
            vec![0, -30, -60, -90, -120, -150, 180, 150, 120, 90, 60, 30]
        );
    }

    #[test]
    fn roll_ring_labels_rotate_with_their_ticks() {
        let adi = indicator();
        let scene = adi.scene();
        let rotations: Vec<f64> = scene
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text {
                    text, rotation_deg, ..
                } if text == "-90" => Some(*rotation_deg),
                _ => None,
            })
            .collect();
        assert_eq!(rotations, vec![90.0]);
    }

    fn polygons(scene: &Scene) -> Vec<Vec<Point>> {
        scene.polygons().into_iter().map(|p| p.to_vec()).collect()
    }

    #[test]
    fn fixed_symbols_ignore_roll() {
        let mut adi = indicator();
        let level = polygons(&adi.scene());
        adi.set_roll(45.0);
        let banked = polygons(&adi.scene());

        assert_eq!(level.len(), 3);
        for (a, b) in level.iter().flatten().zip(banked.iter().flatten()) {
            assert!(a.distance(*b) < 1e-9);
        }
    }

    #[test]
    fn roll_pointer_sits_on_the_rim() {
        let adi = indicator();
        let scene = adi.scene();
        let pointer = scene.polygons()[2];
        assert_eq!(pointer[0], Point::new(100.0, 100.0 - 98.0 + 2.0));
    }

    #[test]
    fn tiny_configured_dial_still_paints() {
        let config = crate::config::AppConfig::from_toml_str(
            "[instruments]\nmin_size = 4\nmax_size = 4\nedge_offset = 5\n",
        )
        .unwrap();
        let mut adi = AttitudeIndicator::new(Arc::new(config.geometry()));
        assert_eq!(adi.viewport().current_size(), 2);
        adi.set_pitch(45.0);
        assert_eq!(adi.scene().chords().len(), 2);
    }

    #[test]
    fn empty_dial_does_not_panic() {
        let geometry = InstrumentGeometry::builder()
            .min_size(4)
            .max_size(4)
            .edge_offset(5)
            .build();
        let mut adi = AttitudeIndicator::new(Arc::new(geometry));
        adi.set_pitch(-30.0);
        assert!(!adi.scene().is_empty());
    }

    #[test]
    fn geometry_scales_with_viewport() {
        let mut adi = indicator();
        adi.resize(400, 300);
        let scene = adi.scene();
        match &scene.commands()[0] {
            DrawCommand::Chord { center, radius, .. } => {
                assert_eq!(*center, Point::new(200.0, 150.0));
                assert_eq!(*radius, 148.0);
            }
            other => panic!("expected chord, got {other:?}"),
        }
    }
}
