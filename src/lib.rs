// ============================================================================
// CRATE CONFIGURATION & MODULES
// ============================================================================

pub mod app;
pub mod attitude;
pub mod compass;
pub mod config;
pub mod deck;
pub mod error;
pub mod feed;
pub mod input;
pub mod panel;
pub mod raster;
pub mod scene;
pub mod signal;
pub mod viewport;

pub use attitude::AttitudeIndicator;
pub use compass::CompassAltimeter;
pub use config::{AppConfig, InstrumentGeometry};
pub use deck::FlightDeck;
pub use error::{Error, Result};
pub use input::{InputController, Key};
pub use panel::{KeyValuePanel, TelemetryMap, TelemetryRow};
pub use scene::{Painter, Scene};
pub use signal::RedrawSignal;
pub use viewport::Viewport;

// ============================================================================
// COLOR
// ============================================================================

/// RGBA colour for instrument elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::new(0xff, 0xff, 0xff);
    pub const BLACK: Color = Color::new(0x00, 0x00, 0x00);
    pub const RED: Color = Color::new(0xff, 0x00, 0x00);
    pub const GREEN: Color = Color::new(0x00, 0xff, 0x00);
    pub const BLUE: Color = Color::new(0x00, 0x00, 0xff);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xff }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    pub const fn as_tuple(self) -> (u8, u8, u8) {
        (self.r, self.g, self.b)
    }
}

// ============================================================================
// PUBLIC API - COMMANDS
// ============================================================================

/// Command enum for type-safe flight-state updates arriving over a channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlightCommand {
    SetPitch(f64),
    SetRoll(f64),
    SetAttitude { pitch: f64, roll: f64 },
    SetYaw(f64),
    SetAltitude(f64),
    SetHeight(f64),
    SetCompass { altitude: f64, height: f64, yaw: f64 },
}

// ============================================================================
// INSTRUMENT INTERFACE
// ============================================================================

/// A circular dial the host can size, paint and listen to.
pub trait Instrument {
    fn viewport(&self) -> &Viewport;

    fn viewport_mut(&mut self) -> &mut Viewport;

    fn redraw_signal(&self) -> &RedrawSignal;

    /// Draws with the painter's origin already at the viewport midpoint.
    fn paint(&self, painter: &mut Painter<'_>);

    fn resize(&mut self, width: i32, height: i32) {
        self.viewport_mut().resize(width, height);
    }

    /// Records the whole instrument in widget coordinates.
    fn scene(&self) -> Scene {
        let mut scene = Scene::new();
        {
            let mut painter = Painter::new(&mut scene);
            let (cx, cy) = self.viewport().center();
            painter.translate(cx, cy);
            self.paint(&mut painter);
        }
        scene
    }
}

/// Equality with the tolerance used for redraw deduplication.
pub(crate) fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}

/// Values closer than this are treated as unchanged and do not redraw.
pub const CHANGE_TOLERANCE: f64 = 0.05;
