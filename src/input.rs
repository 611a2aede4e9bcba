use tracing::debug;
use winit::keyboard::KeyCode;

use crate::deck::FlightDeck;

/// Keys the demo reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    A,
    D,
    W,
    S,
    J,
    K,
}

impl Key {
    pub fn from_key_code(code: KeyCode) -> Option<Self> {
        match code {
            KeyCode::ArrowUp => Some(Key::Up),
            KeyCode::ArrowDown => Some(Key::Down),
            KeyCode::ArrowLeft => Some(Key::Left),
            KeyCode::ArrowRight => Some(Key::Right),
            KeyCode::KeyA => Some(Key::A),
            KeyCode::KeyD => Some(Key::D),
            KeyCode::KeyW => Some(Key::W),
            KeyCode::KeyS => Some(Key::S),
            KeyCode::KeyJ => Some(Key::J),
            KeyCode::KeyK => Some(Key::K),
            _ => None,
        }
    }
}

/// One help line per key, in display order.
pub const HELP_LINES: [&str; 12] = [
    "Demo usage:",
    "----------------------------",
    "UP    - Pitch +",
    "DOWN  - Pitch -",
    "LEFT  - Roll -",
    "RIGHT - Roll +",
    "A     - Yaw +",
    "D     - Yaw -",
    "W     - Alt +",
    "S     - Alt -",
    "J     - H +",
    "K     - H -",
];

/// Turns key presses into fixed increments on the instruments.
#[derive(Debug, Clone, Copy)]
pub struct InputController {
    step: f64,
}

impl Default for InputController {
    fn default() -> Self {
        Self { step: 1.0 }
    }
}

impl InputController {
    pub fn new(step: f64) -> Self {
        Self { step }
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Applies `key` and then republishes telemetry, whether or not any
    /// instrument value actually changed.
    pub fn handle_key(&self, key: Key, deck: &mut FlightDeck) {
        let step = self.step;
        debug!(?key, step, "key pressed");

        match key {
            Key::Up => deck.attitude.set_pitch(deck.attitude.pitch() + step),
            Key::Down => deck.attitude.set_pitch(deck.attitude.pitch() - step),
            Key::Left => deck.attitude.set_roll(deck.attitude.roll() - step),
            Key::Right => deck.attitude.set_roll(deck.attitude.roll() + step),
            Key::A => deck.compass.set_yaw(deck.compass.yaw() + step),
            Key::D => deck.compass.set_yaw(deck.compass.yaw() - step),
            Key::W => deck.compass.set_altitude(deck.compass.altitude() + step),
            Key::S => deck.compass.set_altitude(deck.compass.altitude() - step),
            Key::J => deck.compass.set_height(deck.compass.height() + step),
            Key::K => deck.compass.set_height(deck.compass.height() - step),
        }

        deck.publish_telemetry();
    }
}
