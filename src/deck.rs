use std::sync::mpsc::Receiver;
use std::sync::Arc;

use tracing::trace;

use crate::attitude::AttitudeIndicator;
use crate::compass::CompassAltimeter;
use crate::config::InstrumentGeometry;
use crate::panel::KeyValuePanel;
use crate::FlightCommand;

/// The attitude indicator, the compass and the telemetry panel that mirrors
/// them.
#[derive(Debug)]
pub struct FlightDeck {
    pub attitude: AttitudeIndicator,
    pub compass: CompassAltimeter,
    pub panel: Arc<KeyValuePanel>,
}

impl FlightDeck {
    /// Builds all widgets from one shared geometry and shows the initial
    /// values in the panel.
    pub fn new(geometry: Arc<InstrumentGeometry>) -> Self {
        let deck = Self {
            attitude: AttitudeIndicator::new(geometry.clone()),
            compass: CompassAltimeter::new(geometry),
            panel: Arc::new(KeyValuePanel::new()),
        };
        deck.publish_telemetry();
        deck
    }

    pub fn apply(&mut self, command: FlightCommand) {
        trace!(?command, "applying command");
        match command {
            FlightCommand::SetPitch(pitch) => self.attitude.set_pitch(pitch),
            FlightCommand::SetRoll(roll) => self.attitude.set_roll(roll),
            FlightCommand::SetAttitude { pitch, roll } => self.attitude.set_data(pitch, roll),
            FlightCommand::SetYaw(yaw) => self.compass.set_yaw(yaw),
            FlightCommand::SetAltitude(altitude) => self.compass.set_altitude(altitude),
            FlightCommand::SetHeight(height) => self.compass.set_height(height),
            FlightCommand::SetCompass {
                altitude,
                height,
                yaw,
            } => self.compass.set_data(altitude, height, yaw),
        }
    }

    /// Applies everything queued on `receiver` without blocking, then
    /// republishes telemetry once. Returns the number of commands applied.
    pub fn drain(&mut self, receiver: &Receiver<FlightCommand>) -> usize {
        let mut applied = 0;
        while let Ok(command) = receiver.try_recv() {
            self.apply(command);
            applied += 1;
        }
        if applied > 0 {
            self.publish_telemetry();
        }
        applied
    }

    /// Writes the five current values into the panel and reloads it.
    pub fn publish_telemetry(&self) {
        {
            let mut data = self.panel.begin_set_data();
            data.insert("roll", format_value(self.attitude.roll()));
            data.insert("pitch", format_value(self.attitude.pitch()));
            data.insert("yaw", format_value(self.compass.yaw()));
            data.insert("alt", format_value(self.compass.altitude()));
            data.insert("H", format_value(self.compass.height()));
        }
        self.panel.list_reload();
    }
}

const SIGNIFICANT_DIGITS: i32 = 6;

/// `%g` style: six significant digits, trailing zeros dropped, exponent
/// form below `1e-4` and from `1e6` up. `2.0` prints as `2`,
/// `5.123456789` as `5.12346`, `1234567.0` as `1.23457e+06`.
pub fn format_value(value: f64) -> String {
    let precision = (SIGNIFICANT_DIGITS - 1) as usize;
    let scientific = format!("{value:.precision$e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        // NaN and infinities
        return format!("{value}");
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return format!("{value}");
    };

    if exponent < -4 || exponent >= SIGNIFICANT_DIGITS {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exponent.abs())
    } else {
        let decimals = (SIGNIFICANT_DIGITS - 1 - exponent) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}
