//! Simulated sensor feed for the demo: a slow random walk with fast,
//! mostly sub-tolerance noise on top, delivered over a channel.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, info};

use crate::config::FeedConfig;
use crate::error::Result;
use crate::FlightCommand;

const MAX_PITCH: f64 = 30.0;
const MAX_ROLL: f64 = 45.0;

/// Random-walk flight state.
#[derive(Debug, Clone, Default)]
pub struct SimulatedFlight {
    pitch: f64,
    roll: f64,
    yaw: f64,
    altitude: f64,
    height: f64,
}

impl SimulatedFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the walk one step and returns the noisy sample as commands.
    pub fn next_commands<R: Rng>(&mut self, rng: &mut R, jitter: f64) -> [FlightCommand; 2] {
        self.pitch = (self.pitch + rng.random_range(-0.5..0.5)).clamp(-MAX_PITCH, MAX_PITCH);
        self.roll = (self.roll + rng.random_range(-0.8..0.8)).clamp(-MAX_ROLL, MAX_ROLL);
        self.yaw = (self.yaw + rng.random_range(-0.6..0.6)).rem_euclid(360.0);
        self.altitude = (self.altitude + rng.random_range(-0.5..1.0)).max(0.0);
        self.height = (self.height + rng.random_range(-0.5..0.5)).max(0.0);

        let jitter = jitter.abs();
        let mut noise = || rng.random_range(-jitter..=jitter);
        [
            FlightCommand::SetAttitude {
                pitch: self.pitch + noise(),
                roll: self.roll + noise(),
            },
            FlightCommand::SetCompass {
                altitude: self.altitude + noise(),
                height: self.height + noise(),
                yaw: self.yaw + noise(),
            },
        ]
    }
}

/// Starts the feed thread. It stops on its own once the receiver is dropped.
pub fn spawn(config: &FeedConfig) -> Result<Receiver<FlightCommand>> {
    let (sender, receiver) = mpsc::channel();
    let interval = Duration::from_millis(config.interval_ms.max(1));
    let jitter = config.jitter;

    thread::Builder::new()
        .name("sensor-feed".to_string())
        .spawn(move || run(sender, interval, jitter))?;

    info!(?interval, jitter, "simulated sensor feed started");
    Ok(receiver)
}

fn run(sender: Sender<FlightCommand>, interval: Duration, jitter: f64) {
    let mut rng = rand::rng();
    let mut flight = SimulatedFlight::new();

    loop {
        let commands = flight.next_commands(&mut rng, jitter);
        if commands.iter().any(|command| sender.send(*command).is_err()) {
            debug!("feed receiver dropped, stopping");
            break;
        }
        thread::sleep(interval);
    }
}
