use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the host side of the crate.
///
/// The instruments themselves never fail: out-of-range input saturates or
/// wraps. Everything here comes from configuration, fonts or the window.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("could not load font from {}", .0.display())]
    Font(PathBuf),

    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("window creation failed: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("pixel surface error: {0}")]
    Pixels(#[from] pixels::Error),

    #[error("pixel texture error: {0}")]
    Texture(#[from] pixels::TextureError),
}

pub type Result<T> = std::result::Result<T, Error>;
