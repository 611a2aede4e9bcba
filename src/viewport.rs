use std::sync::Arc;

use crate::config::InstrumentGeometry;

/// Square drawing area of a circular instrument inside its widget.
///
/// `current_size` is the dial diameter: the shorter widget edge minus the
/// edge offset on both sides, never negative. The widget itself is held
/// inside `[min_size, max_size]` on both axes.
#[derive(Debug, Clone)]
pub struct Viewport {
    geometry: Arc<InstrumentGeometry>,
    width: i32,
    height: i32,
    current_size: i32,
}

impl Viewport {
    /// A fresh viewport starts at the minimum widget size.
    pub fn new(geometry: Arc<InstrumentGeometry>) -> Self {
        let min = geometry.min_size;
        let mut viewport = Self {
            geometry,
            width: min,
            height: min,
            current_size: 0,
        };
        viewport.resize(min, min);
        viewport
    }

    pub fn resize(&mut self, width: i32, height: i32) {
        let (min, max) = (self.geometry.min_size, self.geometry.max_size);
        self.width = width.clamp(min, max);
        self.height = height.clamp(min, max);
        self.current_size = (self.width.min(self.height) - 2 * self.geometry.edge_offset).max(0);
    }

    pub fn current_size(&self) -> i32 {
        self.current_size
    }

    pub fn edge_offset(&self) -> i32 {
        self.geometry.edge_offset
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Widget midpoint, where every dial is centred.
    pub fn center(&self) -> (f64, f64) {
        (self.width as f64 / 2.0, self.height as f64 / 2.0)
    }

    pub fn geometry(&self) -> &InstrumentGeometry {
        &self.geometry
    }
}
