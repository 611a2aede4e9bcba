// ============================================================================
// DEMO WINDOW
// ============================================================================
//
// Help text on the left; the attitude indicator, the compass and the
// telemetry panel stacked on the right. Redraws are driven by the
// instruments' redraw signals rather than a free-running loop.

use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::{Duration, Instant};

use pixels::{Pixels, SurfaceTexture};
use tracing::{debug, error, info, trace, warn};
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::config::AppConfig;
use crate::deck::FlightDeck;
use crate::error::Result;
use crate::input::{InputController, Key, HELP_LINES};
use crate::panel::ROW_HEIGHT;
use crate::raster::{load_font, Canvas, Rasterizer};
use crate::scene::{Align, Painter, Point, Rect, Scene, Stroke};
use crate::{Color, FlightCommand, Instrument};

const BACKGROUND: Color = Color::new(0xf0, 0xf0, 0xf0);
const HELP_WIDTH: u32 = 220;
const HELP_LINE_HEIGHT: f64 = 18.0;
const HELP_FONT_SIZE: f32 = 10.0;
const PANEL_ROWS: u32 = 5;

/// Where each part of the window goes, in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub help: Rect,
    pub attitude: Rect,
    pub compass: Rect,
    pub panel: Rect,
}

impl Layout {
    pub fn compute(width: u32, height: u32) -> Self {
        let right_x = HELP_WIDTH.min(width);
        let right_width = width.saturating_sub(right_x);
        let panel_height = PANEL_ROWS * ROW_HEIGHT as u32;
        let dial = right_width.min(height.saturating_sub(panel_height) / 2) as f64;

        let x = right_x as f64;
        Self {
            help: Rect::new(0.0, 0.0, right_x as f64, height as f64),
            attitude: Rect::new(x, 0.0, dial, dial),
            compass: Rect::new(x, dial, dial, dial),
            panel: Rect::new(x, 2.0 * dial, right_width as f64, panel_height as f64),
        }
    }

    /// Size requested from the dials. They clamp it to their own limits.
    pub fn dial_edge(&self) -> i32 {
        self.attitude.w as i32
    }
}

fn help_scene(area: Rect) -> Scene {
    let mut scene = Scene::new();
    {
        let mut painter = Painter::new(&mut scene);
        painter.set_pen(Some(Stroke::new(Color::BLACK, 1.0)));
        painter.set_font_size(HELP_FONT_SIZE);
        for (i, line) in HELP_LINES.iter().enumerate() {
            let y = 10.0 + i as f64 * HELP_LINE_HEIGHT;
            painter.draw_text(Rect::new(10.0, y, area.w - 20.0, HELP_LINE_HEIGHT), Align::Left, *line);
        }
    }
    scene
}

/// Last recorded scene of every part of the window. A part is re-recorded
/// only after its redraw signal fired, or when the layout changes.
struct DeckScenes {
    help: Scene,
    attitude: Scene,
    compass: Scene,
    panel: Scene,
}

impl DeckScenes {
    fn build(deck: &FlightDeck, layout: &Layout) -> Self {
        deck.attitude.redraw_signal().take_dirty();
        deck.compass.redraw_signal().take_dirty();
        deck.panel.redraw_signal().take_dirty();

        Self {
            help: help_scene(layout.help),
            attitude: deck.attitude.scene(),
            compass: deck.compass.scene(),
            panel: deck.panel.scene(layout.panel.w),
        }
    }

    /// Re-records the parts whose state changed. Returns how many were.
    fn refresh(&mut self, deck: &FlightDeck, layout: &Layout) -> usize {
        let mut rebuilt = 0;
        if deck.attitude.redraw_signal().take_dirty() {
            self.attitude = deck.attitude.scene();
            rebuilt += 1;
        }
        if deck.compass.redraw_signal().take_dirty() {
            self.compass = deck.compass.scene();
            rebuilt += 1;
        }
        if deck.panel.redraw_signal().take_dirty() {
            self.panel = deck.panel.scene(layout.panel.w);
            rebuilt += 1;
        }
        rebuilt
    }
}

fn render_deck(canvas: &mut Canvas, rasterizer: &Rasterizer, scenes: &DeckScenes, layout: &Layout) {
    canvas.clear(BACKGROUND);
    rasterizer.render(canvas, &scenes.help, Point::new(0.0, 0.0));
    rasterizer.render(
        canvas,
        &scenes.attitude,
        Point::new(layout.attitude.x, layout.attitude.y),
    );
    rasterizer.render(
        canvas,
        &scenes.compass,
        Point::new(layout.compass.x, layout.compass.y),
    );
    rasterizer.render(
        canvas,
        &scenes.panel,
        Point::new(layout.panel.x, layout.panel.y),
    );
}

fn apply_layout(deck: &mut FlightDeck, layout: &Layout) {
    let edge = layout.dial_edge();
    deck.attitude.resize(edge, edge);
    deck.compass.resize(edge, edge);
    debug!(edge, size = deck.attitude.viewport().current_size(), "dials resized");
}

/// Opens the demo window and runs until it is closed. Commands arriving on
/// `receiver` are applied once per frame interval.
pub fn run(
    config: &AppConfig,
    mut deck: FlightDeck,
    receiver: Option<Receiver<FlightCommand>>,
) -> Result<()> {
    let rasterizer = Rasterizer::new(load_font(config.font.path.as_deref())?);
    let controller = InputController::new(config.input.step);

    let event_loop = EventLoop::new()?;
    let window = WindowBuilder::new()
        .with_title(&config.window.title)
        .with_inner_size(LogicalSize::new(
            config.window.width as f64,
            config.window.height as f64,
        ))
        .with_resizable(true)
        .build(&event_loop)?;
    let window = Arc::new(window);
    let window_clone = window.clone();

    for signal in [
        deck.attitude.redraw_signal(),
        deck.compass.redraw_signal(),
        deck.panel.redraw_signal(),
    ] {
        let window = window.clone();
        signal.subscribe(move || window.request_redraw());
    }

    let size = window.inner_size();
    let mut fb_width = size.width as usize;
    let mut fb_height = size.height as usize;
    let surface_texture = SurfaceTexture::new(size.width, size.height, &window);
    let mut pixels = Pixels::new(size.width, size.height, surface_texture)?;

    let mut layout = Layout::compute(size.width, size.height);
    apply_layout(&mut deck, &layout);
    let mut scenes = DeckScenes::build(&deck, &layout);

    let frame_duration = Duration::from_secs_f64(1.0 / config.window.max_framerate.max(1.0));
    let mut last_frame = Instant::now();
    info!(width = size.width, height = size.height, "window opened");

    event_loop.run(move |event, window_target| match event {
        Event::WindowEvent { event, .. } => match event {
            WindowEvent::CloseRequested => window_target.exit(),
            WindowEvent::Resized(new_size) => {
                if new_size.width == 0 || new_size.height == 0 {
                    return;
                }
                fb_width = new_size.width as usize;
                fb_height = new_size.height as usize;
                if let Err(err) = pixels.resize_buffer(new_size.width, new_size.height) {
                    warn!(%err, "failed to resize frame buffer");
                }
                if let Err(err) = pixels.resize_surface(new_size.width, new_size.height) {
                    warn!(%err, "failed to resize surface");
                }
                layout = Layout::compute(new_size.width, new_size.height);
                apply_layout(&mut deck, &layout);
                scenes = DeckScenes::build(&deck, &layout);
                window_clone.request_redraw();
            }
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    if code == KeyCode::Escape {
                        window_target.exit();
                    } else if let Some(key) = Key::from_key_code(code) {
                        controller.handle_key(key, &mut deck);
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                let rebuilt = scenes.refresh(&deck, &layout);
                trace!(rebuilt, "redraw");

                let mut canvas = Canvas::new(pixels.frame_mut(), fb_width, fb_height);
                render_deck(&mut canvas, &rasterizer, &scenes, &layout);
                if let Err(err) = pixels.render() {
                    error!(%err, "render failed");
                    window_target.exit();
                }
            }
            _ => {}
        },
        Event::AboutToWait => match &receiver {
            Some(receiver) => {
                if last_frame.elapsed() >= frame_duration {
                    deck.drain(receiver);
                    last_frame = Instant::now();
                }
                window_target.set_control_flow(ControlFlow::WaitUntil(last_frame + frame_duration));
            }
            None => window_target.set_control_flow(ControlFlow::Wait),
        },
        _ => {}
    })?;

    info!("window closed");
    Ok(())
}
