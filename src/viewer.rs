//! Window that replays one episode, a step per tick.
//!
//! Keys: `Esc` quits, `P` pauses, `R` restarts on a fresh seed, `+`/`-` change speed.

use std::time::{Duration, Instant};

use anyhow::Result;
use pixels::{Pixels, SurfaceTexture};
use tracing::{error, info};
use winit::dpi::LogicalSize;
use winit::event::{Event, VirtualKeyCode};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;
use winit_input_helper::WinitInputHelper;

use crate::draw::{BACKGROUND, Canvas, draw_game, draw_hud};
use crate::episode::Episode;
use crate::policy::Controller;

const CELL_PX: u32 = 20;
const HUD_HEIGHT: u32 = 80;
const CHART_WIDTH: u32 = 240;

/// Opens a window and never returns: the process exits when the window closes.
pub fn run_windowed<C>(mut episode: Episode, mut controller: C, seed: u64, history: Vec<f32>) -> Result<()>
where
    C: Controller + 'static,
{
    let board_w = episode.game().board().width() as u32 * CELL_PX;
    let board_h = episode.game().board().height() as u32 * CELL_PX;
    let (width, height) = (board_w.max(CHART_WIDTH + 236), board_h + HUD_HEIGHT);

    let event_loop = EventLoop::new();
    let mut input = WinitInputHelper::new();
    let window = WindowBuilder::new()
        .with_title("snake-evolve")
        .with_inner_size(LogicalSize::new(width, height))
        .with_resizable(false)
        .build(&event_loop)?;

    let mut pixels = {
        let window_size = window.inner_size();
        let surface_texture = SurfaceTexture::new(window_size.width, window_size.height, &window);
        Pixels::new(width, height, surface_texture)?
    };

    let mut tick = Duration::from_millis(100);
    let mut last_step = Instant::now();
    let mut paused = false;
    let mut restarts: u64 = 0;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        if let Event::RedrawRequested(_) = event {
            {
                let mut canvas = Canvas::new(pixels.frame_mut(), width, height);
                canvas.clear(BACKGROUND);
                draw_game(&mut canvas, episode.game(), CELL_PX);
                draw_hud(&mut canvas, episode.stats(), 4, board_h + 8);
                canvas.draw_chart(width - CHART_WIDTH - 8, board_h + 8, CHART_WIDTH, HUD_HEIGHT - 16, &history);
            }
            if let Err(err) = pixels.render() {
                error!(%err, "render failed");
                *control_flow = ControlFlow::Exit;
                return;
            }
        }

        if input.update(&event) {
            if input.key_pressed(VirtualKeyCode::Escape) || input.close_requested() || input.destroyed() {
                *control_flow = ControlFlow::Exit;
                return;
            }
            if input.key_pressed(VirtualKeyCode::P) {
                paused = !paused;
            }
            if input.key_pressed(VirtualKeyCode::R) {
                restarts += 1;
                if let Err(err) = episode.reset(seed.wrapping_add(restarts)) {
                    error!(%err, "restart failed");
                    *control_flow = ControlFlow::Exit;
                    return;
                }
            }
            if input.key_pressed(VirtualKeyCode::NumpadAdd) || input.key_pressed(VirtualKeyCode::Equals) {
                tick = tick.saturating_sub(Duration::from_millis(10)).max(Duration::from_millis(10));
            }
            if input.key_pressed(VirtualKeyCode::NumpadSubtract) || input.key_pressed(VirtualKeyCode::Minus) {
                tick = (tick + Duration::from_millis(10)).min(Duration::from_millis(1000));
            }

            if !paused && !episode.is_over() && last_step.elapsed() >= tick {
                episode.step(&mut controller);
                last_step = Instant::now();
                if episode.is_over() {
                    let stats = episode.stats();
                    info!(food = stats.food_eaten, steps = stats.steps, fitness = stats.raw_fitness(), "episode over");
                }
            }
            window.request_redraw();
        }
    });
}
