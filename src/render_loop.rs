// render_loop.rs — 帧调度：自动旋转 → 投影 → 交给宿主显示
//
// The host calls `tick()` once per display refresh (vsync-paced redraw), so
// the cadence follows the monitor rather than a fixed timer.

use crate::config::ViewerConfig;
use crate::controller::InteractionController;
use crate::error::ViewerResult;
use crate::panorama::SourceImage;
use crate::projector::{self, OutputFrame};
use std::time::{Duration, Instant};

const SCALE_STEP: f64 = 0.1;
const DEFAULT_BUDGET: Duration = Duration::from_micros(16_700);

#[derive(Debug, Clone)]
pub struct RenderLoop {
    running: bool,
    /// Load generation the loop was started for; 0 = never started.
    generation: u64,
    surface: (u32, u32),
    scale: f64,
    max_scale: f64,
    min_scale: f64,
    adaptive: bool,
    budget: Duration,
    frames: u64,
    last_frame_time: Option<Duration>,
}

impl RenderLoop {
    pub fn new(cfg: &ViewerConfig) -> Self {
        Self {
            running: false,
            generation: 0,
            surface: (0, 0),
            scale: cfg.render_scale,
            max_scale: cfg.render_scale,
            min_scale: cfg.min_render_scale,
            adaptive: cfg.adaptive_resolution,
            budget: Duration::try_from_secs_f64(cfg.frame_budget_ms / 1000.0)
                .unwrap_or(DEFAULT_BUDGET),
            frames: 0,
            last_frame_time: None,
        }
    }

    /// Starts ticking for the image loaded under `generation`. A loop still
    /// running for another generation is stopped first.
    pub fn start(&mut self, generation: u64) {
        if self.running {
            if self.generation == generation {
                return;
            }
            self.stop();
        }
        self.running = true;
        self.generation = generation;
        self.frames = 0;
        self.scale = self.max_scale;
        log::info!("render loop started (generation {})", generation);
    }

    pub fn stop(&mut self) {
        if self.running {
            log::info!(
                "render loop stopped (generation {}, {} frames)",
                self.generation,
                self.frames
            );
        }
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Called on surface resize events only, not per tick.
    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) != self.surface {
            log::debug!("render surface resized to {}x{}", width, height);
            self.surface = (width, height);
        }
    }

    pub fn surface_size(&self) -> (u32, u32) {
        self.surface
    }

    pub fn render_scale(&self) -> f64 {
        self.scale
    }

    /// Internal projection size: the surface scaled on both axes.
    pub fn render_size(&self) -> (u32, u32) {
        let (w, h) = self.surface;
        if w == 0 || h == 0 {
            return (0, 0);
        }
        let scaled = |v: u32| ((v as f64 * self.scale).round() as u32).max(1);
        (scaled(w), scaled(h))
    }

    pub fn last_frame_time(&self) -> Option<Duration> {
        self.last_frame_time
    }

    /// One frame. Returns `None` when stopped or when the surface has no area
    /// (e.g. a minimised window).
    pub fn tick(
        &mut self,
        controller: &mut InteractionController,
        source: &SourceImage,
    ) -> ViewerResult<Option<OutputFrame>> {
        if !self.running {
            return Ok(None);
        }
        let (w, h) = self.render_size();
        if w == 0 || h == 0 {
            return Ok(None);
        }

        // 首帧显示打开时的视角，之后每帧推进自动旋转
        if self.frames > 0 {
            controller.auto_rotate_step();
        }

        let started = Instant::now();
        let frame = projector::project(source, controller.view(), w, h)?;
        self.record_frame_time(started.elapsed());
        self.frames += 1;

        Ok(Some(frame))
    }

    /// Feeds the adaptive resolution control.
    pub fn record_frame_time(&mut self, elapsed: Duration) {
        self.last_frame_time = Some(elapsed);
        if !self.adaptive {
            return;
        }

        if elapsed > self.budget && self.scale > self.min_scale {
            self.scale = (self.scale - SCALE_STEP).max(self.min_scale);
            log::debug!(
                "frame took {:.1}ms, render scale -> {:.2}",
                elapsed.as_secs_f64() * 1000.0,
                self.scale
            );
        } else if elapsed < self.budget / 2 && self.scale < self.max_scale {
            self.scale = (self.scale + SCALE_STEP).min(self.max_scale);
        }
    }
}
