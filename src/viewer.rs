// viewer.rs — 查看器生命周期：打开/加载/渲染/关闭

use crate::config::ViewerConfig;
use crate::controller::{ControllerAction, InteractionController, ViewerKey};
use crate::loader::{ImageLoader, LoadedImage};
use crate::panorama::SourceImage;
use crate::projector::OutputFrame;
use crate::render_loop::RenderLoop;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerPhase {
    Closed,
    Loading,
    Ready,
    Failed(String),
}

/// One viewer instance: owns the source image, the controller and the loop.
pub struct PanoramaViewer {
    config: ViewerConfig,
    loader: ImageLoader,
    controller: InteractionController,
    render_loop: RenderLoop,
    source: Option<SourceImage>,
    url: Option<String>,
    title: String,
    phase: ViewerPhase,
    generation: u64,
}

impl PanoramaViewer {
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            controller: InteractionController::new(&config),
            render_loop: RenderLoop::new(&config),
            loader: ImageLoader::new(),
            config,
            source: None,
            url: None,
            title: String::new(),
            phase: ViewerPhase::Closed,
            generation: 0,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn phase(&self) -> &ViewerPhase {
        &self.phase
    }

    pub fn is_open(&self) -> bool {
        self.phase != ViewerPhase::Closed
    }

    pub fn is_loading(&self) -> bool {
        self.phase == ViewerPhase::Loading
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn source(&self) -> Option<&SourceImage> {
        self.source.as_ref()
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut InteractionController {
        &mut self.controller
    }

    pub fn render_loop(&self) -> &RenderLoop {
        &self.render_loop
    }

    /// Starts loading `url`. Re-opening the panorama that is already open
    /// only updates the title.
    pub fn open_viewer(&mut self, url: &str, title: &str) {
        self.title = title.to_string();
        if self.is_open() && self.url.as_deref() == Some(url) {
            return;
        }

        // 旧循环必须先停，新图加载完成前不渲染
        self.render_loop.stop();
        self.source = None;
        self.controller.reset();
        self.url = Some(url.to_string());
        self.phase = ViewerPhase::Loading;
        self.generation = self.loader.request(url);
        log::info!("opening panorama '{}' from {}", title, url);
    }

    pub fn close_viewer(&mut self) {
        if !self.is_open() {
            return;
        }
        self.loader.cancel();
        self.render_loop.stop();
        self.controller.pointer_up();
        self.source = None;
        self.url = None;
        self.phase = ViewerPhase::Closed;
        log::info!("viewer closed");
    }

    /// Applies a finished decode, if one arrived. Returns `true` when the
    /// phase changed.
    pub fn poll_loader(&mut self) -> bool {
        match self.loader.try_recv() {
            Some(loaded) => self.apply_load(loaded),
            None => false,
        }
    }

    /// Blocks until the pending load finishes or `timeout` passes.
    pub fn wait_for_load(&mut self, timeout: Duration) -> bool {
        if !self.is_loading() {
            return false;
        }
        match self.loader.recv_timeout(timeout) {
            Some(loaded) => self.apply_load(loaded),
            None => false,
        }
    }

    fn apply_load(&mut self, loaded: LoadedImage) -> bool {
        // 关闭后或换图后迟到的结果直接丢弃
        if loaded.generation != self.generation || self.phase != ViewerPhase::Loading {
            log::debug!("ignoring stale load result for {}", loaded.url);
            return false;
        }

        match loaded.result {
            Ok(source) => {
                self.source = Some(source);
                self.phase = ViewerPhase::Ready;
                self.render_loop.start(self.generation);
            }
            Err(e) => {
                log::error!("{}", e);
                self.phase = ViewerPhase::Failed(e.to_string());
            }
        }
        true
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.render_loop.resize(width, height);
    }

    /// One render-loop tick. Projection errors are logged and the frame skipped.
    pub fn tick(&mut self) -> Option<OutputFrame> {
        let source = self.source.as_ref()?;
        match self.render_loop.tick(&mut self.controller, source) {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("frame skipped: {}", e);
                None
            }
        }
    }

    /// Keyboard shortcuts; Escape closes the viewer.
    pub fn handle_key(&mut self, key: ViewerKey) -> ControllerAction {
        if !self.is_open() {
            return ControllerAction::None;
        }
        let action = self.controller.handle_key(key);
        if action == ControllerAction::Close {
            self.close_viewer();
        }
        action
    }

    /// Zoom indicator shown next to the zoom buttons: `max_fov - fov`, rounded.
    pub fn zoom_percent(&self) -> i64 {
        (self.config.max_fov - self.controller.view().fov).round() as i64
    }
}
