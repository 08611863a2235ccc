// lib.rs — 360° 全景查看器核心：投影、交互、帧循环、加载
//
// Everything here runs without a window; the desktop host lives in main.rs.

pub mod config;
pub mod controller;
pub mod error;
pub mod i18n;
pub mod loader;
pub mod panorama;
pub mod projector;
pub mod render_loop;
pub mod viewer;

pub use config::{LaunchOptions, ViewerConfig};
pub use controller::{ControllerAction, InteractionController, TouchPhase, ViewerKey};
pub use error::{ViewerError, ViewerResult};
pub use panorama::{DragSession, RenderLoopState, SourceImage, ViewLimits, ViewState};
pub use projector::{project, FrameGeometry, OutputFrame};
pub use render_loop::RenderLoop;
pub use viewer::{PanoramaViewer, ViewerPhase};
