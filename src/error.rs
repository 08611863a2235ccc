// error.rs — 查看器错误类型

use std::path::PathBuf;

/// Errors surfaced by the panorama core.
///
/// None of these are fatal to the host: load failures become a "failed" phase,
/// geometry errors make the projector refuse to run for that tick.
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("failed to load panorama '{url}': {reason}")]
    ImageLoad { url: String, reason: String },

    #[error("panorama not ready for projection ({width}x{height})")]
    ImageNotReady { width: u32, height: u32 },

    #[error("output surface has no area ({width}x{height})")]
    DegenerateSurface { width: u32, height: u32 },

    #[error("invalid config {path:?}: {reason}")]
    Config { path: PathBuf, reason: String },
}

impl ViewerError {
    pub fn image_load(url: &str, reason: impl std::fmt::Display) -> Self {
        ViewerError::ImageLoad {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type ViewerResult<T> = Result<T, ViewerError>;
