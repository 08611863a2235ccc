// panorama.rs — 全景源图、视角参数与会话状态

use crate::config::ViewerConfig;
use image::RgbaImage;

/// Decoded equirectangular panorama. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pixels: RgbaImage,
}

impl SourceImage {
    pub fn new(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Raw RGBA8 samples, row-major.
    pub fn samples(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    /// Width / height, e.g. 2.0 for a conventional equirectangular image.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height() == 0 {
            return 0.0;
        }
        self.width() as f64 / self.height() as f64
    }

    pub fn is_equirectangular(&self) -> bool {
        (self.aspect_ratio() - 2.0).abs() <= 0.02
    }
}

impl From<RgbaImage> for SourceImage {
    fn from(pixels: RgbaImage) -> Self {
        Self::new(pixels)
    }
}

/// Saturating bounds for [`ViewState`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewLimits {
    pub min_fov: f64,
    pub max_fov: f64,
    pub max_latitude: f64,
}

impl Default for ViewLimits {
    fn default() -> Self {
        Self::from_config(&ViewerConfig::default())
    }
}

impl ViewLimits {
    pub fn from_config(cfg: &ViewerConfig) -> Self {
        Self {
            min_fov: cfg.min_fov,
            max_fov: cfg.max_fov,
            max_latitude: cfg.max_latitude,
        }
    }

    pub fn clamp_latitude(&self, lat: f64) -> f64 {
        lat.clamp(-self.max_latitude, self.max_latitude)
    }

    pub fn clamp_fov(&self, fov: f64) -> f64 {
        fov.clamp(self.min_fov, self.max_fov)
    }
}

/// Camera orientation in degrees. Longitude is unbounded and wraps mod 360
/// at projection time; latitude and fov are always inside their limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub longitude: f64,
    pub latitude: f64,
    pub fov: f64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::from_config(&ViewerConfig::default())
    }
}

impl ViewState {
    pub fn from_config(cfg: &ViewerConfig) -> Self {
        Self {
            longitude: cfg.default_longitude,
            latitude: cfg.default_latitude,
            fov: cfg.default_fov,
        }
    }

    /// Longitude folded into [0, 360) for display.
    pub fn compass_longitude(&self) -> f64 {
        let l = self.longitude.rem_euclid(360.0);
        // rem_euclid 对极小负数可能返回 360.0
        if l >= 360.0 {
            0.0
        } else {
            l
        }
    }

    /// Whole degrees for the compass readout (lon, lat). Halves round up,
    /// so 44.5 reads 45 and -0.5 reads 0; 359.5 and above wraps to 0.
    pub fn compass_degrees(&self) -> (i64, i64) {
        let round_half_up = |v: f64| (v + 0.5).floor() as i64;
        (
            round_half_up(self.compass_longitude()) % 360,
            round_half_up(self.latitude),
        )
    }
}

/// Pointer position and orientation captured at drag start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    pub start_x: f64,
    pub start_y: f64,
    pub start_longitude: f64,
    pub start_latitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderLoopState {
    pub is_auto_rotating: bool,
    pub is_dragging: bool,
    pub is_fullscreen: bool,
}

impl Default for RenderLoopState {
    fn default() -> Self {
        Self {
            is_auto_rotating: true,
            is_dragging: false,
            is_fullscreen: false,
        }
    }
}

impl RenderLoopState {
    pub fn from_config(cfg: &ViewerConfig) -> Self {
        Self {
            is_auto_rotating: cfg.auto_rotate_on_open,
            ..Default::default()
        }
    }
}
