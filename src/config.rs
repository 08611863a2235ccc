// config.rs — 可调参数与启动选项
//
// Sources, later wins:
// - built-in defaults
// - JSON file: --config <path> or env TRAVELLENS_VR_CONFIG
// - CLI: --title <text>, --lang <code>, first positional arg = panorama path/URL

use crate::error::{ViewerError, ViewerResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "TRAVELLENS_VR_CONFIG";
pub const LANG_ENV: &str = "TRAVELLENS_VR_LANG";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Degrees of longitude added per tick while idle.
    pub auto_rotate_speed: f64,
    /// Degrees per screen pixel of drag.
    pub drag_sensitivity: f64,
    /// Degrees of fov per wheel delta unit.
    pub wheel_zoom_sensitivity: f64,
    /// Zoom in/out button step, degrees.
    pub zoom_step: f64,
    pub min_fov: f64,
    pub max_fov: f64,
    pub max_latitude: f64,
    pub default_longitude: f64,
    pub default_latitude: f64,
    pub default_fov: f64,
    pub auto_rotate_on_open: bool,
    /// Internal render resolution relative to the surface, (0, 1].
    pub render_scale: f64,
    pub adaptive_resolution: bool,
    pub frame_budget_ms: f64,
    pub min_render_scale: f64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            auto_rotate_speed: 0.15,
            drag_sensitivity: 0.2,
            wheel_zoom_sensitivity: 0.05,
            zoom_step: 10.0,
            min_fov: 30.0,
            max_fov: 120.0,
            max_latitude: 85.0,
            default_longitude: 0.0,
            default_latitude: 0.0,
            default_fov: 75.0,
            auto_rotate_on_open: true,
            render_scale: 1.0,
            adaptive_resolution: true,
            frame_budget_ms: 16.7,
            min_render_scale: 0.25,
        }
    }
}

impl ViewerConfig {
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        let cfg: ViewerConfig = serde_json::from_str(text)?;
        Ok(cfg.sanitized())
    }

    pub fn load(path: &Path) -> ViewerResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ViewerError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let cfg = Self::from_json_str(&text).map_err(|e| ViewerError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        log::info!("loaded viewer config from {}", path.display());
        Ok(cfg)
    }

    /// Repairs values that would break the clamps or the projection.
    /// Never fails: bad values fall back to defaults with a warning.
    pub fn sanitized(mut self) -> Self {
        let d = ViewerConfig::default();

        fn finite_or(v: &mut f64, fallback: f64, name: &str) {
            if !v.is_finite() {
                log::warn!("config: {} is not finite, using {}", name, fallback);
                *v = fallback;
            }
        }

        finite_or(&mut self.auto_rotate_speed, d.auto_rotate_speed, "auto_rotate_speed");
        finite_or(&mut self.drag_sensitivity, d.drag_sensitivity, "drag_sensitivity");
        finite_or(&mut self.wheel_zoom_sensitivity, d.wheel_zoom_sensitivity, "wheel_zoom_sensitivity");
        finite_or(&mut self.zoom_step, d.zoom_step, "zoom_step");
        finite_or(&mut self.min_fov, d.min_fov, "min_fov");
        finite_or(&mut self.max_fov, d.max_fov, "max_fov");
        finite_or(&mut self.max_latitude, d.max_latitude, "max_latitude");
        finite_or(&mut self.default_longitude, d.default_longitude, "default_longitude");
        finite_or(&mut self.default_latitude, d.default_latitude, "default_latitude");
        finite_or(&mut self.default_fov, d.default_fov, "default_fov");
        finite_or(&mut self.render_scale, d.render_scale, "render_scale");
        finite_or(&mut self.frame_budget_ms, d.frame_budget_ms, "frame_budget_ms");
        finite_or(&mut self.min_render_scale, d.min_render_scale, "min_render_scale");

        if self.min_fov > self.max_fov {
            log::warn!(
                "config: min_fov {} > max_fov {}, swapping",
                self.min_fov,
                self.max_fov
            );
            std::mem::swap(&mut self.min_fov, &mut self.max_fov);
        }
        // tan(fov/2) 在 180° 处发散
        self.min_fov = self.min_fov.clamp(1.0, 179.0);
        self.max_fov = self.max_fov.clamp(self.min_fov, 179.0);

        // asin 在 ±90° 退化
        self.max_latitude = self.max_latitude.abs().min(89.9);
        self.zoom_step = self.zoom_step.abs();

        self.default_fov = self.default_fov.clamp(self.min_fov, self.max_fov);
        self.default_latitude = self
            .default_latitude
            .clamp(-self.max_latitude, self.max_latitude);

        self.render_scale = self.render_scale.clamp(0.05, 1.0);
        self.min_render_scale = self.min_render_scale.clamp(0.05, self.render_scale);
        if self.frame_budget_ms <= 0.0 {
            self.frame_budget_ms = d.frame_budget_ms;
        }
        self.frame_budget_ms = self.frame_budget_ms.clamp(1.0, 1000.0);
        self
    }
}

/// Everything the host needs at startup.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub image: Option<String>,
    pub title: Option<String>,
    pub lang: String,
    pub config_path: Option<PathBuf>,
    pub config: ViewerConfig,
}

impl LaunchOptions {
    /// Parses CLI args (without the program name). Env vars are passed in
    /// so callers and tests decide where they come from.
    pub fn parse<I>(args: I, env_config: Option<String>, env_lang: Option<String>) -> ViewerResult<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut image = None;
        let mut title = None;
        let mut lang = None;
        let mut config_path = env_config
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        let mut it = args.into_iter();
        while let Some(a) = it.next() {
            match a.as_str() {
                "--config" => config_path = it.next().map(PathBuf::from),
                "--title" => title = it.next(),
                "--lang" => lang = it.next(),
                _ if a.starts_with("--") => log::warn!("ignoring unknown option {}", a),
                _ => {
                    if image.is_none() {
                        image = Some(a);
                    }
                }
            }
        }

        let config = match &config_path {
            Some(p) => ViewerConfig::load(p)?,
            None => ViewerConfig::default(),
        };

        let lang = lang
            .or(env_lang.filter(|v| !v.trim().is_empty()))
            .unwrap_or_else(|| "en".to_string());

        Ok(Self {
            image,
            title,
            lang,
            config_path,
            config,
        })
    }

    pub fn from_env() -> ViewerResult<Self> {
        Self::parse(
            std::env::args().skip(1),
            std::env::var(CONFIG_ENV).ok(),
            std::env::var(LANG_ENV).ok(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = ViewerConfig::from_json_str(r#"{ "drag_sensitivity": 0.5 }"#).unwrap();
        assert_eq!(cfg.drag_sensitivity, 0.5);
        assert_eq!(cfg.auto_rotate_speed, 0.15);
        assert_eq!(cfg.zoom_step, 10.0);
        assert_eq!(cfg.default_fov, 75.0);
    }

    #[test]
    fn swapped_fov_bounds_are_reordered() {
        let cfg = ViewerConfig::from_json_str(r#"{ "min_fov": 120, "max_fov": 30 }"#).unwrap();
        assert_eq!(cfg.min_fov, 30.0);
        assert_eq!(cfg.max_fov, 120.0);
    }

    #[test]
    fn latitude_bound_stays_below_pole() {
        let cfg = ViewerConfig {
            max_latitude: 120.0,
            ..Default::default()
        }
        .sanitized();
        assert!(cfg.max_latitude < 90.0);
    }

    #[test]
    fn default_fov_is_pulled_into_range() {
        let cfg = ViewerConfig {
            default_fov: 500.0,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(cfg.default_fov, 120.0);
    }

    #[test]
    fn huge_frame_budget_is_capped() {
        let cfg = ViewerConfig::from_json_str(r#"{ "frame_budget_ms": 1e300 }"#).unwrap();
        assert_eq!(cfg.frame_budget_ms, 1000.0);
        // 必须能构造出 Duration 而不 panic
        crate::render_loop::RenderLoop::new(&cfg);

        let cfg = ViewerConfig::from_json_str(r#"{ "frame_budget_ms": 0.001 }"#).unwrap();
        assert_eq!(cfg.frame_budget_ms, 1.0);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(ViewerConfig::from_json_str("{ not json").is_err());
    }

    #[test]
    fn cli_overrides_env_and_reads_positional_image() {
        let opts = LaunchOptions::parse(
            args(&["pano.jpg", "--title", "Kyoto", "--lang", "fr"]),
            None,
            Some("de".into()),
        )
        .unwrap();
        assert_eq!(opts.image.as_deref(), Some("pano.jpg"));
        assert_eq!(opts.title.as_deref(), Some("Kyoto"));
        assert_eq!(opts.lang, "fr");
        assert_eq!(opts.config, ViewerConfig::default());
    }

    #[test]
    fn env_lang_used_when_no_flag() {
        let opts = LaunchOptions::parse(Vec::<String>::new(), None, Some("ja".into())).unwrap();
        assert_eq!(opts.lang, "ja");
        assert!(opts.image.is_none());
    }

    #[test]
    fn config_file_from_flag() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "zoom_step": 5.0, "auto_rotate_on_open": false }}"#).unwrap();
        let path = file.path().to_string_lossy().to_string();

        let opts = LaunchOptions::parse(args(&["--config", &path]), None, None).unwrap();
        assert_eq!(opts.config.zoom_step, 5.0);
        assert!(!opts.config.auto_rotate_on_open);
    }

    #[test]
    fn missing_config_file_reports_path() {
        let err = LaunchOptions::parse(args(&["--config", "/nonexistent/vr.json"]), None, None)
            .unwrap_err();
        match err {
            ViewerError::Config { path, .. } => assert_eq!(path, PathBuf::from("/nonexistent/vr.json")),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
