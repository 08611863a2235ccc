// i18n.rs — UI strings
//
// - Built-in English table, always available
// - Optional overrides: assets/i18n/<lang>.json ({ "key": "value" }),
//   searched next to the executable, then in the working directory
// - Lookup: tr("key") / tr_with("key", &[("name", ...)]) with {name} placeholders
// - Language: --lang <code> or TRAVELLENS_VR_LANG (see config.rs)

use once_cell::sync::{Lazy, OnceCell};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::RwLock,
};

static BUILTIN: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("app.title", "TravelLens 360°"),
        ("viewer.hint", "Drag to explore • Scroll to zoom"),
        ("viewer.loading", "Loading 360° Experience..."),
        ("viewer.failed", "Failed to load panorama"),
        ("viewer.empty", "No panorama open. Press O or drop an image here."),
        ("viewer.open", "Open panorama…"),
        ("viewer.close", "Close"),
        ("viewer.auto_rotate", "Auto Rotate"),
        ("viewer.zoom_in", "Zoom in"),
        ("viewer.zoom_out", "Zoom out"),
        ("viewer.zoom_label", "{pct}% FOV"),
        ("viewer.fullscreen.enter", "Fullscreen"),
        ("viewer.fullscreen.exit", "Exit fullscreen"),
        ("viewer.compass", "Lon: {lon}° • Lat: {lat}°"),
        ("viewer.fps", "FPS: {fps}"),
        ("viewer.watermark", "TravelLens 360°"),
        ("file.filter.images", "Images"),
    ])
});

#[derive(Debug, Clone, Default)]
struct Overrides {
    lang: String,
    map: HashMap<String, String>,
}

static OVERRIDES: OnceCell<RwLock<Overrides>> = OnceCell::new();

fn candidate_paths(lang: &str) -> Vec<PathBuf> {
    let rel = Path::new("assets").join("i18n").join(format!("{}.json", lang));
    let mut out = Vec::new();
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            out.push(dir.join(&rel));
        }
    }
    out.push(rel);
    out
}

fn load_overrides(lang: &str) -> HashMap<String, String> {
    for path in candidate_paths(lang) {
        let Ok(text) = std::fs::read_to_string(&path) else {
            continue;
        };
        match serde_json::from_str::<HashMap<String, String>>(&text) {
            Ok(map) => {
                log::info!("ui strings for '{}' from {}", lang, path.display());
                return map;
            }
            Err(e) => log::warn!("ignoring {}: {}", path.display(), e),
        }
    }
    HashMap::new()
}

/// Selects the UI language. Safe to call again to switch.
pub fn init(lang: impl Into<String>) {
    let lang = lang.into();
    let map = if lang == "en" {
        HashMap::new()
    } else {
        load_overrides(&lang)
    };
    let next = Overrides { lang, map };

    match OVERRIDES.get() {
        Some(lock) => {
            if let Ok(mut w) = lock.write() {
                *w = next;
            }
        }
        None => {
            let _ = OVERRIDES.set(RwLock::new(next));
        }
    }
}

pub fn current_lang() -> String {
    OVERRIDES
        .get()
        .and_then(|l| l.read().ok().map(|o| o.lang.clone()))
        .unwrap_or_else(|| "en".to_string())
}

/// Localized text; falls back to English, then to the key itself.
pub fn tr(key: &str) -> String {
    if let Some(v) = OVERRIDES
        .get()
        .and_then(|l| l.read().ok().and_then(|o| o.map.get(key).cloned()))
    {
        return v;
    }
    BUILTIN
        .get(key)
        .map(|s| s.to_string())
        .unwrap_or_else(|| key.to_string())
}

/// Like [`tr`], substituting `{name}` placeholders. Unknown placeholders stay.
pub fn tr_with(key: &str, args: &[(&str, String)]) -> String {
    let mut s = tr(key);
    for (k, v) in args {
        s = s.replace(&format!("{{{}}}", k), v);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_strings_and_placeholders() {
        assert_eq!(tr("viewer.loading"), "Loading 360° Experience...");
        assert_eq!(
            tr_with("viewer.compass", &[("lon", "90".into()), ("lat", "-5".into())]),
            "Lon: 90° • Lat: -5°"
        );
    }

    #[test]
    fn unknown_key_echoes() {
        assert_eq!(tr("no.such.key"), "no.such.key");
        assert_eq!(tr_with("viewer.zoom_label", &[]), "{pct}% FOV");
    }
}
