// fonts.rs — 可选 UI 字体
//
// egui 自带字体只覆盖拉丁字母；切换到其他语言时，在这些位置找一个能被
// ab_glyph 解析的字体 (.ttc 不稳定，优先 .ttf/.otf)：
// - <exe_dir>/assets/fonts, ./assets/fonts
// - 常见系统字体

use std::path::PathBuf;

const ASSET_FONTS: &[&str] = &[
    "ui.ttf",
    "ui.otf",
    "NotoSans-Regular.ttf",
    "NotoSansSC-Regular.otf",
    "NotoSansJP-Regular.otf",
    "NotoSansKR-Regular.otf",
    "NotoSansArabic-Regular.ttf",
];

fn candidates() -> Vec<PathBuf> {
    let mut out = Vec::new();
    let assets = PathBuf::from("assets").join("fonts");

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            out.extend(ASSET_FONTS.iter().map(|f| dir.join(&assets).join(f)));
        }
    }
    out.extend(ASSET_FONTS.iter().map(|f| assets.join(f)));

    if cfg!(windows) {
        let win = PathBuf::from(r"C:\Windows\Fonts");
        out.extend(["msyh.ttf", "malgun.ttf", "segoeui.ttf"].map(|f| win.join(f)));
    } else if cfg!(target_os = "macos") {
        out.push(PathBuf::from("/System/Library/Fonts/Supplemental/Arial Unicode.ttf"));
    } else if cfg!(unix) {
        out.push(PathBuf::from("/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc"));
        out.push(PathBuf::from("/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf"));
    }
    out
}

fn load_valid(path: &PathBuf) -> Option<Vec<u8>> {
    let bytes = std::fs::read(path).ok()?;
    ab_glyph::FontArc::try_from_vec(bytes.clone()).ok()?;
    Some(bytes)
}

/// Installs the first usable font as the primary UI face. English needs none.
pub fn setup_ui_fonts(ctx: &egui::Context, lang: &str) {
    if lang == "en" {
        return;
    }

    let Some((path, bytes)) = candidates()
        .into_iter()
        .find_map(|p| load_valid(&p).map(|b| (p, b)))
    else {
        log::warn!("no UI font found for '{}', using egui defaults", lang);
        return;
    };
    log::info!("UI font: {}", path.display());

    let mut fonts = egui::FontDefinitions::default();
    fonts
        .font_data
        .insert("ui".to_owned(), egui::FontData::from_owned(bytes));
    for family in [egui::FontFamily::Proportional, egui::FontFamily::Monospace] {
        if let Some(list) = fonts.families.get_mut(&family) {
            list.insert(0, "ui".to_owned());
        }
    }
    ctx.set_fonts(fonts);
}
