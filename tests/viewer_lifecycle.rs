// Open/close lifecycle of the viewer against real files on disk.

use image::{Rgba, RgbaImage};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;
use travellens_vr::{project, PanoramaViewer, ViewState, ViewerConfig, ViewerPhase};

const LOAD_TIMEOUT: Duration = Duration::from_secs(10);

fn write_panorama(dir: &TempDir, name: &str, w: u32, h: u32) -> String {
    let path = dir.path().join(name);
    RgbaImage::from_fn(w, h, |x, y| Rgba([(x % 256) as u8, (y % 256) as u8, 40, 255]))
        .save(&path)
        .unwrap();
    path.to_string_lossy().to_string()
}

fn fixed_scale_config() -> ViewerConfig {
    ViewerConfig {
        adaptive_resolution: false,
        ..Default::default()
    }
}

#[test]
fn cold_open_loads_then_renders_default_view() {
    let dir = tempfile::tempdir().unwrap();
    let url = write_panorama(&dir, "valid.png", 128, 64);

    let mut viewer = PanoramaViewer::new(fixed_scale_config());
    viewer.resize(40, 30);
    viewer.open_viewer(&url, "Test");

    assert_eq!(*viewer.phase(), ViewerPhase::Loading);
    assert_eq!(viewer.title(), "Test");
    assert!(viewer.tick().is_none(), "no frames while loading");
    assert!(!viewer.render_loop().is_running());

    assert!(viewer.wait_for_load(LOAD_TIMEOUT));
    assert_eq!(*viewer.phase(), ViewerPhase::Ready);
    assert!(viewer.render_loop().is_running());
    assert!(viewer.controller().state().is_auto_rotating);

    let frame = viewer.tick().unwrap();
    let expected = project(
        viewer.source().unwrap(),
        &ViewState {
            longitude: 0.0,
            latitude: 0.0,
            fov: 75.0,
        },
        40,
        30,
    )
    .unwrap();
    assert_eq!(frame, expected);

    viewer.tick().unwrap();
    assert!((viewer.controller().view().longitude - 0.15).abs() < 1e-12);
}

#[test]
fn missing_image_fails_without_starting_loop() {
    let mut viewer = PanoramaViewer::new(ViewerConfig::default());
    viewer.resize(40, 30);
    viewer.open_viewer("/no/such/panorama.jpg", "Missing");

    assert!(viewer.wait_for_load(LOAD_TIMEOUT));
    assert!(matches!(viewer.phase(), ViewerPhase::Failed(_)));
    assert!(!viewer.render_loop().is_running());
    assert!(viewer.tick().is_none());
}

#[test]
fn decode_finishing_after_close_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let url = write_panorama(&dir, "late.png", 512, 256);

    let mut viewer = PanoramaViewer::new(ViewerConfig::default());
    viewer.resize(40, 30);
    viewer.open_viewer(&url, "Late");
    viewer.close_viewer();

    thread::sleep(Duration::from_millis(300));
    assert!(!viewer.poll_loader());
    assert_eq!(*viewer.phase(), ViewerPhase::Closed);
    assert!(!viewer.render_loop().is_running());
    assert!(viewer.source().is_none());
    assert!(viewer.tick().is_none());
}

#[test]
fn switching_panorama_discards_the_first() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_panorama(&dir, "first.png", 64, 32);
    let second = write_panorama(&dir, "second.png", 96, 48);

    let mut viewer = PanoramaViewer::new(ViewerConfig::default());
    viewer.resize(20, 20);
    viewer.open_viewer(&first, "First");
    viewer.open_viewer(&second, "Second");

    assert!(viewer.wait_for_load(LOAD_TIMEOUT));
    assert_eq!(viewer.source().unwrap().width(), 96);
    assert_eq!(viewer.title(), "Second");

    thread::sleep(Duration::from_millis(200));
    assert!(!viewer.poll_loader(), "first result must not replace the second");
    assert_eq!(viewer.source().unwrap().width(), 96);
}

#[test]
fn new_panorama_resets_view_and_loop_state() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_panorama(&dir, "a.png", 64, 32);
    let b = write_panorama(&dir, "b.png", 64, 32);

    let mut viewer = PanoramaViewer::new(ViewerConfig::default());
    viewer.resize(20, 20);
    viewer.open_viewer(&a, "A");
    assert!(viewer.wait_for_load(LOAD_TIMEOUT));

    let c = viewer.controller_mut();
    c.pointer_down(0.0, 0.0);
    c.pointer_move(100.0, 100.0);
    c.pointer_up();
    c.zoom_in();
    assert!(!viewer.controller().state().is_auto_rotating);

    viewer.open_viewer(&b, "B");
    assert_eq!(*viewer.controller().view(), ViewState::default());
    assert!(viewer.controller().state().is_auto_rotating);
    assert!(!viewer.render_loop().is_running(), "old loop stops before the new image loads");

    assert!(viewer.wait_for_load(LOAD_TIMEOUT));
    assert!(viewer.render_loop().is_running());
}

#[test]
fn reopening_same_panorama_keeps_session() {
    let dir = tempfile::tempdir().unwrap();
    let url = write_panorama(&dir, "same.png", 64, 32);

    let mut viewer = PanoramaViewer::new(ViewerConfig::default());
    viewer.resize(20, 20);
    viewer.open_viewer(&url, "One");
    assert!(viewer.wait_for_load(LOAD_TIMEOUT));
    viewer.controller_mut().zoom_in();

    viewer.open_viewer(&url, "Renamed");
    assert_eq!(*viewer.phase(), ViewerPhase::Ready);
    assert_eq!(viewer.title(), "Renamed");
    assert_eq!(viewer.controller().view().fov, 65.0);
}

#[test]
fn resize_mid_session_changes_frame_size() {
    let dir = tempfile::tempdir().unwrap();
    let url = write_panorama(&dir, "wide.png", 128, 64);

    let mut viewer = PanoramaViewer::new(fixed_scale_config());
    viewer.resize(80, 60);
    viewer.open_viewer(&url, "Wide");
    assert!(viewer.wait_for_load(LOAD_TIMEOUT));
    viewer.controller_mut().toggle_auto_rotate();

    let narrow = viewer.tick().unwrap();
    viewer.resize(160, 60);
    let wide = viewer.tick().unwrap();

    assert_eq!((narrow.width(), narrow.height()), (80, 60));
    assert_eq!((wide.width(), wide.height()), (160, 60));
    // 中心列看的是同一处
    assert_eq!(narrow.pixel(40, 30), wide.pixel(80, 30));
}
