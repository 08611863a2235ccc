// Controller behaviour driven the way the host drives it.

use travellens_vr::{InteractionController, TouchPhase, ViewState, ViewerConfig};

fn controller() -> InteractionController {
    InteractionController::new(&ViewerConfig::default())
}

#[test]
fn drag_out_and_back_restores_view_exactly() {
    let mut c = controller();
    c.pointer_down(10.0, 10.0);
    let before = *c.view();

    c.pointer_move(10.0 + 137.0, 10.0 - 42.0);
    assert_ne!(*c.view(), before);
    c.pointer_move(10.0, 10.0);
    assert_eq!(*c.view(), before);
}

#[test]
fn drag_back_from_clamped_latitude_has_no_drift() {
    let mut c = controller();
    c.pointer_down(0.0, 0.0);
    // 远超上限，途中被夹住
    for y in [100.0, 500.0, 2000.0, 500.0] {
        c.pointer_move(0.0, y);
    }
    c.pointer_move(0.0, 0.0);
    assert_eq!(c.view().latitude, 0.0);
}

#[test]
fn latitude_never_leaves_clamp() {
    let mut c = controller();
    c.pointer_down(0.0, 0.0);
    // start 0 + 1000px * 0.2 = 200°
    c.pointer_move(0.0, 1000.0);
    assert_eq!(c.view().latitude, 85.0);
    assert!(!c.view().latitude.is_nan());
}

#[test]
fn fov_saturates_both_ways() {
    let mut c = controller();
    for _ in 0..100 {
        c.zoom_in();
    }
    assert_eq!(c.view().fov, 30.0);
    for _ in 0..100 {
        c.wheel(500.0);
    }
    assert_eq!(c.view().fov, 120.0);
}

#[test]
fn drag_cancels_auto_rotate_until_toggled() {
    let mut c = controller();
    assert!(c.state().is_auto_rotating);

    c.pointer_down(0.0, 0.0);
    c.pointer_move(3.0, 0.0);
    assert!(!c.state().is_auto_rotating);
    c.pointer_up();
    assert!(!c.state().is_auto_rotating);

    let parked = c.view().longitude;
    for _ in 0..10 {
        assert!(!c.auto_rotate_step());
    }
    assert_eq!(c.view().longitude, parked);

    c.toggle_auto_rotate();
    let lon = c.view().longitude;
    c.auto_rotate_step();
    assert!(c.view().longitude > lon);
}

#[test]
fn touch_drag_matches_mouse_drag() {
    let mut mouse = controller();
    let mut touch = controller();

    mouse.pointer_down(50.0, 50.0);
    mouse.pointer_move(80.0, 20.0);
    mouse.pointer_up();

    touch.touch_start(50.0, 50.0);
    touch.touch_move(80.0, 20.0);
    touch.touch_end();

    assert_eq!(mouse.view(), touch.view());
    assert_eq!(mouse.state(), touch.state());
}

#[test]
fn configured_tuning_is_used() {
    let cfg = ViewerConfig {
        drag_sensitivity: 0.5,
        zoom_step: 5.0,
        ..Default::default()
    };
    let mut c = InteractionController::new(&cfg);
    c.pointer_down(0.0, 0.0);
    c.pointer_move(10.0, 0.0);
    assert_eq!(c.view().longitude, -5.0);
    c.zoom_in();
    assert_eq!(c.view().fov, 70.0);
    assert_ne!(*c.view(), ViewState::default());
}

#[test]
fn two_finger_pinch_zooms_within_limits() {
    let mut c = controller();
    c.touch(7, TouchPhase::Started, 100.0, 300.0);
    c.touch(9, TouchPhase::Started, 100.0, 400.0);

    // 手指分开 → 拉近，直到下限
    for step in 1..=40 {
        c.touch(9, TouchPhase::Moved, 100.0, 400.0 + step as f64 * 50.0);
    }
    assert_eq!(c.view().fov, 30.0);

    // 合拢 → 拉远，直到上限
    for step in 1..=20 {
        c.touch(7, TouchPhase::Moved, 100.0, 300.0 + step as f64 * 100.0);
    }
    assert_eq!(c.view().fov, 120.0);
    assert_eq!(c.view().longitude, 0.0);
    assert_eq!(c.view().latitude, 0.0);

    c.touch(7, TouchPhase::Ended, 0.0, 0.0);
    c.touch(9, TouchPhase::Ended, 0.0, 0.0);
    assert!(!c.is_pinching());
    assert!(!c.state().is_dragging);
}
