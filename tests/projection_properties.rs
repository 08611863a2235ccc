// Projection properties: determinism, wraparound, center sampling, aspect handling.

use image::{Rgba, RgbaImage};
use travellens_vr::{project, FrameGeometry, SourceImage, ViewState};

fn view(longitude: f64, latitude: f64, fov: f64) -> ViewState {
    ViewState {
        longitude,
        latitude,
        fov,
    }
}

/// Smooth but non-symmetric test panorama.
fn test_panorama() -> SourceImage {
    SourceImage::new(RgbaImage::from_fn(256, 128, |x, y| {
        Rgba([
            x as u8,
            (y * 2) as u8,
            ((x * 3 + y * 5) % 256) as u8,
            255,
        ])
    }))
}

#[test]
fn identical_inputs_give_identical_frames() {
    let src = test_panorama();
    let v = view(47.3, -12.8, 82.0);
    let a = project(&src, &v, 96, 64).unwrap();
    let b = project(&src, &v, 96, 64).unwrap();
    assert_eq!(a.as_bytes(), b.as_bytes());
}

#[test]
fn full_turn_of_longitude_is_the_same_view() {
    let src = test_panorama();
    for lon in [0.0, 37.0, -90.0, 180.0, 359.0] {
        let a = project(&src, &view(lon, 10.0, 75.0), 64, 48).unwrap();
        let b = project(&src, &view(lon + 360.0, 10.0, 75.0), 64, 48).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes(), "lon {lon}");
    }
}

#[test]
fn fractional_longitude_wraps_within_tolerance() {
    let src = test_panorama();
    let a = project(&src, &view(123.4, -20.0, 60.0), 48, 32).unwrap();
    let b = project(&src, &view(123.4 + 720.0, -20.0, 60.0), 48, 32).unwrap();
    let max_diff = a
        .as_bytes()
        .iter()
        .zip(b.as_bytes())
        .map(|(x, y)| (*x as i16 - *y as i16).abs())
        .max()
        .unwrap();
    assert!(max_diff <= 1, "max channel difference {max_diff}");
}

#[test]
fn center_pixel_samples_panorama_center() {
    let mut img = RgbaImage::from_pixel(200, 100, Rgba([0, 0, 255, 255]));
    for x in 98..=102 {
        for y in 48..=52 {
            img.put_pixel(x, y, Rgba([255, 0, 0, 255]));
        }
    }
    let src = SourceImage::new(img);

    let frame = project(&src, &view(0.0, 0.0, 90.0), 64, 48).unwrap();
    assert_eq!(frame.pixel(32, 24), [255, 0, 0, 255]);
    assert_eq!(frame.pixel(0, 0), [0, 0, 255, 255]);
}

#[test]
fn extreme_latitude_and_fov_stay_finite() {
    let src = test_panorama();
    for (lat, fov) in [(85.0, 120.0), (-85.0, 120.0), (85.0, 30.0)] {
        let frame = project(&src, &view(10.0, lat, fov), 40, 30).unwrap();
        assert!(frame.as_bytes().chunks_exact(4).all(|p| p[3] == 255));
    }
}

#[test]
fn widening_surface_widens_horizontal_field_only() {
    let v = view(0.0, 0.0, 75.0);
    let narrow = FrameGeometry::new(&v, 800, 600).unwrap();
    let wide = FrameGeometry::new(&v, 1600, 600).unwrap();

    assert!((narrow.half_fov_y - wide.half_fov_y).abs() < 1e-12);
    assert!(wide.half_fov_x > narrow.half_fov_x);

    let (narrow_left, _) = narrow.source_angles(0, 300);
    let (narrow_right, _) = narrow.source_angles(799, 300);
    let (wide_left, _) = wide.source_angles(0, 300);
    let (wide_right, _) = wide.source_angles(1599, 300);

    assert!(wide_left < narrow_left);
    assert!(wide_right > narrow_right);
    // 左边缘正好是 -halfFovX
    assert!((narrow_left + narrow.half_fov_x).abs() < 1e-9);
    assert!((wide_left + wide.half_fov_x).abs() < 1e-9);
}
