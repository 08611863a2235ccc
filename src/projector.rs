// projector.rs — 等矩形全景 → 透视画面 (逐像素光线投射 + 双线性采样)
//
// 每个输出像素独立计算，按行并行；结果与串行逐像素计算逐字节一致。

use crate::error::{ViewerError, ViewerResult};
use crate::panorama::{SourceImage, ViewState};
use glam::{DMat3, DVec3};
use image::RgbaImage;
use rayon::prelude::*;
use std::f64::consts::PI;

/// Per-frame constants derived from the view and the output size.
#[derive(Debug, Clone, Copy)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
    pub half_fov_x: f64,
    pub half_fov_y: f64,
    rotation: DMat3,
}

impl FrameGeometry {
    pub fn new(view: &ViewState, width: u32, height: u32) -> ViewerResult<Self> {
        if width == 0 || height == 0 {
            return Err(ViewerError::DegenerateSurface { width, height });
        }

        let aspect = width as f64 / height as f64;
        let half_fov_y = view.fov.to_radians() / 2.0;
        // 按真实宽高比推导水平半视角，而不是把两个轴等比缩放
        let half_fov_x = (half_fov_y.tan() * aspect).atan();

        let lon = view.longitude.rem_euclid(360.0).to_radians();
        let lat = view.latitude.to_radians();
        // 先俯仰后偏航
        let rotation = DMat3::from_rotation_y(-lon) * DMat3::from_rotation_x(lat);

        Ok(Self {
            width,
            height,
            half_fov_x,
            half_fov_y,
            rotation,
        })
    }

    /// World-space unit ray through the pixel at `(x, y)`.
    pub fn ray(&self, x: u32, y: u32) -> DVec3 {
        let nx = (x as f64 / self.width as f64 - 0.5) * 2.0;
        let ny = (0.5 - y as f64 / self.height as f64) * 2.0;

        let angle_x = nx * self.half_fov_x;
        let angle_y = ny * self.half_fov_y;

        let cos_y = angle_y.cos();
        let camera = DVec3::new(angle_x.sin() * cos_y, angle_y.sin(), angle_x.cos() * cos_y);
        self.rotation * camera
    }

    /// Longitude/latitude (radians) of the panorama point seen through `(x, y)`.
    pub fn source_angles(&self, x: u32, y: u32) -> (f64, f64) {
        let d = self.ray(x, y);
        (d.x.atan2(d.z), d.y.clamp(-1.0, 1.0).asin())
    }
}

/// A full frame of RGBA8 output, always fully written.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFrame {
    image: RgbaImage,
}

impl OutputFrame {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.image.get_pixel(x, y).0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

fn check_source(source: &SourceImage) -> ViewerResult<()> {
    let expected = source.width() as usize * source.height() as usize * 4;
    if source.width() < 2 || source.height() < 1 || source.samples().len() < expected {
        return Err(ViewerError::ImageNotReady {
            width: source.width(),
            height: source.height(),
        });
    }
    Ok(())
}

/// Renders the perspective view of `source` seen with `view` into a fresh
/// `width` x `height` frame.
pub fn project(
    source: &SourceImage,
    view: &ViewState,
    width: u32,
    height: u32,
) -> ViewerResult<OutputFrame> {
    check_source(source)?;
    let geometry = FrameGeometry::new(view, width, height)?;

    let mut image = RgbaImage::new(width, height);
    let row_bytes = width as usize * 4;

    image
        .par_chunks_mut(row_bytes)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, out) in row.chunks_exact_mut(4).enumerate() {
                let (lon, lat) = geometry.source_angles(x as u32, y as u32);
                let rgb = sample_bilinear(source, lon, lat);
                out[..3].copy_from_slice(&rgb);
                out[3] = 255;
            }
        });

    Ok(OutputFrame { image })
}

/// Maps panorama angles (radians) to fractional source pixel coordinates.
pub fn source_position(source: &SourceImage, lon: f64, lat: f64) -> (f64, f64) {
    let src_x = ((lon / PI + 1.0) / 2.0) * source.width() as f64;
    let src_y = (0.5 - lat / PI) * source.height() as f64;
    (src_x, src_y)
}

/// Bilinear RGB sample. Wraps horizontally, clamps vertically.
pub fn sample_bilinear(source: &SourceImage, lon: f64, lat: f64) -> [u8; 3] {
    let w = source.width() as i64;
    let h = source.height() as i64;
    let (src_x, src_y) = source_position(source, lon, lat);

    let floor_x = src_x.floor();
    let floor_y = src_y.floor();
    let fx = src_x - floor_x;
    let fy = src_y - floor_y;

    let x0 = (floor_x as i64).rem_euclid(w);
    let x1 = (x0 + 1) % w;
    let y0 = (floor_y as i64).clamp(0, h - 1);
    let y1 = (y0 + 1).min(h - 1);

    let data = source.samples();
    let idx = |x: i64, y: i64| ((y * w + x) * 4) as usize;
    let (i00, i10, i01, i11) = (idx(x0, y0), idx(x1, y0), idx(x0, y1), idx(x1, y1));

    let mut rgb = [0u8; 3];
    for (c, value) in rgb.iter_mut().enumerate() {
        let v = data[i00 + c] as f64 * (1.0 - fx) * (1.0 - fy)
            + data[i10 + c] as f64 * fx * (1.0 - fy)
            + data[i01 + c] as f64 * (1.0 - fx) * fy
            + data[i11 + c] as f64 * fx * fy;
        *value = v.round().clamp(0.0, 255.0) as u8;
    }
    rgb
}
