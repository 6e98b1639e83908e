//! Frame preprocessing: channel order, road-band crop, resize and normalization.

use crate::types::{ChannelOrder, DatasetResult, ImageShape, SteerDatasetError};
use image::imageops::FilterType;
use image::RgbImage;

/// Horizontal band of the raw camera frame that shows the road.
///
/// Rows above `top` are sky and scenery, rows below `bottom` are the hood.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBand {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl Default for CropBand {
    fn default() -> Self {
        Self {
            top: 80,
            bottom: 140,
            left: 0,
            right: 320,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FramePipeline {
    pub crop: CropBand,
    pub target: ImageShape,
    pub source_order: ChannelOrder,
    pub filter: FilterType,
}

impl Default for FramePipeline {
    fn default() -> Self {
        Self {
            crop: CropBand::default(),
            target: ImageShape::default(),
            source_order: ChannelOrder::Rgb,
            filter: FilterType::Triangle,
        }
    }
}

impl FramePipeline {
    pub fn builder() -> FramePipelineBuilder {
        FramePipelineBuilder::new()
    }

    pub fn describe(&self) -> String {
        format!(
            "crop=rows[{}..{}] cols[{}..{}] target={} source_order={:?} filter={:?}",
            self.crop.top,
            self.crop.bottom,
            self.crop.left,
            self.crop.right,
            self.target,
            self.source_order,
            self.filter,
        )
    }

    /// Run one decoded frame through the pipeline.
    ///
    /// Returns `target.elements()` values in CHW order, each in `[-0.5, 0.5]`.
    pub fn apply(&self, img: RgbImage, reference: &str) -> DatasetResult<Vec<f32>> {
        let img = to_rgb(img, self.source_order);
        let band = crop_band(&img, self.crop, reference)?;
        let resized = image::imageops::resize(
            &band,
            self.target.width as u32,
            self.target.height as u32,
            self.filter,
        );
        Ok(normalize_chw(&resized))
    }
}

pub struct FramePipelineBuilder {
    inner: FramePipeline,
}

impl Default for FramePipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FramePipelineBuilder {
    pub fn new() -> Self {
        Self {
            inner: FramePipeline::default(),
        }
    }
    pub fn crop(mut self, crop: CropBand) -> Self {
        self.inner.crop = crop;
        self
    }
    pub fn target(mut self, target: ImageShape) -> Self {
        self.inner.target = target;
        self
    }
    pub fn source_order(mut self, order: ChannelOrder) -> Self {
        self.inner.source_order = order;
        self
    }
    pub fn filter(mut self, filter: FilterType) -> Self {
        self.inner.filter = filter;
        self
    }
    pub fn build(self) -> FramePipeline {
        self.inner
    }
}

/// Exchange the first and third channel of every pixel.
pub fn swap_red_blue(img: &mut RgbImage) {
    for pixel in img.pixels_mut() {
        pixel.0.swap(0, 2);
    }
}

/// Bring a frame decoded in `source` order into RGB order.
pub fn to_rgb(mut img: RgbImage, source: ChannelOrder) -> RgbImage {
    if source == ChannelOrder::Bgr {
        swap_red_blue(&mut img);
    }
    img
}

/// Cut the road band out of a frame, clamping the band to the frame bounds.
pub fn crop_band(img: &RgbImage, band: CropBand, reference: &str) -> DatasetResult<RgbImage> {
    let (width, height) = img.dimensions();
    let bottom = band.bottom.min(height);
    let right = band.right.min(width);
    if band.top >= bottom || band.left >= right {
        return Err(SteerDatasetError::CropOutOfBounds {
            reference: reference.to_string(),
            top: band.top,
            bottom: band.bottom,
            width,
            height,
        });
    }
    let cropped = image::imageops::crop_imm(
        img,
        band.left,
        band.top,
        right - band.left,
        bottom - band.top,
    );
    Ok(cropped.to_image())
}

/// Scale `[0, 255]` to `[-0.5, 0.5]` and lay the channels out planar.
pub fn normalize_chw(img: &RgbImage) -> Vec<f32> {
    let (width, height) = img.dimensions();
    let plane = (width * height) as usize;
    let mut out = vec![0.0f32; plane * 3];
    for (x, y, pixel) in img.enumerate_pixels() {
        let base = (y * width + x) as usize;
        for c in 0..3 {
            out[c * plane + base] = pixel[c] as f32 / 255.0 - 0.5;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    #[test]
    fn double_swap_restores_channel_order() {
        let original = gradient(4, 3);
        let mut img = original.clone();
        swap_red_blue(&mut img);
        assert_eq!(img.get_pixel(1, 2).0, [3, 2, 1]);
        swap_red_blue(&mut img);
        assert_eq!(img, original);
    }

    #[test]
    fn rgb_source_is_left_alone() {
        let original = gradient(4, 3);
        assert_eq!(to_rgb(original.clone(), ChannelOrder::Rgb), original);
        let bgr = to_rgb(original.clone(), ChannelOrder::Bgr);
        assert_eq!(bgr.get_pixel(2, 1).0, [3, 1, 2]);
    }

    #[test]
    fn crop_keeps_road_band() {
        let img = gradient(320, 160);
        let band = crop_band(&img, CropBand::default(), "frame").unwrap();
        assert_eq!(band.dimensions(), (320, 60));
        assert_eq!(band.get_pixel(0, 0)[1], 80);
        assert_eq!(band.get_pixel(0, 59)[1], 139);
    }

    #[test]
    fn crop_clamps_to_narrow_frames() {
        let img = gradient(200, 120);
        let band = crop_band(&img, CropBand::default(), "frame").unwrap();
        assert_eq!(band.dimensions(), (200, 40));
    }

    #[test]
    fn crop_rejects_frames_shorter_than_band_top() {
        let img = gradient(320, 64);
        let err = crop_band(&img, CropBand::default(), "short.jpg").unwrap_err();
        assert!(matches!(err, SteerDatasetError::CropOutOfBounds { height: 64, .. }));
    }

    #[test]
    fn normalization_spans_half_unit() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([0, 0, 0]));
        img.put_pixel(1, 0, Rgb([255, 255, 255]));
        let chw = normalize_chw(&img);
        assert_eq!(chw.len(), 6);
        assert_eq!(chw[0], -0.5);
        assert_eq!(chw[1], 0.5);
    }

    #[test]
    fn normalization_is_channel_first() {
        let img = RgbImage::from_pixel(2, 2, Rgb([255, 0, 51]));
        let chw = normalize_chw(&img);
        assert!(chw[..4].iter().all(|v| *v == 0.5));
        assert!(chw[4..8].iter().all(|v| *v == -0.5));
        assert!(chw[8..].iter().all(|v| (*v - (0.2 - 0.5)).abs() < 1e-6));
    }

    #[test]
    fn full_frame_becomes_target_shape() {
        let pipeline = FramePipeline::builder()
            .target(ImageShape::new(128, 128, 3))
            .build();
        let out = pipeline.apply(gradient(320, 160), "frame").unwrap();
        assert_eq!(out.len(), 128 * 128 * 3);
        assert!(out.iter().all(|v| (-0.5..=0.5).contains(v)));
    }

    #[test]
    fn non_square_target_uses_height_and_width() {
        let pipeline = FramePipeline::builder()
            .target(ImageShape::new(32, 64, 3))
            .build();
        let out = pipeline.apply(gradient(320, 160), "frame").unwrap();
        assert_eq!(out.len(), 32 * 64 * 3);
    }
}
