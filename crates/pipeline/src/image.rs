use crate::error::PipelineError;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer, images::Image};

/// How a source image is scaled before the center crop.
///
/// Classification models resize so the shorter side hits a fixed length and
/// crop out the middle; pose models scale up until the frame covers the
/// target and crop to it exactly. Which one applies is part of the model
/// configuration, not a property of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalePolicy {
    /// Aspect-preserving resize so the shorter side equals `min_side`.
    ShorterSide { min_side: u32 },
    /// Scale by `max(target_w / w, target_h / h)` so the image covers the
    /// target rectangle.
    Cover,
}

/// An owned, immutable RGB pixel buffer (3 bytes per pixel, row-major).
#[derive(Debug, Clone)]
pub struct RgbImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RgbImage {
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, PipelineError> {
        if width == 0 || height == 0 {
            return Err(PipelineError::InvalidGeometry(format!(
                "zero-sized image ({width}x{height})"
            )));
        }

        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(PipelineError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Resize so the shorter side equals `min_side`; the longer side scales
    /// proportionally, rounded to the nearest pixel.
    pub fn resize_to_min_side(&self, min_side: u32) -> Result<RgbImage, PipelineError> {
        if min_side == 0 {
            return Err(PipelineError::InvalidGeometry(
                "target min side must be positive".to_string(),
            ));
        }

        let ratio = min_side as f64 / self.width.min(self.height) as f64;
        let (new_width, new_height) = if self.width > self.height {
            ((self.width as f64 * ratio).round() as u32, min_side)
        } else {
            (min_side, (self.height as f64 * ratio).round() as u32)
        };

        self.resize_exact(new_width, new_height)
    }

    /// Scale up (or down) until the image covers `target_w x target_h`.
    ///
    /// Rounded dimensions are clamped to at least the target so a subsequent
    /// center crop of the target size always fits.
    pub fn resize_to_cover(&self, target_w: u32, target_h: u32) -> Result<RgbImage, PipelineError> {
        if target_w == 0 || target_h == 0 {
            return Err(PipelineError::InvalidGeometry(
                "cover target must be positive".to_string(),
            ));
        }

        let factor = (target_w as f64 / self.width as f64).max(target_h as f64 / self.height as f64);
        let new_width = ((self.width as f64 * factor).round() as u32).max(target_w);
        let new_height = ((self.height as f64 * factor).round() as u32).max(target_h);

        self.resize_exact(new_width, new_height)
    }

    /// Extract a `crop_w x crop_h` window centered in the image.
    ///
    /// The crop origin is `((width - crop_w) / 2, (height - crop_h) / 2)`
    /// with integer floor division.
    pub fn center_crop(&self, crop_w: u32, crop_h: u32) -> Result<RgbImage, PipelineError> {
        if crop_w == 0 || crop_h == 0 {
            return Err(PipelineError::InvalidGeometry(
                "crop dimensions must be positive".to_string(),
            ));
        }
        if crop_w > self.width || crop_h > self.height {
            return Err(PipelineError::InvalidGeometry(format!(
                "crop {crop_w}x{crop_h} exceeds source {}x{}",
                self.width, self.height
            )));
        }

        let start_x = ((self.width - crop_w) / 2) as usize;
        let start_y = ((self.height - crop_h) / 2) as usize;
        let src_stride = self.width as usize * 3;
        let row_bytes = crop_w as usize * 3;

        let mut data = Vec::with_capacity(row_bytes * crop_h as usize);
        for y in 0..crop_h as usize {
            let row = (start_y + y) * src_stride + start_x * 3;
            data.extend_from_slice(&self.data[row..row + row_bytes]);
        }

        RgbImage::from_raw(crop_w, crop_h, data)
    }

    /// Scale per `policy`, then center-crop to exactly `target_w x target_h`.
    pub fn fit_to(
        &self,
        policy: ScalePolicy,
        target_w: u32,
        target_h: u32,
    ) -> Result<RgbImage, PipelineError> {
        let scaled = match policy {
            ScalePolicy::ShorterSide { min_side } => self.resize_to_min_side(min_side)?,
            ScalePolicy::Cover => self.resize_to_cover(target_w, target_h)?,
        };

        tracing::trace!(
            scaled_width = scaled.width,
            scaled_height = scaled.height,
            target_w,
            target_h,
            "Scaled image before center crop"
        );

        scaled.center_crop(target_w, target_h)
    }

    fn resize_exact(&self, new_width: u32, new_height: u32) -> Result<RgbImage, PipelineError> {
        let mut src_buffer = self.data.clone();
        let src = Image::from_slice_u8(self.width, self.height, &mut src_buffer, PixelType::U8x3)
            .map_err(|e| PipelineError::Resize(e.to_string()))?;

        let mut resized = Image::new(new_width, new_height, PixelType::U8x3);

        Resizer::new()
            .resize(
                &src,
                &mut resized,
                &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
            )
            .map_err(|e| PipelineError::Resize(e.to_string()))?;

        RgbImage::from_raw(new_width, new_height, resized.buffer().to_vec())
    }
}
