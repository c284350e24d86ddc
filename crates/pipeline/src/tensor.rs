use crate::error::PipelineError;
use crate::image::RgbImage;

/// Per-channel statistics the float models were trained with (ImageNet).
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Memory ordering of the input tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorLayout {
    /// Channel-interleaved: pixel-major, channel-minor.
    Hwc,
    /// Channel-planar: channel-major, pixel-minor.
    Chw,
}

/// Element type of a model input or output buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Uint8,
    Float32,
}

impl ElementType {
    pub fn byte_size(&self) -> usize {
        match self {
            ElementType::Uint8 => 1,
            ElementType::Float32 => 4,
        }
    }
}

/// Quantization parameters for a uint8 model input.
#[derive(Debug, Clone, Copy)]
pub struct InputQuant {
    pub scale: f32,
    pub offset: f32,
}

impl Default for InputQuant {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: 0.0,
        }
    }
}

/// Convert an image into the raw byte buffer a model expects.
///
/// Pixels are visited in row-major order. For `Uint8` each channel maps
/// through `round((c - offset) / scale)` clamped to 0..=255; for `Float32`
/// each channel is normalized with the ImageNet statistics and written as a
/// native-endian f32. Element placement follows the layout: `Chw` puts
/// channel `ch` of pixel `i` at element `ch * total_pixels + i`, `Hwc` at
/// `i * 3 + ch`.
pub fn to_tensor(
    image: &RgbImage,
    layout: TensorLayout,
    element_type: ElementType,
    quant: InputQuant,
) -> Vec<u8> {
    let total_pixels = image.width() as usize * image.height() as usize;

    let (channel_offset, stride) = match layout {
        TensorLayout::Chw => ([0, total_pixels, 2 * total_pixels], 1),
        TensorLayout::Hwc => ([0, 1, 2], 3),
    };

    match element_type {
        ElementType::Uint8 => {
            let mut out = vec![0u8; total_pixels * 3];
            for (i, px) in image.data().chunks_exact(3).enumerate() {
                for ch in 0..3 {
                    let q = ((px[ch] as f32 - quant.offset) / quant.scale)
                        .round()
                        .clamp(0.0, 255.0);
                    out[i * stride + channel_offset[ch]] = q as u8;
                }
            }
            out
        }
        ElementType::Float32 => {
            let mut values = vec![0.0f32; total_pixels * 3];
            for (i, px) in image.data().chunks_exact(3).enumerate() {
                for ch in 0..3 {
                    values[i * stride + channel_offset[ch]] =
                        (px[ch] as f32 / 255.0 - IMAGENET_MEAN[ch]) / IMAGENET_STD[ch];
                }
            }
            let mut out = Vec::with_capacity(values.len() * 4);
            for v in values {
                out.extend_from_slice(&v.to_ne_bytes());
            }
            out
        }
    }
}

/// Reinterpret a raw byte buffer as native-endian f32 values.
pub fn floats_from_ne_bytes(bytes: &[u8]) -> Result<Vec<f32>, PipelineError> {
    if bytes.len() % 4 != 0 {
        return Err(PipelineError::SizeMismatch {
            expected: bytes.len() + (4 - bytes.len() % 4),
            actual: bytes.len(),
        });
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_from_pixels(width: u32, height: u32, pixels: &[[u8; 3]]) -> RgbImage {
        let data: Vec<u8> = pixels.iter().flatten().copied().collect();
        RgbImage::from_raw(width, height, data).unwrap()
    }

    #[test]
    fn test_tensor_length_matches_shape() {
        let image = image_from_pixels(2, 2, &[[1, 2, 3]; 4]);

        let u8_tensor = to_tensor(
            &image,
            TensorLayout::Hwc,
            ElementType::Uint8,
            InputQuant::default(),
        );
        assert_eq!(u8_tensor.len(), 2 * 2 * 3, "uint8: w*h*c*1 bytes");

        let f32_tensor = to_tensor(
            &image,
            TensorLayout::Chw,
            ElementType::Float32,
            InputQuant::default(),
        );
        assert_eq!(f32_tensor.len(), 2 * 2 * 3 * 4, "float32: w*h*c*4 bytes");
    }

    #[test]
    fn test_hwc_interleaves_channels() {
        let image = image_from_pixels(2, 1, &[[10, 20, 30], [40, 50, 60]]);
        let tensor = to_tensor(
            &image,
            TensorLayout::Hwc,
            ElementType::Uint8,
            InputQuant::default(),
        );

        // Pixel 0 occupies the first three bytes, pixel 1 the next three.
        assert_eq!(tensor, vec![10, 20, 30, 40, 50, 60]);
    }

    #[test]
    fn test_chw_separates_planes() {
        let image = image_from_pixels(2, 1, &[[10, 20, 30], [40, 50, 60]]);
        let tensor = to_tensor(
            &image,
            TensorLayout::Chw,
            ElementType::Uint8,
            InputQuant::default(),
        );

        // Channel 0 occupies [0, total_pixels), then channel 1, channel 2.
        assert_eq!(tensor, vec![10, 40, 20, 50, 30, 60]);
    }

    #[test]
    fn test_uint8_quantization_rounds_and_clamps() {
        let image = image_from_pixels(1, 1, &[[255, 128, 0]]);
        let tensor = to_tensor(
            &image,
            TensorLayout::Hwc,
            ElementType::Uint8,
            InputQuant {
                scale: 2.0,
                offset: 1.0,
            },
        );

        // (255 - 1) / 2 = 127, (128 - 1) / 2 = 63.5 -> 64, (0 - 1) / 2 = -0.5
        // rounds away from zero to -1, clamped to 0.
        assert_eq!(tensor, vec![127, 64, 0]);
    }

    #[test]
    fn test_float32_applies_imagenet_normalization() {
        let image = image_from_pixels(1, 1, &[[128, 128, 128]]);
        let tensor = to_tensor(
            &image,
            TensorLayout::Hwc,
            ElementType::Float32,
            InputQuant::default(),
        );

        let values = floats_from_ne_bytes(&tensor).unwrap();
        let gray = 128.0 / 255.0;
        for ch in 0..3 {
            let expected = (gray - IMAGENET_MEAN[ch]) / IMAGENET_STD[ch];
            assert!(
                (values[ch] - expected).abs() < 1e-6,
                "Channel {ch} should be ImageNet-normalized (got {}, want {expected})",
                values[ch]
            );
        }
    }

    #[test]
    fn test_float32_chw_plane_offsets() {
        let image = image_from_pixels(2, 2, &[[255, 0, 0]; 4]);
        let tensor = to_tensor(
            &image,
            TensorLayout::Chw,
            ElementType::Float32,
            InputQuant::default(),
        );
        let values = floats_from_ne_bytes(&tensor).unwrap();

        let red = (1.0 - IMAGENET_MEAN[0]) / IMAGENET_STD[0];
        let green = (0.0 - IMAGENET_MEAN[1]) / IMAGENET_STD[1];

        // First plane is all red values, second all green.
        for i in 0..4 {
            assert!((values[i] - red).abs() < 1e-6);
            assert!((values[4 + i] - green).abs() < 1e-6);
        }
    }

    #[test]
    fn test_floats_from_ne_bytes_rejects_ragged_buffers() {
        let result = floats_from_ne_bytes(&[0u8; 7]);
        assert!(result.is_err(), "Length not divisible by 4 should fail");
    }

    #[test]
    fn test_floats_from_ne_bytes_round_trip() {
        let values = [0.5f32, -1.25, 3.0];
        let mut bytes = Vec::new();
        for v in values {
            bytes.extend_from_slice(&v.to_ne_bytes());
        }
        assert_eq!(floats_from_ne_bytes(&bytes).unwrap(), values.to_vec());
    }
}
