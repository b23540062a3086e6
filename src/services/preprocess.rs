use image::RgbImage;
use image::imageops::{self, FilterType};

/// Default square resolution the classifier consumes
pub const INPUT_SIZE: u32 = 256;

/// A single normalized frame laid out as NHWC `(1, size, size, 3)`
#[derive(Debug, Clone, PartialEq)]
pub struct FrameTensor {
    size: u32,
    data: Vec<f32>,
}

impl FrameTensor {
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Batch shape including the leading batch dimension of 1
    pub fn shape(&self) -> [usize; 4] {
        [1, self.size as usize, self.size as usize, 3]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

/// Resize a decoded frame to `size x size` and rescale intensities to [0, 1].
///
/// The whole frame is used as-is: no cropping, face alignment or color
/// conversion beyond what the decoder produced.
pub fn preprocess_frame(frame: &RgbImage, size: u32) -> FrameTensor {
    let resized = if frame.width() == size && frame.height() == size {
        frame.clone()
    } else {
        imageops::resize(frame, size, size, FilterType::Triangle)
    };

    let data = resized
        .into_raw()
        .into_iter()
        .map(|v| v as f32 / 255.0)
        .collect();

    FrameTensor { size, data }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_output_shape() {
        let frame = RgbImage::from_pixel(640, 360, Rgb([10, 20, 30]));
        let tensor = preprocess_frame(&frame, INPUT_SIZE);
        assert_eq!(tensor.shape(), [1, 256, 256, 3]);
        assert_eq!(tensor.data().len(), 256 * 256 * 3);
    }

    #[test]
    fn test_values_are_normalized() {
        let frame = RgbImage::from_pixel(32, 32, Rgb([0, 255, 51]));
        let tensor = preprocess_frame(&frame, 16);
        let first = &tensor.data()[..3];
        assert_eq!(first[0], 0.0);
        assert_eq!(first[1], 1.0);
        assert!((first[2] - 0.2).abs() < 1e-6);
        assert!(tensor.data().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_channel_order_is_preserved() {
        let frame = RgbImage::from_pixel(4, 4, Rgb([255, 0, 0]));
        let tensor = preprocess_frame(&frame, 4);
        for px in tensor.data().chunks(3) {
            assert_eq!(px, &[1.0, 0.0, 0.0]);
        }
    }
}
