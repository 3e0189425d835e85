use std::path::Path;

use image::{imageops::FilterType, io::Reader, DynamicImage, ImageResult};

use crate::error::PredictError;

pub const IMAGE_SIZE: u32 = 224;
pub const CHANNELS: usize = 3;

/// A single image shaped `[1, IMAGE_SIZE, IMAGE_SIZE, 3]`, row-major RGB,
/// values scaled to `[0, 1]`.
#[derive(Debug, Clone)]
pub struct InputTensor {
    pub data: Vec<f32>,
    pub dims: [u64; 4],
}

#[cfg(test)]
impl InputTensor {
    /// Value at `(y, x, channel)` of the single batch entry.
    fn at(&self, y: usize, x: usize, c: usize) -> f32 {
        let width = self.dims[2] as usize;
        self.data[(y * width + x) * CHANNELS + c]
    }
}

/// Decode an image file by its content. The extension of an upload says
/// nothing reliable about its format.
pub fn open_image(path: &Path) -> ImageResult<DynamicImage> {
    Reader::open(path)?.with_guessed_format()?.decode()
}

pub fn preprocess(path: &Path) -> Result<InputTensor, PredictError> {
    let img = open_image(path).map_err(|e| PredictError::Decode(e.to_string()))?;
    Ok(to_tensor(&img))
}

// The decoder already yields RGB(A)/luma, so `to_rgb8` is the only channel
// conversion needed.
fn to_tensor(img: &DynamicImage) -> InputTensor {
    let resized = img.resize_exact(IMAGE_SIZE, IMAGE_SIZE, FilterType::Triangle);
    let rgb = resized.to_rgb8();

    let mut data = Vec::with_capacity((IMAGE_SIZE * IMAGE_SIZE) as usize * CHANNELS);
    for pixel in rgb.pixels() {
        data.push(pixel[0] as f32 / 255.0);
        data.push(pixel[1] as f32 / 255.0);
        data.push(pixel[2] as f32 / 255.0);
    }

    InputTensor {
        data,
        dims: [1, IMAGE_SIZE as u64, IMAGE_SIZE as u64, CHANNELS as u64],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma, Rgb};

    #[test]
    fn small_solid_image_is_upscaled_and_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solid.png");
        ImageBuffer::from_pixel(10, 10, Rgb([200u8, 100, 0]))
            .save(&path)
            .unwrap();

        let tensor = preprocess(&path).unwrap();
        assert_eq!(tensor.dims, [1, 224, 224, 3]);
        assert_eq!(tensor.data.len(), 224 * 224 * 3);
        assert!(tensor.data.iter().all(|v| (0.0..=1.0).contains(v)));

        assert!((tensor.at(0, 0, 0) - 200.0 / 255.0).abs() < 1e-6);
        assert!((tensor.at(111, 57, 1) - 100.0 / 255.0).abs() < 1e-6);
        assert_eq!(tensor.at(223, 223, 2), 0.0);
    }

    #[test]
    fn grayscale_is_expanded_to_three_channels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.png");
        ImageBuffer::from_pixel(4, 4, Luma([255u8]))
            .save(&path)
            .unwrap();

        let tensor = preprocess(&path).unwrap();
        assert_eq!(tensor.at(10, 10, 0), 1.0);
        assert_eq!(tensor.at(10, 10, 2), 1.0);
    }

    #[test]
    fn png_saved_under_jpg_name_is_decoded_by_content() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("leaf.png");
        ImageBuffer::from_pixel(10, 10, Rgb([30u8, 180, 40]))
            .save(&png)
            .unwrap();
        let path = dir.path().join("leaf.jpg");
        std::fs::rename(&png, &path).unwrap();

        let tensor = preprocess(&path).unwrap();
        assert_eq!(tensor.dims, [1, 224, 224, 3]);
        assert!((tensor.at(5, 5, 1) - 180.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn corrupt_file_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();

        assert!(matches!(preprocess(&path), Err(PredictError::Decode(_))));
    }
}
