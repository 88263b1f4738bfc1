use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageReader};
use ndarray::Array4;

use crate::config::Layout;
use crate::error::PredictError;

/// A preprocessed image, ready to be fed to the classifier.
///
/// Always stored channels-last with a leading batch axis: `(1, size, size, 3)`,
/// every value in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct ImageTensor {
    data: Array4<f32>,
}

impl ImageTensor {
    /// Decode the image file at the given path and preprocess it.
    ///
    /// The format is sniffed from the file contents rather than its extension.
    pub fn open(path: &Path, size: u32) -> Result<ImageTensor, PredictError> {
        let decode_err = |source| PredictError::Decode {
            path: path.to_path_buf(),
            source,
        };

        let img = ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|e| decode_err(image::ImageError::IoError(e)))?
            .decode()
            .map_err(decode_err)?;

        tracing::debug!(
            "Decoded {:?}: {}x{} {:?}",
            path,
            img.width(),
            img.height(),
            img.color()
        );

        Ok(Self::from_image(&img, size))
    }

    /// Convert to RGB (alpha dropped, grayscale expanded), stretch to
    /// `size`x`size` and scale to `[0, 1]`.
    ///
    /// No cropping or padding: the aspect ratio is not preserved.
    pub fn from_image(img: &DynamicImage, size: u32) -> ImageTensor {
        let rgb = img.to_rgb8();
        let resized = imageops::resize(&rgb, size, size, FilterType::CatmullRom);

        let n = size as usize;
        let data = Array4::from_shape_fn((1, n, n, 3), |(_, y, x, c)| {
            resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
        });

        ImageTensor { data }
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Returns the tensor shape and its data laid out contiguously in the
    /// requested order.
    pub fn to_layout(&self, layout: Layout) -> ([usize; 4], Vec<f32>) {
        let view = match layout {
            Layout::Nhwc => self.data.view(),
            Layout::Nchw => self.data.view().permuted_axes([0, 3, 1, 2]),
        };

        let (n, a, b, c) = view.dim();
        ([n, a, b, c], view.iter().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Write;

    #[test]
    fn test_shape_and_range() {
        let img = RgbImage::from_fn(640, 480, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 7]));
        let tensor = ImageTensor::from_image(&DynamicImage::ImageRgb8(img), 224);

        assert_eq!(tensor.shape(), &[1, 224, 224, 3]);
        assert!(tensor.data.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_solid_color_is_scaled() {
        let img = RgbImage::from_pixel(10, 30, Rgb([255, 0, 51]));
        let tensor = ImageTensor::from_image(&DynamicImage::ImageRgb8(img), 8);
        let view = &tensor.data;

        for y in 0..8 {
            for x in 0..8 {
                assert!((view[[0, y, x, 0]] - 1.0).abs() < 1e-6);
                assert!(view[[0, y, x, 1]].abs() < 1e-6);
                assert!((view[[0, y, x, 2]] - 0.2).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_alpha_is_discarded() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 0]));
        let tensor = ImageTensor::from_image(&DynamicImage::ImageRgba8(img), 4);

        assert_eq!(tensor.shape(), &[1, 4, 4, 3]);
        assert!((tensor.data[[0, 0, 0, 2]] - 30.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_grayscale_is_expanded() {
        let img = GrayImage::from_pixel(5, 5, Luma([128]));
        let tensor = ImageTensor::from_image(&DynamicImage::ImageLuma8(img), 5);
        let view = &tensor.data;

        let expected = 128.0 / 255.0;
        for c in 0..3 {
            assert!((view[[0, 2, 2, c]] - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_nchw_layout() {
        // left column red, right column blue
        let img = RgbImage::from_fn(2, 2, |x, _| {
            if x == 0 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            }
        });
        let tensor = ImageTensor::from_image(&DynamicImage::ImageRgb8(img), 2);

        let (shape, data) = tensor.to_layout(Layout::Nhwc);
        assert_eq!(shape, [1, 2, 2, 3]);
        assert_eq!(&data[..6], &[1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);

        let (shape, data) = tensor.to_layout(Layout::Nchw);
        assert_eq!(shape, [1, 3, 2, 2]);
        // red plane, then green, then blue
        assert_eq!(data, vec![1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_open_sniffs_format() {
        let dir = tempfile::tempdir().unwrap();
        // PNG bytes behind a misleading extension
        let path = dir.path().join("face.jpg");
        RgbImage::from_pixel(3, 3, Rgb([0, 255, 0]))
            .save_with_format(&path, image::ImageFormat::Png)
            .unwrap();

        let tensor = ImageTensor::open(&path, 224).unwrap();
        assert_eq!(tensor.shape(), &[1, 224, 224, 3]);
        assert!((tensor.data[[0, 100, 100, 1]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_open_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"definitely not an image").unwrap();

        let err = ImageTensor::open(file.path(), 224).unwrap_err();
        assert_eq!(err.kind(), "decode");
    }

    #[test]
    fn test_open_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = ImageTensor::open(dir.path(), 224).unwrap_err();
        assert_eq!(err.kind(), "decode");
    }
}
