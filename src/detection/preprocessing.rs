use image::imageops::FilterType;
use image::DynamicImage;
use rten_tensor::NdTensor;

use crate::models::BoundingBox;

/// Crop a detected region at its original size.
///
/// The box is clamped to the image first; `None` if no pixels remain.
pub fn crop_region(img: &DynamicImage, bbox: &BoundingBox) -> Option<DynamicImage> {
    let clamped = bbox.clamp_to(img.width(), img.height())?;
    let x = clamped.x1 as u32;
    let y = clamped.y1 as u32;
    let width = (clamped.x2 as u32).saturating_sub(x);
    let height = (clamped.y2 as u32).saturating_sub(y);

    if width == 0 || height == 0 {
        return None;
    }

    Some(img.crop_imm(x, y, width, height))
}

/// Crop a detected region and resize it to `size x size` for the classifier
pub fn to_roi(img: &DynamicImage, bbox: &BoundingBox, size: u32) -> Option<DynamicImage> {
    crop_region(img, bbox).map(|crop| crop.resize_exact(size, size, FilterType::Triangle))
}

/// Resize to a square model input and convert to an NCHW tensor scaled to [0, 1]
pub fn to_input_tensor(img: &DynamicImage, size: u32) -> NdTensor<f32, 4> {
    let rgb = img.resize_exact(size, size, FilterType::Triangle).to_rgb8();
    let plane = (size * size) as usize;
    let mut data = vec![0.0f32; 3 * plane];

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let offset = (y * size + x) as usize;
        for c in 0..3 {
            data[c * plane + offset] = pixel[c] as f32 / 255.0;
        }
    }

    NdTensor::from_data([1, 3, size as usize, size as usize], data)
}
