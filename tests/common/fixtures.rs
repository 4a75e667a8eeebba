use std::path::{Path, PathBuf};
use std::sync::Mutex;

use image::{DynamicImage, ImageBuffer, Rgb};
use jerseyscan::{BoundingBox, Classification, Region, RegionDetector, ShirtClassifier};

/// Writes a 100x100 test image to `dir/name`.
/// The left half is red and the right half is blue.
pub fn create_test_image(dir: &Path, name: &str) -> PathBuf {
    let img = ImageBuffer::from_fn(100, 100, |x, _| {
        if x < 50 { Rgb([255u8, 0u8, 0u8]) } else { Rgb([0u8, 0u8, 255u8]) }
    });
    let path = dir.join(name);
    img.save_with_format(&path, image::ImageFormat::Png)
        .expect("Failed to save test image");
    path
}

pub fn region(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32) -> Region {
    Region {
        bbox: BoundingBox::new(x1, y1, x2, y2).expect("valid test box"),
        class_id: 0,
        confidence,
    }
}

/// Detector that returns the same regions for every image
pub struct FixedDetector {
    pub regions: Vec<Region>,
}

impl RegionDetector for FixedDetector {
    fn detect(&self, _img: &DynamicImage) -> anyhow::Result<Vec<Region>> {
        Ok(self.regions.clone())
    }
}

/// Classifier that labels a crop by its dominant colour
pub struct ColorClassifier {
    pub red: Option<(String, f32)>,
    pub blue: Option<(String, f32)>,
}

impl ColorClassifier {
    pub fn new(red: &str, red_conf: f32, blue: &str, blue_conf: f32) -> Self {
        Self {
            red: Some((red.to_string(), red_conf)),
            blue: Some((blue.to_string(), blue_conf)),
        }
    }
}

impl ShirtClassifier for ColorClassifier {
    fn classify(&self, roi: &DynamicImage) -> anyhow::Result<Option<Classification>> {
        let rgb = roi.to_rgb8();
        let (mut red, mut blue) = (0u64, 0u64);
        for pixel in rgb.pixels() {
            red += pixel[0] as u64;
            blue += pixel[2] as u64;
        }
        let pick = if red >= blue { &self.red } else { &self.blue };
        Ok(pick.as_ref().map(|(label, confidence)| Classification {
            label: label.clone(),
            confidence: *confidence,
        }))
    }
}

/// Classifier that hands out labels in order, one per call
pub struct ScriptedClassifier {
    labels: Mutex<Vec<(String, f32)>>,
}

impl ScriptedClassifier {
    pub fn new(labels: &[(&str, f32)]) -> Self {
        let mut labels: Vec<(String, f32)> = labels
            .iter()
            .map(|(l, c)| (l.to_string(), *c))
            .collect();
        labels.reverse();
        Self {
            labels: Mutex::new(labels),
        }
    }
}

impl ShirtClassifier for ScriptedClassifier {
    fn classify(&self, _roi: &DynamicImage) -> anyhow::Result<Option<Classification>> {
        let next = self.labels.lock().expect("classifier lock").pop();
        Ok(next.map(|(label, confidence)| Classification { label, confidence }))
    }
}

/// Detector that always fails
pub struct BrokenDetector;

impl RegionDetector for BrokenDetector {
    fn detect(&self, _img: &DynamicImage) -> anyhow::Result<Vec<Region>> {
        anyhow::bail!("model exploded")
    }
}
