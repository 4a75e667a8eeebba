pub mod classify;
pub mod preprocessing;
pub mod yolo;

use image::DynamicImage;

use crate::models::BoundingBox;

pub use classify::YoloClassifier;
pub use yolo::YoloDetector;

/// A region of the source image the detector thinks contains clothing
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub bbox: BoundingBox,
    pub class_id: usize,
    pub confidence: f32,
}

/// Top-1 classifier output for one crop
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: String,
    pub confidence: f32,
}

/// Finds shirt/jersey regions in a full image
pub trait RegionDetector: Send + Sync {
    fn detect(&self, img: &DynamicImage) -> anyhow::Result<Vec<Region>>;
}

/// Names the team a cropped shirt belongs to.
///
/// Returns `Ok(None)` when the classifier is not confident enough.
pub trait ShirtClassifier: Send + Sync {
    fn classify(&self, roi: &DynamicImage) -> anyhow::Result<Option<Classification>>;
}
