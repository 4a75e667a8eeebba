use std::path::Path;

use image::DynamicImage;
use log::debug;
use rten::Model;
use rten_tensor::prelude::*;
use rten_tensor::NdTensor;

use crate::detection::preprocessing::to_input_tensor;
use crate::detection::{Region, RegionDetector};
use crate::models::BoundingBox;

/// Clothing detector backed by a YOLOv8 detection model in `.rten` format.
///
/// Expects a single output shaped `[1, 4 + classes, anchors]` where the first
/// four rows are `cx, cy, w, h` in input pixels.
pub struct YoloDetector {
    model: Model,
    pub input_size: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    /// Class ids to keep; empty keeps everything
    pub classes: Vec<usize>,
}

impl YoloDetector {
    pub fn load(model_path: &Path) -> anyhow::Result<Self> {
        if !model_path.exists() {
            anyhow::bail!("Detector model not found: {}", model_path.display());
        }
        let model = Model::load_file(model_path)?;

        Ok(Self {
            model,
            input_size: 640,
            confidence_threshold: 0.4,
            iou_threshold: 0.45,
            classes: vec![0, 1],
        })
    }

    pub fn with_confidence(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_classes(mut self, classes: Vec<usize>) -> Self {
        self.classes = classes;
        self
    }
}

impl RegionDetector for YoloDetector {
    fn detect(&self, img: &DynamicImage) -> anyhow::Result<Vec<Region>> {
        let input = to_input_tensor(img, self.input_size);

        let output = self
            .model
            .run_one(input.view().into(), None)
            .map_err(|e| anyhow::anyhow!("Detector inference failed: {}", e))?;
        let output: NdTensor<f32, 3> = output
            .try_into()
            .map_err(|e| anyhow::anyhow!("Unexpected detector output: {:?}", e))?;

        let scale_x = img.width() as f32 / self.input_size as f32;
        let scale_y = img.height() as f32 / self.input_size as f32;

        let candidates = decode_anchors(
            &output,
            self.confidence_threshold,
            &self.classes,
            (scale_x, scale_y),
        );
        let mut regions = non_max_suppression(candidates, self.iou_threshold);

        regions.retain_mut(|region| match region.bbox.clamp_to(img.width(), img.height()) {
            Some(clamped) => {
                region.bbox = clamped;
                true
            }
            None => false,
        });

        debug!("Detector kept {} regions", regions.len());
        Ok(regions)
    }
}

/// Turn raw anchor rows into candidate regions in source image pixels
pub fn decode_anchors(
    output: &NdTensor<f32, 3>,
    confidence_threshold: f32,
    classes: &[usize],
    (scale_x, scale_y): (f32, f32),
) -> Vec<Region> {
    let [_batch, attrs, anchors] = output.shape();
    if attrs <= 4 {
        return Vec::new();
    }
    let num_classes = attrs - 4;

    let mut regions = Vec::new();
    for i in 0..anchors {
        let (class_id, confidence) = (0..num_classes)
            .map(|c| (c, output[[0, 4 + c, i]]))
            .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

        if confidence < confidence_threshold {
            continue;
        }
        if !classes.is_empty() && !classes.contains(&class_id) {
            continue;
        }

        let cx = output[[0, 0, i]];
        let cy = output[[0, 1, i]];
        let w = output[[0, 2, i]];
        let h = output[[0, 3, i]];

        let bbox = BoundingBox::new(
            (cx - w / 2.0) * scale_x,
            (cy - h / 2.0) * scale_y,
            (cx + w / 2.0) * scale_x,
            (cy + h / 2.0) * scale_y,
        );
        // Degenerate boxes are dropped
        if let Ok(bbox) = bbox {
            regions.push(Region {
                bbox,
                class_id,
                confidence: confidence.min(1.0),
            });
        }
    }

    regions
}

/// Greedy per-class NMS, highest confidence first
pub fn non_max_suppression(mut candidates: Vec<Region>, iou_threshold: f32) -> Vec<Region> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Region> = Vec::new();
    for candidate in candidates {
        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && k.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}
