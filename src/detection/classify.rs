use std::path::Path;

use image::DynamicImage;
use log::debug;
use rten::Model;
use rten_tensor::prelude::*;
use rten_tensor::NdTensor;

use crate::detection::preprocessing::to_input_tensor;
use crate::detection::{Classification, ShirtClassifier};

/// Shirt classifier backed by a YOLOv8 classification model in `.rten` format.
///
/// The `.rten` export carries no class names, so they are read from a text
/// file with one label per line, in class id order.
pub struct YoloClassifier {
    model: Model,
    names: Vec<String>,
    pub input_size: u32,
    pub confidence_threshold: f32,
}

impl YoloClassifier {
    pub fn load(model_path: &Path, labels_path: &Path) -> anyhow::Result<Self> {
        if !model_path.exists() {
            anyhow::bail!("Classifier model not found: {}", model_path.display());
        }
        let names = load_class_names(labels_path)?;
        let model = Model::load_file(model_path)?;

        Ok(Self {
            model,
            names,
            input_size: 224,
            confidence_threshold: 0.2,
        })
    }

    pub fn with_confidence(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl ShirtClassifier for YoloClassifier {
    fn classify(&self, roi: &DynamicImage) -> anyhow::Result<Option<Classification>> {
        let input = to_input_tensor(roi, self.input_size);

        let output = self
            .model
            .run_one(input.view().into(), None)
            .map_err(|e| anyhow::anyhow!("Classifier inference failed: {}", e))?;
        let probs: NdTensor<f32, 2> = output
            .try_into()
            .map_err(|e| anyhow::anyhow!("Unexpected classifier output: {:?}", e))?;

        let scores: Vec<f32> = probs.iter().copied().collect();
        let classification = pick_top1(&scores, &self.names, self.confidence_threshold)?;

        if let Some(c) = &classification {
            debug!("Classified as {} ({:.3})", c.label, c.confidence);
        }
        Ok(classification)
    }
}

/// Read class names, one per line; blank lines are skipped
pub fn load_class_names(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read class names {}: {}", path.display(), e))?;

    let names: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if names.is_empty() {
        anyhow::bail!("No class names in {}", path.display());
    }
    Ok(names)
}

/// Top-1 class with its confidence rounded to three decimals.
///
/// `Ok(None)` below `threshold`; an error if the model has more classes than
/// there are names.
pub fn pick_top1(scores: &[f32], names: &[String], threshold: f32) -> anyhow::Result<Option<Classification>> {
    let Some((index, &score)) = scores
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
    else {
        return Ok(None);
    };

    if score < threshold {
        return Ok(None);
    }

    let label = names
        .get(index)
        .ok_or_else(|| anyhow::anyhow!("Class id {} has no name ({} names loaded)", index, names.len()))?;

    Ok(Some(Classification {
        label: label.clone(),
        confidence: ((score * 1000.0).round() / 1000.0).clamp(0.0, 1.0),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn names() -> Vec<String> {
        ["Lions-Home", "Bears-Away-1985", "Dodgers"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn picks_highest_score() {
        let c = pick_top1(&[0.1, 0.71234, 0.2], &names(), 0.2).unwrap().unwrap();
        assert_eq!(c.label, "Bears-Away-1985");
        assert_eq!(c.confidence, 0.712);
    }

    #[test]
    fn below_threshold_is_none() {
        assert!(pick_top1(&[0.1, 0.15, 0.05], &names(), 0.2).unwrap().is_none());
        assert!(pick_top1(&[], &names(), 0.2).unwrap().is_none());
    }

    #[test]
    fn missing_name_is_an_error() {
        assert!(pick_top1(&[0.0, 0.0, 0.0, 0.9], &names(), 0.2).is_err());
    }

    #[test]
    fn class_names_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Lions-Home\n\n  Bears-Away-1985  \nDodgers").unwrap();

        let loaded = load_class_names(file.path()).unwrap();
        assert_eq!(loaded, names());
    }

    #[test]
    fn empty_class_names_file_is_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(load_class_names(file.path()).is_err());
    }
}
