use std::path::{Path, PathBuf};

use image::ImageFormat;

/// Where input photos, outputs and model files live
#[derive(Debug, Clone)]
pub struct FileLoader {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub models_dir: PathBuf,
    pub detector_model_name: String,
    pub classifier_model_name: String,
    pub labels_name: String,
}

impl FileLoader {
    pub fn new() -> Self {
        Self {
            input_dir: PathBuf::from("input_images"),
            output_dir: PathBuf::from("output_images"),
            models_dir: PathBuf::from("models"),
            detector_model_name: "clothes_detector_yolov8m.rten".to_string(),
            classifier_model_name: "shirt_model_yolov8m-cls.rten".to_string(),
            labels_name: "shirt_labels.txt".to_string(),
        }
    }

    pub fn with_input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.input_dir = dir.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_models_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.models_dir = dir.into();
        self
    }

    /// All decodable image files in the input directory, sorted by path
    pub fn input_images(&self) -> anyhow::Result<Vec<PathBuf>> {
        if !self.input_dir.is_dir() {
            anyhow::bail!("Input directory not found: {}", self.input_dir.display());
        }

        let mut images = Vec::new();
        for entry in std::fs::read_dir(&self.input_dir)? {
            let path = entry?.path();
            if path.is_file() && is_image_file(&path) {
                images.push(path);
            }
        }
        images.sort();

        Ok(images)
    }

    /// Create the output directory if needed and return it
    pub fn ensure_output_dir(&self) -> anyhow::Result<&Path> {
        std::fs::create_dir_all(&self.output_dir)?;
        Ok(&self.output_dir)
    }

    pub fn detector_model_path(&self) -> PathBuf {
        self.models_dir.join(&self.detector_model_name)
    }

    pub fn classifier_model_path(&self) -> PathBuf {
        self.models_dir.join(&self.classifier_model_name)
    }

    pub fn labels_path(&self) -> PathBuf {
        self.models_dir.join(&self.labels_name)
    }
}

impl Default for FileLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn is_image_file(path: &Path) -> bool {
    ImageFormat::from_path(path).is_ok()
}
