use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use image::{DynamicImage, ImageReader};
use log::{debug, info, warn};

use crate::detection::preprocessing::{crop_region, to_roi};
use crate::detection::{Classification, RegionDetector, ShirtClassifier};
use crate::labels::parse_label;
use crate::models::ImageAggregate;

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for saved crops
    pub output_dir: PathBuf,
}

/// Settings shared by every image in a run
#[derive(Clone, Debug)]
pub struct PipelineContext {
    pub verbose: bool,
    pub debug: Option<DebugConfig>,
    /// Side length of the square crop handed to the classifier
    pub roi_size: u32,
    /// Worker threads used by `run`
    pub jobs: usize,
}

/// Detect shirts, classify each crop, and aggregate per image.
///
/// The detector and classifier are passed in as capabilities and shared
/// read-only between workers.
pub struct Pipeline {
    detector: Arc<dyn RegionDetector>,
    classifier: Arc<dyn ShirtClassifier>,
    context: PipelineContext,
}

impl Pipeline {
    pub fn new(detector: Arc<dyn RegionDetector>, classifier: Arc<dyn ShirtClassifier>) -> Self {
        Self {
            detector,
            classifier,
            context: PipelineContext {
                verbose: false,
                debug: None,
                roi_size: 256,
                jobs: 1,
            },
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.context.verbose = verbose;
        self
    }

    pub fn with_roi_size(mut self, roi_size: u32) -> Self {
        self.context.roi_size = roi_size;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.context.jobs = jobs.max(1);
        self
    }

    /// Save every classified crop under `output_dir`, one folder per input
    /// file name. The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.context.debug = Some(DebugConfig { output_dir });
        Ok(self)
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    /// Decode one image and build its aggregate.
    ///
    /// Crops the classifier is unsure about and records that fail validation
    /// are skipped; only decode and inference failures are errors.
    pub fn process_image(&self, path: &Path) -> Result<ImageAggregate> {
        let img = decode(path)?;
        self.process_decoded(path, &img)
    }

    /// Same as `process_image` for an image already in memory
    pub fn process_decoded(&self, path: &Path, img: &DynamicImage) -> Result<ImageAggregate> {
        let regions = self.detector.detect(img)?;
        debug!("{}: {} regions", path.display(), regions.len());

        let mut aggregate = ImageAggregate::new(path);

        for (i, region) in regions.iter().enumerate() {
            let Some(roi) = to_roi(img, &region.bbox, self.context.roi_size) else {
                debug!("  region {} has an empty crop", i + 1);
                continue;
            };

            let classification = self.classifier.classify(&roi)?;
            if let Err(e) = self.save_debug_crop(path, i, classification.as_ref(), &roi) {
                warn!("{}: could not save debug crop {}: {:#}", path.display(), i + 1, e);
            }

            let Some(classification) = classification else {
                debug!("  region {}: no confident class", i + 1);
                continue;
            };

            if let Err(e) = aggregate.add_label(&classification.label, classification.confidence, region.bbox) {
                warn!(
                    "{}: skipping region {} ({}): {}",
                    path.display(),
                    i + 1,
                    classification.label,
                    e
                );
                continue;
            }

            if self.context.verbose {
                info!(
                    "  region {}: {} ({:.3})",
                    i + 1,
                    classification.label,
                    classification.confidence
                );
            }
        }

        Ok(aggregate)
    }

    /// Process every image, keeping input order.
    ///
    /// Images that fail are logged and left out of the result.
    pub fn run(&self, paths: &[PathBuf]) -> Vec<ImageAggregate> {
        if self.context.jobs <= 1 || paths.len() <= 1 {
            return paths
                .iter()
                .filter_map(|path| self.process_logged(path))
                .collect();
        }

        self.run_parallel(paths)
    }

    fn run_parallel(&self, paths: &[PathBuf]) -> Vec<ImageAggregate> {
        let (job_tx, job_rx) = mpsc::channel::<(usize, &PathBuf)>();
        let (result_tx, result_rx) = mpsc::channel::<(usize, Option<ImageAggregate>)>();

        for job in paths.iter().enumerate() {
            // Receiver outlives this loop, send cannot fail
            let _ = job_tx.send(job);
        }
        drop(job_tx);

        let job_rx = Mutex::new(job_rx);
        let workers = self.context.jobs.min(paths.len());

        std::thread::scope(|scope| {
            for _ in 0..workers {
                let result_tx = result_tx.clone();
                let job_rx = &job_rx;
                scope.spawn(move || {
                    loop {
                        let next = match job_rx.lock() {
                            Ok(rx) => rx.recv(),
                            Err(_) => break,
                        };
                        let Ok((index, path)) = next else {
                            break;
                        };
                        if result_tx.send((index, self.process_logged(path))).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(result_tx);

        let mut results: Vec<(usize, Option<ImageAggregate>)> = result_rx.into_iter().collect();
        results.sort_by_key(|(index, _)| *index);
        results.into_iter().filter_map(|(_, aggregate)| aggregate).collect()
    }

    fn process_logged(&self, path: &Path) -> Option<ImageAggregate> {
        info!("Processing image: {}", path.display());
        match self.process_image(path) {
            Ok(aggregate) => {
                info!("Image processed: {} detections", aggregate.len());
                Some(aggregate)
            }
            Err(e) => {
                warn!("Error processing image {}: {:#}", path.display(), e);
                None
            }
        }
    }

    fn save_debug_crop(
        &self,
        path: &Path,
        index: usize,
        classification: Option<&Classification>,
        roi: &DynamicImage,
    ) -> Result<()> {
        let Some(debug_config) = &self.context.debug else {
            return Ok(());
        };

        let image_dir = debug_config.output_dir.join(image_folder(path));
        std::fs::create_dir_all(&image_dir)?;

        let team = classification
            .map(|c| parse_label(&c.label).name)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "unclassified".to_string());
        let filename = format!("{:02}_{}.png", index + 1, sanitize(&team));
        roi.save(image_dir.join(&filename))
            .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))?;

        debug!("  Debug: saved {}", filename);
        Ok(())
    }
}

/// Detector-only pass: cut every detected region out of each image and save
/// it at its original size, without classifying anything.
pub struct CropExtractor {
    detector: Arc<dyn RegionDetector>,
}

impl CropExtractor {
    pub fn new(detector: Arc<dyn RegionDetector>) -> Self {
        Self { detector }
    }

    /// Save the crops of one image as `<output_dir>/<file name>/NN_class<id>.png`
    pub fn extract(&self, path: &Path, output_dir: &Path) -> Result<Vec<PathBuf>> {
        let img = decode(path)?;
        let regions = self.detector.detect(&img)?;

        let image_dir = output_dir.join(image_folder(path));
        std::fs::create_dir_all(&image_dir)?;

        let mut saved = Vec::with_capacity(regions.len());
        for (i, region) in regions.iter().enumerate() {
            let Some(crop) = crop_region(&img, &region.bbox) else {
                debug!("  region {} has an empty crop", i + 1);
                continue;
            };
            let out = image_dir.join(format!("{:02}_class{}.png", i + 1, region.class_id));
            crop.save(&out)
                .map_err(|e| anyhow::anyhow!("Failed to save crop {}: {}", out.display(), e))?;
            saved.push(out);
        }

        debug!("{}: {} crops saved", path.display(), saved.len());
        Ok(saved)
    }

    /// Extract crops from every image; failing images are logged and skipped
    pub fn run(&self, paths: &[PathBuf], output_dir: &Path) -> Vec<PathBuf> {
        let mut saved = Vec::new();
        for path in paths {
            info!("Extracting crops: {}", path.display());
            match self.extract(path, output_dir) {
                Ok(crops) => saved.extend(crops),
                Err(e) => warn!("Error processing image {}: {:#}", path.display(), e),
            }
        }
        saved
    }
}

/// Classifier-only pass: classify each whole image as a single shirt.
///
/// Images that cannot be decoded or classified are logged and left out.
pub fn classify_images(
    classifier: &dyn ShirtClassifier,
    paths: &[PathBuf],
) -> Vec<(PathBuf, Option<Classification>)> {
    paths
        .iter()
        .filter_map(|path| {
            let result = decode(path).and_then(|img| classifier.classify(&img));
            match result {
                Ok(classification) => Some((path.clone(), classification)),
                Err(e) => {
                    warn!("Error classifying image {}: {:#}", path.display(), e);
                    None
                }
            }
        })
        .collect()
}

fn decode(path: &Path) -> Result<DynamicImage> {
    ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| anyhow::anyhow!("Failed to decode image {}: {}", path.display(), e))
}

// Full file name, so shot.png and shot.jpg get separate folders
fn image_folder(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string())
}

fn sanitize(name: &str) -> String {
    name.replace([' ', '/', '\\'], "_")
}
