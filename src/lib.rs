pub mod detection;
pub mod export;
pub mod labels;
pub mod loader;
pub mod models;
pub mod pipeline;

pub use detection::{Classification, Region, RegionDetector, ShirtClassifier};
pub use labels::{parse_label, ParsedLabel};
pub use loader::FileLoader;
pub use models::{BoundingBox, DetectionRecord, ImageAggregate, RecordError};
pub use pipeline::{classify_images, CropExtractor, DebugConfig, Pipeline, PipelineContext};
