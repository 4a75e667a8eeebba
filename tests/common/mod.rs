#![allow(dead_code, unused_imports)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from jerseyscan for tests
pub use jerseyscan::{
    BoundingBox, CropExtractor, DetectionRecord, FileLoader, ImageAggregate, Pipeline, RecordError,
    classify_images, parse_label,
};
