pub mod annotate;
pub mod json;
pub mod xlsx;

pub use annotate::save_annotated;
pub use json::write_report;
pub use xlsx::XlsxExporter;
