use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageFormat, ImageReader};
use log::warn;
use rust_xlsxwriter::{Format, Image, Workbook, Worksheet};

use crate::detection::preprocessing::to_roi;
use crate::models::{DetectionRecord, ImageAggregate};

const HEADERS: [&str; 8] = [
    "Image",
    "Team",
    "Occurrences",
    "Confidence",
    "Year",
    "Other data",
    "Box (x1, y1, x2, y2)",
    "Thumbnail",
];
const THUMBNAIL_COL: u16 = 7;

/// Writes aggregates to a workbook, one row block per image and one embedded
/// thumbnail per detection
pub struct XlsxExporter {
    /// Thumbnail side length in pixels
    pub thumbnail_size: u32,
}

impl XlsxExporter {
    pub fn new() -> Self {
        Self { thumbnail_size: 96 }
    }

    pub fn with_thumbnail_size(mut self, size: u32) -> Self {
        self.thumbnail_size = size;
        self
    }

    pub fn export(&self, aggregates: &[ImageAggregate], path: &Path) -> anyhow::Result<()> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Detections")?;

        let bold = Format::new().set_bold();
        for (col, header) in HEADERS.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, *header, &bold)?;
        }
        worksheet.set_column_width(0, 40)?;
        worksheet.set_column_width(1, 20)?;
        worksheet.set_column_width(5, 20)?;
        worksheet.set_column_width(6, 28)?;
        // Roughly 7 pixels per character unit
        worksheet.set_column_width(THUMBNAIL_COL, self.thumbnail_size as f64 / 7.0 + 1.0)?;

        let mut row: u32 = 1;
        for aggregate in aggregates {
            row = self.write_block(worksheet, row, aggregate, &bold)?;
            // Blank spacer row between images
            row += 1;
        }

        workbook
            .save(path)
            .map_err(|e| anyhow::anyhow!("Failed to save workbook {}: {}", path.display(), e))?;
        Ok(())
    }

    /// Write one image's rows starting at `row`; returns the next free row
    fn write_block(
        &self,
        worksheet: &mut Worksheet,
        mut row: u32,
        aggregate: &ImageAggregate,
        bold: &Format,
    ) -> anyhow::Result<u32> {
        let path_text = aggregate.image_path().display().to_string();
        worksheet.write_string_with_format(row, 0, &path_text, bold)?;

        if aggregate.is_empty() {
            worksheet.write_string(row, 1, "no teams detected")?;
            return Ok(row + 1);
        }
        row += 1;

        let source = match open_image(aggregate.image_path()) {
            Ok(img) => Some(img),
            Err(e) => {
                warn!("No thumbnails for {}: {:#}", path_text, e);
                None
            }
        };

        for (team, records) in aggregate.teams() {
            for record in records {
                write_record(worksheet, row, team, records.len(), record)?;

                if let Some(img) = &source {
                    match self.thumbnail(img, record) {
                        Ok(Some(thumb)) => {
                            // Points are 3/4 of a pixel
                            worksheet.set_row_height(row, self.thumbnail_size as f64 * 0.75 + 2.0)?;
                            worksheet.insert_image(row, THUMBNAIL_COL, &thumb)?;
                        }
                        Ok(None) => {}
                        Err(e) => warn!("Thumbnail failed for {} in {}: {:#}", team, path_text, e),
                    }
                }
                row += 1;
            }
        }

        Ok(row)
    }

    fn thumbnail(&self, img: &DynamicImage, record: &DetectionRecord) -> anyhow::Result<Option<Image>> {
        let Some(crop) = to_roi(img, record.bbox(), self.thumbnail_size) else {
            return Ok(None);
        };

        let mut png = Vec::new();
        crop.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        Ok(Some(Image::new_from_buffer(&png)?))
    }
}

impl Default for XlsxExporter {
    fn default() -> Self {
        Self::new()
    }
}

fn write_record(
    worksheet: &mut Worksheet,
    row: u32,
    team: &str,
    occurrences: usize,
    record: &DetectionRecord,
) -> anyhow::Result<()> {
    let b = record.bbox();
    worksheet.write_string(row, 1, team)?;
    worksheet.write_number(row, 2, occurrences as f64)?;
    worksheet.write_number(row, 3, record.confidence() as f64)?;
    if let Some(year) = record.year() {
        worksheet.write_string(row, 4, year)?;
    }
    if let Some(other) = record.other_data() {
        worksheet.write_string(row, 5, other)?;
    }
    worksheet.write_string(
        row,
        6,
        format!("{:.0}, {:.0}, {:.0}, {:.0}", b.x1, b.y1, b.x2, b.y2),
    )?;
    Ok(())
}

fn open_image(path: &Path) -> anyhow::Result<DynamicImage> {
    ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| anyhow::anyhow!("Failed to decode image: {}", e))
}
