use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::models::ImageAggregate;

#[derive(Serialize)]
struct Report<'a> {
    generated_at: String,
    images: &'a [ImageAggregate],
}

/// Write all aggregates as pretty-printed JSON
pub fn write_report(aggregates: &[ImageAggregate], path: &Path) -> anyhow::Result<()> {
    let report = Report {
        generated_at: OffsetDateTime::now_utc().format(&Rfc3339)?,
        images: aggregates,
    };

    let file = File::create(path)
        .map_err(|e| anyhow::anyhow!("Failed to create report {}: {}", path.display(), e))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &report)?;
    Ok(())
}
