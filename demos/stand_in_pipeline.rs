use image::{DynamicImage, Rgb, RgbImage};
use jerseyscan::export::write_report;
use jerseyscan::{BoundingBox, Classification, Pipeline, Region, RegionDetector, ShirtClassifier};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

/// Pretends every image shows two shirts, one per half
struct HalvesDetector;

impl RegionDetector for HalvesDetector {
    fn detect(&self, img: &DynamicImage) -> anyhow::Result<Vec<Region>> {
        let (w, h) = (img.width() as f32, img.height() as f32);
        Ok(vec![
            Region { bbox: BoundingBox::new(0.0, 0.0, w / 2.0, h)?, class_id: 0, confidence: 0.9 },
            Region { bbox: BoundingBox::new(w / 2.0, 0.0, w, h)?, class_id: 1, confidence: 0.8 },
        ])
    }
}

/// Names a crop after its strongest colour channel
struct ChannelClassifier;

impl ShirtClassifier for ChannelClassifier {
    fn classify(&self, roi: &DynamicImage) -> anyhow::Result<Option<Classification>> {
        let mut sums = [0u64; 3];
        for pixel in roi.to_rgb8().pixels() {
            for c in 0..3 {
                sums[c] += pixel[c] as u64;
            }
        }
        let total: u64 = sums.iter().sum();
        if total == 0 {
            return Ok(None);
        }

        let (best, amount) = sums
            .iter()
            .enumerate()
            .max_by_key(|(_, amount)| **amount)
            .unwrap_or((0, &0));
        let label = ["Reds-Home", "Greens-Away-1998", "Blues-Home-2004-Retro"][best];
        Ok(Some(Classification {
            label: label.to_string(),
            confidence: *amount as f32 / total as f32,
        }))
    }
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let scratch = tempfile::TempDir::new()?;

    // Use the given image, or draw one red and one blue shirt
    let image_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let path = scratch.path().join("two_shirts.png");
            let img = RgbImage::from_fn(320, 240, |x, _| {
                if x < 160 { Rgb([200, 30, 40]) } else { Rgb([20, 40, 210]) }
            });
            img.save(&path)?;
            println!("Created {}", path.display());
            path
        }
    };

    let pipeline = Pipeline::new(Arc::new(HalvesDetector), Arc::new(ChannelClassifier))
        .with_verbose(true)
        .with_debug(scratch.path().join("crops"))?;
    let aggregate = pipeline.process_image(&image_path)?;

    println!("\n=== Results ===");
    for (team, records) in aggregate.teams() {
        for record in records {
            println!(
                "  {} conf={:.2} year={} other={}",
                team,
                record.confidence(),
                record.year().unwrap_or("-"),
                record.other_data().unwrap_or("-"),
            );
        }
    }
    if let Some((team, count)) = aggregate.top_team() {
        println!("Most frequent team: {} (x{})", team, count);
    }

    let report = scratch.path().join("report.json");
    write_report(std::slice::from_ref(&aggregate), &report)?;
    println!("\nJSON report:\n{}", std::fs::read_to_string(&report)?);
    Ok(())
}
