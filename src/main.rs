use clap::Parser;
use log::{info, warn, LevelFilter};
use std::path::PathBuf;
use std::sync::Arc;

use jerseyscan::detection::{YoloClassifier, YoloDetector};
use jerseyscan::export::{save_annotated, write_report, XlsxExporter};
use jerseyscan::{classify_images, CropExtractor, FileLoader, Pipeline};

#[derive(Parser)]
#[command(name = "jerseyscan")]
#[command(about = "Find team shirts in a folder of photos and tally them per image")]
struct Cli {
    /// Directory with input photos
    #[arg(value_name = "INPUT_DIR", default_value = "input_images")]
    input_dir: PathBuf,

    /// Directory for generated files
    #[arg(long, value_name = "DIR", default_value = "output_images")]
    output_dir: PathBuf,

    /// Directory holding the model files
    #[arg(long, value_name = "DIR", default_value = "models")]
    models_dir: PathBuf,

    /// Clothing detector model file name (inside the models directory)
    #[arg(long)]
    detector: Option<String>,

    /// Shirt classifier model file name (inside the models directory)
    #[arg(long)]
    classifier: Option<String>,

    /// Classifier label file, one team label per line (inside the models directory)
    #[arg(long)]
    labels: Option<String>,

    /// Minimum detector confidence
    #[arg(long, default_value_t = 0.4)]
    detect_conf: f32,

    /// Minimum classifier confidence
    #[arg(long, default_value_t = 0.2)]
    classify_conf: f32,

    /// Write an xlsx workbook with thumbnails (relative paths land in the output dir)
    #[arg(long, value_name = "FILE")]
    xlsx: Option<PathBuf>,

    /// Write a JSON report (relative paths land in the output dir)
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,

    /// Save a copy of each image with the detected boxes drawn in the output dir
    #[arg(long)]
    annotate: bool,

    /// Save every classified crop to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Only run the detector and save every detected region to the output dir
    #[arg(long, conflicts_with = "classify_only")]
    detect_only: bool,

    /// Only run the classifier, on each whole image
    #[arg(long)]
    classify_only: bool,

    /// Number of images processed in parallel
    #[arg(short, long, default_value_t = 1)]
    jobs: usize,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let level = if args.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let mut loader = FileLoader::new()
        .with_input_dir(&args.input_dir)
        .with_output_dir(&args.output_dir)
        .with_models_dir(&args.models_dir);
    if let Some(name) = args.detector {
        loader.detector_model_name = name;
    }
    if let Some(name) = args.classifier {
        loader.classifier_model_name = name;
    }
    if let Some(name) = args.labels {
        loader.labels_name = name;
    }

    let images = loader.input_images()?;
    info!("Input images: {} ({} files)", loader.input_dir.display(), images.len());

    if args.detect_only {
        let detector = YoloDetector::load(&loader.detector_model_path())?.with_confidence(args.detect_conf);
        info!("Clothes model: {}", loader.detector_model_path().display());

        let output_dir = loader.ensure_output_dir()?.to_path_buf();
        let crops = CropExtractor::new(Arc::new(detector)).run(&images, &output_dir);
        println!("\n{} crops written to {}", crops.len(), output_dir.display());
        return Ok(());
    }

    let classifier = YoloClassifier::load(&loader.classifier_model_path(), &loader.labels_path())?
        .with_confidence(args.classify_conf);
    info!(
        "Shirt model: {} ({} classes)",
        loader.classifier_model_path().display(),
        classifier.names().len()
    );

    if args.classify_only {
        println!("\n=== Shirt Classification Results ===");
        for (path, classification) in classify_images(&classifier, &images) {
            match classification {
                Some(c) => println!("{}: {} ({:.3})", path.display(), c.label, c.confidence),
                None => println!("{}: no confident class", path.display()),
            }
        }
        return Ok(());
    }

    let detector = YoloDetector::load(&loader.detector_model_path())?.with_confidence(args.detect_conf);
    info!("Clothes model: {}", loader.detector_model_path().display());

    let mut pipeline = Pipeline::new(Arc::new(detector), Arc::new(classifier))
        .with_verbose(args.verbose)
        .with_jobs(args.jobs);
    if let Some(debug_dir) = args.debug_out {
        pipeline = pipeline.with_debug(debug_dir)?;
    }

    info!("Starting to process images...");
    let results = pipeline.run(&images);
    info!("All images processed");

    println!("\n=== Team Detection Results ===");
    println!("Images processed: {} of {}", results.len(), images.len());
    for aggregate in &results {
        println!("\n{}", aggregate.image_path().display());
        if aggregate.is_empty() {
            println!("  No teams detected.");
            continue;
        }
        for (team, records) in aggregate.teams() {
            let best = records
                .iter()
                .map(|r| r.confidence())
                .fold(0.0f32, f32::max);
            println!("  {} x{} (best confidence: {:.3})", team, records.len(), best);
        }
    }

    if args.xlsx.is_some() || args.json.is_some() || args.annotate {
        let output_dir = loader.ensure_output_dir()?.to_path_buf();

        if args.annotate {
            for aggregate in &results {
                match save_annotated(aggregate, &output_dir) {
                    Ok(path) => info!("Annotated image written to {}", path.display()),
                    Err(e) => warn!("Could not annotate {}: {:#}", aggregate.image_path().display(), e),
                }
            }
        }

        if let Some(xlsx) = args.xlsx {
            let path = output_dir.join(xlsx);
            XlsxExporter::new().export(&results, &path)?;
            println!("\nWorkbook written to {}", path.display());
        }
        if let Some(json) = args.json {
            let path = output_dir.join(json);
            write_report(&results, &path)?;
            println!("Report written to {}", path.display());
        }
    }

    Ok(())
}
