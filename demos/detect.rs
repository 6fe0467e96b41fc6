//! Text Region Detection Example
//!
//! This example runs the tiled segmentation detector over one or more page
//! images and reports the text boxes and separator lines it finds.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example detect -- [OPTIONS] --model-path <MODEL> <IMAGES>...
//! ```
//!
//! # Arguments
//!
//! * `-m, --model-path` - Path to the segmentation model file
//! * `-c, --config` - Optional JSON detection configuration
//! * `-o, --output-dir` - Directory to save heatmaps, overlays and JSON results
//! * `-d, --device` - Device to use for inference (e.g., 'cpu', 'cuda', 'cuda:0')
//! * `<IMAGES>...` - Paths to input images to process
//!
//! # Example
//!
//! ```bash
//! cargo run --example detect -- -m craft.onnx -o output/ page1.png page2.png
//! ```

use clap::Parser;
use oar_segdet::core::config::{OrtExecutionProvider, OrtSessionConfig};
use oar_segdet::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn};

/// Command-line arguments for the detection example
#[derive(Parser)]
#[command(name = "detect")]
#[command(about = "Tiled text region and separator line detection")]
struct Args {
    /// Path to the segmentation model file
    #[arg(short, long)]
    model_path: PathBuf,

    /// Paths to input images to process
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// JSON file with a detection configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory to save heatmaps, overlays and JSON results
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Device to use for inference (e.g., 'cpu', 'cuda', 'cuda:0')
    #[arg(short, long, default_value = "cpu")]
    device: String,

    /// Tiles per model call; overrides the configuration file
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Session pool size for concurrent inference (default: 1)
    #[arg(long, default_value = "1")]
    session_pool_size: usize,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn parse_device(device: &str) -> Result<OrtExecutionProvider, Box<dyn std::error::Error>> {
    match device {
        "cpu" => Ok(OrtExecutionProvider::CPU),
        "cuda" => Ok(OrtExecutionProvider::CUDA {
            device_id: Some(0),
            gpu_mem_limit: None,
        }),
        other => match other.strip_prefix("cuda:") {
            Some(id) => Ok(OrtExecutionProvider::CUDA {
                device_id: Some(id.parse()?),
                gpu_mem_limit: None,
            }),
            None => Err(format!("unknown device '{other}'").into()),
        },
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging
    init_tracing();

    let args = Args::parse();

    info!("Text Region Detection Example");

    if !args.model_path.exists() {
        error!("Model file not found: {}", args.model_path.display());
        return Err("Model file not found".into());
    }

    // Filter out non-existent image files and log errors for missing files
    let existing_images: Vec<PathBuf> = args
        .images
        .iter()
        .filter(|path| {
            let exists = path.exists();
            if !exists {
                error!("Image file not found: {}", path.display());
            }
            exists
        })
        .cloned()
        .collect();

    if existing_images.is_empty() {
        error!("No valid image files found");
        return Err("No valid image files found".into());
    }

    let mut config = match &args.config {
        Some(path) => DetectionConfig::from_json_file(path)?,
        None => DetectionConfig::default(),
    };
    if let Some(batch_size) = args.batch_size {
        config = config.with_batch_size(batch_size);
    }

    info!("Using device: {}", args.device);
    let provider = parse_device(&args.device)?;
    if provider != OrtExecutionProvider::CPU && !cfg!(feature = "cuda") {
        warn!("Built without the 'cuda' feature; session creation will fail for GPU providers.");
    }

    if args.verbose {
        info!("Detection Configuration:");
        info!("  Batch size: {}", config.batch_size);
        info!(
            "  Tile size: {}x{}",
            config.tiling.tile_width, config.tiling.tile_height
        );
        info!("  Text threshold: {}", config.boxes.text_threshold);
        info!("  Low text threshold: {}", config.boxes.low_text_threshold);
        info!("  Line threshold: {}", config.lines.line_threshold);
    }

    let detector = TextRegionDetector::builder()
        .config(config)
        .session_pool_size(args.session_pool_size)
        .ort_session(OrtSessionConfig::new().with_execution_providers(vec![provider]))
        .build(&args.model_path)?;
    info!("Detector built with model '{}'", detector.model_name());

    info!("Processing {} images...", existing_images.len());
    let images = load_images_batch(&existing_images)?;
    if args.verbose {
        for (path, img) in existing_images.iter().zip(images.iter()) {
            info!(
                "Loaded image: {} ({}x{})",
                path.display(),
                img.width(),
                img.height()
            );
        }
    }

    let start = Instant::now();
    let results = detector.predict(&images)?;
    let duration = start.elapsed();
    info!(
        "Detection completed in {:.2}ms",
        duration.as_secs_f64() * 1000.0
    );

    for (idx, (image_path, result)) in existing_images.iter().zip(results.iter()).enumerate() {
        info!("=== Results for image {} ===", idx + 1);
        info!("Image: {}", image_path.display());
        info!("{result}");
        if result.is_empty() {
            warn!("No text regions or lines found in this image");
        }
        if args.verbose {
            for (i, b) in result.boxes.iter().enumerate() {
                info!(
                    "  Box #{}: ({:.0}, {:.0})-({:.0}, {:.0}) confidence {:.2}",
                    i + 1,
                    b.x_min,
                    b.y_min,
                    b.x_max,
                    b.y_max,
                    b.confidence
                );
            }
        }
    }

    if let Some(output_dir) = &args.output_dir {
        std::fs::create_dir_all(output_dir)?;
        info!("Saving outputs to: {}", output_dir.display());

        for ((image_path, image), result) in existing_images
            .iter()
            .zip(images.iter())
            .zip(results.iter())
        {
            let stem = image_path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("unknown");
            save_outputs(output_dir, stem, image, result)?;
        }
    }

    Ok(())
}

fn save_outputs(
    output_dir: &Path,
    stem: &str,
    image: &image::DynamicImage,
    result: &DetectionResult,
) -> Result<(), Box<dyn std::error::Error>> {
    let json_path = output_dir.join(format!("{stem}_detection.json"));
    std::fs::write(&json_path, serde_json::to_string_pretty(result)?)?;
    info!("  Saved: {}", json_path.display());

    let region_path = output_dir.join(format!("{stem}_region.png"));
    result.region_heatmap_image.save(&region_path)?;
    let affinity_path = output_dir.join(format!("{stem}_affinity.png"));
    result.affinity_heatmap_image.save(&affinity_path)?;
    info!(
        "  Saved: {} and {}",
        region_path.display(),
        affinity_path.display()
    );

    #[cfg(feature = "visualization")]
    {
        use oar_segdet::utils::visualization::{
            VisualizationConfig, create_detection_visualization, save_visualization,
        };
        let visualized =
            create_detection_visualization(image, result, &VisualizationConfig::default());
        save_visualization(&visualized, &output_dir.join(format!("{stem}_overlay.png")))?;
    }
    #[cfg(not(feature = "visualization"))]
    let _ = image;

    Ok(())
}
