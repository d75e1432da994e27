use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;

use roicount_core::annotation::infrastructure::imageproc_annotator::{load_font, ImageprocAnnotator};
use roicount_core::counting::domain::frame_result::FrameResult;
use roicount_core::counting::domain::roi_selector::{
    FixedRoiSelector, FullFrameRoiSelector, RoiSelector,
};
use roicount_core::detection::domain::detection_decoder::ScoreLayout;
use roicount_core::detection::domain::label_vocabulary::LabelVocabulary;
use roicount_core::detection::domain::object_detector::ObjectDetector;
use roicount_core::detection::infrastructure::onnx_yolo_detector::{BoxUnits, OnnxYoloDetector};
use roicount_core::pipeline::count_objects_use_case::CountObjectsUseCase;
use roicount_core::pipeline::count_report::CountReport;
use roicount_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use roicount_core::shared::constants::{IMAGE_EXTENSIONS, LABELS_FILE_NAME, MODEL_FILE_NAME};
use roicount_core::shared::counting_config::CountingConfig;
use roicount_core::shared::model_resolver;
use roicount_core::shared::roi::Roi;
use roicount_core::video::domain::video_reader::VideoReader;
use roicount_core::video::domain::video_writer::VideoWriter;
use roicount_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use roicount_core::video::infrastructure::ffmpeg_writer::{FfmpegWriter, MAX_CRF};
use roicount_core::video::infrastructure::image_file_reader::ImageFileReader;
use roicount_core::video::infrastructure::image_file_writer::ImageFileWriter;

/// Progress lines are throttled to one per this many frames.
const LOG_EVERY_FRAMES: usize = 30;

/// Count objects of one class inside a region of interest, frame by frame.
#[derive(Parser)]
#[command(name = "roicount")]
struct Cli {
    /// Input video or image file.
    input: PathBuf,

    /// Annotated output file. Without it frames are counted but not written.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// YOLO ONNX model file. Overrides --model-dir and --model-url.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Class label file, one label per line.
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Directory holding model.onnx and coco.names.
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Download URL used when model.onnx is not found locally.
    #[arg(long)]
    model_url: Option<String>,

    /// Class to count.
    #[arg(long, default_value = "person")]
    label: String,

    /// Minimum detection confidence (0.0-1.0).
    #[arg(long, default_value = "0.5")]
    confidence: f64,

    /// Non-maximum suppression overlap threshold (0.0-1.0).
    #[arg(long, default_value = "0.3")]
    threshold: f64,

    /// Counting region as x,y,width,height. Defaults to the whole frame.
    #[arg(long)]
    roi: Option<Roi>,

    /// Model output carries an objectness column before the class scores.
    #[arg(long)]
    objectness: bool,

    /// Model box columns are normalized to 0-1 instead of input pixels.
    #[arg(long)]
    normalized_boxes: bool,

    /// Fail when --label is not in the label file instead of counting zero.
    #[arg(long)]
    strict_class: bool,

    /// TrueType font for labels. Defaults to a common system font.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Write per-frame counts as JSON to this file.
    #[arg(long)]
    counts_json: Option<PathBuf>,

    /// H.264 CRF quality (0=lossless, 51=worst, default 18).
    #[arg(long)]
    quality: Option<u32>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let config = build_config(&cli);
    config.validate()?;

    let vocabulary = load_vocabulary(&cli)?;
    let detector = build_detector(&cli)?;
    let annotator = ImageprocAnnotator::new(load_font(cli.font.as_deref())?);
    let roi_selector: Box<dyn RoiSelector> = match cli.roi {
        Some(roi) => Box::new(FixedRoiSelector::new(roi)),
        None => {
            log::info!("No --roi given, counting over the whole frame");
            Box::new(FullFrameRoiSelector)
        }
    };

    let mut reader = open_reader(&cli.input);
    let metadata = reader.open(&cli.input)?;

    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancelled);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })?;

    let progress: Box<dyn Fn(usize, usize) -> bool + Send> = Box::new(|current, total| {
        if total > 0 {
            eprint!("\rProcessing frame {current}/{total}");
        } else {
            eprint!("\rProcessing frame {current}");
        }
        true
    });
    let observer: Box<dyn FnMut(&FrameResult) + Send> = Box::new(|result| {
        log::debug!(
            "Frame {}: {} in ROI ({:?})",
            result.frame_index,
            result.count,
            result.status
        );
    });

    let mut use_case = CountObjectsUseCase::new(
        reader,
        detector,
        Box::new(annotator),
        roi_selector,
        vocabulary,
        config.clone(),
    )
    .with_logger(Box::new(StdoutPipelineLogger::new(LOG_EVERY_FRAMES)))
    .with_progress(progress)
    .with_frame_observer(observer)
    .with_cancellation(cancelled)
    .with_count_selection_frame(is_image(&cli.input));

    if let Some(output) = &cli.output {
        use_case = use_case.with_output(open_writer(&cli.input, cli.quality), output);
    }

    let summary = use_case.execute(&metadata)?;
    eprintln!();

    log::info!(
        "Counted {} frames ({:?}), peak {} {} in ROI",
        summary.frames_processed,
        summary.finish_reason,
        summary.peak_count(),
        summary.target_class
    );
    if let Some(output) = &cli.output {
        log::info!("Output written to {}", output.display());
    }
    if let Some(path) = &cli.counts_json {
        CountReport::new(Some(cli.input.as_path()), &config, &summary).write_to(path)?;
        log::info!("Counts written to {}", path.display());
    }
    Ok(())
}

fn build_config(cli: &Cli) -> CountingConfig {
    CountingConfig {
        target_class: cli.label.clone(),
        confidence_threshold: cli.confidence,
        overlap_threshold: cli.threshold,
        score_layout: if cli.objectness {
            ScoreLayout::WithObjectness
        } else {
            ScoreLayout::ClassScores
        },
        strict_class: cli.strict_class,
    }
}

fn load_vocabulary(cli: &Cli) -> Result<LabelVocabulary, Box<dyn std::error::Error>> {
    let path = match (&cli.labels, &cli.model_dir) {
        (Some(path), _) => path.clone(),
        (None, Some(dir)) => dir.join(LABELS_FILE_NAME),
        (None, None) => return Err("A label file is required: pass --labels or --model-dir".into()),
    };
    let vocabulary = LabelVocabulary::from_file(&path)?;
    log::info!("Loaded {} labels from {}", vocabulary.len(), path.display());
    Ok(vocabulary)
}

fn build_detector(cli: &Cli) -> Result<Box<dyn ObjectDetector>, Box<dyn std::error::Error>> {
    let model_path = match &cli.model {
        Some(path) => path.clone(),
        None => {
            log::info!("Resolving model: {MODEL_FILE_NAME}");
            let path = model_resolver::resolve(
                MODEL_FILE_NAME,
                cli.model_url.as_deref(),
                cli.model_dir.as_deref(),
                Some(Box::new(download_progress)),
            )?;
            eprintln!();
            path
        }
    };

    let box_units = if cli.normalized_boxes {
        BoxUnits::Normalized
    } else {
        BoxUnits::InputPixels
    };
    Ok(Box::new(OnnxYoloDetector::new(&model_path, box_units)?))
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    if let Some(model) = &cli.model {
        if !model.exists() {
            return Err(format!("Model file not found: {}", model.display()).into());
        }
    }
    if let Some(q) = cli.quality {
        if q > MAX_CRF {
            return Err(format!("Quality must be between 0 and {MAX_CRF}, got {q}").into());
        }
    }
    if let Some(output) = &cli.output {
        if is_image(&cli.input) && !is_image(output) {
            return Err(format!(
                "Output for an image input must be an image file, got {}",
                output.display()
            )
            .into());
        }
    }
    if cli.quality.is_some() && is_image(&cli.input) {
        log::warn!("--quality only applies to video output, ignoring");
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn open_reader(input: &Path) -> Box<dyn VideoReader> {
    if is_image(input) {
        Box::new(ImageFileReader::new())
    } else {
        Box::new(FfmpegReader::new())
    }
}

fn open_writer(input: &Path, quality: Option<u32>) -> Box<dyn VideoWriter> {
    if is_image(input) {
        return Box::new(ImageFileWriter::new());
    }
    match quality {
        Some(crf) => Box::new(FfmpegWriter::new().with_crf(crf)),
        None => Box::new(FfmpegWriter::new()),
    }
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading detection model... {pct}%");
    } else {
        eprint!("\rDownloading detection model... {downloaded} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("roicount").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["walkers.mp4"]);
        let config = build_config(&cli);
        assert_eq!(config, CountingConfig::default());
        assert!(cli.roi.is_none());
        assert!(cli.output.is_none());
    }

    #[test]
    fn test_roi_and_objectness_flags() {
        let cli = parse(&[
            "walkers.mp4",
            "--roi",
            "10,20,300,200",
            "--objectness",
            "--label",
            "car",
        ]);
        assert_eq!(cli.roi, Some(Roi::new(10, 20, 300, 200).unwrap()));
        let config = build_config(&cli);
        assert_eq!(config.score_layout, ScoreLayout::WithObjectness);
        assert_eq!(config.target_class, "car");
    }

    #[rstest]
    #[case::too_few("1,2,3")]
    #[case::empty_area("0,0,0,10")]
    #[case::not_numbers("a,b,c,d")]
    fn test_bad_roi_rejected(#[case] roi: &str) {
        let args = ["roicount", "walkers.mp4", "--roi", roi];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("walkers.mp4");
        std::fs::write(&input, b"").unwrap();
        let input = input.to_str().unwrap();

        assert!(validate(&parse(&[input])).is_ok());
        assert!(validate(&parse(&[input, "--quality", "52"])).is_err());

        let config = |args: &[&str]| build_config(&parse(args)).validate();
        assert!(config(&[input]).is_ok());
        assert!(config(&[input, "--confidence", "1.5"]).is_err());
        assert!(config(&[input, "--threshold", "1.2"]).is_err());
    }

    #[test]
    fn test_validate_missing_input() {
        assert!(validate(&parse(&["/nonexistent/walkers.mp4"])).is_err());
    }

    #[test]
    fn test_image_input_needs_image_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("street.jpg");
        std::fs::write(&input, b"").unwrap();
        let input = input.to_str().unwrap();

        assert!(validate(&parse(&[input, "-o", "out.png"])).is_ok());
        assert!(validate(&parse(&[input, "-o", "out.mp4"])).is_err());
    }

    #[rstest]
    #[case("photo.JPG", true)]
    #[case("frame.png", true)]
    #[case("clip.mp4", false)]
    #[case("noext", false)]
    fn test_is_image(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(is_image(Path::new(path)), expected);
    }
}
