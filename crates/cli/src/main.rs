mod menu;

use std::io;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};

use facefinder_core::dataset::domain::face_dataset_store::FaceDatasetStore;
use facefinder_core::dataset::infrastructure::fs_dataset_repository::{
    FsDatasetRepository, StaleFilePolicy,
};
use facefinder_core::detection::domain::face_detector::FaceDetector;
use facefinder_core::detection::domain::face_matcher::{FaceMatcher, DEFAULT_THRESHOLD};
use facefinder_core::detection::infrastructure::onnx_face_detector::{
    OnnxFaceDetector, DEFAULT_CONFIDENCE,
};
use facefinder_core::pipeline::build_dataset_use_case::{BuildDatasetConfig, BuildDatasetUseCase};
use facefinder_core::pipeline::detection_snapshot::DetectionSnapshotWriter;
use facefinder_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use facefinder_core::settings::Settings;
use facefinder_core::shared::constants::{
    BLAZEFACE_MODEL_NAME, DEFAULT_DATA_DIR, DEFAULT_SETTINGS_FILE, EMBEDDING_MODEL_NAME,
    EMBEDDING_MODEL_URL,
};
use facefinder_core::shared::data_layout::DataLayout;
use facefinder_core::shared::model_resolver;
use facefinder_core::video::infrastructure::ffmpeg_video_source::FfmpegVideoSource;
use facefinder_core::video::infrastructure::image_file_writer::ImageFileWriter;

use menu::MenuOutcome;

/// Build and query a face dataset from videos.
#[derive(Parser)]
#[command(name = "fafi")]
struct Cli {
    /// Data directory holding faces/, video/, out/ and the name index.
    #[arg(long, global = true, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Settings file (default: <data-dir>/settings.json).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(flatten)]
    models: ModelArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Edit settings in the numbered menu, then run (default).
    Menu,
    /// Run once with the saved settings and the given overrides.
    Run(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Store detected faces instead of only recognizing them.
    #[arg(long)]
    training: bool,

    /// Run detection on every Nth frame.
    #[arg(long)]
    fps: Option<u32>,

    /// Input video, relative to <data-dir>/video or absolute.
    #[arg(long)]
    video: Option<String>,

    /// Identity to train (default: the video file stem).
    #[arg(long)]
    identity: Option<String>,

    /// Log each recognized face.
    #[arg(long)]
    show: Option<bool>,

    /// Save annotated frames to <data-dir>/out.
    #[arg(long)]
    save_detection: Option<bool>,

    /// Keep encoding files beyond the in-memory count when saving.
    #[arg(long)]
    keep_stale: bool,
}

#[derive(Args)]
struct ModelArgs {
    /// BlazeFace ONNX model (default: looked up in the model cache).
    #[arg(long, global = true)]
    detector_model: Option<PathBuf>,

    /// ArcFace ONNX model (default: cached or downloaded).
    #[arg(long, global = true)]
    encoder_model: Option<PathBuf>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, global = true, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f64,

    /// Minimum cosine similarity to recognize a face (0.0-1.0).
    #[arg(long, global = true, default_value_t = DEFAULT_THRESHOLD)]
    threshold: f64,
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
    validate(&cli.models)?;

    let layout = DataLayout::new(&cli.data_dir);
    let settings_path = cli
        .settings
        .clone()
        .unwrap_or_else(|| layout.root().join(DEFAULT_SETTINGS_FILE));
    let settings = Settings::load_or_default(&settings_path)?;

    match cli.command {
        None | Some(Commands::Menu) => {
            let stdin = io::stdin();
            let outcome = menu::run_menu(
                settings,
                &mut stdin.lock(),
                &mut io::stdout(),
                |s: &Settings| s.save(&settings_path).map_err(Into::into),
            )?;
            match outcome {
                MenuOutcome::Start(settings) => {
                    settings.save(&settings_path)?;
                    run_pipeline(&layout, &settings, None, StaleFilePolicy::Prune, &cli.models)
                }
                MenuOutcome::Quit => Ok(()),
            }
        }
        Some(Commands::Run(args)) => {
            let settings = apply_overrides(settings, &args);
            let policy = if args.keep_stale {
                StaleFilePolicy::Keep
            } else {
                StaleFilePolicy::Prune
            };
            run_pipeline(
                &layout,
                &settings,
                args.identity.as_deref(),
                policy,
                &cli.models,
            )
        }
    }
}

fn apply_overrides(mut settings: Settings, args: &RunArgs) -> Settings {
    if args.training {
        settings.training = true;
    }
    if let Some(fps) = args.fps {
        settings.fps = fps;
    }
    if let Some(video) = &args.video {
        settings.video_name = video.clone();
    }
    if let Some(show) = args.show {
        settings.show = show;
    }
    if let Some(save_detection) = args.save_detection {
        settings.save_detection = save_detection;
    }
    settings
}

fn run_pipeline(
    layout: &DataLayout,
    settings: &Settings,
    identity: Option<&str>,
    policy: StaleFilePolicy,
    models: &ModelArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = BuildDatasetConfig::from_settings(settings, layout, identity)?;
    if !config.video_path.exists() {
        return Err(format!("Input video not found: {}", config.video_path.display()).into());
    }

    let detector = build_detector(models)?;
    let store = FaceDatasetStore::new(Box::new(FsDatasetRepository::with_policy(
        layout.clone(),
        policy,
    )));
    let snapshots = settings.save_detection.then(|| {
        DetectionSnapshotWriter::new(Box::new(ImageFileWriter::new()), layout.out_dir())
    });

    let mut use_case = BuildDatasetUseCase::new(
        Box::new(FfmpegVideoSource::new()),
        detector,
        store,
        FaceMatcher::new(models.threshold),
        snapshots,
        Box::new(StdoutPipelineLogger::default()),
    );
    let report = use_case.execute(&config)?;

    log::info!(
        "Done: {} frames read, {} sampled, {} faces detected, {} recognized, {} encodings added",
        report.sampler.frames_read,
        report.sampler.frames_sampled,
        report.faces_detected,
        report.faces_recognized,
        report.encodings_added
    );
    if report.snapshots_saved > 0 {
        log::info!(
            "Saved {} snapshots to {}",
            report.snapshots_saved,
            layout.out_dir().display()
        );
    }
    Ok(())
}

fn build_detector(models: &ModelArgs) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    let detector_model =
        resolve_model(models.detector_model.as_deref(), BLAZEFACE_MODEL_NAME, None)?;
    let encoder_model = resolve_model(
        models.encoder_model.as_deref(),
        EMBEDDING_MODEL_NAME,
        Some(EMBEDDING_MODEL_URL),
    )?;
    Ok(Box::new(OnnxFaceDetector::new(
        &detector_model,
        &encoder_model,
        models.confidence,
    )?))
}

fn resolve_model(
    explicit: Option<&Path>,
    name: &str,
    url: Option<&str>,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(format!("Model file not found: {}", path.display()).into());
        }
        return Ok(path.to_path_buf());
    }
    log::info!("Resolving model: {name}");
    let path = model_resolver::resolve(name, url, None, Some(Box::new(download_progress)))?;
    Ok(path)
}

fn validate(models: &ModelArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=1.0).contains(&models.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            models.confidence
        )
        .into());
    }
    if !(0.0..=1.0).contains(&models.threshold) {
        return Err(format!(
            "Threshold must be between 0.0 and 1.0, got {}",
            models.threshold
        )
        .into());
    }
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face model... {pct}%");
    } else {
        eprint!("\rDownloading face model... {downloaded} bytes");
    }
}
