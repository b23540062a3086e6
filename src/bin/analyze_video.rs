use clap::Parser;
use deepfake_detector::config::AnalyzerConfig;
use deepfake_detector::services::analysis::{AnalysisError, AnalysisSettings, DeepfakeAnalyzer};
use deepfake_detector::services::classifier::OnnxClassifier;
use deepfake_detector::services::decoder::FfmpegFrameSource;
use dotenvy::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Run the deepfake analysis on a local video and print the verdict as JSON
#[derive(Parser, Debug)]
#[command(name = "analyze_video", version, about)]
struct Args {
    /// Video file to analyze
    video: PathBuf,

    /// ONNX classifier weights (defaults to MODEL_PATH)
    #[arg(long)]
    model: Option<PathBuf>,

    /// Number of frames to sample (defaults to FRAMES_TO_SAMPLE)
    #[arg(long)]
    frames: Option<usize>,

    /// Classifier input resolution (defaults to MODEL_INPUT_SIZE)
    #[arg(long)]
    input_size: Option<u32>,

    /// Mean confidence above which the video is FAKE (defaults to FAKE_THRESHOLD)
    #[arg(long)]
    threshold: Option<f64>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "analyze_video=info,deepfake_detector=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let mut config = AnalyzerConfig::from_env();
    if let Some(model) = args.model {
        config.model_path = model;
    }
    if let Some(frames) = args.frames.filter(|f| *f > 0) {
        config.frames_to_sample = frames;
    }
    if let Some(size) = args.input_size.filter(|s| *s > 0) {
        config.input_size = size;
    }
    if let Some(threshold) = args.threshold {
        config.fake_threshold = threshold;
    }

    if !args.video.is_file() {
        anyhow::bail!("{} is not a file", args.video.display());
    }

    info!("🧠 Loading model from {}", config.model_path.display());
    let classifier = OnnxClassifier::load(&config.model_path, config.input_size)?;

    let analyzer = DeepfakeAnalyzer::new(
        Arc::new(FfmpegFrameSource::new(
            config.ffmpeg_bin.clone(),
            config.ffprobe_bin.clone(),
        )),
        Arc::new(classifier),
        AnalysisSettings::from(&config),
    );

    info!("🎞️  Analyzing {}", args.video.display());
    match analyzer.analyze(&args.video).await {
        Ok(verdict) => {
            let json = if args.pretty {
                serde_json::to_string_pretty(&verdict)?
            } else {
                serde_json::to_string(&verdict)?
            };
            println!("{}", json);
            Ok(())
        }
        Err(AnalysisError::NoFramesProcessed) => {
            error!("❌ No frames could be processed");
            println!("{}", serde_json::json!({ "error": "No frames could be processed" }));
            std::process::exit(2);
        }
        Err(e) => Err(e.into()),
    }
}
