use std::env;
use std::path::PathBuf;

/// Runtime configuration for the analysis service
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Bind address (default: "127.0.0.1")
    pub host: String,

    /// Listening port (default: 5001)
    pub port: u16,

    /// Classifier weights in ONNX format (default: "./models/meso4_df.onnx")
    pub model_path: PathBuf,

    /// Working directory for staged uploads (default: "./uploads")
    pub upload_dir: PathBuf,

    /// Number of evenly spaced frames to sample per video (default: 30)
    pub frames_to_sample: usize,

    /// Square input resolution expected by the classifier (default: 256)
    pub input_size: u32,

    /// Mean confidence above which a video is labelled FAKE (default: 50.0)
    pub fake_threshold: f64,

    /// Maximum upload body size in bytes (default: 256 MB)
    pub max_upload_size: usize,

    /// ffmpeg executable (default: "ffmpeg")
    pub ffmpeg_bin: String,

    /// ffprobe executable (default: "ffprobe")
    pub ffprobe_bin: String,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5001,
            model_path: PathBuf::from("./models/meso4_df.onnx"),
            upload_dir: PathBuf::from("./uploads"),
            frames_to_sample: 30,
            input_size: 256,
            fake_threshold: 50.0,
            max_upload_size: 256 * 1024 * 1024, // 256 MB
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
        }
    }
}

impl AnalyzerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup, falling back to defaults
    /// for anything missing or unparsable.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();

        Self {
            host: lookup("HOST").unwrap_or(default.host),

            port: lookup("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.port),

            model_path: lookup("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(default.model_path),

            upload_dir: lookup("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.upload_dir),

            frames_to_sample: lookup("FRAMES_TO_SAMPLE")
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(default.frames_to_sample),

            input_size: lookup("MODEL_INPUT_SIZE")
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(default.input_size),

            fake_threshold: lookup("FAKE_THRESHOLD")
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .unwrap_or(default.fake_threshold),

            max_upload_size: lookup("MAX_UPLOAD_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_upload_size),

            ffmpeg_bin: lookup("FFMPEG_BIN").unwrap_or(default.ffmpeg_bin),

            ffprobe_bin: lookup("FFPROBE_BIN").unwrap_or(default.ffprobe_bin),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
