use anyhow::{Context, Result};
use image::{ImageFormat, RgbImage};
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Random-access frame reader over a video file
#[async_trait::async_trait]
pub trait FrameSource: Send + Sync {
    /// Frame count as reported by the container. May be 0 or inaccurate.
    async fn frame_count(&self, path: &Path) -> Result<u64>;

    /// Decode the frame at an absolute 0-based index.
    ///
    /// `Ok(None)` means the read failed (out of range, corrupt data, ...) and
    /// the frame should be skipped. `Err` is reserved for faults that make
    /// every read impossible, such as the decoder binary being missing.
    async fn read_frame(&self, path: &Path, index: u64) -> Result<Option<RgbImage>>;
}

/// Frame source backed by the `ffprobe` and `ffmpeg` command line tools
pub struct FfmpegFrameSource {
    ffmpeg_bin: String,
    ffprobe_bin: String,
}

impl FfmpegFrameSource {
    pub fn new(ffmpeg_bin: impl Into<String>, ffprobe_bin: impl Into<String>) -> Self {
        Self {
            ffmpeg_bin: ffmpeg_bin.into(),
            ffprobe_bin: ffprobe_bin.into(),
        }
    }
}

impl Default for FfmpegFrameSource {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

#[async_trait::async_trait]
impl FrameSource for FfmpegFrameSource {
    async fn frame_count(&self, path: &Path) -> Result<u64> {
        let output = Command::new(&self.ffprobe_bin)
            .args(["-v", "error"])
            .args(["-select_streams", "v:0"])
            .args([
                "-show_entries",
                "stream=nb_frames,avg_frame_rate,r_frame_rate,duration:format=duration",
            ])
            .args(["-of", "json"])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("failed to execute {}", self.ffprobe_bin))?;

        if !output.status.success() {
            warn!(
                path = %path.display(),
                status = ?output.status,
                "ffprobe could not read container metadata: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Ok(0);
        }

        let count = parse_frame_count(&String::from_utf8_lossy(&output.stdout));
        debug!(path = %path.display(), frames = count, "read frame count");
        Ok(count)
    }

    async fn read_frame(&self, path: &Path, index: u64) -> Result<Option<RgbImage>> {
        let select = format!("select=eq(n\\,{})", index);

        let output = Command::new(&self.ffmpeg_bin)
            .args(["-hide_banner", "-loglevel", "error", "-nostdin"])
            .arg("-i")
            .arg(path)
            .args(["-an", "-sn"])
            .args(["-vf", &select])
            .args(["-frames:v", "1"])
            .args(["-f", "image2pipe", "-vcodec", "png"])
            .arg("pipe:1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("failed to execute {}", self.ffmpeg_bin))?;

        if !output.status.success() {
            debug!(
                index,
                status = ?output.status,
                "ffmpeg could not read frame: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Ok(None);
        }

        Ok(decode_png_frame(&output.stdout, index))
    }
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeStream {
    nb_frames: Option<String>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Frame count from ffprobe's JSON output.
///
/// Uses the stream's `nb_frames` when the container stores it. Containers
/// such as webm and mkv do not, so the count is estimated as duration times
/// frame rate. Anything unreadable is reported as 0.
pub fn parse_frame_count(raw: &str) -> u64 {
    let output: FfprobeOutput = match serde_json::from_str(raw) {
        Ok(output) => output,
        Err(e) => {
            debug!("unreadable ffprobe output: {}", e);
            return 0;
        }
    };

    let Some(stream) = output.streams.first() else {
        return 0;
    };

    if let Some(count) = stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.trim().parse::<u64>().ok())
        .filter(|&n| n > 0)
    {
        return count;
    }

    let duration = stream
        .duration
        .as_deref()
        .and_then(parse_positive)
        .or_else(|| {
            output
                .format
                .as_ref()
                .and_then(|f| f.duration.as_deref())
                .and_then(parse_positive)
        });
    let fps = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_rational)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_rational));

    match (duration, fps) {
        (Some(duration), Some(fps)) => (duration * fps).round() as u64,
        _ => 0,
    }
}

fn parse_positive(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

/// Parse an ffprobe rate such as `30000/1001`. `0/0` yields `None`.
fn parse_rational(raw: &str) -> Option<f64> {
    match raw.trim().split_once('/') {
        Some((num, den)) => {
            let num = parse_positive(num)?;
            let den = parse_positive(den)?;
            Some(num / den)
        }
        None => parse_positive(raw),
    }
}

fn decode_png_frame(bytes: &[u8], index: u64) -> Option<RgbImage> {
    if bytes.is_empty() {
        debug!(index, "no frame data at index");
        return None;
    }

    match image::load_from_memory_with_format(bytes, ImageFormat::Png) {
        Ok(img) => Some(img.to_rgb8()),
        Err(e) => {
            warn!(index, "failed to decode frame: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use std::io::Cursor;

    #[test]
    fn test_frame_count_from_nb_frames() {
        let raw = r#"{
            "streams": [{ "nb_frames": "300", "avg_frame_rate": "30/1", "duration": "10.000000" }],
            "format": { "duration": "10.000000" }
        }"#;
        assert_eq!(parse_frame_count(raw), 300);
    }

    #[test]
    fn test_frame_count_from_duration_when_nb_frames_missing() {
        // webm/mkv: no per-stream count or duration, only the container duration
        let raw = r#"{
            "streams": [{ "avg_frame_rate": "30/1", "r_frame_rate": "30/1" }],
            "format": { "duration": "10.000000" }
        }"#;
        assert_eq!(parse_frame_count(raw), 300);

        let raw = r#"{
            "streams": [{ "nb_frames": "N/A", "avg_frame_rate": "30000/1001", "duration": "5.005000" }]
        }"#;
        assert_eq!(parse_frame_count(raw), 150);
    }

    #[test]
    fn test_frame_count_falls_back_to_r_frame_rate() {
        let raw = r#"{
            "streams": [{ "avg_frame_rate": "0/0", "r_frame_rate": "25/1" }],
            "format": { "duration": "4.0" }
        }"#;
        assert_eq!(parse_frame_count(raw), 100);
    }

    #[test]
    fn test_unknown_frame_count_is_zero() {
        assert_eq!(parse_frame_count(""), 0);
        assert_eq!(parse_frame_count("N/A\n"), 0);
        assert_eq!(parse_frame_count(r#"{ "streams": [] }"#), 0);
        assert_eq!(
            parse_frame_count(r#"{ "streams": [{ "avg_frame_rate": "0/0" }], "format": {} }"#),
            0
        );
        assert_eq!(
            parse_frame_count(r#"{ "streams": [{ "nb_frames": "0", "duration": "N/A" }] }"#),
            0
        );
    }

    #[test]
    fn test_decode_png_frame() {
        let img = RgbImage::from_pixel(3, 2, Rgb([9, 8, 7]));
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();

        let decoded = decode_png_frame(&png, 0).unwrap();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.get_pixel(0, 0), &Rgb([9, 8, 7]));
    }

    #[test]
    fn test_bad_frame_data_is_skipped() {
        assert!(decode_png_frame(&[], 3).is_none());
        assert!(decode_png_frame(b"not a png", 3).is_none());
    }

    #[tokio::test]
    async fn test_missing_binary_is_a_fault() {
        let source = FfmpegFrameSource::new(
            "/nonexistent/ffmpeg-binary",
            "/nonexistent/ffprobe-binary",
        );
        let path = Path::new("video.mp4");
        assert!(source.frame_count(path).await.is_err());
        assert!(source.read_frame(path, 0).await.is_err());
    }
}
