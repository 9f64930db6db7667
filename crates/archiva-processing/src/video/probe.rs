//! Video probe - duration and dimensions via ffprobe

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Whatever ffprobe could tell us. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoMetadata {
    pub duration_seconds: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub codec: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VideoProbe {
    ffprobe_path: String,
}

impl VideoProbe {
    pub fn new(ffprobe_path: impl Into<String>) -> Result<Self> {
        let ffprobe_path = ffprobe_path.into();
        if ffprobe_path.is_empty()
            || ffprobe_path.contains("..")
            || !ffprobe_path.chars().all(|c| {
                c.is_alphanumeric() || c == '/' || c == '-' || c == '_' || c == '.' || c == '\\'
            })
        {
            return Err(anyhow!("Invalid ffprobe_path: contains unsafe characters"));
        }
        Ok(Self { ffprobe_path })
    }

    /// Probe in-memory video bytes by spilling them to a temporary file.
    pub async fn probe(&self, data: &[u8]) -> Result<VideoMetadata> {
        let temp_file = tempfile::NamedTempFile::new()?;
        tokio::fs::write(temp_file.path(), data).await?;
        self.probe_path(temp_file.path()).await
    }

    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffprobe",
        process.executable.path = %self.ffprobe_path,
        ffmpeg.operation = "probe"
    ))]
    pub async fn probe_path(&self, path: &Path) -> Result<VideoMetadata> {
        let start = std::time::Instant::now();

        let output = tokio::time::timeout(
            PROBE_TIMEOUT,
            Command::new(&self.ffprobe_path)
                .args([
                    "-v",
                    "quiet",
                    "-print_format",
                    "json",
                    "-show_format",
                    "-show_streams",
                    "-select_streams",
                    "v:0",
                ])
                .arg(path)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| anyhow!("ffprobe timed out after {:?}", PROBE_TIMEOUT))?
        .context("Failed to execute ffprobe")?;

        if !output.status.success() {
            return Err(anyhow!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        let metadata = parse_probe_output(&output.stdout)?;

        tracing::info!(
            duration_ms = start.elapsed().as_millis(),
            video_duration = ?metadata.duration_seconds,
            width = ?metadata.width,
            height = ?metadata.height,
            "Video probe completed"
        );

        Ok(metadata)
    }
}

/// Parse `ffprobe -print_format json` output, tolerating missing fields.
pub(crate) fn parse_probe_output(stdout: &[u8]) -> Result<VideoMetadata> {
    let probe_data: serde_json::Value =
        serde_json::from_slice(stdout).context("Failed to parse ffprobe output")?;

    let stream = &probe_data["streams"][0];
    let format = &probe_data["format"];

    let duration_seconds = format["duration"]
        .as_str()
        .or_else(|| stream["duration"].as_str())
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0);

    let dimension = |key: &str| stream[key].as_u64().and_then(|v| u32::try_from(v).ok());

    Ok(VideoMetadata {
        duration_seconds,
        width: dimension("width"),
        height: dimension("height"),
        codec: stream["codec_name"].as_str().map(String::from),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_unsafe_ffprobe_path() {
        assert!(VideoProbe::new("ffprobe; rm -rf /").is_err());
        assert!(VideoProbe::new("../ffprobe").is_err());
        assert!(VideoProbe::new("/usr/bin/ffprobe").is_ok());
    }

    #[test]
    fn test_parse_full_output() {
        let stdout = br#"{
            "streams": [{"codec_name": "h264", "width": 1920, "height": 1080}],
            "format": {"duration": "12.480000"}
        }"#;
        let metadata = parse_probe_output(stdout).unwrap();
        assert_eq!(metadata.width, Some(1920));
        assert_eq!(metadata.height, Some(1080));
        assert_eq!(metadata.duration_seconds, Some(12.48));
        assert_eq!(metadata.codec.as_deref(), Some("h264"));
    }

    #[test]
    fn test_parse_tolerates_missing_stream() {
        let metadata = parse_probe_output(br#"{"format": {}}"#).unwrap();
        assert_eq!(metadata, VideoMetadata::default());
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(parse_probe_output(b"not json").is_err());
    }

    #[tokio::test]
    async fn test_missing_binary_is_an_error() {
        let probe = VideoProbe::new("/nonexistent/ffprobe-binary").unwrap();
        assert!(probe.probe(b"\x00\x00\x00\x18ftypmp42").await.is_err());
    }
}
