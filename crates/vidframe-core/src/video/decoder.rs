use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use anyhow::{bail, Context, Result};
use image::RgbImage;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

/// Locations of the ffmpeg binaries to shell out to.
#[derive(Debug, Clone)]
pub struct FfmpegTools {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for FfmpegTools {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

/// Video metadata obtained by probing with ffprobe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    pub width: u32,
    pub height: u32,
    /// Container duration. 0 when ffprobe could not determine it.
    pub duration_millis: u64,
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

pub fn probe(tools: &FfmpegTools, path: &Path) -> Result<ProbeResult> {
    info!(?path, "probing video metadata with ffprobe");

    let output = Command::new(&tools.ffprobe)
        .args([
            "-v", "error",
            "-select_streams", "v:0",
            "-show_entries", "stream=width,height:format=duration",
            "-of", "json",
        ])
        .arg(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .with_context(|| format!("failed to run {}: is ffmpeg installed?", tools.ffprobe.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!(%stderr, ?path, "ffprobe failed");
        bail!("ffprobe failed: {}", stderr.trim());
    }

    let result = parse_probe_output(&String::from_utf8_lossy(&output.stdout))?;
    info!(
        width = result.width,
        height = result.height,
        duration_millis = result.duration_millis,
        "probe completed"
    );
    Ok(result)
}

/// Parse ffprobe's JSON output for the first video stream.
pub(crate) fn parse_probe_output(stdout: &str) -> Result<ProbeResult> {
    let parsed: ProbeOutput =
        serde_json::from_str(stdout).context("unexpected ffprobe output")?;

    let Some(stream) = parsed.streams.first() else {
        bail!("no video stream found");
    };
    let (Some(width), Some(height)) = (stream.width, stream.height) else {
        bail!("video stream has no dimensions");
    };
    if width == 0 || height == 0 {
        bail!("invalid video dimensions: {width}x{height}");
    }

    // Duration is a decimal string in seconds, or "N/A" for some streams.
    let duration_millis = match parsed.format.and_then(|f| f.duration) {
        Some(s) => match s.trim().parse::<f64>() {
            Ok(secs) if secs > 0.0 => (secs * 1000.0).round() as u64,
            Ok(_) => 0,
            Err(_) => {
                warn!(duration = %s, "unparseable duration, treating as unknown");
                0
            }
        },
        None => 0,
    };

    Ok(ProbeResult {
        width,
        height,
        duration_millis,
    })
}

/// Decodes a single frame at a given offset by piping raw RGB24 data from the ffmpeg CLI.
pub struct SeekDecoder {
    child: Child,
    width: u32,
    height: u32,
    time_millis: u64,
    frame_bytes: usize,
}

impl SeekDecoder {
    /// Spawn ffmpeg positioned at `time_millis` in `path`.
    pub fn open_at(
        tools: &FfmpegTools,
        path: &Path,
        info: &ProbeResult,
        time_millis: u64,
    ) -> Result<Self> {
        let args = seek_args(path, time_millis);
        debug!(?path, time_millis, "spawning ffmpeg decoder process");

        let child = Command::new(&tools.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn {}: is ffmpeg installed?", tools.ffmpeg.display()))?;

        Ok(Self {
            child,
            width: info.width,
            height: info.height,
            time_millis,
            frame_bytes: (info.width as usize) * (info.height as usize) * 3,
        })
    }

    /// Read the frame from the ffmpeg pipe, or `None` if nothing was decoded at this offset.
    pub fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        let stdout = self
            .child
            .stdout
            .as_mut()
            .context("ffmpeg stdout not available")?;

        let mut buf = vec![0u8; self.frame_bytes];
        let mut read = 0;

        while read < self.frame_bytes {
            match stdout.read(&mut buf[read..]) {
                Ok(0) => {
                    if read == 0 {
                        return self.finish_empty();
                    }
                    error!(
                        read_bytes = read,
                        expected_bytes = self.frame_bytes,
                        time_millis = self.time_millis,
                        "ffmpeg stream ended mid-frame"
                    );
                    bail!(
                        "ffmpeg stream ended mid-frame (read {read}/{} bytes)",
                        self.frame_bytes,
                    );
                }
                Ok(n) => read += n,
                Err(e) => {
                    error!(time_millis = self.time_millis, %e, "failed to read from ffmpeg pipe");
                    return Err(e).context("failed to read from ffmpeg pipe");
                }
            }
        }

        let image = RgbImage::from_raw(self.width, self.height, buf)
            .context("failed to create RgbImage from raw frame data")?;

        debug!(time_millis = self.time_millis, "decoded frame");
        Ok(Some(image))
    }

    /// The pipe closed before any data arrived: either ffmpeg failed, or the
    /// offset lies past the last decodable frame.
    fn finish_empty(&mut self) -> Result<Option<RgbImage>> {
        // Drain stderr before waiting so a chatty ffmpeg cannot block on a full pipe.
        let mut stderr = String::new();
        if let Some(pipe) = self.child.stderr.as_mut() {
            let _ = pipe.read_to_string(&mut stderr);
        }

        let status = self.child.wait().context("failed to wait for ffmpeg")?;
        if status.success() {
            info!(time_millis = self.time_millis, "no frame decoded at offset");
            return Ok(None);
        }

        error!(%status, %stderr, time_millis = self.time_millis, "ffmpeg exited with failure");
        bail!("ffmpeg failed ({status}): {}", stderr.trim());
    }
}

/// ffmpeg arguments for decoding one RGB24 frame at `time_millis`.
///
/// Rotation metadata is ignored and the first video stream is selected so the
/// output has exactly the dimensions ffprobe reported for `v:0`.
fn seek_args(path: &Path, time_millis: u64) -> Vec<OsString> {
    let seek = format!("{}.{:03}", time_millis / 1000, time_millis % 1000);
    let mut args: Vec<OsString> = ["-v", "error", "-noautorotate", "-ss", seek.as_str(), "-i"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(path.as_os_str().to_owned());
    args.extend(
        [
            "-map", "0:v:0",
            "-frames:v", "1",
            "-f", "rawvideo",
            "-pix_fmt", "rgb24",
            "pipe:1",
        ]
        .into_iter()
        .map(OsString::from),
    );
    args
}

impl Drop for SeekDecoder {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_probe_reads_dimensions_and_duration() {
        let out = r#"{
            "programs": [],
            "streams": [{ "width": 1280, "height": 720 }],
            "format": { "duration": "12.345000" }
        }"#;
        let info = parse_probe_output(out).unwrap();
        assert_eq!(
            info,
            ProbeResult {
                width: 1280,
                height: 720,
                duration_millis: 12_345
            }
        );
    }

    #[test]
    fn parse_probe_unknown_duration_is_zero() {
        let out = r#"{ "streams": [{ "width": 640, "height": 480 }], "format": { "duration": "N/A" } }"#;
        assert_eq!(parse_probe_output(out).unwrap().duration_millis, 0);

        let out = r#"{ "streams": [{ "width": 640, "height": 480 }] }"#;
        assert_eq!(parse_probe_output(out).unwrap().duration_millis, 0);
    }

    #[test]
    fn parse_probe_rejects_missing_video_stream() {
        let out = r#"{ "streams": [], "format": { "duration": "3.0" } }"#;
        assert!(parse_probe_output(out).is_err());
    }

    #[test]
    fn parse_probe_rejects_zero_dimensions() {
        let out = r#"{ "streams": [{ "width": 0, "height": 480 }] }"#;
        assert!(parse_probe_output(out).is_err());
    }

    #[test]
    fn seek_args_pin_stream_and_orientation() {
        let args = seek_args(Path::new("/evidence/portrait.mov"), 2_050);
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();

        let pos = |flag: &str| {
            args.iter()
                .position(|a| a == flag)
                .unwrap_or_else(|| panic!("{flag} missing from {args:?}"))
        };
        let input = pos("-i");
        assert!(pos("-noautorotate") < input);
        assert_eq!(args[pos("-ss") + 1], "2.050");
        assert!(pos("-ss") < input);
        assert_eq!(args[input + 1], "/evidence/portrait.mov");
        assert!(pos("-map") > input);
        assert_eq!(args[pos("-map") + 1], "0:v:0");
        assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
    }

    #[test]
    fn parse_probe_rejects_garbage() {
        assert!(parse_probe_output("1920,1080,60/1").is_err());
    }
}
