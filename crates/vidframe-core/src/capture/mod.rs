pub mod ffmpeg;

use std::path::{Path, PathBuf};

use anyhow::Result;
use thiserror::Error;

use crate::video::VideoFrame;

pub use ffmpeg::FfmpegFrameCapture;

/// File extensions the ffmpeg backend is expected to handle.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mov", "m4v", "flv", "mp4", "3gp", "avi", "mpg", "mpeg", "wmv",
];

/// Frames closer together than this collapse to a single capture.
pub const DEFAULT_MIN_FRAME_INTERVAL_MILLIS: u64 = 500;

/// Something that can pull still frames out of a video file.
pub trait FrameCapture {
    /// Capture up to `num_frames` frames from `file`, in capture order.
    ///
    /// Fewer frames than requested may be returned, e.g. for short videos.
    /// A file that cannot be opened or decoded is an error, never an empty result.
    fn capture_frames(&self, file: &Path, num_frames: u32) -> Result<Vec<VideoFrame>>;

    /// Duration of `file` as learned while capturing from it, if the backend
    /// has one.
    fn known_duration_millis(&self, _file: &Path) -> Option<u64> {
        None
    }
}

/// Classified capture failures. Returned wrapped in `anyhow::Error`;
/// use `downcast_ref::<CaptureError>()` to inspect.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("frame count must be at least 1")]
    ZeroFrames,
    #[error("video file does not exist: {}", .0.display())]
    NotFound(PathBuf),
    #[error("video file previously failed to decode: {}", .0.display())]
    KnownBad(PathBuf),
    #[error("could not read video metadata from {}: {reason}", .path.display())]
    Probe { path: PathBuf, reason: String },
}

/// Whether `path` carries one of the [`VIDEO_EXTENSIONS`], ignoring case.
pub fn is_supported_video(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            VIDEO_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Offsets at which to grab frames: `num_frames` evenly spaced from the start,
/// or a single frame at 0 when that spacing would fall below `min_interval_millis`.
pub fn plan_timestamps(duration_millis: u64, num_frames: u32, min_interval_millis: u64) -> Vec<u64> {
    if duration_millis == 0 || num_frames == 0 {
        return Vec::new();
    }

    let interval = duration_millis / num_frames as u64;
    if interval < min_interval_millis {
        return vec![0];
    }

    (0..num_frames as u64).map(|i| i * interval).collect()
}
