use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::{plan_timestamps, CaptureError, FrameCapture, DEFAULT_MIN_FRAME_INTERVAL_MILLIS};
use crate::video::decoder::{self, FfmpegTools, ProbeResult, SeekDecoder};
use crate::video::VideoFrame;

/// Captures evenly spaced frames by shelling out to ffprobe and ffmpeg.
///
/// Files that fail to decode are remembered by name and rejected immediately
/// on later calls to the same instance.
pub struct FfmpegFrameCapture {
    tools: FfmpegTools,
    min_frame_interval_millis: u64,
    known_bad: Mutex<HashSet<String>>,
    durations: Mutex<HashMap<PathBuf, u64>>,
}

impl FfmpegFrameCapture {
    pub fn new(tools: FfmpegTools) -> Self {
        Self {
            tools,
            min_frame_interval_millis: DEFAULT_MIN_FRAME_INTERVAL_MILLIS,
            known_bad: Mutex::new(HashSet::new()),
            durations: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_min_frame_interval(mut self, millis: u64) -> Self {
        self.min_frame_interval_millis = millis;
        self
    }

    pub fn min_frame_interval_millis(&self) -> u64 {
        self.min_frame_interval_millis
    }

    /// Probe a video without decoding any frames.
    pub fn probe(&self, file: &Path) -> Result<ProbeResult> {
        decoder::probe(&self.tools, file)
    }

    pub fn is_known_bad(&self, file: &Path) -> bool {
        self.bad_set().contains(&file_key(file))
    }

    /// Forget every file previously marked as undecodable.
    pub fn clear_known_bad(&self) {
        let mut set = self.bad_set();
        info!(count = set.len(), "clearing known-bad video list");
        set.clear();
    }

    fn mark_known_bad(&self, file: &Path) {
        warn!(?file, "marking video as known-bad");
        self.bad_set().insert(file_key(file));
    }

    fn bad_set(&self) -> MutexGuard<'_, HashSet<String>> {
        lock(&self.known_bad)
    }

    fn grab(&self, file: &Path, info: &ProbeResult, time_millis: u64) -> Result<Option<VideoFrame>> {
        let mut decoder = SeekDecoder::open_at(&self.tools, file, info, time_millis)?;
        let image = decoder.read_frame()?;
        Ok(image.map(|image| VideoFrame::new(image, time_millis)))
    }
}

impl Default for FfmpegFrameCapture {
    fn default() -> Self {
        Self::new(FfmpegTools::default())
    }
}

impl FrameCapture for FfmpegFrameCapture {
    fn capture_frames(&self, file: &Path, num_frames: u32) -> Result<Vec<VideoFrame>> {
        if num_frames == 0 {
            return Err(CaptureError::ZeroFrames.into());
        }
        if !file.is_file() {
            return Err(CaptureError::NotFound(file.to_path_buf()).into());
        }
        if self.is_known_bad(file) {
            return Err(CaptureError::KnownBad(file.to_path_buf()).into());
        }

        let info = match self.probe(file) {
            Ok(info) => info,
            Err(e) => {
                self.mark_known_bad(file);
                return Err(CaptureError::Probe {
                    path: file.to_path_buf(),
                    reason: format!("{e:#}"),
                }
                .into());
            }
        };

        lock(&self.durations).insert(file.to_path_buf(), info.duration_millis);

        let timestamps = plan_timestamps(info.duration_millis, num_frames, self.min_frame_interval_millis);
        if timestamps.is_empty() {
            warn!(?file, "video has no usable duration, nothing to capture");
            return Ok(Vec::new());
        }

        info!(
            ?file,
            requested = num_frames,
            planned = timestamps.len(),
            duration_millis = info.duration_millis,
            "capturing frames"
        );

        let mut frames = Vec::with_capacity(timestamps.len());
        for time_millis in timestamps {
            let grabbed = self
                .grab(file, &info, time_millis)
                .with_context(|| format!("failed to capture frame at {time_millis}ms from {}", file.display()));

            match grabbed {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => {
                    warn!(?file, time_millis, "no frame at offset, stopping capture");
                    self.mark_known_bad(file);
                    break;
                }
                Err(e) => {
                    self.mark_known_bad(file);
                    return Err(e);
                }
            }
        }

        info!(?file, captured = frames.len(), "frame capture complete");
        Ok(frames)
    }

    fn known_duration_millis(&self, file: &Path) -> Option<u64> {
        lock(&self.durations)
            .get(file)
            .copied()
            .filter(|&millis| millis > 0)
    }
}

// Both guarded maps hold plain values, so a poisoned lock still has usable contents.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn file_key(file: &Path) -> String {
    file.file_name()
        .unwrap_or(file.as_os_str())
        .to_string_lossy()
        .into_owned()
}
