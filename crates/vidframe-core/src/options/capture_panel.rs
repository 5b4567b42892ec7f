use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{OptionsError, OptionsPanel, Preferences, PreferencesStore};
use crate::capture::FfmpegFrameCapture;
use crate::video::decoder::FfmpegTools;

/// Settings that control frame capture.
pub struct CaptureOptionsPanel {
    store: PreferencesStore,
    frame_count: u32,
    min_frame_interval_millis: u64,
    ffmpeg_path: Option<PathBuf>,
    ffprobe_path: Option<PathBuf>,
}

impl CaptureOptionsPanel {
    /// Create a panel backed by `store`. Values start at their defaults until
    /// [`OptionsPanel::load`] is called.
    pub fn new(store: PreferencesStore) -> Self {
        let defaults = Preferences::default();
        Self {
            store,
            frame_count: defaults.frame_count,
            min_frame_interval_millis: defaults.min_frame_interval_millis,
            ffmpeg_path: defaults.ffmpeg_path,
            ffprobe_path: defaults.ffprobe_path,
        }
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn set_frame_count(&mut self, frame_count: u32) {
        self.frame_count = frame_count;
    }

    pub fn min_frame_interval_millis(&self) -> u64 {
        self.min_frame_interval_millis
    }

    pub fn set_min_frame_interval_millis(&mut self, millis: u64) {
        self.min_frame_interval_millis = millis;
    }

    pub fn ffmpeg_path(&self) -> Option<&Path> {
        self.ffmpeg_path.as_deref()
    }

    pub fn set_ffmpeg_path(&mut self, path: Option<PathBuf>) {
        self.ffmpeg_path = path;
    }

    pub fn ffprobe_path(&self) -> Option<&Path> {
        self.ffprobe_path.as_deref()
    }

    pub fn set_ffprobe_path(&mut self, path: Option<PathBuf>) {
        self.ffprobe_path = path;
    }

    /// Binary locations, falling back to PATH lookup for anything unset.
    pub fn tools(&self) -> FfmpegTools {
        let defaults = FfmpegTools::default();
        FfmpegTools {
            ffmpeg: self.ffmpeg_path.clone().unwrap_or(defaults.ffmpeg),
            ffprobe: self.ffprobe_path.clone().unwrap_or(defaults.ffprobe),
        }
    }

    /// A capture backend configured from the current values.
    pub fn build_capture(&self) -> FfmpegFrameCapture {
        FfmpegFrameCapture::new(self.tools()).with_min_frame_interval(self.min_frame_interval_millis)
    }
}

impl OptionsPanel for CaptureOptionsPanel {
    fn store(&self) -> Result<(), OptionsError> {
        self.validate()?;

        self.store.update(|prefs| {
            prefs.frame_count = self.frame_count;
            prefs.min_frame_interval_millis = self.min_frame_interval_millis;
            prefs.ffmpeg_path = self.ffmpeg_path.clone();
            prefs.ffprobe_path = self.ffprobe_path.clone();
        })?;

        debug!(frame_count = self.frame_count, "capture options stored");
        Ok(())
    }

    fn load(&mut self) -> Result<(), OptionsError> {
        let prefs = self.store.read()?;
        check_frame_count(prefs.frame_count)?;
        self.frame_count = prefs.frame_count;
        self.min_frame_interval_millis = prefs.min_frame_interval_millis;
        self.ffmpeg_path = prefs.ffmpeg_path;
        self.ffprobe_path = prefs.ffprobe_path;

        info!(
            frame_count = self.frame_count,
            min_frame_interval_millis = self.min_frame_interval_millis,
            "capture options loaded"
        );
        Ok(())
    }

    fn validate(&self) -> Result<(), OptionsError> {
        check_frame_count(self.frame_count)
    }
}

fn check_frame_count(frame_count: u32) -> Result<(), OptionsError> {
    if frame_count == 0 {
        return Err(OptionsError::Invalid(format!(
            "frame count must be at least 1, got {frame_count}"
        )));
    }
    Ok(())
}
