use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use vidframe_proto::proto::{CaptureManifest, CapturedFrame};

use crate::capture::{is_supported_video, FrameCapture};
use crate::sheet::ContactSheet;

/// Parameters for a single extraction run.
pub struct ExtractConfig {
    /// Upper bound on frames to capture.
    pub num_frames: u32,
    /// Directory the captured stills are written into.
    pub output_dir: PathBuf,
    /// Where to write a contact sheet, or None to skip.
    pub sheet_path: Option<PathBuf>,
    /// Frames per contact sheet row.
    pub sheet_columns: u32,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            num_frames: 4,
            output_dir: PathBuf::from("frames"),
            sheet_path: None,
            sheet_columns: 4,
        }
    }
}

/// Capture frames from `input`, write them as PNGs, and describe the result.
pub fn run_extraction(
    capture: &dyn FrameCapture,
    input: &Path,
    config: &ExtractConfig,
) -> Result<CaptureManifest> {
    if !input.exists() {
        bail!("input video does not exist: {}", input.display());
    }
    if config.num_frames < 1 {
        bail!("num_frames must be >= 1, got {}", config.num_frames);
    }
    if !is_supported_video(input) {
        warn!(?input, "unrecognized video extension, trying anyway");
    }

    info!(
        ?input,
        num_frames = config.num_frames,
        output_dir = ?config.output_dir,
        "extraction starting"
    );

    let frames = capture
        .capture_frames(input, config.num_frames)
        .context("frame capture failed")?;

    if frames.is_empty() {
        warn!(?input, "no frames captured");
    }

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!("failed to create output directory {}", config.output_dir.display())
    })?;

    let mut manifest = CaptureManifest {
        source_path: input.to_string_lossy().into_owned(),
        duration_millis: capture.known_duration_millis(input).unwrap_or(0),
        ..CaptureManifest::default()
    };
    if let Some(first) = frames.first() {
        (manifest.width, manifest.height) = first.image().dimensions();
    }

    for (i, frame) in frames.iter().enumerate() {
        let path = config.output_dir.join(frame_file_name(i as u32, frame.time_millis()));
        frame
            .image()
            .save(&path)
            .with_context(|| format!("failed to save frame to {}", path.display()))?;

        manifest.frames.push(CapturedFrame {
            index: i as u32,
            time_millis: frame.time_millis(),
            image_path: path.to_string_lossy().into_owned(),
        });
    }

    if let Some(sheet_path) = config.sheet_path.as_ref().filter(|_| !frames.is_empty()) {
        ContactSheet::new()
            .save(&frames, config.sheet_columns, sheet_path)
            .context("failed to write contact sheet")?;
        manifest.sheet_path = sheet_path.to_string_lossy().into_owned();
    }

    info!(frame_count = manifest.frames.len(), "extraction complete");
    Ok(manifest)
}

fn frame_file_name(index: u32, time_millis: u64) -> String {
    format!("frame_{index:04}_{time_millis}ms.png")
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};

    use super::*;
    use crate::video::VideoFrame;

    /// Serves evenly spaced solid frames from a pretend video of `available` frames.
    struct FakeCapture {
        available: u32,
    }

    impl FrameCapture for FakeCapture {
        fn capture_frames(&self, _file: &Path, num_frames: u32) -> Result<Vec<VideoFrame>> {
            Ok((0..num_frames.min(self.available))
                .map(|i| {
                    let shade = (i * 40) as u8;
                    VideoFrame::new(RgbImage::from_pixel(16, 9, Rgb([shade, shade, shade])), i as u64 * 2_000)
                })
                .collect())
        }

        fn known_duration_millis(&self, _file: &Path) -> Option<u64> {
            Some(self.available as u64 * 2_000)
        }
    }

    struct FailingCapture;

    impl FrameCapture for FailingCapture {
        fn capture_frames(&self, file: &Path, _num_frames: u32) -> Result<Vec<VideoFrame>> {
            bail!("cannot decode {}", file.display())
        }
    }

    fn fake_video(dir: &Path) -> PathBuf {
        let path = dir.join("evidence.mp4");
        std::fs::write(&path, b"placeholder").unwrap();
        path
    }

    #[test]
    fn writes_frames_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let input = fake_video(dir.path());
        let config = ExtractConfig {
            num_frames: 3,
            output_dir: dir.path().join("out"),
            ..ExtractConfig::default()
        };

        let manifest = run_extraction(&FakeCapture { available: 10 }, &input, &config).unwrap();

        assert_eq!(manifest.frames.len(), 3);
        assert_eq!(manifest.duration_millis, 20_000);
        assert_eq!((manifest.width, manifest.height), (16, 9));
        assert!(manifest.sheet_path.is_empty());
        let times: Vec<u64> = manifest.frames.iter().map(|f| f.time_millis).collect();
        assert_eq!(times, vec![0, 2_000, 4_000]);
        for f in &manifest.frames {
            assert!(Path::new(&f.image_path).is_file(), "{} missing", f.image_path);
        }
        assert!(manifest.frames[1].image_path.ends_with("frame_0001_2000ms.png"));
    }

    #[test]
    fn short_video_yields_fewer_frames() {
        let dir = tempfile::tempdir().unwrap();
        let input = fake_video(dir.path());
        let config = ExtractConfig {
            num_frames: 8,
            output_dir: dir.path().join("out"),
            ..ExtractConfig::default()
        };

        let manifest = run_extraction(&FakeCapture { available: 2 }, &input, &config).unwrap();
        assert_eq!(manifest.frames.len(), 2);
    }

    #[test]
    fn writes_contact_sheet_when_requested() {
        let dir = tempfile::tempdir().unwrap();
        let input = fake_video(dir.path());
        let sheet = dir.path().join("sheet.png");
        let config = ExtractConfig {
            num_frames: 4,
            output_dir: dir.path().join("out"),
            sheet_path: Some(sheet.clone()),
            sheet_columns: 2,
        };

        let manifest = run_extraction(&FakeCapture { available: 4 }, &input, &config).unwrap();
        assert!(sheet.is_file());
        assert_eq!(manifest.sheet_path, sheet.to_string_lossy());
    }

    #[test]
    fn duration_is_zero_when_backend_cannot_tell() {
        struct NoDuration;

        impl FrameCapture for NoDuration {
            fn capture_frames(&self, _file: &Path, _num_frames: u32) -> Result<Vec<VideoFrame>> {
                Ok(vec![VideoFrame::new(RgbImage::new(4, 4), 0)])
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let input = fake_video(dir.path());
        let config = ExtractConfig {
            output_dir: dir.path().join("out"),
            ..ExtractConfig::default()
        };

        let manifest = run_extraction(&NoDuration, &input, &config).unwrap();
        assert_eq!(manifest.duration_millis, 0);
        assert_eq!(manifest.frames.len(), 1);
    }

    #[test]
    fn capture_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let input = fake_video(dir.path());
        let config = ExtractConfig {
            output_dir: dir.path().join("out"),
            ..ExtractConfig::default()
        };

        let err = run_extraction(&FailingCapture, &input, &config).unwrap_err();
        assert!(format!("{err:#}").contains("cannot decode"));
        assert!(!config.output_dir.exists());
    }

    #[test]
    fn missing_input_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExtractConfig {
            output_dir: dir.path().join("out"),
            ..ExtractConfig::default()
        };
        let err = run_extraction(&FakeCapture { available: 1 }, &dir.path().join("gone.mp4"), &config);
        assert!(err.is_err());
    }

    #[test]
    fn zero_frames_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = fake_video(dir.path());
        let config = ExtractConfig {
            num_frames: 0,
            output_dir: dir.path().join("out"),
            ..ExtractConfig::default()
        };
        assert!(run_extraction(&FakeCapture { available: 1 }, &input, &config).is_err());
    }
}
