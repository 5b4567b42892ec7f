mod cli;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use prost::Message;
use tracing::{info, warn};

use vidframe_core::extract::{self, ExtractConfig};
use vidframe_core::options::{
    self, CaptureOptionsPanel, OptionsError, OptionsPanel, PreferencesStore, SheetOptionsPanel,
};
use vidframe_proto::proto::CaptureManifest;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = cli::Cli::parse();
    let store = match cli.preferences {
        Some(path) => PreferencesStore::new(path),
        None => PreferencesStore::user_default(),
    };

    let mut capture_opts = CaptureOptionsPanel::new(store.clone());
    let mut sheet_opts = SheetOptionsPanel::new(store.clone());
    load_panel(&mut capture_opts).context("failed to load capture preferences")?;
    load_panel(&mut sheet_opts).context("failed to load sheet preferences")?;

    match cli.command {
        cli::Command::Capture {
            input,
            output_dir,
            count,
            manifest,
            sheet,
        } => capture(&capture_opts, &sheet_opts, input, output_dir, count, manifest, sheet),
        cli::Command::Options { action } => match action {
            cli::OptionsAction::Show => {
                show_options(&store, &capture_opts, &sheet_opts);
                Ok(())
            }
            cli::OptionsAction::Set(args) => {
                apply_set(args, &mut capture_opts, &mut sheet_opts)
                    .context("failed to store preferences")?;
                info!(path = ?store.path(), "preferences updated");
                show_options(&store, &capture_opts, &sheet_opts);
                Ok(())
            }
        },
    }
}

/// Load a panel, keeping its defaults when the stored values are out of range
/// so `options set` can still repair them.
fn load_panel(panel: &mut dyn OptionsPanel) -> Result<(), OptionsError> {
    match panel.load() {
        Err(OptionsError::Invalid(reason)) => {
            warn!(%reason, "ignoring out-of-range stored preference, using defaults");
            Ok(())
        }
        other => other,
    }
}

/// Apply `options set` edits and store them. Nothing is written unless every
/// edited value is valid.
fn apply_set(
    args: cli::SetArgs,
    capture_opts: &mut CaptureOptionsPanel,
    sheet_opts: &mut SheetOptionsPanel,
) -> Result<(), OptionsError> {
    if let Some(n) = args.frame_count {
        capture_opts.set_frame_count(n);
    }
    if let Some(ms) = args.min_interval_ms {
        capture_opts.set_min_frame_interval_millis(ms);
    }
    if args.clear_ffmpeg {
        capture_opts.set_ffmpeg_path(None);
    } else if args.ffmpeg.is_some() {
        capture_opts.set_ffmpeg_path(args.ffmpeg);
    }
    if args.clear_ffprobe {
        capture_opts.set_ffprobe_path(None);
    } else if args.ffprobe.is_some() {
        capture_opts.set_ffprobe_path(args.ffprobe);
    }
    if let Some(cols) = args.sheet_columns {
        sheet_opts.set_columns(cols);
    }

    options::store_all(&[&*capture_opts, &*sheet_opts])
}

fn capture(
    capture_opts: &CaptureOptionsPanel,
    sheet_opts: &SheetOptionsPanel,
    input: PathBuf,
    output_dir: PathBuf,
    count: Option<u32>,
    manifest_path: Option<PathBuf>,
    sheet_path: Option<PathBuf>,
) -> Result<()> {
    let num_frames = count.unwrap_or(capture_opts.frame_count());
    info!(?input, ?output_dir, num_frames, "starting capture");

    let backend = capture_opts.build_capture();
    let config = ExtractConfig {
        num_frames,
        output_dir,
        sheet_path,
        sheet_columns: sheet_opts.columns(),
    };

    let manifest =
        extract::run_extraction(&backend, &input, &config).context("capture failed")?;

    if manifest.frames.is_empty() {
        warn!("no frames captured from video");
    }

    if let Some(path) = manifest_path {
        write_manifest(&manifest, &path)?;
    }

    info!(
        frame_count = manifest.frames.len(),
        duration_millis = manifest.duration_millis,
        "capture complete"
    );
    Ok(())
}

fn show_options(
    store: &PreferencesStore,
    capture_opts: &CaptureOptionsPanel,
    sheet_opts: &SheetOptionsPanel,
) {
    let display = |p: Option<&Path>| {
        p.map(|p| p.display().to_string())
            .unwrap_or_else(|| "(PATH)".to_string())
    };

    println!("preferences: {}", store.path().display());
    println!("frame_count = {}", capture_opts.frame_count());
    println!("min_frame_interval_millis = {}", capture_opts.min_frame_interval_millis());
    println!("ffmpeg = {}", display(capture_opts.ffmpeg_path()));
    println!("ffprobe = {}", display(capture_opts.ffprobe_path()));
    println!("sheet_columns = {}", sheet_opts.columns());
}

/// Serialize the manifest as length-delimited protobuf and write to file.
fn write_manifest(manifest: &CaptureManifest, output: &Path) -> Result<()> {
    info!(?output, frame_count = manifest.frames.len(), "writing protobuf manifest");

    let mut buf = Vec::new();
    manifest
        .encode_length_delimited(&mut buf)
        .context("failed to encode CaptureManifest")?;

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)
            .context("failed to create manifest directory")?;
    }

    std::fs::write(output, &buf)
        .with_context(|| format!("failed to write {}", output.display()))?;

    info!(?output, bytes = buf.len(), "protobuf manifest written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use clap::Parser;

    use super::*;

    fn panels(path: &Path) -> (PreferencesStore, CaptureOptionsPanel, SheetOptionsPanel) {
        let store = PreferencesStore::new(path);
        let mut capture_opts = CaptureOptionsPanel::new(store.clone());
        let mut sheet_opts = SheetOptionsPanel::new(store.clone());
        load_panel(&mut capture_opts).unwrap();
        load_panel(&mut sheet_opts).unwrap();
        (store, capture_opts, sheet_opts)
    }

    fn set_args(argv: &[&str]) -> cli::SetArgs {
        let cli = cli::Cli::try_parse_from(argv).unwrap();
        match cli.command {
            cli::Command::Options {
                action: cli::OptionsAction::Set(args),
            } => args,
            _ => panic!("expected options set"),
        }
    }

    #[test]
    fn invalid_value_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        let (store, mut capture_opts, mut sheet_opts) = panels(&path);
        store.update(|p| p.frame_count = 2).unwrap();
        capture_opts.load().unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        let args = set_args(&["vidframe", "options", "set", "--frame-count", "7", "--sheet-columns", "0"]);
        let err = apply_set(args, &mut capture_opts, &mut sheet_opts).unwrap_err();

        assert!(matches!(err, OptionsError::Invalid(_)));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn set_stores_all_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        let (store, mut capture_opts, mut sheet_opts) = panels(&path);

        let args = set_args(&[
            "vidframe", "options", "set", "--frame-count", "9", "--ffmpeg", "/opt/ffmpeg", "--sheet-columns", "3",
        ]);
        apply_set(args, &mut capture_opts, &mut sheet_opts).unwrap();

        let prefs = store.read().unwrap();
        assert_eq!(prefs.frame_count, 9);
        assert_eq!(prefs.ffmpeg_path, Some(PathBuf::from("/opt/ffmpeg")));
        assert_eq!(prefs.sheet_columns, 3);
    }

    #[test]
    fn clear_flags_restore_path_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        let (store, _, _) = panels(&path);
        store
            .update(|p| {
                p.ffmpeg_path = Some(PathBuf::from("/opt/ffmpeg"));
                p.ffprobe_path = Some(PathBuf::from("/opt/ffprobe"));
            })
            .unwrap();

        let (store, mut capture_opts, mut sheet_opts) = panels(&path);
        let args = set_args(&["vidframe", "options", "set", "--clear-ffmpeg"]);
        apply_set(args, &mut capture_opts, &mut sheet_opts).unwrap();

        let prefs = store.read().unwrap();
        assert_eq!(prefs.ffmpeg_path, None);
        assert_eq!(prefs.ffprobe_path, Some(PathBuf::from("/opt/ffprobe")));
    }

    #[test]
    fn clear_flag_conflicts_with_new_path() {
        let parsed = cli::Cli::try_parse_from([
            "vidframe", "options", "set", "--ffprobe", "/x/ffprobe", "--clear-ffprobe",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn out_of_range_stored_value_can_be_repaired() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, r#"{ "sheet_columns": 0 }"#).unwrap();

        let (store, mut capture_opts, mut sheet_opts) = panels(&path);
        let args = set_args(&["vidframe", "options", "set", "--sheet-columns", "2"]);
        apply_set(args, &mut capture_opts, &mut sheet_opts).unwrap();
        assert_eq!(store.read().unwrap().sheet_columns, 2);
    }
}
