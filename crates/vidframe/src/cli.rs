use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "vidframe", about = "Extract sample frames from video files")]
pub struct Cli {
    /// Preferences file to use instead of the per-user one.
    #[arg(long, global = true)]
    pub preferences: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Capture evenly spaced frames from a video file.
    Capture {
        /// Path to the input video file (MP4, AVI, etc.).
        #[arg(short, long)]
        input: PathBuf,

        /// Directory to write the captured frames into.
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Number of frames to capture (default: stored preference).
        #[arg(short = 'n', long)]
        count: Option<u32>,

        /// Path to write a length-delimited protobuf manifest.
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// Path to write a contact sheet PNG of the captured frames.
        #[arg(long)]
        sheet: Option<PathBuf>,
    },

    /// Show or change stored preferences.
    Options {
        #[command(subcommand)]
        action: OptionsAction,
    },
}

#[derive(Subcommand)]
pub enum OptionsAction {
    /// Print the stored preferences.
    Show,

    /// Change stored preferences. Unspecified values are left as they are.
    Set(SetArgs),
}

#[derive(Args, Default)]
pub struct SetArgs {
    #[arg(long)]
    pub frame_count: Option<u32>,

    /// Minimum spacing between captured frames, in milliseconds.
    #[arg(long)]
    pub min_interval_ms: Option<u64>,

    #[arg(long)]
    pub ffmpeg: Option<PathBuf>,

    /// Go back to finding ffmpeg on PATH.
    #[arg(long, conflicts_with = "ffmpeg")]
    pub clear_ffmpeg: bool,

    #[arg(long)]
    pub ffprobe: Option<PathBuf>,

    /// Go back to finding ffprobe on PATH.
    #[arg(long, conflicts_with = "ffprobe")]
    pub clear_ffprobe: bool,

    #[arg(long)]
    pub sheet_columns: Option<u32>,
}
