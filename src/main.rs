//! hardsub2srt - Main Application Entrypoint
//!
//! This file is responsible for parsing command-line arguments, initializing
//! the application environment (like logging), and dispatching the core
//! extraction logic.

use clap::Parser;
use hardsub2srt::{Config, roi::RoiPercent, run};
use log::{error, info};
use std::path::PathBuf;

/// A command-line tool that extracts hardcoded (burned-in) subtitles from videos into SRT files using OCR.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input video file (e.g., episode.mkv)
    video: PathBuf,

    /// Path for the output SRT file (defaults to the video path with an .srt extension)
    output: Option<PathBuf>,

    /// OCR language (e.g., "eng" for English, "chi_sim" for Simplified Chinese)
    #[arg(short, long, default_value_t = String::from("eng"))]
    lang: String,

    /// How many frames per second to sample for OCR
    #[arg(short, long, default_value_t = 5.0)]
    fps: f64,

    /// Start of the processed window, in seconds
    #[arg(long, default_value_t = 0.0)]
    start_time: f64,

    /// End of the processed window, in seconds (defaults to the video end)
    #[arg(long)]
    end_time: Option<f64>,

    /// Top boundary of the subtitle region, as a percentage of frame height
    #[arg(long, default_value_t = 66.0)]
    top_percent: f64,

    /// Bottom boundary of the subtitle region, as a percentage of frame height
    #[arg(long, default_value_t = 95.0)]
    bottom_percent: f64,

    /// Left boundary of the subtitle region, as a percentage of frame width
    #[arg(long, default_value_t = 10.0)]
    left_percent: f64,

    /// Right boundary of the subtitle region, as a percentage of frame width
    #[arg(long, default_value_t = 90.0)]
    right_percent: f64,

    /// Minimum Jaccard similarity for merging consecutive detections (0.0 to 1.0)
    #[arg(long, default_value_t = 0.8)]
    similarity_threshold: f64,

    /// Maximum gap in seconds between detections of the same subtitle
    #[arg(long, default_value_t = 1.0)]
    time_threshold: f64,

    /// Skip writing ROI preview frames and asking for confirmation
    #[arg(long)]
    skip_preview: bool,

    /// Write the raw pre-merge detections as JSON next to the output
    #[arg(long)]
    dump_detections: bool,

    /// Logging verbosity level
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum LogLevel {
    Error,
    Info,
    Debug,
}

fn main() {
    let args = Args::parse();

    // 1. Initialize Logger
    let log_level = match args.log_level {
        LogLevel::Error => "error",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    info!("Starting hardsub2srt...");

    // 2. Validate input path
    if !args.video.exists() {
        error!("Input file does not exist: {:?}", args.video);
        std::process::exit(1);
    }

    // 3. Create a configuration object from arguments
    let config = Config {
        video_path: args.video,
        output_path: args.output,
        lang: args.lang,
        fps: args.fps,
        start_time: args.start_time,
        end_time: args.end_time,
        roi: RoiPercent {
            top: args.top_percent,
            bottom: args.bottom_percent,
            left: args.left_percent,
            right: args.right_percent,
        },
        similarity_threshold: args.similarity_threshold,
        time_threshold: args.time_threshold,
        skip_preview: args.skip_preview,
        dump_detections: args.dump_detections,
    };

    // 4. Run the main application logic
    if let Err(e) = run(config) {
        error!("Extraction failed: {:#}", e);
        std::process::exit(2);
    }

    info!("Subtitle extraction completed successfully.");
    std::process::exit(0);
}
