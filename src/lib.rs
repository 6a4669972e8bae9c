//! hardsub2srt - Core Library
//!
//! This file contains the primary logic for the application, orchestrating
//! the different modules to sample frames from a video, OCR the subtitle
//! region, merge the flickery per-frame detections into stable spans, and
//! encode them as SubRip text.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

// Define modules for different functionalities
pub mod detector;
pub mod merge;
pub mod ocr;
pub mod preview;
pub mod roi;
pub mod sampler;
pub mod srt;
pub mod video;

use detector::DetectionRecorder;
use merge::{RawDetection, Tokenization, merge_similar_detections};
use ocr::{TesseractRecognizer, TextRecognizer};
use roi::{CropRegion, RoiPercent};
use sampler::{CancellationToken, FrameSampler};
use srt::Subtitle;
use video::{FrameSource, VideoFile};

/// Application configuration structure.
#[derive(Debug)]
pub struct Config {
    pub video_path: PathBuf,
    pub output_path: Option<PathBuf>,
    pub lang: String,
    pub fps: f64,
    pub start_time: f64,
    pub end_time: Option<f64>,
    pub roi: RoiPercent,
    pub similarity_threshold: f64,
    pub time_threshold: f64,
    pub skip_preview: bool,
    pub dump_detections: bool,
}

impl Config {
    /// Output path, defaulting to the video path with an `.srt` extension.
    pub fn resolved_output_path(&self) -> PathBuf {
        self.output_path
            .clone()
            .unwrap_or_else(|| self.video_path.with_extension("srt"))
    }
}

/// Core pipeline parameters, independent of file paths and UI concerns.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub fps: f64,
    pub start_time: f64,
    pub end_time: Option<f64>,
    pub region: CropRegion,
    pub tokenization: Tokenization,
    pub similarity_threshold: f64,
    pub time_threshold: f64,
    pub cancel: Option<CancellationToken>,
}

impl ExtractOptions {
    fn sampler(&self, source: &impl FrameSource) -> Result<FrameSampler> {
        let mut sampler = FrameSampler::new(
            source,
            self.region,
            self.fps,
            self.start_time,
            self.end_time,
        )?;
        if let Some(token) = &self.cancel {
            sampler = sampler.with_cancellation(token.clone());
        }
        Ok(sampler)
    }
}

/// Everything one extraction run produced.
#[derive(Debug)]
pub struct Extraction {
    pub subtitles: Vec<Subtitle>,
    pub detections: Vec<RawDetection>,
    pub frames_scanned: u64,
    pub frames_sampled: u64,
    pub ocr_failures: u64,
}

/// Drive the sampling, OCR, and merge stages over one frame source.
///
/// `on_sampled` fires once per sampled frame, after OCR, for progress
/// reporting.
pub fn extract_subtitles<S: FrameSource>(
    source: &mut S,
    recognizer: &mut dyn TextRecognizer,
    options: &ExtractOptions,
    mut on_sampled: impl FnMut(),
) -> Result<Extraction> {
    let sampler = options.sampler(source)?;

    let mut recorder = DetectionRecorder::new(sampler.interval_seconds());
    let stats = sampler.sample(source, |frame| {
        recorder.process_frame(&frame, &mut *recognizer);
        on_sampled();
        Ok(())
    })?;

    let log = recorder.finish();
    let subtitles = merge_similar_detections(
        &log.detections,
        options.tokenization,
        options.time_threshold,
        options.similarity_threshold,
    );

    Ok(Extraction {
        subtitles,
        detections: log.detections,
        frames_scanned: stats.scanned,
        frames_sampled: stats.sampled,
        ocr_failures: log.ocr_failures,
    })
}

/// Directory the ROI preview frames are written into, next to the output.
fn preview_dir_for(output_path: &Path) -> PathBuf {
    let mut name = output_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str("_roi_preview");
    output_path.with_file_name(name)
}

/// The main function that orchestrates the subtitle extraction process.
pub fn run(config: Config) -> Result<()> {
    info!("Initializing extraction with config: {:?}", config);

    // 1. Open the video and validate the configuration
    let mut source = VideoFile::open(&config.video_path)?;
    let (width, height) = source.dimensions();
    // A bad ROI, fps, or time window must fail here, before the preview
    // prompt and before any decoding work starts.
    let region = config.roi.to_pixel_region(width, height)?;
    let tokenization = Tokenization::for_language(&config.lang);
    let options = ExtractOptions {
        fps: config.fps,
        start_time: config.start_time,
        end_time: config.end_time,
        region,
        tokenization,
        similarity_threshold: config.similarity_threshold,
        time_threshold: config.time_threshold,
        cancel: None,
    };
    let expected = options.sampler(&source)?.expected_samples(&source);
    let output_path = config.resolved_output_path();

    // 2. Preview the region and ask for confirmation
    if !config.skip_preview {
        let preview_dir = preview_dir_for(&output_path);
        if !preview::confirm_region(&mut source, &region, &preview_dir)? {
            info!("Extraction cancelled at the preview step.");
            return Ok(());
        }
    }

    // 3. Initialize the OCR engine
    info!(
        "Using language '{}' with {:?} tokenization",
        config.lang, tokenization
    );
    let mut recognizer = TesseractRecognizer::new(&config.lang)?;

    // 4. Sample, recognize, and merge
    info!("Starting subtitle extraction for: {:?}", config.video_path);
    let pb = match expected {
        Some(expected) if expected > 0 => {
            let bar = ProgressBar::new(expected);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} Sampling frames [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) [{elapsed_precise}<{eta}]")
                    .unwrap()
                    .progress_chars("##-"),
            );
            bar
        }
        _ => {
            warn!("Could not determine the video duration. Using spinner as fallback.");
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} Sampling frames... [{elapsed_precise}] {pos} frames sampled")
                    .unwrap(),
            );
            bar
        }
    };
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let started = Instant::now();
    let extraction = extract_subtitles(&mut source, &mut recognizer, &options, || pb.inc(1))?;
    pb.finish_with_message(format!("Sampled {} frames", extraction.frames_sampled));

    let elapsed = started.elapsed().as_secs_f64();
    let video_seconds = extraction.frames_scanned as f64 / source.frame_rate();
    let speed = video_seconds / elapsed.max(f64::EPSILON);
    info!(
        "Scanned {} frames ({:.2}s of video) in {:.2}s ({:.2}x real time), sampled {}, {} raw detections, {} OCR failures",
        extraction.frames_scanned,
        video_seconds,
        elapsed,
        speed,
        extraction.frames_sampled,
        extraction.detections.len(),
        extraction.ocr_failures,
    );

    // 5. Write the outputs
    if config.dump_detections {
        let dump_path = output_path.with_extension("detections.json");
        fs::write(
            &dump_path,
            serde_json::to_string_pretty(&extraction.detections)
                .context("Failed to serialize detections")?,
        )
        .with_context(|| format!("Failed to write detection dump {dump_path:?}"))?;
        info!("Wrote raw detections to {:?}", dump_path);
    }

    srt::write_file(&extraction.subtitles, &output_path)?;
    info!(
        "Wrote {} subtitles to {:?}",
        extraction.subtitles.len(),
        output_path
    );

    Ok(())
}
