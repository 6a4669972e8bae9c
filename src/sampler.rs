//! Frame sampling.
//!
//! Decides which decoded frames are worth OCR time. The sampler walks the
//! source over a time window, keeps every interval-th frame, crops it to the
//! subtitle region, and hands the crop downstream.

use anyhow::{Result, ensure};
use image::imageops;
use log::{debug, info};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::roi::CropRegion;
use crate::video::{FrameSource, SourceFrame};

/// Cooperative cancellation flag, checked once per sampled frame.
///
/// Clone the token and flip it from another thread to stop a run early; the
/// partial results collected up to that point are still merged and written.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. All clones observe it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Counters describing one sampling pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleStats {
    /// Frames decoded inside the time window.
    pub scanned: u64,
    /// Frames forwarded to OCR.
    pub sampled: u64,
}

/// Selects frames at a fixed cadence within a time window and crops them to
/// the subtitle region.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    interval_frames: u64,
    interval_seconds: f64,
    start_time: f64,
    end_time: f64,
    region: CropRegion,
    cancel: Option<CancellationToken>,
}

impl FrameSampler {
    /// Plan a sampling pass over `source` at `target_fps` samples per second
    /// within `[start_time, end_time)`.
    ///
    /// The frame interval is `round(video_fps / target_fps)`, clamped to at
    /// least one so a target above the video rate degrades to sampling every
    /// frame. `end_time` defaults to the source duration, or to end of
    /// stream when the source cannot report one.
    pub fn new(
        source: &impl FrameSource,
        region: CropRegion,
        target_fps: f64,
        start_time: f64,
        end_time: Option<f64>,
    ) -> Result<Self> {
        ensure!(
            target_fps > 0.0,
            "Sampling fps must be positive, got {target_fps}"
        );
        ensure!(
            start_time >= 0.0,
            "Start time must be non-negative, got {start_time}s"
        );

        let video_fps = source.frame_rate();
        let interval_frames = ((video_fps / target_fps).round() as u64).max(1);
        let interval_seconds = interval_frames as f64 / video_fps;
        let end_time = end_time.unwrap_or_else(|| {
            let total = source.total_frames();
            if total > 0 {
                total as f64 / video_fps
            } else {
                f64::INFINITY
            }
        });
        ensure!(
            start_time < end_time,
            "Start time {start_time}s is not before end time {end_time}s"
        );

        Ok(Self {
            interval_frames,
            interval_seconds,
            start_time,
            end_time,
            region,
            cancel: None,
        })
    }

    /// Install a cancellation token checked once per sampled frame.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The wall-clock span one sampled frame stands for.
    pub fn interval_seconds(&self) -> f64 {
        self.interval_seconds
    }

    /// Number of samples expected inside the window, or `None` when the
    /// source cannot say how long it is.
    pub fn expected_samples(&self, source: &impl FrameSource) -> Option<u64> {
        if !self.end_time.is_finite() {
            return None;
        }
        let window = self.end_time - self.start_time;
        let frames = (window * source.frame_rate()).ceil() as u64;
        Some(frames.div_ceil(self.interval_frames))
    }

    /// Walk the source, invoking `on_sample` for every selected, cropped
    /// frame until the window closes, the stream ends, or the run is
    /// cancelled.
    pub fn sample<S, F>(&self, source: &mut S, mut on_sample: F) -> Result<SampleStats>
    where
        S: FrameSource,
        F: FnMut(SourceFrame) -> Result<()>,
    {
        source.seek(self.start_time)?;

        let mut stats = SampleStats::default();
        while let Some(frame) = source.read_frame()? {
            // Seeking lands on a keyframe, so the first reads may still be
            // before the window; they do not consume sample ordinals.
            if frame.timestamp < self.start_time {
                continue;
            }
            if frame.timestamp >= self.end_time {
                break;
            }

            if stats.scanned % self.interval_frames == 0 {
                if let Some(token) = &self.cancel {
                    if token.is_cancelled() {
                        info!("sampling cancelled at {:.2}s", frame.timestamp);
                        break;
                    }
                }
                let cropped = imageops::crop_imm(
                    &frame.image,
                    self.region.left,
                    self.region.top,
                    self.region.width(),
                    self.region.height(),
                )
                .to_image();
                on_sample(SourceFrame {
                    timestamp: frame.timestamp,
                    image: cropped,
                })?;
                stats.sampled += 1;
            }

            stats.scanned += 1;
            if stats.scanned % 100 == 0 {
                debug!(
                    "scanned {} frames, current time {:.2}s",
                    stats.scanned, frame.timestamp
                );
            }
        }

        Ok(stats)
    }
}
