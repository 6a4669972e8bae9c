//! Video decoding.
//!
//! Frames reach the pipeline through the [`FrameSource`] trait; the
//! [`VideoFile`] implementation decodes any container FFmpeg can open and
//! hands out RGB frames with their presentation timestamps.

use anyhow::{Context as AnyhowContext, Result, anyhow};
use ffmpeg_next as ffmpeg;

use ffmpeg::codec::context::Context as CodecContext;
use ffmpeg::format::{Pixel, context::Input, input};
use ffmpeg::media::Type;
use ffmpeg::software::scaling::{context::Context as ScalingContext, flag::Flags};
use ffmpeg::util::frame::video::Video as VideoFrame;
use ffmpeg::{Packet, Rational};
use image::RgbImage;
use log::{debug, info};
use std::path::Path;

/// One decoded frame and its presentation time in seconds.
pub struct SourceFrame {
    pub timestamp: f64,
    pub image: RgbImage,
}

/// A seekable, sequentially readable supply of video frames.
///
/// The pipeline needs exactly these five operations, which keeps it decoupled
/// from any concrete media library and lets tests substitute a scripted
/// source.
pub trait FrameSource {
    /// Frame width and height in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Average frames per second.
    fn frame_rate(&self) -> f64;

    /// Total number of frames, possibly estimated. Zero means unknown.
    fn total_frames(&self) -> u64;

    /// Position the read cursor at or shortly before the given time.
    fn seek(&mut self, seconds: f64) -> Result<()>;

    /// Decode the next frame, or `None` at end of stream.
    fn read_frame(&mut self) -> Result<Option<SourceFrame>>;
}

/// FFmpeg-backed [`FrameSource`] for a video file on disk.
pub struct VideoFile {
    ictx: Input,
    decoder: ffmpeg::decoder::Video,
    scaler: ScalingContext,
    stream_index: usize,
    time_base: Rational,
    frame_rate: f64,
    total_frames: u64,
    width: u32,
    height: u32,
    decoded: VideoFrame,
    scaled: VideoFrame,
    eof_sent: bool,
}

impl VideoFile {
    /// Open a video file and prepare its best video stream for decoding.
    pub fn open(path: &Path) -> Result<Self> {
        ffmpeg::init().context("Failed to initialize FFmpeg")?;

        let ictx = input(path).with_context(|| format!("Failed to open video file {path:?}"))?;
        let stream = ictx
            .streams()
            .best(Type::Video)
            .ok_or_else(|| anyhow!("No video stream in {path:?}"))?;
        let stream_index = stream.index();
        let time_base = stream.time_base();

        let frame_rate = f64::from(stream.avg_frame_rate());
        if !(frame_rate.is_finite() && frame_rate > 0.0) {
            return Err(anyhow!("Could not determine the frame rate of {path:?}"));
        }

        // Prefer the container's frame count; fall back to duration * fps,
        // which is an estimate for variable-frame-rate files. Container
        // duration is in AV_TIME_BASE units (microseconds).
        let total_frames = if stream.frames() > 0 {
            stream.frames() as u64
        } else {
            let duration_secs = ictx.duration() as f64 / 1_000_000.0;
            if duration_secs > 0.0 {
                (duration_secs * frame_rate).round() as u64
            } else {
                0
            }
        };

        let decoder = CodecContext::from_parameters(stream.parameters())
            .context("Failed to create decoder context")?
            .decoder()
            .video()
            .context("Failed to create video decoder")?;

        let (width, height) = (decoder.width(), decoder.height());
        let scaler = ScalingContext::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            Flags::BILINEAR,
        )
        .context("Failed to create scaler")?;

        info!("Opened {path:?}: {width}x{height}, {frame_rate:.3} fps, {total_frames} frames");

        Ok(Self {
            ictx,
            decoder,
            scaler,
            stream_index,
            time_base,
            frame_rate,
            total_frames,
            width,
            height,
            decoded: VideoFrame::empty(),
            scaled: VideoFrame::empty(),
            eof_sent: false,
        })
    }

    /// Copy the scaled frame's pixel plane into a tightly packed RGB buffer,
    /// stripping any per-row padding FFmpeg added for alignment.
    fn packed_rgb(&self) -> Vec<u8> {
        let stride = self.scaled.stride(0);
        let row_len = self.width as usize * 3;
        let rows = self.height as usize;
        let data = self.scaled.data(0);
        if stride == row_len {
            data[..row_len * rows].to_vec()
        } else {
            let mut buffer = Vec::with_capacity(row_len * rows);
            for row in 0..rows {
                let start = row * stride;
                buffer.extend_from_slice(&data[start..start + row_len]);
            }
            buffer
        }
    }
}

impl FrameSource for VideoFile {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    fn total_frames(&self) -> u64 {
        self.total_frames
    }

    fn seek(&mut self, seconds: f64) -> Result<()> {
        // Container-level seeking takes AV_TIME_BASE (microsecond) stamps
        // and lands on the keyframe at or before the target; the sampler
        // discards the pre-roll frames decoded on the way in.
        let position = (seconds * 1_000_000.0) as i64;
        self.ictx
            .seek(position, ..position)
            .with_context(|| format!("Failed to seek to {seconds:.3}s"))?;
        self.decoder.flush();
        self.eof_sent = false;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<SourceFrame>> {
        loop {
            if self.decoder.receive_frame(&mut self.decoded).is_ok() {
                let pts = self
                    .decoded
                    .timestamp()
                    .or_else(|| self.decoded.pts())
                    .unwrap_or(0);
                let timestamp = pts.max(0) as f64 * f64::from(self.time_base);
                self.scaler
                    .run(&self.decoded, &mut self.scaled)
                    .context("Failed to scale frame to RGB")?;
                let image = RgbImage::from_raw(self.width, self.height, self.packed_rgb())
                    .ok_or_else(|| anyhow!("Decoded frame is smaller than expected"))?;
                return Ok(Some(SourceFrame { timestamp, image }));
            }

            if self.eof_sent {
                debug!("decoder drained at end of stream");
                return Ok(None);
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.ictx) {
                Ok(()) => {
                    if packet.stream() == self.stream_index {
                        self.decoder
                            .send_packet(&packet)
                            .context("Failed to send packet to decoder")?;
                    }
                }
                Err(ffmpeg::Error::Eof) => {
                    self.decoder.send_eof().context("Failed to flush decoder")?;
                    self.eof_sent = true;
                }
                Err(_) => {
                    // Transient demuxer error, try the next packet.
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Deterministic in-memory source: evenly spaced solid black frames.
    pub(crate) struct FakeSource {
        fps: f64,
        frames: u64,
        cursor: u64,
        keyframe_interval: u64,
        hide_total: bool,
        width: u32,
        height: u32,
    }

    impl FakeSource {
        pub(crate) fn new(fps: f64, frames: u64) -> Self {
            Self {
                fps,
                frames,
                cursor: 0,
                keyframe_interval: 1,
                hide_total: false,
                width: 64,
                height: 48,
            }
        }

        /// Make seeks snap back to multiples of `interval` frames, the way
        /// container seeking lands on the preceding keyframe.
        pub(crate) fn with_keyframe_interval(mut self, interval: u64) -> Self {
            self.keyframe_interval = interval;
            self
        }

        /// Report an unknown frame count, like a stream without a duration.
        pub(crate) fn with_total_frames_hidden(mut self) -> Self {
            self.hide_total = true;
            self
        }
    }

    impl FrameSource for FakeSource {
        fn dimensions(&self) -> (u32, u32) {
            (self.width, self.height)
        }

        fn frame_rate(&self) -> f64 {
            self.fps
        }

        fn total_frames(&self) -> u64 {
            if self.hide_total { 0 } else { self.frames }
        }

        fn seek(&mut self, seconds: f64) -> Result<()> {
            let frame = (seconds * self.fps).floor() as u64;
            self.cursor = frame - frame % self.keyframe_interval;
            Ok(())
        }

        fn read_frame(&mut self) -> Result<Option<SourceFrame>> {
            if self.cursor >= self.frames {
                return Ok(None);
            }
            let timestamp = self.cursor as f64 / self.fps;
            self.cursor += 1;
            Ok(Some(SourceFrame {
                timestamp,
                image: RgbImage::new(self.width, self.height),
            }))
        }
    }
}
