//! SubRip (.srt) output.
//!
//! Renders merged subtitle spans as numbered SRT blocks and handles the
//! `HH:MM:SS,mmm` timecode format the container uses.

use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// One subtitle span with its display window in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subtitle {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl Subtitle {
    /// Render this subtitle as one numbered SRT block, including the
    /// terminating blank line.
    pub fn to_block(&self, index: usize) -> String {
        format!(
            "{}\n{} --> {}\n{}\n\n",
            index,
            format_timestamp(self.start),
            format_timestamp(self.end),
            self.text
        )
    }
}

/// Format a time in seconds as an SRT timecode (`HH:MM:SS,mmm`).
///
/// The value is rounded to whole milliseconds first, so a fraction that
/// rounds up to 1000 ms carries into the seconds field. Hours wrap at 24.
pub fn format_timestamp(seconds: f64) -> String {
    let total_ms = (seconds * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let h = (total_secs / 3600) % 24;
    let m = (total_secs % 3600) / 60;
    let s = total_secs % 60;
    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}

/// Parse an SRT timecode back into seconds.
pub fn parse_timestamp(value: &str) -> Result<f64> {
    let (clock, millis) = value
        .split_once(',')
        .with_context(|| format!("timecode '{value}' is missing the ',mmm' part"))?;
    let mut fields = clock.split(':');
    let (h, m, s) = match (fields.next(), fields.next(), fields.next(), fields.next()) {
        (Some(h), Some(m), Some(s), None) => (h, m, s),
        _ => bail!("timecode '{value}' is not in HH:MM:SS,mmm form"),
    };
    let h: u64 = h
        .parse()
        .with_context(|| format!("bad hours in timecode '{value}'"))?;
    let m: u64 = m
        .parse()
        .with_context(|| format!("bad minutes in timecode '{value}'"))?;
    let s: u64 = s
        .parse()
        .with_context(|| format!("bad seconds in timecode '{value}'"))?;
    let ms: u64 = millis
        .parse()
        .with_context(|| format!("bad milliseconds in timecode '{value}'"))?;
    Ok((h * 3600 + m * 60 + s) as f64 + ms as f64 / 1000.0)
}

/// Render a subtitle sequence as the full contents of an .srt file.
///
/// An empty sequence yields an empty string, which is a valid zero-block
/// file.
pub fn to_srt_string(subtitles: &[Subtitle]) -> String {
    subtitles
        .iter()
        .enumerate()
        .map(|(i, subtitle)| subtitle.to_block(i + 1))
        .collect()
}

/// Write the subtitles to `path` as a UTF-8 .srt file.
pub fn write_file(subtitles: &[Subtitle], path: &Path) -> Result<()> {
    fs::write(path, to_srt_string(subtitles))
        .with_context(|| format!("Failed to write subtitle file {path:?}"))?;
    Ok(())
}
