//! Text recognition.
//!
//! Cropped frame regions reach the OCR engine through the [`TextRecognizer`]
//! trait, so the pipeline can run against deterministic stand-ins in tests.
//! The production implementation wraps the tesseract-rs crate.

use anyhow::{Context, Result, bail};
use image::RgbImage;
use log::debug;
use std::path::PathBuf;
use tesseract_rs::{TessPageIteratorLevel, TesseractAPI};

/// A single recognized line of text with its mean confidence.
#[derive(Debug, Clone)]
pub struct RecognizedLine {
    pub text: String,
    pub confidence: f32,
}

/// Recognizes text lines in a cropped frame region.
pub trait TextRecognizer {
    /// Run recognition over one RGB image.
    ///
    /// Returns the recognized lines in reading order; an empty vector means
    /// the region holds no readable text. Errors are per-call and
    /// recoverable, the caller decides whether one failed frame matters.
    fn recognize(&mut self, image: &RgbImage) -> Result<Vec<RecognizedLine>>;
}

/// Join recognized lines into one detection string.
///
/// Lines are trimmed and concatenated with single spaces; blank lines are
/// dropped. An empty result means no detection.
pub fn joined_text(lines: &[RecognizedLine]) -> String {
    lines
        .iter()
        .map(|line| line.text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// The default location where this version of `tesseract-rs` caches its
/// language data. The build script downloads traineddata files here.
fn tessdata_dir() -> Result<PathBuf> {
    let base_path = if cfg!(target_os = "macos") {
        let home = std::env::var("HOME").context("HOME env var not set")?;
        PathBuf::from(home)
            .join("Library")
            .join("Application Support")
    } else if cfg!(target_os = "linux") {
        let home = std::env::var("HOME").context("HOME env var not set")?;
        PathBuf::from(home).join(".tesseract-rs")
    } else if cfg!(target_os = "windows") {
        let appdata = std::env::var("APPDATA").context("APPDATA env var not set")?;
        PathBuf::from(appdata)
    } else {
        bail!("No known tessdata location for this operating system");
    };
    Ok(base_path.join("tesseract-rs").join("tessdata"))
}

/// Tesseract-backed [`TextRecognizer`].
pub struct TesseractRecognizer {
    api: TesseractAPI,
}

impl TesseractRecognizer {
    /// Initialize Tesseract for the given language code.
    ///
    /// The code is handed to Tesseract untouched and must name a traineddata
    /// file present in the cache directory (e.g. "eng", "chi_sim").
    pub fn new(lang: &str) -> Result<Self> {
        let api = TesseractAPI::new();
        let tessdata = tessdata_dir().context("Could not determine tessdata directory")?;
        let datapath = tessdata
            .to_str()
            .with_context(|| format!("tessdata path {tessdata:?} is not valid UTF-8"))?;
        api.init(datapath, lang)
            .context(format!("Failed to initialize Tesseract with language '{lang}'"))?;
        Ok(Self { api })
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&mut self, image: &RgbImage) -> Result<Vec<RecognizedLine>> {
        self.api
            .set_image(
                image.as_raw(),
                image.width() as i32,
                image.height() as i32,
                3, // bytes per pixel for RGB
                (image.width() * 3) as i32, // bytes per line
            )
            .context("Tesseract rejected the frame image")?;
        self.api
            .recognize()
            .context("Tesseract recognition failed")?;

        let iter = self
            .api
            .get_iterator()
            .context("Failed to get result iterator")?;

        let mut lines = Vec::new();
        // Loop while the iterator can advance to the next text line.
        while iter.next(TessPageIteratorLevel::RIL_TEXTLINE).unwrap_or(false) {
            let text = match iter.get_utf8_text(TessPageIteratorLevel::RIL_TEXTLINE) {
                Ok(text) => text.trim().to_string(),
                Err(_) => continue,
            };
            if text.is_empty() {
                continue;
            }
            let confidence = iter
                .confidence(TessPageIteratorLevel::RIL_TEXTLINE)
                .unwrap_or(0.0);
            debug!("recognized line ({confidence:.1}%): {text}");
            lines.push(RecognizedLine { text, confidence });
        }

        Ok(lines)
    }
}
