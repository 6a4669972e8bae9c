//! Recording OCR detections for sampled frames.

use log::{debug, warn};

use crate::merge::RawDetection;
use crate::ocr::{TextRecognizer, joined_text};
use crate::video::SourceFrame;

/// Everything one sampling pass learned.
#[derive(Debug, Default)]
pub struct DetectionLog {
    /// Detections in sampling order, one per frame with readable text.
    pub detections: Vec<RawDetection>,
    /// Sampled frames whose OCR call failed outright.
    pub ocr_failures: u64,
}

/// Stateful collector that turns sampled frames into raw detections.
///
/// One bad frame never aborts a run: recognizer errors are logged, counted,
/// and treated as "no text here".
pub struct DetectionRecorder {
    interval_seconds: f64,
    log: DetectionLog,
}

impl DetectionRecorder {
    /// `interval_seconds` is the span of video one sampled frame stands for;
    /// it becomes the provisional duration of each detection.
    pub fn new(interval_seconds: f64) -> Self {
        Self {
            interval_seconds,
            log: DetectionLog::default(),
        }
    }

    /// Run OCR over one sampled frame and record the outcome.
    pub fn process_frame(&mut self, frame: &SourceFrame, recognizer: &mut dyn TextRecognizer) {
        match recognizer.recognize(&frame.image) {
            Ok(lines) => {
                let text = joined_text(&lines);
                if text.is_empty() {
                    debug!("no text at {:.2}s", frame.timestamp);
                } else {
                    self.log.detections.push(RawDetection {
                        start: frame.timestamp,
                        end: frame.timestamp + self.interval_seconds,
                        text,
                    });
                }
            }
            Err(error) => {
                self.log.ocr_failures += 1;
                warn!("OCR failed on frame at {:.2}s: {error:#}", frame.timestamp);
            }
        }
    }

    /// Finish the pass and hand back everything recorded.
    pub fn finish(self) -> DetectionLog {
        self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::RecognizedLine;
    use anyhow::{Result, anyhow};
    use image::RgbImage;

    /// Recognizer scripted with one canned outcome per call.
    struct ScriptedRecognizer {
        outcomes: std::vec::IntoIter<Result<Vec<RecognizedLine>>>,
    }

    impl ScriptedRecognizer {
        fn new(outcomes: Vec<Result<Vec<RecognizedLine>>>) -> Self {
            Self {
                outcomes: outcomes.into_iter(),
            }
        }
    }

    impl TextRecognizer for ScriptedRecognizer {
        fn recognize(&mut self, _image: &RgbImage) -> Result<Vec<RecognizedLine>> {
            self.outcomes.next().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn frame_at(timestamp: f64) -> SourceFrame {
        SourceFrame {
            timestamp,
            image: RgbImage::new(8, 8),
        }
    }

    fn lines(text: &str) -> Vec<RecognizedLine> {
        vec![RecognizedLine {
            text: text.to_string(),
            confidence: 92.0,
        }]
    }

    #[test]
    fn detection_spans_one_sample_interval() {
        let mut recognizer = ScriptedRecognizer::new(vec![Ok(lines("hello"))]);
        let mut recorder = DetectionRecorder::new(0.25);
        recorder.process_frame(&frame_at(4.0), &mut recognizer);
        let log = recorder.finish();
        assert_eq!(
            log.detections,
            vec![RawDetection {
                start: 4.0,
                end: 4.25,
                text: "hello".to_string()
            }]
        );
    }

    #[test]
    fn frames_without_text_leave_gaps() {
        let mut recognizer = ScriptedRecognizer::new(vec![
            Ok(lines("first")),
            Ok(Vec::new()),
            Ok(lines("second")),
        ]);
        let mut recorder = DetectionRecorder::new(0.5);
        for i in 0..3 {
            recorder.process_frame(&frame_at(i as f64 * 0.5), &mut recognizer);
        }
        let log = recorder.finish();
        assert_eq!(log.detections.len(), 2);
        assert_eq!(log.detections[0].text, "first");
        assert_eq!(log.detections[1].text, "second");
        assert_eq!(log.ocr_failures, 0);
    }

    #[test]
    fn recognizer_failure_is_counted_and_skipped() {
        let mut recognizer = ScriptedRecognizer::new(vec![
            Ok(lines("before")),
            Err(anyhow!("engine crashed")),
            Ok(lines("after")),
        ]);
        let mut recorder = DetectionRecorder::new(0.5);
        for i in 0..3 {
            recorder.process_frame(&frame_at(i as f64 * 0.5), &mut recognizer);
        }
        let log = recorder.finish();
        assert_eq!(log.detections.len(), 2);
        assert_eq!(log.ocr_failures, 1);
    }

    #[test]
    fn multi_line_text_is_joined_with_spaces() {
        let mut recognizer = ScriptedRecognizer::new(vec![Ok(vec![
            RecognizedLine {
                text: " Two ".to_string(),
                confidence: 90.0,
            },
            RecognizedLine {
                text: "lines".to_string(),
                confidence: 88.0,
            },
        ])]);
        let mut recorder = DetectionRecorder::new(0.25);
        recorder.process_frame(&frame_at(0.0), &mut recognizer);
        assert_eq!(recorder.finish().detections[0].text, "Two lines");
    }
}
