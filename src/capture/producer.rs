use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::mood::{EmotionKind, EmotionSample};

use super::vision::{crop_face, EmotionClassifier, FaceDetector, FrameSource};

/// Outcome of one capture attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Capture {
    Sample(EmotionSample),
    /// Frame read fine but no face was found.
    NoFace,
    /// The feed has nothing more to give; the loop stops.
    Exhausted,
}

/// Blocking producer run once per tick on the blocking pool.
pub trait SampleProducer: Send + 'static {
    fn produce(&mut self, timestamp: DateTime<Utc>) -> Result<Capture>;
}

/// Frame → grayscale → first detected face → classifier.
pub struct VisionProducer<S, D, C> {
    source: S,
    detector: D,
    classifier: C,
}

impl<S, D, C> VisionProducer<S, D, C>
where
    S: FrameSource,
    D: FaceDetector,
    C: EmotionClassifier,
{
    pub fn new(source: S, detector: D, classifier: C) -> Self {
        Self {
            source,
            detector,
            classifier,
        }
    }
}

impl<S, D, C> SampleProducer for VisionProducer<S, D, C>
where
    S: FrameSource + 'static,
    D: FaceDetector + 'static,
    C: EmotionClassifier + 'static,
{
    fn produce(&mut self, timestamp: DateTime<Utc>) -> Result<Capture> {
        let Some(frame) = self.source.next_frame().context("frame read failed")? else {
            return Ok(Capture::Exhausted);
        };

        let gray = frame.to_luma8();
        let faces = self.detector.detect(&gray).context("face detection failed")?;

        let Some(face) = faces.first().and_then(|face| crop_face(&gray, face)) else {
            return Ok(Capture::NoFace);
        };

        let (label, confidence) = self
            .classifier
            .classify(&face)
            .context("emotion classification failed")?;

        Ok(Capture::Sample(EmotionSample::new(label, confidence, timestamp)))
    }
}

/// One line of a recorded classifier feed. A missing or null emotion is a frame without a face.
#[derive(Debug, Deserialize)]
struct ReplayRecord {
    #[serde(default)]
    emotion: Option<EmotionKind>,
    #[serde(default)]
    confidence: f32,
}

/// Replays classifier output stored as JSON lines, one frame per line.
pub struct ReplayProducer<R> {
    lines: Lines<R>,
    line_no: usize,
}

impl ReplayProducer<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open replay file {}", path.display()))?;
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<R: BufRead> ReplayProducer<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl<R> SampleProducer for ReplayProducer<R>
where
    R: BufRead + Send + 'static,
{
    fn produce(&mut self, timestamp: DateTime<Utc>) -> Result<Capture> {
        loop {
            let Some(line) = self.lines.next() else {
                return Ok(Capture::Exhausted);
            };
            self.line_no += 1;

            let line = line.context("failed to read replay line")?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let record: ReplayRecord = serde_json::from_str(line)
                .with_context(|| format!("invalid replay record on line {}", self.line_no))?;

            return Ok(match record.emotion {
                Some(label) => {
                    Capture::Sample(EmotionSample::new(label, record.confidence, timestamp))
                }
                None => Capture::NoFace,
            });
        }
    }
}
