use std::io;

use serde::ser::{Error as _, Serialize, SerializeMap, Serializer};
use serde_json::ser::Formatter;

use crate::error::PredictError;
use crate::labels::{Emotion, NUM_LABELS};

/// The classifier's verdict for one image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: Emotion,
    /// Probability of `label`, in `[0, 1]`
    pub confidence: f32,
}

impl Prediction {
    /// Pick the most likely label from the model's output scores.
    ///
    /// Scores that do not already look like probabilities are softmax-normalized
    /// first. On ties the lowest index wins.
    pub fn from_scores(scores: &[f32]) -> Result<Prediction, PredictError> {
        if scores.len() != NUM_LABELS {
            return Err(PredictError::Inference(format!(
                "expected {} scores, model returned {}",
                NUM_LABELS,
                scores.len()
            )));
        }

        if scores.iter().any(|s| !s.is_finite()) {
            return Err(PredictError::Inference(format!(
                "model returned non-finite scores: {:?}",
                scores
            )));
        }

        let probabilities = if is_probability_vector(scores) {
            scores.to_vec()
        } else {
            tracing::debug!("Scores outside [0, 1], applying softmax");
            softmax(scores)
        };

        let (idx, confidence) = argmax(&probabilities);

        // argmax of a NUM_LABELS-long slice is always a valid label
        let label = Emotion::from_index(idx)
            .ok_or_else(|| PredictError::Inference(format!("no label for index {}", idx)))?;

        Ok(Prediction { label, confidence })
    }
}

/// Index and value of the largest score, first occurrence on ties.
fn argmax(scores: &[f32]) -> (usize, f32) {
    let mut best = (0, f32::NEG_INFINITY);
    for (idx, &s) in scores.iter().enumerate() {
        if s > best.1 {
            best = (idx, s);
        }
    }
    best
}

fn is_probability_vector(scores: &[f32]) -> bool {
    scores.iter().all(|s| (0.0..=1.0).contains(s))
}

fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp: Vec<f32> = scores.iter().map(|&s| (s - max).exp()).collect();
    let sum: f32 = exp.iter().sum();
    exp.into_iter().map(|e| e / sum).collect()
}

/// The single record printed per invocation.
#[derive(Debug)]
pub enum Outcome {
    Prediction(Prediction),
    Failure(String),
}

impl From<Result<Prediction, PredictError>> for Outcome {
    fn from(result: Result<Prediction, PredictError>) -> Self {
        match result {
            Ok(prediction) => Outcome::Prediction(prediction),
            Err(err) => Outcome::Failure(err.to_string()),
        }
    }
}

impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Outcome::Prediction(p) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("prediction", &p.label)?;
                // widen so the printed digits match the f32 score exactly
                map.serialize_entry("confidence", &f64::from(p.confidence))?;
                map.end()
            }
            Outcome::Failure(message) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", message)?;
                map.end()
            }
        }
    }
}

impl Outcome {
    /// Render as one line of JSON, `{"key": value, ...}` style, with
    /// non-ASCII characters left as-is.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        let mut buf = Vec::with_capacity(64);
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
        self.serialize(&mut ser)?;
        String::from_utf8(buf).map_err(serde_json::Error::custom)
    }
}

/// Compact single-line output with a space after `,` and `:`.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }
}
