//! Core data models that flow through the classification pipeline.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::labels::{FinalLabel, NativeLabel};

/// One submitted document. Consumed by a single pipeline call.
#[derive(Debug, Clone)]
pub struct DocumentPayload {
    pub filename: String,
    /// Upload time in seconds since the Unix epoch.
    pub uploaded_at: f64,
    pub bytes: Vec<u8>,
}

impl DocumentPayload {
    pub fn new(filename: impl Into<String>, uploaded_at: f64, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            uploaded_at,
            bytes,
        }
    }
}

/// Text extracted from every page of a document, in page order.
///
/// Never blank: a document without usable text is an extraction failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText(String);

impl ExtractedText {
    /// Returns `None` when `text` is empty or whitespace only.
    pub fn new(text: String) -> Option<Self> {
        if text.trim().is_empty() {
            None
        } else {
            Some(Self(text))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Per-label model scores, in the model's label order.
///
/// Serializes as a JSON object whose key order follows the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceScores(Vec<(NativeLabel, f32)>);

impl ConfidenceScores {
    pub fn new(scores: Vec<(NativeLabel, f32)>) -> Self {
        Self(scores)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, label: NativeLabel) -> Option<f32> {
        self.0.iter().find(|(l, _)| *l == label).map(|(_, s)| *s)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(NativeLabel, f32)> {
        self.0.iter()
    }
}

impl Serialize for ConfidenceScores {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, score) in &self.0 {
            map.serialize_entry(label.as_str(), score)?;
        }
        map.end()
    }
}

/// The pipeline's output for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub raw_label: NativeLabel,
    pub confidence_scores: ConfidenceScores,
    pub final_label: FinalLabel,
}

/// Wire shape of a successful `POST /predict` (and `genre classify`).
#[derive(Debug, Serialize)]
pub struct PredictResponse<'a> {
    pub predicted_class_raw: NativeLabel,
    pub logit_score: &'a ConfidenceScores,
    pub predicted_class_final: FinalLabel,
}

impl<'a> From<&'a ClassificationResult> for PredictResponse<'a> {
    fn from(result: &'a ClassificationResult) -> Self {
        Self {
            predicted_class_raw: result.raw_label,
            logit_score: &result.confidence_scores,
            predicted_class_final: result.final_label,
        }
    }
}
