//! Document → genre pipeline: extract, classify, reduce.
//!
//! Each call is independent and runs its stages strictly in sequence. The
//! classifier is only consulted once text extraction has succeeded, and a
//! call yields either a complete [`ClassificationResult`] or an error.

use std::collections::HashSet;

use tracing::{error, info, warn};

use crate::classifier::{ClassifierError, GenreClassifier, Prediction};
use crate::extract::{extract_bytes, ExtractionFailure};
use crate::labels::{reduce, NativeLabel};
use crate::models::{ClassificationResult, ConfidenceScores, DocumentPayload};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("extraction failed: {0}")]
    ExtractionFailed(#[from] ExtractionFailure),
    #[error("{0}")]
    ModelUnavailable(#[from] ClassifierError),
    /// The classifier's labels do not match the native label table.
    #[error("label invariant violated: {0}")]
    InvariantViolation(String),
}

impl PipelineError {
    /// Whether the failure is caused by the submitted document.
    pub fn is_user_error(&self) -> bool {
        matches!(self, PipelineError::ExtractionFailed(_))
    }
}

/// Classify one submitted document.
pub fn classify_document(
    payload: &DocumentPayload,
    classifier: &dyn GenreClassifier,
) -> Result<ClassificationResult, PipelineError> {
    let result = classify_bytes(&payload.bytes, classifier);
    match &result {
        Ok(r) => info!(
            filename = %payload.filename,
            raw = %r.raw_label,
            label = %r.final_label,
            "classified document"
        ),
        Err(e) => log_failure(&payload.filename, e),
    }
    result
}

/// Classify the raw bytes of a PDF.
pub fn classify_bytes(
    bytes: &[u8],
    classifier: &dyn GenreClassifier,
) -> Result<ClassificationResult, PipelineError> {
    let text = extract_bytes(bytes).into_result()?;
    let prediction = classifier.classify(text.as_str())?;
    assemble(prediction)
}

fn assemble(prediction: Prediction) -> Result<ClassificationResult, PipelineError> {
    let raw_label = parse_label(&prediction.label)?;

    let mut seen = HashSet::new();
    let mut scores = Vec::with_capacity(prediction.scores.len());
    for (label, score) in prediction.scores {
        let label = parse_label(&label)?;
        if !seen.insert(label) {
            return Err(PipelineError::InvariantViolation(format!(
                "duplicate score for '{}'",
                label
            )));
        }
        scores.push((label, score));
    }
    if let Some(missing) = NativeLabel::ALL.iter().find(|l| !seen.contains(*l)) {
        return Err(PipelineError::InvariantViolation(format!(
            "classifier returned no score for '{}'",
            missing
        )));
    }

    Ok(ClassificationResult {
        raw_label,
        confidence_scores: ConfidenceScores::new(scores),
        final_label: reduce(raw_label),
    })
}

fn parse_label(label: &str) -> Result<NativeLabel, PipelineError> {
    label
        .parse()
        .map_err(|e: crate::labels::UnknownLabel| PipelineError::InvariantViolation(e.to_string()))
}

fn log_failure(filename: &str, err: &PipelineError) {
    match err {
        PipelineError::ExtractionFailed(reason) => {
            warn!(%filename, %reason, "no usable text in document")
        }
        PipelineError::ModelUnavailable(e) => {
            error!(%filename, error = %e, "classification model unavailable")
        }
        PipelineError::InvariantViolation(msg) => {
            error!(%filename, %msg, "classifier and label table disagree")
        }
    }
}
