//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use book_genre::classifier::{ClassifierError, GenreClassifier, Prediction};
use book_genre::labels::NativeLabel;

mod pdf;

pub use pdf::minimal_pdf;

fn scores_with_winner(winner: NativeLabel) -> Vec<(String, f32)> {
    NativeLabel::ALL
        .iter()
        .map(|l| (l.as_str().to_string(), if *l == winner { 3.5 } else { -1.0 }))
        .collect()
}

/// Predicts from keywords in the text and counts its calls.
#[derive(Default)]
pub struct KeywordClassifier {
    pub calls: AtomicUsize,
}

impl KeywordClassifier {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl GenreClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> Result<Prediction, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let winner = if text.contains("dragon") {
            NativeLabel::ProseLyrical
        } else if text.contains("court") {
            NativeLabel::Legal
        } else if text.contains("Buy") {
            NativeLabel::Promotion
        } else {
            NativeLabel::News
        };
        Ok(Prediction {
            label: winner.as_str().to_string(),
            scores: scores_with_winner(winner),
        })
    }
}

/// A classifier whose model never loads.
pub struct UnavailableClassifier;

impl GenreClassifier for UnavailableClassifier {
    fn classify(&self, _text: &str) -> Result<Prediction, ClassifierError> {
        Err(ClassifierError::Unavailable("model files not found".to_string()))
    }

    fn is_loaded(&self) -> bool {
        false
    }
}

/// Predicts a label the native label table does not know.
pub struct UnknownLabelClassifier;

impl GenreClassifier for UnknownLabelClassifier {
    fn classify(&self, _text: &str) -> Result<Prediction, ClassifierError> {
        let mut scores = scores_with_winner(NativeLabel::Other);
        scores.push(("Poetry".to_string(), 9.0));
        Ok(Prediction {
            label: "Poetry".to_string(),
            scores,
        })
    }
}
