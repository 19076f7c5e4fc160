//! Interactive upload adapter.
//!
//! The browser page reads each picked file as a data URI
//! (`data:application/pdf;base64,<payload>`) and posts it together with the
//! file name and its modification time. Only names containing `.pdf` are
//! processed; everything else is skipped without a trace in the output.
//! Any failure while processing a file collapses into one generic message.

use base64::Engine;
use chrono::{DateTime, Local, TimeZone};
use serde::Deserialize;

use crate::classifier::GenreClassifier;
use crate::labels::FinalLabel;
use crate::models::DocumentPayload;
use crate::pipeline::classify_document;

pub const GENERIC_ERROR: &str = "There was an error processing this file.";

/// One file as posted by the upload page.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedFile {
    /// Data URI: `<content-type segment>,<base64 payload>`.
    pub contents: String,
    pub filename: String,
    /// Seconds since the Unix epoch.
    pub last_modified: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadRequest {
    #[serde(default)]
    pub files: Vec<UploadedFile>,
}

/// The rendered outcome for one accepted file.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Classified {
        filename: String,
        date: String,
        prediction: FinalLabel,
    },
    Failed,
}

#[derive(Debug, thiserror::Error)]
pub enum DataUriError {
    #[error("data URI has no ',' separator")]
    MissingSeparator,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Whether the upload adapter processes a file with this name.
pub fn accepts(filename: &str) -> bool {
    filename.contains(".pdf")
}

/// Split a data URI on its first comma and decode the base64 payload.
pub fn decode_data_uri(contents: &str) -> Result<Vec<u8>, DataUriError> {
    let (_content_type, payload) = contents
        .split_once(',')
        .ok_or(DataUriError::MissingSeparator)?;
    Ok(base64::engine::general_purpose::STANDARD.decode(payload.trim())?)
}

/// Render an epoch timestamp as `YYYY-MM-DD HH:MM:SS` in `tz`.
pub fn format_upload_date<Tz: TimeZone>(seconds: f64, tz: &Tz) -> Option<String>
where
    Tz::Offset: std::fmt::Display,
{
    if !seconds.is_finite() {
        return None;
    }
    // Rendered to whole seconds, so the fraction is dropped.
    let utc = DateTime::from_timestamp(seconds.floor() as i64, 0)?;
    Some(
        utc.with_timezone(tz)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
    )
}

/// Decode, classify and render one accepted file. Never fails: errors become
/// [`UploadOutcome::Failed`].
pub fn process_file(file: &UploadedFile, classifier: &dyn GenreClassifier) -> UploadOutcome {
    let bytes = match decode_data_uri(&file.contents) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(filename = %file.filename, error = %e, "rejected upload payload");
            return UploadOutcome::Failed;
        }
    };
    let Some(date) = format_upload_date(file.last_modified, &Local) else {
        tracing::warn!(filename = %file.filename, ts = file.last_modified, "invalid upload timestamp");
        return UploadOutcome::Failed;
    };

    let payload = DocumentPayload::new(file.filename.clone(), file.last_modified, bytes);
    match classify_document(&payload, classifier) {
        Ok(result) => UploadOutcome::Classified {
            filename: payload.filename,
            date,
            prediction: result.final_label,
        },
        Err(_) => UploadOutcome::Failed,
    }
}

/// Render outcomes as the HTML fragment inserted into the upload page.
pub fn render_outcomes(outcomes: &[UploadOutcome]) -> String {
    let mut html = String::new();
    for outcome in outcomes {
        match outcome {
            UploadOutcome::Classified {
                filename,
                date,
                prediction,
            } => {
                html.push_str("<div class=\"result\"><p><strong>Prediction</strong>:</p>");
                html.push_str("<table><thead><tr><th>filename</th><th>date</th><th>prediction</th></tr></thead><tbody><tr>");
                html.push_str(&format!(
                    "<td>{}</td><td>{}</td><td>{}</td>",
                    escape_html(filename),
                    escape_html(date),
                    prediction
                ));
                html.push_str("</tr></tbody></table></div>\n");
            }
            UploadOutcome::Failed => {
                html.push_str(&format!("<div class=\"error\">{}</div>\n", GENERIC_ERROR));
            }
        }
    }
    html
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
