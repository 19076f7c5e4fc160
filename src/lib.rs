//! # Book Genre
//!
//! Classifies the text of PDF documents as **Fiction**, **Non-Fiction** or
//! **Other**.
//!
//! A multilingual transformer model assigns one of nine native text genres;
//! a fixed table reduces that to the final label. The classifier is reachable
//! through an upload page, a REST endpoint and the `genre` CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌────────────┐   ┌─────────┐
//! │  Upload  │──▶│  Extract  │──▶│ Classifier │──▶│ Reducer │
//! │ /predict │   │ PDF→text  │   │ (ONNX)     │   │ 9 → 3   │
//! └──────────┘   └───────────┘   └────────────┘   └─────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! genre labels                        # print the label mapping
//! genre classify ./book.pdf           # classify one file
//! genre serve                         # start the web UI and API on :8050
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`labels`] | Native labels and the final-label reduction |
//! | [`extract`] | PDF text extraction |
//! | [`classifier`] | Classifier trait and shared model handle |
//! | [`pipeline`] | Extract → classify → reduce |
//! | [`upload`] | Data-URI uploads and HTML result rendering |
//! | [`server`] | HTTP server |

pub mod classifier;
pub mod config;
pub mod extract;
pub mod labels;
pub mod models;
pub mod pipeline;
pub mod server;
pub mod upload;

#[cfg(test)]
#[path = "../tests/common/pdf.rs"]
mod test_pdf;
