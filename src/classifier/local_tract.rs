//! Tract-based local sequence classification.
//!
//! Pure-Rust path: loads an ONNX export of the genre model with tract-onnx,
//! tokenizes with the tokenizers crate and reads class labels from the
//! model's `config.json`. Model files are taken from `model.dir`, or fetched
//! once from the Hugging Face repository into the cache directory.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokenizers::{Tokenizer, TruncationParams};
use tracing::info;
use tract_onnx::prelude::*;

use super::{argmax, ClassifierError, GenreClassifier, Prediction};
use crate::config::ModelConfig;

/// A loaded ONNX sequence-classification model.
pub struct TractClassifier {
    plan: TypedRunnableModel<TypedModel>,
    tokenizer: Tokenizer,
    labels: Vec<String>,
}

/// The part of a Hugging Face `config.json` we need.
#[derive(Debug, Deserialize)]
struct ModelLabels {
    id2label: HashMap<String, String>,
}

impl TractClassifier {
    /// Load model, tokenizer and labels. Downloads missing files first when
    /// the model comes from a repository.
    pub fn load(config: &ModelConfig) -> Result<Self, ClassifierError> {
        let started = std::time::Instant::now();
        let classifier =
            Self::try_load(config).map_err(|e| ClassifierError::Unavailable(format!("{:#}", e)))?;
        info!(
            labels = classifier.labels.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "loaded classification model"
        );
        Ok(classifier)
    }

    fn try_load(config: &ModelConfig) -> Result<Self> {
        let files = ensure_model_files(config)?;

        let mut tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| anyhow::anyhow!("Load tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: config.max_seq_length,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Set truncation: {}", e))?;
        tokenizer.with_padding(None);

        let labels = read_labels(&files.config)?;

        let plan = tract_onnx::onnx()
            .model_for_path(&files.onnx)
            .map_err(|e| anyhow::anyhow!("Load ONNX: {}", e))?
            .into_optimized()
            .map_err(|e| anyhow::anyhow!("Optimize: {}", e))?
            .into_runnable()
            .map_err(|e| anyhow::anyhow!("Build tract runnable: {}", e))?;

        Ok(Self {
            plan,
            tokenizer,
            labels,
        })
    }

    /// Class labels in index order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    fn logits(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("Tokenize: {}", e))?;

        let ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        let seq_len = ids.len();
        if seq_len == 0 {
            bail!("tokenizer produced no tokens");
        }

        let input_ids: Tensor = ndarray::Array2::from_shape_vec((1, seq_len), ids)
            .map_err(|e| anyhow::anyhow!("Input ids shape: {}", e))?
            .into();
        let attention_mask: Tensor = ndarray::Array2::from_shape_vec((1, seq_len), mask)
            .map_err(|e| anyhow::anyhow!("Attention mask shape: {}", e))?
            .into();

        let result = self.plan.run(tvec!(input_ids.into(), attention_mask.into()))?;

        let output = result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No output tensor"))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| anyhow::anyhow!("Output to array: {}", e))?;

        // Logits are [1, num_labels].
        let shape = view.shape().to_vec();
        if shape.len() != 2 || shape[0] != 1 || shape[1] != self.labels.len() {
            bail!(
                "Unexpected output shape: {:?}, expected [1, {}]",
                shape,
                self.labels.len()
            );
        }
        Ok(view.iter().copied().collect())
    }
}

impl GenreClassifier for TractClassifier {
    fn classify(&self, text: &str) -> Result<Prediction, ClassifierError> {
        let logits = self
            .logits(text)
            .map_err(|e| ClassifierError::Inference(format!("{:#}", e)))?;
        let best = argmax(&logits)
            .ok_or_else(|| ClassifierError::Inference("model returned no scores".into()))?;

        Ok(Prediction {
            label: self.labels[best].clone(),
            scores: self.labels.iter().cloned().zip(logits).collect(),
        })
    }
}

struct ModelFiles {
    onnx: PathBuf,
    tokenizer: PathBuf,
    config: PathBuf,
}

/// Resolve model files from the local directory, or download them from the repository.
fn ensure_model_files(config: &ModelConfig) -> Result<ModelFiles> {
    if let Some(dir) = &config.dir {
        let files = ModelFiles {
            onnx: dir.join(&config.onnx_file),
            tokenizer: dir.join(&config.tokenizer_file),
            config: dir.join(&config.config_file),
        };
        for path in [&files.onnx, &files.tokenizer, &files.config] {
            anyhow::ensure!(path.exists(), "model file not found: {}", path.display());
        }
        return Ok(files);
    }

    let repo = config
        .repo
        .as_deref()
        .context("model.repo or model.dir must be set")?;
    let model_dir = cache_dir(config)?.join(repo.replace('/', "--"));
    let files = ModelFiles {
        onnx: model_dir.join(&config.onnx_file),
        tokenizer: model_dir.join(&config.tokenizer_file),
        config: model_dir.join(&config.config_file),
    };
    download_to_cache(repo, &config.onnx_file, &files.onnx)?;
    download_to_cache(repo, &config.tokenizer_file, &files.tokenizer)?;
    download_to_cache(repo, &config.config_file, &files.config)?;
    Ok(files)
}

fn cache_dir(config: &ModelConfig) -> Result<PathBuf> {
    let dir = match &config.cache_dir {
        Some(dir) => dir.clone(),
        None => {
            let base = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(base)
                .join(".cache")
                .join("book-genre")
                .join("models")
        }
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Create cache dir: {}", dir.display()))?;
    Ok(dir)
}

fn download_to_cache(repo: &str, path: &str, cache_path: &Path) -> Result<()> {
    if cache_path.exists() {
        return Ok(());
    }
    let url = format!(
        "https://huggingface.co/{}/resolve/main/{}",
        repo,
        path.replace(' ', "%20")
    );
    info!(%url, "downloading model file");
    let resp = reqwest::blocking::get(&url)
        .and_then(|r| r.error_for_status())
        .with_context(|| format!("Download {}", url))?;
    let bytes = resp.bytes().context("Read body")?;
    if let Some(parent) = cache_path.parent() {
        std::fs::create_dir_all(parent).context("Create cache parent")?;
    }
    std::fs::write(cache_path, &bytes)
        .with_context(|| format!("Write cache: {}", cache_path.display()))?;
    Ok(())
}

/// Read `id2label` from a model `config.json`, ordered by class index.
fn read_labels(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Read model config: {}", path.display()))?;
    parse_labels(&content)
}

fn parse_labels(content: &str) -> Result<Vec<String>> {
    let parsed: ModelLabels =
        serde_json::from_str(content).context("Parse model config (id2label)")?;

    let mut indexed = parsed
        .id2label
        .into_iter()
        .map(|(id, label)| {
            id.parse::<usize>()
                .map(|i| (i, label))
                .with_context(|| format!("Invalid class index in id2label: '{}'", id))
        })
        .collect::<Result<Vec<_>>>()?;
    indexed.sort_by_key(|(i, _)| *i);

    for (expected, (i, _)) in indexed.iter().enumerate() {
        if *i != expected {
            bail!("id2label indices are not contiguous: missing {}", expected);
        }
    }
    if indexed.is_empty() {
        bail!("id2label is empty");
    }
    Ok(indexed.into_iter().map(|(_, label)| label).collect())
}
