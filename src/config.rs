use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL_REPO: &str = "classla/xlm-roberta-base-multilingual-text-genre-classifier";

/// Longest input the XLM-RoBERTa genre model accepts, in tokens.
pub const MODEL_MAX_SEQ_LENGTH: usize = 512;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub predict: PredictConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8050".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    /// Hugging Face repository to download model files from.
    #[serde(default = "default_repo")]
    pub repo: Option<String>,
    /// Local directory holding the model files. Takes precedence over `repo`.
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default = "default_onnx_file")]
    pub onnx_file: String,
    #[serde(default = "default_tokenizer_file")]
    pub tokenizer_file: String,
    #[serde(default = "default_config_file")]
    pub config_file: String,
    #[serde(default = "default_max_seq_length")]
    pub max_seq_length: usize,
    /// Load the model at server start instead of on the first request.
    #[serde(default)]
    pub preload: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            repo: default_repo(),
            dir: None,
            cache_dir: None,
            onnx_file: default_onnx_file(),
            tokenizer_file: default_tokenizer_file(),
            config_file: default_config_file(),
            max_seq_length: default_max_seq_length(),
            preload: false,
        }
    }
}

fn default_repo() -> Option<String> {
    Some(DEFAULT_MODEL_REPO.to_string())
}
fn default_onnx_file() -> String {
    "onnx/model.onnx".to_string()
}
fn default_tokenizer_file() -> String {
    "tokenizer.json".to_string()
}
fn default_config_file() -> String {
    "config.json".to_string()
}
fn default_max_seq_length() -> usize {
    MODEL_MAX_SEQ_LENGTH
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
        }
    }
}

fn default_max_bytes() -> usize {
    50 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct PredictConfig {
    /// Allow `filepath` to be an `http://` or `https://` URL.
    #[serde(default)]
    pub allow_remote: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PredictConfig {
    fn default() -> Self {
        Self {
            allow_remote: false,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.model.max_seq_length == 0 || config.model.max_seq_length > MODEL_MAX_SEQ_LENGTH {
        anyhow::bail!(
            "model.max_seq_length must be in 1..={}",
            MODEL_MAX_SEQ_LENGTH
        );
    }

    if config.model.dir.is_none() && config.model.repo.as_deref().map_or(true, str::is_empty) {
        anyhow::bail!("one of model.dir or model.repo must be set");
    }

    if config.upload.max_bytes == 0 {
        anyhow::bail!("upload.max_bytes must be > 0");
    }

    if config.predict.timeout_secs == 0 {
        anyhow::bail!("predict.timeout_secs must be > 0");
    }

    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    Ok(())
}
