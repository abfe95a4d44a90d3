//! Model loading for the candle-backed sentence embedder

use logtriage_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[cfg(feature = "ml-models")]
use {
    crate::embedding::{l2_normalize, Embedder},
    candle_core::{DType, Device, Tensor},
    candle_nn::VarBuilder,
    candle_transformers::models::bert::{BertModel, Config as BertConfig},
    hf_hub::{api::sync::Api, Repo, RepoType},
    tokenizers::{Tokenizer, TruncationParams},
    tracing::info,
};

const CONFIG_FILE: &str = "config.json";
const TOKENIZER_FILE: &str = "tokenizer.json";
const WEIGHTS_FILE: &str = "model.safetensors";

/// Source location for model files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelSource {
    /// Local directory holding `config.json`, `tokenizer.json`, `model.safetensors`
    LocalPath { path: PathBuf },

    /// Download from Hugging Face Hub
    HuggingFace {
        repo_id: String,
        #[serde(default)]
        revision: Option<String>,
    },
}

/// Device type for inference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// CPU inference (always available)
    #[default]
    Cpu,
    /// CUDA GPU inference (if available)
    Cuda,
    /// Metal (Apple Silicon)
    Metal,
}

/// Configuration for loading a sentence embedding model
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub source: ModelSource,
    pub device: DeviceType,
    /// Token limit; longer messages are truncated
    pub max_length: usize,
}

impl ModelConfig {
    /// Create a new model configuration from a local directory
    pub fn from_local(path: impl Into<PathBuf>) -> Self {
        Self {
            source: ModelSource::LocalPath { path: path.into() },
            device: DeviceType::Cpu,
            max_length: 256,
        }
    }

    /// Create a new model configuration from Hugging Face
    pub fn from_hf(repo_id: impl Into<String>) -> Self {
        Self {
            source: ModelSource::HuggingFace {
                repo_id: repo_id.into(),
                revision: None,
            },
            device: DeviceType::Cpu,
            max_length: 256,
        }
    }

    /// Set device
    pub fn with_device(mut self, device: DeviceType) -> Self {
        self.device = device;
        self
    }

    /// Set the token limit
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }
}

/// Resolved on-disk model files
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

impl ModelFiles {
    fn in_dir(dir: &Path) -> Result<Self> {
        let files = Self {
            config: dir.join(CONFIG_FILE),
            tokenizer: dir.join(TOKENIZER_FILE),
            weights: dir.join(WEIGHTS_FILE),
        };
        for path in [&files.config, &files.tokenizer, &files.weights] {
            if !path.exists() {
                return Err(Error::config(format!("Model file not found: {:?}", path)));
            }
        }
        Ok(files)
    }
}

/// Resolve model files from source
#[cfg(feature = "ml-models")]
pub fn resolve_model_files(source: &ModelSource) -> Result<ModelFiles> {
    match source {
        ModelSource::LocalPath { path } => ModelFiles::in_dir(path),
        ModelSource::HuggingFace { repo_id, revision } => {
            info!("Fetching embedding model from HuggingFace: {}", repo_id);

            let api = Api::new()
                .map_err(|e| Error::config(format!("Failed to initialize HF API: {}", e)))?;

            let repo = api.repo(Repo::with_revision(
                repo_id.clone(),
                RepoType::Model,
                revision.clone().unwrap_or_else(|| "main".to_string()),
            ));

            let fetch = |file: &str| {
                repo.get(file).map_err(|e| {
                    Error::config(format!("Failed to download {} from {}: {}", file, repo_id, e))
                })
            };

            Ok(ModelFiles {
                config: fetch(CONFIG_FILE)?,
                tokenizer: fetch(TOKENIZER_FILE)?,
                weights: fetch(WEIGHTS_FILE)?,
            })
        }
    }
}

/// Resolve model files from source
#[cfg(not(feature = "ml-models"))]
pub fn resolve_model_files(source: &ModelSource) -> Result<ModelFiles> {
    match source {
        ModelSource::LocalPath { path } => ModelFiles::in_dir(path),
        ModelSource::HuggingFace { .. } => Err(Error::config(
            "HuggingFace download requires 'ml-models' feature",
        )),
    }
}

/// BERT sentence encoder: mean-pooled, L2-normalized last hidden state
#[cfg(feature = "ml-models")]
pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
    name: String,
}

#[cfg(feature = "ml-models")]
impl BertEmbedder {
    /// Load the encoder; called once at startup
    pub fn load(config: &ModelConfig) -> Result<Self> {
        let files = resolve_model_files(&config.source)?;
        let device = create_device(config.device)?;

        let config_json = std::fs::read_to_string(&files.config)
            .map_err(|e| Error::config(format!("Failed to read model config {:?}: {}", files.config, e)))?;
        let bert_config: BertConfig = serde_json::from_str(&config_json)
            .map_err(|e| Error::config(format!("Failed to parse model config: {}", e)))?;
        let dimension = serde_json::from_str::<serde_json::Value>(&config_json)
            .map_err(|e| Error::config(format!("Failed to parse model config: {}", e)))?
            .get("hidden_size")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| Error::config("Model config has no hidden_size"))?
            as usize;

        let mut tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| Error::config(format!("Failed to load tokenizer: {}", e)))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: config.max_length,
                ..Default::default()
            }))
            .map_err(|e| Error::config(format!("Failed to configure truncation: {}", e)))?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[files.weights.clone()], DType::F32, &device)
                .map_err(|e| Error::config(format!("Failed to load weights: {}", e)))?
        };
        let model = BertModel::load(vb, &bert_config)
            .map_err(|e| Error::config(format!("Failed to load BERT model: {}", e)))?;

        let name = match &config.source {
            ModelSource::LocalPath { path } => path.display().to_string(),
            ModelSource::HuggingFace { repo_id, .. } => repo_id.clone(),
        };

        info!(model = %name, dimension, device = ?config.device, "Loaded sentence embedder");

        Ok(Self {
            model,
            tokenizer,
            device,
            dimension,
            name,
        })
    }

    fn forward(&self, text: &str) -> candle_core::Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| candle_core::Error::Msg(format!("Tokenization failed: {}", e)))?;

        let input_ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(encoding.get_type_ids(), &self.device)?.unsqueeze(0)?;

        // Single unpadded sequence: every position is attended, so a plain
        // mean over the token axis is the masked mean.
        let hidden = self.model.forward(&input_ids, &token_type_ids, None)?;
        hidden.mean(1)?.get(0)?.to_vec1::<f32>()
    }
}

#[cfg(feature = "ml-models")]
impl Embedder for BertEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = self
            .forward(text)
            .map_err(|e| Error::classifier(format!("Embedding forward pass failed: {}", e)))?;
        l2_normalize(&mut vector);
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Create Candle device from device type
#[cfg(feature = "ml-models")]
fn create_device(device_type: DeviceType) -> Result<Device> {
    match device_type {
        DeviceType::Cpu => Ok(Device::Cpu),
        DeviceType::Cuda => Device::new_cuda(0)
            .map_err(|e| Error::config(format!("Failed to create CUDA device: {}", e))),
        DeviceType::Metal => Device::new_metal(0)
            .map_err(|e| Error::config(format!("Failed to create Metal device: {}", e))),
    }
}
