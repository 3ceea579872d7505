//! Resolves checkpoints on the Hugging Face Hub into local files.

use std::path::PathBuf;

use hf_hub::api::sync::{Api, ApiBuilder, ApiRepo};
use hf_hub::{Repo, RepoType};

use super::safetensor::{IndexFile, INDEX_FILE, SINGLE_FILE};
use crate::error::Error;
use crate::llm::llmconfig::{AdapterConfig, CheckpointConfig};

/// Files needed to build a tokenizer
#[derive(Debug, Clone)]
pub struct TokenizerFiles {
    /// `tokenizer.json`
    pub tokenizer_file: PathBuf,

    /// `tokenizer_config.json`, if the checkpoint ships one
    pub tokenizer_config_file: Option<PathBuf>,
}

/// Files needed to build a model
#[derive(Debug, Clone)]
pub struct ModelFiles {
    /// `config.json`
    pub config_file: PathBuf,

    /// Either the single `model.safetensors` or all shards listed in the index
    pub weight_files: Vec<PathBuf>,
}

/// Fetches checkpoint files through the hub cache.
///
/// Files already present in the cache are not downloaded again.
pub struct CheckpointResolver {
    api: Api,
}

impl CheckpointResolver {
    pub fn from_config(config: &AdapterConfig) -> Result<Self, Error> {
        let mut builder = ApiBuilder::new()
            .with_progress(false)
            .with_token(config.resolved_token());

        if let Some(cache_dir) = &config.cache_dir {
            tracing::debug!("Using checkpoint cache at {}", cache_dir.display());
            builder = builder.with_cache_dir(cache_dir.clone());
        }

        let api = builder
            .build()
            .map_err(|e| Error::CheckpointResolution("<hub>".to_string(), e.to_string()))?;

        Ok(Self { api })
    }

    fn repo(&self, checkpoint: &CheckpointConfig) -> ApiRepo {
        self.api.repo(Repo::with_revision(
            checkpoint.repo_id.clone(),
            RepoType::Model,
            checkpoint.revision().to_string(),
        ))
    }

    fn get(repo: &ApiRepo, checkpoint: &CheckpointConfig, file: &str) -> Result<PathBuf, Error> {
        repo.get(file).map_err(|e| {
            Error::CheckpointResolution(checkpoint.repo_id.clone(), format!("{file}: {e}"))
        })
    }

    pub fn tokenizer_files(&self, checkpoint: &CheckpointConfig) -> Result<TokenizerFiles, Error> {
        let repo = self.repo(checkpoint);

        let tokenizer_file = Self::get(&repo, checkpoint, "tokenizer.json")?;
        let tokenizer_config_file = match repo.get("tokenizer_config.json") {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::debug!(
                    "No tokenizer_config.json for {}: {e}",
                    checkpoint.repo_id
                );
                None
            }
        };

        Ok(TokenizerFiles {
            tokenizer_file,
            tokenizer_config_file,
        })
    }

    pub fn model_files(&self, checkpoint: &CheckpointConfig) -> Result<ModelFiles, Error> {
        let repo = self.repo(checkpoint);

        let config_file = Self::get(&repo, checkpoint, "config.json")?;

        // Try single-file model first
        let weight_files = match repo.get(SINGLE_FILE) {
            Ok(path) => vec![path],
            Err(_) => {
                let index_path = Self::get(&repo, checkpoint, INDEX_FILE)?;
                let index = IndexFile::from_path(&index_path)?;

                tracing::info!(
                    "{} is sharded into {} files ({} tensors, {:?} bytes)",
                    checkpoint.repo_id,
                    index.shards().len(),
                    index.num_tensors(),
                    index.total_size()
                );

                index
                    .shards()
                    .into_iter()
                    .map(|shard| Self::get(&repo, checkpoint, shard))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        Ok(ModelFiles {
            config_file,
            weight_files,
        })
    }
}
