use crate::error::Error;
use crate::logging::LoggingConfig;
use crate::models::LogicalModel;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fs::File,
    path::{Path, PathBuf},
};

/// Environment variable consulted when no `hf_token` has been configured.
pub const HF_TOKEN_ENV: &str = "HF_TOKEN";

const DEFAULT_REVISION: &str = "main";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct AdapterConfig {
    /// One entry per logical model
    #[serde(default = "default_checkpoints")]
    pub checkpoints: Vec<CheckpointConfig>,

    /// Directory downloaded checkpoints are cached in
    ///
    /// Falls back to the default Hugging Face cache if unset.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Access token for gated checkpoints
    #[serde(default)]
    pub hf_token: Option<String>,

    #[serde(default)]
    pub device: DevicePreference,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CheckpointConfig {
    /// Registry key
    pub name: LogicalModel,

    /// Hub repository, eg. `codellama/CodeLlama-7b-Instruct-hf`
    pub repo_id: String,

    /// Branch, tag or commit. Defaults to `main`.
    #[serde(default)]
    pub revision: Option<String>,
}

/// Where models are placed.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DevicePreference {
    /// Metal on macOS, CUDA elsewhere, CPU if neither is available
    #[default]
    Auto,
    Cpu,
    Cuda(usize),
    Metal(usize),
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    /// Upper bound on prompt + completion tokens
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    #[serde(default)]
    pub sampling_config: SamplingConfig,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Limits sampling to the K most likely next tokens.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Nucleus sampling. Dynamically selects the smallest
    /// set of tokens whose cumulative probability exceeds P
    #[serde(default = "default_top_p")]
    pub top_p: f64,

    /// Repetition penalty. `1.0` disables it.
    #[serde(default = "default_penalty")]
    pub penalty: f32,

    #[serde(default)]
    pub seed: GenerationSeed,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum GenerationSeed {
    Fixed(u64),

    #[default]
    Random,
}

/// Mirrors candle_transformers::generation::Sampling without the parameters,
/// which are taken from [`GenerationConfig`]
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SamplingConfig {
    /// Greedy decoding
    #[default]
    ArgMax,
    All,
    TopK,
    TopP,
    TopKThenTopP,
}

fn default_checkpoints() -> Vec<CheckpointConfig> {
    LogicalModel::ALL
        .into_iter()
        .map(|name| CheckpointConfig {
            name,
            repo_id: name.default_checkpoint().to_string(),
            revision: None,
        })
        .collect()
}

fn default_max_length() -> usize {
    100
}

fn default_temperature() -> f64 {
    0.8
}

fn default_top_k() -> usize {
    40
}

fn default_top_p() -> f64 {
    0.9
}

fn default_penalty() -> f32 {
    1.0
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            checkpoints: default_checkpoints(),
            cache_dir: None,
            hf_token: None,
            device: DevicePreference::default(),
            generation: GenerationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_length: default_max_length(),
            sampling_config: SamplingConfig::default(),
            temperature: default_temperature(),
            top_k: default_top_k(),
            top_p: default_top_p(),
            penalty: default_penalty(),
            seed: GenerationSeed::default(),
        }
    }
}

impl CheckpointConfig {
    pub fn revision(&self) -> &str {
        self.revision.as_deref().unwrap_or(DEFAULT_REVISION)
    }
}

impl AdapterConfig {
    /// Loads a config from path
    pub fn from_path<P>(path: P) -> Result<Self, Error>
    where
        P: AsRef<Path>,
    {
        let mut file = File::open(path.as_ref()).map_err(|e| {
            Error::LoadingFile(path.as_ref().display().to_string(), e.to_string())
        })?;
        Ok(serde_json::from_reader(&mut file)?)
    }

    /// Loads [`Self`] from a raw String.
    pub fn from_raw<S>(content: S) -> Result<Self, Error>
    where
        S: AsRef<str>,
    {
        Ok(serde_json::from_str(content.as_ref())?)
    }

    /// Checks that every logical model is configured exactly once and that
    /// generation has room for at least one token.
    pub fn validate(&self) -> Result<(), Error> {
        let mut seen = HashSet::new();

        for checkpoint in &self.checkpoints {
            if !seen.insert(checkpoint.name) {
                return Err(Error::MissingConfig(format!(
                    "checkpoint {} is configured more than once",
                    checkpoint.name
                )));
            }

            if checkpoint.repo_id.trim().is_empty() {
                return Err(Error::MissingConfig(format!(
                    "checkpoint {} has an empty repo_id",
                    checkpoint.name
                )));
            }
        }

        if let Some(missing) = LogicalModel::ALL.iter().find(|m| !seen.contains(*m)) {
            return Err(Error::MissingConfig(format!(
                "no checkpoint configured for {missing}"
            )));
        }

        if self.generation.max_length == 0 {
            return Err(Error::MissingConfig(
                "generation.max_length must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Returns the configured token, or the one exported in [`HF_TOKEN_ENV`]
    pub fn resolved_token(&self) -> Option<String> {
        self.hf_token
            .clone()
            .or_else(|| std::env::var(HF_TOKEN_ENV).ok())
            .filter(|t| !t.is_empty())
    }

    pub fn checkpoint(&self, name: LogicalModel) -> Option<&CheckpointConfig> {
        self.checkpoints.iter().find(|c| c.name == name)
    }
}
