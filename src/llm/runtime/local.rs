//! Candle backed generation for checkpoints resolved from the hub.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use crate::error::Error;
use crate::llm::backend::{self, ModelBackend};
use crate::llm::llmconfig::{
    AdapterConfig, CheckpointConfig, GenerationConfig, GenerationSeed, SamplingConfig,
};
use crate::llm::loaders::hub::CheckpointResolver;
use crate::runtime::{new_token_budget, select_device, GenerationBackend};
use candle_core::{DType, Device, Tensor};
use candle_transformers::generation::{LogitsProcessor, Sampling};
use rand::Rng;
use serde::Deserialize;
use tokenizers::Tokenizer;

/// Tokens seen by the repetition penalty
const REPEAT_LAST_N: usize = 64;

/// Generates text with candle on the configured device.
///
/// Model-specific logic (forward pass, KV cache) is delegated to the
/// [`ModelBackend`] trait. This struct handles the model-agnostic parts:
/// checkpoint resolution, tokenization, sampling and stopping.
pub struct CandleBackend {
    resolver: CheckpointResolver,
    device: Device,
    generation: GenerationConfig,
}

/// A loaded causal language model
pub struct CausalLm {
    model_type: String,

    /// Forward passes mutate the KV cache, so one generation holds the lock.
    backend: Mutex<Box<dyn ModelBackend>>,
    eos_token_ids: Vec<u32>,
}

impl CausalLm {
    /// `model_type` as declared in the checkpoint's `config.json`
    pub fn model_type(&self) -> &str {
        &self.model_type
    }

    pub fn eos_token_ids(&self) -> &[u32] {
        &self.eos_token_ids
    }
}

/// A loaded tokenizer together with the EOS token declared next to it
pub struct CandleTokenizer {
    tokenizer: Tokenizer,
    eos_token: Option<String>,
}

/// The fields of `config.json` the runtime needs beyond the model config itself
#[derive(Deserialize, Debug)]
struct ModelHeader {
    model_type: Option<String>,

    #[serde(default)]
    eos_token_id: Option<TokenIds>,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum TokenIds {
    One(u32),
    Many(Vec<u32>),
}

/// Use this to deserialize the `tokenizer_config.json`
#[derive(Deserialize, Debug, Default)]
pub struct TokenizerConfig {
    #[serde(default)]
    pub eos_token: Option<SpecialToken>,
}

/// Special tokens are either plain strings or serialized `AddedToken`s
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum SpecialToken {
    Text(String),
    Added { content: String },
}

impl TokenIds {
    fn into_vec(self) -> Vec<u32> {
        match self {
            TokenIds::One(id) => vec![id],
            TokenIds::Many(ids) => ids,
        }
    }
}

/// EOS ids declared by the model, followed by the tokenizer's EOS id if it is new
fn merge_eos_token_ids(declared: &[u32], tokenizer_eos: Option<u32>) -> Vec<u32> {
    let mut ids = declared.to_vec();
    if let Some(id) = tokenizer_eos {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

impl SpecialToken {
    pub fn content(&self) -> &str {
        match self {
            SpecialToken::Text(content) | SpecialToken::Added { content } => content,
        }
    }
}

impl CandleBackend {
    pub fn from_config(config: &AdapterConfig) -> Result<Self, Error> {
        let device = select_device(config.device)?;
        tracing::info!("Generation device: {device:?}");

        Ok(Self {
            resolver: CheckpointResolver::from_config(config)?,
            device,
            generation: config.generation.clone(),
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Creates a LogitsProcessor from the generation config
    fn create_logits_processor(&self) -> LogitsProcessor {
        let GenerationConfig {
            temperature,
            top_k,
            top_p,
            sampling_config,
            seed,
            ..
        } = self.generation.clone();

        let sampling = match sampling_config {
            SamplingConfig::ArgMax => Sampling::ArgMax,
            SamplingConfig::All => Sampling::All { temperature },
            SamplingConfig::TopK => Sampling::TopK {
                k: top_k,
                temperature,
            },
            SamplingConfig::TopP => Sampling::TopP {
                p: top_p,
                temperature,
            },
            SamplingConfig::TopKThenTopP => Sampling::TopKThenTopP {
                k: top_k,
                p: top_p,
                temperature,
            },
        };

        let seed = match seed {
            GenerationSeed::Fixed(inner) => inner,
            GenerationSeed::Random => {
                let mut rng = rand::rng();
                let seed = rng.random_range(1..1e10 as u64);
                tracing::debug!("Using seed for Logits Processor: {seed}");
                seed
            }
        };

        LogitsProcessor::from_sampling(seed, sampling)
    }

    fn read_model_header(config_file: &Path) -> Result<ModelHeader, Error> {
        let mut file = File::open(config_file)?;
        Ok(serde_json::from_reader(&mut file)?)
    }
}

impl GenerationBackend for CandleBackend {
    type Model = CausalLm;
    type Tokenizer = CandleTokenizer;

    fn load_model(&self, checkpoint: &CheckpointConfig) -> Result<CausalLm, Error> {
        let files = self.resolver.model_files(checkpoint)?;
        let header = Self::read_model_header(&files.config_file)?;

        let model_type = header.model_type.ok_or_else(|| {
            Error::UnsupportedModelType(format!(
                "{}: config.json has no model_type",
                checkpoint.repo_id
            ))
        })?;

        let eos_token_ids = header
            .eos_token_id
            .map(TokenIds::into_vec)
            .unwrap_or_default();

        tracing::info!(
            "Loading {} ({model_type}) from {} weight file(s)",
            checkpoint.repo_id,
            files.weight_files.len()
        );

        let backend = backend::create_backend(
            &model_type,
            &self.device,
            &files.weight_files,
            &files.config_file,
        )?;

        Ok(CausalLm {
            model_type,
            backend: Mutex::new(backend),
            eos_token_ids,
        })
    }

    fn load_tokenizer(&self, checkpoint: &CheckpointConfig) -> Result<CandleTokenizer, Error> {
        let files = self.resolver.tokenizer_files(checkpoint)?;

        let tokenizer_config: TokenizerConfig = match &files.tokenizer_config_file {
            Some(path) => {
                let mut file = File::open(path)?;
                serde_json::from_reader(&mut file)?
            }
            None => TokenizerConfig::default(),
        };

        let eos_token = tokenizer_config
            .eos_token
            .as_ref()
            .map(|t| t.content().to_string());

        match &eos_token {
            Some(eos) => tracing::debug!("Using EOS token from tokenizer_config: {eos}"),
            None => tracing::warn!("No EOS token in tokenizer_config of {}", checkpoint.repo_id),
        }

        let tokenizer = Tokenizer::from_file(&files.tokenizer_file).map_err(|e| {
            Error::LoadingFile(files.tokenizer_file.display().to_string(), e.to_string())
        })?;

        Ok(CandleTokenizer {
            tokenizer,
            eos_token,
        })
    }

    fn generate(
        &self,
        model: &CausalLm,
        tokenizer: &CandleTokenizer,
        text: &str,
        max_length: usize,
    ) -> Result<String, Error> {
        let encoding = tokenizer
            .tokenizer
            .encode(text, true)
            .map_err(|e| Error::MessageEncodingError(e.to_string()))?;

        let mut tokens = encoding.get_ids().to_vec();
        if tokens.is_empty() {
            return Err(Error::MessageEncodingError(
                "prompt encodes to zero tokens".to_string(),
            ));
        }

        let prompt_len = tokens.len();
        let budget = new_token_budget(prompt_len, max_length);

        let eos_token_ids = merge_eos_token_ids(
            &model.eos_token_ids,
            tokenizer
                .eos_token
                .as_deref()
                .and_then(|eos| tokenizer.tokenizer.token_to_id(eos)),
        );

        if eos_token_ids.is_empty() {
            tracing::warn!("No EOS token ids known for {}", model.model_type);
        }

        let penalty = self.generation.penalty;
        let mut logits_processor = self.create_logits_processor();

        let mut backend = model
            .backend
            .lock()
            .map_err(|e| Error::ExecutionError(e.to_string()))?;

        // Clear cache for fresh generation
        backend.clear_kv_cache()?;

        let mut index_pos = 0usize;

        for step in 0..budget {
            let context = if step == 0 {
                &tokens[..]
            } else {
                &tokens[tokens.len() - 1..]
            };

            let input = Tensor::new(context, &self.device)
                .and_then(|t| t.unsqueeze(0))
                .map_err(|e| Error::ExecutionError(e.to_string()))?;

            let logits = backend
                .forward(&input, index_pos)?
                .squeeze(0)
                .and_then(|t| t.to_dtype(DType::F32))
                .map_err(|e| Error::ExecutionError(e.to_string()))?;

            index_pos += context.len();

            let logits = if penalty == 1.0 {
                logits
            } else {
                let start_at = tokens.len().saturating_sub(REPEAT_LAST_N);
                candle_transformers::utils::apply_repeat_penalty(
                    &logits,
                    penalty,
                    &tokens[start_at..],
                )
                .map_err(|e| Error::ExecutionError(e.to_string()))?
            };

            let next_token = logits_processor
                .sample(&logits)
                .map_err(|e| Error::ExecutionError(e.to_string()))?;

            tokens.push(next_token);

            if eos_token_ids.contains(&next_token) {
                tracing::debug!("EOS after {} new token(s)", step + 1);
                break;
            }
        }

        tracing::debug!(
            "Finished generation. Prompt tokens: {prompt_len}, Completion tokens: {}",
            tokens.len() - prompt_len
        );

        tokenizer
            .tokenizer
            .decode(&tokens, true)
            .map_err(|e| Error::ExecutionError(e.to_string()))
    }
}
