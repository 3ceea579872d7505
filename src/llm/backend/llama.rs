use std::fs::File;
use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::llama::{self as llama_model, Llama, LlamaConfig};

use crate::error::Error;

use super::{extract_last_token_logits, ModelBackend};

pub struct LlamaBackend {
    model: Llama,
    cache: llama_model::Cache,
    config: llama_model::Config,
    dtype: DType,
    device: Device,
}

impl LlamaBackend {
    /// Load Llama weights from safetensors files.
    pub fn from_safetensors(
        vb: VarBuilder,
        model_config_file: &Path,
        dtype: DType,
        device: &Device,
    ) -> Result<Self, Error> {
        let mut config_file = File::open(model_config_file)?;
        let llama_config: LlamaConfig = serde_json::from_reader(&mut config_file)?;
        let config = llama_config.into_config(false);

        let model = Llama::load(vb, &config).map_err(|e| Error::ExecutionError(e.to_string()))?;
        let cache = llama_model::Cache::new(true, dtype, &config, device)
            .map_err(|e| Error::ExecutionError(e.to_string()))?;

        Ok(Self {
            model,
            cache,
            config,
            dtype,
            device: device.clone(),
        })
    }
}

impl ModelBackend for LlamaBackend {
    fn forward(&mut self, input: &Tensor, index: usize) -> Result<Tensor, Error> {
        let logits = self
            .model
            .forward(input, index, &mut self.cache)
            .map_err(|e| Error::ExecutionError(e.to_string()))?;
        extract_last_token_logits(logits)
    }

    fn clear_kv_cache(&mut self) -> Result<(), Error> {
        self.cache = llama_model::Cache::new(true, self.dtype, &self.config, &self.device)
            .map_err(|e| Error::ExecutionError(e.to_string()))?;
        Ok(())
    }
}
