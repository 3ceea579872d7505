//! Model backend abstraction.
//!
//! Each supported model family implements [`ModelBackend`] to encapsulate
//! model-specific forward pass, KV cache management, and weight loading.

pub mod llama;

use std::path::{Path, PathBuf};

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;

use crate::error::Error;

/// Abstraction over different model weight backends.
///
/// Implementors encapsulate model weights, forward pass logic,
/// and KV cache management.
pub trait ModelBackend: Send + Sync {
    /// Run a forward pass through the model.
    ///
    /// `input` is the token tensor [batch, seq_len].
    /// `index` is the position index for KV cache offset.
    /// Returns logits for the last token, [batch, vocab_size].
    fn forward(&mut self, input: &Tensor, index: usize) -> Result<Tensor, Error>;

    /// Clear the KV cache for a fresh generation.
    fn clear_kv_cache(&mut self) -> Result<(), Error>;
}

/// Extracts the last token's logits from model output.
///
/// Handles both 3D `[batch, seq_len, vocab]` and 2D `[batch, vocab]` outputs.
/// This is model-agnostic and shared by all backends.
pub fn extract_last_token_logits(logits: Tensor) -> Result<Tensor, Error> {
    if logits.dims().len() == 3 {
        let seq_len = logits
            .dim(1)
            .map_err(|e| Error::ExecutionError(e.to_string()))?;
        logits
            .narrow(1, seq_len - 1, 1)
            .and_then(|t| t.squeeze(1))
            .map_err(|e| Error::ExecutionError(e.to_string()))
    } else {
        Ok(logits)
    }
}

/// Picks the weight dtype for `device`. Accelerators run in BF16, the CPU in F32.
pub fn dtype_for(device: &Device) -> DType {
    if device.is_cpu() {
        DType::F32
    } else {
        DType::BF16
    }
}

/// Creates the appropriate backend for the `model_type` declared in `config.json`.
pub fn create_backend(
    model_type: &str,
    device: &Device,
    weight_files: &[PathBuf],
    model_config_file: &Path,
) -> Result<Box<dyn ModelBackend>, Error> {
    let dtype = dtype_for(device);

    let vb = || unsafe {
        VarBuilder::from_mmaped_safetensors(weight_files, dtype, device)
            .map_err(|e| Error::ExecutionError(e.to_string()))
    };

    match model_type {
        "llama" => {
            tracing::info!("Loading Llama safetensors model ({dtype:?})");
            Ok(Box::new(llama::LlamaBackend::from_safetensors(
                vb()?,
                model_config_file,
                dtype,
                device,
            )?))
        }
        other => Err(Error::UnsupportedModelType(other.to_string())),
    }
}
