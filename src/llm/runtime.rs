//! LLM Inference

pub mod local;
pub mod mock;

use crate::error::Error;
use crate::llm::llmconfig::{CheckpointConfig, DevicePreference};
use candle_core::Device;

/// The capability that turns a checkpoint into loaded handles and
/// a loaded model plus tokenizer into generated text.
///
/// The [`crate::ModelAdapter`] owns one backend and never touches devices or tensors
/// itself, so routing can be exercised with [`mock::EchoBackend`].
pub trait GenerationBackend: Send + Sync {
    /// Handle to a loaded generative model
    type Model: Send + Sync;

    /// Handle to a loaded tokenizer
    type Tokenizer: Send + Sync;

    /// Fetches and instantiates the generative model of `checkpoint`.
    ///
    /// This is a heavy process and blocks until the weights are placed on the device.
    fn load_model(&self, checkpoint: &CheckpointConfig) -> Result<Self::Model, Error>;

    /// Fetches and instantiates the tokenizer of `checkpoint`.
    fn load_tokenizer(&self, checkpoint: &CheckpointConfig) -> Result<Self::Tokenizer, Error>;

    /// Encodes `text`, generates until `max_length` total tokens or EOS and decodes the
    /// full sequence with special tokens stripped.
    fn generate(
        &self,
        model: &Self::Model,
        tokenizer: &Self::Tokenizer,
        text: &str,
        max_length: usize,
    ) -> Result<String, Error>;
}

/// Number of tokens to generate for a prompt of `prompt_len` tokens when the whole
/// sequence is capped at `max_length`.
///
/// At least one token is generated, even if the prompt alone reaches the cap.
pub fn new_token_budget(prompt_len: usize, max_length: usize) -> usize {
    max_length.saturating_sub(prompt_len).max(1)
}

/// Resolves a [`DevicePreference`] into a device.
///
/// `Auto` falls back to the CPU if no accelerator can be detected. An explicitly
/// requested accelerator that is unavailable is an error.
pub fn select_device(preference: DevicePreference) -> Result<Device, Error> {
    match preference {
        DevicePreference::Auto => Ok(load_default_device()),
        DevicePreference::Cpu => Ok(Device::Cpu),
        DevicePreference::Cuda(ordinal) => {
            Device::new_cuda(ordinal).map_err(|e| Error::MissingDevice(e.to_string()))
        }
        DevicePreference::Metal(ordinal) => {
            Device::new_metal(ordinal).map_err(|e| Error::MissingDevice(e.to_string()))
        }
    }
}

/// Loads the best default device that can be detected
fn load_default_device() -> Device {
    if cfg!(target_os = "macos") {
        match Device::new_metal(0) {
            Ok(device) => {
                tracing::debug!("Select Metal Device (0)");
                device
            }
            Err(error) => {
                tracing::warn!("Could not detect Metal device. Fall back to CPU: {}", error);
                Device::Cpu
            }
        }
    } else {
        match Device::new_cuda(0) {
            Ok(device) => {
                tracing::debug!("Select Cuda Device (0)");
                device
            }
            Err(error) => {
                tracing::warn!("Could not detect Cuda device. Fall back to CPU: {}", error);
                Device::Cpu
            }
        }
    }
}
