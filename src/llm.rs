//! LLM
//!
//! This module provides access to load and run inference on the configured checkpoints.
//! For now the loader supports `*.safetensors` weights of text generation models.

pub mod backend;
pub mod llmconfig;
pub mod loaders;
pub mod runtime;
