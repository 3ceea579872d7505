use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::Error;
use crate::llm::llmconfig::CheckpointConfig;
use crate::models::LogicalModel;
use crate::runtime::GenerationBackend;

/// A deterministic backend that echoes its input prefixed with the model name.
///
/// Useful to exercise routing without weights or an accelerator.
#[derive(Debug, Default)]
pub struct EchoBackend {
    fail_on: Option<LogicalModel>,
    model_loads: AtomicUsize,
    tokenizer_loads: AtomicUsize,
    generations: AtomicUsize,
}

/// Model handle of the [`EchoBackend`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoModel {
    pub name: LogicalModel,
    pub repo_id: String,

    /// Unique per loaded handle
    pub id: usize,
}

/// Tokenizer handle of the [`EchoBackend`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoTokenizer {
    pub name: LogicalModel,
    pub repo_id: String,
    pub id: usize,
}

impl EchoBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes loading the model of `name` fail
    pub fn failing_on(name: LogicalModel) -> Self {
        Self {
            fail_on: Some(name),
            ..Default::default()
        }
    }

    /// The text generated for `text` by the model `name`
    pub fn echo(name: LogicalModel, text: &str) -> String {
        format!("{name}: {text}")
    }

    pub fn model_loads(&self) -> usize {
        self.model_loads.load(Ordering::SeqCst)
    }

    pub fn tokenizer_loads(&self) -> usize {
        self.tokenizer_loads.load(Ordering::SeqCst)
    }

    pub fn generations(&self) -> usize {
        self.generations.load(Ordering::SeqCst)
    }
}

impl GenerationBackend for EchoBackend {
    type Model = EchoModel;
    type Tokenizer = EchoTokenizer;

    fn load_model(&self, checkpoint: &CheckpointConfig) -> Result<EchoModel, Error> {
        if self.fail_on == Some(checkpoint.name) {
            return Err(Error::CheckpointResolution(
                checkpoint.repo_id.clone(),
                "unreachable".to_string(),
            ));
        }

        Ok(EchoModel {
            name: checkpoint.name,
            repo_id: checkpoint.repo_id.clone(),
            id: self.model_loads.fetch_add(1, Ordering::SeqCst),
        })
    }

    fn load_tokenizer(&self, checkpoint: &CheckpointConfig) -> Result<EchoTokenizer, Error> {
        Ok(EchoTokenizer {
            name: checkpoint.name,
            repo_id: checkpoint.repo_id.clone(),
            id: self.tokenizer_loads.fetch_add(1, Ordering::SeqCst),
        })
    }

    fn generate(
        &self,
        model: &EchoModel,
        tokenizer: &EchoTokenizer,
        text: &str,
        _max_length: usize,
    ) -> Result<String, Error> {
        if model.name != tokenizer.name {
            return Err(Error::ExecutionError(format!(
                "tokenizer of {} paired with model {}",
                tokenizer.name, model.name
            )));
        }

        self.generations.fetch_add(1, Ordering::SeqCst);
        Ok(Self::echo(model.name, text))
    }
}
