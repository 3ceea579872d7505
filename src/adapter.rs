//! The `load` / `predict` surface exposed to the serving host.

use std::collections::HashMap;
use std::time::Instant;

use serde_json::Value;

use crate::error::Error;
use crate::llm::llmconfig::AdapterConfig;
use crate::models::{
    LogicalModel, Request, Response, ServiceType, INPUT_REQUIRED, INVALID_SERVICE,
};
use crate::runtime::local::CandleBackend;
use crate::runtime::GenerationBackend;

/// Holds the model and tokenizer registries and routes requests to them.
///
/// A freshly constructed adapter has empty registries. The host calls [`Self::load`]
/// once, then [`Self::predict`] per request.
pub struct ModelAdapter<B: GenerationBackend> {
    config: AdapterConfig,
    backend: B,
    models: HashMap<LogicalModel, B::Model>,
    tokenizers: HashMap<LogicalModel, B::Tokenizer>,
}

impl ModelAdapter<CandleBackend> {
    /// Creates an adapter generating with candle on the configured device
    pub fn from_config(config: AdapterConfig) -> Result<Self, Error> {
        config.validate()?;
        let backend = CandleBackend::from_config(&config)?;
        Self::new(config, backend)
    }
}

impl<B: GenerationBackend> ModelAdapter<B> {
    pub fn new(config: AdapterConfig, backend: B) -> Result<Self, Error> {
        config.validate()?;

        Ok(Self {
            config,
            backend,
            models: HashMap::new(),
            tokenizers: HashMap::new(),
        })
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Loads the tokenizer and model of every configured checkpoint.
    ///
    /// The registries are replaced only once all checkpoints have loaded. If any of
    /// them fails, the error is returned and the registries keep their previous
    /// content. Calling this again reloads everything.
    pub fn load(&mut self) -> Result<(), Error> {
        let mut models = HashMap::with_capacity(self.config.checkpoints.len());
        let mut tokenizers = HashMap::with_capacity(self.config.checkpoints.len());

        for checkpoint in &self.config.checkpoints {
            let started = Instant::now();
            tracing::info!(
                "Loading {} from {}@{}",
                checkpoint.name,
                checkpoint.repo_id,
                checkpoint.revision()
            );

            let model = self.backend.load_model(checkpoint).inspect_err(|e| {
                tracing::error!("Error loading model {}: {e}", checkpoint.name)
            })?;
            let tokenizer = self.backend.load_tokenizer(checkpoint).inspect_err(|e| {
                tracing::error!("Error loading tokenizer {}: {e}", checkpoint.name)
            })?;

            models.insert(checkpoint.name, model);
            tokenizers.insert(checkpoint.name, tokenizer);

            tracing::info!(
                "Loaded {} in {:.1}s",
                checkpoint.name,
                started.elapsed().as_secs_f32()
            );
        }

        self.models = models;
        self.tokenizers = tokenizers;

        Ok(())
    }

    /// Returns true if every logical model has been loaded
    pub fn is_loaded(&self) -> bool {
        LogicalModel::ALL
            .iter()
            .all(|m| self.models.contains_key(m) && self.tokenizers.contains_key(m))
    }

    /// The logical models currently in the registry, sorted
    pub fn loaded_models(&self) -> Vec<LogicalModel> {
        let mut names: Vec<_> = self.models.keys().copied().collect();
        names.sort();
        names
    }

    pub fn model(&self, name: LogicalModel) -> Option<&B::Model> {
        self.models.get(&name)
    }

    pub fn tokenizer(&self, name: LogicalModel) -> Option<&B::Tokenizer> {
        self.tokenizers.get(&name)
    }

    fn generate_response(&self, name: LogicalModel, input_text: &str) -> Result<String, Error> {
        let (Some(model), Some(tokenizer)) = (self.models.get(&name), self.tokenizers.get(&name))
        else {
            return Err(Error::ModelNotLoaded(name.to_string()));
        };

        tracing::debug!("Generating with {name} ({} bytes of input)", input_text.len());

        self.backend.generate(
            model,
            tokenizer,
            input_text,
            self.config.generation.max_length,
        )
    }

    /// Routes `request` to the model(s) selected by its `service` field.
    ///
    /// A missing input or an unknown service is answered with an error [`Response`].
    /// Failures of the models themselves, including calling this before [`Self::load`],
    /// are returned as `Err`.
    pub fn predict(&self, request: &Request) -> Result<Response, Error> {
        let input = request.input_text();

        if input.is_empty() {
            return Ok(Response::error(INPUT_REQUIRED));
        }

        self.serve(input, ServiceType::from_field(request.service.as_deref()))
    }

    /// Same as [`Self::predict`] for hosts exchanging JSON mappings.
    ///
    /// `input` may be absent or `null`, both read as empty. `service` defaults to
    /// `BS-friendly` only when the key is absent; a `null` or non-string value is an
    /// invalid service. A request that is not a mapping, or whose `input` is not a
    /// string, fails with [`Error::MalformedRequest`].
    pub fn predict_json(&self, request: Value) -> Result<Value, Error> {
        let fields = match request {
            Value::Object(fields) => fields,
            other => {
                return Err(Error::MalformedRequest(format!(
                    "expected a mapping, got {other}"
                )))
            }
        };

        let input = match fields.get("input") {
            None | Some(Value::Null) => "",
            Some(Value::String(input)) => input.as_str(),
            Some(other) => {
                return Err(Error::MalformedRequest(format!(
                    "input must be a string, got {other}"
                )))
            }
        };

        let response = if input.is_empty() {
            Response::error(INPUT_REQUIRED)
        } else {
            let service = match fields.get("service") {
                None => Some(ServiceType::default()),
                Some(Value::String(service)) => service.parse().ok(),
                Some(_) => None,
            };
            self.serve(input, service)?
        };

        Ok(serde_json::to_value(response)?)
    }

    fn serve(&self, input: &str, service: Option<ServiceType>) -> Result<Response, Error> {
        let Some(service) = service else {
            tracing::debug!("Rejecting request with an invalid service");
            return Ok(Response::error(INVALID_SERVICE));
        };

        tracing::debug!("Serving {service} request");

        let output = match service {
            ServiceType::BsFriendly => {
                self.generate_response(LogicalModel::BsjCode1Stable, input)?
            }
            ServiceType::Pro => self.generate_response(LogicalModel::CodeLlama, input)?,
            ServiceType::Premium => {
                let intermediate = self.generate_response(LogicalModel::BsjCode1Stable, input)?;
                let intermediate = self.generate_response(LogicalModel::CodeLlama, &intermediate)?;
                self.generate_response(LogicalModel::Terjman, &intermediate)?
            }
        };

        Ok(Response::output(output))
    }
}
