//! Log subscriber setup for hosts that do not install their own.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::error::Error;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Filter directive, eg. `info` or `llm_adapter=debug,hf_hub=warn`
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit JSON lines instead of human readable output
    #[serde(default)]
    pub json: bool,

    /// If set, logs are additionally written to a daily rolling file in this directory
    #[serde(default)]
    pub directory: Option<PathBuf>,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_file_prefix() -> String {
    "llm-adapter.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
            directory: None,
            file_prefix: default_file_prefix(),
        }
    }
}

/// Installs a global subscriber according to `config`.
///
/// Returns the guard of the file writer, if one was configured. Dropping it flushes
/// and stops the background writer, so hosts should keep it alive for the process
/// lifetime. If a global subscriber is already installed this is a no-op.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>, Error> {
    let filter = EnvFilter::try_new(&config.level).map_err(|e| Error::Logging(e.to_string()))?;

    let mut layers: Vec<BoxedLayer> = Vec::new();

    layers.push(if config.json {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().boxed()
    });

    let guard = match &config.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory)?;
            let appender = tracing_appender::rolling::daily(directory, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let file_layer = fmt::layer().with_ansi(false).with_writer(writer);
            layers.push(if config.json {
                file_layer.json().boxed()
            } else {
                file_layer.boxed()
            });

            Some(guard)
        }
        None => None,
    };

    if let Err(e) = Registry::default()
        .with(layers.with_filter(filter))
        .try_init()
    {
        tracing::debug!("Log subscriber already installed: {e}");
    }

    Ok(guard)
}
