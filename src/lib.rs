mod adapter;
mod error;
mod llm;
pub mod logging;
mod models;

pub use adapter::ModelAdapter;
pub use error::{Error, Result};
pub use llm::backend;
pub use llm::llmconfig::*;
pub use llm::loaders;
pub use llm::runtime;
pub use logging::{init_logging, LoggingConfig};
pub use models::*;

/// Creates and loads an adapter from `config`, logging as configured.
///
/// The returned guard must be kept alive while file logging is wanted.
pub fn init(
    config: AdapterConfig,
) -> Result<(
    ModelAdapter<runtime::local::CandleBackend>,
    Option<tracing_appender::non_blocking::WorkerGuard>,
)> {
    let guard = init_logging(&config.logging)?;

    let mut adapter = ModelAdapter::from_config(config)?;
    adapter.load()?;

    Ok((adapter, guard))
}
