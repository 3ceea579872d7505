use std::path::PathBuf;

use llm_adapter::{runtime::mock::EchoBackend, AdapterConfig, Error, ModelAdapter};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

/// Initializes tracing at DEBUG level.
/// Uses `try_init()` so it doesn't panic when called from multiple tests
/// in the same process.
#[allow(dead_code)]
pub fn enable_logging() {
    let verbose = tracing_subscriber::fmt::layer().with_filter(filter::LevelFilter::DEBUG);
    let _ = Registry::default().with(verbose).try_init();
}

#[allow(dead_code)]
pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// An adapter over the echo backend with the default checkpoints, not yet loaded
#[allow(dead_code)]
pub fn echo_adapter() -> ModelAdapter<EchoBackend> {
    ModelAdapter::new(AdapterConfig::default(), EchoBackend::new())
        .expect("default config is valid")
}

/// An adapter over the echo backend with all checkpoints loaded
#[allow(dead_code)]
pub fn loaded_echo_adapter() -> Result<ModelAdapter<EchoBackend>, Error> {
    let mut adapter = echo_adapter();
    adapter.load()?;
    Ok(adapter)
}

/// A fresh, empty directory below the system temp dir
#[allow(dead_code)]
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("llm-adapter-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}
