mod common;

use llm_adapter::{init_logging, Error, LoggingConfig};

#[test]
fn test_invalid_filter_is_rejected() {
    let config = LoggingConfig {
        level: "llm_adapter=loudest".to_string(),
        ..Default::default()
    };

    let result = init_logging(&config);
    assert!(matches!(result, Err(Error::Logging(_))));
}

#[test]
fn test_default_logging_has_no_guard() -> Result<(), Error> {
    let config = LoggingConfig::default();

    assert_eq!(config.level, "info");
    assert!(init_logging(&config)?.is_none());

    Ok(())
}
