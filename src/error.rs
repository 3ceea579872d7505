use serde::{ser::Serializer, Serialize};
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Error during execution ({0})")]
    ExecutionError(String),

    #[error("Missing config ({0})")]
    MissingConfig(String),

    #[error("Device is not available ({0})")]
    MissingDevice(String),

    /// A logical model has been referenced before `load` registered it.
    #[error("Model {0} not loaded.")]
    ModelNotLoaded(String),

    #[error("Error Loading File ({0}): {1}")]
    LoadingFile(String, String),

    #[error("Error resolving checkpoint {0}: {1}")]
    CheckpointResolution(String, String),

    #[error("Unsupported model type ({0})")]
    UnsupportedModelType(String),

    #[error("Error Encoding Message ({0})")]
    MessageEncodingError(String),

    /// A name that is not one of the closed set of logical models or services.
    #[error("Unknown {0} ({1})")]
    UnknownName(&'static str, String),

    /// A JSON request that is not a mapping, or whose `input` is not a string.
    #[error("Malformed request ({0})")]
    MalformedRequest(String),

    #[error("Error deserialization from JSON")]
    JsonSerdeError(#[from] serde_json::Error),

    #[error("Error installing log subscriber ({0})")]
    Logging(String),
}

impl Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}
