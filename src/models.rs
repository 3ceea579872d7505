use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::Error;

/// Error message returned when a request carries no input text.
pub const INPUT_REQUIRED: &str = "Input text is required";

/// Error message returned for an unknown `service` value.
pub const INVALID_SERVICE: &str = "Invalid service type";

/// The adapter's short name for a checkpoint.
///
/// The serialized form is the exact name used as registry key and in logs.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogicalModel {
    #[serde(rename = "BSJCode-1-Stable")]
    BsjCode1Stable,

    #[serde(rename = "CodeLlama")]
    CodeLlama,

    #[serde(rename = "Terjman")]
    Terjman,
}

impl LogicalModel {
    /// Every logical model, in load order.
    pub const ALL: [LogicalModel; 3] = [
        LogicalModel::BsjCode1Stable,
        LogicalModel::CodeLlama,
        LogicalModel::Terjman,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalModel::BsjCode1Stable => "BSJCode-1-Stable",
            LogicalModel::CodeLlama => "CodeLlama",
            LogicalModel::Terjman => "Terjman",
        }
    }

    /// Hub repository the logical name resolves to unless configured otherwise
    pub fn default_checkpoint(&self) -> &'static str {
        match self {
            LogicalModel::BsjCode1Stable => "BSAtlas/BSJCode-1-Stable",
            LogicalModel::CodeLlama => "codellama/CodeLlama-7b-Instruct-hf",
            LogicalModel::Terjman => "atlasia/Terjman-Ultra",
        }
    }
}

impl fmt::Display for LogicalModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogicalModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LogicalModel::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| Error::UnknownName("logical model", s.to_string()))
    }
}

/// Selects which logical model(s) serve a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceType {
    /// `BSJCode-1-Stable` only
    #[default]
    BsFriendly,

    /// `CodeLlama` only
    Pro,

    /// `BSJCode-1-Stable` → `CodeLlama` → `Terjman`, each fed the previous output
    Premium,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::BsFriendly => "BS-friendly",
            ServiceType::Pro => "Pro",
            ServiceType::Premium => "Premium",
        }
    }

    /// Parses the optional `service` field of a request.
    ///
    /// An absent field selects [`ServiceType::BsFriendly`]. Matching is exact and
    /// case-sensitive; anything else yields `None`.
    pub fn from_field(value: Option<&str>) -> Option<Self> {
        match value {
            None => Some(ServiceType::default()),
            Some(s) => s.parse().ok(),
        }
    }
}

impl FromStr for ServiceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BS-friendly" => Ok(ServiceType::BsFriendly),
            "Pro" => Ok(ServiceType::Pro),
            "Premium" => Ok(ServiceType::Premium),
            other => Err(Error::UnknownName("service", other.to_string())),
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inbound predict request.
///
/// Both fields are optional. Hosts holding raw JSON should go through
/// `ModelAdapter::predict_json`, which tells a `null` service apart from an absent one.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl Request {
    pub fn new<S>(input: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            input: Some(input.into()),
            service: None,
        }
    }

    pub fn with_service<S>(mut self, service: S) -> Self
    where
        S: Into<String>,
    {
        self.service = Some(service.into());
        self
    }

    /// The input text, defaulting to the empty string
    pub fn input_text(&self) -> &str {
        self.input.as_deref().unwrap_or_default()
    }
}

/// Result of a predict call. Exactly one of `output` or `error` is serialized.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum Response {
    Output { output: String },
    Error { error: String },
}

impl Response {
    pub fn output<S>(output: S) -> Self
    where
        S: Into<String>,
    {
        Response::Output {
            output: output.into(),
        }
    }

    pub fn error<S>(error: S) -> Self
    where
        S: Into<String>,
    {
        Response::Error {
            error: error.into(),
        }
    }

    pub fn as_output(&self) -> Option<&str> {
        match self {
            Response::Output { output } => Some(output),
            Response::Error { .. } => None,
        }
    }

    pub fn as_error(&self) -> Option<&str> {
        match self {
            Response::Error { error } => Some(error),
            Response::Output { .. } => None,
        }
    }
}
