//! Error taxonomy shared by every crate
//!
//! Component crates keep their own error enums and convert into [`Error`],
//! which maps failures onto the four kinds the workflow reasons about.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::WorkflowStep;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Embedding or language-model call failed or timed out
    #[error("Provider error: {0}")]
    Provider(String),

    /// Index unavailable or unusable for the query
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Malformed filters or input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown session or product
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Provider(_) => ErrorKind::Provider,
            Error::Retrieval(_) => ErrorKind::Retrieval,
            Error::Validation(_) => ErrorKind::Validation,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Config(_) | Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Provider timeout after `millis`
    pub fn provider_timeout(what: &str, millis: u64) -> Self {
        Error::Provider(format!("{} timed out after {}ms", what, millis))
    }
}

/// Error classification carried in session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Provider,
    Retrieval,
    Validation,
    NotFound,
    Internal,
}

/// Serializable record of a failure that downgraded a workflow step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
    /// Step whose component failed
    pub step: WorkflowStep,
}

impl ErrorInfo {
    pub fn from_error(err: &Error, step: WorkflowStep) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            step,
        }
    }
}
