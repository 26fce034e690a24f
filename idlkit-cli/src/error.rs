//! Error type for the command line tool.

use std::path::PathBuf;

use idlkit_core::error::{CoderError, PdaError, SchemaError};
use idlkit_core::pubkey::ParsePubkeyError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Coder(#[from] CoderError),

    #[error(transparent)]
    Pda(#[from] PdaError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid public key `{input}`: {source}")]
    Pubkey {
        input: String,
        source: ParsePubkeyError,
    },

    #[error("Invalid hex: {0}")]
    Hex(String),

    #[error("Invalid seed `{spec}`: {message}")]
    Seed { spec: String, message: String },

    #[error("{0}")]
    Usage(String),
}

impl CliError {
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    pub fn seed(spec: &str, message: impl Into<String>) -> Self {
        Self::Seed {
            spec: spec.to_string(),
            message: message.into(),
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;
