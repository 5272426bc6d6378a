// FILE: crates/media-engine/src/error.rs

use thiserror::Error;
use tilawa_core::CoreError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Domain(#[from] CoreError),

    #[error("Load error: {0}")]
    LoadError(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Output error: {0}")]
    OutputError(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Network error: {0}")]
    Network(#[from] tilawa_network::NetworkError),
}

pub type EngineResult<T> = Result<T, EngineError>;
