use thiserror::Error;

use crate::core::psychrolib::PsychroError;

/// Failure of one chart generation call.
///
/// Every variant is reported to clients through the same 500 envelope;
/// the variant only changes what gets logged.
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("render failure: {0}")]
    RenderFailure(String),

    #[error("encoding failure: {0}")]
    EncodingFailure(String),
}

impl ChartError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "InvalidInput",
            Self::RenderFailure(_) => "RenderFailure",
            Self::EncodingFailure(_) => "EncodingFailure",
        }
    }
}

impl From<PsychroError> for ChartError {
    fn from(err: PsychroError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

impl From<png::EncodingError> for ChartError {
    fn from(err: png::EncodingError) -> Self {
        Self::EncodingFailure(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ChartError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::RenderFailure(format!("render task failed: {}", err))
    }
}
