use checker_common::error::CommonError;

use crate::response::DecodeError;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Common(#[from] CommonError),

    #[error("not a valid {domain} url: {url}")]
    InvalidUrl { url: String, domain: String },

    #[error("article content could not be extracted, page layout not recognized")]
    ExtractionEmpty,

    #[error("model backend is not reachable at {0}")]
    ModelUnavailable(String),

    #[error("could not decode model response: {source}")]
    Decode {
        #[source]
        source: DecodeError,
        raw_response: String,
    },

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("config error: {0}")]
    Config(String),
}

impl AnalysisError {
    /// Stable machine-readable tag for the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::Common(CommonError::Client(_)) => "http_client",
            AnalysisError::Common(CommonError::Fetch { .. }) => "fetch_failed",
            AnalysisError::Common(CommonError::ModelConnection(_)) => "model_connection",
            AnalysisError::Common(CommonError::ModelBackend { .. }) => "model_backend",
            AnalysisError::Common(CommonError::ModelUnknown(_)) => "model_unknown",
            AnalysisError::InvalidUrl { .. } => "invalid_url",
            AnalysisError::ExtractionEmpty => "extraction_empty",
            AnalysisError::ModelUnavailable(_) => "model_unavailable",
            AnalysisError::Decode {
                source: DecodeError::NoJsonFound { .. },
                ..
            } => "no_json_found",
            AnalysisError::Decode {
                source: DecodeError::JsonDecode { .. },
                ..
            } => "json_decode",
            AnalysisError::Catalog(_) => "catalog",
            AnalysisError::Config(_) => "config",
        }
    }

    /// Whether the failure happened before the model was involved.
    pub fn is_extraction_failure(&self) -> bool {
        matches!(
            self,
            AnalysisError::InvalidUrl { .. }
                | AnalysisError::ExtractionEmpty
                | AnalysisError::Common(CommonError::Fetch { .. })
        )
    }

    /// Truncated model output attached to decode failures.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            AnalysisError::Decode { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }
}
