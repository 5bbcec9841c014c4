use thiserror::Error;

/// A page whose bytes could not be turned into a nested-sequence value.
/// Fatal for the page, never for the pipeline.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("page bytes are not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("page is not well-formed nested-sequence JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("page root is not a sequence")]
    NotASequence,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid pipeline configuration: {0}")]
    Config(#[from] review_stream_config::ConfigError),
}
