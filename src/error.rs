use thiserror::Error;

/// Failures while turning a sampler source into a decoded buffer.
///
/// These never escape the engine: a failed decode is logged and the slot
/// resolves to an explicit "no sample" state.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("sampler slot has no data source")]
    MissingSource,

    #[error("unsupported data url: {0}")]
    UnsupportedUrl(String),

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("wav decode failed: {0}")]
    Wav(#[from] hound::Error),

    #[error("failed to read sample file: {0}")]
    Io(#[from] std::io::Error),

    #[error("decoded sample contains no frames")]
    Empty,
}

/// Rejected `apply_patch` updates. The previous patch stays in effect.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("patch update must be a JSON object")]
    NotAnObject,

    #[error("invalid patch: {0}")]
    Invalid(#[from] serde_json::Error),
}
