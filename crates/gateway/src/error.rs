use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network failure: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{status} {text}")]
    BadStatus { status: u16, text: String },
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

impl ApiError {
    /// Errors worth a retry by the caller, later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::BadStatus { .. })
    }
}
