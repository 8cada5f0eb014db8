use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChromaError>;

#[derive(Debug, Error)]
pub enum ChromaError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response shape: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ChromaError {
    fn from(err: reqwest::Error) -> Self {
        ChromaError::Network(err.to_string())
    }
}
