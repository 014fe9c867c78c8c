use thiserror::Error;

#[derive(Error, Debug)]
pub enum P2pError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed search payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid search endpoint: {0}")]
    InvalidEndpoint(String),
}
