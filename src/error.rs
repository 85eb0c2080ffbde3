use thiserror::Error;

#[derive(Error, Debug)]
pub enum PiperError {
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed response from {url}: {source}")]
    MalformedResponse {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("Pipeline '{0}' has no jobs to run")]
    EmptyPipeline(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PiperError>;
