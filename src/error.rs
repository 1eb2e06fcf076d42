use thiserror::Error;

/// Failures coming from the market data supplier. All of them are transient
/// from the loop's point of view: the cycle is skipped and retried later.
#[derive(Debug, Error)]
pub enum SupplierError {
    #[error("request timed out")]
    Timeout,

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("empty result set")]
    Empty,

    #[error("stream for {0} was already taken")]
    StreamTaken(String),
}

impl From<reqwest::Error> for SupplierError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SupplierError::Timeout
        } else if let Some(status) = e.status() {
            SupplierError::Status(status.as_u16())
        } else if e.is_decode() {
            SupplierError::Malformed(e.to_string())
        } else {
            SupplierError::Transport(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
