use thiserror::Error;

/// Failures of the HTTP collaborators (node and ledger).
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("JSON-RPC error {code} in {method}: {message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },

    #[error("Malformed response to {method}: {reason}")]
    Malformed { method: String, reason: String },

    #[error("Unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },
}

impl ClientError {
    pub fn malformed(method: &str, reason: impl Into<String>) -> Self {
        ClientError::Malformed {
            method: method.to_string(),
            reason: reason.into(),
        }
    }
}
