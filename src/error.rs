use thiserror::Error;

/// Why a round trip to the chat backend failed.
///
/// Every variant is the same "send failed" outcome as far as the user is
/// concerned; the distinction only feeds the logs.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("backend returned HTTP {status}: {}", detail.as_deref().unwrap_or("no detail"))]
    Status { status: u16, detail: Option<String> },

    #[error("backend reported failure: {}", detail.as_deref().unwrap_or("no detail"))]
    Unsuccessful { detail: Option<String> },

    #[error("could not decode backend response: {0}")]
    Decode(String),
}

pub type SendResult<T> = std::result::Result<T, SendError>;
