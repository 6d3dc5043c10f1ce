use thiserror::Error;

/// Everything that can end a search or load-more operation.
///
/// `Display` is the user-facing text stored in `SessionState::last_error`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("Too many searches in a short time. Please wait a moment and try again.")]
    RateLimited,

    #[error("{message}")]
    Server { status: u16, message: String },

    #[error("Server error: {0}")]
    ServerStatus(u16),

    #[error("{0}")]
    Network(String),

    #[error("Unexpected response from the job search service: {0}")]
    Malformed(String),

    #[error("The search is taking longer than expected. Please try again in a moment.")]
    PollTimedOut { attempts: u32 },
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Malformed(err.to_string())
        } else if err.is_timeout() {
            ClientError::Network(format!("Request timed out: {err}"))
        } else {
            ClientError::Network(err.to_string())
        }
    }
}
